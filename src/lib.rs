//! Didactic quantum network simulator.
//!
//! Nodes connected by classical and quantum channels agree on keys with BB84,
//! relay encrypted messages hop by hop, and jointly run a Grover search on a
//! small state-vector simulator.

pub mod cipher;
pub mod config;
mod core;
mod node;
mod progress;
pub mod protocols;
pub mod relay;
mod sampler;

pub use crate::core::{
    Basis, Circuit, ClassicalChannel, Gate, Instruction, QuantumChannel, QuantumState, errors,
    utils,
};
pub use crate::node::Node;
pub use crate::progress::Progress;
pub use crate::sampler::{Counts, Sampler};
