mod channels;
mod circuit;
pub mod errors;
mod gates;
mod state;
pub mod utils;

pub use channels::{Basis, ClassicalChannel, QuantumChannel};
pub use circuit::{Circuit, Instruction};
pub use gates::Gate;
pub use state::QuantumState;
