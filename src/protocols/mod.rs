//! Quantum network protocols.
//!
//! This module contains the key agreement protocol used to secure each link
//! and the distributed Grover search.

pub mod grover;
pub mod qkd;
pub use qkd::bb84;
