//! Quantum Key Distribution (QKD) Protocols.
//!
//! - **BB84**: prepare-and-measure key agreement with basis sifting and a
//!   sampled detect-and-abort check.

pub mod bb84;
