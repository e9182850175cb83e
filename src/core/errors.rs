use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GateError {
    #[error("Matrix is not Unitary (U†U != I)")]
    NonUnitary,

    #[error("Matrix must be square")]
    NotSquareMatrix,

    #[error("Invalid Dimensions")]
    InvalidDimensions,

    #[error("Qubit {0} cannot be both control and target")]
    ControlTargetOverlap(usize),

    #[error("Duplicate qubit index found: {0}")]
    DuplicateQubit(usize),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Qubit index {index} out of bounds for a {num_qubits}-qubit register")]
    IndexOutOfBounds { index: usize, num_qubits: usize },

    #[error("Classical bit {index} out of bounds for {num_clbits} classical bits")]
    ClbitOutOfBounds { index: usize, num_clbits: usize },

    #[error("Gate applied to qubit {0} after it was measured")]
    GateAfterMeasurement(usize),

    #[error("Gate error: {0}")]
    GateError(#[from] GateError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("Invalid delay: {0}. Must be a finite, non-negative number of seconds")]
    InvalidDelay(f64),

    #[error("Invalid probability: {0}. Must be between 0.0 and 1.0")]
    InvalidProbability(f64),
}

/// Reasons a BB84 exchange ends without a key.
///
/// An abort is an expected protocol outcome, reported inside
/// [`Bb84Result`](crate::protocols::bb84::Bb84Result) rather than as an `Err`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    #[error("{mismatches} of {sampled} disclosed test bits disagree")]
    MismatchDetected { mismatches: usize, sampled: usize },

    #[error("only {available} sifted bits available, {required} required")]
    InsufficientSiftedBits { available: usize, required: usize },
}

impl AbortReason {
    /// Short human-readable explanation of what usually causes this abort.
    pub fn likely_cause(&self) -> &'static str {
        match self {
            AbortReason::MismatchDetected { .. } => "high eavesdropping or noise",
            AbortReason::InsufficientSiftedBits { .. } => {
                "too few matching bases for the requested key length; retry or raise max-attempts"
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroverError {
    #[error("{controls} control qubits need {needed} ancilla qubit(s), {provided} provided")]
    InsufficientAncilla {
        controls: usize,
        needed: usize,
        provided: usize,
    },

    #[error("Search target must be a non-empty string of '0' and '1', got {0:?}")]
    InvalidTarget(String),

    #[error("Search over {got} data qubits exceeds the supported maximum of {max}")]
    TooManyQubits { got: usize, max: usize },

    #[error("The search register needs at least one qubit")]
    EmptyRegister,

    #[error("At least one participating node is required")]
    NoNodes,

    #[error("Shot count must be greater than zero")]
    ZeroShots,

    #[error("Simulation failed: {0}")]
    Simulation(#[from] StateError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CipherError {
    #[error("Key must be a non-empty string of '0' and '1'")]
    InvalidKeyBits,

    #[error("Ciphertext of {0} bytes is shorter than the nonce")]
    Truncated(usize),

    #[error("Message of {0} bytes exceeds the AES-GCM plaintext limit")]
    MessageTooLong(u64),

    #[error("Ciphertext failed authentication")]
    Integrity,

    #[error("Decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelayError {
    #[error("A relay chain needs at least two nodes, got {0}")]
    TooFewNodes(usize),

    #[error("Key exchange {from} -> {to} aborted after {attempts} attempt(s): {reason}")]
    KeyExchangeAborted {
        from: String,
        to: String,
        attempts: usize,
        reason: AbortReason,
    },

    #[error("No shared key between {from} and {to}")]
    MissingKey { from: String, to: String },

    #[error("Cipher failure on hop {from} -> {to}: {source}")]
    Cipher {
        from: String,
        to: String,
        #[source]
        source: CipherError,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration invalid: {0}")]
    Validation(String),

    #[error("configuration invalid: {0}")]
    Channel(#[from] ChannelError),
}
