//! CLI definition for qnet-sim.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Quantum network simulator.
#[derive(Parser, Debug)]
#[command(name = "qnet-sim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level, used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Values that take precedence over the configuration file.
#[derive(Args, Debug)]
pub struct Overrides {
    /// RNG seed for a reproducible run.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Channel delay in seconds.
    #[arg(long, global = true)]
    pub delay_secs: Option<f64>,

    /// Probability that the eavesdropper intercepts a qubit.
    #[arg(long, global = true)]
    pub eavesdrop_rate: Option<f64>,

    /// Search target as binary digits, e.g. 101.
    #[arg(long, global = true)]
    pub target: Option<String>,

    /// Node names of the chain, in order.
    #[arg(long, global = true, value_delimiter = ',')]
    pub nodes: Option<Vec<String>>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Agree keys along the chain, then relay an encrypted message over it.
    Relay {
        /// Message to relay.
        #[arg(long)]
        message: Option<String>,

        /// Key length in bits per link.
        #[arg(long)]
        key_length: Option<usize>,

        /// Key exchanges attempted per link before giving up.
        #[arg(long)]
        max_attempts: Option<usize>,
    },
    /// Run the distributed Grover search only.
    Grover {
        /// Number of measurement shots.
        #[arg(long)]
        shots: Option<usize>,
    },
}
