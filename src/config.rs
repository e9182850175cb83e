//! TOML configuration of a simulation run.
//!
//! Every key is optional. A file only needs the values that differ from the
//! defaults:
//!
//! ```toml
//! [channel]
//! delay-secs = 0.01
//! eavesdrop-rate = 0.2
//!
//! [grover]
//! target = "1011"
//! ```

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::core::errors::ConfigError;
use crate::core::utils::parse_bits;
use crate::core::{ClassicalChannel, QuantumChannel};
use crate::node::Node;

/// Names used when no node list is configured.
pub const DEFAULT_NODE_NAMES: [&str; 4] = ["Alice", "Bob", "Charlie", "Dave"];

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub network: NetworkSection,
    pub channel: ChannelSection,
    pub qkd: QkdSection,
    pub grover: GroverSection,
    pub relay: RelaySection,
    /// RNG seed. Absent means OS entropy.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct NetworkSection {
    /// Relay chain in order. Absent means [`default_node_names`].
    pub nodes: Option<Vec<String>>,
    pub qubits_per_node: usize,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ChannelSection {
    pub delay_secs: f64,
    pub eavesdrop_rate: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct QkdSection {
    pub key_length: usize,
    pub max_attempts: usize,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct GroverSection {
    pub target: String,
    pub shots: usize,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RelaySection {
    pub message: String,
}

const fn default_qubits_per_node() -> usize {
    3
}

const fn default_key_length() -> usize {
    128
}

const fn default_max_attempts() -> usize {
    3
}

const fn default_shots() -> usize {
    crate::protocols::grover::DEFAULT_SHOTS
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            nodes: None,
            qubits_per_node: default_qubits_per_node(),
        }
    }
}

impl Default for QkdSection {
    fn default() -> Self {
        Self {
            key_length: default_key_length(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for GroverSection {
    fn default() -> Self {
        Self {
            target: "101".into(),
            shots: default_shots(),
        }
    }
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            message: "Hello Quantum World!".into(),
        }
    }
}

/// `Alice, Bob, Charlie, Dave` truncated to `min(4, len(target) + 1)` names.
pub fn default_node_names(target: &str) -> Vec<String> {
    let count = DEFAULT_NODE_NAMES.len().min(target.len() + 1);
    DEFAULT_NODE_NAMES[..count]
        .iter()
        .map(|name| (*name).to_owned())
        .collect()
}

impl SimulationConfig {
    /// Reads, parses and validates a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = self.node_names();
        if names.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "at least two nodes are required, got {}",
                names.len()
            )));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ConfigError::Validation(format!(
                "duplicate node name {duplicate:?}"
            )));
        }
        if self.qkd.key_length == 0 {
            return Err(ConfigError::Validation(
                "key length must be greater than zero".into(),
            ));
        }
        if self.qkd.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "max attempts must be greater than zero".into(),
            ));
        }
        if self.grover.shots == 0 {
            return Err(ConfigError::Validation(
                "shots must be greater than zero".into(),
            ));
        }
        if parse_bits(&self.grover.target).is_none() {
            return Err(ConfigError::Validation(format!(
                "target must be a non-empty binary string, got {:?}",
                self.grover.target
            )));
        }
        self.quantum_channel()?;
        self.classical_channel()?;
        Ok(())
    }

    /// Configured node names, or the defaults derived from the search target.
    pub fn node_names(&self) -> Vec<String> {
        match &self.network.nodes {
            Some(nodes) => nodes.clone(),
            None => default_node_names(&self.grover.target),
        }
    }

    pub fn build_nodes(&self) -> Vec<Node> {
        self.node_names()
            .into_iter()
            .map(|name| Node::new(name, self.network.qubits_per_node))
            .collect()
    }

    pub fn quantum_channel(&self) -> Result<QuantumChannel, ConfigError> {
        Ok(QuantumChannel::new(
            self.channel.delay_secs,
            self.channel.eavesdrop_rate,
        )?)
    }

    pub fn classical_channel(&self) -> Result<ClassicalChannel, ConfigError> {
        Ok(ClassicalChannel::new(self.channel.delay_secs)?)
    }
}
