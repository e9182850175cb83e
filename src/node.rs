use std::collections::HashMap;

/// A participant of the quantum network.
///
/// Holds the keys it has agreed with its peers. Keys are only ever written by a
/// successful key exchange and are never removed during a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    name: String,
    num_qubits: usize,
    shared_keys: HashMap<String, String>,
}

impl Node {
    pub fn new(name: impl Into<String>, num_qubits: usize) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            shared_keys: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qubit capacity. Informational only.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Stores (or replaces) the key shared with `peer`.
    pub fn store_shared_key(&mut self, peer: impl Into<String>, key: impl Into<String>) {
        self.shared_keys.insert(peer.into(), key.into());
    }

    pub fn shared_key(&self, peer: &str) -> Option<&str> {
        self.shared_keys.get(peer).map(String::as_str)
    }

    /// Names of every peer this node shares a key with, sorted.
    pub fn peers(&self) -> Vec<&str> {
        let mut peers: Vec<&str> = self.shared_keys.keys().map(String::as_str).collect();
        peers.sort_unstable();
        peers
    }
}
