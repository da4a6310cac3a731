//! Identifier newtypes: addresses, pod ids, and naming nodes

use serde::{Deserialize, Serialize};

/// An account, contract, or wallet address
///
/// Addresses are opaque. Generated addresses look like `0x` followed by
/// 32 hex characters; tests and scripts are free to use readable names.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Generate a new random address
    pub fn generate() -> Self {
        Self(format!("0x{}", uuid::Uuid::new_v4().simple()))
    }

    /// Create an address from a known string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Head marker of the wallet's owner and module lists
    pub fn sentinel() -> Self {
        Self("0x1".to_string())
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == "0x1"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short display form (first 10 chars)
    pub fn short(&self) -> String {
        self.0.chars().take(10).collect()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a pod (the membership token class)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct PodId(pub u64);

impl PodId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The id that follows this one
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for PodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pod#{}", self.0)
    }
}

/// A node in the naming service: the hash of a fully qualified name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Node(pub String);

impl Node {
    /// Derive the node for `label` under `root` (e.g. `orca` + `pod.xyz`)
    pub fn derive(label: &str, root: &str) -> Self {
        let name = if root.is_empty() {
            label.to_lowercase()
        } else {
            format!("{}.{}", label.to_lowercase(), root)
        };
        Self(blake3::hash(name.as_bytes()).to_hex().to_string())
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
