//! Naming service contract
//!
//! Controllers call the naming service; it never calls back.

use crate::{Address, NamingResult, Node};

/// Human-readable registration of pod wallets
pub trait NamingService: std::fmt::Debug + Send + Sync {
    /// Register `label` under the service's root, pointing at `target`
    fn register(&mut self, label: &str, target: &Address) -> NamingResult<Node>;

    fn set_text(&mut self, node: &Node, key: &str, value: &str) -> NamingResult<()>;

    fn text(&self, node: &Node, key: &str) -> Option<String>;

    fn deregister(&mut self, node: &Node) -> NamingResult<()>;

    /// Address `label` currently points at
    fn resolve(&self, label: &str) -> Option<Address>;

    /// Node that `label` maps to under this service's root
    fn node_for(&self, label: &str) -> Node;

    fn clone_box(&self) -> Box<dyn NamingService>;
}

impl Clone for Box<dyn NamingService> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
