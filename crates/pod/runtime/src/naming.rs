//! In-memory naming service
//!
//! Labels live under a single root domain. Registration can be paused at
//! the front door; deregistration and text records are unaffected.

use pod_types::{Address, NamingError, NamingResult, NamingService, Node};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct NameRecord {
    label: String,
    target: Address,
    texts: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InMemoryNaming {
    root_domain: String,
    records: BTreeMap<Node, NameRecord>,
    paused: bool,
    /// Make every deregistration fail (exercises the best-effort path)
    #[serde(default)]
    fail_deregistration: bool,
}

impl InMemoryNaming {
    pub fn new(root_domain: impl Into<String>) -> Self {
        Self {
            root_domain: root_domain.into(),
            records: BTreeMap::new(),
            paused: false,
            fail_deregistration: false,
        }
    }

    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }

    /// Pause or resume new registrations
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_fail_deregistration(&mut self, fail: bool) {
        self.fail_deregistration = fail;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl NamingService for InMemoryNaming {
    fn register(&mut self, label: &str, target: &Address) -> NamingResult<Node> {
        if self.paused {
            return Err(NamingError::Paused);
        }
        if !valid_label(label) {
            return Err(NamingError::InvalidLabel(label.to_string()));
        }
        let node = self.node_for(label);
        if self.records.contains_key(&node) {
            return Err(NamingError::LabelTaken(label.to_string()));
        }
        self.records.insert(
            node.clone(),
            NameRecord {
                label: label.to_lowercase(),
                target: target.clone(),
                texts: BTreeMap::new(),
            },
        );
        Ok(node)
    }

    fn set_text(&mut self, node: &Node, key: &str, value: &str) -> NamingResult<()> {
        let record = self
            .records
            .get_mut(node)
            .ok_or_else(|| NamingError::UnknownNode(node.to_string()))?;
        record.texts.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn text(&self, node: &Node, key: &str) -> Option<String> {
        self.records.get(node)?.texts.get(key).cloned()
    }

    fn deregister(&mut self, node: &Node) -> NamingResult<()> {
        if self.fail_deregistration {
            return Err(NamingError::UnknownNode(node.to_string()));
        }
        self.records
            .remove(node)
            .map(|_| ())
            .ok_or_else(|| NamingError::UnknownNode(node.to_string()))
    }

    fn resolve(&self, label: &str) -> Option<Address> {
        self.records
            .get(&self.node_for(label))
            .map(|r| r.target.clone())
    }

    fn node_for(&self, label: &str) -> Node {
        Node::derive(label, &self.root_domain)
    }

    fn clone_box(&self) -> Box<dyn NamingService> {
        Box::new(self.clone())
    }
}

fn valid_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
