//! Pod metadata held by a controller

use crate::{Address, PodId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-pod metadata owned by the pod's current controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodRecord {
    /// The shared wallet bound to this pod
    pub wallet: Address,
    /// Optional admin; `None` means authority rests with the wallet owners
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<Address>,
    /// Wallet owners may not remove or replace the controller module
    pub module_locked: bool,
    /// Members may not transfer their tokens peer to peer
    pub transfer_locked: bool,
}

impl PodRecord {
    /// A fresh record; pods with an admin start module-locked
    pub fn new(wallet: Address, admin: Option<Address>) -> Self {
        let module_locked = admin.is_some();
        Self {
            wallet,
            admin,
            module_locked,
            transfer_locked: false,
        }
    }

    pub fn has_admin(&self) -> bool {
        self.admin.is_some()
    }

    pub fn is_admin(&self, who: &Address) -> bool {
        self.admin.as_ref() == Some(who)
    }

    pub fn is_wallet(&self, who: &Address) -> bool {
        &self.wallet == who
    }

    /// Caller is the admin or the wallet itself
    pub fn is_admin_or_wallet(&self, who: &Address) -> bool {
        self.is_admin(who) || self.is_wallet(who)
    }
}

/// Lifecycle of a pod as seen by one controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PodStatus {
    /// Never created under this controller
    #[default]
    NonExistent,
    /// Controlled by this controller
    Active,
    /// Handed off to another controller
    Migrated,
    /// Authority torn down; the id is retired
    Ejected,
}

/// A controller's exclusive store of pod records
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PodBook {
    records: BTreeMap<PodId, PodRecord>,
    by_wallet: BTreeMap<Address, PodId>,
    departed: BTreeMap<PodId, PodStatus>,
}

impl PodBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pod_id: PodId) -> Option<&PodRecord> {
        self.records.get(&pod_id)
    }

    pub fn get_mut(&mut self, pod_id: PodId) -> Option<&mut PodRecord> {
        self.records.get_mut(&pod_id)
    }

    pub fn contains(&self, pod_id: PodId) -> bool {
        self.records.contains_key(&pod_id)
    }

    pub fn pod_for_wallet(&self, wallet: &Address) -> Option<PodId> {
        self.by_wallet.get(wallet).copied()
    }

    /// Insert a record; a pod re-entering the book is active again
    pub fn insert(&mut self, pod_id: PodId, record: PodRecord) {
        self.by_wallet.insert(record.wallet.clone(), pod_id);
        self.records.insert(pod_id, record);
        self.departed.remove(&pod_id);
    }

    /// Remove a record, remembering why it left
    pub fn remove(&mut self, pod_id: PodId, reason: PodStatus) -> Option<PodRecord> {
        let record = self.records.remove(&pod_id)?;
        self.by_wallet.remove(&record.wallet);
        self.departed.insert(pod_id, reason);
        Some(record)
    }

    pub fn status(&self, pod_id: PodId) -> PodStatus {
        if self.records.contains_key(&pod_id) {
            PodStatus::Active
        } else {
            self.departed.get(&pod_id).copied().unwrap_or_default()
        }
    }

    pub fn pod_ids(&self) -> Vec<PodId> {
        self.records.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_implies_module_lock() {
        let locked = PodRecord::new(Address::new("w"), Some(Address::new("admin")));
        assert!(locked.module_locked);
        assert!(locked.is_admin_or_wallet(&Address::new("admin")));
        assert!(locked.is_admin_or_wallet(&Address::new("w")));

        let open = PodRecord::new(Address::new("w"), None);
        assert!(!open.module_locked);
        assert!(!open.transfer_locked);
    }

    #[test]
    fn test_book_status_transitions() {
        let mut book = PodBook::new();
        let pod = PodId::new(0);
        assert_eq!(book.status(pod), PodStatus::NonExistent);

        book.insert(pod, PodRecord::new(Address::new("w"), None));
        assert_eq!(book.status(pod), PodStatus::Active);
        assert_eq!(book.pod_for_wallet(&Address::new("w")), Some(pod));

        book.remove(pod, PodStatus::Migrated).unwrap();
        assert_eq!(book.status(pod), PodStatus::Migrated);
        assert!(book.pod_for_wallet(&Address::new("w")).is_none());
        assert!(book.is_empty());
    }
}
