//! Membership Ledger - semi-fungible membership balances
//!
//! One token class per pod, at most one token per member. The ledger is
//! shared by every controller version and is the single source of truth
//! for which controller currently owns a pod. It stores state and checks
//! its own invariants; authorization is delegated to the controller hook
//! (see [`crate::membership`]).

use crate::registry::ControllerRegistry;
use pod_types::{Address, PodError, PodId, PodResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MembershipLedger {
    owner: Address,
    uri: String,
    holders: BTreeMap<PodId, BTreeSet<Address>>,
    total_supply: BTreeMap<PodId, u64>,
    controller_of: BTreeMap<PodId, Address>,
    retired: BTreeSet<PodId>,
    next_pod_id: PodId,
}

impl MembershipLedger {
    pub fn new(owner: Address, uri: impl Into<String>) -> Self {
        Self {
            owner,
            uri: uri.into(),
            holders: BTreeMap::new(),
            total_supply: BTreeMap::new(),
            controller_of: BTreeMap::new(),
            retired: BTreeSet::new(),
            next_pod_id: PodId::default(),
        }
    }

    /// Create a pod owned by `caller`, minting one token per initial owner
    ///
    /// Creation mints bypass the controller hook: the controller is the
    /// operator and the wallet already carries these owners.
    pub fn create_pod(
        &mut self,
        registry: &ControllerRegistry,
        caller: &Address,
        pod_id: PodId,
        initial_owners: &[Address],
    ) -> PodResult<()> {
        registry.ensure_registered(caller)?;
        if self.controller_of.contains_key(&pod_id) || self.retired.contains(&pod_id) {
            return Err(PodError::PodAlreadyExists(pod_id));
        }

        self.controller_of.insert(pod_id, caller.clone());
        self.total_supply.insert(pod_id, 0);
        self.holders.insert(pod_id, BTreeSet::new());
        for owner in initial_owners {
            self.apply_mint(pod_id, owner)?;
        }
        if pod_id >= self.next_pod_id {
            self.next_pod_id = pod_id.next();
        }

        info!(
            pod = %pod_id,
            controller = %caller,
            members = initial_owners.len(),
            "Pod created on ledger"
        );
        Ok(())
    }

    /// Repoint a pod at another registered controller
    pub fn migrate_controller(
        &mut self,
        registry: &ControllerRegistry,
        caller: &Address,
        pod_id: PodId,
        new_controller: &Address,
    ) -> PodResult<()> {
        let current = self.controller_for(pod_id)?;
        if current != caller {
            return Err(PodError::NotAuthorized(format!(
                "{} is not the controller of {}",
                caller, pod_id
            )));
        }
        registry.ensure_registered(new_controller)?;

        self.controller_of.insert(pod_id, new_controller.clone());
        info!(pod = %pod_id, from = %caller, to = %new_controller, "Ledger controller migrated");
        Ok(())
    }

    /// Clear a pod's controller for good; its id can never be created again
    pub fn retire_pod(&mut self, caller: &Address, pod_id: PodId) -> PodResult<()> {
        let current = self.controller_for(pod_id)?;
        if current != caller {
            return Err(PodError::NotAuthorized(format!(
                "{} is not the controller of {}",
                caller, pod_id
            )));
        }
        self.controller_of.remove(&pod_id);
        self.retired.insert(pod_id);
        debug!(pod = %pod_id, "Pod retired on ledger");
        Ok(())
    }

    pub(crate) fn apply_mint(&mut self, pod_id: PodId, to: &Address) -> PodResult<()> {
        let holders = self.holders.entry(pod_id).or_default();
        if !holders.insert(to.clone()) {
            return Err(PodError::AlreadyMember {
                pod_id,
                member: to.clone(),
            });
        }
        *self.total_supply.entry(pod_id).or_insert(0) += 1;
        Ok(())
    }

    pub(crate) fn apply_burn(&mut self, pod_id: PodId, from: &Address) -> PodResult<()> {
        let removed = self
            .holders
            .get_mut(&pod_id)
            .map(|h| h.remove(from))
            .unwrap_or(false);
        if !removed {
            return Err(PodError::NotMember {
                pod_id,
                member: from.clone(),
            });
        }
        if let Some(supply) = self.total_supply.get_mut(&pod_id) {
            *supply = supply.saturating_sub(1);
        }
        Ok(())
    }

    pub(crate) fn apply_transfer(
        &mut self,
        pod_id: PodId,
        from: &Address,
        to: &Address,
    ) -> PodResult<()> {
        if self.balance_of(to, pod_id) > 0 {
            return Err(PodError::AlreadyMember {
                pod_id,
                member: to.clone(),
            });
        }
        self.apply_burn(pod_id, from)?;
        self.apply_mint(pod_id, to)
    }

    /// Controller currently owning `pod_id`
    pub fn controller_for(&self, pod_id: PodId) -> PodResult<&Address> {
        self.controller_of
            .get(&pod_id)
            .ok_or(PodError::PodDoesNotExist(pod_id))
    }

    pub fn controller_of(&self, pod_id: PodId) -> Option<&Address> {
        self.controller_of.get(&pod_id)
    }

    /// The one controller shared by every pod in `pod_ids`
    ///
    /// Returns `None` for an empty list.
    pub fn common_controller(&self, pod_ids: &[PodId]) -> PodResult<Option<Address>> {
        let mut common: Option<&Address> = None;
        for pod_id in pod_ids {
            let controller = self.controller_for(*pod_id)?;
            match common {
                None => common = Some(controller),
                Some(c) if c == controller => {}
                Some(_) => return Err(PodError::ControllersMismatch),
            }
        }
        Ok(common.cloned())
    }

    pub fn balance_of(&self, member: &Address, pod_id: PodId) -> u64 {
        self.holders
            .get(&pod_id)
            .map(|h| u64::from(h.contains(member)))
            .unwrap_or(0)
    }

    pub fn total_supply(&self, pod_id: PodId) -> u64 {
        self.total_supply.get(&pod_id).copied().unwrap_or(0)
    }

    /// Current holders of a pod's token, in address order
    pub fn members(&self, pod_id: PodId) -> Vec<Address> {
        self.holders
            .get(&pod_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn next_available_pod_id(&self) -> PodId {
        self.next_pod_id
    }

    pub fn is_retired(&self, pod_id: PodId) -> bool {
        self.retired.contains(&pod_id)
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Token metadata URI for a pod
    pub fn uri_for(&self, pod_id: PodId) -> String {
        self.uri.replace("{id}", &pod_id.value().to_string())
    }

    pub fn set_uri(&mut self, caller: &Address, uri: impl Into<String>) -> PodResult<()> {
        if caller != &self.owner {
            return Err(PodError::NotOwner(caller.clone()));
        }
        self.uri = uri.into();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (MembershipLedger, ControllerRegistry, Address) {
        let owner = Address::new("owner");
        let mut registry = ControllerRegistry::new(owner.clone());
        let ctrl = Address::new("ctrl");
        registry.register_controller(&owner, ctrl.clone()).unwrap();
        (
            MembershipLedger::new(owner, "https://x/{id}.json"),
            registry,
            ctrl,
        )
    }

    #[test]
    fn test_create_pod_mints_initial_owners() {
        let (mut ledger, registry, ctrl) = setup();
        let pod = ledger.next_available_pod_id();
        ledger
            .create_pod(&registry, &ctrl, pod, &[Address::new("a"), Address::new("b")])
            .unwrap();

        assert_eq!(ledger.total_supply(pod), 2);
        assert_eq!(ledger.balance_of(&Address::new("a"), pod), 1);
        assert_eq!(ledger.controller_of(pod), Some(&ctrl));
        assert_eq!(ledger.next_available_pod_id(), PodId::new(1));
    }

    #[test]
    fn test_create_pod_requires_registered_controller() {
        let (mut ledger, registry, _) = setup();
        let result = ledger.create_pod(&registry, &Address::new("rogue"), PodId::new(0), &[]);
        assert!(matches!(result, Err(PodError::ControllerNotRegistered(_))));
    }

    #[test]
    fn test_duplicate_pod_id_rejected() {
        let (mut ledger, registry, ctrl) = setup();
        ledger.create_pod(&registry, &ctrl, PodId::new(0), &[]).unwrap();
        let result = ledger.create_pod(&registry, &ctrl, PodId::new(0), &[]);
        assert!(matches!(result, Err(PodError::PodAlreadyExists(_))));
    }

    #[test]
    fn test_retired_pod_id_is_never_reused() {
        let (mut ledger, registry, ctrl) = setup();
        ledger.create_pod(&registry, &ctrl, PodId::new(0), &[]).unwrap();
        ledger.retire_pod(&ctrl, PodId::new(0)).unwrap();

        assert!(ledger.controller_of(PodId::new(0)).is_none());
        assert!(matches!(
            ledger.create_pod(&registry, &ctrl, PodId::new(0), &[]),
            Err(PodError::PodAlreadyExists(_))
        ));
        assert_eq!(ledger.next_available_pod_id(), PodId::new(1));
    }

    #[test]
    fn test_single_token_per_member() {
        let (mut ledger, registry, ctrl) = setup();
        let pod = PodId::new(0);
        ledger.create_pod(&registry, &ctrl, pod, &[Address::new("a")]).unwrap();

        assert!(matches!(
            ledger.apply_mint(pod, &Address::new("a")),
            Err(PodError::AlreadyMember { .. })
        ));
        assert!(matches!(
            ledger.apply_burn(pod, &Address::new("z")),
            Err(PodError::NotMember { .. })
        ));
        ledger
            .apply_transfer(pod, &Address::new("a"), &Address::new("c"))
            .unwrap();
        assert_eq!(ledger.members(pod), vec![Address::new("c")]);
        assert_eq!(ledger.total_supply(pod), 1);
    }

    #[test]
    fn test_migrate_controller_checks() {
        let (mut ledger, mut registry, ctrl) = setup();
        let pod = PodId::new(0);
        ledger.create_pod(&registry, &ctrl, pod, &[]).unwrap();

        let v2 = Address::new("ctrl-v2");
        assert!(matches!(
            ledger.migrate_controller(&registry, &ctrl, pod, &v2),
            Err(PodError::ControllerNotRegistered(_))
        ));

        registry
            .register_controller(&Address::new("owner"), v2.clone())
            .unwrap();
        assert!(matches!(
            ledger.migrate_controller(&registry, &v2, pod, &v2),
            Err(PodError::NotAuthorized(_))
        ));
        ledger.migrate_controller(&registry, &ctrl, pod, &v2).unwrap();
        assert_eq!(ledger.controller_of(pod), Some(&v2));
    }

    #[test]
    fn test_common_controller() {
        let (mut ledger, mut registry, ctrl) = setup();
        let other = Address::new("ctrl-2");
        registry
            .register_controller(&Address::new("owner"), other.clone())
            .unwrap();
        ledger.create_pod(&registry, &ctrl, PodId::new(0), &[]).unwrap();
        ledger.create_pod(&registry, &ctrl, PodId::new(1), &[]).unwrap();
        ledger.create_pod(&registry, &other, PodId::new(2), &[]).unwrap();

        assert_eq!(
            ledger
                .common_controller(&[PodId::new(0), PodId::new(1)])
                .unwrap(),
            Some(ctrl)
        );
        assert!(matches!(
            ledger.common_controller(&[PodId::new(0), PodId::new(2)]),
            Err(PodError::ControllersMismatch)
        ));
        assert_eq!(ledger.common_controller(&[]).unwrap(), None);
    }

    #[test]
    fn test_uri_is_owner_gated() {
        let (mut ledger, _, _) = setup();
        assert_eq!(ledger.uri_for(PodId::new(3)), "https://x/3.json");
        assert!(ledger.set_uri(&Address::new("mallory"), "x").is_err());
        ledger.set_uri(&Address::new("owner"), "ipfs://{id}").unwrap();
        assert_eq!(ledger.uri_for(PodId::new(3)), "ipfs://3");
    }
}
