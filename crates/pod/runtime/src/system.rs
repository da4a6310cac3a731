//! Pod System - the transactional entry point
//!
//! [`PodSystem`] owns the world state and the installed controllers. Every
//! mutating call runs against a staged copy of the world and is committed
//! only if the whole call graph succeeds, so the ledger, the controller
//! books, the wallets and the naming service never disagree.

use crate::{
    config::PodSystemConfig,
    controller::{
        ejection, guard, lifecycle, migration, ControllerV1, ControllerV2, ControllerVersion,
        PodAuthority,
    },
    ledger::MembershipLedger,
    membership, multi_create,
    naming::InMemoryNaming,
    registry::ControllerRegistry,
    wallet::InMemoryWalletFactory,
    world::{Tx, World},
};
use pod_types::{
    Address, EventJournal, MultiCreateBatch, NamingService, PodError, PodEventKind, PodId,
    PodRecord, PodResult, PodStatus, SharedWallet, WalletCall, WalletFactory,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The pod authority core
pub struct PodSystem {
    /// Committed state
    world: World,
    /// Events of committed operations; never staged
    journal: EventJournal,
    /// Installed controllers by address
    authorities: BTreeMap<Address, Arc<dyn PodAuthority>>,
    /// Wallet provisioning
    factory: Arc<dyn WalletFactory>,
    config: PodSystemConfig,
}

impl PodSystem {
    /// Create a system backed by the in-memory wallet factory and naming service
    pub fn new(config: PodSystemConfig) -> Self {
        let naming = InMemoryNaming::new(config.naming.root_domain.clone());
        Self::with_collaborators(config, Arc::new(InMemoryWalletFactory::new()), Box::new(naming))
    }

    /// Create with custom collaborators
    pub fn with_collaborators(
        config: PodSystemConfig,
        factory: Arc<dyn WalletFactory>,
        naming: Box<dyn NamingService>,
    ) -> Self {
        let owner = Address::new(config.ledger.owner.clone());
        let registry = ControllerRegistry::new(owner.clone());
        let ledger = MembershipLedger::new(owner.clone(), config.ledger.uri.clone());

        info!(owner = %owner, root = %config.naming.root_domain, "Pod system created");

        Self {
            world: World::new(registry, ledger, naming),
            journal: EventJournal::new(),
            authorities: BTreeMap::new(),
            factory,
            config,
        }
    }

    pub fn config(&self) -> &PodSystemConfig {
        &self.config
    }

    /// Owner of the registry and the ledger
    pub fn owner(&self) -> &Address {
        self.world.registry.owner()
    }

    // =========================================================================
    // CONTROLLERS
    // =========================================================================

    /// Install a controller; registers it too when auto-registration is on
    ///
    /// An address holds one authority for its lifetime.
    pub fn install_controller(&mut self, authority: Arc<dyn PodAuthority>) -> PodResult<Address> {
        let address = authority.address().clone();
        if self.authorities.contains_key(&address) {
            return Err(PodError::ControllerAlreadyInstalled(address));
        }
        let version = authority.version();
        self.authorities.insert(address.clone(), authority);
        info!(controller = %address, version = %version, "Controller installed");

        if self.config.controllers.auto_register {
            let owner = self.owner().clone();
            self.register_controller(&owner, &address)?;
        }
        Ok(address)
    }

    /// Install a fresh controller of the given version
    pub fn deploy_controller(&mut self, version: ControllerVersion) -> PodResult<Address> {
        let authority: Arc<dyn PodAuthority> = match version {
            ControllerVersion::V1 => Arc::new(ControllerV1::generate()),
            ControllerVersion::V2 => Arc::new(ControllerV2::generate()),
        };
        self.install_controller(authority)
    }

    pub fn register_controller(&mut self, caller: &Address, controller: &Address) -> PodResult<()> {
        self.transact("register_controller", |tx| {
            if tx.world.registry.register_controller(caller, controller.clone())? {
                tx.emit(
                    None,
                    caller,
                    PodEventKind::ControllerRegistered {
                        controller: controller.clone(),
                    },
                );
            }
            Ok(())
        })
    }

    pub fn remove_controller(&mut self, caller: &Address, controller: &Address) -> PodResult<()> {
        self.transact("remove_controller", |tx| {
            if tx.world.registry.remove_controller(caller, controller)? {
                tx.emit(
                    None,
                    caller,
                    PodEventKind::ControllerRemoved {
                        controller: controller.clone(),
                    },
                );
            }
            Ok(())
        })
    }

    pub fn is_registered(&self, controller: &Address) -> bool {
        self.world.registry.is_registered(controller)
    }

    pub fn controllers(&self) -> Vec<Address> {
        self.world.registry.controllers()
    }

    pub fn authority(&self, controller: &Address) -> Option<Arc<dyn PodAuthority>> {
        self.authorities.get(controller).cloned()
    }

    /// Operate on one installed controller
    pub fn controller(&mut self, address: &Address) -> PodResult<ControllerHandle<'_>> {
        if !self.authorities.contains_key(address) {
            return Err(PodError::ControllerNotRegistered(address.clone()));
        }
        Ok(ControllerHandle {
            system: self,
            address: address.clone(),
        })
    }

    // =========================================================================
    // MEMBERSHIP LEDGER
    // =========================================================================

    pub fn mint(&mut self, caller: &Address, to: &Address, pod_id: PodId) -> PodResult<()> {
        self.transact("mint", |tx| membership::mint(tx, caller, to, pod_id))
    }

    pub fn burn(&mut self, caller: &Address, from: &Address, pod_id: PodId) -> PodResult<()> {
        self.transact("burn", |tx| membership::burn(tx, caller, from, pod_id))
    }

    pub fn transfer(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        pod_id: PodId,
    ) -> PodResult<()> {
        self.transact("transfer", |tx| {
            membership::transfer(tx, caller, from, to, pod_id)
        })
    }

    pub fn mint_batch(&mut self, caller: &Address, to: &Address, pod_ids: &[PodId]) -> PodResult<()> {
        self.transact("mint_batch", |tx| {
            membership::mint_batch(tx, caller, to, pod_ids)
        })
    }

    pub fn burn_batch(&mut self, caller: &Address, from: &Address, pod_ids: &[PodId]) -> PodResult<()> {
        self.transact("burn_batch", |tx| {
            membership::burn_batch(tx, caller, from, pod_ids)
        })
    }

    pub fn transfer_batch(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        pod_ids: &[PodId],
    ) -> PodResult<()> {
        self.transact("transfer_batch", |tx| {
            membership::transfer_batch(tx, caller, from, to, pod_ids)
        })
    }

    /// Change the token metadata URI (ledger owner only)
    pub fn set_uri(&mut self, caller: &Address, uri: &str) -> PodResult<()> {
        self.transact("set_uri", |tx| {
            tx.world.ledger.set_uri(caller, uri)?;
            tx.emit(None, caller, PodEventKind::UriUpdated { uri: uri.to_string() });
            Ok(())
        })
    }

    pub fn ledger(&self) -> &MembershipLedger {
        &self.world.ledger
    }

    // =========================================================================
    // WALLETS
    // =========================================================================

    /// Provision a wallet outside any pod, e.g. for `create_pod_with_safe`
    pub fn deploy_wallet(&mut self, owners: &[Address], threshold: u32) -> PodResult<Address> {
        let wallet = self
            .factory
            .deploy(owners, threshold)
            .map_err(|e| PodError::WalletSetupFailed(e.to_string()))?;
        self.adopt_wallet(wallet)
    }

    /// Track an externally provisioned wallet
    pub fn adopt_wallet(&mut self, wallet: Box<dyn SharedWallet>) -> PodResult<Address> {
        let address = wallet.address().clone();
        if self.world.wallets.contains_key(&address) {
            return Err(PodError::WalletAlreadyInUse(address));
        }
        self.world.wallets.insert(address.clone(), wallet);
        debug!(wallet = %address, "Wallet tracked");
        Ok(address)
    }

    pub fn wallet(&self, address: &Address) -> Option<&dyn SharedWallet> {
        self.world.wallets.get(address).map(|w| w.as_ref())
    }

    /// Execute an approved transaction the wallet makes on itself, through
    /// its guard
    pub fn exec_wallet_transaction(&mut self, wallet: &Address, call: &WalletCall) -> PodResult<()> {
        self.transact("exec_wallet_transaction", |tx| {
            guard::exec_wallet_transaction(tx, wallet, call)
        })
    }

    /// Installed controllers enabled as modules on `wallet`
    pub fn authority_modules(&self, wallet: &Address) -> Vec<Address> {
        self.wallet(wallet)
            .map(|w| {
                w.modules()
                    .into_iter()
                    .filter(|m| self.authorities.contains_key(m))
                    .collect()
            })
            .unwrap_or_default()
    }

    // =========================================================================
    // NAMING & JOURNAL
    // =========================================================================

    pub fn naming(&self) -> &dyn NamingService {
        self.world.naming.as_ref()
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Record of a live pod, from whichever controller owns it
    pub fn pod(&self, pod_id: PodId) -> Option<&PodRecord> {
        let controller = self.world.ledger.controller_of(pod_id)?;
        self.world.books.get(controller)?.get(pod_id)
    }

    pub fn is_wallet_retired(&self, wallet: &Address) -> bool {
        self.world.retired_wallets.contains(wallet)
    }

    /// Ledger holders equal wallet owners and the total supply agrees
    pub fn is_consistent(&self, pod_id: PodId) -> bool {
        let Some(record) = self.pod(pod_id) else {
            return false;
        };
        let Some(wallet) = self.wallet(&record.wallet) else {
            return false;
        };
        let owners: BTreeSet<Address> = wallet.owners().into_iter().collect();
        let holders: BTreeSet<Address> = self.world.ledger.members(pod_id).into_iter().collect();
        owners == holders && self.world.ledger.total_supply(pod_id) == owners.len() as u64
    }

    // =========================================================================
    // ATOMICITY
    // =========================================================================

    /// Run `f` against a staged copy of the world; commit only on success
    ///
    /// The copy covers live state only. Events are buffered on the
    /// transaction and appended to the journal on commit.
    fn transact<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Tx<'_>) -> PodResult<T>,
    ) -> PodResult<T> {
        let mut staged = self.world.clone();
        let mut tx = Tx::new(
            &mut staged,
            &self.authorities,
            self.factory.as_ref(),
            &self.config,
        );
        let result = f(&mut tx);
        let events = tx.into_events();

        match result {
            Ok(value) => {
                self.world = staged;
                for event in events {
                    self.journal.record(event);
                }
                debug!(op, "Committed");
                Ok(value)
            }
            Err(err) => {
                warn!(op, error = %err, class = ?err.class(), "Reverted");
                Err(err)
            }
        }
    }
}

/// A borrowed view of one controller
pub struct ControllerHandle<'a> {
    system: &'a mut PodSystem,
    address: Address,
}

impl ControllerHandle<'_> {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn version(&self) -> Option<ControllerVersion> {
        self.system.authorities.get(&self.address).map(|a| a.version())
    }

    pub fn create_pod(
        &mut self,
        caller: &Address,
        members: &[Address],
        threshold: u32,
        admin: Option<Address>,
        label: Option<&str>,
    ) -> PodResult<PodId> {
        let controller = self.address.clone();
        self.system.transact("create_pod", |tx| {
            lifecycle::create_pod(tx, &controller, caller, members, threshold, admin, label)
        })
    }

    pub fn create_pod_with_safe(
        &mut self,
        caller: &Address,
        admin: Option<Address>,
        wallet: &Address,
        label: Option<&str>,
    ) -> PodResult<PodId> {
        let controller = self.address.clone();
        self.system.transact("create_pod_with_safe", |tx| {
            lifecycle::create_pod_with_safe(tx, &controller, caller, admin, wallet, label)
        })
    }

    pub fn update_pod_admin(
        &mut self,
        caller: &Address,
        pod_id: PodId,
        new_admin: Option<Address>,
    ) -> PodResult<()> {
        let controller = self.address.clone();
        self.system.transact("update_pod_admin", |tx| {
            lifecycle::update_pod_admin(tx, &controller, caller, pod_id, new_admin)
        })
    }

    pub fn set_pod_module_lock(&mut self, caller: &Address, pod_id: PodId, locked: bool) -> PodResult<()> {
        let controller = self.address.clone();
        self.system.transact("set_pod_module_lock", |tx| {
            lifecycle::set_pod_module_lock(tx, &controller, caller, pod_id, locked)
        })
    }

    pub fn set_pod_transfer_lock(&mut self, caller: &Address, pod_id: PodId, locked: bool) -> PodResult<()> {
        let controller = self.address.clone();
        self.system.transact("set_pod_transfer_lock", |tx| {
            lifecycle::set_pod_transfer_lock(tx, &controller, caller, pod_id, locked)
        })
    }

    /// Hand a pod over to `new_controller`
    ///
    /// `module_predecessor` is the entry before this controller in the
    /// wallet's module list; it is looked up when omitted.
    pub fn migrate_pod_controller(
        &mut self,
        caller: &Address,
        pod_id: PodId,
        new_controller: &Address,
        module_predecessor: Option<Address>,
    ) -> PodResult<()> {
        let controller = self.address.clone();
        self.system.transact("migrate_pod_controller", |tx| {
            migration::migrate_pod_controller(
                tx,
                &controller,
                caller,
                pod_id,
                new_controller,
                module_predecessor,
            )
        })
    }

    /// Tear a pod down and leave its wallet to the owners
    pub fn eject_safe(
        &mut self,
        caller: &Address,
        pod_id: PodId,
        label: Option<&str>,
        previous_module: Option<Address>,
        members: Option<&[Address]>,
    ) -> PodResult<()> {
        let controller = self.address.clone();
        self.system.transact("eject_safe", |tx| {
            ejection::eject_safe(tx, &controller, caller, pod_id, label, previous_module, members)
        })
    }

    /// Create every pod in `batch`, or none
    pub fn multi_create(&mut self, caller: &Address, batch: &MultiCreateBatch) -> PodResult<Vec<PodId>> {
        let controller = self.address.clone();
        self.system.transact("multi_create", |tx| {
            multi_create::multi_create(tx, &controller, caller, batch)
        })
    }

    pub fn pod(&self, pod_id: PodId) -> Option<&PodRecord> {
        self.system.world.books.get(&self.address)?.get(pod_id)
    }

    pub fn pod_status(&self, pod_id: PodId) -> PodStatus {
        self.system
            .world
            .books
            .get(&self.address)
            .map(|b| b.status(pod_id))
            .unwrap_or_default()
    }

    pub fn pod_for_wallet(&self, wallet: &Address) -> Option<PodId> {
        self.system.world.books.get(&self.address)?.pod_for_wallet(wallet)
    }

    pub fn pod_ids(&self) -> Vec<PodId> {
        self.system
            .world
            .books
            .get(&self.address)
            .map(|b| b.pod_ids())
            .unwrap_or_default()
    }
}
