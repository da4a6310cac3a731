//! World state and the transaction context passed down every call graph
//!
//! [`World`] holds every store an operation can touch: the registry, the
//! ledger, the wallets, the naming service, and each controller's pod book.
//! [`crate::PodSystem`] stages a clone of it per operation and commits the
//! clone only on success. Events raised along the way wait on the [`Tx`]
//! until then.

use crate::controller::PodAuthority;
use crate::config::PodSystemConfig;
use crate::ledger::MembershipLedger;
use crate::registry::ControllerRegistry;
use pod_types::{
    Address, NamingService, PodBook, PodError, PodEvent, PodEventKind, PodId,
    PodRecord, PodResult, SharedWallet, WalletCall, WalletFactory,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct World {
    pub(crate) registry: ControllerRegistry,
    pub(crate) ledger: MembershipLedger,
    pub(crate) wallets: BTreeMap<Address, Box<dyn SharedWallet>>,
    pub(crate) naming: Box<dyn NamingService>,
    pub(crate) books: BTreeMap<Address, PodBook>,
    /// Wallets whose pod was ejected; never bound again
    pub(crate) retired_wallets: BTreeSet<Address>,
}

impl World {
    pub fn new(
        registry: ControllerRegistry,
        ledger: MembershipLedger,
        naming: Box<dyn NamingService>,
    ) -> Self {
        Self {
            registry,
            ledger,
            wallets: BTreeMap::new(),
            naming,
            books: BTreeMap::new(),
            retired_wallets: BTreeSet::new(),
        }
    }
}

/// Transaction context shared by one atomic operation
pub(crate) struct Tx<'a> {
    pub world: &'a mut World,
    authorities: &'a BTreeMap<Address, Arc<dyn PodAuthority>>,
    pub factory: &'a dyn WalletFactory,
    pub config: &'a PodSystemConfig,
    events: Vec<PodEvent>,
}

impl<'a> Tx<'a> {
    pub fn new(
        world: &'a mut World,
        authorities: &'a BTreeMap<Address, Arc<dyn PodAuthority>>,
        factory: &'a dyn WalletFactory,
        config: &'a PodSystemConfig,
    ) -> Self {
        Self {
            world,
            authorities,
            factory,
            config,
            events: Vec::new(),
        }
    }

    /// Installed authority at `controller`
    pub fn authority(&self, controller: &Address) -> PodResult<Arc<dyn PodAuthority>> {
        self.authorities
            .get(controller)
            .cloned()
            .ok_or_else(|| PodError::ControllerNotRegistered(controller.clone()))
    }

    pub fn book_record(&self, controller: &Address, pod_id: PodId) -> Option<&PodRecord> {
        self.world.books.get(controller)?.get(pod_id)
    }

    pub fn record(&self, controller: &Address, pod_id: PodId) -> PodResult<&PodRecord> {
        self.book_record(controller, pod_id)
            .ok_or(PodError::PodDoesNotExist(pod_id))
    }

    pub fn record_mut(&mut self, controller: &Address, pod_id: PodId) -> PodResult<&mut PodRecord> {
        self.world
            .books
            .get_mut(controller)
            .and_then(|b| b.get_mut(pod_id))
            .ok_or(PodError::PodDoesNotExist(pod_id))
    }

    pub fn book_mut(&mut self, controller: &Address) -> &mut PodBook {
        self.world.books.entry(controller.clone()).or_default()
    }

    pub fn wallet(&self, wallet: &Address) -> PodResult<&dyn SharedWallet> {
        self.world
            .wallets
            .get(wallet)
            .map(|w| w.as_ref())
            .ok_or_else(|| PodError::WalletNotFound(wallet.clone()))
    }

    pub fn wallet_mut(&mut self, wallet: &Address) -> PodResult<&mut Box<dyn SharedWallet>> {
        self.world
            .wallets
            .get_mut(wallet)
            .ok_or_else(|| PodError::WalletNotFound(wallet.clone()))
    }

    /// Bound to a live pod under any controller, or retired by ejection
    pub fn wallet_in_use(&self, wallet: &Address) -> bool {
        self.world.retired_wallets.contains(wallet)
            || self
                .world
                .books
                .values()
                .any(|b| b.pod_for_wallet(wallet).is_some())
    }

    /// The wallet still routes its transactions through `controller`
    ///
    /// Owners of an unlocked pod may clear the guard; from then on the
    /// wallet's owner set can move without the ledger seeing it.
    pub fn ensure_attached(&self, controller: &Address, pod_id: PodId, wallet: &Address) -> PodResult<()> {
        if self.wallet(wallet)?.guard().as_ref() != Some(controller) {
            return Err(PodError::PodDetached(pod_id));
        }
        Ok(())
    }

    /// Run `call` on `wallet` through the module at `module`
    pub fn module_call(&mut self, module: &Address, wallet: &Address, call: &WalletCall) -> PodResult<()> {
        self.wallet_mut(wallet)?
            .exec_transaction_from_module(module, call)?;
        Ok(())
    }

    pub fn emit(&mut self, pod_id: Option<PodId>, actor: &Address, kind: PodEventKind) {
        self.events.push(PodEvent::new(pod_id, actor.clone(), kind));
    }

    /// Events raised so far, in order
    pub fn into_events(self) -> Vec<PodEvent> {
        self.events
    }
}
