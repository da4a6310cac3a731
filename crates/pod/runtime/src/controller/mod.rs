//! Controllers: the authority modules that mediate a pod's membership and
//! wallet configuration.
//!
//! Several controller versions coexist. Each is a [`PodAuthority`]
//! installed in the [`crate::PodSystem`] at its own address; the ledger's
//! `controller_of` entry decides which one a call is dispatched to. The
//! standard policy lives in [`policy`] and is shared through the trait's
//! provided methods; versions differ only where they override them.

pub(crate) mod ejection;
pub(crate) mod guard;
pub(crate) mod lifecycle;
pub(crate) mod migration;
pub mod policy;

use pod_types::{Address, MembershipRequest, PodId, PodRecord, PodResult, WalletCall};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Controller release line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerVersion {
    V1,
    V2,
}

impl fmt::Display for ControllerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

/// How a controller treats owner changes made directly on the wallet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerSync {
    /// The ledger is the only way to change owners
    Reject,
    /// Accept the change and mirror the new owner set into the ledger
    Mirror,
}

/// A controller version
pub trait PodAuthority: fmt::Debug + Send + Sync {
    fn address(&self) -> &Address;

    fn version(&self) -> ControllerVersion;

    fn owner_sync(&self) -> OwnerSync;

    /// Membership hook called by the ledger before a mint, burn or transfer
    ///
    /// `record` is `None` when the ledger names this controller but it holds
    /// no rules for the pod.
    fn authorize(&self, record: Option<&PodRecord>, request: &MembershipRequest) -> PodResult<()> {
        policy::authorize_membership(record, request)
    }

    /// Guard pre-check for a transaction the wallet executes on itself
    fn check_transaction(&self, pod_id: PodId, record: &PodRecord, call: &WalletCall) -> PodResult<()> {
        policy::check_wallet_call(self.address(), pod_id, record, call, self.owner_sync())
    }

    /// Adjust a record arriving through migration
    fn on_migrate_in(&self, record: PodRecord) -> PodRecord {
        record
    }
}

/// First controller release; owners only ever change through the ledger
#[derive(Clone, Debug)]
pub struct ControllerV1 {
    address: Address,
}

impl ControllerV1 {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn generate() -> Self {
        Self::new(Address::generate())
    }
}

impl PodAuthority for ControllerV1 {
    fn address(&self) -> &Address {
        &self.address
    }

    fn version(&self) -> ControllerVersion {
        ControllerVersion::V1
    }

    fn owner_sync(&self) -> OwnerSync {
        OwnerSync::Reject
    }
}

/// Second release; wallet owners of unlocked pods may change the owner set
/// directly and the ledger follows
#[derive(Clone, Debug)]
pub struct ControllerV2 {
    address: Address,
}

impl ControllerV2 {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn generate() -> Self {
        Self::new(Address::generate())
    }
}

impl PodAuthority for ControllerV2 {
    fn address(&self) -> &Address {
        &self.address
    }

    fn version(&self) -> ControllerVersion {
        ControllerVersion::V2
    }

    fn owner_sync(&self) -> OwnerSync {
        OwnerSync::Mirror
    }
}
