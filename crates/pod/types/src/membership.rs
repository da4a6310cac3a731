//! Membership requests and batch-creation slots

use crate::{Address, PodId};
use serde::{Deserialize, Serialize};

/// A membership-token mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipOp {
    Mint,
    Burn,
    Transfer,
}

impl std::fmt::Display for MembershipOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mint => write!(f, "mint"),
            Self::Burn => write!(f, "burn"),
            Self::Transfer => write!(f, "transfer"),
        }
    }
}

/// What the ledger asks a controller to authorize
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRequest {
    pub op: MembershipOp,
    pub pod_id: PodId,
    /// Whoever invoked the ledger
    pub operator: Address,
    /// Token source (burn, transfer)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Token destination (mint, transfer)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
}

impl MembershipRequest {
    pub fn mint(pod_id: PodId, operator: Address, to: Address) -> Self {
        Self {
            op: MembershipOp::Mint,
            pod_id,
            operator,
            from: None,
            to: Some(to),
        }
    }

    pub fn burn(pod_id: PodId, operator: Address, from: Address) -> Self {
        Self {
            op: MembershipOp::Burn,
            pod_id,
            operator,
            from: Some(from),
            to: None,
        }
    }

    pub fn transfer(pod_id: PodId, operator: Address, from: Address, to: Address) -> Self {
        Self {
            op: MembershipOp::Transfer,
            pod_id,
            operator,
            from: Some(from),
            to: Some(to),
        }
    }

    /// The member whose standing changes (recipient for mints)
    pub fn subject(&self) -> Option<&Address> {
        match self.op {
            MembershipOp::Mint => self.to.as_ref(),
            MembershipOp::Burn | MembershipOp::Transfer => self.from.as_ref(),
        }
    }
}

/// An address, or a pointer to the wallet of an earlier pod in the same batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressSlot {
    Pointer { pointer: usize },
    Literal(Address),
}

impl AddressSlot {
    pub fn literal(address: impl Into<String>) -> Self {
        Self::Literal(Address::new(address))
    }

    pub fn pointer(index: usize) -> Self {
        Self::Pointer { pointer: index }
    }

    pub fn pointer_index(&self) -> Option<usize> {
        match self {
            Self::Pointer { pointer } => Some(*pointer),
            Self::Literal(_) => None,
        }
    }
}

impl From<Address> for AddressSlot {
    fn from(address: Address) -> Self {
        Self::Literal(address)
    }
}

/// Parallel arrays describing pods to create in one batch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiCreateBatch {
    pub members: Vec<Vec<AddressSlot>>,
    pub thresholds: Vec<u32>,
    pub admins: Vec<Option<AddressSlot>>,
    pub labels: Vec<Option<String>>,
}

impl MultiCreateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one pod to the batch
    pub fn with_pod(
        mut self,
        members: Vec<AddressSlot>,
        threshold: u32,
        admin: Option<AddressSlot>,
        label: Option<String>,
    ) -> Self {
        self.members.push(members);
        self.thresholds.push(threshold);
        self.admins.push(admin);
        self.labels.push(label);
        self
    }

    /// Number of pods, if all arrays agree
    pub fn consistent_len(&self) -> Option<usize> {
        let n = self.members.len();
        (self.thresholds.len() == n && self.admins.len() == n && self.labels.len() == n)
            .then_some(n)
    }
}
