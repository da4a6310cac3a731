//! Error types for pod operations

use crate::{Address, PodId};
use serde::{Deserialize, Serialize};

/// Errors that can occur in pod operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PodError {
    // --- authorization ---
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Must be admin of {0}")]
    MustBeAdmin(PodId),

    #[error("Only admin or safe may act on {0}")]
    OnlyAdminOrSafe(PodId),

    #[error("Only safe can set lock on {0}")]
    OnlySafeCanSetLock(PodId),

    #[error("Only safe can add admin to {0}")]
    OnlySafeCanAddAdmin(PodId),

    #[error("Only admin can update admin of {0}")]
    OnlyAdminCanUpdate(PodId),

    #[error("Caller {0} is not the owner")]
    NotOwner(Address),

    // --- state ---
    #[error("Pod does not exist: {0}")]
    PodDoesNotExist(PodId),

    #[error("Pod already exists: {0}")]
    PodAlreadyExists(PodId),

    #[error("Wallet already in use: {0}")]
    WalletAlreadyInUse(Address),

    #[error("Controller not registered: {0}")]
    ControllerNotRegistered(Address),

    /// The ledger names a controller that holds no record for the pod.
    /// `PodSystem` writes the ledger entry and the record in one
    /// transaction, so this only arises for authorities driven directly.
    #[error("No rules set for {0}")]
    NoRulesSet(PodId),

    #[error("Controller already installed: {0}")]
    ControllerAlreadyInstalled(Address),

    /// The wallet's guard is no longer the pod's controller
    #[error("Pod {0} is detached from its controller")]
    PodDetached(PodId),

    #[error("{member} is already a member of {pod_id}")]
    AlreadyMember { pod_id: PodId, member: Address },

    #[error("{member} is not a member of {pod_id}")]
    NotMember { pod_id: PodId, member: Address },

    #[error("Module {module} not enabled on wallet {wallet}")]
    ModuleNotEnabled { wallet: Address, module: Address },

    #[error("Wallet not found: {0}")]
    WalletNotFound(Address),

    // --- consistency guards ---
    #[error("Label {label} does not resolve to wallet {wallet}")]
    LabelSafeMismatch { label: String, wallet: Address },

    #[error("Supplied member set does not match holders of {0}")]
    IncompleteMemberSet(PodId),

    #[error("Pods in batch have different controllers")]
    ControllersMismatch,

    #[error("Pod {index} points at pod {pointer}, which is not created before it")]
    DependencyBadOrdering { index: usize, pointer: usize },

    #[error("Batch arrays have different lengths")]
    BatchLengthMismatch,

    #[error("Cannot migrate {0} to the controller that already holds it")]
    MigrationToSelf(PodId),

    #[error("Wallet owners of {0} must change through the membership ledger")]
    OwnerChangeOutsideLedger(PodId),

    // --- locks ---
    #[error("Pod is transfer locked: {0}")]
    PodTransferLocked(PodId),

    #[error("Cannot disable controller module while {0} is module locked")]
    CannotDisableModule(PodId),

    #[error("Cannot enable module while {0} is module locked")]
    CannotEnableModule(PodId),

    #[error("Cannot change guard while {0} is module locked")]
    CannotChangeGuard(PodId),

    // --- external collaborators ---
    #[error("Wallet setup failed: {0}")]
    WalletSetupFailed(String),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Naming error: {0}")]
    Naming(#[from] NamingError),
}

/// Coarse classification of [`PodError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Caller lacks authority; never retried
    Authorization,
    /// Caller must correct the request and resubmit
    State,
    /// Malformed batch, migration, or ejection input
    Consistency,
    /// Expected rejection, recoverable through an authorized unlock
    Lock,
    /// A collaborator (wallet, naming) rejected the call
    External,
}

impl PodError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotAuthorized(_)
            | Self::MustBeAdmin(_)
            | Self::OnlyAdminOrSafe(_)
            | Self::OnlySafeCanSetLock(_)
            | Self::OnlySafeCanAddAdmin(_)
            | Self::OnlyAdminCanUpdate(_)
            | Self::NotOwner(_) => ErrorClass::Authorization,

            Self::PodDoesNotExist(_)
            | Self::PodAlreadyExists(_)
            | Self::WalletAlreadyInUse(_)
            | Self::ControllerNotRegistered(_)
            | Self::NoRulesSet(_)
            | Self::ControllerAlreadyInstalled(_)
            | Self::PodDetached(_)
            | Self::AlreadyMember { .. }
            | Self::NotMember { .. }
            | Self::ModuleNotEnabled { .. }
            | Self::WalletNotFound(_) => ErrorClass::State,

            Self::LabelSafeMismatch { .. }
            | Self::IncompleteMemberSet(_)
            | Self::ControllersMismatch
            | Self::DependencyBadOrdering { .. }
            | Self::BatchLengthMismatch
            | Self::MigrationToSelf(_)
            | Self::OwnerChangeOutsideLedger(_) => ErrorClass::Consistency,

            Self::PodTransferLocked(_)
            | Self::CannotDisableModule(_)
            | Self::CannotEnableModule(_)
            | Self::CannotChangeGuard(_) => ErrorClass::Lock,

            Self::WalletSetupFailed(_) | Self::Wallet(_) | Self::Naming(_) => ErrorClass::External,
        }
    }

    /// Lock errors can be cleared by an authorized unlock
    pub fn is_recoverable(&self) -> bool {
        self.class() == ErrorClass::Lock
    }
}

/// Errors raised by a shared wallet
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("Wallet must have at least one owner")]
    NoOwners,

    #[error("Invalid threshold {threshold} for {owners} owners")]
    InvalidThreshold { threshold: u32, owners: usize },

    #[error("Invalid owner address: {0}")]
    InvalidOwner(Address),

    #[error("Duplicate owner: {0}")]
    DuplicateOwner(Address),

    #[error("Not an owner: {0}")]
    OwnerNotFound(Address),

    #[error("Invalid module address: {0}")]
    InvalidModule(Address),

    #[error("Module already enabled: {0}")]
    ModuleAlreadyEnabled(Address),

    #[error("Module not enabled: {0}")]
    ModuleNotEnabled(Address),

    #[error("Invalid predecessor {prev} for {entry}")]
    InvalidPredecessor { prev: Address, entry: Address },
}

/// Result type alias for wallet calls
pub type WalletResult<T> = Result<T, WalletError>;

/// Errors raised by a naming service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    #[error("Label already registered: {0}")]
    LabelTaken(String),

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Node not registered: {0}")]
    UnknownNode(String),

    #[error("Registrations are paused")]
    Paused,
}

/// Result type alias for naming calls
pub type NamingResult<T> = Result<T, NamingError>;

/// Result type alias for pod operations
pub type PodResult<T> = Result<T, PodError>;
