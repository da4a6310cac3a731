//! Standard authorization policy shared by every controller version

use super::OwnerSync;
use pod_types::{
    Address, MembershipOp, MembershipRequest, PodError, PodId, PodRecord, PodResult, WalletCall,
};

/// Decide whether a ledger mint, burn or transfer may proceed
pub fn authorize_membership(record: Option<&PodRecord>, request: &MembershipRequest) -> PodResult<()> {
    let record = record.ok_or(PodError::NoRulesSet(request.pod_id))?;
    let operator = &request.operator;

    match request.op {
        // With no admin, is_admin is false and only the wallet passes
        MembershipOp::Mint | MembershipOp::Burn => {
            if record.is_admin_or_wallet(operator) {
                Ok(())
            } else {
                Err(denied(request))
            }
        }
        MembershipOp::Transfer => {
            if record.transfer_locked {
                return Err(PodError::PodTransferLocked(request.pod_id));
            }
            let holder = request.from.as_ref() == Some(operator);
            if holder || record.is_admin_or_wallet(operator) {
                Ok(())
            } else {
                Err(denied(request))
            }
        }
    }
}

/// Guard pre-check for a call the wallet executes on itself
///
/// Owner-set changes are refused outright by controllers that do not mirror
/// them, and by every controller while the module lock is on.
pub fn check_wallet_call(
    controller: &Address,
    pod_id: PodId,
    record: &PodRecord,
    call: &WalletCall,
    owner_sync: OwnerSync,
) -> PodResult<()> {
    if call.changes_owners() && (owner_sync == OwnerSync::Reject || record.module_locked) {
        return Err(PodError::OwnerChangeOutsideLedger(pod_id));
    }
    if !record.module_locked {
        return Ok(());
    }

    match call {
        WalletCall::DisableModule { module, .. } if module == controller => {
            Err(PodError::CannotDisableModule(pod_id))
        }
        WalletCall::EnableModule { .. } => Err(PodError::CannotEnableModule(pod_id)),
        WalletCall::SetGuard { guard } if guard.as_ref() != Some(controller) => {
            Err(PodError::CannotChangeGuard(pod_id))
        }
        _ => Ok(()),
    }
}

/// Admin-gated or wallet-gated, depending on whether the pod has an admin
pub(crate) fn ensure_admin_else_wallet(record: &PodRecord, caller: &Address, pod_id: PodId) -> PodResult<()> {
    match &record.admin {
        Some(admin) if admin != caller => Err(PodError::MustBeAdmin(pod_id)),
        None if !record.is_wallet(caller) => Err(PodError::NotAuthorized(format!(
            "{} is not the wallet of {}",
            caller, pod_id
        ))),
        _ => Ok(()),
    }
}

fn denied(request: &MembershipRequest) -> PodError {
    PodError::NotAuthorized(format!(
        "{} may not {} on {}",
        request.operator, request.op, request.pod_id
    ))
}
