//! Pod ejection: hand the wallet back to its owners and tear the pod down

use super::policy;
use crate::world::Tx;
use pod_types::{
    Address, PodError, PodEventKind, PodId, PodResult, PodStatus, WalletCall, WalletError,
};
use std::collections::BTreeSet;
use tracing::{info, warn};

pub(crate) fn eject_safe(
    tx: &mut Tx<'_>,
    controller: &Address,
    caller: &Address,
    pod_id: PodId,
    label: Option<&str>,
    previous_module: Option<Address>,
    members: Option<&[Address]>,
) -> PodResult<()> {
    let record = tx.record(controller, pod_id)?.clone();
    policy::ensure_admin_else_wallet(&record, caller, pod_id)?;
    let wallet = record.wallet;

    if let Some(label) = label {
        if tx.world.naming.resolve(label).as_ref() != Some(&wallet) {
            return Err(PodError::LabelSafeMismatch {
                label: label.to_string(),
                wallet,
            });
        }
    }

    let holders = tx.world.ledger.members(pod_id);
    if let Some(members) = members {
        let supplied: BTreeSet<&Address> = members.iter().collect();
        let current: BTreeSet<&Address> = holders.iter().collect();
        if supplied.len() != members.len() || supplied != current {
            return Err(PodError::IncompleteMemberSet(pod_id));
        }
    }

    // Burns leave the wallet owners in place
    for member in &holders {
        tx.world.ledger.apply_burn(pod_id, member)?;
        tx.emit(Some(pod_id), caller, PodEventKind::MemberBurned { member: member.clone() });
    }

    release_wallet(tx, controller, &wallet, previous_module)?;

    if let Some(label) = label {
        let node = tx.world.naming.node_for(label);
        match tx.world.naming.deregister(&node) {
            Ok(()) => tx.emit(
                Some(pod_id),
                caller,
                PodEventKind::NameDeregistered {
                    label: label.to_string(),
                },
            ),
            Err(err) => {
                warn!(pod = %pod_id, label, error = %err, "Label deregistration failed");
                tx.emit(
                    Some(pod_id),
                    caller,
                    PodEventKind::NameDeregistrationFailed {
                        label: label.to_string(),
                        reason: err.to_string(),
                    },
                );
            }
        }
    }

    tx.book_mut(controller).remove(pod_id, PodStatus::Ejected);
    tx.world.retired_wallets.insert(wallet.clone());
    tx.world.ledger.retire_pod(controller, pod_id)?;

    tx.emit(Some(pod_id), caller, PodEventKind::PodEjected { wallet: wallet.clone() });
    info!(pod = %pod_id, wallet = %wallet, burned = holders.len(), "Pod ejected");
    Ok(())
}

/// Clear the guard and disable the module, unless the owners already did
fn release_wallet(
    tx: &mut Tx<'_>,
    controller: &Address,
    wallet: &Address,
    previous_module: Option<Address>,
) -> PodResult<()> {
    let (current, guarded) = {
        let w = tx.wallet(wallet)?;
        (w.find_predecessor(controller), w.guard().as_ref() == Some(controller))
    };
    let Some(current) = current else {
        warn!(wallet = %wallet, controller = %controller, "Module already disabled, skipping wallet teardown");
        return Ok(());
    };
    if let Some(supplied) = previous_module {
        if supplied != current {
            return Err(WalletError::InvalidPredecessor {
                prev: supplied,
                entry: controller.clone(),
            }
            .into());
        }
    }

    if guarded {
        tx.module_call(controller, wallet, &WalletCall::SetGuard { guard: None })?;
    }
    tx.module_call(
        controller,
        wallet,
        &WalletCall::DisableModule {
            prev_module: current,
            module: controller.clone(),
        },
    )
}
