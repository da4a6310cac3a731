//! Wallet guard integration
//!
//! Transactions a wallet executes on itself pass through the controller set
//! as its guard: a pre-check before the call, and a post-check after it.

use super::{OwnerSync, PodAuthority};
use crate::membership;
use crate::world::Tx;
use pod_types::{Address, PodError, PodEventKind, PodId, PodResult, WalletCall};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Execute an already-approved administrative call on `wallet`
pub(crate) fn exec_wallet_transaction(tx: &mut Tx<'_>, wallet: &Address, call: &WalletCall) -> PodResult<()> {
    let guarded = guarded_pod(tx, wallet)?;

    if let Some((authority, pod_id)) = &guarded {
        let record = tx.record(authority.address(), *pod_id)?;
        if let Err(err) = authority.check_transaction(*pod_id, record, call) {
            warn!(pod = %pod_id, wallet = %wallet, call = call.name(), error = %err, "Guard rejected transaction");
            return Err(err);
        }
    }

    tx.wallet_mut(wallet)?.apply(call)?;

    let mut pod_id = guarded.as_ref().map(|(_, pod_id)| *pod_id);
    if let Some((authority, pod_id)) = guarded {
        if call.changes_owners() && authority.owner_sync() == OwnerSync::Mirror {
            membership::sync_from_wallet(tx, pod_id, wallet)?;
        }
    }
    if let WalletCall::SetGuard { guard: Some(_) } = call {
        if let Some((authority, attached)) = guarded_pod(tx, wallet)? {
            reattach(tx, authority.as_ref(), attached, wallet)?;
            pod_id = Some(attached);
        }
    }

    tx.emit(
        pod_id,
        wallet,
        PodEventKind::WalletTransaction {
            call: call.name().to_string(),
        },
    );
    info!(wallet = %wallet, call = call.name(), "Wallet transaction executed");
    Ok(())
}

/// Owners may have changed while the guard was cleared; the ledger catches
/// up, or the attach is refused by controllers that do not mirror
fn reattach(tx: &mut Tx<'_>, authority: &dyn PodAuthority, pod_id: PodId, wallet: &Address) -> PodResult<()> {
    if authority.owner_sync() == OwnerSync::Mirror {
        return membership::sync_from_wallet(tx, pod_id, wallet);
    }
    let owners: BTreeSet<Address> = tx.wallet(wallet)?.owners().into_iter().collect();
    let holders: BTreeSet<Address> = tx.world.ledger.members(pod_id).into_iter().collect();
    if owners != holders {
        warn!(pod = %pod_id, wallet = %wallet, "Owners drifted while detached; attach refused");
        return Err(PodError::OwnerChangeOutsideLedger(pod_id));
    }
    Ok(())
}

/// The authority guarding `wallet` and the pod it guards, if any
fn guarded_pod(
    tx: &Tx<'_>,
    wallet: &Address,
) -> PodResult<Option<(Arc<dyn PodAuthority>, PodId)>> {
    let Some(guard) = tx.wallet(wallet)?.guard() else {
        return Ok(None);
    };
    let Ok(authority) = tx.authority(&guard) else {
        return Ok(None);
    };
    let pod_id = tx
        .world
        .books
        .get(&guard)
        .and_then(|book| book.pod_for_wallet(wallet));
    Ok(pod_id.map(|pod_id| (authority, pod_id)))
}
