//! Membership hook protocol
//!
//! Every ledger mint, burn and transfer is routed through the pod's current
//! controller: resolve `controller_of`, ask the controller to authorize,
//! apply the balance change, then mirror it into the wallet's owner set
//! through the controller's module. The ledger and the wallet owner set
//! stay equal at every committed state.

use crate::world::Tx;
use pod_types::{
    Address, MembershipRequest, PodEventKind, PodId, PodResult, WalletCall, WalletError,
};
use std::collections::BTreeSet;
use tracing::info;

/// Resolve the controller and run its hook
fn authorize(tx: &Tx<'_>, request: &MembershipRequest) -> PodResult<(Address, Address)> {
    let controller = tx.world.ledger.controller_for(request.pod_id)?.clone();
    let authority = tx.authority(&controller)?;
    let record = tx.book_record(&controller, request.pod_id);
    authority.authorize(record, request)?;

    let wallet = tx.record(&controller, request.pod_id)?.wallet.clone();
    tx.ensure_attached(&controller, request.pod_id, &wallet)?;
    Ok((controller, wallet))
}

pub(crate) fn mint(tx: &mut Tx<'_>, caller: &Address, to: &Address, pod_id: PodId) -> PodResult<()> {
    let request = MembershipRequest::mint(pod_id, caller.clone(), to.clone());
    let (controller, wallet) = authorize(tx, &request)?;

    tx.world.ledger.apply_mint(pod_id, to)?;

    let threshold = tx.wallet(&wallet)?.threshold();
    tx.module_call(
        &controller,
        &wallet,
        &WalletCall::AddOwnerWithThreshold {
            owner: to.clone(),
            threshold,
        },
    )?;

    tx.emit(Some(pod_id), caller, PodEventKind::MemberMinted { member: to.clone() });
    info!(pod = %pod_id, member = %to, "Member minted");
    Ok(())
}

pub(crate) fn burn(tx: &mut Tx<'_>, caller: &Address, from: &Address, pod_id: PodId) -> PodResult<()> {
    let request = MembershipRequest::burn(pod_id, caller.clone(), from.clone());
    let (controller, wallet) = authorize(tx, &request)?;

    tx.world.ledger.apply_burn(pod_id, from)?;

    let call = {
        let w = tx.wallet(&wallet)?;
        let prev_owner = w
            .find_owner_predecessor(from)
            .ok_or_else(|| WalletError::OwnerNotFound(from.clone()))?;
        let remaining = w.owners().len().saturating_sub(1) as u32;
        WalletCall::RemoveOwner {
            prev_owner,
            owner: from.clone(),
            threshold: w.threshold().min(remaining),
        }
    };
    tx.module_call(&controller, &wallet, &call)?;

    tx.emit(Some(pod_id), caller, PodEventKind::MemberBurned { member: from.clone() });
    info!(pod = %pod_id, member = %from, "Member burned");
    Ok(())
}

pub(crate) fn transfer(
    tx: &mut Tx<'_>,
    caller: &Address,
    from: &Address,
    to: &Address,
    pod_id: PodId,
) -> PodResult<()> {
    let request = MembershipRequest::transfer(pod_id, caller.clone(), from.clone(), to.clone());
    let (controller, wallet) = authorize(tx, &request)?;

    tx.world.ledger.apply_transfer(pod_id, from, to)?;

    let prev_owner = tx
        .wallet(&wallet)?
        .find_owner_predecessor(from)
        .ok_or_else(|| WalletError::OwnerNotFound(from.clone()))?;
    tx.module_call(
        &controller,
        &wallet,
        &WalletCall::SwapOwner {
            prev_owner,
            old_owner: from.clone(),
            new_owner: to.clone(),
        },
    )?;

    tx.emit(
        Some(pod_id),
        caller,
        PodEventKind::MemberTransferred {
            from: from.clone(),
            to: to.clone(),
        },
    );
    info!(pod = %pod_id, from = %from, to = %to, "Membership transferred");
    Ok(())
}

pub(crate) fn mint_batch(tx: &mut Tx<'_>, caller: &Address, to: &Address, pod_ids: &[PodId]) -> PodResult<()> {
    tx.world.ledger.common_controller(pod_ids)?;
    for pod_id in pod_ids {
        mint(tx, caller, to, *pod_id)?;
    }
    Ok(())
}

pub(crate) fn burn_batch(tx: &mut Tx<'_>, caller: &Address, from: &Address, pod_ids: &[PodId]) -> PodResult<()> {
    tx.world.ledger.common_controller(pod_ids)?;
    for pod_id in pod_ids {
        burn(tx, caller, from, *pod_id)?;
    }
    Ok(())
}

pub(crate) fn transfer_batch(
    tx: &mut Tx<'_>,
    caller: &Address,
    from: &Address,
    to: &Address,
    pod_ids: &[PodId],
) -> PodResult<()> {
    tx.world.ledger.common_controller(pod_ids)?;
    for pod_id in pod_ids {
        transfer(tx, caller, from, to, *pod_id)?;
    }
    Ok(())
}

/// Bring the ledger in line with the wallet's owner set
///
/// Used after a direct owner change on the wallet. These mints and burns
/// skip the hook and are not mirrored back into the wallet.
pub(crate) fn sync_from_wallet(tx: &mut Tx<'_>, pod_id: PodId, wallet: &Address) -> PodResult<()> {
    let owners: BTreeSet<Address> = tx.wallet(wallet)?.owners().into_iter().collect();
    let holders: BTreeSet<Address> = tx.world.ledger.members(pod_id).into_iter().collect();

    let added: Vec<Address> = owners.difference(&holders).cloned().collect();
    let removed: Vec<Address> = holders.difference(&owners).cloned().collect();
    if added.is_empty() && removed.is_empty() {
        return Ok(());
    }

    for member in &removed {
        tx.world.ledger.apply_burn(pod_id, member)?;
    }
    for member in &added {
        tx.world.ledger.apply_mint(pod_id, member)?;
    }

    info!(
        pod = %pod_id,
        added = added.len(),
        removed = removed.len(),
        "Ledger synced from wallet owners"
    );
    tx.emit(Some(pod_id), wallet, PodEventKind::OwnersSynced { added, removed });
    Ok(())
}
