//! Batched pod creation with cross-references
//!
//! A member or admin slot may point at a pod created earlier in the same
//! batch; it resolves to that pod's wallet, which lets one call build
//! pods-of-pods.

use crate::controller::lifecycle;
use crate::world::Tx;
use pod_types::{Address, AddressSlot, MultiCreateBatch, PodError, PodId, PodResult};
use tracing::info;

pub(crate) fn multi_create(
    tx: &mut Tx<'_>,
    controller: &Address,
    caller: &Address,
    batch: &MultiCreateBatch,
) -> PodResult<Vec<PodId>> {
    let len = batch.consistent_len().ok_or(PodError::BatchLengthMismatch)?;
    check_ordering(batch)?;

    let mut wallets: Vec<Address> = Vec::with_capacity(len);
    let mut pod_ids = Vec::with_capacity(len);
    for index in 0..len {
        let members = batch.members[index]
            .iter()
            .map(|slot| resolve(slot, index, &wallets))
            .collect::<PodResult<Vec<_>>>()?;
        let admin = batch.admins[index]
            .as_ref()
            .map(|slot| resolve(slot, index, &wallets))
            .transpose()?;

        let pod_id = lifecycle::create_pod(
            tx,
            controller,
            caller,
            &members,
            batch.thresholds[index],
            admin,
            batch.labels[index].as_deref(),
        )?;
        wallets.push(tx.record(controller, pod_id)?.wallet.clone());
        pod_ids.push(pod_id);
    }

    info!(controller = %controller, pods = pod_ids.len(), "Multi-create committed");
    Ok(pod_ids)
}

/// Every pointer must reference an earlier entry
fn check_ordering(batch: &MultiCreateBatch) -> PodResult<()> {
    for (index, members) in batch.members.iter().enumerate() {
        let admin = batch.admins.get(index).and_then(|a| a.as_ref());
        for slot in members.iter().chain(admin) {
            if let Some(pointer) = slot.pointer_index() {
                if pointer >= index {
                    return Err(PodError::DependencyBadOrdering { index, pointer });
                }
            }
        }
    }
    Ok(())
}

fn resolve(slot: &AddressSlot, index: usize, wallets: &[Address]) -> PodResult<Address> {
    match slot {
        AddressSlot::Literal(address) => Ok(address.clone()),
        AddressSlot::Pointer { pointer } => wallets
            .get(*pointer)
            .filter(|_| *pointer < index)
            .cloned()
            .ok_or(PodError::DependencyBadOrdering {
                index,
                pointer: *pointer,
            }),
    }
}
