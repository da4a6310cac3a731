//! Controller-to-controller migration
//!
//! Rewrites the ledger, both controllers' books, and the wallet's module
//! and guard configuration in one unit. The committed wallet has the
//! destination module enabled, the source module disabled, and the
//! destination as guard.

use crate::world::Tx;
use pod_types::{Address, PodError, PodEventKind, PodId, PodResult, PodStatus, WalletCall, WalletError};
use tracing::info;

pub(crate) fn migrate_pod_controller(
    tx: &mut Tx<'_>,
    controller: &Address,
    caller: &Address,
    pod_id: PodId,
    new_controller: &Address,
    module_predecessor: Option<Address>,
) -> PodResult<()> {
    let record = tx.record(controller, pod_id)?;
    if !record.is_admin_or_wallet(caller) {
        return Err(if record.has_admin() {
            PodError::MustBeAdmin(pod_id)
        } else {
            PodError::NotAuthorized(format!("{} is not the wallet of {}", caller, pod_id))
        });
    }
    if new_controller == controller {
        return Err(PodError::MigrationToSelf(pod_id));
    }
    tx.world.registry.ensure_registered(new_controller)?;
    let destination = tx.authority(new_controller)?;

    let wallet = record.wallet.clone();
    tx.ensure_attached(controller, pod_id, &wallet)?;

    let world = &mut *tx.world;
    world
        .ledger
        .migrate_controller(&world.registry, controller, pod_id, new_controller)?;

    let record = tx
        .book_mut(controller)
        .remove(pod_id, PodStatus::Migrated)
        .ok_or(PodError::PodDoesNotExist(pod_id))?;
    let record = destination.on_migrate_in(record);
    let locked = record.module_locked;
    tx.book_mut(new_controller).insert(pod_id, record);

    let current = tx
        .wallet(&wallet)?
        .find_predecessor(controller)
        .ok_or_else(|| PodError::ModuleNotEnabled {
            wallet: wallet.clone(),
            module: controller.clone(),
        })?;
    if let Some(supplied) = module_predecessor {
        if supplied != current {
            return Err(WalletError::InvalidPredecessor {
                prev: supplied,
                entry: controller.clone(),
            }
            .into());
        }
    }

    if !tx.wallet(&wallet)?.is_module_enabled(new_controller) {
        tx.module_call(
            controller,
            &wallet,
            &WalletCall::EnableModule {
                module: new_controller.clone(),
            },
        )?;
    }
    tx.module_call(
        controller,
        &wallet,
        &WalletCall::SetGuard {
            guard: Some(new_controller.clone()),
        },
    )?;
    // Enabling inserts at the head, so the source's predecessor may have moved
    let prev_module = tx
        .wallet(&wallet)?
        .find_predecessor(controller)
        .ok_or_else(|| WalletError::ModuleNotEnabled(controller.clone()))?;
    tx.module_call(
        controller,
        &wallet,
        &WalletCall::DisableModule {
            prev_module,
            module: controller.clone(),
        },
    )?;

    tx.emit(
        Some(pod_id),
        caller,
        PodEventKind::PodMigrated {
            from: controller.clone(),
            to: new_controller.clone(),
        },
    );
    info!(
        pod = %pod_id,
        from = %controller,
        to = %new_controller,
        module_locked = locked,
        "Pod migrated"
    );
    Ok(())
}
