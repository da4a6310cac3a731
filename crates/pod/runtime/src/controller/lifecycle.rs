//! Pod creation and per-pod settings

use crate::world::Tx;
use pod_types::{Address, PodError, PodEventKind, PodId, PodRecord, PodResult, WalletCall};
use tracing::{info, warn};

/// Provision a wallet and create a pod controlled by `controller`
pub(crate) fn create_pod(
    tx: &mut Tx<'_>,
    controller: &Address,
    caller: &Address,
    members: &[Address],
    threshold: u32,
    admin: Option<Address>,
    label: Option<&str>,
) -> PodResult<PodId> {
    tx.authority(controller)?;
    tx.world.registry.ensure_registered(controller)?;

    let pod_id = tx.world.ledger.next_available_pod_id();

    let mut wallet = tx.factory.deploy(members, threshold).map_err(|e| {
        warn!(pod = %pod_id, error = %e, "Wallet setup rejected");
        PodError::WalletSetupFailed(e.to_string())
    })?;
    wallet
        .enable_module(controller.clone())
        .map_err(|e| PodError::WalletSetupFailed(e.to_string()))?;
    wallet.set_guard(Some(controller.clone()));
    let wallet_address = wallet.address().clone();
    if tx.wallet_in_use(&wallet_address) || tx.world.wallets.contains_key(&wallet_address) {
        return Err(PodError::WalletAlreadyInUse(wallet_address));
    }
    tx.world.wallets.insert(wallet_address.clone(), wallet);

    let world = &mut *tx.world;
    world
        .ledger
        .create_pod(&world.registry, controller, pod_id, members)?;

    bind_pod(tx, controller, caller, pod_id, wallet_address, admin, label)?;
    Ok(pod_id)
}

/// Create a pod around a wallet that already has this controller enabled
pub(crate) fn create_pod_with_safe(
    tx: &mut Tx<'_>,
    controller: &Address,
    caller: &Address,
    admin: Option<Address>,
    wallet: &Address,
    label: Option<&str>,
) -> PodResult<PodId> {
    tx.authority(controller)?;
    tx.world.registry.ensure_registered(controller)?;

    if tx.wallet_in_use(wallet) {
        return Err(PodError::WalletAlreadyInUse(wallet.clone()));
    }
    let owners = {
        let w = tx.wallet(wallet)?;
        if caller != wallet && !w.is_owner(caller) {
            return Err(PodError::NotAuthorized(format!(
                "{} is neither {} nor one of its owners",
                caller, wallet
            )));
        }
        if !w.is_module_enabled(controller) {
            return Err(PodError::ModuleNotEnabled {
                wallet: wallet.clone(),
                module: controller.clone(),
            });
        }
        w.owners()
    };

    tx.module_call(
        controller,
        wallet,
        &WalletCall::SetGuard {
            guard: Some(controller.clone()),
        },
    )?;

    let pod_id = tx.world.ledger.next_available_pod_id();
    let world = &mut *tx.world;
    world
        .ledger
        .create_pod(&world.registry, controller, pod_id, &owners)?;

    bind_pod(tx, controller, caller, pod_id, wallet.clone(), admin, label)?;
    Ok(pod_id)
}

/// Record the pod in the controller's book and name it
fn bind_pod(
    tx: &mut Tx<'_>,
    controller: &Address,
    caller: &Address,
    pod_id: PodId,
    wallet: Address,
    admin: Option<Address>,
    label: Option<&str>,
) -> PodResult<()> {
    let record = PodRecord::new(wallet.clone(), admin.clone());
    tx.book_mut(controller).insert(pod_id, record);
    tx.emit(
        Some(pod_id),
        caller,
        PodEventKind::PodCreated {
            controller: controller.clone(),
            wallet: wallet.clone(),
            admin: admin.clone(),
        },
    );

    if let Some(label) = label {
        let node = tx.world.naming.register(label, &wallet)?;
        let avatar = tx.config.avatar_url(pod_id);
        tx.world.naming.set_text(&node, "avatar", &avatar)?;
        tx.emit(
            Some(pod_id),
            caller,
            PodEventKind::NameRegistered {
                label: label.to_string(),
            },
        );
    }

    info!(
        pod = %pod_id,
        controller = %controller,
        wallet = %wallet,
        admin = ?admin,
        label = ?label,
        "Pod created"
    );
    Ok(())
}

/// Replace, add or drop the pod admin
///
/// An admin locks the module; dropping the admin unlocks it.
pub(crate) fn update_pod_admin(
    tx: &mut Tx<'_>,
    controller: &Address,
    caller: &Address,
    pod_id: PodId,
    new_admin: Option<Address>,
) -> PodResult<()> {
    let record = tx.record(controller, pod_id)?;
    match &record.admin {
        Some(admin) if admin != caller => return Err(PodError::OnlyAdminCanUpdate(pod_id)),
        None if !record.is_wallet(caller) => return Err(PodError::OnlySafeCanAddAdmin(pod_id)),
        _ => {}
    }

    let locked = new_admin.is_some();
    let record = tx.record_mut(controller, pod_id)?;
    record.admin = new_admin.clone();
    record.module_locked = locked;

    tx.emit(Some(pod_id), caller, PodEventKind::AdminUpdated { admin: new_admin.clone() });
    tx.emit(Some(pod_id), caller, PodEventKind::ModuleLockSet { locked });
    info!(pod = %pod_id, admin = ?new_admin, module_locked = locked, "Pod admin updated");
    Ok(())
}

pub(crate) fn set_pod_module_lock(
    tx: &mut Tx<'_>,
    controller: &Address,
    caller: &Address,
    pod_id: PodId,
    locked: bool,
) -> PodResult<()> {
    if !tx.record(controller, pod_id)?.is_admin(caller) {
        return Err(PodError::MustBeAdmin(pod_id));
    }
    tx.record_mut(controller, pod_id)?.module_locked = locked;

    tx.emit(Some(pod_id), caller, PodEventKind::ModuleLockSet { locked });
    info!(pod = %pod_id, locked, "Module lock set");
    Ok(())
}

pub(crate) fn set_pod_transfer_lock(
    tx: &mut Tx<'_>,
    controller: &Address,
    caller: &Address,
    pod_id: PodId,
    locked: bool,
) -> PodResult<()> {
    let record = tx.record(controller, pod_id)?;
    if record.has_admin() {
        if !record.is_admin_or_wallet(caller) {
            return Err(PodError::OnlyAdminOrSafe(pod_id));
        }
    } else if !record.is_wallet(caller) {
        return Err(PodError::OnlySafeCanSetLock(pod_id));
    }
    tx.record_mut(controller, pod_id)?.transfer_locked = locked;

    tx.emit(Some(pod_id), caller, PodEventKind::TransferLockSet { locked });
    info!(pod = %pod_id, locked, "Transfer lock set");
    Ok(())
}
