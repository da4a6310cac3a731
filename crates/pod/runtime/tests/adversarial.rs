//! Adversarial tests: unauthorized callers, guard bypass attempts, and
//! failures halfway through multi-store operations.

use pod_runtime::{ControllerVersion, InMemoryNaming, InMemoryWalletFactory, PodSystem, PodSystemConfig};
use pod_types::{
    Address, NamingError, PodError, PodEventKind, PodId, WalletCall, WalletError,
};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn addr(s: &str) -> Address {
    Address::new(s)
}

/// One V1 and one V2 controller, and a pod under `first` with members [A, B]
fn setup(first: ControllerVersion, admin: Option<&str>) -> (PodSystem, Address, Address, PodId, Address) {
    let mut system = PodSystem::new(PodSystemConfig::default());
    let v1 = system.deploy_controller(ControllerVersion::V1).unwrap();
    let v2 = system.deploy_controller(ControllerVersion::V2).unwrap();
    let owner = if first == ControllerVersion::V1 { v1.clone() } else { v2.clone() };
    let pod = system
        .controller(&owner)
        .unwrap()
        .create_pod(&addr("A"), &[addr("A"), addr("B")], 1, admin.map(addr), Some("orca"))
        .unwrap();
    let wallet = system.pod(pod).unwrap().wallet.clone();
    (system, v1, v2, pod, wallet)
}

fn system_with_naming(naming: InMemoryNaming) -> (PodSystem, Address) {
    let mut system = PodSystem::with_collaborators(
        PodSystemConfig::default(),
        Arc::new(InMemoryWalletFactory::new()),
        Box::new(naming),
    );
    let ctrl = system.deploy_controller(ControllerVersion::V1).unwrap();
    (system, ctrl)
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

#[test]
fn locked_module_cannot_be_escaped() {
    let (mut system, v1, _, pod, wallet) = setup(ControllerVersion::V1, Some("Admin"));
    let journal_len = system.journal().len();

    let attempts = [
        (
            WalletCall::DisableModule {
                prev_module: Address::sentinel(),
                module: v1.clone(),
            },
            PodError::CannotDisableModule(pod),
        ),
        (
            WalletCall::EnableModule {
                module: addr("rogue"),
            },
            PodError::CannotEnableModule(pod),
        ),
        (
            WalletCall::SetGuard { guard: None },
            PodError::CannotChangeGuard(pod),
        ),
    ];
    for (call, expected) in attempts {
        assert_eq!(system.exec_wallet_transaction(&wallet, &call), Err(expected));
    }

    let w = system.wallet(&wallet).unwrap();
    assert_eq!(w.modules(), vec![v1.clone()]);
    assert_eq!(w.guard(), Some(v1));
    assert_eq!(system.journal().len(), journal_len);

    // Threshold changes are not the guard's business
    system
        .exec_wallet_transaction(&wallet, &WalletCall::ChangeThreshold { threshold: 2 })
        .unwrap();
    assert_eq!(system.wallet(&wallet).unwrap().threshold(), 2);
}

#[test]
fn unlocked_pod_owners_may_leave() {
    let (mut system, v1, _, pod, wallet) = setup(ControllerVersion::V1, None);
    system
        .exec_wallet_transaction(
            &wallet,
            &WalletCall::DisableModule {
                prev_module: Address::sentinel(),
                module: v1.clone(),
            },
        )
        .unwrap();
    assert!(system.authority_modules(&wallet).is_empty());

    // Without the module the ledger can no longer mirror; nothing changes
    let result = system.mint(&wallet, &addr("C"), pod);
    assert!(matches!(result, Err(PodError::Wallet(WalletError::ModuleNotEnabled(_)))));
    assert_eq!(system.ledger().balance_of(&addr("C"), pod), 0);

    // Ejection still tears the pod down
    system
        .controller(&v1)
        .unwrap()
        .eject_safe(&wallet, pod, Some("orca"), None, None)
        .unwrap();
    assert_eq!(system.ledger().total_supply(pod), 0);
    assert_eq!(system.wallet(&wallet).unwrap().owners().len(), 2);
}

#[test]
fn v1_rejects_direct_owner_changes() {
    let (mut system, _, _, pod, wallet) = setup(ControllerVersion::V1, None);
    let result = system.exec_wallet_transaction(
        &wallet,
        &WalletCall::AddOwnerWithThreshold {
            owner: addr("E"),
            threshold: 1,
        },
    );
    assert_eq!(result, Err(PodError::OwnerChangeOutsideLedger(pod)));
    assert!(!system.wallet(&wallet).unwrap().is_owner(&addr("E")));
}

#[test]
fn v2_mirrors_direct_owner_changes() {
    let (mut system, _, _, pod, wallet) = setup(ControllerVersion::V2, None);

    system
        .exec_wallet_transaction(
            &wallet,
            &WalletCall::AddOwnerWithThreshold {
                owner: addr("E"),
                threshold: 2,
            },
        )
        .unwrap();
    assert_eq!(system.ledger().balance_of(&addr("E"), pod), 1);
    assert!(system.is_consistent(pod));

    let prev = system
        .wallet(&wallet)
        .unwrap()
        .find_owner_predecessor(&addr("A"))
        .unwrap();
    system
        .exec_wallet_transaction(
            &wallet,
            &WalletCall::SwapOwner {
                prev_owner: prev,
                old_owner: addr("A"),
                new_owner: addr("F"),
            },
        )
        .unwrap();
    assert_eq!(system.ledger().balance_of(&addr("A"), pod), 0);
    assert_eq!(system.ledger().balance_of(&addr("F"), pod), 1);
    assert!(system.is_consistent(pod));

    assert!(matches!(
        system.journal().last().map(|e| &e.kind),
        Some(PodEventKind::WalletTransaction { .. })
    ));
    assert!(system
        .journal()
        .for_pod(pod)
        .iter()
        .any(|e| matches!(e.kind, PodEventKind::OwnersSynced { .. })));
}

#[test]
fn v2_locked_pod_rejects_direct_owner_changes() {
    let (mut system, _, _, pod, wallet) = setup(ControllerVersion::V2, Some("Admin"));
    let result = system.exec_wallet_transaction(
        &wallet,
        &WalletCall::AddOwnerWithThreshold {
            owner: addr("E"),
            threshold: 1,
        },
    );
    assert_eq!(result, Err(PodError::OwnerChangeOutsideLedger(pod)));
}

#[test]
fn cleared_guard_detaches_the_pod() {
    let (mut system, v1, v2, pod, wallet) = setup(ControllerVersion::V1, None);
    system
        .exec_wallet_transaction(&wallet, &WalletCall::SetGuard { guard: None })
        .unwrap();

    // Unguarded, the wallet changes owners on its own
    system
        .exec_wallet_transaction(
            &wallet,
            &WalletCall::AddOwnerWithThreshold {
                owner: addr("E"),
                threshold: 1,
            },
        )
        .unwrap();
    assert!(system.wallet(&wallet).unwrap().is_module_enabled(&v1));

    // The ledger refuses to move while the wallet is off its guard
    assert_eq!(system.mint(&wallet, &addr("C"), pod), Err(PodError::PodDetached(pod)));
    assert_eq!(system.burn(&wallet, &addr("B"), pod), Err(PodError::PodDetached(pod)));
    assert_eq!(
        system.transfer(&addr("A"), &addr("A"), &addr("D"), pod),
        Err(PodError::PodDetached(pod))
    );
    assert_eq!(
        system
            .controller(&v1)
            .unwrap()
            .migrate_pod_controller(&wallet, pod, &v2, None),
        Err(PodError::PodDetached(pod))
    );
    assert_eq!(system.ledger().total_supply(pod), 2);

    // V1 will not take the wallet back while the owners differ
    let attach = WalletCall::SetGuard {
        guard: Some(v1.clone()),
    };
    assert_eq!(
        system.exec_wallet_transaction(&wallet, &attach),
        Err(PodError::OwnerChangeOutsideLedger(pod))
    );
    assert_eq!(system.wallet(&wallet).unwrap().guard(), None);

    let prev = system
        .wallet(&wallet)
        .unwrap()
        .find_owner_predecessor(&addr("E"))
        .unwrap();
    system
        .exec_wallet_transaction(
            &wallet,
            &WalletCall::RemoveOwner {
                prev_owner: prev,
                owner: addr("E"),
                threshold: 1,
            },
        )
        .unwrap();
    system.exec_wallet_transaction(&wallet, &attach).unwrap();
    assert!(system.is_consistent(pod));

    system.mint(&wallet, &addr("C"), pod).unwrap();
    assert!(system.is_consistent(pod));
}

#[test]
fn v2_reattach_mirrors_owners_changed_while_detached() {
    let (mut system, _, v2, pod, wallet) = setup(ControllerVersion::V2, None);
    system
        .exec_wallet_transaction(&wallet, &WalletCall::SetGuard { guard: None })
        .unwrap();
    system
        .exec_wallet_transaction(
            &wallet,
            &WalletCall::AddOwnerWithThreshold {
                owner: addr("E"),
                threshold: 1,
            },
        )
        .unwrap();
    assert_eq!(system.mint(&wallet, &addr("C"), pod), Err(PodError::PodDetached(pod)));

    system
        .exec_wallet_transaction(&wallet, &WalletCall::SetGuard { guard: Some(v2) })
        .unwrap();
    assert_eq!(system.ledger().balance_of(&addr("E"), pod), 1);
    assert!(system.is_consistent(pod));
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

#[test]
fn migrated_locked_pod_is_guarded_by_new_controller() {
    let (mut system, v1, v2, pod, wallet) = setup(ControllerVersion::V1, Some("Admin"));
    system
        .controller(&v1)
        .unwrap()
        .migrate_pod_controller(&addr("Admin"), pod, &v2, None)
        .unwrap();

    let attempts = [
        (
            WalletCall::DisableModule {
                prev_module: Address::sentinel(),
                module: v2.clone(),
            },
            PodError::CannotDisableModule(pod),
        ),
        (
            WalletCall::EnableModule { module: v1.clone() },
            PodError::CannotEnableModule(pod),
        ),
        (
            WalletCall::SetGuard { guard: None },
            PodError::CannotChangeGuard(pod),
        ),
        (
            WalletCall::AddOwnerWithThreshold {
                owner: addr("E"),
                threshold: 1,
            },
            PodError::OwnerChangeOutsideLedger(pod),
        ),
    ];
    for (call, expected) in attempts {
        assert_eq!(system.exec_wallet_transaction(&wallet, &call), Err(expected));
    }

    let w = system.wallet(&wallet).unwrap();
    assert_eq!(w.modules(), vec![v2.clone()]);
    assert_eq!(w.guard(), Some(v2));
    assert!(system.is_consistent(pod));
}

#[test]
fn migration_authorization_and_targets() {
    let (mut system, v1, v2, pod, wallet) = setup(ControllerVersion::V1, Some("Admin"));
    let mut handle = system.controller(&v1).unwrap();

    assert_eq!(
        handle.migrate_pod_controller(&addr("A"), pod, &v2, None),
        Err(PodError::MustBeAdmin(pod))
    );
    assert_eq!(
        handle.migrate_pod_controller(&addr("Admin"), pod, &v1, None),
        Err(PodError::MigrationToSelf(pod))
    );
    assert!(matches!(
        handle.migrate_pod_controller(&addr("Admin"), pod, &addr("unknown"), None),
        Err(PodError::ControllerNotRegistered(_))
    ));
    assert_eq!(
        handle.migrate_pod_controller(&addr("Admin"), PodId::new(99), &v2, None),
        Err(PodError::PodDoesNotExist(PodId::new(99)))
    );

    // The wallet itself may migrate too
    handle.migrate_pod_controller(&wallet, pod, &v2, None).unwrap();
}

#[test]
fn migration_without_admin_is_wallet_only() {
    let (mut system, v1, v2, pod, _) = setup(ControllerVersion::V1, None);
    let result = system
        .controller(&v1)
        .unwrap()
        .migrate_pod_controller(&addr("A"), pod, &v2, None);
    assert!(matches!(result, Err(PodError::NotAuthorized(_))));
}

#[test]
fn failed_migration_reverts_every_store() {
    let (mut system, v1, v2, pod, wallet) = setup(ControllerVersion::V1, Some("Admin"));

    let result = system
        .controller(&v1)
        .unwrap()
        .migrate_pod_controller(&addr("Admin"), pod, &v2, Some(addr("bogus")));
    assert!(matches!(
        result,
        Err(PodError::Wallet(WalletError::InvalidPredecessor { .. }))
    ));

    assert_eq!(system.ledger().controller_of(pod), Some(&v1));
    assert!(system.controller(&v1).unwrap().pod(pod).is_some());
    assert!(system.controller(&v2).unwrap().pod(pod).is_none());
    let w = system.wallet(&wallet).unwrap();
    assert_eq!(w.modules(), vec![v1.clone()]);
    assert_eq!(w.guard(), Some(v1));
}

#[test]
fn migration_with_supplied_predecessor() {
    let (mut system, v1, v2, pod, wallet) = setup(ControllerVersion::V1, None);
    system
        .exec_wallet_transaction(&wallet, &WalletCall::EnableModule { module: addr("M") })
        .unwrap();

    system
        .controller(&v1)
        .unwrap()
        .migrate_pod_controller(&wallet, pod, &v2, Some(addr("M")))
        .unwrap();

    let w = system.wallet(&wallet).unwrap();
    assert_eq!(w.modules(), vec![v2.clone(), addr("M")]);
    assert_eq!(system.authority_modules(&wallet), vec![v2]);
}

#[test]
fn removed_controller_keeps_its_pods_but_takes_no_new_ones() {
    let (mut system, v1, v2, pod, _) = setup(ControllerVersion::V1, Some("Admin"));
    let owner = system.owner().clone();

    assert!(matches!(
        system.remove_controller(&addr("mallory"), &v2),
        Err(PodError::NotOwner(_))
    ));
    system.remove_controller(&owner, &v2).unwrap();

    assert!(matches!(
        system
            .controller(&v1)
            .unwrap()
            .migrate_pod_controller(&addr("Admin"), pod, &v2, None),
        Err(PodError::ControllerNotRegistered(_))
    ));
    assert!(matches!(
        system
            .controller(&v2)
            .unwrap()
            .create_pod(&addr("A"), &[addr("A")], 1, None, None),
        Err(PodError::ControllerNotRegistered(_))
    ));

    system.remove_controller(&owner, &v1).unwrap();
    system.mint(&addr("Admin"), &addr("C"), pod).unwrap();
    assert!(system.is_consistent(pod));
}

// ---------------------------------------------------------------------------
// Ejection
// ---------------------------------------------------------------------------

#[test]
fn ejection_preconditions() {
    let (mut system, v1, _, pod, wallet) = setup(ControllerVersion::V1, Some("Admin"));
    let mut handle = system.controller(&v1).unwrap();

    assert_eq!(
        handle.eject_safe(&wallet, pod, None, None, None),
        Err(PodError::MustBeAdmin(pod))
    );
    assert!(matches!(
        handle.eject_safe(&addr("Admin"), pod, Some("someone-else"), None, None),
        Err(PodError::LabelSafeMismatch { .. })
    ));
    assert_eq!(
        handle.eject_safe(&addr("Admin"), pod, None, None, Some(&[addr("A")])),
        Err(PodError::IncompleteMemberSet(pod))
    );
    assert_eq!(
        handle.eject_safe(&addr("Admin"), pod, None, None, Some(&[addr("A"), addr("A")])),
        Err(PodError::IncompleteMemberSet(pod))
    );
    assert!(handle.pod(pod).is_some());

    handle
        .eject_safe(&addr("Admin"), pod, Some("orca"), Some(Address::sentinel()), None)
        .unwrap();
    assert!(handle.pod(pod).is_none());
}

#[test]
fn ejection_without_admin_is_wallet_only() {
    let (mut system, v1, _, pod, _) = setup(ControllerVersion::V1, None);
    let result = system
        .controller(&v1)
        .unwrap()
        .eject_safe(&addr("A"), pod, None, None, None);
    assert!(matches!(result, Err(PodError::NotAuthorized(_))));
}

#[test]
fn deregistration_failure_is_not_fatal() {
    let mut naming = InMemoryNaming::new("pod.xyz");
    naming.set_fail_deregistration(true);
    let (mut system, ctrl) = system_with_naming(naming);

    let pod = system
        .controller(&ctrl)
        .unwrap()
        .create_pod(&addr("A"), &[addr("A")], 1, None, Some("orca"))
        .unwrap();
    let wallet = system.pod(pod).unwrap().wallet.clone();

    system
        .controller(&ctrl)
        .unwrap()
        .eject_safe(&wallet, pod, Some("orca"), None, None)
        .unwrap();

    assert!(system.pod(pod).is_none());
    assert_eq!(system.naming().resolve("orca"), Some(wallet));
    assert!(system
        .journal()
        .for_pod(pod)
        .iter()
        .any(|e| matches!(e.kind, PodEventKind::NameDeregistrationFailed { .. })));
}

// ---------------------------------------------------------------------------
// Creation failures
// ---------------------------------------------------------------------------

#[test]
fn paused_naming_fails_creation_atomically() {
    let mut naming = InMemoryNaming::new("pod.xyz");
    naming.set_paused(true);
    let (mut system, ctrl) = system_with_naming(naming);
    let journal_len = system.journal().len();

    let result = system
        .controller(&ctrl)
        .unwrap()
        .create_pod(&addr("A"), &[addr("A")], 1, None, Some("orca"));
    assert_eq!(result, Err(PodError::Naming(NamingError::Paused)));
    assert_eq!(system.ledger().next_available_pod_id(), PodId::new(0));
    assert_eq!(system.journal().len(), journal_len);

    // Unnamed pods are unaffected
    let pod = system
        .controller(&ctrl)
        .unwrap()
        .create_pod(&addr("A"), &[addr("A")], 1, None, None)
        .unwrap();
    assert_eq!(pod, PodId::new(0));
}

#[test]
fn duplicate_label_fails_second_creation() {
    let (mut system, ctrl) = system_with_naming(InMemoryNaming::new("pod.xyz"));
    system
        .controller(&ctrl)
        .unwrap()
        .create_pod(&addr("A"), &[addr("A")], 1, None, Some("orca"))
        .unwrap();
    let result = system
        .controller(&ctrl)
        .unwrap()
        .create_pod(&addr("B"), &[addr("B")], 1, None, Some("orca"));
    assert!(matches!(
        result,
        Err(PodError::Naming(NamingError::LabelTaken(_)))
    ));
    assert_eq!(system.ledger().next_available_pod_id(), PodId::new(1));
}

#[test]
fn burning_the_last_member_is_refused() {
    let (mut system, _, _, pod, wallet) = setup(ControllerVersion::V1, None);
    system.burn(&wallet, &addr("A"), pod).unwrap();
    let result = system.burn(&wallet, &addr("B"), pod);
    assert!(matches!(
        result,
        Err(PodError::Wallet(WalletError::InvalidThreshold { .. }))
    ));
    assert_eq!(system.ledger().balance_of(&addr("B"), pod), 1);
    assert!(system.is_consistent(pod));
}
