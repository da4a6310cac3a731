//! Pod Runtime
//!
//! This crate implements the authority state machine for pods: shared,
//! multi-owner groups whose roster lives in a membership ledger and whose
//! funds live in an external shared wallet.
//!
//! # Architecture
//!
//! The [`PodSystem`] is the main entry point. It composes:
//!
//! - [`ControllerRegistry`] - owner-gated set of valid controllers
//! - [`MembershipLedger`] - one token per (pod, member), and the record of
//!   which controller owns each pod
//! - Controllers ([`ControllerV1`], [`ControllerV2`]) - versioned
//!   [`PodAuthority`] implementations that authorize membership changes,
//!   guard the wallet, and drive migration and ejection
//! - Collaborators behind traits: [`pod_types::SharedWallet`] (with
//!   [`InMemoryWallet`]) and [`pod_types::NamingService`] (with
//!   [`InMemoryNaming`])
//!
//! # Key Invariants
//!
//! 1. Ledger holders equal wallet owners for every live pod
//! 2. A pod has exactly one controller; its wallet has exactly one
//!    controller module enabled, and that module is also the guard
//! 3. Every public call is all-or-nothing across every store
//! 4. Pod ids and ejected wallets are never reused
//!
//! # Example
//!
//! ```rust
//! use pod_runtime::{ControllerVersion, PodSystem, PodSystemConfig};
//! use pod_types::Address;
//!
//! let mut system = PodSystem::new(PodSystemConfig::default());
//! let ctrl = system.deploy_controller(ControllerVersion::V1).unwrap();
//!
//! let alice = Address::new("alice");
//! let bob = Address::new("bob");
//! let pod = system
//!     .controller(&ctrl)
//!     .unwrap()
//!     .create_pod(&alice, &[alice.clone(), bob.clone()], 1, None, Some("orca"))
//!     .unwrap();
//!
//! assert_eq!(system.ledger().total_supply(pod), 2);
//! assert!(system.is_consistent(pod));
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod ledger;
mod membership;
mod multi_create;
pub mod naming;
pub mod registry;
pub mod system;
pub mod wallet;
mod world;

// Re-export main types for convenience
pub use config::{ControllerConfig, LedgerConfig, LoggingConfig, NamingConfig, PodSystemConfig};
pub use controller::{ControllerV1, ControllerV2, ControllerVersion, OwnerSync, PodAuthority};
pub use ledger::MembershipLedger;
pub use naming::InMemoryNaming;
pub use registry::ControllerRegistry;
pub use system::{ControllerHandle, PodSystem};
pub use wallet::{InMemoryWallet, InMemoryWalletFactory};
