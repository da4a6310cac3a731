//! Pod Domain Types
//!
//! This crate defines the domain types for pods: shared, multi-owner
//! custodial groups whose roster lives in a membership ledger, whose
//! funds live in an external shared wallet, and whose authority is held
//! by exactly one controller at a time.
//!
//! # Key Concepts
//!
//! - **Pod**: a group bound to one shared wallet and governed by one
//!   controller. Its metadata is a [`PodRecord`].
//! - **Membership token**: one token per (pod, member). The ledger's
//!   holder set must always mirror the wallet's owner set.
//! - **Controller**: the authority module. It authorizes membership
//!   changes, guards the wallet, and drives migration and ejection.
//! - **Wallet contract**: [`SharedWallet`] and [`WalletFactory`] describe
//!   what the controller expects from the external wallet.
//! - **Naming contract**: [`NamingService`] gives pods human-readable labels.
//! - **Event journal**: every committed change produces a [`PodEvent`].
//!
//! # Architecture
//!
//! This is a pure types crate with no runtime behaviour. All data types
//! implement `Clone`, `Debug`, `Serialize`, `Deserialize`. IDs use the
//! newtype pattern and implement `Display`.

#![deny(unsafe_code)]

mod errors;
mod events;
mod ids;
mod membership;
mod naming;
mod pod;
mod wallet;

pub use errors::*;
pub use events::*;
pub use ids::*;
pub use membership::*;
pub use naming::*;
pub use pod::*;
pub use wallet::*;
