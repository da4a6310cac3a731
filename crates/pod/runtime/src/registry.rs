//! Controller Registry - the set of addresses recognised as controllers
//!
//! The registry only grows under owner control. Nothing is ever removed
//! implicitly; removal is an explicit owner call.

use pod_types::{Address, PodError, PodResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// Owner-gated set of valid controllers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControllerRegistry {
    owner: Address,
    controllers: BTreeSet<Address>,
}

impl ControllerRegistry {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            controllers: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Register a controller; registering twice is a no-op
    ///
    /// Returns whether the controller was newly added.
    pub fn register_controller(&mut self, caller: &Address, controller: Address) -> PodResult<bool> {
        self.ensure_owner(caller)?;
        let added = self.controllers.insert(controller.clone());
        if added {
            info!(controller = %controller, "Controller registered");
        }
        Ok(added)
    }

    /// Remove a controller. Pods it already controls keep working through
    /// it, but it can no longer create pods or receive migrations.
    pub fn remove_controller(&mut self, caller: &Address, controller: &Address) -> PodResult<bool> {
        self.ensure_owner(caller)?;
        let removed = self.controllers.remove(controller);
        if removed {
            info!(controller = %controller, "Controller removed");
        }
        Ok(removed)
    }

    pub fn is_registered(&self, controller: &Address) -> bool {
        self.controllers.contains(controller)
    }

    /// Fail with `ControllerNotRegistered` unless `controller` is registered
    pub fn ensure_registered(&self, controller: &Address) -> PodResult<()> {
        if self.is_registered(controller) {
            Ok(())
        } else {
            Err(PodError::ControllerNotRegistered(controller.clone()))
        }
    }

    pub fn controllers(&self) -> Vec<Address> {
        self.controllers.iter().cloned().collect()
    }

    fn ensure_owner(&self, caller: &Address) -> PodResult<()> {
        if caller == &self.owner {
            Ok(())
        } else {
            Err(PodError::NotOwner(caller.clone()))
        }
    }
}
