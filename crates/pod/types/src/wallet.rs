//! Shared wallet contract
//!
//! The wallet is an external multi-owner resource. The controller never
//! implements it; it only relies on the operations below. Owners and
//! modules are kept as sentinel-headed linked lists, so removal is
//! position dependent and takes the predecessor entry.

use crate::{Address, WalletResult};
use serde::{Deserialize, Serialize};

/// An administrative call the wallet makes on itself
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum WalletCall {
    AddOwnerWithThreshold {
        owner: Address,
        threshold: u32,
    },
    RemoveOwner {
        prev_owner: Address,
        owner: Address,
        threshold: u32,
    },
    SwapOwner {
        prev_owner: Address,
        old_owner: Address,
        new_owner: Address,
    },
    ChangeThreshold {
        threshold: u32,
    },
    EnableModule {
        module: Address,
    },
    DisableModule {
        prev_module: Address,
        module: Address,
    },
    SetGuard {
        guard: Option<Address>,
    },
}

impl WalletCall {
    /// Whether the call alters the owner set
    pub fn changes_owners(&self) -> bool {
        matches!(
            self,
            Self::AddOwnerWithThreshold { .. } | Self::RemoveOwner { .. } | Self::SwapOwner { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AddOwnerWithThreshold { .. } => "addOwnerWithThreshold",
            Self::RemoveOwner { .. } => "removeOwner",
            Self::SwapOwner { .. } => "swapOwner",
            Self::ChangeThreshold { .. } => "changeThreshold",
            Self::EnableModule { .. } => "enableModule",
            Self::DisableModule { .. } => "disableModule",
            Self::SetGuard { .. } => "setGuard",
        }
    }
}

/// What a controller expects from a shared wallet
pub trait SharedWallet: std::fmt::Debug + Send + Sync {
    fn address(&self) -> &Address;

    /// Owners in list order
    fn owners(&self) -> Vec<Address>;

    fn threshold(&self) -> u32;

    fn add_owner_with_threshold(&mut self, owner: Address, threshold: u32) -> WalletResult<()>;

    fn remove_owner(
        &mut self,
        prev_owner: &Address,
        owner: &Address,
        threshold: u32,
    ) -> WalletResult<()>;

    fn swap_owner(
        &mut self,
        prev_owner: &Address,
        old_owner: &Address,
        new_owner: Address,
    ) -> WalletResult<()>;

    fn change_threshold(&mut self, threshold: u32) -> WalletResult<()>;

    /// Enabled modules in list order
    fn modules(&self) -> Vec<Address>;

    fn enable_module(&mut self, module: Address) -> WalletResult<()>;

    fn disable_module(&mut self, prev_module: &Address, module: &Address) -> WalletResult<()>;

    fn guard(&self) -> Option<Address>;

    fn set_guard(&mut self, guard: Option<Address>);

    fn clone_box(&self) -> Box<dyn SharedWallet>;

    fn is_owner(&self, who: &Address) -> bool {
        self.owners().iter().any(|o| o == who)
    }

    fn is_module_enabled(&self, module: &Address) -> bool {
        self.modules().iter().any(|m| m == module)
    }

    /// Entry preceding `module` in the module list (the sentinel for the head)
    fn find_predecessor(&self, module: &Address) -> Option<Address> {
        predecessor_in(&self.modules(), module)
    }

    /// Entry preceding `owner` in the owner list (the sentinel for the head)
    fn find_owner_predecessor(&self, owner: &Address) -> Option<Address> {
        predecessor_in(&self.owners(), owner)
    }

    /// Execute an administrative call on the wallet itself
    fn apply(&mut self, call: &WalletCall) -> WalletResult<()> {
        match call {
            WalletCall::AddOwnerWithThreshold { owner, threshold } => {
                self.add_owner_with_threshold(owner.clone(), *threshold)
            }
            WalletCall::RemoveOwner {
                prev_owner,
                owner,
                threshold,
            } => self.remove_owner(prev_owner, owner, *threshold),
            WalletCall::SwapOwner {
                prev_owner,
                old_owner,
                new_owner,
            } => self.swap_owner(prev_owner, old_owner, new_owner.clone()),
            WalletCall::ChangeThreshold { threshold } => self.change_threshold(*threshold),
            WalletCall::EnableModule { module } => self.enable_module(module.clone()),
            WalletCall::DisableModule {
                prev_module,
                module,
            } => self.disable_module(prev_module, module),
            WalletCall::SetGuard { guard } => {
                self.set_guard(guard.clone());
                Ok(())
            }
        }
    }

    /// Execute a call on behalf of an enabled module; the guard is not consulted
    fn exec_transaction_from_module(
        &mut self,
        module: &Address,
        call: &WalletCall,
    ) -> WalletResult<()> {
        if !self.is_module_enabled(module) {
            return Err(crate::WalletError::ModuleNotEnabled(module.clone()));
        }
        self.apply(call)
    }
}

impl Clone for Box<dyn SharedWallet> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Provisions new shared wallets
pub trait WalletFactory: std::fmt::Debug + Send + Sync {
    fn deploy(&self, owners: &[Address], threshold: u32) -> WalletResult<Box<dyn SharedWallet>>;
}

fn predecessor_in(list: &[Address], entry: &Address) -> Option<Address> {
    let pos = list.iter().position(|e| e == entry)?;
    Some(if pos == 0 {
        Address::sentinel()
    } else {
        list[pos - 1].clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predecessor_in() {
        let list = vec![Address::new("a"), Address::new("b"), Address::new("c")];
        assert_eq!(
            predecessor_in(&list, &Address::new("a")),
            Some(Address::sentinel())
        );
        assert_eq!(
            predecessor_in(&list, &Address::new("c")),
            Some(Address::new("b"))
        );
        assert_eq!(predecessor_in(&list, &Address::new("z")), None);
    }

    #[test]
    fn test_owner_calls_are_flagged() {
        let swap = WalletCall::SwapOwner {
            prev_owner: Address::sentinel(),
            old_owner: Address::new("a"),
            new_owner: Address::new("b"),
        };
        assert!(swap.changes_owners());
        assert!(!WalletCall::SetGuard { guard: None }.changes_owners());
        assert_eq!(swap.name(), "swapOwner");
    }

    #[test]
    fn test_call_json_shape() {
        let call: WalletCall =
            serde_json::from_str(r#"{"call": "enable_module", "module": "0xabc"}"#).unwrap();
        assert_eq!(
            call,
            WalletCall::EnableModule {
                module: Address::new("0xabc")
            }
        );
    }
}
