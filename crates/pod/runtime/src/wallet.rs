//! In-memory shared wallet
//!
//! A faithful model of the wallet contract the controller relies on:
//! sentinel-headed owner and module lists with head insertion,
//! predecessor-checked removal, threshold bounds, and a single guard slot.
//! Suitable for development, tests, and the CLI; production deployments
//! plug their own [`SharedWallet`] in through a [`WalletFactory`].

use pod_types::{Address, SharedWallet, WalletError, WalletFactory, WalletResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InMemoryWallet {
    address: Address,
    owners: Vec<Address>,
    threshold: u32,
    modules: Vec<Address>,
    guard: Option<Address>,
}

impl InMemoryWallet {
    /// Set up a wallet with `owners` (kept in the given order) and `threshold`
    pub fn setup(address: Address, owners: &[Address], threshold: u32) -> WalletResult<Self> {
        if owners.is_empty() {
            return Err(WalletError::NoOwners);
        }
        check_threshold(threshold, owners.len())?;

        let mut list: Vec<Address> = Vec::with_capacity(owners.len());
        for owner in owners {
            if !valid_entry(owner) || owner == &address {
                return Err(WalletError::InvalidOwner(owner.clone()));
            }
            if list.contains(owner) {
                return Err(WalletError::DuplicateOwner(owner.clone()));
            }
            list.push(owner.clone());
        }

        Ok(Self {
            address,
            owners: list,
            threshold,
            modules: Vec::new(),
            guard: None,
        })
    }

    fn check_predecessor(list: &[Address], prev: &Address, entry: &Address) -> WalletResult<usize> {
        let pos = list
            .iter()
            .position(|e| e == entry)
            .ok_or_else(|| WalletError::OwnerNotFound(entry.clone()))?;
        let expected_ok = if pos == 0 {
            prev.is_sentinel()
        } else {
            &list[pos - 1] == prev
        };
        if !expected_ok {
            return Err(WalletError::InvalidPredecessor {
                prev: prev.clone(),
                entry: entry.clone(),
            });
        }
        Ok(pos)
    }

    fn check_new_owner(&self, owner: &Address) -> WalletResult<()> {
        if !valid_entry(owner) || owner == &self.address {
            return Err(WalletError::InvalidOwner(owner.clone()));
        }
        if self.owners.contains(owner) {
            return Err(WalletError::DuplicateOwner(owner.clone()));
        }
        Ok(())
    }
}

impl SharedWallet for InMemoryWallet {
    fn address(&self) -> &Address {
        &self.address
    }

    fn owners(&self) -> Vec<Address> {
        self.owners.clone()
    }

    fn threshold(&self) -> u32 {
        self.threshold
    }

    fn add_owner_with_threshold(&mut self, owner: Address, threshold: u32) -> WalletResult<()> {
        self.check_new_owner(&owner)?;
        check_threshold(threshold, self.owners.len() + 1)?;
        self.owners.insert(0, owner);
        self.threshold = threshold;
        Ok(())
    }

    fn remove_owner(
        &mut self,
        prev_owner: &Address,
        owner: &Address,
        threshold: u32,
    ) -> WalletResult<()> {
        let remaining = self.owners.len().saturating_sub(1);
        check_threshold(threshold, remaining)?;
        let pos = Self::check_predecessor(&self.owners, prev_owner, owner)?;
        self.owners.remove(pos);
        self.threshold = threshold;
        Ok(())
    }

    fn swap_owner(
        &mut self,
        prev_owner: &Address,
        old_owner: &Address,
        new_owner: Address,
    ) -> WalletResult<()> {
        self.check_new_owner(&new_owner)?;
        let pos = Self::check_predecessor(&self.owners, prev_owner, old_owner)?;
        self.owners[pos] = new_owner;
        Ok(())
    }

    fn change_threshold(&mut self, threshold: u32) -> WalletResult<()> {
        check_threshold(threshold, self.owners.len())?;
        self.threshold = threshold;
        Ok(())
    }

    fn modules(&self) -> Vec<Address> {
        self.modules.clone()
    }

    fn enable_module(&mut self, module: Address) -> WalletResult<()> {
        if !valid_entry(&module) {
            return Err(WalletError::InvalidModule(module));
        }
        if self.modules.contains(&module) {
            return Err(WalletError::ModuleAlreadyEnabled(module));
        }
        self.modules.insert(0, module);
        Ok(())
    }

    fn disable_module(&mut self, prev_module: &Address, module: &Address) -> WalletResult<()> {
        if !self.modules.contains(module) {
            return Err(WalletError::ModuleNotEnabled(module.clone()));
        }
        let pos = Self::check_predecessor(&self.modules, prev_module, module)?;
        self.modules.remove(pos);
        Ok(())
    }

    fn guard(&self) -> Option<Address> {
        self.guard.clone()
    }

    fn set_guard(&mut self, guard: Option<Address>) {
        self.guard = guard;
    }

    fn clone_box(&self) -> Box<dyn SharedWallet> {
        Box::new(self.clone())
    }
}

/// Deploys [`InMemoryWallet`]s at freshly generated addresses
#[derive(Clone, Debug, Default)]
pub struct InMemoryWalletFactory;

impl InMemoryWalletFactory {
    pub fn new() -> Self {
        Self
    }
}

impl WalletFactory for InMemoryWalletFactory {
    fn deploy(&self, owners: &[Address], threshold: u32) -> WalletResult<Box<dyn SharedWallet>> {
        let wallet = InMemoryWallet::setup(Address::generate(), owners, threshold)?;
        Ok(Box::new(wallet))
    }
}

fn valid_entry(entry: &Address) -> bool {
    !entry.is_sentinel() && !entry.as_str().is_empty()
}

fn check_threshold(threshold: u32, owners: usize) -> WalletResult<()> {
    if threshold == 0 || threshold as usize > owners {
        return Err(WalletError::InvalidThreshold { threshold, owners });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    fn wallet(owners: &[&str], threshold: u32) -> InMemoryWallet {
        let owners: Vec<Address> = owners.iter().map(|o| addr(o)).collect();
        InMemoryWallet::setup(addr("safe"), &owners, threshold).unwrap()
    }

    #[test]
    fn test_setup_rejects_bad_configuration() {
        assert_eq!(
            InMemoryWallet::setup(addr("safe"), &[], 1).unwrap_err(),
            WalletError::NoOwners
        );
        assert!(matches!(
            InMemoryWallet::setup(addr("safe"), &[addr("a")], 0),
            Err(WalletError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            InMemoryWallet::setup(addr("safe"), &[addr("a")], 2),
            Err(WalletError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            InMemoryWallet::setup(addr("safe"), &[addr("a"), addr("a")], 1),
            Err(WalletError::DuplicateOwner(_))
        ));
    }

    #[test]
    fn test_owner_list_head_insertion() {
        let mut w = wallet(&["a", "b"], 1);
        w.add_owner_with_threshold(addr("c"), 2).unwrap();
        assert_eq!(w.owners(), vec![addr("c"), addr("a"), addr("b")]);
        assert_eq!(w.threshold(), 2);
        assert_eq!(w.find_owner_predecessor(&addr("a")), Some(addr("c")));
        assert_eq!(w.find_owner_predecessor(&addr("c")), Some(Address::sentinel()));
    }

    #[test]
    fn test_remove_owner_checks_predecessor_and_threshold() {
        let mut w = wallet(&["a", "b"], 2);
        assert!(matches!(
            w.remove_owner(&addr("b"), &addr("a"), 1),
            Err(WalletError::InvalidPredecessor { .. })
        ));
        assert!(matches!(
            w.remove_owner(&addr("a"), &addr("b"), 2),
            Err(WalletError::InvalidThreshold { .. })
        ));
        w.remove_owner(&addr("a"), &addr("b"), 1).unwrap();
        assert_eq!(w.owners(), vec![addr("a")]);
        // The last owner can never be removed
        assert!(w.remove_owner(&Address::sentinel(), &addr("a"), 1).is_err());
    }

    #[test]
    fn test_swap_owner_keeps_position() {
        let mut w = wallet(&["a", "b", "c"], 2);
        w.swap_owner(&addr("a"), &addr("b"), addr("d")).unwrap();
        assert_eq!(w.owners(), vec![addr("a"), addr("d"), addr("c")]);
        assert!(matches!(
            w.swap_owner(&Address::sentinel(), &addr("a"), addr("c")),
            Err(WalletError::DuplicateOwner(_))
        ));
    }

    #[test]
    fn test_module_list() {
        let mut w = wallet(&["a"], 1);
        w.enable_module(addr("m1")).unwrap();
        w.enable_module(addr("m2")).unwrap();
        assert_eq!(w.modules(), vec![addr("m2"), addr("m1")]);
        assert_eq!(w.find_predecessor(&addr("m1")), Some(addr("m2")));
        assert!(matches!(
            w.enable_module(addr("m1")),
            Err(WalletError::ModuleAlreadyEnabled(_))
        ));

        w.disable_module(&addr("m2"), &addr("m1")).unwrap();
        assert!(!w.is_module_enabled(&addr("m1")));
        assert!(matches!(
            w.disable_module(&Address::sentinel(), &addr("m1")),
            Err(WalletError::ModuleNotEnabled(_))
        ));
    }

    #[test]
    fn test_module_calls_require_enabled_module() {
        let mut w = wallet(&["a"], 1);
        let call = pod_types::WalletCall::SetGuard {
            guard: Some(addr("g")),
        };
        assert!(w.exec_transaction_from_module(&addr("m"), &call).is_err());
        w.enable_module(addr("m")).unwrap();
        w.exec_transaction_from_module(&addr("m"), &call).unwrap();
        assert_eq!(w.guard(), Some(addr("g")));
    }

    #[test]
    fn test_factory_generates_distinct_wallets() {
        let factory = InMemoryWalletFactory::new();
        let a = factory.deploy(&[addr("a")], 1).unwrap();
        let b = factory.deploy(&[addr("a")], 1).unwrap();
        assert_ne!(a.address(), b.address());
    }
}
