//! Role checks for strategy management.

use clm_vault_domain::enums::Role;
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::value_objects::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Option<Address>,
    pending_owner: Option<Address>,
    managers: BTreeSet<Address>,
    rebalancers: BTreeSet<Address>,
    vault: Address,
    retired: bool,
}

impl AccessControl {
    pub fn new(owner: Address, vault: Address) -> Self {
        Self {
            owner: Some(owner),
            pending_owner: None,
            managers: BTreeSet::new(),
            rebalancers: BTreeSet::new(),
            vault,
            retired: false,
        }
    }

    #[must_use]
    pub fn with_manager(mut self, manager: Address) -> Self {
        self.managers.insert(manager);
        self
    }

    #[must_use]
    pub fn with_rebalancer(mut self, rebalancer: Address) -> Self {
        self.rebalancers.insert(rebalancer);
        self
    }

    pub fn owner(&self) -> Option<&Address> {
        self.owner.as_ref()
    }

    pub fn pending_owner(&self) -> Option<&Address> {
        self.pending_owner.as_ref()
    }

    pub fn vault(&self) -> &Address {
        &self.vault
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    fn deny(caller: &Address, role: Role) -> Error {
        Error::Unauthorized {
            caller: caller.to_string(),
            role,
        }
    }

    pub fn only_owner(&self, caller: &Address) -> Result<()> {
        match &self.owner {
            Some(owner) if owner == caller => Ok(()),
            _ => Err(Self::deny(caller, Role::Owner)),
        }
    }

    /// Managers and the owner.
    pub fn only_manager(&self, caller: &Address) -> Result<()> {
        if self.managers.contains(caller) || self.owner.as_ref() == Some(caller) {
            return Ok(());
        }
        Err(Self::deny(caller, Role::Manager))
    }

    /// Rebalancers plus everyone who passes [`Self::only_manager`].
    pub fn only_rebalancer(&self, caller: &Address) -> Result<()> {
        if self.rebalancers.contains(caller) || self.only_manager(caller).is_ok() {
            return Ok(());
        }
        Err(Self::deny(caller, Role::Rebalancer))
    }

    pub fn only_vault(&self, caller: &Address) -> Result<()> {
        if &self.vault == caller {
            return Ok(());
        }
        Err(Self::deny(caller, Role::Vault))
    }

    pub fn set_manager(&mut self, caller: &Address, manager: Address, enabled: bool) -> Result<()> {
        self.only_owner(caller)?;
        if enabled {
            self.managers.insert(manager);
        } else {
            self.managers.remove(&manager);
        }
        Ok(())
    }

    pub fn set_rebalancer(
        &mut self,
        caller: &Address,
        rebalancer: Address,
        enabled: bool,
    ) -> Result<()> {
        self.only_manager(caller)?;
        if enabled {
            self.rebalancers.insert(rebalancer);
        } else {
            self.rebalancers.remove(&rebalancer);
        }
        Ok(())
    }

    /// First step of an ownership transfer.
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.only_owner(caller)?;
        self.pending_owner = Some(new_owner);
        Ok(())
    }

    /// Completes a transfer started by [`Self::transfer_ownership`]; returns
    /// the previous owner.
    pub fn accept_ownership(&mut self, caller: &Address) -> Result<Option<Address>> {
        if self.pending_owner.as_ref() != Some(caller) {
            return Err(Self::deny(caller, Role::Owner));
        }
        self.pending_owner = None;
        let previous = self.owner.replace(caller.clone());
        info!(new_owner = %caller, "ownership transferred");
        Ok(previous)
    }

    pub fn mark_retired(&mut self, caller: &Address) -> Result<()> {
        self.only_owner(caller)?;
        self.retired = true;
        Ok(())
    }

    /// Drops the owner for good; only allowed once retired.
    pub fn renounce_ownership(&mut self, caller: &Address) -> Result<Option<Address>> {
        self.only_owner(caller)?;
        if !self.retired {
            return Err(Error::invalid_config(
                "ownership can only be renounced after retirement",
            ));
        }
        self.pending_owner = None;
        Ok(self.owner.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    fn access() -> AccessControl {
        AccessControl::new(addr("owner"), addr("vault"))
            .with_manager(addr("manager"))
            .with_rebalancer(addr("keeper"))
    }

    #[test]
    fn test_role_hierarchy() {
        let access = access();
        assert!(access.only_manager(&addr("owner")).is_ok());
        assert!(access.only_rebalancer(&addr("manager")).is_ok());
        assert!(access.only_rebalancer(&addr("keeper")).is_ok());
        assert!(access.only_manager(&addr("keeper")).is_err());
        assert!(access.only_vault(&addr("owner")).is_err());

        let err = access.only_owner(&addr("manager")).unwrap_err();
        assert_eq!(
            err,
            Error::Unauthorized {
                caller: "manager".to_string(),
                role: Role::Owner
            }
        );
    }

    #[test]
    fn test_two_step_transfer() {
        let mut access = access();
        access.transfer_ownership(&addr("owner"), addr("next")).unwrap();
        assert!(access.accept_ownership(&addr("stranger")).is_err());
        assert_eq!(access.owner(), Some(&addr("owner")));

        let previous = access.accept_ownership(&addr("next")).unwrap();
        assert_eq!(previous, Some(addr("owner")));
        assert!(access.only_owner(&addr("next")).is_ok());
        assert!(access.pending_owner().is_none());
    }

    #[test]
    fn test_renounce_requires_retirement() {
        let mut access = access();
        assert!(access.renounce_ownership(&addr("owner")).is_err());
        access.mark_retired(&addr("owner")).unwrap();
        access.renounce_ownership(&addr("owner")).unwrap();
        assert!(access.owner().is_none());
        assert!(access.only_manager(&addr("owner")).is_err());
    }

    #[test]
    fn test_allow_lists() {
        let mut access = access();
        assert!(access.set_manager(&addr("manager"), addr("m2"), true).is_err());
        access.set_rebalancer(&addr("manager"), addr("k2"), true).unwrap();
        assert!(access.only_rebalancer(&addr("k2")).is_ok());
        access.set_rebalancer(&addr("manager"), addr("k2"), false).unwrap();
        assert!(access.only_rebalancer(&addr("k2")).is_err());
    }
}
