use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::value_objects::Address;
use serde::{Deserialize, Serialize};

/// Identity of a vault and its share token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault account; also the address of its share token.
    pub address: Address,
    pub name: String,
    pub symbol: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: Address::new("vault"),
            name: "CLM Vault Share".to_string(),
            symbol: "clmV".to_string(),
        }
    }
}

impl VaultConfig {
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.symbol.trim().is_empty() {
            return Err(Error::invalid_config("vault name and symbol must be set"));
        }
        if self.address.as_str() == Address::DEAD {
            return Err(Error::invalid_config("vault cannot live at the dead address"));
        }
        Ok(())
    }
}
