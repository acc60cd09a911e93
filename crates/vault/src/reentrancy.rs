use clm_vault_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Rejects nested entry into a deposit or withdrawal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReentrancyGuard {
    entered: bool,
}

impl ReentrancyGuard {
    pub fn enter(&mut self) -> Result<()> {
        if self.entered {
            return Err(Error::Reentrancy);
        }
        self.entered = true;
        Ok(())
    }

    pub fn exit(&mut self) {
        self.entered = false;
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_entry_rejected() {
        let mut guard = ReentrancyGuard::default();
        guard.enter().unwrap();
        assert_eq!(guard.enter(), Err(Error::Reentrancy));
        guard.exit();
        assert!(guard.enter().is_ok());
    }
}
