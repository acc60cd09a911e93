use crate::access::AccessControl;
use crate::calm::CalmPeriodGuard;
use clm_vault_domain::error::{Error, Result};
use clm_vault_domain::fees::FeeConfig;
use serde::{Deserialize, Serialize};

/// Shared policy threaded through the position manager and harvest engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyContext {
    pub guard: CalmPeriodGuard,
    pub fees: FeeConfig,
    pub access: AccessControl,
    pub paused: bool,
}

impl StrategyContext {
    pub fn ensure_not_paused(&self) -> Result<()> {
        if self.paused {
            return Err(Error::Paused);
        }
        Ok(())
    }
}
