//! Registry configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Default number of indices verified after a family is unlocked
pub const DEFAULT_SELF_CHECK_SAMPLES: u32 = 500;

/// Environment override for [`WalletConfig::self_check_samples`]
pub const SELF_CHECK_SAMPLES_ENV: &str = "NODEKEYS_SELF_CHECK_SAMPLES";

/// Wallet configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Number of child indices whose public and private derivations are
    /// compared when a family is unlocked
    pub self_check_samples: u32,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            self_check_samples: DEFAULT_SELF_CHECK_SAMPLES,
        }
    }
}

impl WalletConfig {
    /// Set the self-check sample size
    pub fn with_self_check_samples(mut self, samples: u32) -> Self {
        self.self_check_samples = samples;
        self
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overridden by `NODEKEYS_SELF_CHECK_SAMPLES` when set
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = env::var(SELF_CHECK_SAMPLES_ENV) {
            config.self_check_samples = value.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a non-negative integer, got {:?}",
                    SELF_CHECK_SAMPLES_ENV, value
                ))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would disable the unlock self-check
    pub fn validate(&self) -> Result<()> {
        if self.self_check_samples == 0 {
            return Err(Error::Config(
                "self_check_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
