//! # Engine Configuration
//!
//! Tunables for the order engine. Deserializable so a host application can
//! load it from its own config file; every field has a default, so
//! `EngineConfig::default()` is a fully working production configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use ordo_core::money::TaxRate;
use ordo_core::{validation, ValidationError, DEFAULT_TAX_RATE_BPS, RESERVATION_TTL_MINUTES};

/// Engine configuration.
///
/// ```rust,ignore
/// let config: EngineConfig = serde_json::from_str(raw)?;
/// config.validate()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How often the expiration sweeper wakes up, in seconds.
    pub sweep_interval_secs: u64,

    /// How long a created order holds its stock reservation, in minutes.
    pub reservation_ttl_minutes: i64,

    /// Tax rate applied to every order, in basis points (2000 = 20%).
    pub tax_rate_bps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sweep_interval_secs: 300,
            reservation_ttl_minutes: RESERVATION_TTL_MINUTES,
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
        }
    }
}

impl EngineConfig {
    /// Checks the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_tax_rate_bps(self.tax_rate_bps)?;

        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::MustBePositive {
                field: "sweep_interval_secs".to_string(),
            });
        }

        if self.reservation_ttl_minutes <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "reservation_ttl_minutes".to_string(),
            });
        }

        Ok(())
    }

    /// Sweeper wake-up interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Reservation window length.
    pub fn reservation_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reservation_ttl_minutes)
    }

    /// The configured tax rate.
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}
