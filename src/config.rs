//! Deployment configuration, read from a JSON file.
//!
//! ```json
//! {
//!   "local_currency": "GBP",
//!   "data_dir": "/var/lib/hyperfx",
//!   "namespace": { "auto_generate": false },
//!   "bootstrap": { "failure_policy": "abort" },
//!   "rates_max_age_secs": 900,
//!   "rates": [
//!     { "currency": "EUR", "direction": "SELL", "rate": "1.19" },
//!     { "currency": "EUR", "direction": "BUY", "rate": "0.84" }
//!   ]
//! }
//! ```

use crate::bootstrap::FailurePolicy;
use crate::conversion::{FixedRateSource, Rate, RateError, TradeDirection};
use crate::core::currency::{CurrencyError, CurrencyId, ScaleRegistry};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Data directory name under the user's home when none is configured.
pub const DEFAULT_DATA_DIR: &str = ".hyperfx";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid currency: {0}")]
    Currency(#[from] CurrencyError),
    #[error("rate for {currency} {direction}: {source}")]
    Rate {
        currency: CurrencyId,
        direction: TradeDirection,
        #[source]
        source: RateError,
    },
    #[error("rate configured for unsupported currency {0}")]
    RateCurrency(CurrencyId),
    #[error("no data_dir configured and HOME is not set")]
    NoDataDir,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Generate and persist a new namespace when none exists. Only for the
    /// very first start of a deployment.
    #[serde(default)]
    pub auto_generate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

/// One operator-set rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub currency: String,
    pub direction: TradeDirection,
    pub rate: Decimal,
    /// Defaults to the time the config is loaded.
    #[serde(default)]
    pub quoted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Numeric ("826") or alphabetic ("GBP") code.
    pub local_currency: String,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub namespace: NamespaceConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub rates: Vec<RateEntry>,
    #[serde(default)]
    pub rates_max_age_secs: Option<u32>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Check every setting resolves, so misconfiguration stops startup
    /// before anything touches the ledger.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let registry = self.registry()?;
        self.rate_source(&registry)?;
        self.data_dir()?;
        Ok(())
    }

    pub fn local_currency(&self) -> Result<CurrencyId, ConfigError> {
        Ok(self.local_currency.parse()?)
    }

    /// Scale registry over the built-in currency table.
    pub fn registry(&self) -> Result<ScaleRegistry, ConfigError> {
        Ok(ScaleRegistry::new(self.local_currency()?)?)
    }

    /// Configured data directory, or `$HOME/.hyperfx`.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| PathBuf::from(home).join(DEFAULT_DATA_DIR))
            .ok_or(ConfigError::NoDataDir)
    }

    /// Rate table built from the `rates` entries.
    pub fn rate_source(&self, registry: &ScaleRegistry) -> Result<FixedRateSource, ConfigError> {
        let now = Utc::now();
        let mut rates = FixedRateSource::new();
        if let Some(secs) = self.rates_max_age_secs {
            rates = rates.with_max_age(Duration::seconds(i64::from(secs)));
        }

        for entry in &self.rates {
            let currency: CurrencyId = entry.currency.parse()?;
            if !registry.contains(currency) || currency == registry.local() {
                return Err(ConfigError::RateCurrency(currency));
            }
            let rate = Rate::at(entry.rate, entry.quoted_at.unwrap_or(now)).map_err(
                |source| ConfigError::Rate {
                    currency,
                    direction: entry.direction,
                    source,
                },
            )?;
            rates.set(currency, entry.direction, rate);
        }
        Ok(rates)
    }
}
