//! Currency conversion between the local settlement currency and foreign
//! currencies, in integer minor units, rounded so the house never gives
//! away a fractional unit.

pub mod engine;
pub mod rate;

pub use engine::{
    foreign_from_local, local_from_foreign, ConversionEngine, ConversionError, PRECISION,
};
pub use rate::{FixedRateSource, Rate, RateError, RateSource};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether the house is buying foreign currency from the counterparty or
/// selling it to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeDirection::Buy => "BUY",
            TradeDirection::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeDirection::Buy),
            "SELL" => Ok(TradeDirection::Sell),
            other => Err(format!("unknown trade direction '{}', expected BUY or SELL", other)),
        }
    }
}
