use crate::conversion::TradeDirection;
use crate::core::currency::CurrencyId;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors arising from obtaining an exchange rate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateError {
    #[error("no {direction} rate available for {currency}")]
    Unavailable {
        currency: CurrencyId,
        direction: TradeDirection,
    },
    #[error("{direction} rate for {currency} quoted at {quoted_at} is older than {max_age_secs}s")]
    Stale {
        currency: CurrencyId,
        direction: TradeDirection,
        quoted_at: DateTime<Utc>,
        max_age_secs: i64,
    },
    #[error("exchange rate must be positive, got {0}")]
    NotPositive(Decimal),
    #[error("rate source failed: {0}")]
    Source(String),
}

/// A quoted exchange rate for one foreign currency and trade direction.
///
/// Quoting follows the direction so the arithmetic always works in the
/// house's favour:
/// - a [`TradeDirection::Sell`] rate is foreign units per local unit,
/// - a [`TradeDirection::Buy`] rate is local units per foreign unit.
///
/// The value is always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRate")]
pub struct Rate {
    value: Decimal,
    quoted_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawRate {
    value: Decimal,
    quoted_at: DateTime<Utc>,
}

impl TryFrom<RawRate> for Rate {
    type Error = RateError;

    fn try_from(raw: RawRate) -> Result<Self, Self::Error> {
        Rate::at(raw.value, raw.quoted_at)
    }
}

impl Rate {
    /// A rate quoted now.
    pub fn new(value: Decimal) -> Result<Self, RateError> {
        Self::at(value, Utc::now())
    }

    /// A rate quoted at a given time.
    pub fn at(value: Decimal, quoted_at: DateTime<Utc>) -> Result<Self, RateError> {
        if value <= Decimal::ZERO {
            return Err(RateError::NotPositive(value));
        }
        Ok(Self { value, quoted_at })
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn quoted_at(&self) -> DateTime<Utc> {
        self.quoted_at
    }

    /// Age of the quote relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.quoted_at
    }
}

/// Where exchange rates come from.
///
/// Implementations own the freshness contract: a rate that is missing or
/// too old must be an error, never a default.
pub trait RateSource {
    fn rate(&self, currency: CurrencyId, direction: TradeDirection) -> Result<Rate, RateError>;
}

impl<T: RateSource + ?Sized> RateSource for &T {
    fn rate(&self, currency: CurrencyId, direction: TradeDirection) -> Result<Rate, RateError> {
        (**self).rate(currency, direction)
    }
}

/// A table of rates set by an operator, with an optional maximum age.
///
/// # Examples
///
/// ```
/// use hyperfx_core::conversion::{FixedRateSource, Rate, RateSource, TradeDirection};
/// use hyperfx_core::core::currency::CurrencyId;
/// use rust_decimal_macros::dec;
///
/// let mut rates = FixedRateSource::new();
/// rates.set(CurrencyId::EUR, TradeDirection::Sell, Rate::new(dec!(1.19)).unwrap());
///
/// let rate = rates.rate(CurrencyId::EUR, TradeDirection::Sell).unwrap();
/// assert_eq!(rate.value(), dec!(1.19));
/// assert!(rates.rate(CurrencyId::EUR, TradeDirection::Buy).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixedRateSource {
    rates: HashMap<(CurrencyId, TradeDirection), Rate>,
    max_age: Option<Duration>,
}

impl FixedRateSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject quotes older than `max_age` at lookup time.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn set(&mut self, currency: CurrencyId, direction: TradeDirection, rate: Rate) {
        self.rates.insert((currency, direction), rate);
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Lookup as of `now`; [`RateSource::rate`] uses the current time.
    pub fn rate_at(
        &self,
        currency: CurrencyId,
        direction: TradeDirection,
        now: DateTime<Utc>,
    ) -> Result<Rate, RateError> {
        let rate = self
            .rates
            .get(&(currency, direction))
            .copied()
            .ok_or(RateError::Unavailable {
                currency,
                direction,
            })?;

        if let Some(max_age) = self.max_age {
            if rate.age(now) > max_age {
                return Err(RateError::Stale {
                    currency,
                    direction,
                    quoted_at: rate.quoted_at,
                    max_age_secs: max_age.num_seconds(),
                });
            }
        }
        Ok(rate)
    }
}

impl RateSource for FixedRateSource {
    fn rate(&self, currency: CurrencyId, direction: TradeDirection) -> Result<Rate, RateError> {
        self.rate_at(currency, direction, Utc::now())
    }
}
