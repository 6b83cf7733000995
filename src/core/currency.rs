use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// ISO 4217 numeric currency code.
///
/// This is the value the ledger engine stores in an account's `ledger`
/// field, so every currency lives on its own ledger and postings can never
/// mix currencies.
///
/// # Examples
///
/// ```
/// use hyperfx_core::core::currency::CurrencyId;
///
/// let usd = CurrencyId::USD;
/// assert_eq!(usd.code(), 840);
/// assert_eq!(usd.alpha(), Some("USD"));
/// assert_eq!("usd".parse::<CurrencyId>().unwrap(), usd);
/// assert_eq!("840".parse::<CurrencyId>().unwrap(), usd);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyId(u32);

/// Largest asset scale a registry accepts. Minor units are `u64`, so one
/// major unit must stay representable.
pub const MAX_SCALE: u32 = 18;

/// Built-in currencies: (numeric code, alpha code, asset scale).
const CURRENCIES: &[(u32, &str, u32)] = &[
    (826, "GBP", 2),
    (840, "USD", 2),
    (978, "EUR", 2),
    (392, "JPY", 0),
    (124, "CAD", 2),
    (36, "AUD", 2),
    (756, "CHF", 2),
    (156, "CNY", 2),
    (344, "HKD", 2),
    (554, "NZD", 2),
    (752, "SEK", 2),
    (578, "NOK", 2),
    (208, "DKK", 2),
    (702, "SGD", 2),
    (356, "INR", 2),
    (484, "MXN", 2),
    (986, "BRL", 2),
    (710, "ZAR", 2),
    (643, "RUB", 2),
    (410, "KRW", 0),
    (949, "TRY", 2),
    (985, "PLN", 2),
    (764, "THB", 2),
    (360, "IDR", 2),
    (458, "MYR", 2),
    (608, "PHP", 2),
    (704, "VND", 0),
    (818, "EGP", 2),
    (566, "NGN", 2),
    (404, "KES", 2),
    (980, "UAH", 2),
    (152, "CLP", 0),
    (170, "COP", 2),
    (604, "PEN", 2),
    (32, "ARS", 2),
    (682, "SAR", 2),
    (784, "AED", 2),
    (414, "KWD", 3),
    (634, "QAR", 2),
];

impl CurrencyId {
    pub const GBP: CurrencyId = CurrencyId(826);
    pub const USD: CurrencyId = CurrencyId(840);
    pub const EUR: CurrencyId = CurrencyId(978);
    pub const JPY: CurrencyId = CurrencyId(392);
    pub const CHF: CurrencyId = CurrencyId(756);
    pub const KWD: CurrencyId = CurrencyId(414);

    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    /// The numeric code, as used for the ledger field.
    pub const fn code(self) -> u32 {
        self.0
    }

    /// Alphabetic ISO code, if this is one of the built-in currencies.
    pub fn alpha(self) -> Option<&'static str> {
        CURRENCIES
            .iter()
            .find(|(code, _, _)| *code == self.0)
            .map(|(_, alpha, _)| *alpha)
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.alpha() {
            Some(alpha) => write!(f, "{}", alpha),
            None => write!(f, "{:03}", self.0),
        }
    }
}

impl From<u32> for CurrencyId {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

/// Errors from parsing a currency or building a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("unknown currency '{0}'")]
    Unknown(String),
    #[error("local currency is not set")]
    LocalUnset,
    #[error("local currency {0} has no asset scale entry")]
    LocalWithoutScale(CurrencyId),
    #[error("asset scale {scale} for {currency} exceeds the maximum of {MAX_SCALE}")]
    ScaleOutOfRange { currency: CurrencyId, scale: u32 },
}

impl FromStr for CurrencyId {
    type Err = CurrencyError;

    /// Accepts either the numeric code ("978") or the alphabetic code ("EUR").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u32>() {
            return Ok(Self(code));
        }
        CURRENCIES
            .iter()
            .find(|(_, alpha, _)| alpha.eq_ignore_ascii_case(s))
            .map(|(code, _, _)| Self(*code))
            .ok_or_else(|| CurrencyError::Unknown(s.to_string()))
    }
}

/// Immutable mapping from currency to asset scale, plus the deployment's
/// local (settlement) currency.
///
/// The asset scale is the number of decimal digits between the minor unit
/// the ledger stores and the display unit: USD has scale 2 (cents), JPY
/// has scale 0, KWD has scale 3 (fils).
///
/// Built once at startup and shared read-only afterwards.
///
/// # Examples
///
/// ```
/// use hyperfx_core::core::currency::{CurrencyId, ScaleRegistry};
///
/// let registry = ScaleRegistry::new(CurrencyId::GBP).unwrap();
/// assert_eq!(registry.local(), CurrencyId::GBP);
/// assert_eq!(registry.scale(CurrencyId::JPY), 0);
/// assert_eq!(registry.scale(CurrencyId::KWD), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleRegistry {
    scales: BTreeMap<CurrencyId, u32>,
    local: CurrencyId,
}

impl ScaleRegistry {
    /// Registry over the built-in currency table.
    pub fn new(local: CurrencyId) -> Result<Self, CurrencyError> {
        Self::with_scales(
            CURRENCIES
                .iter()
                .map(|(code, _, scale)| (CurrencyId(*code), *scale)),
            local,
        )
    }

    /// Registry over an explicit table, for deployments that trade a
    /// restricted set of currencies.
    pub fn with_scales(
        scales: impl IntoIterator<Item = (CurrencyId, u32)>,
        local: CurrencyId,
    ) -> Result<Self, CurrencyError> {
        if local.code() == 0 {
            return Err(CurrencyError::LocalUnset);
        }
        let scales: BTreeMap<_, _> = scales.into_iter().collect();
        if let Some((&currency, &scale)) = scales.iter().find(|(_, scale)| **scale > MAX_SCALE) {
            return Err(CurrencyError::ScaleOutOfRange { currency, scale });
        }
        if !scales.contains_key(&local) {
            return Err(CurrencyError::LocalWithoutScale(local));
        }
        Ok(Self { scales, local })
    }

    /// The local settlement currency.
    pub fn local(&self) -> CurrencyId {
        self.local
    }

    /// Asset scale of `currency`.
    ///
    /// # Panics
    ///
    /// Panics if `currency` is not in the registry. Inputs must be validated
    /// with [`ScaleRegistry::try_scale`] or [`ScaleRegistry::contains`]
    /// first; reaching this panic means the configuration is broken.
    pub fn scale(&self, currency: CurrencyId) -> u32 {
        match self.try_scale(currency) {
            Some(scale) => scale,
            None => panic!("no asset scale registered for currency {}", currency),
        }
    }

    pub fn try_scale(&self, currency: CurrencyId) -> Option<u32> {
        self.scales.get(&currency).copied()
    }

    pub fn contains(&self, currency: CurrencyId) -> bool {
        self.scales.contains_key(&currency)
    }

    /// All registered currencies in ascending numeric order.
    pub fn currencies(&self) -> impl Iterator<Item = CurrencyId> + '_ {
        self.scales.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}
