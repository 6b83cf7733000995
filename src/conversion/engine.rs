use crate::conversion::rate::{Rate, RateError, RateSource};
use crate::conversion::TradeDirection;
use crate::core::currency::{CurrencyId, ScaleRegistry};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Decimal places kept for the intermediate result of a division by a rate.
pub const PRECISION: u32 = 9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error(transparent)]
    Rate(#[from] RateError),
    #[error("currency {0} is not supported")]
    UnsupportedCurrency(CurrencyId),
    #[error("cannot convert the local currency {0} against itself")]
    SameCurrency(CurrencyId),
    #[error("converted amount does not fit in a minor-unit amount")]
    Overflow,
    #[error("rate {0} carries more precision than the conversion can represent exactly")]
    Inexact(Decimal),
}

/// Local minor units for `foreign_amount` minor units of `foreign`.
///
/// - Sell: the counterparty pays local currency for foreign. The amount is
///   divided by the rate (foreign per local) and rounded up.
/// - Buy: the house pays local currency for foreign. The amount is
///   multiplied by the rate (local per foreign) and rounded down.
///
/// # Examples
///
/// ```
/// use hyperfx_core::conversion::{local_from_foreign, Rate, TradeDirection};
/// use hyperfx_core::core::currency::{CurrencyId, ScaleRegistry};
/// use rust_decimal_macros::dec;
///
/// let registry = ScaleRegistry::new(CurrencyId::GBP).unwrap();
/// let rate = Rate::new(dec!(1.19)).unwrap();
///
/// // EUR 100.00 costs GBP 84.04 (84.0336... rounded up).
/// let local = local_from_foreign(&registry, TradeDirection::Sell, 10_000, CurrencyId::EUR, &rate);
/// assert_eq!(local, Ok(8_404));
/// ```
pub fn local_from_foreign(
    registry: &ScaleRegistry,
    direction: TradeDirection,
    foreign_amount: u64,
    foreign: CurrencyId,
    rate: &Rate,
) -> Result<u64, ConversionError> {
    check_pair(registry, foreign)?;
    let amount = to_major(foreign_amount, registry.scale(foreign))?;
    let local_scale = registry.scale(registry.local());

    match direction {
        TradeDirection::Sell => to_minor(
            divide(amount, rate)?,
            local_scale,
            RoundingStrategy::ToPositiveInfinity,
        ),
        TradeDirection::Buy => to_minor(
            multiply(amount, rate)?,
            local_scale,
            RoundingStrategy::ToNegativeInfinity,
        ),
    }
}

/// Foreign minor units of `foreign` for `local_amount` local minor units.
///
/// - Sell: the house hands out foreign currency. The amount is multiplied
///   by the rate (foreign per local) and rounded down.
/// - Buy: the counterparty hands over foreign currency. The amount is
///   divided by the rate (local per foreign) and rounded up.
pub fn foreign_from_local(
    registry: &ScaleRegistry,
    direction: TradeDirection,
    local_amount: u64,
    foreign: CurrencyId,
    rate: &Rate,
) -> Result<u64, ConversionError> {
    check_pair(registry, foreign)?;
    let amount = to_major(local_amount, registry.scale(registry.local()))?;
    let foreign_scale = registry.scale(foreign);

    match direction {
        TradeDirection::Sell => to_minor(
            multiply(amount, rate)?,
            foreign_scale,
            RoundingStrategy::ToNegativeInfinity,
        ),
        TradeDirection::Buy => to_minor(
            divide(amount, rate)?,
            foreign_scale,
            RoundingStrategy::ToPositiveInfinity,
        ),
    }
}

fn check_pair(registry: &ScaleRegistry, foreign: CurrencyId) -> Result<(), ConversionError> {
    if foreign == registry.local() {
        return Err(ConversionError::SameCurrency(foreign));
    }
    if !registry.contains(foreign) {
        return Err(ConversionError::UnsupportedCurrency(foreign));
    }
    Ok(())
}

/// Minor units to a display-unit decimal, exactly.
fn to_major(amount: u64, scale: u32) -> Result<Decimal, ConversionError> {
    let mut value = Decimal::from(amount);
    value
        .set_scale(scale)
        .map_err(|_| ConversionError::Overflow)?;
    Ok(value)
}

/// Exact product of `amount` and the rate.
///
/// `Decimal` multiplication rounds to nearest once the product outgrows 96
/// bits or 28 places, which would let the directional floor hand out a unit
/// that is not owed. A product that lost its full scale is rejected.
fn multiply(amount: Decimal, rate: &Rate) -> Result<Decimal, ConversionError> {
    let product = amount
        .checked_mul(rate.value())
        .ok_or(ConversionError::Overflow)?;
    if !product.is_zero() && product.scale() != amount.scale() + rate.value().scale() {
        return Err(ConversionError::Inexact(rate.value()));
    }
    Ok(product)
}

fn divide(amount: Decimal, rate: &Rate) -> Result<Decimal, ConversionError> {
    amount
        .checked_div(rate.value())
        .map(|q| q.round_dp_with_strategy(PRECISION, RoundingStrategy::MidpointAwayFromZero))
        .ok_or(ConversionError::Overflow)
}

/// Round to `scale` places with `strategy`, then express in minor units.
fn to_minor(value: Decimal, scale: u32, strategy: RoundingStrategy) -> Result<u64, ConversionError> {
    let rounded = value.round_dp_with_strategy(scale, strategy);
    let unit = 10u64.checked_pow(scale).ok_or(ConversionError::Overflow)?;
    rounded
        .checked_mul(Decimal::from(unit))
        .and_then(|minor| minor.to_u64())
        .ok_or(ConversionError::Overflow)
}

/// Conversions against live rates from a [`RateSource`].
///
/// Holds no mutable state; share it freely between threads when the rate
/// source allows it.
#[derive(Debug, Clone)]
pub struct ConversionEngine<R> {
    registry: ScaleRegistry,
    rates: R,
}

impl<R: RateSource> ConversionEngine<R> {
    pub fn new(registry: ScaleRegistry, rates: R) -> Self {
        Self { registry, rates }
    }

    pub fn registry(&self) -> &ScaleRegistry {
        &self.registry
    }

    pub fn rates(&self) -> &R {
        &self.rates
    }

    /// See [`local_from_foreign`]. Fails if the rate source cannot quote.
    pub fn local_from_foreign(
        &self,
        direction: TradeDirection,
        foreign_amount: u64,
        foreign: CurrencyId,
    ) -> Result<u64, ConversionError> {
        check_pair(&self.registry, foreign)?;
        let rate = self.rates.rate(foreign, direction)?;
        local_from_foreign(&self.registry, direction, foreign_amount, foreign, &rate)
    }

    /// See [`foreign_from_local`]. Fails if the rate source cannot quote.
    pub fn foreign_from_local(
        &self,
        direction: TradeDirection,
        local_amount: u64,
        foreign: CurrencyId,
    ) -> Result<u64, ConversionError> {
        check_pair(&self.registry, foreign)?;
        let rate = self.rates.rate(foreign, direction)?;
        foreign_from_local(&self.registry, direction, local_amount, foreign, &rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::rate::FixedRateSource;
    use rust_decimal_macros::dec;

    fn registry() -> ScaleRegistry {
        ScaleRegistry::new(CurrencyId::GBP).unwrap()
    }

    fn rate(value: Decimal) -> Rate {
        Rate::new(value).unwrap()
    }

    #[test]
    fn test_local_from_foreign_sell_rounds_up() {
        let local = local_from_foreign(
            &registry(),
            TradeDirection::Sell,
            10_000,
            CurrencyId::EUR,
            &rate(dec!(1.19)),
        );
        // 100.00 / 1.19 = 84.033613445 -> 84.04
        assert_eq!(local, Ok(8_404));
    }

    #[test]
    fn test_local_from_foreign_buy_rounds_down() {
        let r = registry();
        let eur = CurrencyId::EUR;
        assert_eq!(
            local_from_foreign(&r, TradeDirection::Buy, 10_000, eur, &rate(dec!(0.84))),
            Ok(8_400)
        );
        // 100.00 * 0.84375 = 84.375 -> 84.37
        assert_eq!(
            local_from_foreign(&r, TradeDirection::Buy, 10_000, eur, &rate(dec!(0.84375))),
            Ok(8_437)
        );
    }

    #[test]
    fn test_foreign_from_local_sell_rounds_down() {
        // 84.04 * 1.19 = 100.0076 -> 100.00
        assert_eq!(
            foreign_from_local(
                &registry(),
                TradeDirection::Sell,
                8_404,
                CurrencyId::EUR,
                &rate(dec!(1.19))
            ),
            Ok(10_000)
        );
    }

    #[test]
    fn test_foreign_from_local_buy_rounds_up() {
        // 100.00 / 0.84 = 119.047619048 -> 119.05
        assert_eq!(
            foreign_from_local(
                &registry(),
                TradeDirection::Buy,
                10_000,
                CurrencyId::EUR,
                &rate(dec!(0.84))
            ),
            Ok(11_905)
        );
    }

    #[test]
    fn test_zero_scale_currency() {
        let r = registry();
        let yen = rate(dec!(187.5));
        // GBP 10.00 -> JPY 1875
        assert_eq!(
            foreign_from_local(&r, TradeDirection::Sell, 1_000, CurrencyId::JPY, &yen),
            Ok(1_875)
        );
        // JPY 1000 / 187.5 = 5.333333333 -> GBP 5.34
        assert_eq!(
            local_from_foreign(&r, TradeDirection::Sell, 1_000, CurrencyId::JPY, &yen),
            Ok(534)
        );
    }

    #[test]
    fn test_three_decimal_currency() {
        let r = registry();
        let kwd = rate(dec!(0.3791));
        // GBP 123.45 * 0.3791 = 46.799895 -> KWD 46.799
        assert_eq!(
            foreign_from_local(&r, TradeDirection::Sell, 12_345, CurrencyId::KWD, &kwd),
            Ok(46_799)
        );
        // KWD 46.799 / 0.3791 = 123.447639145 -> GBP 123.45
        assert_eq!(
            local_from_foreign(&r, TradeDirection::Sell, 46_799, CurrencyId::KWD, &kwd),
            Ok(12_345)
        );
    }

    #[test]
    fn test_division_uses_fixed_precision() {
        // 1.00 / 0.9999999996 = 1.0000000004000..., which is 1.000000000 at
        // nine places, so ceiling to cents leaves it at 1.00.
        assert_eq!(
            local_from_foreign(
                &registry(),
                TradeDirection::Sell,
                100,
                CurrencyId::EUR,
                &rate(dec!(0.9999999996))
            ),
            Ok(100)
        );
    }

    #[test]
    fn test_long_rate_never_rounds_product_up() {
        let r = registry();
        // 0.01 * 0.99999999999999999999 = 0.0099999999999999999999, exact.
        let twenty_nines = rate(dec!(0.99999999999999999999));
        assert_eq!(
            foreign_from_local(&r, TradeDirection::Sell, 1, CurrencyId::EUR, &twenty_nines),
            Ok(0)
        );
        assert_eq!(
            local_from_foreign(&r, TradeDirection::Buy, 1, CurrencyId::EUR, &twenty_nines),
            Ok(0)
        );

        // Thirty places are needed; rounding to 28 would yield 0.01.
        let value = dec!(0.9999999999999999999999999999);
        let long = rate(value);
        assert_eq!(
            foreign_from_local(&r, TradeDirection::Sell, 1, CurrencyId::EUR, &long),
            Err(ConversionError::Inexact(value))
        );
        assert_eq!(
            local_from_foreign(&r, TradeDirection::Buy, 1, CurrencyId::EUR, &long),
            Err(ConversionError::Inexact(value))
        );
    }

    #[test]
    fn test_zero_amount() {
        let r = registry();
        let eur = rate(dec!(1.19));
        for direction in [TradeDirection::Buy, TradeDirection::Sell] {
            assert_eq!(local_from_foreign(&r, direction, 0, CurrencyId::EUR, &eur), Ok(0));
            assert_eq!(foreign_from_local(&r, direction, 0, CurrencyId::EUR, &eur), Ok(0));
        }
    }

    #[test]
    fn test_overflow() {
        let result = foreign_from_local(
            &registry(),
            TradeDirection::Sell,
            u64::MAX,
            CurrencyId::EUR,
            &rate(dec!(1000)),
        );
        assert_eq!(result, Err(ConversionError::Overflow));
    }

    #[test]
    fn test_rejects_local_and_unknown_currency() {
        let r = registry();
        let one = rate(Decimal::ONE);
        assert_eq!(
            local_from_foreign(&r, TradeDirection::Sell, 100, CurrencyId::GBP, &one),
            Err(ConversionError::SameCurrency(CurrencyId::GBP))
        );
        assert_eq!(
            foreign_from_local(&r, TradeDirection::Buy, 100, CurrencyId::new(999), &one),
            Err(ConversionError::UnsupportedCurrency(CurrencyId::new(999)))
        );
    }

    #[test]
    fn test_engine_uses_directional_rates() {
        let mut rates = FixedRateSource::new();
        rates.set(CurrencyId::EUR, TradeDirection::Sell, rate(dec!(1.19)));
        rates.set(CurrencyId::EUR, TradeDirection::Buy, rate(dec!(0.84)));
        let engine = ConversionEngine::new(registry(), rates);

        assert_eq!(
            engine.local_from_foreign(TradeDirection::Sell, 10_000, CurrencyId::EUR),
            Ok(8_404)
        );
        assert_eq!(
            engine.local_from_foreign(TradeDirection::Buy, 10_000, CurrencyId::EUR),
            Ok(8_400)
        );
    }

    #[test]
    fn test_engine_propagates_missing_rate() {
        let engine = ConversionEngine::new(registry(), FixedRateSource::new());
        assert_eq!(
            engine.foreign_from_local(TradeDirection::Sell, 10_000, CurrencyId::EUR),
            Err(ConversionError::Rate(RateError::Unavailable {
                currency: CurrencyId::EUR,
                direction: TradeDirection::Sell,
            }))
        );
    }
}
