use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency amount in minor units (cents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Build from whole units and cents, e.g. `Money::new(12, 50)` is 12.50
    pub const fn new(major: i64, minor: i64) -> Self {
        Money(major * 100 + minor)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Sum of `amounts`, `None` on overflow
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |total, amount| total.checked_add(amount))
    }

    /// Multiply by a decimal factor, rounding half away from zero to whole minor units
    pub fn mul_rounded(self, factor: Decimal) -> Option<Money> {
        Decimal::from(self.0)
            .checked_mul(factor)
            .map(round_minor)
            .and_then(|d| d.to_i64())
            .map(Money)
    }

    /// `self * percentage / 100`, rounded to whole minor units
    pub fn percentage_of(self, percentage: Decimal) -> Option<Money> {
        self.mul_rounded(percentage.checked_div(Decimal::ONE_HUNDRED)?)
    }

    /// Share of `base` that `self` represents, in percent. `None` when `base` is zero.
    pub fn ratio_percent(self, base: Money) -> Option<Decimal> {
        if base.is_zero() {
            return None;
        }
        Decimal::from(self.0)
            .checked_mul(Decimal::ONE_HUNDRED)?
            .checked_div(Decimal::from(base.0))
            .map(|d| d.normalize())
    }

    /// Value in major units
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

fn round_minor(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_and_minor() {
        assert_eq!(Money::new(12, 50).minor(), 1250);
        assert_eq!(Money::from_minor(200).to_decimal(), dec!(2.00));
    }

    #[test]
    fn test_mul_rounded_half_away_from_zero() {
        // 0.5 cent rounds up
        assert_eq!(Money::from_minor(1).mul_rounded(dec!(0.5)), Some(Money::from_minor(1)));
        assert_eq!(Money::from_minor(3).mul_rounded(dec!(0.5)), Some(Money::from_minor(2)));
        assert_eq!(Money::from_minor(-3).mul_rounded(dec!(0.5)), Some(Money::from_minor(-2)));
        assert_eq!(Money::from_minor(200).mul_rounded(dec!(100)), Some(Money::from_minor(20_000)));
    }

    #[test]
    fn test_percentage_of() {
        let subtotal = Money::new(1000, 0);
        assert_eq!(subtotal.percentage_of(dec!(20)), Some(Money::new(200, 0)));
        assert_eq!(Money::from_minor(333).percentage_of(dec!(10)), Some(Money::from_minor(33)));
    }

    #[test]
    fn test_ratio_percent() {
        let subtotal = Money::new(1000, 0);
        assert_eq!(Money::new(150, 0).ratio_percent(subtotal), Some(dec!(15)));
        assert_eq!(Money::new(150, 0).ratio_percent(Money::ZERO), None);
    }

    #[test]
    fn test_sum_and_display() {
        let total = Money::checked_sum([Money::new(1, 25), Money::new(2, 75)]).unwrap();
        assert_eq!(total, Money::new(4, 0));
        assert_eq!(total.to_string(), "4.00");
        assert_eq!(Money::from_minor(-5).to_string(), "-0.05");
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(Money::from_minor(i64::MAX).checked_add(Money::from_minor(1)), None);
        assert_eq!(Money::from_minor(i64::MAX).mul_rounded(dec!(2)), None);
        assert_eq!(
            Money::checked_sum([Money::from_minor(i64::MAX - 1), Money::from_minor(2)]),
            None
        );
    }
}
