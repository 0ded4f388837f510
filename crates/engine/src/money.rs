use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Number of fractional digits kept on every monetary value.
pub const MONEY_SCALE: u32 = 2;

/// Number of fractional digits kept on per-unit costs (weighted averages).
pub const UNIT_COST_SCALE: u32 = 4;

/// Signed money amount with a fixed precision of **2 decimal places**.
///
/// Use this type for **all** monetary values in the engine (cost buckets,
/// stock values, sale prices, payments) so repeated accumulation never drifts
/// from the sum of its parts. Rounding happens once, when the value is built,
/// using midpoint-away-from-zero.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
/// use rust_decimal::Decimal;
///
/// let amount = Money::new(Decimal::new(12_345, 3));
/// assert_eq!(amount.to_string(), "12.35");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().to_string(), "10.00");
/// assert_eq!("10,5".parse::<Money>().unwrap().to_string(), "10.50");
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Creates a new amount, rounding to 2 decimal places.
    #[must_use]
    pub fn new(value: Decimal) -> Self {
        Self(round_to(value, MONEY_SCALE))
    }

    /// Money value of `quantity` units priced at `unit_price`.
    ///
    /// Fails with [`EngineError::InvalidQuantity`] when the product does not
    /// fit in a `Decimal`.
    pub fn from_product(quantity: Decimal, unit_price: Decimal) -> ResultEngine<Self> {
        quantity
            .checked_mul(unit_price)
            .map(Self::new)
            .ok_or_else(|| {
                EngineError::InvalidQuantity(format!("{quantity} x {unit_price} is out of range"))
            })
    }

    /// `self + rhs`, failing with [`EngineError::InvalidQuantity`] on overflow.
    pub fn checked_add(self, rhs: Money) -> ResultEngine<Money> {
        self.0
            .checked_add(rhs.0)
            .map(Money)
            .ok_or_else(|| EngineError::InvalidQuantity(format!("{self} + {rhs} is out of range")))
    }

    /// Returns the underlying decimal.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[must_use]
    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `self / base * 100`, rounded to 2 places. `None` when `base` is not
    /// positive or the ratio does not fit.
    #[must_use]
    pub fn percent_of(self, base: Money) -> Option<Decimal> {
        if !base.is_positive() {
            return None;
        }
        let ratio = self.0.checked_div(base.0)?;
        ratio
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|percent| round_to(percent, MONEY_SCALE))
    }

    /// Splits the amount over `count` heads. `None` when `count` is 0.
    #[must_use]
    pub fn per_head(self, count: u32) -> Option<Money> {
        if count == 0 {
            return None;
        }
        Some(Money::new(self.0 / Decimal::from(count)))
    }

    /// Larger of the two amounts.
    #[must_use]
    pub fn max(self, other: Money) -> Money {
        if self >= other { self } else { other }
    }
}

/// Rounds `value` to `scale` places, midpoint away from zero, and normalizes
/// the scale so `8.5` and `8.50` compare and print alike.
pub(crate) fn round_to(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Rounds a per-unit cost to [`UNIT_COST_SCALE`] places.
pub(crate) fn round_unit_cost(value: Decimal) -> Decimal {
    round_to(value, UNIT_COST_SCALE)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into a 2-place amount.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    ///
    /// Validation rules:
    /// - max 2 fractional digits (rejects `12.345`)
    /// - rejects empty/invalid strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidAmount("empty amount".to_string()));
        }

        let normalized = trimmed.replace(',', ".");
        let (negative, unsigned) = if let Some(stripped) = normalized.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = normalized.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, normalized.as_str())
        };
        if unsigned.is_empty()
            || unsigned.starts_with('.')
            || !unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
        {
            return Err(EngineError::InvalidAmount("invalid amount".to_string()));
        }
        if let Some((_, frac)) = unsigned.split_once('.')
            && frac.len() > MONEY_SCALE as usize
        {
            return Err(EngineError::InvalidAmount("too many decimals".to_string()));
        }

        let value = Decimal::from_str(unsigned)
            .map_err(|_| EngineError::InvalidAmount("invalid amount".to_string()))?;
        Ok(Money::new(if negative { -value } else { value }))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn new_rounds_half_away_from_zero() {
        assert_eq!(Money::new(dec!(1.005)).amount(), dec!(1.01));
        assert_eq!(Money::new(dec!(-1.005)).amount(), dec!(-1.01));
        assert_eq!(Money::new(dec!(8.5)).to_string(), "8.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().amount(), dec!(10));
        assert_eq!("10.5".parse::<Money>().unwrap().amount(), dec!(10.50));
        assert_eq!("10,50".parse::<Money>().unwrap().amount(), dec!(10.50));
        assert_eq!("-0.01".parse::<Money>().unwrap().amount(), dec!(-0.01));
        assert_eq!("+1.00".parse::<Money>().unwrap().amount(), dec!(1));
        assert_eq!("  2.30 ".parse::<Money>().unwrap().amount(), dec!(2.3));
    }

    #[test]
    fn parse_rejects_more_than_two_decimals() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("0.001".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }

    #[test]
    fn percent_of_guards_zero_base() {
        let profit = Money::new(dec!(4900));
        assert_eq!(profit.percent_of(Money::new(dec!(5000))), Some(dec!(98.00)));
        assert_eq!(profit.percent_of(Money::ZERO), None);
    }

    #[test]
    fn arithmetic_past_decimal_range_fails() {
        let huge = Decimal::from(1_000_000_000_000_000_i64);
        assert!(matches!(
            Money::from_product(huge, huge),
            Err(EngineError::InvalidQuantity(_))
        ));
        assert_eq!(
            Money::from_product(dec!(450), dec!(22)).unwrap(),
            Money::new(dec!(9900))
        );

        let max = Money::new(Decimal::MAX);
        assert!(matches!(
            max.checked_add(Money::new(dec!(1))),
            Err(EngineError::InvalidQuantity(_))
        ));
        assert_eq!(max.percent_of(Money::new(dec!(0.01))), None);
    }

    #[test]
    fn repeated_accumulation_does_not_drift() {
        let step = Money::new(dec!(0.1));
        let total: Money = std::iter::repeat_n(step, 1000).sum();
        assert_eq!(total.amount(), dec!(100));
    }
}
