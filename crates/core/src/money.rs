//! Currency amounts held as integer minor units.
//!
//! Prices, sale totals and report revenue all flow through [`Money`], which stores a
//! signed count of cents. Sums of many amounts are therefore exact; rounding only
//! happens where a division is explicitly requested ([`Money::div_rounded`]).
//!
//! Prices are capped at [`Money::MAX_PRICE`] and quantities at [`MAX_QUANTITY`].
//! Arithmetic saturates at the `i64` range instead of overflowing; callers that must
//! stay exact check with [`Money::checked_times`] first.

use core::iter::Sum;
use core::ops::{Add, AddAssign};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// Largest stock level or sale quantity.
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

/// An amount of money in the smallest currency unit (cents).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest list or sale price: 99,999,999.99.
    pub const MAX_PRICE: Money = Money(9_999_999_999);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Line total for `quantity` units at this unit price, saturating at the `i64` range.
    pub fn times(self, quantity: i64) -> Money {
        Money(self.0.saturating_mul(quantity))
    }

    /// Exact line total, or `None` if it does not fit.
    pub fn checked_times(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Divide by `divisor`, rounding half away from zero. Division by zero yields zero.
    pub fn div_rounded(self, divisor: i64) -> Money {
        if divisor == 0 {
            return Money::ZERO;
        }
        let (Some(q), Some(r)) = (self.0.checked_div(divisor), self.0.checked_rem(divisor)) else {
            return Money(i64::MAX);
        };
        if r.unsigned_abs() * 2 >= divisor.unsigned_abs() {
            let away = if (self.0 < 0) == (divisor < 0) { 1 } else { -1 };
            Money(q + away)
        } else {
            Money(q)
        }
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

/// Always two decimals, `.` separator, no grouping: `1234.50`, `-0.05`.
impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = DomainError;

    /// Accepts `15`, `15.9` and `15.99` (optionally signed). More than two fractional
    /// digits is rejected rather than silently rounded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(format!("invalid amount '{s}'"));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or_else(invalid)?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}
