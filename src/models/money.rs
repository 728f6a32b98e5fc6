//! Exact currency amounts.
//!
//! Every amount in the ledger is a `Money`: a non-binary decimal carried at
//! a scale of 2 fractional digits. Floating point never touches a balance.

use std::fmt;
use std::ops::{Add, AddAssign};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Number of fractional digits kept for every externally visible amount.
pub const SCALE: u32 = 2;

/// A currency amount with two fractional digits.
///
/// Balances may be zero; operation amounts must be strictly positive and are
/// built through [`Money::amount`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, SCALE));

    /// Largest value a `NUMERIC(19, 2)` column holds: 99,999,999,999,999,999.99.
    pub const MAX: Money = Money(Decimal::from_parts(0x89E7_FFFF, 0x8AC7_2304, 0, false, SCALE));

    /// Wrap a decimal, rounding half-up to two digits.
    pub fn from_decimal(value: Decimal) -> Self {
        let mut rounded = value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(SCALE);
        Money(rounded)
    }

    /// Validate an operation amount.
    ///
    /// Zero, negative, sub-cent and above-[`Money::MAX`] values fail with
    /// `InvalidAmount`.
    pub fn amount(value: Decimal) -> LedgerResult<Self> {
        if value <= Decimal::ZERO || value > Money::MAX.0 || value.normalize().scale() > SCALE {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(Money::from_decimal(value))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Add, or `None` when the sum would not fit in [`Money::MAX`].
    pub fn checked_add(self, other: Money) -> Option<Money> {
        let sum = self.0.checked_add(other.0)?;
        if sum > Money::MAX.0 {
            return None;
        }
        Some(Money::from_decimal(sum))
    }

    /// Subtract, or `None` when the result would be negative.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        if self.0 < other.0 {
            return None;
        }
        Some(Money::from_decimal(self.0 - other.0))
    }

    /// `self * rate`, rounded half-up to two digits.
    pub fn percentage(self, rate: Decimal) -> Money {
        Money::from_decimal(self.0 * rate)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Money::from_decimal(Decimal::from(value))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::from_decimal(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
