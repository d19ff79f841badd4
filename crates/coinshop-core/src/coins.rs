//! # Coins Module
//!
//! Provides the `Coins` type, the only amount type in the wallet.
//!
//! ## Why a Newtype?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ONE CURRENCY, WHOLE UNITS                                              │
//! │                                                                         │
//! │  Balances, transfer amounts and item prices are all whole coins.       │
//! │  There is no fractional coin and no second currency.                   │
//! │                                                                         │
//! │  Wrapping i64 keeps coins from being mixed up with ids and             │
//! │  quantities, which are also integers in the database.                  │
//! │                                                                         │
//! │  Conservation law:                                                     │
//! │    Σ balances + Σ spent on purchases = constant                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use coinshop_core::coins::Coins;
//!
//! let balance = Coins::new(1000);
//! let price = Coins::new(20);
//!
//! assert_eq!(balance - price * 2, Coins::new(960));
//! assert!(balance.covers(price));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Coins Type
// =============================================================================

/// An amount of virtual currency in whole coins.
///
/// ## Design Decisions
/// - **i64 (signed)**: Balance deltas are signed (`-amount` on debit)
/// - **Transparent in SQL**: Maps straight onto a `BIGINT` column
/// - **Serde transparent**: Serialized as a bare number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct Coins(i64);

impl Coins {
    /// Creates a coin amount.
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Coins(amount)
    }

    /// Returns the raw amount.
    #[inline]
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Zero coins.
    #[inline]
    pub const fn zero() -> Self {
        Coins(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is below zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns true when a balance of `self` can pay `cost` without going
    /// below zero.
    ///
    /// ## Example
    /// ```rust
    /// use coinshop_core::coins::Coins;
    ///
    /// assert!(Coins::new(500).covers(Coins::new(500)));
    /// assert!(!Coins::new(500).covers(Coins::new(501)));
    /// ```
    #[inline]
    pub const fn covers(&self, cost: Coins) -> bool {
        self.0 >= cost.0
    }

    /// Subtraction that returns `None` on overflow.
    #[inline]
    pub const fn checked_sub(self, other: Coins) -> Option<Coins> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Coins(v)),
            None => None,
        }
    }

    /// Addition that returns `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Coins) -> Option<Coins> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Coins(v)),
            None => None,
        }
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} coins", self.0)
    }
}

impl From<i64> for Coins {
    fn from(amount: i64) -> Self {
        Coins(amount)
    }
}

impl From<Coins> for i64 {
    fn from(coins: Coins) -> Self {
        coins.0
    }
}

// =============================================================================
// Arithmetic Operations
// =============================================================================

impl Add for Coins {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Coins(self.0 + other.0)
    }
}

impl AddAssign for Coins {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Coins {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Coins(self.0 - other.0)
    }
}

impl SubAssign for Coins {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Coins {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Coins(-self.0)
    }
}

impl Mul<i64> for Coins {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Coins(self.0 * qty)
    }
}

impl Sum for Coins {
    fn sum<I: Iterator<Item = Coins>>(iter: I) -> Self {
        iter.fold(Coins::zero(), |acc, c| acc + c)
    }
}

impl<'a> Sum<&'a Coins> for Coins {
    fn sum<I: Iterator<Item = &'a Coins>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Coins::new(1000).to_string(), "1000 coins");
        assert_eq!(Coins::zero().to_string(), "0 coins");
    }

    #[test]
    fn test_arithmetic() {
        let a = Coins::new(1000);
        let b = Coins::new(500);

        assert_eq!(a + b, Coins::new(1500));
        assert_eq!(a - b, Coins::new(500));
        assert_eq!(b * 3, Coins::new(1500));
        assert_eq!(-b, Coins::new(-500));

        let mut c = a;
        c -= b;
        c += Coins::new(1);
        assert_eq!(c, Coins::new(501));
    }

    #[test]
    fn test_covers_boundary() {
        let balance = Coins::new(1000);
        assert!(balance.covers(Coins::new(999)));
        assert!(balance.covers(Coins::new(1000)));
        assert!(!balance.covers(Coins::new(1001)));
        assert!(Coins::zero().covers(Coins::zero()));
    }

    #[test]
    fn test_sign_checks() {
        assert!(Coins::new(1).is_positive());
        assert!(!Coins::zero().is_positive());
        assert!(Coins::zero().is_zero());
        assert!(Coins::new(-1).is_negative());
    }

    #[test]
    fn test_checked_ops() {
        assert_eq!(Coins::new(i64::MAX).checked_add(Coins::new(1)), None);
        assert_eq!(Coins::new(i64::MIN).checked_sub(Coins::new(1)), None);
        assert_eq!(
            Coins::new(10).checked_sub(Coins::new(3)),
            Some(Coins::new(7))
        );
    }

    #[test]
    fn test_sum() {
        let balances = [Coins::new(500), Coins::new(1500), Coins::new(1000)];
        let total: Coins = balances.iter().sum();
        assert_eq!(total, Coins::new(3000));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Coins::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
