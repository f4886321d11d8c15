//! # Money Module
//!
//! Monetary values for Veranda POS, stored in satang (1/100 baht).
//!
//! ## Why Integer Money?
//! Floating point cannot represent 0.1 + 0.2 exactly, and a voucher desk
//! that drifts a satang per receipt loses real money over a season. All
//! amounts in the system are integer satang; only display code converts
//! to baht.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// A monetary value in satang (the smallest THB unit).
///
/// - **i64 (signed)**: allows negative values for refunds and discounts
/// - **Single-field tuple struct**: zero-cost abstraction over i64
///
/// Every monetary value in the system flows through this type:
/// coupon prices, line totals, discounts, receipt totals, report sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from satang.
    #[inline]
    pub const fn from_satang(satang: i64) -> Self {
        Money(satang)
    }

    /// Creates a Money value from whole baht.
    #[inline]
    pub const fn from_baht(baht: i64) -> Self {
        Money(baht * 100)
    }

    /// Returns the value in satang.
    #[inline]
    pub const fn satang(&self) -> i64 {
        self.0
    }

    /// Returns the whole-baht portion.
    #[inline]
    pub const fn baht(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the satang portion (always 0-99).
    #[inline]
    pub const fn satang_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity (line total = unit price × qty).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Applies a percentage discount given in basis points (1000 = 10%)
    /// and returns the discounted amount. Rounds half away from zero via
    /// the +5000 term; uses i128 to avoid overflow on large amounts.
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        let discount = (self.0 as i128 * discount_bps as i128 + 5000) / 10000;
        Money::from_satang(self.0 - discount as i64)
    }
}

/// Debug-friendly display: `฿120.50`. UI layers do their own formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}฿{}.{:02}", sign, self.baht().abs(), self.satang_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_satang() {
        let money = Money::from_satang(12050);
        assert_eq!(money.satang(), 12050);
        assert_eq!(money.baht(), 120);
        assert_eq!(money.satang_part(), 50);
    }

    #[test]
    fn test_from_baht() {
        assert_eq!(Money::from_baht(350).satang(), 35000);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_satang(12050)), "฿120.50");
        assert_eq!(format!("{}", Money::from_satang(500)), "฿5.00");
        assert_eq!(format!("{}", Money::from_satang(-550)), "-฿5.50");
        assert_eq!(format!("{}", Money::from_satang(0)), "฿0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_satang(1000);
        let b = Money::from_satang(500);

        assert_eq!((a + b).satang(), 1500);
        assert_eq!((a - b).satang(), 500);
        assert_eq!((a * 3).satang(), 3000);
        assert_eq!(a.multiply_quantity(4).satang(), 4000);
    }

    #[test]
    fn test_percentage_discount() {
        let subtotal = Money::from_satang(10000);
        let discounted = subtotal.apply_percentage_discount(1000); // 10%
        assert_eq!(discounted.satang(), 9000);
    }

    #[test]
    fn test_negative_checks() {
        assert!(Money::from_satang(-1).is_negative());
        assert!(!Money::zero().is_negative());
        assert!(Money::zero().is_zero());
    }
}
