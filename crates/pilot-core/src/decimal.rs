//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors critical in financial calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with quantities in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Shift the price by a signed fraction: `price * (1 + pct)`.
    ///
    /// `pct` is a plain fraction (`0.0015` = 0.15%), negative to shift down.
    #[inline]
    pub fn offset_frac(&self, pct: Decimal) -> Self {
        Self(self.0 * (Decimal::ONE + pct))
    }

    /// Absolute distance to another price.
    #[inline]
    pub fn distance(&self, other: Price) -> Decimal {
        (self.0 - other.0).abs()
    }

    /// Fractional deviation from a reference price: `|self - from| / from`.
    ///
    /// Returns None if the reference is zero.
    #[inline]
    pub fn deviation_from(&self, from: Price) -> Option<Decimal> {
        if from.is_zero() {
            return None;
        }
        Some((self.0 - from.0).abs() / from.0)
    }

    /// Signed percentage difference from a reference price.
    #[inline]
    pub fn pct_from(&self, from: Price) -> Option<Decimal> {
        if from.is_zero() {
            return None;
        }
        Some((self.0 - from.0) / from.0 * Decimal::from(100))
    }

    /// Round down to the given tick size.
    #[inline]
    pub fn round_to_tick(&self, tick_size: Price) -> Self {
        if tick_size.is_zero() {
            return *self;
        }
        Self((self.0 / tick_size.0).floor() * tick_size.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// Contract quantity with exact decimal precision.
///
/// Perpetual contracts trade in whole units; `from_allocation` floors the
/// computed size accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qty(pub Decimal);

impl Qty {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Size a position from allocated collateral.
    ///
    /// `contracts = floor(allocated * leverage / (contract_value * entry))`.
    /// Returns None when the inputs cannot produce a finite positive count
    /// (zero entry price or zero contract value).
    pub fn from_allocation(
        allocated: Decimal,
        leverage: u32,
        contract_value: Decimal,
        entry: Price,
    ) -> Option<Self> {
        let denom = contract_value * entry.inner();
        if denom <= Decimal::ZERO {
            return None;
        }
        let contracts = (allocated * Decimal::from(leverage) / denom).floor();
        Some(Self(contracts))
    }

    /// Notional value: qty * price.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Qty {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Qty {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl From<u64> for Qty {
    fn from(n: u64) -> Self {
        Self(Decimal::from(n))
    }
}

impl Add for Qty {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Qty {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Qty {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_offset_frac() {
        let p = Price::new(dec!(2738.24));
        let up = p.offset_frac(dec!(0.0015));
        assert_eq!(up.inner(), dec!(2742.34736));

        let down = p.offset_frac(dec!(-0.0015));
        assert_eq!(down.inner(), dec!(2734.13264));
    }

    #[test]
    fn test_price_deviation() {
        let current = Price::new(dec!(100));
        let entry = Price::new(dec!(102.4));
        assert_eq!(entry.deviation_from(current).unwrap(), dec!(0.024));
        assert!(entry.deviation_from(Price::ZERO).is_none());
    }

    #[test]
    fn test_price_round_to_tick() {
        let price = Price::new(dec!(2742.347));
        let tick = Price::new(dec!(0.05));
        assert_eq!(price.round_to_tick(tick).inner(), dec!(2742.30));
    }

    #[test]
    fn test_qty_from_allocation() {
        // 1000 USD at 10x leverage, contract value 0.01, entry 2000:
        // 1000 * 10 / (0.01 * 2000) = 500 contracts
        let qty = Qty::from_allocation(dec!(1000), 10, dec!(0.01), Price::new(dec!(2000))).unwrap();
        assert_eq!(qty.inner(), dec!(500));
    }

    #[test]
    fn test_qty_from_allocation_floors() {
        let qty = Qty::from_allocation(dec!(100), 3, dec!(0.01), Price::new(dec!(2738.24))).unwrap();
        // 300 / 27.3824 = 10.956... -> 10
        assert_eq!(qty.inner(), dec!(10));
    }

    #[test]
    fn test_qty_from_allocation_rejects_zero_price() {
        assert!(Qty::from_allocation(dec!(100), 3, dec!(0.01), Price::ZERO).is_none());
    }

    #[test]
    fn test_qty_notional() {
        let qty = Qty::new(dec!(5));
        assert_eq!(qty.notional(Price::new(dec!(2000))), dec!(10000));
    }
}
