//! Micro-unit amount type.
//!
//! All balances, amounts, and fees in the SDK are denominated in micro-units
//! (one coin = 1,000,000 micro). Amounts are non-negative and carried as
//! `u128` so that arbitrary wallet-core values never overflow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use thiserror::Error;

/// Micro-units per whole coin.
pub const MICRO_PER_COIN: u128 = 1_000_000;

/// A non-negative amount in micro-units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MicroAmount(pub u128);

impl MicroAmount {
    pub const ZERO: MicroAmount = MicroAmount(0);

    pub fn from_micro(micro: u128) -> Self {
        MicroAmount(micro)
    }

    pub fn from_coins(coins: u128) -> Self {
        MicroAmount(coins * MICRO_PER_COIN)
    }

    pub fn as_micro(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: MicroAmount) -> MicroAmount {
        MicroAmount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: MicroAmount) -> MicroAmount {
        MicroAmount(self.0.saturating_sub(other.0))
    }

    /// Render as whole coins with up to six fractional digits,
    /// trailing zeros trimmed ("1.5", not "1.500000").
    pub fn display_coins(self) -> String {
        let whole = self.0 / MICRO_PER_COIN;
        let frac = self.0 % MICRO_PER_COIN;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{frac:06}");
        let frac = frac.trim_end_matches('0');
        format!("{whole}.{frac}")
    }
}

impl Add for MicroAmount {
    type Output = MicroAmount;

    fn add(self, rhs: MicroAmount) -> MicroAmount {
        MicroAmount(self.0 + rhs.0)
    }
}

impl AddAssign for MicroAmount {
    fn add_assign(&mut self, rhs: MicroAmount) {
        self.0 += rhs.0;
    }
}

impl Sum for MicroAmount {
    fn sum<I: Iterator<Item = MicroAmount>>(iter: I) -> MicroAmount {
        iter.fold(MicroAmount::ZERO, MicroAmount::saturating_add)
    }
}

impl From<u64> for MicroAmount {
    fn from(v: u64) -> Self {
        MicroAmount(v as u128)
    }
}

impl fmt::Display for MicroAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_coins())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("invalid amount: {0}")]
    Invalid(String),
    #[error("too many fractional digits (max 6): {0}")]
    TooPrecise(String),
}

impl FromStr for MicroAmount {
    type Err = ParseAmountError;

    /// Parse a decimal coin amount ("1.5") into micro-units.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if frac.len() > 6 {
            return Err(ParseAmountError::TooPrecise(s.to_string()));
        }
        let whole: u128 = whole
            .parse()
            .map_err(|_| ParseAmountError::Invalid(s.to_string()))?;
        let frac_micro = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<6}");
            padded
                .parse::<u128>()
                .map_err(|_| ParseAmountError::Invalid(s.to_string()))?
        };
        Ok(MicroAmount(whole * MICRO_PER_COIN + frac_micro))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_whole_coins() {
        assert_eq!(MicroAmount::from_coins(5).display_coins(), "5");
        assert_eq!(MicroAmount::ZERO.display_coins(), "0");
    }

    #[test]
    fn test_display_fractional() {
        assert_eq!(MicroAmount(1_500_000).display_coins(), "1.5");
        assert_eq!(MicroAmount(1_000_001).display_coins(), "1.000001");
        assert_eq!(MicroAmount(123).display_coins(), "0.000123");
    }

    #[test]
    fn test_sum_saturates() {
        let total: MicroAmount = [MicroAmount(u128::MAX), MicroAmount(1)].into_iter().sum();
        assert_eq!(total, MicroAmount(u128::MAX));
    }

    #[test]
    fn test_ordering() {
        assert!(MicroAmount(100) < MicroAmount(200));
        assert_eq!(MicroAmount::from_coins(1), MicroAmount(MICRO_PER_COIN));
    }

    #[test]
    fn test_parse_roundtrip() {
        assert_eq!("1.5".parse::<MicroAmount>().unwrap(), MicroAmount(1_500_000));
        assert_eq!("0.000001".parse::<MicroAmount>().unwrap(), MicroAmount(1));
        assert_eq!("42".parse::<MicroAmount>().unwrap(), MicroAmount::from_coins(42));
        assert!("1.2345678".parse::<MicroAmount>().is_err());
        assert!("abc".parse::<MicroAmount>().is_err());
        assert!("-1".parse::<MicroAmount>().is_err());
    }
}
