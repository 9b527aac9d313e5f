//! Fixed-point value amounts.
//!
//! Amounts are stored as integer minor units with eight decimal places, so
//! the signed payload of a record never depends on float formatting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("invalid digit in amount: {0:?}")]
    InvalidDigit(String),
    #[error("too many decimal places (max {max})")]
    TooPrecise { max: u32 },
    #[error("amount overflows")]
    Overflow,
}

/// A non-negative value in minor units (1 unit = 10^-8).
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Amount(u64);

impl Amount {
    pub const DECIMALS: u32 = 8;
    pub const UNIT: u64 = 10u64.pow(Self::DECIMALS);
    pub const ZERO: Self = Self(0);

    pub const fn from_minor_units(units: u64) -> Self {
        Self(units)
    }

    /// Whole units, e.g. `Amount::from_whole(10)` is `10.00000000`.
    pub fn from_whole(whole: u64) -> Option<Self> {
        whole.checked_mul(Self::UNIT).map(Self)
    }

    pub const fn minor_units(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / Self::UNIT,
            self.0 % Self::UNIT,
            width = Self::DECIMALS as usize
        )
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({self})")
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parses decimal strings such as `"10"`, `"10.5"` or `"0.00000001"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(frac) {
            return Err(AmountError::InvalidDigit(s.to_string()));
        }
        if frac.len() > Self::DECIMALS as usize {
            return Err(AmountError::TooPrecise {
                max: Self::DECIMALS,
            });
        }

        let whole: u64 = whole.parse().map_err(|_| AmountError::Overflow)?;
        let mut frac_units: u64 = 0;
        for b in frac.bytes() {
            frac_units = frac_units * 10 + u64::from(b - b'0');
        }
        frac_units *= 10u64.pow(Self::DECIMALS - frac.len() as u32);

        whole
            .checked_mul(Self::UNIT)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or(AmountError::Overflow)
    }
}
