//! Ray fixed-point arithmetic with explicit rounding direction.
//!
//! Every ratio in the ledger is a [`Ray`]: an unsigned integer scaled by
//! 10^27. Products and quotients go through a 256-bit intermediate so that
//! a full-range token amount can be multiplied by a growth ratio without
//! overflowing. Each helper names its rounding direction; callers pick
//! `ceil` for amounts a user owes and `floor` for amounts a user receives.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::constants::{RAY, RAY_DECIMALS};

// ═══════════════════════════════════════════════════════════════════════════════
// RAY TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-point number with 27 decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Ray(u128);

impl Ray {
    /// Scale factor: 10^27
    pub const SCALE: u128 = RAY;

    /// Zero value
    pub const ZERO: Self = Self(0);

    /// One (1.0)
    pub const ONE: Self = Self(RAY);

    /// Create a ray from its raw scaled value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from an integer (scales up)
    pub fn from_integer(value: u64) -> Result<Self> {
        (value as u128)
            .checked_mul(RAY)
            .map(Self)
            .ok_or_else(|| Error::Overflow {
                operation: format!("{} * 10^{}", value, RAY_DECIMALS),
            })
    }

    /// Create `numerator / denominator`, rounding down
    pub fn from_ratio(numerator: u128, denominator: u128) -> Result<Self> {
        mul_div_floor(numerator, RAY, denominator).map(Self)
    }

    /// Create from basis points (10000 bps = 1.0)
    pub fn from_bps(bps: u64) -> Result<Self> {
        (bps as u128)
            .checked_mul(RAY / 10_000)
            .map(Self)
            .ok_or_else(|| Error::Overflow {
                operation: format!("{} bps", bps),
            })
    }

    /// Get the raw underlying value
    pub const fn raw(&self) -> u128 {
        self.0
    }

    /// Check if value is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `self * rhs`, rounding down
    pub fn mul_floor(self, rhs: Self) -> Result<Self> {
        mul_div_floor(self.0, rhs.0, RAY).map(Self)
    }

    /// `self * rhs`, rounding up
    pub fn mul_ceil(self, rhs: Self) -> Result<Self> {
        mul_div_ceil(self.0, rhs.0, RAY).map(Self)
    }

    /// `self / rhs`, rounding down
    pub fn div_floor(self, rhs: Self) -> Result<Self> {
        mul_div_floor(self.0, RAY, rhs.0).map(Self)
    }

    /// `self / rhs`, rounding up
    pub fn div_ceil(self, rhs: Self) -> Result<Self> {
        mul_div_ceil(self.0, RAY, rhs.0).map(Self)
    }

    /// Checked addition
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Minimum of two values
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Maximum of two values
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }
}

impl fmt::Display for Ray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer = self.0 / RAY;
        let fraction = self.0 % RAY;
        if fraction == 0 {
            return write!(f, "{}.0", integer);
        }
        let digits = format!("{:0width$}", fraction, width = RAY_DECIMALS as usize);
        write!(f, "{}.{}", integer, digits.trim_end_matches('0'))
    }
}

impl From<Ray> for u128 {
    fn from(ray: Ray) -> Self {
        ray.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MUL-DIV PRIMITIVES
// ═══════════════════════════════════════════════════════════════════════════════

fn narrow(value: U256, operation: &str) -> Result<u128> {
    if value > U256::from(u128::MAX) {
        return Err(Error::Overflow {
            operation: operation.to_string(),
        });
    }
    Ok(value.as_u128())
}

/// `floor(a * b / c)` with a 256-bit intermediate
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::DivisionByZero {
            operation: format!("({} * {}) / 0", a, b),
        });
    }
    let quotient = U256::from(a) * U256::from(b) / U256::from(c);
    narrow(quotient, "mul_div_floor")
}

/// `ceil(a * b / c)` with a 256-bit intermediate
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::DivisionByZero {
            operation: format!("ceil(({} * {}) / 0)", a, b),
        });
    }
    let numerator = U256::from(a) * U256::from(b);
    let divisor = U256::from(c);
    let mut quotient = numerator / divisor;
    if !(numerator % divisor).is_zero() {
        quotient += U256::one();
    }
    narrow(quotient, "mul_div_ceil")
}

// ═══════════════════════════════════════════════════════════════════════════════
// RATIO HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// `amount * ratio`, rounding down. Used for amounts paid out to users.
pub fn ratio_mul_floor(amount: u128, ratio: Ray) -> Result<u128> {
    mul_div_floor(amount, ratio.raw(), RAY)
}

/// `amount * ratio`, rounding up. Used for amounts users owe.
pub fn ratio_mul_ceil(amount: u128, ratio: Ray) -> Result<u128> {
    mul_div_ceil(amount, ratio.raw(), RAY)
}

/// `amount / ratio`, rounding down
pub fn ratio_div_floor(amount: u128, ratio: Ray) -> Result<u128> {
    mul_div_floor(amount, RAY, ratio.raw())
}

/// `amount / ratio`, rounding up
pub fn ratio_div_ceil(amount: u128, ratio: Ray) -> Result<u128> {
    mul_div_ceil(amount, RAY, ratio.raw())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(Error::Underflow {
        operation: format!("{} - {}", a, b),
    })
}
