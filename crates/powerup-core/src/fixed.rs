//! 18-decimal unsigned fixed-point arithmetic
//!
//! All balances, rates and indices are `u128` values scaled by 10^18. Products
//! go through a 256-bit intermediate so that `a * b / c` only fails when the
//! final quotient does not fit in 128 bits.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Expanded away from the crate's one-argument `Result` alias.
mod wide {
    use uint::construct_uint;

    construct_uint! {
        /// 256-bit unsigned integer for intermediate products.
        pub struct U256(4);
    }
}

pub use wide::U256;

/// Decimal places
pub const DECIMALS: u32 = 18;

/// 1.0 in fixed-point (10^18)
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Compute `a * b / denominator`, rounding down
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(EngineError::DivisionByZero);
    }
    // Two 128-bit operands cannot overflow 256 bits.
    let quotient = U256::from(a) * U256::from(b) / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return Err(EngineError::Overflow);
    }
    Ok(quotient.as_u128())
}

/// Unsigned 18-decimal fixed-point number
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed(u128);

impl Fixed {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(SCALE);
    pub const MAX: Self = Self(u128::MAX);

    /// Wrap a raw scaled value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Raw scaled value
    pub const fn raw(self) -> u128 {
        self.0
    }

    /// Whole token units (`n * 10^18`)
    pub const fn from_units(units: u64) -> Self {
        Self(units as u128 * SCALE)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(EngineError::Overflow)
    }

    pub fn checked_sub(self, other: Self) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(EngineError::Underflow)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiply by an integer count (e.g. elapsed ticks)
    pub fn mul_int(self, n: u64) -> Result<Self> {
        self.0
            .checked_mul(n as u128)
            .map(Self)
            .ok_or(EngineError::Overflow)
    }

    /// Fixed-point product, rounded down
    pub fn mul(self, other: Self) -> Result<Self> {
        mul_div(self.0, other.0, SCALE).map(Self)
    }

    /// Fixed-point quotient, rounded down
    pub fn div(self, other: Self) -> Result<Self> {
        mul_div(self.0, SCALE, other.0).map(Self)
    }

    /// Binary logarithm, rounded down; zero for values below 1.0
    ///
    /// Integer part from the position of the highest set bit of `x / SCALE`,
    /// fractional bits by repeated squaring of the normalised mantissa.
    pub fn log2(self) -> Self {
        if self.0 < SCALE {
            return Self::ZERO;
        }

        let int_part = (self.0 / SCALE).ilog2();
        let mut result = int_part as u128 * SCALE;

        // y in [1.0, 2.0)
        let mut y = self.0 >> int_part;
        if y == SCALE {
            return Self(result);
        }

        let two = 2 * SCALE;
        let mut delta = SCALE / 2;
        while delta > 0 {
            y = y * y / SCALE;
            if y >= two {
                result += delta;
                y >>= 1;
            }
            delta >>= 1;
        }

        Self(result)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let frac = self.0 % SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:018}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({})", self)
    }
}

impl FromStr for Fixed {
    type Err = EngineError;

    /// Parse a decimal string such as `"0.4"` or `"300"`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));

        let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty())
            || !digits_only(whole)
            || !digits_only(frac)
            || frac.len() > DECIMALS as usize
        {
            return Err(EngineError::InvalidAmount(s.to_string()));
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| EngineError::Overflow)?
        };
        let frac_raw: u128 = if frac.is_empty() {
            0
        } else {
            let parsed: u128 = frac
                .parse()
                .map_err(|_| EngineError::InvalidAmount(s.to_string()))?;
            parsed * 10u128.pow(DECIMALS - frac.len() as u32)
        };

        whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac_raw))
            .map(Self)
            .ok_or(EngineError::Overflow)
    }
}

/// Serde adapter writing `Fixed` as a decimal string (for TOML/JSON configs)
pub mod decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fixed, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mul_div_uses_wide_intermediate() {
        // 10^30 * 10^30 overflows u128 but the quotient fits.
        let big = 10u128.pow(30);
        assert_eq!(mul_div(big, big, big).unwrap(), big);
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(EngineError::Overflow));
        assert_eq!(mul_div(1, 1, 0), Err(EngineError::DivisionByZero));
    }

    #[test]
    fn test_wide_type_keeps_std_result() {
        let doubled = U256::from(u128::MAX) * U256::from(2u8);
        assert_eq!(doubled / U256::from(2u8), U256::from(u128::MAX));
        assert!(U256::from_dec_str("340282366920938463463374607431768211456").is_ok());
        assert!(U256::from_dec_str("not a number").is_err());
    }

    #[test]
    fn test_mul_and_div() {
        let a = Fixed::from_units(3);
        let b: Fixed = "0.5".parse().unwrap();
        assert_eq!(a.mul(b).unwrap(), "1.5".parse().unwrap());
        assert_eq!(a.div(b).unwrap(), Fixed::from_units(6));
        assert_eq!(a.div(Fixed::ZERO), Err(EngineError::DivisionByZero));
    }

    #[test]
    fn test_checked_sub_underflow() {
        assert_eq!(
            Fixed::ONE.checked_sub(Fixed::from_units(2)),
            Err(EngineError::Underflow)
        );
        assert_eq!(Fixed::MAX.checked_add(Fixed::ONE), Err(EngineError::Overflow));
    }

    #[test]
    fn test_log2_exact_powers() {
        assert_eq!(Fixed::ONE.log2(), Fixed::ZERO);
        assert_eq!(Fixed::from_units(2).log2(), Fixed::ONE);
        assert_eq!(Fixed::from_units(8).log2(), Fixed::from_units(3));
        assert_eq!(Fixed::from_units(1024).log2(), Fixed::from_units(10));
    }

    #[test]
    fn test_log2_fractional() {
        // log2(4/3) = 0.415037499278843818...
        let x = Fixed::from_raw(4 * SCALE / 3);
        let got = x.log2().raw();
        let expected = 415_037_499_278_843_818u128;
        assert!(got.abs_diff(expected) < 1_000_000, "got {}", got);

        // log2(1.5) = 0.584962500721156181...
        let got = "1.5".parse::<Fixed>().unwrap().log2().raw();
        assert!(got.abs_diff(584_962_500_721_156_181) < 1_000_000, "got {}", got);
    }

    #[test]
    fn test_log2_below_one_is_zero() {
        assert_eq!("0.5".parse::<Fixed>().unwrap().log2(), Fixed::ZERO);
        assert_eq!(Fixed::ZERO.log2(), Fixed::ZERO);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("0.4".parse::<Fixed>().unwrap().raw(), 400_000_000_000_000_000);
        assert_eq!("300".parse::<Fixed>().unwrap(), Fixed::from_units(300));
        assert_eq!(".25".parse::<Fixed>().unwrap().to_string(), "0.25");
        assert_eq!(Fixed::from_units(7).to_string(), "7");
        assert_eq!(Fixed::from_raw(1).to_string(), "0.000000000000000001");
        assert!("1.2.3".parse::<Fixed>().is_err());
        assert!("-1".parse::<Fixed>().is_err());
        assert!("".parse::<Fixed>().is_err());
        assert!("0.0000000000000000001".parse::<Fixed>().is_err());
    }

    #[test]
    fn test_decimal_serde_adapter() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "decimal")]
            value: Fixed,
        }

        let json = serde_json::to_string(&Wrapper { value: "1.4".parse().unwrap() }).unwrap();
        assert_eq!(json, r#"{"value":"1.4"}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value.raw(), 1_400_000_000_000_000_000);
    }

    proptest! {
        #[test]
        fn prop_log2_monotonic(a in SCALE..u128::MAX / 2, step in 0u128..SCALE * 1000) {
            let x = Fixed::from_raw(a);
            let y = Fixed::from_raw(a + step);
            prop_assert!(x.log2() <= y.log2());
        }

        #[test]
        fn prop_display_parse_roundtrip(raw in any::<u64>()) {
            let value = Fixed::from_raw(raw as u128 * 1_000_003);
            let parsed: Fixed = value.to_string().parse().unwrap();
            prop_assert_eq!(parsed, value);
        }
    }
}
