//! # Power-Up Curve
//!
//! Converts an account's delegated-governance-to-LP ratio into a boost
//! multiplier:
//!
//! ```text
//! ratio    = delegated / lp_balance
//! power_up = clamp(vertical_shift + log2(horizontal_shift + ratio),
//!                  vertical_shift, MAX_POWER_UP)
//! ```
//!
//! | delegated | lp  | vertical | horizontal | power-up |
//! |-----------|-----|----------|------------|----------|
//! | 0         | any | 0.4      | 1.0        | 0.4      |
//! | 100       | 100 | 0.4      | 1.0        | 1.4      |
//! | 100       | 300 | 0.4      | 1.0        | ≈0.815   |
//!
//! The engine only depends on the [`PowerUpCurve`] trait; [`LogCurve`] is the
//! default shape.

use crate::constants::{DEFAULT_HORIZONTAL_SHIFT, DEFAULT_VERTICAL_SHIFT, MAX_POWER_UP};
use powerup_core::fixed::decimal;
use powerup_core::prelude::*;
use serde::{Deserialize, Serialize};

/// Curve constants supplied by protocol configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveParams {
    /// Value at zero delegation; also the lower bound
    #[serde(with = "decimal", default = "default_vertical_shift")]
    pub vertical_shift: Fixed,

    /// Offset added to the ratio before taking the logarithm
    #[serde(with = "decimal", default = "default_horizontal_shift")]
    pub horizontal_shift: Fixed,
}

fn default_vertical_shift() -> Fixed {
    DEFAULT_VERTICAL_SHIFT
}

fn default_horizontal_shift() -> Fixed {
    DEFAULT_HORIZONTAL_SHIFT
}

impl Default for CurveParams {
    fn default() -> Self {
        Self {
            vertical_shift: default_vertical_shift(),
            horizontal_shift: default_horizontal_shift(),
        }
    }
}

impl CurveParams {
    /// Reject constants whose floor sits above the protocol ceiling
    pub fn validate(&self) -> Result<()> {
        if self.vertical_shift > MAX_POWER_UP {
            return Err(EngineError::InvalidAmount(format!(
                "vertical shift {} exceeds power-up ceiling {}",
                self.vertical_shift, MAX_POWER_UP
            )));
        }
        Ok(())
    }
}

/// Boost multiplier as a pure function of the two balances
pub trait PowerUpCurve: Send + Sync {
    /// Power-up for an account holding `lp_balance` with `delegated` attributed
    fn power_up(&self, delegated: Fixed, lp_balance: Fixed) -> Fixed;

    /// Power-up of an account with nothing staked or delegated
    fn floor(&self) -> Fixed {
        self.power_up(Fixed::ZERO, Fixed::ZERO)
    }
}

/// Logarithmic curve with vertical and horizontal shifts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogCurve {
    params: CurveParams,
}

impl LogCurve {
    pub fn new(params: CurveParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &CurveParams {
        &self.params
    }
}

impl PowerUpCurve for LogCurve {
    fn power_up(&self, delegated: Fixed, lp_balance: Fixed) -> Fixed {
        compute_power_up(
            delegated,
            lp_balance,
            self.params.vertical_shift,
            self.params.horizontal_shift,
        )
    }
}

/// Total for every input: a zero LP balance or zero delegation yields
/// `vertical_shift` and a ratio too large to represent saturates at the ceiling.
pub fn compute_power_up(
    delegated: Fixed,
    lp_balance: Fixed,
    vertical_shift: Fixed,
    horizontal_shift: Fixed,
) -> Fixed {
    if lp_balance.is_zero() || delegated.is_zero() {
        return vertical_shift;
    }

    let ratio = delegated.div(lp_balance).unwrap_or(Fixed::MAX);
    let boost = horizontal_shift.saturating_add(ratio).log2();
    clamp(vertical_shift.saturating_add(boost), vertical_shift)
}

fn clamp(value: Fixed, floor: Fixed) -> Fixed {
    value.min(MAX_POWER_UP).max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn units(n: u64) -> Fixed {
        Fixed::from_units(n)
    }

    fn curve() -> LogCurve {
        LogCurve::default()
    }

    #[test]
    fn test_zero_lp_yields_floor() {
        let c = curve();
        assert_eq!(c.power_up(units(100), Fixed::ZERO), c.params().vertical_shift);
        assert_eq!(c.floor(), "0.4".parse().unwrap());
    }

    #[test]
    fn test_zero_delegation_yields_vertical_shift() {
        assert_eq!(curve().power_up(Fixed::ZERO, units(500)), "0.4".parse().unwrap());
    }

    #[test]
    fn test_equal_balances() {
        assert_eq!(curve().power_up(units(100), units(100)), "1.4".parse().unwrap());
    }

    #[test]
    fn test_third_of_lp_delegated() {
        let p = curve().power_up(units(100), units(300)).raw();
        assert!(p > 815_000_000_000_000_000 && p < 815_100_000_000_000_000, "got {}", p);
    }

    #[test]
    fn test_ceiling() {
        assert_eq!(curve().power_up(units(1_000_000), units(1)), MAX_POWER_UP);
        // Ratio overflow saturates instead of failing.
        assert_eq!(curve().power_up(Fixed::MAX, Fixed::from_raw(1)), MAX_POWER_UP);
    }

    #[test]
    fn test_horizontal_shift_below_one_clamps_to_floor() {
        let params = CurveParams {
            vertical_shift: "0.5".parse().unwrap(),
            horizontal_shift: "0.25".parse().unwrap(),
        };
        let c = LogCurve::new(params).unwrap();
        assert_eq!(c.power_up(Fixed::ZERO, units(10)), params.vertical_shift);
        // 0.25 + 0.5 < 1 keeps the logarithm at zero
        assert_eq!(c.power_up(units(5), units(10)), params.vertical_shift);
    }

    #[test]
    fn test_zero_delegation_ignores_horizontal_shift() {
        let params = CurveParams {
            vertical_shift: "0.4".parse().unwrap(),
            horizontal_shift: units(2),
        };
        let c = LogCurve::new(params).unwrap();
        assert_eq!(c.power_up(Fixed::ZERO, units(100)), params.vertical_shift);
        assert_eq!(c.power_up(units(100), Fixed::ZERO), params.vertical_shift);
        assert_eq!(c.floor(), params.vertical_shift);
        // 0.4 + log2(2 + 1)
        let p = c.power_up(units(100), units(100)).raw();
        assert!(p > 1_984_900_000_000_000_000 && p < 1_985_000_000_000_000_000, "got {}", p);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = CurveParams {
            vertical_shift: units(5),
            horizontal_shift: Fixed::ONE,
        };
        assert!(matches!(LogCurve::new(params), Err(EngineError::InvalidAmount(_))));
    }

    #[test]
    fn test_params_from_toml() {
        let params: CurveParams =
            toml::from_str("vertical_shift = \"0.25\"\nhorizontal_shift = \"2\"").unwrap();
        assert_eq!(params.vertical_shift, "0.25".parse().unwrap());
        assert_eq!(params.horizontal_shift, units(2));

        let defaults: CurveParams = toml::from_str("").unwrap();
        assert_eq!(defaults, CurveParams::default());
    }

    proptest! {
        #[test]
        fn prop_monotonic_in_delegation(
            lp in 1u128..1_000_000 * SCALE,
            d in 0u128..1_000_000 * SCALE,
            extra in 0u128..1_000_000 * SCALE,
        ) {
            let c = curve();
            let lo = c.power_up(Fixed::from_raw(d), Fixed::from_raw(lp));
            let hi = c.power_up(Fixed::from_raw(d + extra), Fixed::from_raw(lp));
            prop_assert!(lo <= hi);
        }

        #[test]
        fn prop_bounded(lp in any::<u128>(), d in any::<u128>()) {
            let c = curve();
            let p = c.power_up(Fixed::from_raw(d), Fixed::from_raw(lp));
            prop_assert!(p >= c.params().vertical_shift);
            prop_assert!(p <= MAX_POWER_UP);
        }
    }
}
