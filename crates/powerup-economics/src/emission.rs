//! # Reward Emission Clock
//!
//! A pool's reward budget grows linearly with elapsed ticks:
//!
//! ```text
//! accrued(t) = accrued(t₀) + rewards_per_tick × (t − t₀)
//! ```
//!
//! The tick is supplied by the host and must never regress.

use powerup_core::prelude::*;

/// Total emission at `current_tick` given the total at `last_tick`
pub fn accrue(
    current_tick: Tick,
    last_tick: Tick,
    rewards_per_tick: Fixed,
    accrued_before: Fixed,
) -> Result<Fixed> {
    let elapsed = elapsed_ticks(current_tick, last_tick)?;
    accrued_before.checked_add(rewards_per_tick.mul_int(elapsed)?)
}

/// Ticks between two checkpoints, rejecting regressions
pub fn elapsed_ticks(current_tick: Tick, last_tick: Tick) -> Result<u64> {
    current_tick
        .checked_sub(last_tick)
        .ok_or(EngineError::InvalidTick {
            current: current_tick,
            last: last_tick,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: Fixed = Fixed::from_units(3);

    #[test]
    fn test_linear_accrual() {
        let at_1 = accrue(1, 0, RATE, Fixed::ZERO).unwrap();
        assert_eq!(at_1, Fixed::from_units(3));

        let at_3 = accrue(3, 1, RATE, at_1).unwrap();
        assert_eq!(at_3, Fixed::from_units(9));

        let at_5 = accrue(5, 3, RATE, at_3).unwrap();
        assert_eq!(at_5, Fixed::from_units(15));
    }

    #[test]
    fn test_same_tick_accrues_nothing() {
        let before = Fixed::from_units(42);
        assert_eq!(accrue(7, 7, RATE, before).unwrap(), before);
    }

    #[test]
    fn test_regression_rejected() {
        assert_eq!(
            accrue(4, 5, RATE, Fixed::ZERO),
            Err(EngineError::InvalidTick { current: 4, last: 5 })
        );
    }

    #[test]
    fn test_overflow_reported() {
        assert_eq!(accrue(u64::MAX, 0, Fixed::MAX, Fixed::ZERO), Err(EngineError::Overflow));
    }
}
