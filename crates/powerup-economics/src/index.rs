//! # Composite Multiplier Index
//!
//! The pool index is the integral of "reward per unit of weighted stake" over
//! ticks. Between two checkpoints the rate is constant:
//!
//! ```text
//! rate  = rewards_per_tick × SCALE / aggregate_power_up
//! index = index + rate × (current_tick − last_checkpoint_tick)
//! ```
//!
//! This is only correct if every change to the aggregate is preceded by a
//! checkpoint taken with the old aggregate. [`checkpoint`] is that step.
//!
//! ## Empty pools
//!
//! While the aggregate is zero the rate is zero and the emission is carried in
//! `undistributed_rewards`. The carry is folded into the index at the first
//! checkpoint that both advances the tick and sees a non-zero aggregate, so
//! accounts joining within the same tick share it regardless of their order.

use crate::emission;
use crate::state::Pool;
use powerup_core::prelude::*;

/// Reward per unit of weighted stake per tick; zero for an empty pool
pub fn rate(rewards_per_tick: Fixed, aggregate_power_up: Fixed) -> Result<Fixed> {
    if aggregate_power_up.is_zero() {
        return Ok(Fixed::ZERO);
    }
    rewards_per_tick.div(aggregate_power_up)
}

/// Advance the index by a constant rate over `ticks_elapsed`
pub fn integrate(index_at_from: Fixed, rate_at_from: Fixed, ticks_elapsed: u64) -> Result<Fixed> {
    index_at_from.checked_add(rate_at_from.mul_int(ticks_elapsed)?)
}

/// Spread carried emission over the current aggregate
pub fn fold_carry(index: Fixed, carry: Fixed, aggregate_power_up: Fixed) -> Result<Fixed> {
    if carry.is_zero() || aggregate_power_up.is_zero() {
        return Ok(index);
    }
    index.checked_add(carry.div(aggregate_power_up)?)
}

/// Bring a pool up to `current_tick` using its pre-mutation aggregate
///
/// Pure: returns the advanced copy and leaves `pool` untouched.
pub fn checkpoint(pool: &Pool, current_tick: Tick) -> Result<Pool> {
    let elapsed = emission::elapsed_ticks(current_tick, pool.last_checkpoint_tick)?;
    let accrued = emission::accrue(
        current_tick,
        pool.last_checkpoint_tick,
        pool.rewards_per_tick,
        pool.accrued_rewards_total,
    )?;

    let mut next = pool.clone();
    next.accrued_rewards_total = accrued;
    next.last_checkpoint_tick = current_tick;

    if elapsed == 0 {
        return Ok(next);
    }

    if pool.aggregate_power_up.is_zero() {
        let emitted = accrued.checked_sub(pool.accrued_rewards_total)?;
        next.undistributed_rewards = pool.undistributed_rewards.checked_add(emitted)?;
        return Ok(next);
    }

    let rate = rate(pool.rewards_per_tick, pool.aggregate_power_up)?;
    let index = integrate(pool.cumulative_index, rate, elapsed)?;
    next.cumulative_index = fold_carry(index, pool.undistributed_rewards, pool.aggregate_power_up)?;
    next.undistributed_rewards = Fixed::ZERO;

    Ok(next)
}
