//! # Account Reward Ledger
//!
//! Settles a position against the pool index:
//!
//! ```text
//! earned = lp_balance × power_up / SCALE × (index − checkpoint) / SCALE
//! ```
//!
//! Settlement must run before any change to the position's balances, with the
//! index already advanced to the current tick.

use crate::aggregate;
use crate::state::{AccountPoolPosition, Pool};
use powerup_core::prelude::*;

/// Reward a position has earned since its checkpoint, without applying it
pub fn earned(position: &AccountPoolPosition, pool: &Pool) -> Result<Fixed> {
    // An index behind the checkpoint means the pool record went backwards.
    let delta = pool
        .cumulative_index
        .checked_sub(position.index_checkpoint)
        .map_err(|_| EngineError::Underflow)?;
    if delta.is_zero() {
        return Ok(Fixed::ZERO);
    }
    aggregate::weight(position.lp_balance, position.power_up)?.mul(delta)
}

/// Move newly earned reward into `pending_rewards` and re-checkpoint
pub fn settle(position: &AccountPoolPosition, pool: &Pool) -> Result<AccountPoolPosition> {
    let earned = earned(position, pool)?;

    let mut next = position.clone();
    next.pending_rewards = position.pending_rewards.checked_add(earned)?;
    next.index_checkpoint = pool.cumulative_index;
    Ok(next)
}

/// Take all pending rewards out of a settled position
pub fn claim(position: &AccountPoolPosition) -> Result<(Fixed, AccountPoolPosition)> {
    let amount = position.pending_rewards;
    if amount.is_zero() {
        return Err(EngineError::NothingToClaim);
    }

    let mut next = position.clone();
    next.pending_rewards = Fixed::ZERO;
    next.claimed_rewards = position.claimed_rewards.checked_add(amount)?;
    Ok((amount, next))
}
