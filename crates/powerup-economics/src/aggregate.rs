//! # Aggregate Power-Up Tracker
//!
//! Each pool keeps `Σ lp_balance × power_up` over its positions. When one
//! account changes, the aggregate moves by exactly that account's signed delta,
//! so no operation ever iterates over the other participants.

use powerup_core::prelude::*;

/// Weighted stake of one position
pub fn weight(lp_balance: Fixed, power_up: Fixed) -> Result<Fixed> {
    lp_balance.mul(power_up)
}

/// Replace one account's contribution in the aggregate
///
/// Removing more than the aggregate holds means the aggregate and the positions
/// have diverged; that is reported as `Underflow` and never clamped.
pub fn apply_delta(previous_aggregate: Fixed, old_weight: Fixed, new_weight: Fixed) -> Result<Fixed> {
    previous_aggregate
        .checked_sub(old_weight)
        .map_err(|_| EngineError::Underflow)?
        .checked_add(new_weight)
}
