//! # Persisted Records
//!
//! The engine's entire durable state is one [`Pool`] per configured pool and
//! one [`AccountPoolPosition`] per (pool, account) pair with a non-empty
//! position.

use powerup_core::fixed::decimal;
use powerup_core::prelude::*;
use serde::{Deserialize, Serialize};

/// Pool-wide reward accounting
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Pool identifier
    pub pool_id: PoolId,

    /// Reward emitted per tick across all stakers
    pub rewards_per_tick: Fixed,

    /// Sum of `lp_balance * power_up` over every position
    pub aggregate_power_up: Fixed,

    /// Reward per unit of weighted stake, integrated over time
    pub cumulative_index: Fixed,

    /// Total emission since pool creation
    pub accrued_rewards_total: Fixed,

    /// Emission accrued while nobody was staked, owed to the next stakers
    pub undistributed_rewards: Fixed,

    /// Tick of the last checkpoint
    pub last_checkpoint_tick: Tick,
}

impl Pool {
    /// Create an empty pool starting at `tick`
    pub fn new(pool_id: PoolId, rewards_per_tick: Fixed, tick: Tick) -> Self {
        Self {
            pool_id,
            rewards_per_tick,
            aggregate_power_up: Fixed::ZERO,
            cumulative_index: Fixed::ZERO,
            accrued_rewards_total: Fixed::ZERO,
            undistributed_rewards: Fixed::ZERO,
            last_checkpoint_tick: tick,
        }
    }
}

/// One account's stake, delegation and reward checkpoint in one pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPoolPosition {
    pub pool_id: PoolId,
    pub account: AccountId,

    /// LP tokens staked
    pub lp_balance: Fixed,

    /// Governance tokens attributed to this pool
    pub delegated_governance_balance: Fixed,

    /// Boost multiplier derived from the two balances above
    pub power_up: Fixed,

    /// Pool index at the last settlement
    pub index_checkpoint: Fixed,

    /// Settled but unclaimed rewards
    pub pending_rewards: Fixed,

    /// Rewards claimed to date
    pub claimed_rewards: Fixed,
}

impl AccountPoolPosition {
    /// Fresh position checkpointed at the pool's current index
    pub fn new(pool_id: PoolId, account: AccountId, index: Fixed, power_up: Fixed) -> Self {
        Self {
            pool_id,
            account,
            lp_balance: Fixed::ZERO,
            delegated_governance_balance: Fixed::ZERO,
            power_up,
            index_checkpoint: index,
            pending_rewards: Fixed::ZERO,
            claimed_rewards: Fixed::ZERO,
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.pool_id, self.account)
    }

    /// Nothing staked, delegated or owed: the record can be dropped
    pub fn is_empty(&self) -> bool {
        self.lp_balance.is_zero()
            && self.delegated_governance_balance.is_zero()
            && self.pending_rewards.is_zero()
    }
}

/// Read-only view of an account's position
///
/// Amounts serialize as decimal strings for external readers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIndicators {
    #[serde(with = "decimal")]
    pub lp_balance: Fixed,
    #[serde(with = "decimal")]
    pub delegated_governance_balance: Fixed,
    #[serde(with = "decimal")]
    pub power_up: Fixed,
    #[serde(with = "decimal")]
    pub pending_rewards: Fixed,
    #[serde(with = "decimal")]
    pub claimed_rewards: Fixed,
}

impl From<&AccountPoolPosition> for AccountIndicators {
    fn from(position: &AccountPoolPosition) -> Self {
        Self {
            lp_balance: position.lp_balance,
            delegated_governance_balance: position.delegated_governance_balance,
            power_up: position.power_up,
            pending_rewards: position.pending_rewards,
            claimed_rewards: position.claimed_rewards,
        }
    }
}

/// Read-only view of a pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolIndicators {
    #[serde(with = "decimal")]
    pub aggregate_power_up: Fixed,
    #[serde(with = "decimal")]
    pub cumulative_index: Fixed,
    #[serde(with = "decimal")]
    pub rewards_per_tick: Fixed,
    #[serde(with = "decimal")]
    pub accrued_rewards_total: Fixed,
    #[serde(with = "decimal")]
    pub undistributed_rewards: Fixed,
    pub last_checkpoint_tick: Tick,
}

impl From<&Pool> for PoolIndicators {
    fn from(pool: &Pool) -> Self {
        Self {
            aggregate_power_up: pool.aggregate_power_up,
            cumulative_index: pool.cumulative_index,
            rewards_per_tick: pool.rewards_per_tick,
            accrued_rewards_total: pool.accrued_rewards_total,
            undistributed_rewards: pool.undistributed_rewards,
            last_checkpoint_tick: pool.last_checkpoint_tick,
        }
    }
}
