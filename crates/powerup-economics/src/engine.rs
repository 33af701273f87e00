//! # Reward Engine
//!
//! Sequences the components on every external call. Each mutating entry point
//! runs the same steps:
//!
//! 1. read the current tick and accrue emission
//! 2. advance the index with the **pre-mutation** aggregate
//! 3. settle the acting account against the new index
//! 4. apply the requested balance change
//! 5. recompute the power-up and apply the aggregate delta
//! 6. move tokens through the collaborators, persist pool and position in one
//!    batch, then pay out rewards
//!
//! Steps 1-5 work on owned copies. A failing collaborator call reverts the
//! transfers already made in the same request and nothing is committed. The
//! payout runs only after a successful commit; if it is rejected the previous
//! records are written back.

use crate::aggregate;
use crate::collaborators::{available_to_delegate, GovernanceLedger, LpTokenLedger};
use crate::config::PoolConfig;
use crate::constants::{MAX_REWARDS_PER_TICK, MIN_LP_STAKE, MIN_POSITION_WEIGHT};
use crate::curve::{LogCurve, PowerUpCurve};
use crate::index;
use crate::ledger;
use crate::state::{AccountIndicators, AccountPoolPosition, Pool, PoolIndicators};
use crate::store::{PositionChange, PositionStore, WriteBatch};
use powerup_core::prelude::*;
use serde::{Deserialize, Serialize};

/// Balance change requested by an entry point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Stake(Fixed),
    Unstake(Fixed),
    Delegate(Fixed),
    Undelegate(Fixed),
    Claim,
    Exit,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Self::Stake(_) => "stake",
            Self::Unstake(_) => "unstake",
            Self::Delegate(_) => "delegate",
            Self::Undelegate(_) => "undelegate",
            Self::Claim => "claim",
            Self::Exit => "exit",
        }
    }
}

/// Token movement performed through a collaborator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transfer {
    LpIn(Fixed),
    LpOut(Fixed),
    Delegate(Fixed),
    Release(Fixed),
}

/// What a request moved out to the account
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub lp_returned: Fixed,
    pub delegation_released: Fixed,
    pub rewards_paid: Fixed,
}

/// Governance-weighted reward accrual engine
pub struct RewardEngine<S, T, L, G, C = LogCurve> {
    store: S,
    ticks: T,
    lp: L,
    governance: G,
    curve: C,
}

impl<S, T, L, G, C> RewardEngine<S, T, L, G, C>
where
    S: PositionStore,
    T: TickSource,
    L: LpTokenLedger,
    G: GovernanceLedger,
    C: PowerUpCurve,
{
    pub fn new(store: S, ticks: T, lp: L, governance: G, curve: C) -> Self {
        Self {
            store,
            ticks,
            lp,
            governance,
            curve,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ticks(&self) -> &T {
        &self.ticks
    }

    pub fn lp_ledger(&self) -> &L {
        &self.lp
    }

    pub fn lp_ledger_mut(&mut self) -> &mut L {
        &mut self.lp
    }

    pub fn governance(&self) -> &G {
        &self.governance
    }

    pub fn governance_mut(&mut self) -> &mut G {
        &mut self.governance
    }

    pub fn curve(&self) -> &C {
        &self.curve
    }

    // === Configuration surface ===

    /// Register a pool starting at the current tick
    pub fn create_pool(&mut self, pool_id: PoolId, rewards_per_tick: Fixed) -> Result<()> {
        require_rate(rewards_per_tick)?;
        if self.store.pool(pool_id)?.is_some() {
            return Err(EngineError::PoolExists(pool_id));
        }
        let tick = self.ticks.current_tick();
        self.store
            .commit(WriteBatch::pool_only(Pool::new(pool_id, rewards_per_tick, tick)))?;
        tracing::info!("Created {} at tick {} emitting {} per tick", pool_id, tick, rewards_per_tick);
        Ok(())
    }

    /// Change a pool's emission rate; emission up to now uses the old rate
    pub fn set_rewards_per_tick(&mut self, pool_id: PoolId, rewards_per_tick: Fixed) -> Result<()> {
        require_rate(rewards_per_tick)?;
        let mut pool = self.checkpointed_pool(pool_id, self.ticks.current_tick())?;
        let previous = pool.rewards_per_tick;
        pool.rewards_per_tick = rewards_per_tick;
        self.store.commit(WriteBatch::pool_only(pool))?;
        tracing::info!("{} rewards per tick {} -> {}", pool_id, previous, rewards_per_tick);
        Ok(())
    }

    /// Create missing pools and update rates of existing ones
    pub fn configure_pools(&mut self, pools: &[PoolConfig]) -> Result<()> {
        for config in pools {
            let pool_id = config.pool_id();
            match self.store.pool(pool_id)? {
                None => self.create_pool(pool_id, config.rewards_per_tick)?,
                Some(existing) if existing.rewards_per_tick != config.rewards_per_tick => {
                    self.set_rewards_per_tick(pool_id, config.rewards_per_tick)?
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Advance a pool to the current tick without touching any account
    pub fn checkpoint_pool(&mut self, pool_id: PoolId) -> Result<PoolIndicators> {
        let pool = self.checkpointed_pool(pool_id, self.ticks.current_tick())?;
        let indicators = PoolIndicators::from(&pool);
        self.store.commit(WriteBatch::pool_only(pool))?;
        Ok(indicators)
    }

    // === Entry points ===

    /// Stake LP tokens from the account's wallet
    pub fn stake(&mut self, pool: PoolId, account: AccountId, amount: Fixed) -> Result<()> {
        self.execute(pool, account, Action::Stake(amount)).map(|_| ())
    }

    /// Return staked LP tokens to the account's wallet
    pub fn unstake(&mut self, pool: PoolId, account: AccountId, amount: Fixed) -> Result<()> {
        self.execute(pool, account, Action::Unstake(amount)).map(|_| ())
    }

    /// Attribute staked governance tokens to this pool
    pub fn delegate(&mut self, pool: PoolId, account: AccountId, amount: Fixed) -> Result<()> {
        self.execute(pool, account, Action::Delegate(amount)).map(|_| ())
    }

    /// Withdraw governance attribution from this pool
    pub fn undelegate(&mut self, pool: PoolId, account: AccountId, amount: Fixed) -> Result<()> {
        self.execute(pool, account, Action::Undelegate(amount)).map(|_| ())
    }

    /// Pay out all settled rewards; fails with `NothingToClaim` when none
    pub fn claim_rewards(&mut self, pool: PoolId, account: AccountId) -> Result<Fixed> {
        self.execute(pool, account, Action::Claim)
            .map(|receipt| receipt.rewards_paid)
    }

    /// Unstake everything, undelegate everything and claim, in one request
    pub fn exit(&mut self, pool: PoolId, account: AccountId) -> Result<Receipt> {
        self.execute(pool, account, Action::Exit)
    }

    // === Queries ===

    /// Pool state projected to the current tick
    pub fn pool_indicators(&self, pool_id: PoolId) -> Result<PoolIndicators> {
        let pool = self.checkpointed_pool(pool_id, self.ticks.current_tick())?;
        Ok(PoolIndicators::from(&pool))
    }

    /// Account state with rewards projected to the current tick
    pub fn account_indicators(&self, pool_id: PoolId, account: AccountId) -> Result<AccountIndicators> {
        let pool = self.checkpointed_pool(pool_id, self.ticks.current_tick())?;
        let key = PositionKey::new(pool_id, account);
        let position = self
            .store
            .position(&key)?
            .ok_or(EngineError::PositionNotFound {
                pool: pool_id,
                account,
            })?;
        Ok(AccountIndicators::from(&ledger::settle(&position, &pool)?))
    }

    // === Internals ===

    fn checkpointed_pool(&self, pool_id: PoolId, tick: Tick) -> Result<Pool> {
        let pool = self
            .store
            .pool(pool_id)?
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        index::checkpoint(&pool, tick)
    }

    fn execute(&mut self, pool_id: PoolId, account: AccountId, action: Action) -> Result<Receipt> {
        let result = self.try_execute(pool_id, account, action);
        if let Err(err) = &result {
            if err.is_recoverable() {
                tracing::warn!("Rejected {} by {} in {}: {}", action.name(), account, pool_id, err);
            } else {
                tracing::error!("Aborted {} by {} in {}: {}", action.name(), account, pool_id, err);
            }
        }
        result
    }

    fn try_execute(&mut self, pool_id: PoolId, account: AccountId, action: Action) -> Result<Receipt> {
        // Steps 1-2
        let tick = self.ticks.current_tick();
        let stored_pool = self
            .store
            .pool(pool_id)?
            .ok_or(EngineError::PoolNotFound(pool_id))?;
        let mut pool = index::checkpoint(&stored_pool, tick)?;

        // Step 3
        let key = PositionKey::new(pool_id, account);
        let stored_position = self.store.position(&key)?;
        let position = match &stored_position {
            Some(stored) => {
                let settled = ledger::settle(stored, &pool)?;
                tracing::debug!(
                    "Settled {} in {} at tick {}: +{} pending",
                    account,
                    pool_id,
                    tick,
                    settled.pending_rewards.saturating_sub(stored.pending_rewards)
                );
                settled
            }
            None => AccountPoolPosition::new(pool_id, account, pool.cumulative_index, self.curve.floor()),
        };
        let old_weight = aggregate::weight(position.lp_balance, position.power_up)?;

        // Step 4
        let (mut position, transfers, receipt) = self.mutate(position, action)?;

        // Step 5
        position.power_up = self
            .curve
            .power_up(position.delegated_governance_balance, position.lp_balance);
        let new_weight = aggregate::weight(position.lp_balance, position.power_up)?;
        require_minimum("LP balance", position.lp_balance, MIN_LP_STAKE)?;
        require_minimum("position weight", new_weight, MIN_POSITION_WEIGHT)?;
        pool.aggregate_power_up = aggregate::apply_delta(pool.aggregate_power_up, old_weight, new_weight)?;

        // Step 6
        self.run_transfers(pool_id, &account, &transfers)?;

        let change = if position.is_empty() {
            PositionChange::Remove(key)
        } else {
            PositionChange::Upsert(position)
        };
        if let Err(err) = self.store.commit(WriteBatch {
            pool,
            position: Some(change),
        }) {
            self.revert_transfers(pool_id, &account, &transfers);
            return Err(err);
        }

        if !receipt.rewards_paid.is_zero() {
            if let Err(err) = self.governance.pay_reward(&account, receipt.rewards_paid) {
                self.restore(stored_pool, key, stored_position);
                self.revert_transfers(pool_id, &account, &transfers);
                return Err(err);
            }
            tracing::info!("{} claimed {} from {}", account, receipt.rewards_paid, pool_id);
        }
        Ok(receipt)
    }

    fn mutate(
        &self,
        mut position: AccountPoolPosition,
        action: Action,
    ) -> Result<(AccountPoolPosition, Vec<Transfer>, Receipt)> {
        let mut receipt = Receipt::default();
        let mut transfers = Vec::new();

        match action {
            Action::Stake(amount) => {
                let wallet = self.lp.balance_of(position.pool_id, &position.account);
                require_amount(amount, wallet)?;
                position.lp_balance = position.lp_balance.checked_add(amount)?;
                transfers.push(Transfer::LpIn(amount));
            }
            Action::Unstake(amount) => {
                require_amount(amount, position.lp_balance)?;
                position.lp_balance = position.lp_balance.checked_sub(amount)?;
                transfers.push(Transfer::LpOut(amount));
                receipt.lp_returned = amount;
            }
            Action::Delegate(amount) => {
                let available = available_to_delegate(&self.governance, &position.account);
                require_amount(amount, available)?;
                position.delegated_governance_balance =
                    position.delegated_governance_balance.checked_add(amount)?;
                transfers.push(Transfer::Delegate(amount));
            }
            Action::Undelegate(amount) => {
                require_amount(amount, position.delegated_governance_balance)?;
                position.delegated_governance_balance =
                    position.delegated_governance_balance.checked_sub(amount)?;
                transfers.push(Transfer::Release(amount));
                receipt.delegation_released = amount;
            }
            Action::Claim => {
                let (amount, claimed) = ledger::claim(&position)?;
                position = claimed;
                receipt.rewards_paid = amount;
            }
            Action::Exit => {
                if position.is_empty() {
                    return Err(EngineError::PositionNotFound {
                        pool: position.pool_id,
                        account: position.account,
                    });
                }
                if !position.lp_balance.is_zero() {
                    receipt.lp_returned = position.lp_balance;
                    transfers.push(Transfer::LpOut(position.lp_balance));
                    position.lp_balance = Fixed::ZERO;
                }
                if !position.delegated_governance_balance.is_zero() {
                    receipt.delegation_released = position.delegated_governance_balance;
                    transfers.push(Transfer::Release(position.delegated_governance_balance));
                    position.delegated_governance_balance = Fixed::ZERO;
                }
                if !position.pending_rewards.is_zero() {
                    let (amount, claimed) = ledger::claim(&position)?;
                    position = claimed;
                    receipt.rewards_paid = amount;
                }
            }
        }

        Ok((position, transfers, receipt))
    }

    /// Perform transfers in order; on failure undo the ones already done
    fn run_transfers(&mut self, pool: PoolId, account: &AccountId, transfers: &[Transfer]) -> Result<()> {
        for (done, transfer) in transfers.iter().enumerate() {
            let result = match *transfer {
                Transfer::LpIn(amount) => self.lp.transfer_in(pool, account, amount),
                Transfer::LpOut(amount) => self.lp.transfer_out(pool, account, amount),
                Transfer::Delegate(amount) => self.governance.record_delegation(pool, account, amount),
                Transfer::Release(amount) => self.governance.release_delegation(pool, account, amount),
            };
            if let Err(err) = result {
                self.revert_transfers(pool, account, &transfers[..done]);
                return Err(err);
            }
        }
        Ok(())
    }

    fn revert_transfers(&mut self, pool: PoolId, account: &AccountId, done: &[Transfer]) {
        for transfer in done.iter().rev() {
            let result = match *transfer {
                Transfer::LpIn(amount) => self.lp.transfer_out(pool, account, amount),
                Transfer::LpOut(amount) => self.lp.transfer_in(pool, account, amount),
                Transfer::Delegate(amount) => self.governance.release_delegation(pool, account, amount),
                Transfer::Release(amount) => self.governance.record_delegation(pool, account, amount),
            };
            if let Err(err) = result {
                tracing::error!("Failed to revert {:?} for {} in {}: {}", transfer, account, pool, err);
            }
        }
    }

    /// Write back the records a request started from
    fn restore(&mut self, pool: Pool, key: PositionKey, position: Option<AccountPoolPosition>) {
        let change = match position {
            Some(position) => PositionChange::Upsert(position),
            None => PositionChange::Remove(key),
        };
        if let Err(err) = self.store.commit(WriteBatch {
            pool,
            position: Some(change),
        }) {
            tracing::error!("Failed to restore {} in {}: {}", key.account, key.pool, err);
        }
    }
}

/// Reject zero amounts and amounts above what is held
fn require_amount(requested: Fixed, available: Fixed) -> Result<()> {
    if requested.is_zero() {
        return Err(EngineError::ZeroAmount);
    }
    if requested > available {
        return Err(EngineError::InsufficientBalance {
            requested,
            available,
        });
    }
    Ok(())
}

/// Balances and weights are either zero or at least `minimum`
fn require_minimum(what: &'static str, value: Fixed, minimum: Fixed) -> Result<()> {
    if !value.is_zero() && value < minimum {
        return Err(EngineError::BelowMinimum { what, value, minimum });
    }
    Ok(())
}

fn require_rate(rewards_per_tick: Fixed) -> Result<()> {
    if rewards_per_tick > MAX_REWARDS_PER_TICK {
        return Err(EngineError::InvalidAmount(format!(
            "rewards per tick {} exceeds {}",
            rewards_per_tick, MAX_REWARDS_PER_TICK
        )));
    }
    Ok(())
}
