//! # Token Ledger Collaborators
//!
//! The engine never moves tokens itself. Custody of LP tokens and the
//! attribution of governance tokens live behind these traits:
//!
//! - [`LpTokenLedger`] - LP custody; stake pulls tokens in, unstake pays them out
//! - [`GovernanceLedger`] - governance staking balances and per-pool delegation
//!   records (delegation moves attribution, not custody) plus reward payout
//!
//! [`memory`] holds plain in-memory implementations for tests and simulation.

use powerup_core::prelude::*;

/// Per-account LP token balances and engine custody
#[cfg_attr(test, mockall::automock)]
pub trait LpTokenLedger {
    /// LP tokens held in the account's wallet (not staked)
    fn balance_of(&self, pool: PoolId, account: &AccountId) -> Fixed;

    /// Move LP tokens from the wallet into engine custody
    fn transfer_in(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()>;

    /// Return LP tokens from engine custody to the wallet
    fn transfer_out(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()>;
}

/// Governance token staking, delegation records and reward payout
#[cfg_attr(test, mockall::automock)]
pub trait GovernanceLedger {
    /// Governance tokens the account has staked
    fn staked_balance(&self, account: &AccountId) -> Fixed;

    /// Governance tokens the account has attributed to pools, summed over pools
    fn delegated_balance(&self, account: &AccountId) -> Fixed;

    /// Attribute staked governance tokens to a pool
    fn record_delegation(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()>;

    /// Withdraw attribution from a pool
    fn release_delegation(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()>;

    /// Pay claimed rewards to the account
    fn pay_reward(&mut self, account: &AccountId, amount: Fixed) -> Result<()>;
}

/// Staked governance tokens not yet attributed to any pool
pub fn available_to_delegate<G: GovernanceLedger + ?Sized>(ledger: &G, account: &AccountId) -> Fixed {
    ledger
        .staked_balance(account)
        .saturating_sub(ledger.delegated_balance(account))
}

pub mod memory {
    //! Single-threaded in-memory ledgers

    use super::*;
    use hashbrown::HashMap;

    fn insufficient(what: &str, requested: Fixed, available: Fixed) -> EngineError {
        EngineError::Ledger(format!(
            "{} balance too low: requested {}, available {}",
            what, requested, available
        ))
    }

    /// LP wallets and engine custody per pool
    #[derive(Clone, Debug, Default)]
    pub struct InMemoryLpLedger {
        wallets: HashMap<PositionKey, Fixed>,
        custody: HashMap<PoolId, Fixed>,
    }

    impl InMemoryLpLedger {
        pub fn new() -> Self {
            Self::default()
        }

        /// Credit LP tokens to a wallet
        pub fn mint(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) {
            let wallet = self.wallets.entry(PositionKey::new(pool, *account)).or_default();
            *wallet = wallet.saturating_add(amount);
        }

        /// LP tokens held by the engine for a pool
        pub fn custody(&self, pool: PoolId) -> Fixed {
            self.custody.get(&pool).copied().unwrap_or_default()
        }
    }

    impl LpTokenLedger for InMemoryLpLedger {
        fn balance_of(&self, pool: PoolId, account: &AccountId) -> Fixed {
            self.wallets
                .get(&PositionKey::new(pool, *account))
                .copied()
                .unwrap_or_default()
        }

        fn transfer_in(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()> {
            let available = self.balance_of(pool, account);
            let remaining = available
                .checked_sub(amount)
                .map_err(|_| insufficient("LP wallet", amount, available))?;
            self.wallets.insert(PositionKey::new(pool, *account), remaining);
            let held = self.custody.entry(pool).or_default();
            *held = held.checked_add(amount)?;
            Ok(())
        }

        fn transfer_out(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()> {
            let held = self.custody(pool);
            let remaining = held
                .checked_sub(amount)
                .map_err(|_| insufficient("LP custody", amount, held))?;
            self.custody.insert(pool, remaining);
            self.mint(pool, account, amount);
            Ok(())
        }
    }

    /// Governance stakes, delegation records and paid rewards
    #[derive(Clone, Debug, Default)]
    pub struct InMemoryGovernance {
        staked: HashMap<AccountId, Fixed>,
        delegations: HashMap<PositionKey, Fixed>,
        delegated_totals: HashMap<AccountId, Fixed>,
        paid: HashMap<AccountId, Fixed>,
        reject_payouts: bool,
    }

    impl InMemoryGovernance {
        pub fn new() -> Self {
            Self::default()
        }

        /// Stake governance tokens for an account
        pub fn stake(&mut self, account: &AccountId, amount: Fixed) {
            let staked = self.staked.entry(*account).or_default();
            *staked = staked.saturating_add(amount);
        }

        /// Governance tokens attributed to one pool
        pub fn delegated_to(&self, pool: PoolId, account: &AccountId) -> Fixed {
            self.delegations
                .get(&PositionKey::new(pool, *account))
                .copied()
                .unwrap_or_default()
        }

        /// Rewards paid to an account so far
        pub fn paid_to(&self, account: &AccountId) -> Fixed {
            self.paid.get(account).copied().unwrap_or_default()
        }

        /// Make every subsequent payout fail (collaborator outage)
        pub fn reject_payouts(&mut self, reject: bool) {
            self.reject_payouts = reject;
        }
    }

    impl GovernanceLedger for InMemoryGovernance {
        fn staked_balance(&self, account: &AccountId) -> Fixed {
            self.staked.get(account).copied().unwrap_or_default()
        }

        fn delegated_balance(&self, account: &AccountId) -> Fixed {
            self.delegated_totals.get(account).copied().unwrap_or_default()
        }

        fn record_delegation(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()> {
            let available = available_to_delegate(self, account);
            if amount > available {
                return Err(insufficient("undelegated stake", amount, available));
            }
            let record = self.delegations.entry(PositionKey::new(pool, *account)).or_default();
            *record = record.checked_add(amount)?;
            let total = self.delegated_totals.entry(*account).or_default();
            *total = total.checked_add(amount)?;
            Ok(())
        }

        fn release_delegation(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()> {
            let key = PositionKey::new(pool, *account);
            let current = self.delegations.get(&key).copied().unwrap_or_default();
            let remaining = current
                .checked_sub(amount)
                .map_err(|_| insufficient("delegation", amount, current))?;
            if remaining.is_zero() {
                self.delegations.remove(&key);
            } else {
                self.delegations.insert(key, remaining);
            }
            let total = self.delegated_balance(account).saturating_sub(amount);
            if total.is_zero() {
                self.delegated_totals.remove(account);
            } else {
                self.delegated_totals.insert(*account, total);
            }
            Ok(())
        }

        fn pay_reward(&mut self, account: &AccountId, amount: Fixed) -> Result<()> {
            if self.reject_payouts {
                return Err(EngineError::Ledger("reward payout rejected".to_string()));
            }
            let paid = self.paid.entry(*account).or_default();
            *paid = paid.checked_add(amount)?;
            Ok(())
        }
    }

}
