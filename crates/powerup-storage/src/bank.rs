//! # Token Bank
//!
//! Shared balances behind the engine's collaborator traits:
//!
//! | Balance | Moves on |
//! |---------|----------|
//! | LP wallet / custody | stake, unstake |
//! | governance wallet | `stake_governance`, `withdraw`, reward payout |
//! | governance stake | `stake_governance`, `start_cooldown` |
//! | delegation record | delegate, undelegate |
//! | treasury | `fund_rewards`, reward payout |
//!
//! ## Cooldown
//!
//! Unstaking governance tokens is a two-step withdrawal. `start_cooldown` moves
//! tokens out of the active stake; `withdraw` returns them to the wallet once
//! `cooldown_ticks` have passed. Only undelegated stake can enter cooldown, so
//! an account must undelegate from its pools first.

use parking_lot::RwLock;
use hashbrown::HashMap;
use powerup_core::fixed::decimal;
use powerup_core::prelude::*;
use powerup_economics::{GovernanceLedger, LpTokenLedger};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Bank errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankError {
    #[error("Insufficient {what}: requested {requested}, available {available}")]
    InsufficientFunds {
        what: &'static str,
        requested: Fixed,
        available: Fixed,
    },

    #[error("Cooldown already running until tick {ready_at}")]
    CooldownActive { ready_at: Tick },

    #[error("Cooldown ends at tick {ready_at}, now {now}")]
    CooldownPending { ready_at: Tick, now: Tick },

    #[error("No cooldown started")]
    NoCooldown,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl From<BankError> for EngineError {
    fn from(err: BankError) -> Self {
        EngineError::Ledger(err.to_string())
    }
}

fn take(what: &'static str, balance: Fixed, amount: Fixed) -> std::result::Result<Fixed, BankError> {
    balance.checked_sub(amount).map_err(|_| BankError::InsufficientFunds {
        what,
        requested: amount,
        available: balance,
    })
}

fn put(balance: Fixed, amount: Fixed) -> std::result::Result<Fixed, BankError> {
    balance.checked_add(amount).map_err(|_| BankError::Overflow)
}

/// Bank configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Ticks between `start_cooldown` and `withdraw`
    pub cooldown_ticks: u64,

    /// Rewards available for payout at start
    #[serde(with = "decimal")]
    pub initial_treasury: Fixed,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            cooldown_ticks: 100,
            initial_treasury: Fixed::from_units(1_000_000),
        }
    }
}

/// Governance tokens waiting to leave the stake
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    pub amount: Fixed,
    pub ready_at: Tick,
}

#[derive(Debug, Default)]
struct Balances {
    lp_wallets: HashMap<PositionKey, Fixed>,
    lp_custody: HashMap<PoolId, Fixed>,
    governance_wallets: HashMap<AccountId, Fixed>,
    staked: HashMap<AccountId, Fixed>,
    cooldowns: HashMap<AccountId, Cooldown>,
    delegations: HashMap<PositionKey, Fixed>,
    delegated_totals: HashMap<AccountId, Fixed>,
    treasury: Fixed,
}

impl Balances {
    fn get<K: std::hash::Hash + Eq>(map: &HashMap<K, Fixed>, key: &K) -> Fixed {
        map.get(key).copied().unwrap_or_default()
    }

    /// Store a balance, dropping zero entries
    fn set<K: std::hash::Hash + Eq>(map: &mut HashMap<K, Fixed>, key: K, value: Fixed) {
        if value.is_zero() {
            map.remove(&key);
        } else {
            map.insert(key, value);
        }
    }

    fn delegated_total(&self, account: &AccountId) -> Fixed {
        Self::get(&self.delegated_totals, account)
    }
}

/// Cloneable handle to one set of token balances
#[derive(Clone)]
pub struct TokenBank {
    config: BankConfig,
    balances: Arc<RwLock<Balances>>,
}

impl TokenBank {
    pub fn new(config: BankConfig) -> Self {
        let balances = Balances {
            treasury: config.initial_treasury,
            ..Balances::default()
        };
        Self {
            config,
            balances: Arc::new(RwLock::new(balances)),
        }
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    // === Funding ===

    /// Credit LP tokens to a wallet
    pub fn mint_lp(&self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()> {
        let mut balances = self.balances.write();
        let key = PositionKey::new(pool, *account);
        let next = put(Balances::get(&balances.lp_wallets, &key), amount)?;
        Balances::set(&mut balances.lp_wallets, key, next);
        Ok(())
    }

    /// Credit governance tokens to a wallet
    pub fn mint_governance(&self, account: &AccountId, amount: Fixed) -> Result<()> {
        let mut balances = self.balances.write();
        let next = put(Balances::get(&balances.governance_wallets, account), amount)?;
        Balances::set(&mut balances.governance_wallets, *account, next);
        Ok(())
    }

    /// Add to the reward treasury
    pub fn fund_rewards(&self, amount: Fixed) -> Result<()> {
        let mut balances = self.balances.write();
        balances.treasury = put(balances.treasury, amount)?;
        Ok(())
    }

    // === Governance staking ===

    /// Move governance tokens from the wallet into the active stake
    pub fn stake_governance(&self, account: &AccountId, amount: Fixed) -> Result<()> {
        if amount.is_zero() {
            return Err(EngineError::ZeroAmount);
        }
        let mut balances = self.balances.write();
        let wallet = take("governance wallet", Balances::get(&balances.governance_wallets, account), amount)?;
        let staked = put(Balances::get(&balances.staked, account), amount)?;
        Balances::set(&mut balances.governance_wallets, *account, wallet);
        Balances::set(&mut balances.staked, *account, staked);
        Ok(())
    }

    /// Start withdrawing undelegated stake; one cooldown per account at a time
    pub fn start_cooldown(&self, account: &AccountId, amount: Fixed, now: Tick) -> Result<Cooldown> {
        if amount.is_zero() {
            return Err(EngineError::ZeroAmount);
        }
        let mut balances = self.balances.write();
        if let Some(running) = balances.cooldowns.get(account) {
            return Err(BankError::CooldownActive {
                ready_at: running.ready_at,
            }
            .into());
        }

        let staked = Balances::get(&balances.staked, account);
        let free = staked.saturating_sub(balances.delegated_total(account));
        take("undelegated stake", free, amount)?;

        let cooldown = Cooldown {
            amount,
            ready_at: now.saturating_add(self.config.cooldown_ticks),
        };
        Balances::set(&mut balances.staked, *account, take("stake", staked, amount)?);
        balances.cooldowns.insert(*account, cooldown);
        tracing::debug!("{} cooling down {} until tick {}", account, amount, cooldown.ready_at);
        Ok(cooldown)
    }

    /// Return cooled-down tokens to the wallet
    pub fn withdraw(&self, account: &AccountId, now: Tick) -> Result<Fixed> {
        let mut balances = self.balances.write();
        let cooldown = *balances.cooldowns.get(account).ok_or(BankError::NoCooldown)?;
        if now < cooldown.ready_at {
            return Err(BankError::CooldownPending {
                ready_at: cooldown.ready_at,
                now,
            }
            .into());
        }
        let wallet = put(Balances::get(&balances.governance_wallets, account), cooldown.amount)?;
        Balances::set(&mut balances.governance_wallets, *account, wallet);
        balances.cooldowns.remove(account);
        Ok(cooldown.amount)
    }

    // === Read-only ===

    pub fn governance_wallet(&self, account: &AccountId) -> Fixed {
        Balances::get(&self.balances.read().governance_wallets, account)
    }

    pub fn cooldown(&self, account: &AccountId) -> Option<Cooldown> {
        self.balances.read().cooldowns.get(account).copied()
    }

    pub fn delegated_to(&self, pool: PoolId, account: &AccountId) -> Fixed {
        Balances::get(&self.balances.read().delegations, &PositionKey::new(pool, *account))
    }

    pub fn lp_custody(&self, pool: PoolId) -> Fixed {
        Balances::get(&self.balances.read().lp_custody, &pool)
    }

    pub fn treasury(&self) -> Fixed {
        self.balances.read().treasury
    }
}

impl Default for TokenBank {
    fn default() -> Self {
        Self::new(BankConfig::default())
    }
}

impl LpTokenLedger for TokenBank {
    fn balance_of(&self, pool: PoolId, account: &AccountId) -> Fixed {
        Balances::get(&self.balances.read().lp_wallets, &PositionKey::new(pool, *account))
    }

    fn transfer_in(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()> {
        let mut balances = self.balances.write();
        let key = PositionKey::new(pool, *account);
        let wallet = take("LP wallet", Balances::get(&balances.lp_wallets, &key), amount)?;
        let custody = put(Balances::get(&balances.lp_custody, &pool), amount)?;
        Balances::set(&mut balances.lp_wallets, key, wallet);
        Balances::set(&mut balances.lp_custody, pool, custody);
        Ok(())
    }

    fn transfer_out(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()> {
        let mut balances = self.balances.write();
        let key = PositionKey::new(pool, *account);
        let custody = take("LP custody", Balances::get(&balances.lp_custody, &pool), amount)?;
        let wallet = put(Balances::get(&balances.lp_wallets, &key), amount)?;
        Balances::set(&mut balances.lp_custody, pool, custody);
        Balances::set(&mut balances.lp_wallets, key, wallet);
        Ok(())
    }
}

impl GovernanceLedger for TokenBank {
    fn staked_balance(&self, account: &AccountId) -> Fixed {
        Balances::get(&self.balances.read().staked, account)
    }

    fn delegated_balance(&self, account: &AccountId) -> Fixed {
        self.balances.read().delegated_total(account)
    }

    fn record_delegation(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()> {
        let mut balances = self.balances.write();
        let free = Balances::get(&balances.staked, account).saturating_sub(balances.delegated_total(account));
        take("undelegated stake", free, amount)?;
        let key = PositionKey::new(pool, *account);
        let next = put(Balances::get(&balances.delegations, &key), amount)?;
        let total = put(balances.delegated_total(account), amount)?;
        Balances::set(&mut balances.delegations, key, next);
        Balances::set(&mut balances.delegated_totals, *account, total);
        Ok(())
    }

    fn release_delegation(&mut self, pool: PoolId, account: &AccountId, amount: Fixed) -> Result<()> {
        let mut balances = self.balances.write();
        let key = PositionKey::new(pool, *account);
        let next = take("delegation", Balances::get(&balances.delegations, &key), amount)?;
        let total = balances.delegated_total(account).saturating_sub(amount);
        Balances::set(&mut balances.delegations, key, next);
        Balances::set(&mut balances.delegated_totals, *account, total);
        Ok(())
    }

    fn pay_reward(&mut self, account: &AccountId, amount: Fixed) -> Result<()> {
        let mut balances = self.balances.write();
        let treasury = take("reward treasury", balances.treasury, amount)?;
        let wallet = put(Balances::get(&balances.governance_wallets, account), amount)?;
        balances.treasury = treasury;
        Balances::set(&mut balances.governance_wallets, *account, wallet);
        Ok(())
    }
}
