//! Scenario scripts
//!
//! A scenario is a TOML list of steps replayed against a fresh engine wired to
//! the shared store and token bank:
//!
//! ```toml
//! end_tick = 10
//!
//! [[steps]]
//! tick = 1
//! account = "alice"
//! action = "mint_lp"
//! amount = "100"
//!
//! [[steps]]
//! tick = 1
//! account = "alice"
//! action = "stake"
//! amount = "100"
//! ```
//!
//! Rejected steps are recorded in the report and do not stop the run.

use crate::settings::EngineConfig;
use anyhow::Context;
use powerup_core::fixed::decimal;
use powerup_core::prelude::*;
use powerup_economics::{AccountIndicators, LogCurve, PoolIndicators, PositionStore, RewardEngine};
use powerup_storage::{SharedStore, TokenBank};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// What a step does
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    MintLp,
    StakeGovernance,
    Stake,
    Unstake,
    Delegate,
    Undelegate,
    Claim,
    Exit,
    SetRate,
    Cooldown,
    Withdraw,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub tick: Tick,

    #[serde(default = "default_pool")]
    pub pool: u32,

    #[serde(default)]
    pub account: String,

    pub action: StepAction,

    #[serde(default, with = "decimal")]
    pub amount: Fixed,
}

fn default_pool() -> u32 {
    1
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Tick at which the report is taken; defaults to the last step's tick
    pub end_tick: Option<Tick>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let scenario: Self = toml::from_str(&content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Steps must be in tick order
    pub fn validate(&self) -> anyhow::Result<()> {
        for pair in self.steps.windows(2) {
            if pair[1].tick < pair[0].tick {
                anyhow::bail!("step at tick {} follows tick {}", pair[1].tick, pair[0].tick);
            }
        }
        if let (Some(end), Some(last)) = (self.end_tick, self.steps.last()) {
            if end < last.tick {
                anyhow::bail!("end_tick {} is before the last step at tick {}", end, last.tick);
            }
        }
        Ok(())
    }
}

/// Result of one step
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepOutcome {
    pub tick: Tick,
    pub account: String,
    pub action: StepAction,
    pub ok: bool,

    /// Amount moved out to the account, if any
    #[serde(with = "decimal")]
    pub paid: Fixed,

    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolReport {
    pub pool: u32,
    #[serde(flatten)]
    pub indicators: PoolIndicators,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountReport {
    pub pool: u32,
    pub account: String,
    #[serde(flatten)]
    pub indicators: AccountIndicators,
}

/// Everything a run produced
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    pub end_tick: Tick,
    pub steps: Vec<StepOutcome>,
    pub pools: Vec<PoolReport>,
    pub accounts: Vec<AccountReport>,
}

type SimEngine = RewardEngine<SharedStore, Arc<ManualTicks>, TokenBank, TokenBank>;

/// Replay a scenario; returns the report and the store it wrote to
pub fn run(config: &EngineConfig, scenario: &Scenario) -> anyhow::Result<(Report, SharedStore)> {
    scenario.validate()?;

    let ticks = Arc::new(ManualTicks::new(0));
    let store = SharedStore::new();
    let bank = TokenBank::new(config.bank.clone());
    let curve = LogCurve::new(config.economics.curve)?;
    let mut engine = RewardEngine::new(store.clone(), Arc::clone(&ticks), bank.clone(), bank.clone(), curve);
    engine.configure_pools(&config.economics.pools)?;

    let mut labels: Vec<String> = Vec::new();
    let mut outcomes = Vec::with_capacity(scenario.steps.len());

    for step in &scenario.steps {
        ticks.set(step.tick);
        if !step.account.is_empty() && !labels.contains(&step.account) {
            labels.push(step.account.clone());
        }

        let result = apply(&mut engine, &bank, step);
        if let Err(err) = &result {
            tracing::debug!("Step {:?} at tick {} rejected: {}", step.action, step.tick, err);
        }
        outcomes.push(StepOutcome {
            tick: step.tick,
            account: step.account.clone(),
            action: step.action,
            ok: result.is_ok(),
            paid: result.as_ref().copied().unwrap_or_default(),
            error: result.err().map(|err| err.to_string()),
        });
    }

    let end_tick = scenario
        .end_tick
        .or_else(|| scenario.steps.last().map(|step| step.tick))
        .unwrap_or_default();
    ticks.set(end_tick);

    let mut pools = Vec::new();
    let mut accounts = Vec::new();
    for pool_id in store.pool_ids()? {
        pools.push(PoolReport {
            pool: pool_id.0,
            indicators: engine.pool_indicators(pool_id)?,
        });
        for label in &labels {
            if let Ok(indicators) = engine.account_indicators(pool_id, AccountId::from_label(label)) {
                accounts.push(AccountReport {
                    pool: pool_id.0,
                    account: label.clone(),
                    indicators,
                });
            }
        }
    }

    tracing::info!(
        "Replayed {} steps up to tick {} across {} pools",
        outcomes.len(),
        end_tick,
        pools.len()
    );

    Ok((
        Report {
            end_tick,
            steps: outcomes,
            pools,
            accounts,
        },
        store,
    ))
}

/// Run one step; returns the amount paid out to the account
fn apply(engine: &mut SimEngine, bank: &TokenBank, step: &Step) -> Result<Fixed> {
    let pool = PoolId(step.pool);
    let account = AccountId::from_label(&step.account);
    let amount = step.amount;

    match step.action {
        StepAction::MintLp => bank.mint_lp(pool, &account, amount).map(|_| Fixed::ZERO),
        StepAction::StakeGovernance => {
            bank.mint_governance(&account, amount)?;
            bank.stake_governance(&account, amount).map(|_| Fixed::ZERO)
        }
        StepAction::Stake => engine.stake(pool, account, amount).map(|_| Fixed::ZERO),
        StepAction::Unstake => engine.unstake(pool, account, amount).map(|_| Fixed::ZERO),
        StepAction::Delegate => engine.delegate(pool, account, amount).map(|_| Fixed::ZERO),
        StepAction::Undelegate => engine.undelegate(pool, account, amount).map(|_| Fixed::ZERO),
        StepAction::Claim => engine.claim_rewards(pool, account),
        StepAction::Exit => engine.exit(pool, account).map(|receipt| receipt.rewards_paid),
        StepAction::SetRate => engine.set_rewards_per_tick(pool, amount).map(|_| Fixed::ZERO),
        StepAction::Cooldown => bank.start_cooldown(&account, amount, step.tick).map(|_| Fixed::ZERO),
        StepAction::Withdraw => bank.withdraw(&account, step.tick).map(|_| Fixed::ZERO),
    }
}
