//! # Powerup Economics - Governance-Weighted Reward Accrual
//!
//! Liquidity providers stake LP tokens into pools and earn a per-tick reward
//! stream. Delegating governance tokens to a pool boosts an account's share
//! through a power-up multiplier.
//!
//! ## Key Features
//!
//! - **Power-up curve**: logarithmic boost from the delegated-to-LP ratio
//! - **Composite index**: O(1) settlement per action, whatever the pool size
//! - **Checkpoint before mutate**: every balance change settles first
//! - **All-or-nothing requests**: pool and position persist in one batch
//!
//! ## Request Flow
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ emission │──▶│  index   │──▶│  ledger  │──▶│  curve   │──▶│aggregate │
//! │ (accrue) │   │(advance) │   │ (settle) │   │(power-up)│   │ (delta)  │
//! └──────────┘   └──────────┘   └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! | Module | Role |
//! |--------|------|
//! | `curve` | power-up from balances |
//! | `emission` | reward emitted between ticks |
//! | `aggregate` | pool-wide weighted stake |
//! | `index` | reward per unit of weighted stake |
//! | `ledger` | per-account settlement and claim |
//! | `engine` | sequencing, validation, collaborator calls |

pub mod aggregate;
pub mod collaborators;
pub mod config;
pub mod curve;
pub mod emission;
pub mod engine;
pub mod index;
pub mod ledger;
pub mod state;
pub mod store;

// Re-exports
pub use collaborators::memory::{InMemoryGovernance, InMemoryLpLedger};
pub use collaborators::{available_to_delegate, GovernanceLedger, LpTokenLedger};
pub use config::{EconomicsConfig, PoolConfig};
pub use curve::{compute_power_up, CurveParams, LogCurve, PowerUpCurve};
pub use engine::{Receipt, RewardEngine};
pub use state::{AccountIndicators, AccountPoolPosition, Pool, PoolIndicators};
pub use store::{MemoryStore, PositionChange, PositionStore, WriteBatch};

/// Protocol constants
pub mod constants {
    use powerup_core::Fixed;

    /// Upper bound of every power-up
    pub const MAX_POWER_UP: Fixed = Fixed::from_units(3);

    /// Default power-up at zero delegation (0.4)
    pub const DEFAULT_VERTICAL_SHIFT: Fixed = Fixed::from_raw(400_000_000_000_000_000);

    /// Default offset added to the delegation ratio
    pub const DEFAULT_HORIZONTAL_SHIFT: Fixed = Fixed::ONE;

    /// Smallest non-zero staked LP balance
    pub const MIN_LP_STAKE: Fixed = Fixed::ONE;

    /// Smallest non-zero position weight (0.01); keeps the index rate bounded
    pub const MIN_POSITION_WEIGHT: Fixed = Fixed::from_raw(10_000_000_000_000_000);

    /// Largest emission rate a pool accepts
    pub const MAX_REWARDS_PER_TICK: Fixed = Fixed::from_units(1_000_000);
}

pub use constants::*;
