//! Economics section of the engine configuration
//!
//! ```toml
//! [curve]
//! vertical_shift = "0.4"
//! horizontal_shift = "1"
//!
//! [[pools]]
//! id = 1
//! rewards_per_tick = "3"
//! ```

use crate::curve::CurveParams;
use powerup_core::fixed::decimal;
use powerup_core::prelude::*;
use serde::{Deserialize, Serialize};

/// One configured pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub id: u32,

    /// Reward emitted per tick, in whole tokens
    #[serde(with = "decimal")]
    pub rewards_per_tick: Fixed,
}

impl PoolConfig {
    pub fn pool_id(&self) -> PoolId {
        PoolId(self.id)
    }
}

/// Curve constants and pool list
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicsConfig {
    pub curve: CurveParams,
    pub pools: Vec<PoolConfig>,
}

impl EconomicsConfig {
    /// Check curve constants and reject duplicate pool ids
    pub fn validate(&self) -> Result<()> {
        self.curve.validate()?;
        let mut seen = Vec::with_capacity(self.pools.len());
        for pool in &self.pools {
            if seen.contains(&pool.id) {
                return Err(EngineError::PoolExists(pool.pool_id()));
            }
            seen.push(pool.id);
        }
        Ok(())
    }
}
