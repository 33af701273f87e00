//! # Record Store
//!
//! The engine reads `Pool` and `AccountPoolPosition` records through
//! [`PositionStore`] and writes them back in one [`WriteBatch`] per request,
//! so a request either persists both records or neither.

use crate::state::{AccountPoolPosition, Pool};
use hashbrown::HashMap;
use powerup_core::prelude::*;

/// Change to a single position
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PositionChange {
    Upsert(AccountPoolPosition),
    Remove(PositionKey),
}

/// Everything one request writes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteBatch {
    pub pool: Pool,
    pub position: Option<PositionChange>,
}

impl WriteBatch {
    pub fn pool_only(pool: Pool) -> Self {
        Self { pool, position: None }
    }
}

/// Keyed storage for pools and positions
pub trait PositionStore {
    fn pool(&self, pool: PoolId) -> Result<Option<Pool>>;

    fn position(&self, key: &PositionKey) -> Result<Option<AccountPoolPosition>>;

    /// Apply a batch atomically
    fn commit(&mut self, batch: WriteBatch) -> Result<()>;

    /// Configured pool ids, ascending
    fn pool_ids(&self) -> Result<Vec<PoolId>>;

    /// All positions of a pool. Reporting only; settlement never scans.
    fn positions(&self, pool: PoolId) -> Result<Vec<AccountPoolPosition>>;
}

/// Plain in-process store
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pools: HashMap<PoolId, Pool>,
    positions: HashMap<PositionKey, AccountPoolPosition>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }
}

impl PositionStore for MemoryStore {
    fn pool(&self, pool: PoolId) -> Result<Option<Pool>> {
        Ok(self.pools.get(&pool).cloned())
    }

    fn position(&self, key: &PositionKey) -> Result<Option<AccountPoolPosition>> {
        Ok(self.positions.get(key).cloned())
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        match batch.position {
            Some(PositionChange::Upsert(position)) => {
                self.positions.insert(position.key(), position);
            }
            Some(PositionChange::Remove(key)) => {
                self.positions.remove(&key);
            }
            None => {}
        }
        self.pools.insert(batch.pool.pool_id, batch.pool);
        Ok(())
    }

    fn pool_ids(&self) -> Result<Vec<PoolId>> {
        let mut ids: Vec<PoolId> = self.pools.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn positions(&self, pool: PoolId) -> Result<Vec<AccountPoolPosition>> {
        let mut found: Vec<AccountPoolPosition> = self
            .positions
            .values()
            .filter(|p| p.pool_id == pool)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.account);
        Ok(found)
    }
}
