//! # Powerup Storage
//!
//! Shared adapters the reward engine is wired to outside of tests.
//!
//! ## Layout
//!
//! - `position_db/` - pool and position records behind a shared lock, with
//!   `bincode` snapshots
//! - `bank/` - LP custody, governance staking with cooldown, reward treasury

pub mod bank;

pub mod position_db {
    //! Pool and position persistence

    use crate::StorageError;
    use parking_lot::RwLock;
    use powerup_core::prelude::*;
    use powerup_economics::{AccountPoolPosition, MemoryStore, Pool, PositionChange, PositionStore, WriteBatch};
    use serde::{Deserialize, Serialize};
    use std::path::Path;
    use std::sync::Arc;

    /// Snapshot format version
    pub const SNAPSHOT_VERSION: u32 = 1;

    /// Every persisted record at one instant
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Snapshot {
        pub version: u32,
        pub pools: Vec<Pool>,
        pub positions: Vec<AccountPoolPosition>,
    }

    /// Cloneable handle to one record set; commits are serialised by the lock
    #[derive(Clone, Default)]
    pub struct SharedStore {
        records: Arc<RwLock<MemoryStore>>,
    }

    impl SharedStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn position_count(&self) -> usize {
            self.records.read().position_count()
        }

        /// Copy every record out under one read lock
        pub fn snapshot(&self) -> Result<Snapshot> {
            let records = self.records.read();
            let pools = records
                .pool_ids()?
                .into_iter()
                .map(|id| records.pool(id))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect::<Vec<_>>();
            let mut positions = Vec::new();
            for pool in &pools {
                positions.extend(records.positions(pool.pool_id)?);
            }
            Ok(Snapshot {
                version: SNAPSHOT_VERSION,
                pools,
                positions,
            })
        }

        /// Replace all records with the snapshot's
        pub fn restore(&self, snapshot: Snapshot) -> Result<()> {
            if snapshot.version != SNAPSHOT_VERSION {
                return Err(StorageError::UnsupportedVersion(snapshot.version).into());
            }

            let mut fresh = MemoryStore::new();
            let mut pools: hashbrown::HashMap<PoolId, Pool> =
                snapshot.pools.into_iter().map(|p| (p.pool_id, p)).collect();
            for position in snapshot.positions {
                let pool = pools
                    .get(&position.pool_id)
                    .cloned()
                    .ok_or(EngineError::PoolNotFound(position.pool_id))?;
                fresh.commit(WriteBatch {
                    pool,
                    position: Some(PositionChange::Upsert(position)),
                })?;
            }
            for (_, pool) in pools.drain() {
                fresh.commit(WriteBatch::pool_only(pool))?;
            }

            *self.records.write() = fresh;
            tracing::info!("Restored {} pools and {} positions", self.pool_ids()?.len(), self.position_count());
            Ok(())
        }

        pub fn encode(&self) -> Result<Vec<u8>> {
            let bytes = bincode::serialize(&self.snapshot()?).map_err(StorageError::from)?;
            Ok(bytes)
        }

        pub fn decode(&self, bytes: &[u8]) -> Result<()> {
            let snapshot: Snapshot = bincode::deserialize(bytes).map_err(StorageError::from)?;
            self.restore(snapshot)
        }

        /// Write a snapshot file
        pub fn save_to(&self, path: &Path) -> Result<()> {
            let bytes = self.encode()?;
            std::fs::write(path, &bytes).map_err(StorageError::from)?;
            tracing::debug!("Wrote {} byte snapshot to {}", bytes.len(), path.display());
            Ok(())
        }

        /// Replace all records with a snapshot file's
        pub fn load_from(&self, path: &Path) -> Result<()> {
            let bytes = std::fs::read(path).map_err(StorageError::from)?;
            self.decode(&bytes)
        }
    }

    impl PositionStore for SharedStore {
        fn pool(&self, pool: PoolId) -> Result<Option<Pool>> {
            self.records.read().pool(pool)
        }

        fn position(&self, key: &PositionKey) -> Result<Option<AccountPoolPosition>> {
            self.records.read().position(key)
        }

        fn commit(&mut self, batch: WriteBatch) -> Result<()> {
            self.records.write().commit(batch)
        }

        fn pool_ids(&self) -> Result<Vec<PoolId>> {
            self.records.read().pool_ids()
        }

        fn positions(&self, pool: PoolId) -> Result<Vec<AccountPoolPosition>> {
            self.records.read().positions(pool)
        }
    }

}

/// Storage failures
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

impl From<StorageError> for powerup_core::EngineError {
    fn from(err: StorageError) -> Self {
        powerup_core::EngineError::Storage(err.to_string())
    }
}

// Re-export for convenience
pub use bank::{BankConfig, BankError, TokenBank};
pub use position_db::{SharedStore, Snapshot, SNAPSHOT_VERSION};
