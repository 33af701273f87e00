//! # Powerup Core
//!
//! Building blocks shared by every Powerup crate:
//! - `Fixed` - 18-decimal unsigned fixed-point numbers with 256-bit intermediates
//! - `AccountId` / `PoolId` / `PositionKey` - record identifiers
//! - `TickSource` - the host's monotonic progress counter
//! - `EngineError` - the single error type of the reward engine

pub mod clock;
pub mod error;
pub mod fixed;
pub mod types;

pub use clock::*;
pub use error::*;
pub use fixed::{mul_div, Fixed, DECIMALS, SCALE};
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::{ManualTicks, TickSource};
    pub use crate::error::{EngineError, Result};
    pub use crate::fixed::{Fixed, SCALE};
    pub use crate::types::*;
}
