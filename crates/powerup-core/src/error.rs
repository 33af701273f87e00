//! Error types for Powerup engine operations

use crate::fixed::Fixed;
use crate::types::{AccountId, PoolId, Tick};
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while settling or mutating reward state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    // === Environment ===
    /// Tick counter moved backwards
    #[error("Invalid tick: current {current} is before last checkpoint {last}")]
    InvalidTick { current: Tick, last: Tick },

    // === User Errors ===
    /// Unstake or undelegate larger than the held balance
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Fixed, available: Fixed },

    /// Claim with no pending rewards
    #[error("Nothing to claim")]
    NothingToClaim,

    /// Mutation with a zero amount
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// Position left with a dust balance or weight
    #[error("{what} {value} is below the minimum {minimum}")]
    BelowMinimum {
        what: &'static str,
        value: Fixed,
        minimum: Fixed,
    },

    /// Malformed decimal amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// No position exists for the account in this pool
    #[error("No position for account {account} in {pool}")]
    PositionNotFound { pool: PoolId, account: AccountId },

    // === Arithmetic ===
    /// Aggregate tracker would go negative
    #[error("Aggregate power-up underflow")]
    Underflow,

    /// Fixed-point result does not fit in 128 bits
    #[error("Math overflow")]
    Overflow,

    /// Fixed-point division by zero
    #[error("Division by zero")]
    DivisionByZero,

    // === Configuration ===
    /// Pool not configured
    #[error("Pool not found: {0}")]
    PoolNotFound(PoolId),

    /// Pool already configured
    #[error("Pool already exists: {0}")]
    PoolExists(PoolId),

    // === Collaborators ===
    /// Token ledger rejected a transfer or delegation
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Record store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Numeric error code for API responses
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidTick { .. } => 1001,
            Self::InsufficientBalance { .. } => 1002,
            Self::NothingToClaim => 1003,
            Self::ZeroAmount | Self::InvalidAmount(_) | Self::BelowMinimum { .. } => 1004,
            Self::PositionNotFound { .. } => 1005,
            Self::PoolNotFound(_) | Self::PoolExists(_) => 1006,
            Self::Ledger(_) => 1007,
            Self::Underflow | Self::Overflow | Self::DivisionByZero => 2001,
            Self::Storage(_) => 2002,
        }
    }

    /// Check if the caller can succeed by retrying with different input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::NothingToClaim
                | Self::ZeroAmount
                | Self::InvalidAmount(_)
                | Self::BelowMinimum { .. }
                | Self::PositionNotFound { .. }
                | Self::Ledger(_)
        )
    }

    /// Errors that only a buggy caller or a broken invariant can produce
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::Underflow | Self::InvalidTick { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = EngineError::InvalidTick { current: 3, last: 5 };
        assert_eq!(err.code(), 1001);
        assert_eq!(EngineError::NothingToClaim.code(), 1003);
        assert_eq!(EngineError::Underflow.code(), 2001);
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::InsufficientBalance {
            requested: Fixed::from_units(5),
            available: Fixed::from_units(2),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Insufficient balance"));
        assert!(msg.contains("requested 5"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(EngineError::ZeroAmount.is_recoverable());
        assert!(EngineError::NothingToClaim.is_recoverable());
        let dust = EngineError::BelowMinimum {
            what: "LP balance",
            value: Fixed::from_raw(3),
            minimum: Fixed::from_units(1),
        };
        assert!(dust.is_recoverable());
        assert_eq!(dust.code(), 1004);
        assert!(!EngineError::Underflow.is_recoverable());
        assert!(!EngineError::InvalidTick { current: 0, last: 1 }.is_recoverable());
        assert!(EngineError::Underflow.is_invariant_violation());
    }
}
