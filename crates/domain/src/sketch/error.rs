use thiserror::Error;

use crate::common::error::DomainError;

/// Construction-time sketch misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SketchError {
    #[error("sketch depth must be > 0")]
    ZeroDepth,

    #[error("sketch depth {depth} exceeds the maximum of {max}")]
    DepthTooLarge { depth: usize, max: usize },

    #[error("sketch width must be a power of two, got {width}")]
    WidthNotPowerOfTwo { width: usize },

    #[error("counter bit width must be in 1..=32, got {bits}")]
    CounterBits { bits: u8 },

    #[error("expected {expected} hash coefficient pairs (one per row), got {got}")]
    HashParamCount { expected: usize, got: usize },

    #[error("hash coefficient `a` of row {row} is 0 modulo the hash prime")]
    DegenerateHash { row: usize },

    #[error("clear budget must be > 0")]
    ZeroClearBudget,
}

impl From<SketchError> for DomainError {
    fn from(e: SketchError) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}
