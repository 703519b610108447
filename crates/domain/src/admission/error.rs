use thiserror::Error;

use crate::common::error::DomainError;
use crate::sketch::error::SketchError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Sketch(#[from] SketchError),

    #[error("{field} must be > 0")]
    ZeroValue { field: &'static str },

    #[error("{field} = {threshold} can never be exceeded by a counter capped at {max}")]
    UnreachableThreshold {
        field: &'static str,
        threshold: u32,
        max: u32,
    },
}

impl From<AdmissionError> for DomainError {
    fn from(e: AdmissionError) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_value_message() {
        let e = AdmissionError::ZeroValue {
            field: "quota size",
        };
        assert_eq!(e.to_string(), "quota size must be > 0");
    }

    #[test]
    fn sketch_error_is_transparent() {
        let e: AdmissionError = SketchError::ZeroDepth.into();
        assert_eq!(e.to_string(), "sketch depth must be > 0");
        let d: DomainError = e.into();
        assert!(matches!(d, DomainError::InvalidConfig(_)));
    }
}
