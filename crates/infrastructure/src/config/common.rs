//! Shared error type and validation helpers used across config sections.

use std::path::Path;

use domain::common::error::DomainError;
use tracing::warn;

// ── Limits ─────────────────────────────────────────────────────────

/// Largest accepted chunk width in bytes.
pub(super) const MAX_CHUNK_WIDTH: usize = 9216;
/// Largest accepted channel capacity between pipeline stages.
pub(super) const MAX_CHANNEL_CAPACITY: usize = 1 << 20;
/// Largest accepted sketch row width (cells).
pub(super) const MAX_SKETCH_WIDTH: usize = 1 << 24;

// ── Config errors ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("invalid value '{value}' for field '{field}': expected one of {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::Yaml(e.to_string())
    }
}

impl From<DomainError> for ConfigError {
    fn from(e: DomainError) -> Self {
        Self::Validation {
            field: "admission".to_string(),
            message: e.to_string(),
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────

pub(super) fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Reject zero for a field that counts something.
pub(super) fn check_nonzero(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be greater than 0"));
    }
    Ok(())
}

/// Enforce an inclusive upper bound.
pub(super) fn check_limit(field: &str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value > max {
        return Err(invalid(field, format!("{value} exceeds maximum {max}")));
    }
    Ok(())
}

/// Log a warning if a file is world-writable (Unix only).
#[cfg(unix)]
pub(super) fn warn_if_world_writable(path: &Path, label: &str) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o002 != 0 {
            warn!(
                path = %path.display(),
                mode = format!("{mode:04o}"),
                "{label} is world-writable, consider chmod 644 or stricter",
            );
        }
    }
}

#[cfg(not(unix))]
pub(super) fn warn_if_world_writable(_path: &Path, _label: &str) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_nonzero_rejects_zero() {
        let err = check_nonzero("quota.size", 0).unwrap_err();
        assert!(err.to_string().contains("quota.size"));
        assert!(check_nonzero("quota.size", 1).is_ok());
    }

    #[test]
    fn check_limit_is_inclusive() {
        assert!(check_limit("agent.chunk_width", 64, 64).is_ok());
        assert!(check_limit("agent.chunk_width", 65, 64).is_err());
    }

    #[test]
    fn domain_error_maps_to_validation() {
        let err: ConfigError = DomainError::InvalidConfig("bad width".to_string()).into();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "admission"));
    }

    #[test]
    fn yaml_error_is_stringified() {
        let err: ConfigError = serde_yaml_ng::from_str::<u32>("[").unwrap_err().into();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
