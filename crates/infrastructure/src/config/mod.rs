//! Agent configuration: structs, parsing, and validation.
//!
//! - `common`: `ConfigError` and shared validation helpers
//! - `admission`: sketch, window, volume, probing and quota sections

mod admission;
mod common;

pub use admission::{
    ProbingConfig, QuotaConfig, QuotaResetConfig, QuotaResetTrigger, SketchConfig, VolumeConfig,
    WindowConfig,
};
pub use common::ConfigError;

use std::path::Path;

use domain::admission::entity::AdmissionConfig;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_CHUNK_WIDTH};
use common::{MAX_CHANNEL_CAPACITY, MAX_CHUNK_WIDTH, check_limit, invalid, warn_if_world_writable};

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentInfo,

    #[serde(default)]
    pub sketch: SketchConfig,

    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub volume: VolumeConfig,

    #[serde(default)]
    pub probing: ProbingConfig,

    #[serde(default)]
    pub quota: QuotaConfig,
}

impl AgentConfig {
    /// Load config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        warn_if_world_writable(path, "config file");
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config after deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let width = self.agent.chunk_width;
        if width < 4 || width % 4 != 0 {
            return Err(invalid(
                "agent.chunk_width",
                format!("{width} must be a multiple of 4 and at least 4"),
            ));
        }
        check_limit("agent.chunk_width", width, MAX_CHUNK_WIDTH)?;

        if self.agent.channel_capacity == 0 {
            return Err(invalid("agent.channel_capacity", "must be greater than 0"));
        }
        check_limit(
            "agent.channel_capacity",
            self.agent.channel_capacity,
            MAX_CHANNEL_CAPACITY,
        )?;

        self.sketch.validate()?;
        self.window.validate()?;
        if self.volume.threshold_bytes == 0 {
            return Err(invalid("volume.threshold_bytes", "must be greater than 0"));
        }
        self.probing.validate(self.sketch.counter_bits)?;
        self.quota.validate()?;

        // Cross-section checks (hash coefficients vs. depth) live in the domain
        self.admission_config()?;
        Ok(())
    }

    /// Build the domain admission configuration.
    pub fn admission_config(&self) -> Result<AdmissionConfig, ConfigError> {
        let config = AdmissionConfig {
            sketch: self.sketch.to_params(),
            clear_budget: self.sketch.clear_budget,
            window: self.window.interval(),
            volume_threshold: self.volume.threshold_bytes,
            thresholds: self.probing.thresholds(),
            quota_size: self.quota.size,
            quota_reset: self.quota.reset.to_domain(),
        };
        config
            .validate()
            .map_err(|e| invalid("admission", e.to_string()))?;
        Ok(config)
    }
}

// ── Agent info ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentInfo {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Link transfer unit in bytes.
    #[serde(default = "default_chunk_width")]
    pub chunk_width: usize,

    /// Frames buffered between pipeline stages.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for AgentInfo {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            chunk_width: default_chunk_width(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}
fn default_log_format() -> LogFormat {
    LogFormat::Json
}
fn default_chunk_width() -> usize {
    DEFAULT_CHUNK_WIDTH
}
fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

// ── Log level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!(
                "invalid log level '{s}': expected error|warn|info|debug|trace"
            )),
        }
    }
}

// ── Log format ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            _ => Err(format!("invalid log format '{s}': expected json|text")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use domain::admission::entity::{QuotaReset, WindowInterval};

    // ── Minimal config loading ────────────────────────────────────

    #[test]
    fn empty_document_uses_defaults() {
        let config = AgentConfig::from_yaml("{}").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.agent.log_level, LogLevel::Info);
        assert_eq!(config.agent.chunk_width, DEFAULT_CHUNK_WIDTH);

        let admission = config.admission_config().unwrap();
        assert_eq!(admission, AdmissionConfig::default());
    }

    #[test]
    fn load_full_config() {
        let yaml = r"
agent:
  log_level: debug
  log_format: text
  chunk_width: 32
  channel_capacity: 16
sketch:
  depth: 2
  width: 1024
  counter_bits: 16
  clear_budget: 4
  hash_params:
    - { a: 3, b: 7 }
    - { a: 11, b: 13 }
window:
  millis: 500
volume:
  threshold_bytes: 2500000
probing:
  src_dst_threshold: 200
  dst_port_threshold: 300
  src_len_threshold: 400
quota:
  size: 16
  reset:
    packets: 128
";
        let config = AgentConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.agent.log_level, LogLevel::Debug);
        assert_eq!(config.agent.log_format, LogFormat::Text);
        assert_eq!(config.agent.channel_capacity, 16);

        let admission = config.admission_config().unwrap();
        assert_eq!(admission.sketch.depth, 2);
        assert_eq!(admission.sketch.hash_params.len(), 2);
        assert_eq!(admission.clear_budget, 4);
        assert_eq!(admission.window, WindowInterval::Nanos(500_000_000));
        assert_eq!(admission.volume_threshold, 2_500_000);
        assert_eq!(admission.thresholds.dst_port, 300);
        assert_eq!(admission.quota_size, 16);
        assert_eq!(admission.quota_reset, QuotaReset::Packets(128));
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let err = AgentConfig::from_yaml("telemetry: {}").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn unknown_section_key_is_rejected() {
        assert!(AgentConfig::from_yaml("sketch: { rows: 4 }").is_err());
    }

    #[test]
    fn chunk_width_must_be_word_aligned() {
        let err = AgentConfig::from_yaml("agent: { chunk_width: 30 }").unwrap_err();
        assert!(err.to_string().contains("agent.chunk_width"));
    }

    #[test]
    fn zero_volume_threshold_rejected() {
        let err = AgentConfig::from_yaml("volume: { threshold_bytes: 0 }").unwrap_err();
        assert!(err.to_string().contains("volume.threshold_bytes"));
    }

    #[test]
    fn degenerate_hash_rejected_by_domain() {
        let yaml = r"
sketch:
  depth: 1
  hash_params:
    - { a: 4294967291, b: 1 }
";
        let err = AgentConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("admission"));
    }

    #[test]
    fn unreachable_threshold_rejected() {
        let yaml = r"
sketch: { counter_bits: 4 }
probing: { src_dst_threshold: 15, dst_port_threshold: 10, src_len_threshold: 10 }
";
        let err = AgentConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("probing.src_dst_threshold"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "quota: {{ size: 8, reset: external }}").unwrap();

        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.quota.size, 8);
        assert_eq!(config.quota.reset.to_domain(), QuotaReset::External);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AgentConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let config = AgentConfig::from_yaml("window: { packets: 100 }").unwrap();
        let yaml = serde_yaml_ng::to_string(&config).unwrap();
        assert_eq!(AgentConfig::from_yaml(&yaml).unwrap(), config);
    }

    // ── LogLevel / LogFormat ──────────────────────────────────────

    #[test]
    fn log_level_from_str() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
