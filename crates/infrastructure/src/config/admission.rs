//! Sketch, window, volume, probing and quota sections.

use domain::admission::entity::{ProbingThresholds, QuotaReset, WindowInterval};
use domain::sketch::entity::{HashParams, MAX_DEPTH, SketchParams, counter_max};
use serde::{Deserialize, Serialize};

use super::common::{ConfigError, MAX_SKETCH_WIDTH, check_limit, check_nonzero, invalid};

// ── Sketch ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SketchConfig {
    /// Rows per sketch instance.
    #[serde(default = "default_depth")]
    pub depth: usize,

    /// Cells per row. Must be a power of two.
    #[serde(default = "default_width")]
    pub width: usize,

    #[serde(default = "default_counter_bits")]
    pub counter_bits: u8,

    /// Cells of the standby sketch zeroed per insert.
    #[serde(default = "default_clear_budget")]
    pub clear_budget: usize,

    /// Explicit per-row `(a, b)` hash coefficients. Empty selects the
    /// built-in table.
    #[serde(default)]
    pub hash_params: Vec<HashParams>,
}

fn default_depth() -> usize {
    4
}
fn default_width() -> usize {
    16_384
}
fn default_counter_bits() -> u8 {
    32
}
fn default_clear_budget() -> usize {
    8
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            width: default_width(),
            counter_bits: default_counter_bits(),
            clear_budget: default_clear_budget(),
            hash_params: Vec::new(),
        }
    }
}

impl SketchConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        check_nonzero("sketch.depth", self.depth as u64)?;
        check_limit("sketch.depth", self.depth, MAX_DEPTH)?;
        check_limit("sketch.width", self.width, MAX_SKETCH_WIDTH)?;
        if !self.width.is_power_of_two() {
            return Err(invalid(
                "sketch.width",
                format!("{} is not a power of two", self.width),
            ));
        }
        if !(1..=32).contains(&self.counter_bits) {
            return Err(invalid(
                "sketch.counter_bits",
                format!("{} is outside 1..=32", self.counter_bits),
            ));
        }
        check_nonzero("sketch.clear_budget", self.clear_budget as u64)?;
        if !self.hash_params.is_empty() && self.hash_params.len() != self.depth {
            return Err(invalid(
                "sketch.hash_params",
                format!(
                    "expected {} coefficient pairs (one per row), got {}",
                    self.depth,
                    self.hash_params.len()
                ),
            ));
        }
        Ok(())
    }

    pub(super) fn to_params(&self) -> SketchParams {
        SketchParams {
            depth: self.depth,
            width: self.width,
            counter_bits: self.counter_bits,
            hash_params: self.hash_params.clone(),
        }
    }
}

// ── Window ─────────────────────────────────────────────────────────

/// Sliding-window length. Exactly one of `packets` / `millis` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub millis: Option<u64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            packets: Some(65_536),
            millis: None,
        }
    }
}

impl WindowConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        match (self.packets, self.millis) {
            (Some(n), None) => check_nonzero("window.packets", n),
            (None, Some(ms)) => check_nonzero("window.millis", ms),
            _ => Err(invalid(
                "window",
                "exactly one of 'packets' or 'millis' must be set",
            )),
        }
    }

    pub fn interval(&self) -> WindowInterval {
        match (self.packets, self.millis) {
            (_, Some(ms)) => WindowInterval::Nanos(ms.saturating_mul(1_000_000)),
            (Some(n), None) => WindowInterval::Packets(n),
            (None, None) => WindowInterval::Packets(65_536),
        }
    }
}

// ── Volume ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeConfig {
    /// Bytes per window above which the next window runs in PROBING.
    #[serde(default = "default_threshold_bytes")]
    pub threshold_bytes: u64,
}

fn default_threshold_bytes() -> u64 {
    100_000
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: default_threshold_bytes(),
        }
    }
}

// ── Probing ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbingConfig {
    #[serde(default = "default_key_threshold")]
    pub src_dst_threshold: u32,

    #[serde(default = "default_key_threshold")]
    pub dst_port_threshold: u32,

    #[serde(default = "default_key_threshold")]
    pub src_len_threshold: u32,
}

fn default_key_threshold() -> u32 {
    1000
}

impl Default for ProbingConfig {
    fn default() -> Self {
        Self {
            src_dst_threshold: default_key_threshold(),
            dst_port_threshold: default_key_threshold(),
            src_len_threshold: default_key_threshold(),
        }
    }
}

impl ProbingConfig {
    pub(super) fn validate(&self, counter_bits: u8) -> Result<(), ConfigError> {
        let max = counter_max(counter_bits);
        for (field, value) in [
            ("probing.src_dst_threshold", self.src_dst_threshold),
            ("probing.dst_port_threshold", self.dst_port_threshold),
            ("probing.src_len_threshold", self.src_len_threshold),
        ] {
            check_nonzero(field, u64::from(value))?;
            if value >= max {
                return Err(invalid(
                    field,
                    format!("{value} is unreachable with {counter_bits}-bit counters (max {max})"),
                ));
            }
        }
        Ok(())
    }

    pub(super) fn thresholds(&self) -> ProbingThresholds {
        ProbingThresholds {
            src_dst: self.src_dst_threshold,
            dst_port: self.dst_port_threshold,
            src_len: self.src_len_threshold,
        }
    }
}

// ── Quota ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Packets allowed through per PROBING burst.
    #[serde(default = "default_quota_size")]
    pub size: u32,

    #[serde(default)]
    pub reset: QuotaResetConfig,
}

fn default_quota_size() -> u32 {
    64
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            size: default_quota_size(),
            reset: QuotaResetConfig::default(),
        }
    }
}

impl QuotaConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        check_nonzero("quota.size", u64::from(self.size))?;
        if let QuotaResetConfig::Packets { packets } = self.reset {
            check_nonzero("quota.reset.packets", packets)?;
        }
        Ok(())
    }
}

/// `window`, `external`, or `{ packets: N }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuotaResetConfig {
    Named(QuotaResetTrigger),
    Packets { packets: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaResetTrigger {
    Window,
    External,
}

impl Default for QuotaResetConfig {
    fn default() -> Self {
        Self::Named(QuotaResetTrigger::Window)
    }
}

impl QuotaResetConfig {
    pub fn to_domain(self) -> QuotaReset {
        match self {
            Self::Named(QuotaResetTrigger::Window) => QuotaReset::Window,
            Self::Named(QuotaResetTrigger::External) => QuotaReset::External,
            Self::Packets { packets } => QuotaReset::Packets(packets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sketch_defaults_match_domain() {
        let params = SketchConfig::default().to_params();
        assert_eq!(params, SketchParams::default());
    }

    #[test]
    fn sketch_rejects_non_power_of_two() {
        let cfg = SketchConfig {
            width: 1000,
            ..SketchConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("sketch.width"));
    }

    #[test]
    fn sketch_rejects_depth_above_table() {
        let cfg = SketchConfig {
            depth: MAX_DEPTH + 1,
            ..SketchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn sketch_rejects_mismatched_hash_params() {
        let cfg = SketchConfig {
            depth: 2,
            hash_params: vec![HashParams::new(3, 5)],
            ..SketchConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("hash_params"));
    }

    #[test]
    fn window_needs_exactly_one_unit() {
        let both = WindowConfig {
            packets: Some(10),
            millis: Some(10),
        };
        assert!(both.validate().is_err());

        let neither = WindowConfig {
            packets: None,
            millis: None,
        };
        assert!(neither.validate().is_err());
    }

    #[test]
    fn window_millis_converts_to_nanos() {
        let cfg = WindowConfig {
            packets: None,
            millis: Some(250),
        };
        assert_eq!(cfg.interval(), WindowInterval::Nanos(250_000_000));
    }

    #[test]
    fn probing_threshold_must_be_reachable() {
        let cfg = ProbingConfig {
            src_dst_threshold: 200,
            dst_port_threshold: 255,
            src_len_threshold: 200,
        };
        let err = cfg.validate(8).unwrap_err();
        assert!(err.to_string().contains("probing.dst_port_threshold"));

        // defaults (1000) overflow 8-bit counters, first field reported
        let err = ProbingConfig::default().validate(8).unwrap_err();
        assert!(err.to_string().contains("probing.src_dst_threshold"));

        let ok = ProbingConfig {
            src_dst_threshold: 254,
            dst_port_threshold: 254,
            src_len_threshold: 254,
        };
        assert!(ok.validate(8).is_ok());
    }

    #[test]
    fn quota_reset_forms() {
        let named: QuotaConfig = serde_yaml_ng::from_str("reset: external").unwrap();
        assert_eq!(named.reset.to_domain(), QuotaReset::External);
        assert_eq!(named.size, 64);

        let packets: QuotaConfig =
            serde_yaml_ng::from_str("size: 8\nreset:\n  packets: 32\n").unwrap();
        assert_eq!(packets.reset.to_domain(), QuotaReset::Packets(32));
        assert_eq!(packets.size, 8);
    }

    #[test]
    fn quota_rejects_zero_packet_reset() {
        let cfg = QuotaConfig {
            size: 4,
            reset: QuotaResetConfig::Packets { packets: 0 },
        };
        assert!(cfg.validate().is_err());
    }
}
