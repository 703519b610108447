use serde::{Deserialize, Serialize};

use crate::packet::entity::FeatureVector;
use crate::packet::error::ParseVerdict;
use crate::sketch::entity::{SketchKey, SketchParams};

use super::error::AdmissionError;

// ── Mode ────────────────────────────────────────────────────────────

/// Detection sensitivity, driven by the volume gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Traffic volume is normal: admit everything, keep learning.
    #[default]
    Learning,
    /// Traffic volume is elevated: enforce per-key thresholds and quota.
    Probing,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Learning => "learning",
            Self::Probing => "probing",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// What advances the sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowInterval {
    /// Tick after this many classified packets.
    Packets(u64),
    /// Tick when packet timestamps cross a window of this many nanoseconds.
    Nanos(u64),
}

/// What refills the PROBING burst quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaReset {
    /// Every window tick.
    Window,
    /// After this many PROBING decisions.
    Packets(u64),
    /// Only on an explicit `reset_quota()` call.
    External,
}

/// Per-key PROBING thresholds. A key is a heavy hitter when its
/// estimate is strictly greater than the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbingThresholds {
    pub src_dst: u32,
    pub dst_port: u32,
    pub src_len: u32,
}

impl Default for ProbingThresholds {
    fn default() -> Self {
        Self {
            src_dst: 1000,
            dst_port: 1000,
            src_len: 1000,
        }
    }
}

impl ProbingThresholds {
    pub fn get(&self, kind: KeyKind) -> u32 {
        match kind {
            KeyKind::SrcDst => self.src_dst,
            KeyKind::DstPort => self.dst_port,
            KeyKind::SrcLen => self.src_len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionConfig {
    pub sketch: SketchParams,
    /// Cells of the CLEARING slot zeroed per insert.
    pub clear_budget: usize,
    pub window: WindowInterval,
    /// Bytes per window above which the next window runs in PROBING.
    pub volume_threshold: u64,
    pub thresholds: ProbingThresholds,
    pub quota_size: u32,
    pub quota_reset: QuotaReset,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            sketch: SketchParams::default(),
            clear_budget: 8,
            window: WindowInterval::Packets(65_536),
            volume_threshold: 100_000,
            thresholds: ProbingThresholds::default(),
            quota_size: 64,
            quota_reset: QuotaReset::Window,
        }
    }
}

impl AdmissionConfig {
    pub fn validate(&self) -> Result<(), AdmissionError> {
        self.sketch.validate()?;

        let zero = |cond: bool, field: &'static str| {
            if cond {
                Err(AdmissionError::ZeroValue { field })
            } else {
                Ok(())
            }
        };
        zero(self.clear_budget == 0, "clear budget")?;
        zero(
            matches!(
                self.window,
                WindowInterval::Packets(0) | WindowInterval::Nanos(0)
            ),
            "window interval",
        )?;
        zero(self.volume_threshold == 0, "volume threshold")?;
        zero(self.quota_size == 0, "quota size")?;
        zero(
            matches!(self.quota_reset, QuotaReset::Packets(0)),
            "quota reset packets",
        )?;

        let max = self.sketch.counter_max();
        for kind in KeyKind::ALL {
            let threshold = self.thresholds.get(kind);
            zero(threshold == 0, kind.threshold_field())?;
            if threshold >= max {
                return Err(AdmissionError::UnreachableThreshold {
                    field: kind.threshold_field(),
                    threshold,
                    max,
                });
            }
        }
        Ok(())
    }
}

// ── Keys ────────────────────────────────────────────────────────────

/// The three tracked key tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// (source IP, destination IP)
    SrcDst,
    /// (destination IP, destination port)
    DstPort,
    /// (source IP, total length)
    SrcLen,
}

impl KeyKind {
    pub const ALL: [Self; 3] = [Self::SrcDst, Self::DstPort, Self::SrcLen];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SrcDst => "src_dst",
            Self::DstPort => "dst_port",
            Self::SrcLen => "src_len",
        }
    }

    fn threshold_field(self) -> &'static str {
        match self {
            Self::SrcDst => "src_dst threshold",
            Self::DstPort => "dst_port threshold",
            Self::SrcLen => "src_len threshold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowKeys {
    pub src_dst: SketchKey,
    pub dst_port: SketchKey,
    pub src_len: SketchKey,
}

impl FlowKeys {
    pub fn from_features(fv: &FeatureVector) -> Self {
        let src = u32::from(fv.source);
        let dst = u32::from(fv.destination);
        Self {
            src_dst: SketchKey::pack(src, dst),
            dst_port: SketchKey::pack(dst, u32::from(fv.destination_port)),
            src_len: SketchKey::pack(src, u32::from(fv.total_length)),
        }
    }
}

/// Sliding-window estimates for one packet's keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Estimates {
    pub src_dst: u32,
    pub dst_port: u32,
    pub src_len: u32,
}

impl Estimates {
    pub fn get(&self, kind: KeyKind) -> u32 {
        match kind {
            KeyKind::SrcDst => self.src_dst,
            KeyKind::DstPort => self.dst_port,
            KeyKind::SrcLen => self.src_len,
        }
    }
}

// ── Decision ────────────────────────────────────────────────────────

/// Per-packet admission value: 0 drops, anything else forwards and
/// reports the burst quota still available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Decision(pub u32);

impl Decision {
    pub const DROP: Self = Self(0);

    pub fn is_forward(self) -> bool {
        self.0 > 0
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropCause {
    HeavyHitter(KeyKind),
    QuotaExhausted,
    Parse(ParseVerdict),
}

impl DropCause {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HeavyHitter(KeyKind::SrcDst) => "heavy_src_dst",
            Self::HeavyHitter(KeyKind::DstPort) => "heavy_dst_port",
            Self::HeavyHitter(KeyKind::SrcLen) => "heavy_src_len",
            Self::QuotaExhausted => "quota_exhausted",
            Self::Parse(v) => v.as_str(),
        }
    }
}

impl std::fmt::Display for DropCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the controller decided about one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdmissionOutcome {
    pub decision: Decision,
    pub mode: Mode,
    pub cause: Option<DropCause>,
    /// `None` for frames that never reached the sketches.
    pub estimates: Option<Estimates>,
    /// Window ticks performed while handling this packet.
    pub ticks: u64,
    pub mode_changed: bool,
}

impl AdmissionOutcome {
    pub fn is_forward(&self) -> bool {
        self.decision.is_forward()
    }
}

// ── Statistics ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionStats {
    pub packets_classified: u64,
    pub packets_forwarded: u64,
    pub dropped_heavy_src_dst: u64,
    pub dropped_heavy_dst_port: u64,
    pub dropped_heavy_src_len: u64,
    pub dropped_quota_exhausted: u64,
    pub discarded_malformed: u64,
    pub discarded_runt: u64,
    pub discarded_unsupported: u64,
    pub bytes_observed: u64,
    pub window_ticks: u64,
    pub mode_switches: u64,
    pub counter_saturations: u64,
    pub mode: Mode,
}

impl AdmissionStats {
    pub fn packets_dropped(&self) -> u64 {
        self.dropped_heavy_src_dst
            + self.dropped_heavy_dst_port
            + self.dropped_heavy_src_len
            + self.dropped_quota_exhausted
    }

    pub fn frames_discarded(&self) -> u64 {
        self.discarded_malformed + self.discarded_runt + self.discarded_unsupported
    }

    pub(crate) fn record_drop(&mut self, cause: DropCause) {
        match cause {
            DropCause::HeavyHitter(KeyKind::SrcDst) => self.dropped_heavy_src_dst += 1,
            DropCause::HeavyHitter(KeyKind::DstPort) => self.dropped_heavy_dst_port += 1,
            DropCause::HeavyHitter(KeyKind::SrcLen) => self.dropped_heavy_src_len += 1,
            DropCause::QuotaExhausted => self.dropped_quota_exhausted += 1,
            DropCause::Parse(ParseVerdict::Runt) => self.discarded_runt += 1,
            DropCause::Parse(ParseVerdict::UnsupportedNextHeader) => {
                self.discarded_unsupported += 1;
            }
            DropCause::Parse(ParseVerdict::Malformed | ParseVerdict::Ok) => {
                self.discarded_malformed += 1;
            }
        }
    }
}
