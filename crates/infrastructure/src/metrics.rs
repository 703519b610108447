use ports::secondary::metrics_port::{AdmissionMetrics, PacketMetrics, PipelineMetrics};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets_range};
use prometheus_client::registry::Registry;

use crate::constants::METRICS_PREFIX;

// ── Label types ─────────────────────────────────────────────────────

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ActionLabels {
    pub action: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CauseLabels {
    pub cause: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct VerdictLabels {
    pub verdict: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DirectionLabels {
    pub direction: String,
}

// ── Agent metrics registry ──────────────────────────────────────────

/// Prometheus metrics registry for the agent.
///
/// Recording only needs `&self`; share it behind an `Arc`.
pub struct AgentMetrics {
    registry: Registry,
    pub packets_total: Family<ActionLabels, Counter>,
    pub drops_total: Family<CauseLabels, Counter>,
    pub frames_discarded_total: Family<VerdictLabels, Counter>,
    pub bytes_observed_total: Counter,
    pub window_ticks_total: Counter,
    pub probing_mode: Gauge,
    pub quota_remaining: Gauge,
    pub chunks_total: Family<DirectionLabels, Counter>,
    pub decision_latency: Histogram,
}

impl AgentMetrics {
    /// Create a registry with every metric registered under the
    /// `floodgate` prefix.
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix(METRICS_PREFIX);

        let packets_total = Family::<ActionLabels, Counter>::default();
        registry.register(
            "packets",
            "Classified packets by admission action",
            packets_total.clone(),
        );

        let drops_total = Family::<CauseLabels, Counter>::default();
        registry.register(
            "drops",
            "Dropped packets by cause",
            drops_total.clone(),
        );

        let frames_discarded_total = Family::<VerdictLabels, Counter>::default();
        registry.register(
            "frames_discarded",
            "Frames that never produced a feature vector, by parse verdict",
            frames_discarded_total.clone(),
        );

        let bytes_observed_total = Counter::default();
        registry.register(
            "bytes_observed",
            "IPv4 total-length bytes fed to the volume gate",
            bytes_observed_total.clone(),
        );

        let window_ticks_total = Counter::default();
        registry.register(
            "window_ticks",
            "Sliding window boundaries crossed",
            window_ticks_total.clone(),
        );

        let probing_mode = Gauge::default();
        registry.register(
            "probing_mode",
            "Admission mode (0=learning, 1=probing)",
            probing_mode.clone(),
        );

        let quota_remaining = Gauge::default();
        registry.register(
            "quota_remaining",
            "Packets still allowed in the current probing burst",
            quota_remaining.clone(),
        );

        let chunks_total = Family::<DirectionLabels, Counter>::default();
        registry.register(
            "chunks",
            "Link chunks entering and leaving the pipeline",
            chunks_total.clone(),
        );

        // 1us to 100ms, 12 buckets
        let decision_latency = Histogram::new(exponential_buckets_range(0.000_001, 0.1, 12));
        registry.register(
            "decision_latency_seconds",
            "Time from frame completion to admission decision",
            decision_latency.clone(),
        );

        Self {
            registry,
            packets_total,
            drops_total,
            frames_discarded_total,
            bytes_observed_total,
            window_ticks_total,
            probing_mode,
            quota_remaining,
            chunks_total,
            decision_latency,
        }
    }

    /// Encode all registered metrics to `OpenMetrics` text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// ── Sub-trait implementations ──────────────────────────────────────

impl PacketMetrics for AgentMetrics {
    fn record_packet(&self, action: &str) {
        self.packets_total
            .get_or_create(&ActionLabels {
                action: action.to_string(),
            })
            .inc();
    }

    fn record_bytes_observed(&self, bytes: u64) {
        self.bytes_observed_total.inc_by(bytes);
    }

    fn record_frame_discarded(&self, verdict: &str) {
        self.frames_discarded_total
            .get_or_create(&VerdictLabels {
                verdict: verdict.to_string(),
            })
            .inc();
    }
}

impl AdmissionMetrics for AgentMetrics {
    fn record_drop(&self, cause: &str) {
        self.drops_total
            .get_or_create(&CauseLabels {
                cause: cause.to_string(),
            })
            .inc();
    }

    fn record_window_ticks(&self, count: u64) {
        self.window_ticks_total.inc_by(count);
    }

    fn set_mode(&self, probing: bool) {
        self.probing_mode.set(i64::from(probing));
    }

    fn set_quota_remaining(&self, quota: u64) {
        self.quota_remaining
            .set(quota.try_into().unwrap_or(i64::MAX));
    }
}

impl PipelineMetrics for AgentMetrics {
    fn record_chunks(&self, direction: &str, count: u64) {
        self.chunks_total
            .get_or_create(&DirectionLabels {
                direction: direction.to_string(),
            })
            .inc_by(count);
    }

    fn observe_decision_latency(&self, seconds: f64) {
        self.decision_latency.observe(seconds);
    }
}
