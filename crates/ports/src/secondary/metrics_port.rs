// Focused sub-traits for recording Prometheus metrics, grouped by concern.
//
// All methods take `&self` because the underlying implementation uses
// atomic operations (interior mutability via `prometheus-client`).
//
// Default implementations are no-ops, allowing test mocks to implement
// only the sub-traits relevant to the service under test.

// ── Packet classification metrics ──────────────────────────────────

pub trait PacketMetrics: Send + Sync {
    /// Record an admission decision (`forward` / `drop`).
    fn record_packet(&self, _action: &str) {}

    /// Record IPv4 bytes seen by the volume gate.
    fn record_bytes_observed(&self, _bytes: u64) {}

    /// Record a frame discarded before admission (`runt`, `malformed`, ...).
    fn record_frame_discarded(&self, _verdict: &str) {}
}

// ── Admission controller metrics ───────────────────────────────────

pub trait AdmissionMetrics: Send + Sync {
    /// Record a drop with its cause label.
    fn record_drop(&self, _cause: &str) {}

    /// Record completed sliding windows.
    fn record_window_ticks(&self, _count: u64) {}

    /// Set the current mode gauge (0 = learning, 1 = probing).
    fn set_mode(&self, _probing: bool) {}

    /// Set the remaining burst quota gauge.
    fn set_quota_remaining(&self, _quota: u64) {}
}

// ── Pipeline metrics ───────────────────────────────────────────────

pub trait PipelineMetrics: Send + Sync {
    /// Record chunks crossing the pipeline boundary (`in` / `out`).
    fn record_chunks(&self, _direction: &str, _count: u64) {}

    /// Observe the time a frame spent between its last chunk arriving
    /// and its decision, in seconds.
    fn observe_decision_latency(&self, _seconds: f64) {}
}

// ── Composite super-trait ──────────────────────────────────────────

/// Unified metrics port composing all sub-traits.
///
/// Services accept `Arc<dyn MetricsPort>` for full access.
pub trait MetricsPort: PacketMetrics + AdmissionMetrics + PipelineMetrics {}

/// Blanket implementation: any type implementing all sub-traits automatically
/// implements `MetricsPort`.
impl<T> MetricsPort for T where T: PacketMetrics + AdmissionMetrics + PipelineMetrics {}
