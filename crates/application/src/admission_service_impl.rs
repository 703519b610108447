use std::sync::Arc;

use domain::admission::engine::AdmissionController;
use domain::admission::entity::{AdmissionOutcome, AdmissionStats, Mode};
use domain::packet::entity::FeatureVector;
use domain::packet::error::PacketError;
use ports::secondary::metrics_port::MetricsPort;

/// Application-level admission service.
///
/// Wraps the `AdmissionController` with metrics and structured logging.
/// Owned by the decide stage of the packet pipeline, so it needs no lock.
pub struct AdmissionAppService {
    controller: AdmissionController,
    metrics: Arc<dyn MetricsPort>,
}

impl AdmissionAppService {
    pub fn new(controller: AdmissionController, metrics: Arc<dyn MetricsPort>) -> Self {
        metrics.set_mode(controller.mode() == Mode::Probing);
        metrics.set_quota_remaining(u64::from(controller.quota()));
        Self {
            controller,
            metrics,
        }
    }

    /// Decide on a well-formed packet.
    pub fn admit(&mut self, features: &FeatureVector, now_ns: u64) -> AdmissionOutcome {
        let outcome = self.controller.process(features, now_ns);

        self.metrics.record_bytes_observed(u64::from(features.total_length));
        if outcome.ticks > 0 {
            self.metrics.record_window_ticks(outcome.ticks);
            tracing::debug!(
                ticks = outcome.ticks,
                total_ticks = self.controller.stats().window_ticks,
                "sliding window advanced"
            );
        }

        if outcome.mode_changed {
            self.metrics.set_mode(outcome.mode == Mode::Probing);
            let volume = self.controller.volume();
            tracing::info!(
                mode = %outcome.mode,
                threshold_bytes = volume.threshold(),
                "admission mode changed"
            );
        }

        match outcome.cause {
            None => self.metrics.record_packet("forward"),
            Some(cause) => {
                self.metrics.record_packet("drop");
                self.metrics.record_drop(cause.as_str());
                tracing::trace!(
                    src_ip = %features.source,
                    dst_ip = %features.destination,
                    dst_port = features.destination_port,
                    length = features.total_length,
                    cause = %cause,
                    "packet dropped"
                );
            }
        }
        self.metrics
            .set_quota_remaining(u64::from(self.controller.quota()));

        outcome
    }

    /// Record a frame that never became a feature vector.
    pub fn reject(&mut self, err: &PacketError) -> AdmissionOutcome {
        let outcome = self.controller.discard(err);
        self.metrics.record_packet("drop");
        self.metrics.record_frame_discarded(err.verdict().as_str());
        tracing::debug!(error = %err, "frame discarded");
        outcome
    }

    /// Close the current sliding window.
    pub fn tick(&mut self) {
        self.controller.tick();
        self.metrics.record_window_ticks(1);
        self.metrics
            .set_quota_remaining(u64::from(self.controller.quota()));
    }

    /// Refill the PROBING burst quota (external burst boundary).
    pub fn reset_quota(&mut self) {
        self.controller.reset_quota();
        self.metrics
            .set_quota_remaining(u64::from(self.controller.quota()));
        tracing::debug!(quota = self.controller.quota(), "burst quota reset");
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn stats(&self) -> AdmissionStats {
        self.controller.stats()
    }

    pub fn controller(&self) -> &AdmissionController {
        &self.controller
    }
}
