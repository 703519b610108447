use crate::packet::entity::FeatureVector;
use crate::packet::error::PacketError;
use crate::sketch::rolling::RollingSketch;

use super::entity::{
    AdmissionConfig, AdmissionOutcome, AdmissionStats, Decision, DropCause, Estimates, FlowKeys,
    KeyKind, Mode, QuotaReset, WindowInterval,
};
use super::error::AdmissionError;
use super::volume::VolumeGate;

/// Fuses three sliding-window sketches and the volume gate into a
/// per-packet forward/drop decision.
///
/// Per packet: insert the three keys, observe the volume, query the
/// previous window's estimates, derive the mode from the latched volume
/// verdict, then decide. In LEARNING everything is admitted. In PROBING
/// a key whose estimate is strictly above its threshold drops the
/// packet; otherwise the burst quota is spent one packet at a time.
#[derive(Debug)]
pub struct AdmissionController {
    config: AdmissionConfig,
    src_dst: RollingSketch,
    dst_port: RollingSketch,
    src_len: RollingSketch,
    volume: VolumeGate,
    mode: Mode,
    quota: u32,
    probing_since_reset: u64,
    packets_in_window: u64,
    window_end_ns: Option<u64>,
    stats: AdmissionStats,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Result<Self, AdmissionError> {
        config.validate()?;
        let sketch = RollingSketch::new(&config.sketch, config.clear_budget)?;

        Ok(Self {
            src_dst: sketch.clone(),
            dst_port: sketch.clone(),
            src_len: sketch,
            volume: VolumeGate::new(config.volume_threshold),
            mode: Mode::Learning,
            quota: config.quota_size,
            probing_since_reset: 0,
            packets_in_window: 0,
            window_end_ns: None,
            stats: AdmissionStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Packets still allowed through in the current PROBING burst.
    pub fn quota(&self) -> u32 {
        self.quota
    }

    pub fn volume(&self) -> &VolumeGate {
        &self.volume
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> AdmissionStats {
        let mut stats = self.stats.clone();
        stats.mode = self.mode;
        stats.counter_saturations = self.src_dst.saturations()
            + self.dst_port.saturations()
            + self.src_len.saturations();
        stats
    }

    /// Estimates from the last completed window.
    pub fn estimates(&self, keys: &FlowKeys) -> Estimates {
        Estimates {
            src_dst: self.src_dst.query(keys.src_dst),
            dst_port: self.dst_port.query(keys.dst_port),
            src_len: self.src_len.query(keys.src_len),
        }
    }

    /// Counts accumulated so far in the window being filled.
    pub fn current_counts(&self, keys: &FlowKeys) -> Estimates {
        Estimates {
            src_dst: self.src_dst.query_current(keys.src_dst),
            dst_port: self.dst_port.query_current(keys.dst_port),
            src_len: self.src_len.query_current(keys.src_len),
        }
    }

    /// Decide on one well-formed packet observed at `now_ns`.
    ///
    /// `now_ns` only matters for time-based windows and must not go
    /// backwards; an earlier timestamp is treated as "no time passed".
    pub fn process(&mut self, fv: &FeatureVector, now_ns: u64) -> AdmissionOutcome {
        let mut ticks = self.advance_clock(now_ns);

        let keys = FlowKeys::from_features(fv);
        self.src_dst.insert(keys.src_dst);
        self.dst_port.insert(keys.dst_port);
        self.src_len.insert(keys.src_len);
        self.volume.observe(u64::from(fv.total_length));
        self.stats.packets_classified += 1;
        self.stats.bytes_observed += u64::from(fv.total_length);

        let estimates = self.estimates(&keys);
        let mode_changed = self.update_mode();
        let (decision, cause) = self.decide(&estimates);

        match cause {
            Some(cause) => self.stats.record_drop(cause),
            None => self.stats.packets_forwarded += 1,
        }

        if let WindowInterval::Packets(n) = self.config.window {
            self.packets_in_window += 1;
            if self.packets_in_window >= n {
                self.packets_in_window = 0;
                self.rotate(1);
                ticks += 1;
            }
        }

        AdmissionOutcome {
            decision,
            mode: self.mode,
            cause,
            estimates: Some(estimates),
            ticks,
            mode_changed,
        }
    }

    /// Record a frame that failed extraction. Statistics stay untouched
    /// and the window does not advance.
    pub fn discard(&mut self, err: &PacketError) -> AdmissionOutcome {
        let cause = DropCause::Parse(err.verdict());
        self.stats.record_drop(cause);
        AdmissionOutcome {
            decision: Decision::DROP,
            mode: self.mode,
            cause: Some(cause),
            estimates: None,
            ticks: 0,
            mode_changed: false,
        }
    }

    /// Close the current window.
    pub fn tick(&mut self) {
        self.packets_in_window = 0;
        self.rotate(1);
    }

    /// Refill the burst quota.
    pub fn reset_quota(&mut self) {
        self.quota = self.config.quota_size;
        self.probing_since_reset = 0;
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Rotate for every time window that ended at or before `now_ns`.
    fn advance_clock(&mut self, now_ns: u64) -> u64 {
        let WindowInterval::Nanos(interval) = self.config.window else {
            return 0;
        };

        let Some(end) = self.window_end_ns else {
            self.window_end_ns = Some(now_ns.saturating_add(interval));
            return 0;
        };
        if now_ns < end {
            return 0;
        }

        let windows = (now_ns - end) / interval + 1;
        self.window_end_ns = Some(end.saturating_add(windows.saturating_mul(interval)));
        self.rotate(windows);
        windows
    }

    fn rotate(&mut self, windows: u64) {
        if windows == 0 {
            return;
        }
        self.src_dst.tick_many(windows);
        self.dst_port.tick_many(windows);
        self.src_len.tick_many(windows);
        self.volume.close_windows(windows);
        self.stats.window_ticks += windows;

        if self.config.quota_reset == QuotaReset::Window {
            self.reset_quota();
        }
    }

    /// Returns `true` when the mode changed.
    fn update_mode(&mut self) -> bool {
        let next = if self.volume.is_elevated() {
            Mode::Probing
        } else {
            Mode::Learning
        };
        if next == self.mode {
            return false;
        }
        if next == Mode::Probing {
            self.reset_quota();
        }
        self.mode = next;
        self.stats.mode_switches += 1;
        true
    }

    fn decide(&mut self, estimates: &Estimates) -> (Decision, Option<DropCause>) {
        if self.mode == Mode::Learning {
            return (Decision(self.config.quota_size), None);
        }

        let heavy = KeyKind::ALL
            .into_iter()
            .find(|&kind| estimates.get(kind) > self.config.thresholds.get(kind));

        let result = match heavy {
            Some(kind) => (Decision::DROP, Some(DropCause::HeavyHitter(kind))),
            None if self.quota == 0 => (Decision::DROP, Some(DropCause::QuotaExhausted)),
            None => {
                let decision = Decision(self.quota);
                self.quota -= 1;
                (decision, None)
            }
        };

        if let QuotaReset::Packets(n) = self.config.quota_reset {
            self.probing_since_reset += 1;
            if self.probing_since_reset >= n {
                self.reset_quota();
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::common::entity::Protocol;
    use crate::packet::builder::extract_features;
    use crate::packet::encode::{FrameTemplate, encode_frame};
    use crate::packet::error::{Layer, ParseVerdict};
    use crate::admission::entity::ProbingThresholds;
    use crate::sketch::entity::SketchParams;

    const VICTIM: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 100);

    fn config(window: WindowInterval) -> AdmissionConfig {
        AdmissionConfig {
            sketch: SketchParams {
                depth: 4,
                width: 1024,
                counter_bits: 32,
                hash_params: Vec::new(),
            },
            clear_budget: 16,
            window,
            volume_threshold: 100_000,
            thresholds: ProbingThresholds {
                src_dst: 1000,
                dst_port: 1000,
                src_len: 1000,
            },
            quota_size: 64,
            quota_reset: QuotaReset::Window,
        }
    }

    fn udp(src: Ipv4Addr, dport: u16, total_length: u16) -> FeatureVector {
        FeatureVector {
            source: src,
            destination: VICTIM,
            destination_port: dport,
            total_length,
            protocol: Protocol::Udp,
        }
    }

    fn flood_source(i: u32) -> Ipv4Addr {
        Ipv4Addr::from(0xC633_6400 + (i % 250) + 1)
    }

    // ── End-to-end scenarios ────────────────────────────────────────

    #[test]
    fn small_udp_packet_in_learning_is_forwarded() {
        let frame = encode_frame(&FrameTemplate::udp(
            Ipv4Addr::new(192, 168, 1, 101),
            VICTIM,
            33000,
            6001,
            18,
        ));
        assert_eq!(frame.len(), 60);
        let fv = extract_features(&frame, 64).unwrap();

        let mut ctl = AdmissionController::new(config(WindowInterval::Packets(1000))).unwrap();
        let out = ctl.process(&fv, 0);

        assert!(out.is_forward());
        assert_eq!(out.mode, Mode::Learning);
        assert_eq!(out.cause, None);
        assert_eq!(out.decision, Decision(64));

        let counts = ctl.current_counts(&FlowKeys::from_features(&fv));
        assert_eq!(counts, Estimates { src_dst: 1, dst_port: 1, src_len: 1 });
    }

    #[test]
    fn flood_on_one_port_is_dropped_once_probing() {
        let mut ctl = AdmissionController::new(config(WindowInterval::Packets(5000))).unwrap();

        // Priming window: the sketches and the volume gate only report
        // completed windows.
        for i in 0..5000 {
            let out = ctl.process(&udp(flood_source(i), 40006, 1052), 0);
            assert!(out.is_forward());
            assert_eq!(out.mode, Mode::Learning);
        }
        assert!(ctl.volume().is_elevated());

        let mut dropped = 0;
        for i in 5000..10_000 {
            let out = ctl.process(&udp(flood_source(i), 40006, 1052), 0);
            assert_eq!(out.mode, Mode::Probing);
            if out.decision == Decision::DROP {
                dropped += 1;
            }
        }

        assert_eq!(dropped, 5000);
        let stats = ctl.stats();
        assert_eq!(stats.dropped_heavy_dst_port, 5000);
        assert_eq!(stats.mode, Mode::Probing);
        assert_eq!(stats.window_ticks, 2);
    }

    #[test]
    fn runt_frame_is_dropped_without_touching_sketches() {
        let mut ctl = AdmissionController::new(config(WindowInterval::Packets(10))).unwrap();
        let err = extract_features(&[0u8; 10], 64).unwrap_err();
        assert_eq!(err.verdict(), ParseVerdict::Runt);

        let out = ctl.discard(&err);
        assert_eq!(out.decision, Decision::DROP);
        assert_eq!(out.cause, Some(DropCause::Parse(ParseVerdict::Runt)));
        assert_eq!(out.estimates, None);

        let stats = ctl.stats();
        assert_eq!(stats.packets_classified, 0);
        assert_eq!(stats.bytes_observed, 0);
        assert_eq!(stats.discarded_runt, 1);
        assert_eq!(ctl.volume().running_total(), 0);
    }

    // ── Mode and quota ──────────────────────────────────────────────

    fn elevated_controller(quota_reset: QuotaReset, quota: u32) -> AdmissionController {
        let mut c = config(WindowInterval::Packets(100));
        c.volume_threshold = 1000;
        c.quota_size = quota;
        c.quota_reset = quota_reset;
        let mut ctl = AdmissionController::new(c).unwrap();
        for i in 0..100u32 {
            ctl.process(&udp(Ipv4Addr::from(0x0A00_0000 + i), 80, 100), 0);
        }
        ctl
    }

    #[test]
    fn probing_spends_quota_then_drops() {
        let mut ctl = elevated_controller(QuotaReset::External, 3);

        let decisions: Vec<u32> = (0..5)
            .map(|i| {
                ctl.process(&udp(Ipv4Addr::new(172, 16, 0, i), 9000 + u16::from(i), 64), 0)
                    .decision
                    .value()
            })
            .collect();
        assert_eq!(decisions, vec![3, 2, 1, 0, 0]);
        assert_eq!(ctl.stats().dropped_quota_exhausted, 2);

        ctl.reset_quota();
        let out = ctl.process(&udp(Ipv4Addr::new(172, 16, 1, 1), 1, 64), 0);
        assert_eq!(out.decision, Decision(3));
    }

    #[test]
    fn quota_resets_after_packet_count() {
        let mut ctl = elevated_controller(QuotaReset::Packets(2), 2);
        let values: Vec<u32> = (0..4)
            .map(|i| {
                ctl.process(&udp(Ipv4Addr::new(172, 16, 0, i), 9000, 64), 0)
                    .decision
                    .value()
            })
            .collect();
        assert_eq!(values, vec![2, 1, 2, 1]);
    }

    #[test]
    fn learning_does_not_spend_quota() {
        let mut ctl = AdmissionController::new(config(WindowInterval::Packets(1000))).unwrap();
        for i in 0..10u32 {
            let out = ctl.process(&udp(Ipv4Addr::from(i), 53, 80), 0);
            assert_eq!(out.decision, Decision(64));
        }
        assert_eq!(ctl.quota(), 64);
    }

    #[test]
    fn mode_returns_to_learning_after_quiet_window() {
        let mut ctl = elevated_controller(QuotaReset::Window, 8);
        let out = ctl.process(&udp(Ipv4Addr::new(1, 1, 1, 1), 1, 40), 0);
        assert_eq!(out.mode, Mode::Probing);
        assert!(out.mode_changed);

        ctl.tick();
        let out = ctl.process(&udp(Ipv4Addr::new(1, 1, 1, 1), 1, 40), 0);
        assert_eq!(out.mode, Mode::Learning);
        assert!(out.mode_changed);
        assert_eq!(ctl.stats().mode_switches, 2);
    }

    #[test]
    fn heavy_hitter_checks_src_dst_first() {
        let mut c = config(WindowInterval::Packets(50));
        c.volume_threshold = 100;
        c.thresholds = ProbingThresholds {
            src_dst: 10,
            dst_port: 10,
            src_len: 10,
        };
        let mut ctl = AdmissionController::new(c).unwrap();
        let fv = udp(Ipv4Addr::new(10, 9, 9, 9), 7, 100);
        for _ in 0..50 {
            ctl.process(&fv, 0);
        }
        let out = ctl.process(&fv, 0);
        assert_eq!(out.cause, Some(DropCause::HeavyHitter(KeyKind::SrcDst)));
        assert_eq!(out.estimates.map(|e| e.src_dst), Some(50));
    }

    #[test]
    fn threshold_is_strict() {
        let mut c = config(WindowInterval::Packets(10));
        c.volume_threshold = 10;
        c.thresholds.dst_port = 10;
        let mut ctl = AdmissionController::new(c).unwrap();

        // Ten packets from distinct sources to one port: estimate == 10.
        for i in 0..10u32 {
            ctl.process(&udp(Ipv4Addr::from(0x0B00_0000 + i), 443, 60), 0);
        }
        let out = ctl.process(&udp(Ipv4Addr::new(11, 1, 1, 1), 443, 61), 0);
        assert_eq!(out.mode, Mode::Probing);
        assert_eq!(out.estimates.map(|e| e.dst_port), Some(10));
        assert!(out.is_forward());
    }

    // ── Windows ─────────────────────────────────────────────────────

    #[test]
    fn time_windows_tick_on_boundaries() {
        let mut ctl = AdmissionController::new(config(WindowInterval::Nanos(1_000))).unwrap();
        let fv = udp(Ipv4Addr::new(10, 0, 0, 1), 80, 100);

        assert_eq!(ctl.process(&fv, 500).ticks, 0);
        assert_eq!(ctl.process(&fv, 1_499).ticks, 0);
        assert_eq!(ctl.process(&fv, 1_500).ticks, 1);
        // Windows ending at 2_500, 3_500, 4_500 and 5_500 all close.
        assert_eq!(ctl.process(&fv, 5_600).ticks, 4);
        assert_eq!(ctl.stats().window_ticks, 5);
    }

    #[test]
    fn estimates_expire_after_two_windows() {
        let mut ctl = AdmissionController::new(config(WindowInterval::Packets(1000))).unwrap();
        let fv = udp(Ipv4Addr::new(10, 0, 0, 1), 80, 100);
        let keys = FlowKeys::from_features(&fv);

        for _ in 0..5 {
            ctl.process(&fv, 0);
        }
        ctl.tick();
        assert_eq!(ctl.estimates(&keys).dst_port, 5);
        ctl.tick();
        assert_eq!(ctl.estimates(&keys), Estimates::default());
    }

    #[test]
    fn malformed_frames_do_not_advance_windows() {
        let mut ctl = AdmissionController::new(config(WindowInterval::Packets(2))).unwrap();
        let err = PacketError::Malformed {
            layer: Layer::Ipv4,
            reason: "IHL below 5",
        };
        for _ in 0..10 {
            ctl.discard(&err);
        }
        let stats = ctl.stats();
        assert_eq!(stats.window_ticks, 0);
        assert_eq!(stats.discarded_malformed, 10);
    }

    #[test]
    fn rejects_invalid_config() {
        let mut c = config(WindowInterval::Packets(10));
        c.volume_threshold = 0;
        assert!(matches!(
            AdmissionController::new(c),
            Err(AdmissionError::ZeroValue { .. })
        ));
    }
}
