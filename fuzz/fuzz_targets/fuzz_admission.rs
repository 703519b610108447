#![no_main]

use std::net::Ipv4Addr;

use libfuzzer_sys::fuzz_target;

use domain::admission::engine::AdmissionController;
use domain::admission::entity::{
    AdmissionConfig, ProbingThresholds, QuotaReset, WindowInterval,
};
use domain::common::entity::Protocol;
use domain::packet::entity::FeatureVector;
use domain::packet::error::{Layer, PacketError};
use domain::sketch::entity::SketchParams;

// Fuzz the admission controller with fuzzed configs and packet streams.
//
// Layout:
//   [0..8]  = config: depth, log2 width, counter bits, clear budget,
//             window kind/size, threshold, quota size, quota reset
//   rest    = consumed in 12-byte chunks as packets:
//             src(4) dst(4) port(2) len(1) flags(1)
fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let counter_bits = [8u8, 16, 32][(data[2] as usize) % 3];
    let threshold = u32::from(data[5]).max(1);
    let window = if data[4] & 0x80 != 0 {
        WindowInterval::Nanos(u64::from(data[4] & 0x7f).max(1) * 1_000_000)
    } else {
        WindowInterval::Packets(u64::from(data[4]).max(1))
    };
    let quota_reset = match data[7] % 3 {
        0 => QuotaReset::Window,
        1 => QuotaReset::Packets(u64::from(data[7] >> 2).max(1)),
        _ => QuotaReset::External,
    };

    let config = AdmissionConfig {
        sketch: SketchParams {
            depth: usize::from(data[0] % 8) + 1,
            width: 1 << (data[1] % 12 + 1),
            counter_bits,
            hash_params: Vec::new(),
        },
        clear_budget: usize::from(data[3] % 64) + 1,
        window,
        volume_threshold: u64::from(data[5]) * 64,
        thresholds: ProbingThresholds {
            src_dst: threshold,
            dst_port: threshold,
            src_len: threshold,
        },
        quota_size: u32::from(data[6]),
        quota_reset,
    };

    // Invalid configs must be rejected, never panic
    let Ok(mut controller) = AdmissionController::new(config) else {
        return;
    };

    let mut now_ns: u64 = 0;
    let mut cursor = 8;
    while cursor + 12 <= data.len() {
        let p = &data[cursor..cursor + 12];
        cursor += 12;

        let flags = p[11];
        now_ns = now_ns.saturating_add(u64::from(flags >> 3) * 1_000_000);

        match flags % 8 {
            0 => {
                let err = if p[0] & 1 == 0 {
                    PacketError::Runt {
                        layer: Layer::Ipv4,
                        need: 20,
                        got: usize::from(p[1] % 20),
                    }
                } else {
                    PacketError::UnsupportedProtocol {
                        ether_type: u16::from_le_bytes([p[2], p[3]]),
                    }
                };
                let _ = controller.discard(&err);
            }
            1 => controller.tick(),
            2 => controller.reset_quota(),
            _ => {
                let fv = FeatureVector {
                    source: Ipv4Addr::new(p[0], p[1], p[2], p[3]),
                    destination: Ipv4Addr::new(p[4], p[5], p[6], p[7]),
                    destination_port: u16::from_le_bytes([p[8], p[9]]),
                    total_length: u16::from(p[10]) * 6 + 20,
                    protocol: match p[10] % 3 {
                        0 => Protocol::Tcp,
                        1 => Protocol::Udp,
                        _ => Protocol::from_u8(p[3]),
                    },
                };
                let outcome = controller.process(&fv, now_ns);
                if outcome.is_forward() {
                    assert_ne!(outcome.decision.value(), 0);
                }
            }
        }
        assert!(controller.quota() <= controller.config().quota_size);
    }

    let stats = controller.stats();
    let _ = stats.packets_dropped();
    let _ = stats.frames_discarded();
});
