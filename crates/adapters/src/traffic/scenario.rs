use std::net::Ipv4Addr;

use domain::common::entity::Protocol;
use domain::packet::encode::{FrameTemplate, encode_frame};
use domain::packet::entity::MacAddr;
use serde::Serialize;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

const SERVER_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 100);
const SERVER_MAC: MacAddr = [0x02, 0x42, 0xc0, 0xa8, 0x01, 0x64];

/// One steady flow towards the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowSpec {
    pub protocol: Protocol,
    pub source: Ipv4Addr,
    pub source_mac: MacAddr,
    pub source_port: u16,
    pub destination_port: u16,
    pub payload_len: usize,
    /// Payload bits per second.
    pub rate_bps: u64,
}

impl FlowSpec {
    pub fn packets_per_second(&self) -> u64 {
        rate_to_pps(self.rate_bps, self.payload_len)
    }
}

/// Reflection flood: many spoofed sources, one victim port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackSpec {
    pub sources: Vec<Ipv4Addr>,
    pub source_port: u16,
    pub destination_port: u16,
    pub payload_len: usize,
    pub rate_bps: u64,
    /// First second (inclusive) in which the flood runs.
    pub start_second: u64,
}

impl AttackSpec {
    /// DNS amplification from 250 reflectors in 198.51.100.0/24.
    pub fn dns_amplification() -> Self {
        Self {
            sources: (1..=250).map(|i| Ipv4Addr::new(198, 51, 100, i)).collect(),
            source_port: 53,
            destination_port: 40006,
            payload_len: 1024,
            rate_bps: 500_000,
            start_second: 1,
        }
    }

    pub fn packets_per_second(&self) -> u64 {
        rate_to_pps(self.rate_bps, self.payload_len)
    }
}

fn rate_to_pps(rate_bps: u64, payload_len: usize) -> u64 {
    match u64::try_from(payload_len) {
        Ok(len) if len > 0 => rate_bps / 8 / len,
        _ => 0,
    }
}

/// A frame and the instant it is seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedFrame {
    pub timestamp_ns: u64,
    pub bytes: Vec<u8>,
}

/// Synthetic capture: baseline flows for `seconds` seconds, optionally
/// overlaid with a flood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficScenario {
    pub server: Ipv4Addr,
    pub server_mac: MacAddr,
    pub flows: Vec<FlowSpec>,
    pub attack: Option<AttackSpec>,
    pub seconds: u64,
}

impl TrafficScenario {
    /// Five client flows: two TCP and three UDP.
    pub fn baseline(seconds: u64) -> Self {
        let flow = |n: u8, protocol, source_port, destination_port, payload_len, rate_bps| {
            FlowSpec {
                protocol,
                source: Ipv4Addr::new(192, 168, 1, 100 + n),
                source_mac: [0x02, 0x42, 0xc0, 0xa8, 0x01, 0x64 + n],
                source_port,
                destination_port,
                payload_len,
                rate_bps,
            }
        };
        Self {
            server: SERVER_IP,
            server_mac: SERVER_MAC,
            flows: vec![
                flow(1, Protocol::Tcp, 40001, 5001, 120, 80_000),
                flow(2, Protocol::Tcp, 40002, 5002, 120, 20_000),
                flow(3, Protocol::Udp, 40003, 6001, 512, 120_000),
                flow(4, Protocol::Udp, 40004, 6002, 512, 10_000),
                flow(5, Protocol::Udp, 40005, 6003, 256, 200_000),
            ],
            attack: None,
            seconds,
        }
    }

    #[must_use]
    pub fn with_attack(mut self, attack: AttackSpec) -> Self {
        self.attack = Some(attack);
        self
    }

    /// Every frame of the scenario in timestamp order. Frames sharing a
    /// timestamp keep generation order (flows first, then the flood).
    pub fn frames(&self) -> Vec<TimedFrame> {
        let mut frames = Vec::new();
        for second in 0..self.seconds {
            for flow in &self.flows {
                self.flow_frames(flow, second, &mut frames);
            }
            if let Some(attack) = &self.attack
                && second >= attack.start_second
            {
                self.attack_frames(attack, second, &mut frames);
            }
        }
        frames.sort_by_key(|f| f.timestamp_ns);
        frames
    }

    fn flow_frames(&self, flow: &FlowSpec, second: u64, out: &mut Vec<TimedFrame>) {
        let pps = flow.packets_per_second();
        for n in 0..pps {
            let template = FrameTemplate {
                dst_mac: self.server_mac,
                src_mac: flow.source_mac,
                protocol: flow.protocol,
                identification: n as u16,
                ..FrameTemplate::tcp(
                    flow.source,
                    self.server,
                    flow.source_port,
                    flow.destination_port,
                    flow.payload_len,
                )
            };
            out.push(TimedFrame {
                timestamp_ns: offset_ns(second, n, pps),
                bytes: encode_frame(&template),
            });
        }
    }

    fn attack_frames(&self, attack: &AttackSpec, second: u64, out: &mut Vec<TimedFrame>) {
        if attack.sources.is_empty() {
            return;
        }
        let pps = attack.packets_per_second();
        for n in 0..pps {
            let source = attack.sources[(n as usize) % attack.sources.len()];
            let template = FrameTemplate {
                dst_mac: self.server_mac,
                src_mac: [0xde, 0xad, 0xbe, 0xef, 0x00, n as u8],
                identification: n as u16,
                ..FrameTemplate::udp(
                    source,
                    self.server,
                    attack.source_port,
                    attack.destination_port,
                    attack.payload_len,
                )
            };
            out.push(TimedFrame {
                timestamp_ns: offset_ns(second, n, pps),
                bytes: encode_frame(&template),
            });
        }
    }
}

fn offset_ns(second: u64, n: u64, pps: u64) -> u64 {
    second * NANOS_PER_SECOND + n * NANOS_PER_SECOND / pps.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::packet::builder::extract_features;

    #[test]
    fn baseline_rates() {
        let scenario = TrafficScenario::baseline(1);
        let pps: Vec<u64> = scenario
            .flows
            .iter()
            .map(FlowSpec::packets_per_second)
            .collect();
        assert_eq!(pps, vec![83, 20, 29, 2, 97]);
        assert_eq!(scenario.frames().len(), 231);
    }

    #[test]
    fn attack_starts_at_second_one() {
        let scenario = TrafficScenario::baseline(3).with_attack(AttackSpec::dns_amplification());
        let frames = scenario.frames();
        assert_eq!(frames.len(), 3 * 231 + 2 * 61);

        let first_attack = frames
            .iter()
            .filter_map(|f| extract_features(&f.bytes, 64).ok())
            .position(|fv| fv.destination_port == 40006)
            .unwrap();
        assert!(frames[first_attack].timestamp_ns >= NANOS_PER_SECOND);
    }

    #[test]
    fn frames_are_time_ordered() {
        let frames = TrafficScenario::baseline(2)
            .with_attack(AttackSpec::dns_amplification())
            .frames();
        assert!(
            frames
                .windows(2)
                .all(|w| w[0].timestamp_ns <= w[1].timestamp_ns)
        );
    }

    #[test]
    fn attack_frames_classify_as_reflection() {
        let scenario = TrafficScenario {
            flows: Vec::new(),
            ..TrafficScenario::baseline(2).with_attack(AttackSpec::dns_amplification())
        };
        let frames = scenario.frames();
        assert_eq!(frames.len(), 61);

        let fv = extract_features(&frames[0].bytes, 64).unwrap();
        assert_eq!(fv.source, Ipv4Addr::new(198, 51, 100, 1));
        assert_eq!(fv.destination, SERVER_IP);
        assert_eq!(fv.destination_port, 40006);
        assert_eq!(fv.total_length, 20 + 8 + 1024);
        assert_eq!(fv.protocol, Protocol::Udp);
    }
}
