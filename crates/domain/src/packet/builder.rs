use crate::common::entity::Protocol;
use crate::common::error::DomainError;

use super::aligner::{Pull, StreamAligner};
use super::entity::{Chunk, EtherType, FeatureVector, Ipv4Header};
use super::error::{Layer, PacketError};
use super::parser::{Ethernet, Extractor, Ipv4, Tcp, Udp};

/// Result of feeding one chunk to the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// The frame is still open and well-formed so far.
    Pending,
    /// End of frame reached; the packet is well-formed.
    Complete(FeatureVector),
    /// The frame is dropped. Later chunks of the same frame are `Skipped`.
    Discard(PacketError),
    /// Chunk belongs to an already discarded frame.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Link,
    Network,
    Transport(Protocol),
    Trailer,
    Discarding,
}

/// Drives the Ethernet → IPv4 → TCP/UDP extractors over a chunk stream.
///
/// Each layer owns its own `StreamAligner`, so every extractor starts
/// decoding at byte 0 of its header regardless of where the previous
/// header ended inside a chunk.
#[derive(Debug)]
pub struct FeatureVectorBuilder {
    link: StreamAligner,
    network: StreamAligner,
    transport: StreamAligner,
    stage: Stage,
    ipv4: Option<Ipv4Header>,
    destination_port: u16,
    /// Bytes from the first IPv4 header byte to the end of the frame.
    network_bytes: usize,
    network_complete: bool,
    abandoned: u64,
}

impl FeatureVectorBuilder {
    pub fn new(width: usize) -> Result<Self, DomainError> {
        Ok(Self {
            link: StreamAligner::new(width)?,
            network: StreamAligner::new(width)?,
            transport: StreamAligner::new(width)?,
            stage: Stage::Idle,
            ipv4: None,
            destination_port: 0,
            network_bytes: 0,
            network_complete: false,
            abandoned: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.link.width()
    }

    /// Frames cut short by the start of the next frame.
    pub fn abandoned_frames(&self) -> u64 {
        self.abandoned
    }

    /// Returns `true` while a frame is being decoded.
    pub fn in_frame(&self) -> bool {
        !matches!(self.stage, Stage::Idle | Stage::Discarding)
    }

    pub fn push(&mut self, chunk: &Chunk) -> BuildStatus {
        if chunk.is_start() {
            if self.in_frame() {
                self.abandoned += 1;
            }
            self.reset();
            self.stage = Stage::Link;
        } else if self.stage == Stage::Discarding {
            if chunk.is_end() {
                self.stage = Stage::Idle;
            }
            return BuildStatus::Skipped;
        }

        if let Err(e) = self.link.push(chunk) {
            return self.discard(e, chunk.is_end());
        }

        match self.advance() {
            Ok(Some(features)) => {
                self.reset();
                BuildStatus::Complete(features)
            }
            Ok(None) => BuildStatus::Pending,
            Err(e) => self.discard(e, chunk.is_end()),
        }
    }

    /// Abandon the current frame, if any.
    pub fn reset(&mut self) {
        self.link.flush();
        self.network.flush();
        self.transport.flush();
        self.stage = Stage::Idle;
        self.ipv4 = None;
        self.destination_port = 0;
        self.network_bytes = 0;
        self.network_complete = false;
    }

    fn discard(&mut self, err: PacketError, at_end: bool) -> BuildStatus {
        self.reset();
        if !at_end {
            self.stage = Stage::Discarding;
        }
        BuildStatus::Discard(err)
    }

    fn advance(&mut self) -> Result<Option<FeatureVector>, PacketError> {
        loop {
            match self.stage {
                Stage::Idle | Stage::Discarding => return Ok(None),
                Stage::Link => {
                    let Some(eth) = pull::<Ethernet>(&mut self.link)? else {
                        return Ok(None);
                    };
                    if eth.next_header() != EtherType::Ipv4 {
                        return Err(PacketError::UnsupportedProtocol {
                            ether_type: eth.ether_type,
                        });
                    }
                    self.stage = Stage::Network;
                }
                Stage::Network => {
                    self.forward_link()?;
                    let Some(ip) = pull::<Ipv4>(&mut self.network)? else {
                        return Ok(None);
                    };
                    self.ipv4 = Some(ip);
                    self.stage = if ip.protocol.carries_ports() {
                        Stage::Transport(ip.protocol)
                    } else {
                        Stage::Trailer
                    };
                }
                Stage::Transport(protocol) => {
                    self.forward_link()?;
                    while let Some(c) = self.network.pop_aligned() {
                        self.transport.push(&c)?;
                    }
                    let port = match protocol {
                        Protocol::Tcp => {
                            pull::<Tcp>(&mut self.transport)?.map(|h| h.destination_port)
                        }
                        Protocol::Udp => {
                            pull::<Udp>(&mut self.transport)?.map(|h| h.destination_port)
                        }
                        _ => Some(0),
                    };
                    let Some(port) = port else {
                        return Ok(None);
                    };
                    self.destination_port = port;
                    self.stage = Stage::Trailer;
                }
                Stage::Trailer => {
                    // Payload bytes only matter for the length check.
                    while let Some(c) = self.link.pop_aligned() {
                        self.count_network(&c);
                    }
                    self.network.flush();
                    self.transport.flush();
                    if !self.network_complete {
                        return Ok(None);
                    }
                    return self.finish().map(Some);
                }
            }
        }
    }

    fn forward_link(&mut self) -> Result<(), PacketError> {
        while let Some(c) = self.link.pop_aligned() {
            self.count_network(&c);
            self.network.push(&c)?;
        }
        Ok(())
    }

    fn count_network(&mut self, chunk: &Chunk) {
        self.network_bytes += chunk.valid_len();
        if chunk.is_end() {
            self.network_complete = true;
        }
    }

    fn finish(&self) -> Result<FeatureVector, PacketError> {
        let ip = self.ipv4.ok_or(PacketError::Malformed {
            layer: Layer::Ipv4,
            reason: "frame ended before the IPv4 header",
        })?;
        if usize::from(ip.total_length) > self.network_bytes {
            return Err(PacketError::Malformed {
                layer: Layer::Ipv4,
                reason: "total length exceeds frame",
            });
        }

        Ok(FeatureVector {
            source: ip.source,
            destination: ip.destination,
            destination_port: self.destination_port,
            total_length: ip.total_length,
            protocol: ip.protocol,
        })
    }
}

/// Peek, size and extract one header from an aligner.
///
/// Returns `Ok(None)` while the frame is open but the header is not yet
/// fully buffered.
fn pull<E: Extractor>(aligner: &mut StreamAligner) -> Result<Option<E::Header>, PacketError> {
    let need = match aligner.peek(E::MIN_LEN) {
        Pull::Ready(prefix) => E::header_len(prefix)?,
        Pull::NeedMore => return Ok(None),
        Pull::Truncated { available, .. } => return Err(E::runt(available)),
    };

    let header = match aligner.peek(need) {
        Pull::Ready(bytes) => E::extract(bytes)?,
        Pull::NeedMore => return Ok(None),
        Pull::Truncated { need, available } => return Err(E::truncated(need, available)),
    };

    aligner.consume(need);
    Ok(Some(header))
}

// ── Convenience ─────────────────────────────────────────────────────

/// Classify one complete frame given as its chunk sequence.
pub fn classify_frame(chunks: &[Chunk], width: usize) -> Result<FeatureVector, PacketError> {
    let mut builder = FeatureVectorBuilder::new(width)
        .map_err(|_| PacketError::framing("invalid chunk width"))?;
    for chunk in chunks {
        match builder.push(chunk) {
            BuildStatus::Complete(features) => return Ok(features),
            BuildStatus::Discard(e) => return Err(e),
            BuildStatus::Pending | BuildStatus::Skipped => {}
        }
    }
    Err(PacketError::framing("frame has no end-of-frame chunk"))
}

/// Segment `frame` at `width` and classify it.
pub fn extract_features(frame: &[u8], width: usize) -> Result<FeatureVector, PacketError> {
    classify_frame(&Chunk::segment(frame, width), width)
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::packet::encode::{FrameTemplate, encode_frame};
    use crate::packet::error::ParseVerdict;

    fn tcp_template() -> FrameTemplate {
        FrameTemplate::tcp(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(192, 168, 1, 100),
            40000,
            5001,
            26,
        )
    }

    fn push_all(builder: &mut FeatureVectorBuilder, chunks: &[Chunk]) -> Vec<BuildStatus> {
        chunks.iter().map(|c| builder.push(c)).collect()
    }

    #[test]
    fn udp_frame_yields_features() {
        let frame = encode_frame(&FrameTemplate::udp(
            Ipv4Addr::new(192, 168, 1, 101),
            Ipv4Addr::new(192, 168, 1, 100),
            33000,
            6001,
            18,
        ));
        assert_eq!(frame.len(), 60);

        let fv = extract_features(&frame, 64).unwrap();
        assert_eq!(fv.source, Ipv4Addr::new(192, 168, 1, 101));
        assert_eq!(fv.destination, Ipv4Addr::new(192, 168, 1, 100));
        assert_eq!(fv.destination_port, 6001);
        assert_eq!(fv.total_length, 46);
        assert_eq!(fv.protocol, Protocol::Udp);
    }

    #[test]
    fn tcp_header_split_across_chunks() {
        let frame = encode_frame(&tcp_template());
        // With 36-byte chunks the TCP header (bytes 34..54) straddles the
        // first chunk boundary.
        let split = extract_features(&frame, 36).unwrap();
        let whole = extract_features(&frame, 128).unwrap();

        assert_eq!(split, whole);
        assert_eq!(split.destination_port, 5001);
    }

    #[test]
    fn every_width_agrees() {
        let frame = encode_frame(&tcp_template());
        let reference = extract_features(&frame, 256).unwrap();
        for width in (4..=64).step_by(4) {
            assert_eq!(extract_features(&frame, width).unwrap(), reference, "width {width}");
        }
    }

    #[test]
    fn parsing_is_idempotent() {
        let frame = encode_frame(&tcp_template());
        let chunks = Chunk::segment(&frame, 16);
        let mut builder = FeatureVectorBuilder::new(16).unwrap();

        let first = push_all(&mut builder, &chunks);
        let second = push_all(&mut builder, &chunks);

        assert_eq!(first, second);
        assert!(matches!(first.last(), Some(BuildStatus::Complete(_))));
    }

    #[test]
    fn ten_byte_frame_is_runt() {
        let err = extract_features(&[0u8; 10], 64).unwrap_err();
        assert_eq!(err.verdict(), ParseVerdict::Runt);
        assert!(matches!(err, PacketError::Runt { layer: Layer::Ethernet, .. }));
    }

    #[test]
    fn ipv6_is_unsupported() {
        let mut frame = encode_frame(&tcp_template());
        frame[12..14].copy_from_slice(&0x86DDu16.to_be_bytes());
        let err = extract_features(&frame, 64).unwrap_err();
        assert_eq!(err, PacketError::UnsupportedProtocol { ether_type: 0x86DD });
    }

    #[test]
    fn total_length_beyond_frame_is_malformed() {
        let mut frame = encode_frame(&tcp_template());
        frame[16..18].copy_from_slice(&1500u16.to_be_bytes());
        let err = extract_features(&frame, 64).unwrap_err();
        assert!(matches!(err, PacketError::Malformed { layer: Layer::Ipv4, .. }));
    }

    #[test]
    fn truncated_tcp_header_is_runt() {
        let frame = encode_frame(&tcp_template());
        let err = extract_features(&frame[..44], 64).unwrap_err();
        assert!(matches!(err, PacketError::Runt { layer: Layer::Tcp, .. }));
    }

    #[test]
    fn icmp_has_zero_port() {
        let mut t = tcp_template();
        t.protocol = Protocol::Icmp;
        let fv = extract_features(&encode_frame(&t), 64).unwrap();
        assert_eq!(fv.protocol, Protocol::Icmp);
        assert_eq!(fv.destination_port, 0);
    }

    #[test]
    fn vlan_tagged_frame() {
        let mut t = tcp_template();
        t.vlan_id = Some(42);
        let fv = extract_features(&encode_frame(&t), 8).unwrap();
        assert_eq!(fv.destination_port, 5001);
    }

    #[test]
    fn discarded_frame_skips_remaining_chunks() {
        let mut frame = encode_frame(&tcp_template());
        frame[14] = 0x44; // IHL 4
        let chunks = Chunk::segment(&frame, 16);
        let mut builder = FeatureVectorBuilder::new(16).unwrap();

        // The IPv4 header is complete only once the third chunk arrives.
        let statuses = push_all(&mut builder, &chunks);
        assert_eq!(statuses[1], BuildStatus::Pending);
        assert!(matches!(statuses[2], BuildStatus::Discard(PacketError::Malformed { .. })));
        assert!(statuses[3..].iter().all(|s| *s == BuildStatus::Skipped));
        assert!(!builder.in_frame());

        // Next frame parses cleanly.
        let good = Chunk::segment(&encode_frame(&tcp_template()), 16);
        let statuses = push_all(&mut builder, &good);
        assert!(matches!(statuses.last(), Some(BuildStatus::Complete(_))));
    }

    #[test]
    fn start_of_frame_abandons_open_frame() {
        let frame = encode_frame(&tcp_template());
        let chunks = Chunk::segment(&frame, 16);
        let mut builder = FeatureVectorBuilder::new(16).unwrap();

        builder.push(&chunks[0]);
        let statuses = push_all(&mut builder, &chunks);

        assert_eq!(builder.abandoned_frames(), 1);
        assert!(matches!(statuses.last(), Some(BuildStatus::Complete(_))));
    }

    #[test]
    fn orphan_chunk_is_discarded() {
        let mut builder = FeatureVectorBuilder::new(16).unwrap();
        let status = builder.push(&Chunk::new(vec![0; 4], false, true));
        assert!(matches!(
            status,
            BuildStatus::Discard(PacketError::Malformed {
                layer: Layer::Framing,
                ..
            })
        ));
        assert!(!builder.in_frame());
    }
}
