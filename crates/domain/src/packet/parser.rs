use std::net::Ipv4Addr;

use crate::common::entity::Protocol;

use super::entity::{
    ETHERNET_HEADER_LEN, ETHERTYPE_VLAN, EthernetHeader, IPV4_MIN_HEADER_LEN, Ipv4Header,
    TCP_MIN_HEADER_LEN, TcpFlags, TcpHeader, UDP_HEADER_LEN, UdpHeader, VLAN_TAG_LEN,
};
use super::error::{Layer, PacketError};

// ── Extractor seam ──────────────────────────────────────────────────

/// A stateless header decoder for one protocol layer.
///
/// The builder first peeks `MIN_LEN` bytes to learn the real header
/// length, then hands exactly that many bytes to `extract`.
pub trait Extractor {
    type Header;

    const LAYER: Layer;
    const MIN_LEN: usize;

    /// Header length declared by the first `MIN_LEN` bytes.
    fn header_len(prefix: &[u8]) -> Result<usize, PacketError>;

    fn extract(bytes: &[u8]) -> Result<Self::Header, PacketError>;

    /// Error raised when the frame ends inside the declared header.
    fn truncated(_need: usize, _got: usize) -> PacketError {
        PacketError::Malformed {
            layer: Self::LAYER,
            reason: "declared header length exceeds frame",
        }
    }

    /// Error raised when the frame ends before `MIN_LEN` bytes.
    fn runt(got: usize) -> PacketError {
        PacketError::Runt {
            layer: Self::LAYER,
            need: Self::MIN_LEN,
            got,
        }
    }
}

pub struct Ethernet;
pub struct Ipv4;
pub struct Tcp;
pub struct Udp;

impl Extractor for Ethernet {
    type Header = EthernetHeader;

    const LAYER: Layer = Layer::Ethernet;
    const MIN_LEN: usize = ETHERNET_HEADER_LEN;

    fn header_len(prefix: &[u8]) -> Result<usize, PacketError> {
        require(Self::LAYER, prefix, ETHERNET_HEADER_LEN)?;
        if be16(prefix, 12) == ETHERTYPE_VLAN {
            Ok(ETHERNET_HEADER_LEN + VLAN_TAG_LEN)
        } else {
            Ok(ETHERNET_HEADER_LEN)
        }
    }

    fn extract(bytes: &[u8]) -> Result<EthernetHeader, PacketError> {
        extract_ethernet(bytes)
    }

    fn truncated(need: usize, got: usize) -> PacketError {
        PacketError::Runt {
            layer: Layer::Ethernet,
            need,
            got,
        }
    }
}

impl Extractor for Ipv4 {
    type Header = Ipv4Header;

    const LAYER: Layer = Layer::Ipv4;
    const MIN_LEN: usize = IPV4_MIN_HEADER_LEN;

    fn header_len(prefix: &[u8]) -> Result<usize, PacketError> {
        require(Self::LAYER, prefix, IPV4_MIN_HEADER_LEN)?;
        let version = prefix[0] >> 4;
        if version != 4 {
            return Err(malformed(Self::LAYER, "version is not 4"));
        }
        let ihl = prefix[0] & 0x0F;
        if ihl < 5 {
            return Err(malformed(Self::LAYER, "IHL below 5"));
        }
        Ok(usize::from(ihl) * 4)
    }

    fn extract(bytes: &[u8]) -> Result<Ipv4Header, PacketError> {
        extract_ipv4(bytes)
    }
}

impl Extractor for Tcp {
    type Header = TcpHeader;

    const LAYER: Layer = Layer::Tcp;
    const MIN_LEN: usize = TCP_MIN_HEADER_LEN;

    fn header_len(prefix: &[u8]) -> Result<usize, PacketError> {
        require(Self::LAYER, prefix, TCP_MIN_HEADER_LEN)?;
        let data_offset = prefix[12] >> 4;
        if data_offset < 5 {
            return Err(malformed(Self::LAYER, "data offset below 5"));
        }
        Ok(usize::from(data_offset) * 4)
    }

    fn extract(bytes: &[u8]) -> Result<TcpHeader, PacketError> {
        extract_tcp(bytes)
    }
}

impl Extractor for Udp {
    type Header = UdpHeader;

    const LAYER: Layer = Layer::Udp;
    const MIN_LEN: usize = UDP_HEADER_LEN;

    fn header_len(prefix: &[u8]) -> Result<usize, PacketError> {
        require(Self::LAYER, prefix, UDP_HEADER_LEN)?;
        Ok(UDP_HEADER_LEN)
    }

    fn extract(bytes: &[u8]) -> Result<UdpHeader, PacketError> {
        extract_udp(bytes)
    }
}

// ── Pure extractors ─────────────────────────────────────────────────

/// Decode an Ethernet II header, with an optional 802.1Q tag.
pub fn extract_ethernet(bytes: &[u8]) -> Result<EthernetHeader, PacketError> {
    let need = Ethernet::header_len(bytes)?;
    require(Layer::Ethernet, bytes, need)?;

    let mut dst_mac = [0u8; 6];
    let mut src_mac = [0u8; 6];
    dst_mac.copy_from_slice(&bytes[0..6]);
    src_mac.copy_from_slice(&bytes[6..12]);

    let (vlan_tci, ether_type) = if need > ETHERNET_HEADER_LEN {
        (Some(be16(bytes, 14)), be16(bytes, 16))
    } else {
        (None, be16(bytes, 12))
    };

    Ok(EthernetHeader {
        dst_mac,
        src_mac,
        vlan_tci,
        ether_type,
    })
}

/// Decode an IPv4 header.
///
/// `bytes` must hold at least the declared header (IHL × 4). The check of
/// the total length against the rest of the frame is left to the caller,
/// which is the only one that knows where the frame ends.
pub fn extract_ipv4(bytes: &[u8]) -> Result<Ipv4Header, PacketError> {
    let header_len = Ipv4::header_len(bytes)?;
    if bytes.len() < header_len {
        return Err(malformed(Layer::Ipv4, "IHL exceeds available bytes"));
    }

    let total_length = be16(bytes, 2);
    if usize::from(total_length) < header_len {
        return Err(malformed(Layer::Ipv4, "total length shorter than header"));
    }

    let flags_fragment = be16(bytes, 6);

    Ok(Ipv4Header {
        version: bytes[0] >> 4,
        ihl: bytes[0] & 0x0F,
        type_of_service: bytes[1],
        total_length,
        identification: be16(bytes, 4),
        flags: (flags_fragment >> 13) as u8,
        fragment_offset: flags_fragment & 0x1FFF,
        ttl: bytes[8],
        protocol: Protocol::from_u8(bytes[9]),
        checksum: be16(bytes, 10),
        source: Ipv4Addr::new(bytes[12], bytes[13], bytes[14], bytes[15]),
        destination: Ipv4Addr::new(bytes[16], bytes[17], bytes[18], bytes[19]),
    })
}

/// Decode a TCP header; options are skipped.
pub fn extract_tcp(bytes: &[u8]) -> Result<TcpHeader, PacketError> {
    let header_len = Tcp::header_len(bytes)?;
    if bytes.len() < header_len {
        return Err(malformed(Layer::Tcp, "data offset exceeds available bytes"));
    }

    Ok(TcpHeader {
        source_port: be16(bytes, 0),
        destination_port: be16(bytes, 2),
        sequence: be32(bytes, 4),
        acknowledgement: be32(bytes, 8),
        data_offset: bytes[12] >> 4,
        flags: TcpFlags(bytes[13]),
        window: be16(bytes, 14),
        checksum: be16(bytes, 16),
        urgent_pointer: be16(bytes, 18),
    })
}

pub fn extract_udp(bytes: &[u8]) -> Result<UdpHeader, PacketError> {
    require(Layer::Udp, bytes, UDP_HEADER_LEN)?;

    Ok(UdpHeader {
        source_port: be16(bytes, 0),
        destination_port: be16(bytes, 2),
        length: be16(bytes, 4),
        checksum: be16(bytes, 6),
    })
}

// ── Helpers ─────────────────────────────────────────────────────────

fn require(layer: Layer, bytes: &[u8], need: usize) -> Result<(), PacketError> {
    if bytes.len() < need {
        return Err(PacketError::Runt {
            layer,
            need,
            got: bytes.len(),
        });
    }
    Ok(())
}

fn malformed(layer: Layer, reason: &'static str) -> PacketError {
    PacketError::Malformed { layer, reason }
}

fn be16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

fn be32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::entity::{ETHERTYPE_IPV4, EtherType};

    fn ethernet_bytes(ether_type: u16) -> Vec<u8> {
        let mut b = vec![0xAA; 6];
        b.extend_from_slice(&[0xBB; 6]);
        b.extend_from_slice(&ether_type.to_be_bytes());
        b
    }

    fn ipv4_bytes(protocol: u8, total_length: u16) -> Vec<u8> {
        let mut b = vec![0u8; 20];
        b[0] = 0x45;
        b[2..4].copy_from_slice(&total_length.to_be_bytes());
        b[6] = 0x40; // DF
        b[8] = 64;
        b[9] = protocol;
        b[12..16].copy_from_slice(&[10, 0, 0, 1]);
        b[16..20].copy_from_slice(&[192, 168, 1, 100]);
        b
    }

    fn tcp_bytes(sport: u16, dport: u16) -> Vec<u8> {
        let mut b = vec![0u8; 20];
        b[0..2].copy_from_slice(&sport.to_be_bytes());
        b[2..4].copy_from_slice(&dport.to_be_bytes());
        b[4..8].copy_from_slice(&1000u32.to_be_bytes());
        b[12] = 5 << 4;
        b[13] = TcpFlags::SYN;
        b
    }

    // ── Ethernet ────────────────────────────────────────────────────

    #[test]
    fn ethernet_untagged() {
        let hdr = extract_ethernet(&ethernet_bytes(ETHERTYPE_IPV4)).unwrap();
        assert_eq!(hdr.dst_mac, [0xAA; 6]);
        assert_eq!(hdr.src_mac, [0xBB; 6]);
        assert_eq!(hdr.vlan_tci, None);
        assert_eq!(hdr.next_header(), EtherType::Ipv4);
        assert_eq!(hdr.header_len(), 14);
    }

    #[test]
    fn ethernet_vlan_tagged() {
        let mut b = ethernet_bytes(ETHERTYPE_VLAN);
        b.extend_from_slice(&0x0064u16.to_be_bytes());
        b.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());

        let hdr = extract_ethernet(&b).unwrap();
        assert_eq!(hdr.vlan_id(), Some(100));
        assert_eq!(hdr.next_header(), EtherType::Ipv4);
        assert_eq!(hdr.header_len(), 18);
    }

    #[test]
    fn ethernet_runt() {
        let err = extract_ethernet(&[0u8; 10]).unwrap_err();
        assert_eq!(
            err,
            PacketError::Runt {
                layer: Layer::Ethernet,
                need: 14,
                got: 10
            }
        );
    }

    #[test]
    fn ethernet_vlan_cut_short_is_runt() {
        let b = ethernet_bytes(ETHERTYPE_VLAN);
        let err = extract_ethernet(&b).unwrap_err();
        assert!(matches!(err, PacketError::Runt { need: 18, got: 14, .. }));
    }

    // ── IPv4 ────────────────────────────────────────────────────────

    #[test]
    fn ipv4_fields() {
        let hdr = extract_ipv4(&ipv4_bytes(17, 46)).unwrap();
        assert_eq!(hdr.version, 4);
        assert_eq!(hdr.header_len(), 20);
        assert_eq!(hdr.total_length, 46);
        assert_eq!(hdr.flags, 0b010);
        assert_eq!(hdr.ttl, 64);
        assert_eq!(hdr.protocol, Protocol::Udp);
        assert_eq!(hdr.source, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(hdr.destination, Ipv4Addr::new(192, 168, 1, 100));
    }

    #[test]
    fn ipv4_ihl_below_five_is_malformed() {
        let mut b = ipv4_bytes(6, 40);
        b[0] = 0x44;
        let err = extract_ipv4(&b).unwrap_err();
        assert!(matches!(err, PacketError::Malformed { layer: Layer::Ipv4, .. }));
    }

    #[test]
    fn ipv4_wrong_version_is_malformed() {
        let mut b = ipv4_bytes(6, 40);
        b[0] = 0x65;
        assert!(matches!(
            extract_ipv4(&b),
            Err(PacketError::Malformed { layer: Layer::Ipv4, .. })
        ));
    }

    #[test]
    fn ipv4_options_beyond_available_is_malformed() {
        let mut b = ipv4_bytes(6, 60);
        b[0] = 0x46; // 24-byte header, only 20 present
        assert!(matches!(
            extract_ipv4(&b),
            Err(PacketError::Malformed { layer: Layer::Ipv4, .. })
        ));
    }

    #[test]
    fn ipv4_total_length_below_header_is_malformed() {
        let b = ipv4_bytes(6, 12);
        assert!(matches!(
            extract_ipv4(&b),
            Err(PacketError::Malformed { layer: Layer::Ipv4, .. })
        ));
    }

    #[test]
    fn ipv4_runt() {
        assert!(matches!(
            extract_ipv4(&[0x45; 12]),
            Err(PacketError::Runt { layer: Layer::Ipv4, need: 20, got: 12 })
        ));
    }

    // ── TCP / UDP ───────────────────────────────────────────────────

    #[test]
    fn tcp_fields() {
        let hdr = extract_tcp(&tcp_bytes(40000, 5001)).unwrap();
        assert_eq!(hdr.source_port, 40000);
        assert_eq!(hdr.destination_port, 5001);
        assert_eq!(hdr.sequence, 1000);
        assert_eq!(hdr.header_len(), 20);
        assert!(hdr.flags.contains(TcpFlags::SYN));
    }

    #[test]
    fn tcp_runt() {
        assert!(matches!(
            extract_tcp(&[0u8; 19]),
            Err(PacketError::Runt { layer: Layer::Tcp, .. })
        ));
    }

    #[test]
    fn tcp_data_offset_checks() {
        let mut b = tcp_bytes(1, 2);
        b[12] = 4 << 4;
        assert!(matches!(
            extract_tcp(&b),
            Err(PacketError::Malformed { layer: Layer::Tcp, .. })
        ));

        b[12] = 8 << 4; // 32-byte header, 20 present
        assert!(matches!(
            extract_tcp(&b),
            Err(PacketError::Malformed { layer: Layer::Tcp, .. })
        ));
    }

    #[test]
    fn udp_fields_and_runt() {
        let b = [0x00, 0x35, 0x9C, 0x46, 0x04, 0x08, 0x00, 0x00];
        let hdr = extract_udp(&b).unwrap();
        assert_eq!(hdr.source_port, 53);
        assert_eq!(hdr.destination_port, 40006);
        assert_eq!(hdr.length, 1032);

        assert!(matches!(
            extract_udp(&b[..7]),
            Err(PacketError::Runt { layer: Layer::Udp, need: 8, got: 7 })
        ));
    }

    #[test]
    fn extractors_are_referentially_transparent() {
        let b = tcp_bytes(1234, 80);
        assert_eq!(extract_tcp(&b), extract_tcp(&b));
    }
}
