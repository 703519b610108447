use std::net::Ipv4Addr;

use crate::common::entity::Protocol;

use super::entity::{
    ETHERTYPE_IPV4, ETHERTYPE_VLAN, IPV4_MIN_HEADER_LEN, MacAddr, TCP_MIN_HEADER_LEN, TcpFlags,
    UDP_HEADER_LEN,
};

/// Minimum Ethernet frame size without FCS; shorter frames are zero-padded.
pub const MIN_FRAME_LEN: usize = 60;

/// Description of a synthetic Ethernet/IPv4 frame.
///
/// Used by the traffic generator and by tests. Transport checksums are
/// left at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTemplate {
    pub dst_mac: MacAddr,
    pub src_mac: MacAddr,
    pub vlan_id: Option<u16>,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: Protocol,
    pub source_port: u16,
    pub destination_port: u16,
    pub ttl: u8,
    pub identification: u16,
    pub payload_len: usize,
}

impl FrameTemplate {
    pub fn tcp(
        source: Ipv4Addr,
        destination: Ipv4Addr,
        source_port: u16,
        destination_port: u16,
        payload_len: usize,
    ) -> Self {
        Self {
            dst_mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            src_mac: [0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB],
            vlan_id: None,
            source,
            destination,
            protocol: Protocol::Tcp,
            source_port,
            destination_port,
            ttl: 64,
            identification: 0,
            payload_len,
        }
    }

    pub fn udp(
        source: Ipv4Addr,
        destination: Ipv4Addr,
        source_port: u16,
        destination_port: u16,
        payload_len: usize,
    ) -> Self {
        Self {
            protocol: Protocol::Udp,
            ..Self::tcp(source, destination, source_port, destination_port, payload_len)
        }
    }

    fn transport_header_len(&self) -> usize {
        match self.protocol {
            Protocol::Tcp => TCP_MIN_HEADER_LEN,
            Protocol::Udp => UDP_HEADER_LEN,
            _ => 0,
        }
    }

    /// IPv4 total length, saturated to the 16-bit field.
    pub fn total_length(&self) -> u16 {
        let len = IPV4_MIN_HEADER_LEN + self.transport_header_len() + self.payload_len;
        u16::try_from(len).unwrap_or(u16::MAX)
    }
}

/// Serialize a template into wire bytes.
pub fn encode_frame(t: &FrameTemplate) -> Vec<u8> {
    let total_length = t.total_length();
    let mut frame = Vec::with_capacity(usize::from(total_length) + 18);

    // Ethernet
    frame.extend_from_slice(&t.dst_mac);
    frame.extend_from_slice(&t.src_mac);
    if let Some(vid) = t.vlan_id {
        frame.extend_from_slice(&ETHERTYPE_VLAN.to_be_bytes());
        frame.extend_from_slice(&(vid & 0x0FFF).to_be_bytes());
    }
    frame.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());

    // IPv4
    let ip_start = frame.len();
    frame.push(0x45);
    frame.push(0);
    frame.extend_from_slice(&total_length.to_be_bytes());
    frame.extend_from_slice(&t.identification.to_be_bytes());
    frame.extend_from_slice(&0x4000u16.to_be_bytes()); // DF
    frame.push(t.ttl);
    frame.push(t.protocol.to_u8());
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(&t.source.octets());
    frame.extend_from_slice(&t.destination.octets());
    let checksum = ipv4_checksum(&frame[ip_start..]);
    frame[ip_start + 10..ip_start + 12].copy_from_slice(&checksum.to_be_bytes());

    // Transport
    match t.protocol {
        Protocol::Tcp => {
            frame.extend_from_slice(&t.source_port.to_be_bytes());
            frame.extend_from_slice(&t.destination_port.to_be_bytes());
            frame.extend_from_slice(&1u32.to_be_bytes());
            frame.extend_from_slice(&0u32.to_be_bytes());
            frame.push(5 << 4);
            frame.push(TcpFlags::ACK | TcpFlags::PSH);
            frame.extend_from_slice(&u16::MAX.to_be_bytes());
            frame.extend_from_slice(&[0, 0, 0, 0]);
        }
        Protocol::Udp => {
            let udp_len = u16::try_from(UDP_HEADER_LEN + t.payload_len).unwrap_or(u16::MAX);
            frame.extend_from_slice(&t.source_port.to_be_bytes());
            frame.extend_from_slice(&t.destination_port.to_be_bytes());
            frame.extend_from_slice(&udp_len.to_be_bytes());
            frame.extend_from_slice(&[0, 0]);
        }
        _ => {}
    }

    frame.extend((0..t.payload_len).map(|i| (i % 251) as u8));
    if frame.len() < MIN_FRAME_LEN {
        frame.resize(MIN_FRAME_LEN, 0);
    }
    frame
}

/// RFC 1071 one's complement checksum over an IPv4 header.
pub fn ipv4_checksum(header: &[u8]) -> u16 {
    let mut sum: u32 = header
        .chunks(2)
        .map(|pair| {
            let hi = u32::from(pair[0]) << 8;
            let lo = pair.get(1).copied().map_or(0, u32::from);
            hi | lo
        })
        .sum();
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}
