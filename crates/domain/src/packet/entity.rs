use std::net::Ipv4Addr;

use serde::Serialize;

use crate::common::entity::Protocol;

// ── Header sizes ────────────────────────────────────────────────────

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const VLAN_TAG_LEN: usize = 4;
pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const TCP_MIN_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;

// ── EtherType values ────────────────────────────────────────────────

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_VLAN: u16 = 0x8100;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;

pub type MacAddr = [u8; 6];

// ── Chunk ───────────────────────────────────────────────────────────

/// Fixed-width transfer unit delivered by the transport.
///
/// Every chunk but the last of a frame carries exactly the link width;
/// the last one carries the valid byte count of the tail. Chunks are
/// immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    bytes: Vec<u8>,
    start_of_frame: bool,
    end_of_frame: bool,
}

impl Chunk {
    pub fn new(bytes: Vec<u8>, start_of_frame: bool, end_of_frame: bool) -> Self {
        Self {
            bytes,
            start_of_frame,
            end_of_frame,
        }
    }

    /// Split a complete frame into `width`-byte chunks tagged with
    /// start/end-of-frame. An empty frame yields a single empty chunk.
    pub fn segment(frame: &[u8], width: usize) -> Vec<Self> {
        let width = width.max(1);
        if frame.is_empty() {
            return vec![Self::new(Vec::new(), true, true)];
        }

        let count = frame.len().div_ceil(width);
        frame
            .chunks(width)
            .enumerate()
            .map(|(i, part)| Self::new(part.to_vec(), i == 0, i + 1 == count))
            .collect()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of valid bytes in this chunk.
    pub fn valid_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_start(&self) -> bool {
        self.start_of_frame
    }

    pub fn is_end(&self) -> bool {
        self.end_of_frame
    }
}

// ── Ethernet ────────────────────────────────────────────────────────

/// Next-header selection made by the Ethernet extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EtherType {
    Ipv4,
    Ipv6,
    Arp,
    Unsupported(u16),
}

impl EtherType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            ETHERTYPE_IPV4 => Self::Ipv4,
            ETHERTYPE_IPV6 => Self::Ipv6,
            ETHERTYPE_ARP => Self::Arp,
            other => Self::Unsupported(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EthernetHeader {
    pub dst_mac: MacAddr,
    pub src_mac: MacAddr,
    /// 802.1Q tag control information, when the frame is VLAN tagged.
    pub vlan_tci: Option<u16>,
    /// EtherType of the payload (inner type for tagged frames).
    pub ether_type: u16,
}

impl EthernetHeader {
    pub fn header_len(&self) -> usize {
        if self.vlan_tci.is_some() {
            ETHERNET_HEADER_LEN + VLAN_TAG_LEN
        } else {
            ETHERNET_HEADER_LEN
        }
    }

    pub fn vlan_id(&self) -> Option<u16> {
        self.vlan_tci.map(|tci| tci & 0x0FFF)
    }

    pub fn next_header(&self) -> EtherType {
        EtherType::from_u16(self.ether_type)
    }
}

// ── IPv4 ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ipv4Header {
    pub version: u8,
    /// Header length in 32-bit words.
    pub ihl: u8,
    pub type_of_service: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags: u8,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: Protocol,
    pub checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl Ipv4Header {
    pub fn header_len(&self) -> usize {
        usize::from(self.ihl) * 4
    }
}

// ── TCP ─────────────────────────────────────────────────────────────

/// TCP control bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TcpFlags(pub u8);

impl TcpFlags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
    pub const ECE: u8 = 0x40;
    pub const CWR: u8 = 0x80;

    pub fn contains(self, bits: u8) -> bool {
        self.0 & bits == bits
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TcpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence: u32,
    pub acknowledgement: u32,
    /// Header length in 32-bit words.
    pub data_offset: u8,
    pub flags: TcpFlags,
    pub window: u16,
    pub checksum: u16,
    pub urgent_pointer: u16,
}

impl TcpHeader {
    pub fn header_len(&self) -> usize {
        usize::from(self.data_offset) * 4
    }
}

// ── UDP ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UdpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub length: u16,
    pub checksum: u16,
}

// ── Feature vector ──────────────────────────────────────────────────

/// Per-packet features consumed by the admission controller.
///
/// Built once per well-formed packet and not retained after the
/// admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FeatureVector {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    /// Destination port, 0 when the protocol carries no ports.
    pub destination_port: u16,
    /// IPv4 total length (header + payload) in bytes.
    pub total_length: u16,
    pub protocol: Protocol,
}
