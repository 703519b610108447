use serde::Serialize;
use thiserror::Error;

use crate::common::error::DomainError;

/// Protocol layer at which feature extraction stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Chunk framing (start/end-of-frame tags, chunk widths).
    Framing,
    Ethernet,
    Ipv4,
    Tcp,
    Udp,
}

impl Layer {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Framing => "framing",
            Self::Ethernet => "ethernet",
            Self::Ipv4 => "ipv4",
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome class of a single extractor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseVerdict {
    Ok,
    Runt,
    Malformed,
    UnsupportedNextHeader,
}

impl ParseVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Runt => "runt",
            Self::Malformed => "malformed",
            Self::UnsupportedNextHeader => "unsupported",
        }
    }
}

/// Reasons a frame never becomes a `FeatureVector`.
///
/// All variants are local to the frame: the frame is dropped and the
/// statistics are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("{layer} runt: need {need} bytes, got {got}")]
    Runt {
        layer: Layer,
        need: usize,
        got: usize,
    },

    #[error("{layer} malformed: {reason}")]
    Malformed { layer: Layer, reason: &'static str },

    #[error("unsupported next header: ether type {ether_type:#06x}")]
    UnsupportedProtocol { ether_type: u16 },
}

impl PacketError {
    pub fn verdict(&self) -> ParseVerdict {
        match self {
            Self::Runt { .. } => ParseVerdict::Runt,
            Self::Malformed { .. } => ParseVerdict::Malformed,
            Self::UnsupportedProtocol { .. } => ParseVerdict::UnsupportedNextHeader,
        }
    }

    pub(crate) fn framing(reason: &'static str) -> Self {
        Self::Malformed {
            layer: Layer::Framing,
            reason,
        }
    }
}

impl From<PacketError> for DomainError {
    fn from(e: PacketError) -> Self {
        Self::MalformedInput(e.to_string())
    }
}
