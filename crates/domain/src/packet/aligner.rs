use crate::common::error::DomainError;

use super::entity::Chunk;
use super::error::PacketError;

/// Result of asking an aligner for the next `len` bytes of a frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Pull<'a> {
    /// The first `len` bytes at the current header boundary.
    Ready(&'a [u8]),
    /// Not enough bytes yet, but the frame is still open.
    NeedMore,
    /// The frame ended before `need` bytes were available.
    Truncated { need: usize, available: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Open,
    /// End-of-frame received; the carry holds the frame's tail.
    Ended,
}

/// Per-stage carry buffer that re-aligns a chunk stream to a header
/// boundary.
///
/// A stage pushes the chunks it receives, peeks and consumes its header
/// from the front, then drains the remainder as fresh `width`-byte chunks
/// starting at payload byte 0, ready for the next stage.
#[derive(Debug)]
pub struct StreamAligner {
    width: usize,
    carry: Vec<u8>,
    phase: Phase,
    emitted_first: bool,
}

impl StreamAligner {
    pub fn new(width: usize) -> Result<Self, DomainError> {
        validate_chunk_width(width)?;
        Ok(Self {
            width,
            carry: Vec::with_capacity(width * 2),
            phase: Phase::Idle,
            emitted_first: false,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Bytes buffered and not yet consumed or re-emitted.
    pub fn carried(&self) -> usize {
        self.carry.len()
    }

    pub fn is_open(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Append a chunk of the current frame.
    ///
    /// A start-of-frame chunk always begins a clean frame, discarding
    /// whatever was still open. Chunks outside a frame and short
    /// non-final chunks are rejected and leave the aligner idle.
    pub fn push(&mut self, chunk: &Chunk) -> Result<(), PacketError> {
        if chunk.is_start() {
            self.flush();
            self.phase = Phase::Open;
        } else if self.phase != Phase::Open {
            self.flush();
            return Err(PacketError::framing("chunk outside of a frame"));
        }

        if !chunk.is_end() && chunk.valid_len() != self.width {
            self.flush();
            return Err(PacketError::framing("non-final chunk shorter than link width"));
        }

        self.carry.extend_from_slice(chunk.bytes());
        if chunk.is_end() {
            self.phase = Phase::Ended;
        }
        Ok(())
    }

    pub fn peek(&self, len: usize) -> Pull<'_> {
        if self.carry.len() >= len {
            Pull::Ready(&self.carry[..len])
        } else if self.phase == Phase::Ended {
            Pull::Truncated {
                need: len,
                available: self.carry.len(),
            }
        } else {
            Pull::NeedMore
        }
    }

    /// Drop `len` header bytes from the front of the carry.
    pub fn consume(&mut self, len: usize) {
        let len = len.min(self.carry.len());
        self.carry.drain(..len);
    }

    /// Re-emit buffered bytes as the next aligned chunk, if one is due.
    ///
    /// Full chunks are emitted as soon as they are available; the tail
    /// (possibly empty) is emitted with end-of-frame once the frame has
    /// ended, after which the aligner is idle again.
    pub fn pop_aligned(&mut self) -> Option<Chunk> {
        let full = match self.phase {
            Phase::Idle => return None,
            Phase::Open => self.carry.len() >= self.width,
            Phase::Ended => self.carry.len() > self.width,
        };

        let start = !self.emitted_first;
        if full {
            let bytes: Vec<u8> = self.carry.drain(..self.width).collect();
            self.emitted_first = true;
            return Some(Chunk::new(bytes, start, false));
        }

        if self.phase == Phase::Ended {
            let bytes = std::mem::take(&mut self.carry);
            self.flush();
            return Some(Chunk::new(bytes, start, true));
        }

        None
    }

    /// Forget the current frame.
    pub fn flush(&mut self) {
        self.carry.clear();
        self.phase = Phase::Idle;
        self.emitted_first = false;
    }
}

/// Chunk widths must be a non-zero multiple of 4 bytes.
pub fn validate_chunk_width(width: usize) -> Result<(), DomainError> {
    if width < 4 || width % 4 != 0 {
        return Err(DomainError::InvalidConfig(format!(
            "chunk width must be a non-zero multiple of 4, got {width}"
        )));
    }
    Ok(())
}
