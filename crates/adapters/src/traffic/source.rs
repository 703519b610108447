use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use domain::common::error::DomainError;
use domain::packet::entity::Chunk;
use ports::secondary::chunk_source::ChunkSource;

use super::scenario::TimedFrame;
use crate::clock::ReplayClock;

/// Replays timestamped frames as chunks.
///
/// The shared `ReplayClock` is moved to a frame's timestamp when its
/// first chunk is handed out, so a reader sampling the clock while that
/// frame is being classified sees the capture time.
pub struct ReplaySource {
    frames: Vec<TimedFrame>,
    next: usize,
    /// Capture length; `Some` makes the replay wrap around forever.
    period_ns: Option<u64>,
    lap: u64,
    pending: VecDeque<Chunk>,
    width: usize,
    clock: ReplayClock,
    frames_replayed: u64,
}

impl ReplaySource {
    pub fn new(frames: Vec<TimedFrame>, width: usize, clock: ReplayClock) -> Self {
        Self {
            frames,
            next: 0,
            period_ns: None,
            lap: 0,
            pending: VecDeque::new(),
            width,
            clock,
            frames_replayed: 0,
        }
    }

    /// Restart from the first frame after the last one, shifting
    /// timestamps by `period_ns` on every lap.
    #[must_use]
    pub fn looping(mut self, period_ns: u64) -> Self {
        self.period_ns = Some(period_ns);
        self
    }

    fn next_frame(&mut self) -> Option<(u64, &[u8])> {
        if self.next == self.frames.len() {
            if self.period_ns.is_none() || self.frames.is_empty() {
                return None;
            }
            self.next = 0;
            self.lap += 1;
            tracing::debug!(lap = self.lap, "replay wrapped around");
        }
        let offset = self.lap.saturating_mul(self.period_ns.unwrap_or(0));
        let frame = &self.frames[self.next];
        self.next += 1;
        Some((frame.timestamp_ns.saturating_add(offset), &frame.bytes))
    }

    pub fn frames_replayed(&self) -> u64 {
        self.frames_replayed
    }
}

impl ChunkSource for ReplaySource {
    fn next_chunk<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Chunk>, DomainError>> + Send + 'a>> {
        Box::pin(async move {
            if self.pending.is_empty() {
                let width = self.width;
                let Some((timestamp_ns, bytes)) = self.next_frame() else {
                    tracing::debug!(frames = self.frames_replayed, "replay finished");
                    return Ok(None);
                };
                let chunks = Chunk::segment(bytes, width);
                self.clock.advance_to(timestamp_ns);
                self.pending.extend(chunks);
                self.frames_replayed += 1;
            }
            Ok(self.pending.pop_front())
        })
    }
}
