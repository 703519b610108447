use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use domain::common::error::DomainError;
use domain::packet::entity::Chunk;
use ports::secondary::chunk_sink::ChunkSink;
use ports::secondary::chunk_source::ChunkSource;

/// Chunk source backed by an in-memory queue.
#[derive(Debug, Default)]
pub struct MemoryChunkSource {
    chunks: VecDeque<Chunk>,
}

impl MemoryChunkSource {
    pub fn new(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
        }
    }

    /// Segment whole frames into `width`-byte chunks.
    pub fn from_frames<F: AsRef<[u8]>>(frames: &[F], width: usize) -> Self {
        Self::new(
            frames
                .iter()
                .flat_map(|frame| Chunk::segment(frame.as_ref(), width)),
        )
    }

    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl ChunkSource for MemoryChunkSource {
    fn next_chunk<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Chunk>, DomainError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.chunks.pop_front()) })
    }
}

/// Chunk sink that stores everything it receives.
///
/// Clones share storage, so a handle kept by the caller observes what the
/// pipeline wrote.
#[derive(Debug, Clone, Default)]
pub struct CollectingChunkSink {
    chunks: Arc<Mutex<Vec<Chunk>>>,
    closed: Arc<Mutex<bool>>,
}

impl CollectingChunkSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> Vec<Chunk> {
        self.chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reassemble the collected chunks into whole frames.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        let chunks = self.chunks.lock().unwrap_or_else(PoisonError::into_inner);
        let mut frames = Vec::new();
        let mut current = Vec::new();
        for chunk in chunks.iter() {
            if chunk.is_start() {
                current.clear();
            }
            current.extend_from_slice(chunk.bytes());
            if chunk.is_end() {
                frames.push(std::mem::take(&mut current));
            }
        }
        frames
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChunkSink for CollectingChunkSink {
    fn send_chunk<'a>(
        &'a mut self,
        chunk: Chunk,
    ) -> Pin<Box<dyn Future<Output = Result<(), DomainError>> + Send + 'a>> {
        Box::pin(async move {
            self.chunks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(chunk);
            Ok(())
        })
    }

    fn close<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), DomainError>> + Send + 'a>> {
        Box::pin(async move {
            *self.closed.lock().unwrap_or_else(PoisonError::into_inner) = true;
            Ok(())
        })
    }
}

/// Sink that only counts what passes through and logs each frame at trace.
#[derive(Debug, Default)]
pub struct CountingChunkSink {
    pub chunks: u64,
    pub frames: u64,
    pub bytes: u64,
}

impl ChunkSink for CountingChunkSink {
    fn send_chunk<'a>(
        &'a mut self,
        chunk: Chunk,
    ) -> Pin<Box<dyn Future<Output = Result<(), DomainError>> + Send + 'a>> {
        Box::pin(async move {
            self.chunks += 1;
            self.bytes += chunk.bytes().len() as u64;
            if chunk.is_end() {
                self.frames += 1;
                tracing::trace!(frames = self.frames, "frame emitted");
            }
            Ok(())
        })
    }

    fn close<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), DomainError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::debug!(
                chunks = self.chunks,
                frames = self.frames,
                bytes = self.bytes,
                "egress closed"
            );
            Ok(())
        })
    }
}
