use std::future::Future;
use std::pin::Pin;

use domain::common::error::DomainError;
use domain::packet::entity::Chunk;
use ports::secondary::chunk_sink::ChunkSink;
use ports::secondary::chunk_source::ChunkSource;
use tokio::sync::mpsc;

/// Create a bounded chunk link: the sink half feeds the source half.
pub fn chunk_link(capacity: usize) -> (ChannelChunkSink, ChannelChunkSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelChunkSink::new(tx), ChannelChunkSource::new(rx))
}

/// Ingress side of a tokio channel. Ends when every sender is dropped.
pub struct ChannelChunkSource {
    rx: mpsc::Receiver<Chunk>,
}

impl ChannelChunkSource {
    pub fn new(rx: mpsc::Receiver<Chunk>) -> Self {
        Self { rx }
    }
}

impl ChunkSource for ChannelChunkSource {
    fn next_chunk<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Chunk>, DomainError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.rx.recv().await) })
    }
}

/// Egress side of a tokio channel. Waits for capacity, so a slow
/// consumer propagates backpressure upstream.
pub struct ChannelChunkSink {
    tx: Option<mpsc::Sender<Chunk>>,
}

impl ChannelChunkSink {
    pub fn new(tx: mpsc::Sender<Chunk>) -> Self {
        Self { tx: Some(tx) }
    }
}

impl ChunkSink for ChannelChunkSink {
    fn send_chunk<'a>(
        &'a mut self,
        chunk: Chunk,
    ) -> Pin<Box<dyn Future<Output = Result<(), DomainError>> + Send + 'a>> {
        Box::pin(async move {
            let tx = self
                .tx
                .as_ref()
                .ok_or_else(|| DomainError::Transport("egress link already closed".to_string()))?;
            tx.send(chunk)
                .await
                .map_err(|_| DomainError::Transport("egress receiver dropped".to_string()))
        })
    }

    fn close<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), DomainError>> + Send + 'a>> {
        Box::pin(async move {
            self.tx = None;
            Ok(())
        })
    }
}
