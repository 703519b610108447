use std::future::Future;
use std::pin::Pin;

use domain::common::error::DomainError;
use domain::packet::entity::Chunk;

/// Secondary port accepting admitted chunks, in order.
///
/// `send_chunk` may wait for capacity; the pipeline treats that wait as
/// backpressure and never drops an admitted chunk.
pub trait ChunkSink: Send {
    fn send_chunk<'a>(
        &'a mut self,
        chunk: Chunk,
    ) -> Pin<Box<dyn Future<Output = Result<(), DomainError>> + Send + 'a>>;

    /// Called once after the last chunk.
    fn close<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), DomainError>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Discard;

    impl ChunkSink for Discard {
        fn send_chunk<'a>(
            &'a mut self,
            _chunk: Chunk,
        ) -> Pin<Box<dyn Future<Output = Result<(), DomainError>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn chunk_sink_is_dyn_compatible() {
        let sink: Box<dyn ChunkSink> = Box::new(Discard);
        let _ = sink;
    }
}
