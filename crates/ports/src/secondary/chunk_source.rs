use std::future::Future;
use std::pin::Pin;

use domain::common::error::DomainError;
use domain::packet::entity::Chunk;

/// Secondary port delivering the inbound chunk stream, in order.
///
/// Uses `Pin<Box<dyn Future>>` return type (instead of RPITIT) so the trait
/// is dyn-compatible and can be used as `Box<dyn ChunkSource>`.
pub trait ChunkSource: Send {
    /// Next chunk, or `None` once the stream is exhausted.
    fn next_chunk<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Chunk>, DomainError>> + Send + 'a>>;
}
