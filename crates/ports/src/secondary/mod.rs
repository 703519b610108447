pub mod chunk_sink;
pub mod chunk_source;
pub mod clock;
pub mod metrics_port;
