use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("engine error: {0}")]
    EngineError(String),
}
