use thiserror::Error;

/// Errors produced by the pairlink protocol and session layers.
#[derive(Debug, Error)]
pub enum PairError {
    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("negotiation error: {0}")]
    Negotiation(String),

    #[error("media error: {0}")]
    Media(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("timeout")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for PairError {
    fn from(e: serde_json::Error) -> Self {
        PairError::Codec(e.to_string())
    }
}

pub type PairResult<T> = Result<T, PairError>;
