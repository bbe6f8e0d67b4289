use crate::threading::ThreadingError;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, ThreadweaveError>;

#[derive(Error, Debug)]
pub enum ThreadweaveError {
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Logging setup error: {0}")]
    LoggingSetup(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Threading error: {0}")]
    Threading(#[from] ThreadingError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for ThreadweaveError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        ThreadweaveError::Other(anyhow::anyhow!(err.to_string()))
    }
}
