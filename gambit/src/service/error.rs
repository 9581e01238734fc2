use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("io error")]
    IoError(#[from] tokio::io::Error),
    #[error("move service process is missing its {0} pipe")]
    MissingPipe(&'static str),
    #[error("move service unexpectedly exited")]
    UnexpectedTermination,
    #[error("move service unavailable: {0}")]
    Unavailable(String),
    #[error("move service did not respond within {0:?}")]
    Timeout(Duration)
}
