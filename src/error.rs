use std::io;

/// Failure at a network boundary. None of these abort a run; callers degrade
/// them into failed attempts or skipped items.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("connection to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("connection to {endpoint} timed out")]
    Timeout { endpoint: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("{0} is not available")]
    Unavailable(String),
}

/// Error escaping a stage of the reconnaissance run. The orchestrator turns it
/// into a failed attempt and moves on to the next stage.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Network(#[from] NetworkError),
}
