//! Worker-specific error types.

use std::io;
use thiserror::Error;

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors that can occur while talking to the graph worker.
///
/// None of these reach the view: the service answers every failed request by
/// computing it on the calling task instead.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The worker thread could not be started.
    #[error("failed to spawn graph worker: {0}")]
    SpawnFailed(#[source] io::Error),

    /// A response channel was dropped without an answer.
    #[error("response channel closed unexpectedly")]
    ChannelClosed,

    /// The worker thread exited (or panicked) with requests still pending.
    #[error("graph worker exited unexpectedly")]
    WorkerExited,

    #[error("failed to serialize request: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    #[error("failed to deserialize response: {0}")]
    DeserializeFailed(#[source] serde_json::Error),

    /// The worker answered with an error.
    #[error("worker error: {0}")]
    Remote(String),
}

impl WorkerError {
    /// Check if this error indicates the worker is gone.
    pub fn is_worker_exited(&self) -> bool {
        matches!(self, Self::WorkerExited | Self::ChannelClosed)
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for WorkerError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_classification() {
        assert!(WorkerError::WorkerExited.is_worker_exited());
        assert!(WorkerError::ChannelClosed.is_worker_exited());
        assert!(!WorkerError::Remote("bad layout".to_string()).is_worker_exited());
        assert_eq!(
            WorkerError::Remote("bad layout".to_string()).to_string(),
            "worker error: bad layout"
        );
    }
}
