//! Error types for the Admiral client.

use admiral_core::CoreError;
use thiserror::Error;

/// Errors that can occur when talking to the control plane.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connection refused, DNS, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// Missing or expired auth token.
    #[error("not authorized, run `admiral login` first")]
    Unauthorized,

    /// A response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The tracked task finished in the FAILED stage.
    #[error("task {task} failed: {message}")]
    TaskFailed { task: String, message: String },

    /// The tracked task was cancelled on the server.
    #[error("task {task} was cancelled")]
    TaskCancelled { task: String },

    /// The caller stopped waiting; the task keeps running on the server.
    #[error("stopped waiting for task {task}, it may still be running")]
    WaitAbandoned { task: String },

    /// The poll policy's attempt or time bound was exhausted.
    #[error("timed out waiting for task {task}")]
    WaitTimeout { task: String },

    /// The host presented a certificate that was not accepted.
    #[error("host certificate is not trusted, re-run with --accept-cert to trust it")]
    CertificateNotTrusted,

    /// Domain error.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
