//! Error types for Todoist sync operations.

use thiserror::Error;

/// Errors that can occur while talking to the Todoist sync endpoint.
#[derive(Error, Debug)]
pub enum TodoistError {
    /// No API token was configured.
    #[error("Todoist API token is empty")]
    MissingToken,

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Todoist rejected the request with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The token was refused.
    #[error("Todoist rejected the API token")]
    Unauthorized,

    /// Failed to parse a sync response.
    #[error("Failed to decode sync response: {0}")]
    Decode(#[from] serde_json::Error),

    /// One or more queued commands were refused.
    #[error("{failed} of {total} queued commands were rejected: {detail}")]
    CommandsRejected {
        /// Number of rejected commands.
        failed: usize,
        /// Number of commands sent.
        total: usize,
        /// First rejection, for diagnostics.
        detail: String,
    },
}
