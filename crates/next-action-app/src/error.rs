//! Error types for the sync service.

use thiserror::Error;

/// Errors raised while starting or running sync cycles.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A configured label is missing from the account. Fatal at startup.
    #[error("Label {0} doesn't exist, please create it or change the configured label")]
    LabelNotFound(String),

    /// Pulling the snapshot failed; the cycle was aborted before any change.
    #[error("Error trying to sync with Todoist: {0:#}")]
    Snapshot(anyhow::Error),

    /// Committing staged updates failed; they are lost for this cycle.
    #[error("Error committing changes to Todoist: {0:#}")]
    Commit(anyhow::Error),
}
