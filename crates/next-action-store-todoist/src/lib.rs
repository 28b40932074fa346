//! Todoist sync API backend for next-action.

mod error;
pub mod state;
pub mod wire;

use std::time::Duration;

use next_action_core::{LabelUpdate, Snapshot};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use error::TodoistError;
pub use state::SyncState;
pub use wire::SyncResponse;

use wire::{ItemUpdateArgs, RESOURCE_TYPES, WireCommand, rejected_commands};

/// Current unified sync endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.todoist.com/api/v1/sync";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Todoist account reached through the sync endpoint.
///
/// Account state is mirrored in memory between calls so that only changes
/// are transferred after the first sync. Label updates are queued locally and
/// sent as one batch by [`TodoistStore::commit`].
pub struct TodoistStore {
    client: Client,
    endpoint: String,
    token: String,
    state: SyncState,
    queue: Vec<LabelUpdate>,
}

impl TodoistStore {
    /// Build a store for `token` against `endpoint`.
    ///
    /// # Errors
    /// Returns an error if the token is blank or the HTTP client cannot be built.
    pub fn new(token: impl Into<String>, endpoint: impl Into<String>) -> Result<Self, TodoistError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(TodoistError::MissingToken);
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("next-action/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
            state: SyncState::default(),
            queue: Vec::new(),
        })
    }

    /// Pull changes since the last sync and return the full current snapshot.
    ///
    /// # Errors
    /// Returns an error on transport failure, a rejected token, or an undecodable response.
    pub fn sync(&mut self) -> Result<Snapshot, TodoistError> {
        let sync_token = self.state.sync_token().to_owned();
        debug!(incremental = sync_token != wire::FULL_SYNC_TOKEN, "Syncing the current state from Todoist");
        let response: SyncResponse = self.post(&[
            ("sync_token", sync_token.as_str()),
            ("resource_types", RESOURCE_TYPES),
        ])?;
        self.state.merge(response);
        Ok(self.state.snapshot())
    }

    /// Stage a label update for the next commit.
    pub fn queue_label_update(&mut self, update: LabelUpdate) {
        debug!(task = %update.task, labels = update.labels.len(), "Queued label update");
        self.queue.push(update);
    }

    /// Number of staged updates.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Send every staged update in one request.
    ///
    /// The queue is emptied whether or not the request succeeds.
    ///
    /// # Errors
    /// Returns an error on transport failure or when any command is rejected.
    pub fn commit(&mut self) -> Result<usize, TodoistError> {
        let updates = std::mem::take(&mut self.queue);
        if updates.is_empty() {
            return Ok(0);
        }
        let commands: Vec<WireCommand> = updates
            .iter()
            .map(|update| WireCommand {
                kind: "item_update",
                uuid: Uuid::now_v7().to_string(),
                args: ItemUpdateArgs {
                    id: update.task.clone(),
                    labels: update.labels.iter().map(|label| label.as_str().to_owned()).collect(),
                    priority: update.priority,
                },
            })
            .collect();
        let body = serde_json::to_string(&commands)?;
        let response: SyncResponse = self.post(&[("commands", body.as_str())])?;

        let rejected = rejected_commands(&response.sync_status);
        if let Some((uuid, detail)) = rejected.first() {
            warn!(%uuid, %detail, "Todoist rejected a command");
            return Err(TodoistError::CommandsRejected {
                failed: rejected.len(),
                total: commands.len(),
                detail: detail.clone(),
            });
        }

        self.state.apply(&updates);
        info!(count = commands.len(), "Committed label updates");
        Ok(commands.len())
    }

    fn post<T: DeserializeOwned>(&self, form: &[(&str, &str)]) -> Result<T, TodoistError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .form(form)
            .send()?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TodoistError::Unauthorized);
        }
        let body = response.text()?;
        if !status.is_success() {
            return Err(TodoistError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use next_action_core::{LabelId, TaskId};

    #[test]
    fn blank_token_is_rejected() {
        assert!(matches!(
            TodoistStore::new("  ", DEFAULT_ENDPOINT),
            Err(TodoistError::MissingToken)
        ));
    }

    #[test]
    fn commit_with_empty_queue_sends_nothing() -> Result<(), TodoistError> {
        // Unroutable endpoint: any request would fail.
        let mut store = TodoistStore::new("token", "http://127.0.0.1:9/sync")?;
        assert_eq!(store.commit()?, 0);
        Ok(())
    }

    #[test]
    fn failed_commit_still_drains_queue() -> Result<(), TodoistError> {
        let mut store = TodoistStore::new("token", "http://127.0.0.1:9/sync")?;
        store.queue_label_update(LabelUpdate {
            task: TaskId::new("1"),
            labels: [LabelId::new("next_action")].into_iter().collect(),
            priority: None,
        });
        assert_eq!(store.queued(), 1);
        assert!(store.commit().is_err());
        assert_eq!(store.queued(), 0);
        Ok(())
    }
}
