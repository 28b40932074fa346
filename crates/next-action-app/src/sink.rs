//! The storage seam the sync service runs against.

use anyhow::Error;
use next_action_core::{LabelUpdate, Snapshot};
use next_action_store_todoist::{TodoistError, TodoistStore};

/// Minimal backend abstraction required by [`crate::SyncService`].
pub trait ChangeSink {
    /// Error type bubbled up from the backend.
    type Error: Into<Error>;

    /// Pull the current projects, tasks and labels.
    ///
    /// # Errors
    /// Returns a backend-specific error on transport or authentication failure.
    fn snapshot(&mut self) -> Result<Snapshot, Self::Error>;

    /// Stage a label update; it becomes visible only after [`flush`](Self::flush).
    fn enqueue_label_update(&mut self, update: LabelUpdate);

    /// Send every staged update. Staged updates are discarded even on failure.
    ///
    /// # Errors
    /// Returns a backend-specific error when the commit fails.
    fn flush(&mut self) -> Result<usize, Self::Error>;

    /// Number of staged, unflushed updates.
    fn pending_count(&self) -> usize;
}

impl ChangeSink for TodoistStore {
    type Error = TodoistError;

    fn snapshot(&mut self) -> Result<Snapshot, Self::Error> {
        self.sync()
    }

    fn enqueue_label_update(&mut self, update: LabelUpdate) {
        self.queue_label_update(update);
    }

    fn flush(&mut self) -> Result<usize, Self::Error> {
        self.commit()
    }

    fn pending_count(&self) -> usize {
        self.queued()
    }
}
