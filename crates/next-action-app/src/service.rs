use next_action_core::{LabelId, MarkerLabels, ReconcileOptions, Snapshot, reconcile};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::config::LabelNames;
use crate::error::ServiceError;
use crate::sink::ChangeSink;

/// Summary of one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Managed projects visited.
    pub managed_projects: usize,
    /// Updates staged by the reconciler.
    pub staged: usize,
    /// Updates the sink reported as committed.
    pub committed: usize,
    /// Tasks left untouched because of unreadable due dates.
    pub skipped: usize,
}

/// Runs reconciliation cycles against a [`ChangeSink`].
pub struct SyncService<S> {
    sink: S,
    labels: MarkerLabels,
    options: ReconcileOptions,
}

impl<S> SyncService<S> {
    /// Label ids resolved at startup.
    pub const fn labels(&self) -> &MarkerLabels {
        &self.labels
    }

    /// Options every cycle runs with.
    pub const fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Underlying sink.
    pub const fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: ChangeSink> SyncService<S> {
    /// Perform the initial sync and resolve the configured labels.
    ///
    /// # Errors
    /// Returns an error if the initial sync fails or a configured label is missing.
    pub fn start(mut sink: S, names: &LabelNames, options: ReconcileOptions) -> Result<Self, ServiceError> {
        let snapshot = sink
            .snapshot()
            .map_err(|err| ServiceError::Snapshot(err.into()))?;
        let labels = resolve_labels(&snapshot, names)?;
        debug!(label = %labels.marker, "Resolved marker label");
        if let Some(everywhere) = &labels.everywhere {
            debug!(label = %everywhere, "Resolved everywhere label");
        }
        info!(
            projects = snapshot.projects.len(),
            tasks = snapshot.tasks.len(),
            "Initial sync complete"
        );
        Ok(Self { sink, labels, options })
    }

    /// Run one cycle: pull a snapshot, reconcile, stage and commit.
    ///
    /// Nothing is committed when the snapshot cannot be pulled.
    ///
    /// # Errors
    /// Returns an error if the snapshot or the commit fails.
    pub fn run_cycle(&mut self, now: OffsetDateTime) -> Result<CycleReport, ServiceError> {
        let snapshot = self
            .sink
            .snapshot()
            .map_err(|err| ServiceError::Snapshot(err.into()))?;
        let plan = reconcile(&snapshot, &self.labels, &self.options, now);

        let mut report = CycleReport::default();
        for project in &plan.projects {
            if project.mode.execution().is_some() {
                report.managed_projects += 1;
            }
            debug!(project = %project.name, mode = %project.mode, tasks = project.tasks, "Processed project");
        }
        for skipped in &plan.skipped {
            warn!(task = %skipped.task, content = %skipped.content, error = %skipped.error, "Skipping task");
        }
        report.skipped = plan.skipped.len();

        report.staged = plan.updates.len();
        for update in plan.updates {
            self.sink.enqueue_label_update(update);
        }

        let pending = self.sink.pending_count();
        if pending == 0 {
            debug!("No changes queued, skipping sync");
            return Ok(report);
        }
        debug!(pending, "Changes queued for sync, committing");
        report.committed = self
            .sink
            .flush()
            .map_err(|err| ServiceError::Commit(err.into()))?;
        Ok(report)
    }
}

/// Look up the configured labels in `snapshot`.
///
/// # Errors
/// Returns [`ServiceError::LabelNotFound`] naming the first missing label.
pub fn resolve_labels(snapshot: &Snapshot, names: &LabelNames) -> Result<MarkerLabels, ServiceError> {
    let find = |name: &str| -> Result<LabelId, ServiceError> {
        snapshot
            .label_named(name)
            .map(|label| label.id.clone())
            .ok_or_else(|| ServiceError::LabelNotFound(name.to_owned()))
    };
    Ok(MarkerLabels {
        marker: find(&names.marker)?,
        everywhere: names.everywhere.as_deref().map(find).transpose()?,
    })
}
