//! Domain types & marker reconciliation for next-action.

/// Project and task execution modes.
pub mod classify;
/// Implicit task trees.
pub mod hierarchy;
/// Identifier types.
pub mod id;
/// Snapshot data model.
pub mod model;
/// The reconciliation pass.
pub mod reconcile;
/// Due-date hiding.
pub mod visibility;

pub use classify::{Classifier, ExecutionMode, InboxMode, ProjectMode, UnknownInboxMode};
pub use hierarchy::{Hierarchy, children};
pub use id::{LabelId, ProjectId, TaskId};
pub use model::{Label, LabelSet, LabelUpdate, Priority, Project, Snapshot, Task};
pub use reconcile::{
    DEFAULT_LOCATION_PREFIX, MarkerLabels, ProjectOutcome, ReconcileOptions, ReconcilePlan, SkippedTask,
    reconcile,
};
pub use visibility::{DueDateError, VisibilityPolicy, is_future_hidden, parse_due};
