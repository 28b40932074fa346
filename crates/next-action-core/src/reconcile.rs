//! Computes which tasks carry the next-action marker.
//!
//! A project's tasks form an implicit tree (see [`crate::hierarchy`]). Inside a
//! managed project only leaves are actionable; internal tasks pass the marker
//! down to all of their children (parallel) or to the first child only
//! (serial). Top-level leaves follow the project's own mode. Every decision
//! depends only on the snapshot, so a second pass over a committed result
//! produces no updates.

use std::collections::{BTreeMap, BTreeSet};

use time::OffsetDateTime;

use crate::classify::{Classifier, ExecutionMode, ProjectMode};
use crate::hierarchy::Hierarchy;
use crate::id::{LabelId, ProjectId, TaskId};
use crate::model::{LabelSet, LabelUpdate, Priority, Snapshot, Task};
use crate::visibility::{DueDateError, VisibilityPolicy};

/// Default first character of location label names.
pub const DEFAULT_LOCATION_PREFIX: char = '@';

/// Tunables of a reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Project/task mode rules.
    pub classifier: Classifier,
    /// Due-date hiding rules.
    pub visibility: VisibilityPolicy,
    /// Remove the marker from every task of unmanaged projects.
    pub strip_unmanaged: bool,
    /// Priority given to a task when it gains the marker.
    pub marker_priority: Option<Priority>,
    /// Labels whose name starts with this character are locations.
    pub location_prefix: char,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            classifier: Classifier::default(),
            visibility: VisibilityPolicy::default(),
            strip_unmanaged: false,
            marker_priority: None,
            location_prefix: DEFAULT_LOCATION_PREFIX,
        }
    }
}

/// Labels resolved by name at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerLabels {
    /// The next-action marker.
    pub marker: LabelId,
    /// Applied to tasks without any location label, when configured.
    pub everywhere: Option<LabelId>,
}

/// Outcome of one pass.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    /// At most one update per task, in task id order.
    pub updates: Vec<LabelUpdate>,
    /// Tasks left untouched because their due date could not be read.
    pub skipped: Vec<SkippedTask>,
    /// Every live project with the mode it was handled in.
    pub projects: Vec<ProjectOutcome>,
}

impl ReconcilePlan {
    /// Whether the pass found nothing to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// A task whose marker state was not decided.
#[derive(Debug, Clone)]
pub struct SkippedTask {
    /// Skipped task.
    pub task: TaskId,
    /// Task text, for logs.
    pub content: String,
    /// Why it was skipped.
    pub error: DueDateError,
}

/// How a project was handled.
#[derive(Debug, Clone)]
pub struct ProjectOutcome {
    /// Project identifier.
    pub project: ProjectId,
    /// Project name, for logs.
    pub name: String,
    /// Resolved mode.
    pub mode: ProjectMode,
    /// Number of open tasks visited.
    pub tasks: usize,
}

/// Run a full pass over `snapshot`.
#[must_use]
pub fn reconcile(
    snapshot: &Snapshot,
    labels: &MarkerLabels,
    options: &ReconcileOptions,
    now: OffsetDateTime,
) -> ReconcilePlan {
    let mut locations = snapshot.labels_with_prefix(options.location_prefix);
    locations.remove(&labels.marker);
    if let Some(everywhere) = &labels.everywhere {
        locations.remove(everywhere);
    }

    let reconciler = Reconciler {
        labels,
        options,
        locations,
        now,
    };
    let mut drafts = Drafts::default();
    let mut plan = ReconcilePlan::default();

    for project in snapshot.projects.iter().filter(|project| project.is_live()) {
        let tasks = snapshot.open_tasks(&project.id);
        let mode = options.classifier.project_mode(project);
        reconciler.label_locations(&tasks, &mut drafts);
        match mode.execution() {
            Some(execution) => reconciler.place_markers(execution, &tasks, &mut drafts, &mut plan.skipped),
            None if options.strip_unmanaged => {
                for &task in &tasks {
                    reconciler.set_marker(task, false, &mut drafts);
                }
            }
            None => {}
        }
        plan.projects.push(ProjectOutcome {
            project: project.id.clone(),
            name: project.name.clone(),
            mode,
            tasks: tasks.len(),
        });
    }

    plan.updates = drafts.into_updates();
    plan
}

struct Reconciler<'a> {
    labels: &'a MarkerLabels,
    options: &'a ReconcileOptions,
    locations: BTreeSet<LabelId>,
    now: OffsetDateTime,
}

/// Per-task outcome of the visibility check.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Shown,
    Hidden,
    Unreadable,
}

impl Reconciler<'_> {
    fn label_locations<'t>(&self, tasks: &[&'t Task], drafts: &mut Drafts<'t>) {
        let Some(everywhere) = &self.labels.everywhere else {
            return;
        };
        for &task in tasks {
            let draft = drafts.entry(task);
            if task.labels.contains_any(&self.locations) {
                draft.labels.remove(everywhere);
            } else {
                draft.labels.insert(everywhere.clone());
            }
        }
    }

    fn place_markers<'t>(
        &self,
        project_mode: ExecutionMode,
        tasks: &[&'t Task],
        drafts: &mut Drafts<'t>,
        skipped: &mut Vec<SkippedTask>,
    ) {
        let hierarchy = Hierarchy::build(tasks);
        let modes: Vec<Option<ExecutionMode>> = tasks
            .iter()
            .map(|task| self.options.classifier.item_mode(task))
            .collect();
        let visibility: Vec<Visibility> = tasks
            .iter()
            .zip(&modes)
            .map(|(task, &mode)| match self.options.visibility.is_hidden(task, mode, self.now) {
                Ok(true) => Visibility::Hidden,
                Ok(false) => Visibility::Shown,
                Err(error) => {
                    skipped.push(SkippedTask {
                        task: task.id.clone(),
                        content: task.content.clone(),
                        error,
                    });
                    Visibility::Unreadable
                }
            })
            .collect();

        // Parents precede their children, so a single forward pass sees each
        // parent's eligibility before any of its children.
        let first_root = hierarchy.roots().first().copied();
        let mut eligible: Vec<Option<bool>> = Vec::with_capacity(tasks.len());
        for (idx, task) in tasks.iter().enumerate() {
            let decided = if task.indent == 1 {
                Some(match project_mode {
                    ExecutionMode::Parallel => true,
                    ExecutionMode::Serial => first_root == Some(idx),
                })
            } else if let Some(parent) = hierarchy.parent(idx) {
                match (visibility[parent], eligible[parent]) {
                    (Visibility::Unreadable, _) | (_, None) => None,
                    (Visibility::Hidden, _) | (_, Some(false)) => Some(false),
                    (Visibility::Shown, Some(true)) => Some(match modes[parent] {
                        Some(ExecutionMode::Serial) => hierarchy.children(parent).first() == Some(&idx),
                        Some(ExecutionMode::Parallel) | None => true,
                    }),
                }
            } else {
                None
            };
            eligible.push(decided);
        }

        for (idx, &task) in tasks.iter().enumerate() {
            let desired = match visibility[idx] {
                Visibility::Unreadable => None,
                Visibility::Hidden => Some(false),
                Visibility::Shown if modes[idx].is_some() || hierarchy.has_children(idx) => Some(false),
                Visibility::Shown => eligible[idx],
            };
            if let Some(desired) = desired {
                self.set_marker(task, desired, drafts);
            }
        }
    }

    fn set_marker<'t>(&self, task: &'t Task, present: bool, drafts: &mut Drafts<'t>) {
        let draft = drafts.entry(task);
        if present {
            draft.labels.insert(self.labels.marker.clone());
            if !task.labels.contains(&self.labels.marker)
                && let Some(priority) = self.options.marker_priority
                && priority != task.priority
            {
                draft.priority = Some(priority);
            }
        } else {
            draft.labels.remove(&self.labels.marker);
            draft.priority = None;
        }
    }
}

struct Draft<'t> {
    task: &'t Task,
    labels: LabelSet,
    priority: Option<Priority>,
}

#[derive(Default)]
struct Drafts<'t>(BTreeMap<&'t TaskId, Draft<'t>>);

impl<'t> Drafts<'t> {
    fn entry(&mut self, task: &'t Task) -> &mut Draft<'t> {
        self.0.entry(&task.id).or_insert_with(|| Draft {
            task,
            labels: task.labels.clone(),
            priority: None,
        })
    }

    fn into_updates(self) -> Vec<LabelUpdate> {
        self.0
            .into_values()
            .filter(|draft| draft.labels != draft.task.labels || draft.priority.is_some())
            .map(|draft| LabelUpdate {
                task: draft.task.id.clone(),
                labels: draft.labels,
                priority: draft.priority,
            })
            .collect()
    }
}
