//! Snapshot data model shared by the reconciler and the backends.

use crate::id::{LabelId, ProjectId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Task priority on the backend's 1 (normal) to 4 (urgent) scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    /// Lowest priority, assigned to tasks that never had one set.
    pub const NORMAL: Self = Self(1);

    /// Build a priority, rejecting values outside `1..=4`.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if matches!(value, 1..=4) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Raw value sent to the backend.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("priority must be between 1 and 4, got {value}"))
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

/// Unordered set of label identifiers attached to a task.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeSet<LabelId>);

impl LabelSet {
    /// Empty label set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Whether `label` is a member.
    #[must_use]
    pub fn contains(&self, label: &LabelId) -> bool {
        self.0.contains(label)
    }

    /// Whether any member also appears in `labels`.
    #[must_use]
    pub fn contains_any(&self, labels: &BTreeSet<LabelId>) -> bool {
        self.0.iter().any(|label| labels.contains(label))
    }

    /// Add `label`; returns `true` when it was not present before.
    pub fn insert(&mut self, label: LabelId) -> bool {
        self.0.insert(label)
    }

    /// Remove `label`; returns `true` when it was present.
    pub fn remove(&mut self, label: &LabelId) -> bool {
        self.0.remove(label)
    }

    /// Iterate members in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &LabelId> {
        self.0.iter()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<LabelId> for LabelSet {
    fn from_iter<I: IntoIterator<Item = LabelId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a LabelId;
    type IntoIter = std::collections::btree_set::Iter<'a, LabelId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A task as seen in one sync snapshot.
///
/// The hierarchy is implicit: `indent` is the depth below the project root
/// (1 for top-level tasks) and `order` is the position in the project's
/// pre-order listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier of the task.
    pub id: TaskId,
    /// Display text.
    pub content: String,
    /// Owning project.
    pub project: ProjectId,
    /// Depth below the project root.
    pub indent: u32,
    /// Ordering key within the project.
    pub order: i64,
    /// Due date exactly as delivered by the backend.
    #[serde(default)]
    pub due: Option<String>,
    /// Completed.
    #[serde(default)]
    pub checked: bool,
    /// Deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Archived.
    #[serde(default)]
    pub archived: bool,
    /// Attached labels.
    #[serde(default)]
    pub labels: LabelSet,
    /// Current priority.
    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    /// Tasks that are neither checked, deleted nor archived take part in reconciliation.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !(self.checked || self.deleted || self.archived)
    }
}

/// A project as seen in one sync snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Identifier of the project.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Set by the backend for the user's inbox project.
    #[serde(default)]
    pub inbox: bool,
    /// Deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Archived.
    #[serde(default)]
    pub archived: bool,
}

impl Project {
    /// Deleted and archived projects are never visited.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        !(self.deleted || self.archived)
    }
}

/// A label definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Identifier referenced from [`Task::labels`].
    pub id: LabelId,
    /// Display name.
    pub name: String,
}

/// Everything pulled from the backend at the start of a cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// All known projects.
    pub projects: Vec<Project>,
    /// All known tasks, across projects.
    pub tasks: Vec<Task>,
    /// All known labels.
    pub labels: Vec<Label>,
}

impl Snapshot {
    /// Find a label by exact name.
    #[must_use]
    pub fn label_named(&self, name: &str) -> Option<&Label> {
        self.labels.iter().find(|label| label.name == name)
    }

    /// Labels whose name starts with `prefix`.
    #[must_use]
    pub fn labels_with_prefix(&self, prefix: char) -> BTreeSet<LabelId> {
        self.labels
            .iter()
            .filter(|label| label.name.starts_with(prefix))
            .map(|label| label.id.clone())
            .collect()
    }

    /// Open tasks of `project`, sorted by ordering key.
    #[must_use]
    pub fn open_tasks(&self, project: &ProjectId) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|task| &task.project == project && task.is_open())
            .collect();
        tasks.sort_by_key(|task| task.order);
        tasks
    }

    /// Apply label updates in place, as the backend would after a commit.
    pub fn apply(&mut self, updates: &[LabelUpdate]) {
        let by_task: BTreeMap<&TaskId, &LabelUpdate> =
            updates.iter().map(|update| (&update.task, update)).collect();
        for task in &mut self.tasks {
            if let Some(update) = by_task.get(&task.id) {
                task.labels = update.labels.clone();
                if let Some(priority) = update.priority {
                    task.priority = priority;
                }
            }
        }
    }
}

/// A staged change: replace a task's labels, optionally bumping its priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelUpdate {
    /// Target task.
    pub task: TaskId,
    /// Complete new label set.
    pub labels: LabelSet,
    /// New priority, when it changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, project: &str, order: i64) -> Task {
        Task {
            id: TaskId::new(id),
            content: id.to_owned(),
            project: ProjectId::new(project),
            indent: 1,
            order,
            ..Task::default()
        }
    }

    #[test]
    fn open_tasks_filters_closed_and_sorts_by_order() {
        let mut done = task("done", "p", 1);
        done.checked = true;
        let snapshot = Snapshot {
            tasks: vec![
                task("late", "p", 30),
                done,
                task("other", "q", 2),
                task("early", "p", 10),
            ],
            ..Snapshot::default()
        };

        let ids: Vec<&str> = snapshot
            .open_tasks(&ProjectId::new("p"))
            .into_iter()
            .map(|task| task.id.as_str())
            .collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn apply_replaces_labels_and_priority() {
        let mut snapshot = Snapshot {
            tasks: vec![task("a", "p", 1), task("b", "p", 2)],
            ..Snapshot::default()
        };
        let labels: LabelSet = [LabelId::new("next_action")].into_iter().collect();
        snapshot.apply(&[LabelUpdate {
            task: TaskId::new("b"),
            labels: labels.clone(),
            priority: Priority::new(4),
        }]);

        assert!(snapshot.tasks[0].labels.is_empty());
        assert_eq!(snapshot.tasks[1].labels, labels);
        assert_eq!(snapshot.tasks[1].priority.get(), 4);
    }

    #[test]
    fn priority_rejects_out_of_range_values() {
        assert!(Priority::new(0).is_none());
        assert!(Priority::new(5).is_none());
        assert_eq!(Priority::new(3).map(Priority::get), Some(3));
        assert!(serde_json::from_str::<Priority>("7").is_err());
    }

    #[test]
    fn labels_with_prefix_selects_location_labels() {
        let snapshot = Snapshot {
            labels: vec![
                Label {
                    id: LabelId::new("1"),
                    name: "@home".into(),
                },
                Label {
                    id: LabelId::new("2"),
                    name: "next_action".into(),
                },
            ],
            ..Snapshot::default()
        };
        let locations = snapshot.labels_with_prefix('@');
        assert_eq!(locations.len(), 1);
        assert!(locations.contains(&LabelId::new("1")));
    }
}
