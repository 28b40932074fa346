//! In-memory mirror of the account, kept current by incremental syncs.

use std::collections::{BTreeMap, BTreeSet};

use next_action_core::{Label, LabelId, LabelUpdate, Project, ProjectId, Snapshot, Task, TaskId};
use tracing::debug;

use crate::wire::{FULL_SYNC_TOKEN, SyncResponse, WireItem, WireLabel, WireProject};

/// Projects, items and labels as last reported by the sync endpoint.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    sync_token: Option<String>,
    projects: BTreeMap<ProjectId, WireProject>,
    items: BTreeMap<TaskId, WireItem>,
    labels: BTreeMap<LabelId, WireLabel>,
}

impl SyncState {
    /// Token for the next request; `*` until the first sync completes.
    #[must_use]
    pub fn sync_token(&self) -> &str {
        self.sync_token.as_deref().unwrap_or(FULL_SYNC_TOKEN)
    }

    /// Fold a sync response into the mirror. Deleted records and completed
    /// items are dropped.
    pub fn merge(&mut self, response: SyncResponse) {
        if response.full_sync {
            self.projects.clear();
            self.items.clear();
            self.labels.clear();
        }
        debug!(
            full_sync = response.full_sync,
            projects = response.projects.len(),
            items = response.items.len(),
            labels = response.labels.len(),
            "Merging sync response"
        );
        for project in response.projects {
            if project.is_deleted {
                self.projects.remove(&project.id);
            } else {
                self.projects.insert(project.id.clone(), project);
            }
        }
        for item in response.items {
            if item.is_deleted || item.checked {
                self.items.remove(&item.id);
            } else {
                self.items.insert(item.id.clone(), item);
            }
        }
        for label in response.labels {
            if label.is_deleted {
                self.labels.remove(&label.id);
            } else {
                self.labels.insert(label.id.clone(), label);
            }
        }
        if response.sync_token.is_some() {
            self.sync_token = response.sync_token;
        }
    }

    /// Reflect committed label updates before the next sync confirms them.
    pub fn apply(&mut self, updates: &[LabelUpdate]) {
        for update in updates {
            if let Some(item) = self.items.get_mut(&update.task) {
                item.labels = update.labels.iter().map(|label| label.as_str().to_owned()).collect();
                if let Some(priority) = update.priority {
                    item.priority = Some(priority);
                }
            }
        }
    }

    /// Flatten the mirror into the indent/order model.
    ///
    /// Items are listed per project in tree pre-order: `indent` is the depth
    /// (1 for top-level items) and `order` the position in that listing.
    /// Labels are identified by name, which is how items reference them.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let projects = self
            .projects
            .values()
            .map(|project| Project {
                id: project.id.clone(),
                name: project.name.clone(),
                inbox: project.inbox_project,
                deleted: project.is_deleted,
                archived: project.is_archived,
            })
            .collect();

        let labels = self
            .labels
            .values()
            .map(|label| Label {
                id: LabelId::new(label.name.clone()),
                name: label.name.clone(),
            })
            .collect();

        let mut by_project: BTreeMap<&ProjectId, Vec<&WireItem>> = BTreeMap::new();
        for item in self.items.values() {
            by_project.entry(&item.project_id).or_default().push(item);
        }
        let tasks = by_project
            .into_values()
            .flat_map(|items| flatten_project(&items))
            .collect();

        Snapshot {
            projects,
            tasks,
            labels,
        }
    }
}

fn flatten_project(items: &[&WireItem]) -> Vec<Task> {
    let known: BTreeSet<&TaskId> = items.iter().map(|item| &item.id).collect();
    let mut roots: Vec<&WireItem> = Vec::new();
    let mut children: BTreeMap<&TaskId, Vec<&WireItem>> = BTreeMap::new();
    for &item in items {
        match &item.parent_id {
            Some(parent) if known.contains(parent) => children.entry(parent).or_default().push(item),
            _ => roots.push(item),
        }
    }
    let by_position = |a: &&WireItem, b: &&WireItem| a.child_order.cmp(&b.child_order).then_with(|| a.id.cmp(&b.id));
    roots.sort_by(by_position);
    for siblings in children.values_mut() {
        siblings.sort_by(by_position);
    }

    let mut tasks = Vec::with_capacity(items.len());
    let mut visited: BTreeSet<&TaskId> = BTreeSet::new();
    // Reversed so the first sibling is popped first.
    let mut pending: Vec<(&WireItem, u32)> = roots.iter().rev().map(|&item| (item, 1)).collect();
    while let Some((item, indent)) = pending.pop() {
        if !visited.insert(&item.id) {
            continue;
        }
        tasks.push(to_task(item, indent, tasks.len()));
        if let Some(kids) = children.get(&item.id) {
            pending.extend(kids.iter().rev().map(|&kid| (kid, indent + 1)));
        }
    }
    tasks
}

fn to_task(item: &WireItem, indent: u32, position: usize) -> Task {
    Task {
        id: item.id.clone(),
        content: item.content.clone(),
        project: item.project_id.clone(),
        indent,
        order: i64::try_from(position).unwrap_or(i64::MAX),
        due: item.due.as_ref().map(|due| due.date.clone()),
        checked: item.checked,
        deleted: item.is_deleted,
        archived: item.is_archived,
        labels: item.labels.iter().map(|name| LabelId::new(name.clone())).collect(),
        priority: item.priority.unwrap_or_default(),
    }
}
