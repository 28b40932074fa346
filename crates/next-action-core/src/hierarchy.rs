//! Parent/child relations recovered from a flat, indent-encoded task list.

use crate::model::Task;

/// Direct children of `parent` (or of the project root when `None`).
///
/// `items` must be sorted by ordering key. A child sits at `parent.indent + 1`
/// after the parent and before the next task whose indent is at most the
/// parent's. Returns an empty list when `parent` is not in `items`.
#[must_use]
pub fn children<'a>(items: &[&'a Task], parent: Option<&Task>) -> Vec<&'a Task> {
    let Some(parent) = parent else {
        return items.iter().copied().filter(|task| task.indent == 1).collect();
    };
    let Some(start) = items.iter().position(|task| task.id == parent.id) else {
        return Vec::new();
    };
    items
        .iter()
        .skip(start + 1)
        .copied()
        .take_while(|task| task.indent > parent.indent)
        .filter(|task| task.indent == parent.indent + 1)
        .collect()
}

/// Child lists for every task of one project, built in a single pass.
///
/// Positions refer to indexes into the slice given to [`Hierarchy::build`]
/// and agree with [`children`] for every task.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    roots: Vec<usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl Hierarchy {
    /// Index `items`, which must be sorted by ordering key.
    #[must_use]
    pub fn build(items: &[&Task]) -> Self {
        let mut roots = Vec::new();
        let mut parents = vec![None; items.len()];
        let mut children = vec![Vec::new(); items.len()];
        // Indexes of the open ancestors of the current position, indents strictly increasing.
        let mut open: Vec<(usize, u32)> = Vec::new();

        for (idx, task) in items.iter().enumerate() {
            while open.last().is_some_and(|&(_, indent)| indent >= task.indent) {
                open.pop();
            }
            if task.indent == 1 {
                roots.push(idx);
            }
            if let Some(&(parent, indent)) = open.last()
                && indent + 1 == task.indent
            {
                parents[idx] = Some(parent);
                children[parent].push(idx);
            }
            open.push((idx, task.indent));
        }

        Self {
            roots,
            parents,
            children,
        }
    }

    /// Positions of tasks at indent 1.
    #[must_use]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Position of the parent of the task at `idx`, if it has one.
    #[must_use]
    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.parents.get(idx).copied().flatten()
    }

    /// Positions of the direct children of the task at `idx`.
    #[must_use]
    pub fn children(&self, idx: usize) -> &[usize] {
        self.children.get(idx).map_or(&[], Vec::as_slice)
    }

    /// Whether the task at `idx` has at least one child.
    #[must_use]
    pub fn has_children(&self, idx: usize) -> bool {
        !self.children(idx).is_empty()
    }
}
