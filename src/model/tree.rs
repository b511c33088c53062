//! Parent/child structure rebuilt from a flat task list on every load.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::task::{Task, TaskId, TaskRecord};

/// Tasks of one project, indexed by id, with sibling-ordered child lists.
#[derive(Debug, Clone, Default)]
pub struct TaskTree {
    tasks: HashMap<TaskId, Task>,
    children: HashMap<TaskId, Vec<TaskId>>,
    roots: Vec<TaskId>,
}

fn sibling_key(task: &Task) -> (i64, TaskId) {
    (task.sort_order, task.id)
}

impl TaskTree {
    /// Build the tree from already-validated tasks.
    ///
    /// A task whose parent is missing from the set becomes a root. Duplicate ids
    /// keep the first occurrence.
    pub fn build(tasks: Vec<Task>) -> Self {
        let mut by_id: HashMap<TaskId, Task> = HashMap::with_capacity(tasks.len());
        for task in tasks {
            if by_id.contains_key(&task.id) {
                warn!(task_id = task.id, "duplicate task id, keeping first row");
                continue;
            }
            by_id.insert(task.id, task);
        }

        let mut children: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        let mut roots = Vec::new();
        for task in by_id.values() {
            match task.parent_id {
                Some(pid) if by_id.contains_key(&pid) => {
                    children.entry(pid).or_default().push(task.id)
                }
                _ => roots.push(task.id),
            }
        }

        let order = |ids: &mut Vec<TaskId>| {
            ids.sort_by_key(|id| sibling_key(&by_id[id]));
        };
        order(&mut roots);
        for list in children.values_mut() {
            order(list);
        }

        Self {
            tasks: by_id,
            children,
            roots,
        }
    }

    /// Hydrate store rows, dropping the ones that cannot become tasks.
    pub fn from_records(records: impl IntoIterator<Item = TaskRecord>) -> Self {
        let tasks = records
            .into_iter()
            .filter_map(|row| match Task::try_from(row) {
                Ok(task) => Some(task),
                Err(e) => {
                    warn!(error = %e, "dropping task row");
                    None
                }
            })
            .collect();
        Self::build(tasks)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn children(&self, id: TaskId) -> &[TaskId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, id: TaskId) -> bool {
        !self.children(id).is_empty()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Siblings of `id` in display order, including `id` itself.
    pub fn siblings(&self, id: TaskId) -> &[TaskId] {
        match self.tasks.get(&id).and_then(|t| t.parent_id) {
            Some(pid) if self.tasks.contains_key(&pid) => self.children(pid),
            _ => &self.roots,
        }
    }

    /// Depth-first, sibling-ordered walk over every task, paired with its depth.
    pub fn flatten_all(&self) -> Vec<(TaskId, usize)> {
        self.walk(|_| true)
    }

    /// Depth-first walk that does not descend into collapsed tasks.
    /// This is the visible row order of the tree view and the chart.
    pub fn flatten_visible(&self) -> Vec<(TaskId, usize)> {
        self.walk(|task| task.is_expanded)
    }

    /// Iterative pre-order traversal. `descend` decides whether a task's children
    /// are emitted. Tasks caught in a parent cycle are never reached from a root
    /// and are left out.
    fn walk(&self, descend: impl Fn(&Task) -> bool) -> Vec<(TaskId, usize)> {
        let mut out = Vec::with_capacity(self.tasks.len());
        let mut seen: HashSet<TaskId> = HashSet::with_capacity(self.tasks.len());
        let mut stack: Vec<(TaskId, usize)> =
            self.roots.iter().rev().map(|id| (*id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            out.push((id, depth));
            let Some(task) = self.tasks.get(&id) else {
                continue;
            };
            if descend(task) {
                for child in self.children(id).iter().rev() {
                    stack.push((*child, depth + 1));
                }
            }
        }
        out
    }

    /// `id` followed by all of its descendants, depth-first.
    pub fn subtree(&self, id: TaskId) -> Vec<TaskId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if out.contains(&next) {
                continue;
            }
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// New dense sort orders for the sibling group of `id` after moving it one
    /// slot up (`offset < 0`) or down (`offset > 0`).
    ///
    /// Returns `None` when the move would leave the group.
    pub fn reorder_siblings(&self, id: TaskId, offset: isize) -> Option<Vec<(TaskId, i64)>> {
        let mut group = self.siblings(id).to_vec();
        let from = group.iter().position(|s| *s == id)?;
        let to = from.checked_add_signed(offset)?;
        if to >= group.len() || to == from {
            return None;
        }
        let moved = group.remove(from);
        group.insert(to, moved);
        Some(
            group
                .into_iter()
                .enumerate()
                .map(|(i, sid)| (sid, i as i64))
                .collect(),
        )
    }
}
