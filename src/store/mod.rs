//! SQLite persistence for projects, tasks and dependency links.
//!
//! The store hands out raw [`TaskRecord`]s; turning them into validated tasks is
//! the model's job, so a damaged row never stops the rest of a project from
//! loading.

pub mod error;
pub mod schema;

use std::path::Path;

use chrono::{Duration, NaiveDate};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, info};

pub use error::{Result, StoreError};

use crate::model::{Dependency, DependencyKind, Project, ProjectId, TaskId, TaskRecord};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Read a column that may be missing or NULL without failing the row.
fn opt<T: rusqlite::types::FromSql>(row: &Row<'_>, column: &str) -> Option<T> {
    row.get::<_, Option<T>>(column).ok().flatten()
}

fn task_from_row(row: &Row<'_>) -> TaskRecord {
    TaskRecord {
        id: opt(row, "id"),
        project_id: opt(row, "project_id"),
        parent_id: opt(row, "parent_id"),
        name: opt(row, "name"),
        description: opt(row, "description"),
        start_date: opt(row, "start_date"),
        end_date: opt(row, "end_date"),
        progress: opt(row, "progress"),
        is_milestone: opt(row, "is_milestone"),
        is_expanded: opt(row, "is_expanded"),
        sort_order: opt(row, "sort_order"),
        color: opt(row, "color"),
        assignee: opt(row, "assignee"),
        baseline_start_date: opt(row, "baseline_start_date"),
        baseline_end_date: opt(row, "baseline_end_date"),
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: opt(row, "description").unwrap_or_default(),
        created_at: opt(row, "created_at"),
        updated_at: opt(row, "updated_at"),
    })
}

fn dependency_from_row(row: &Row<'_>) -> rusqlite::Result<Dependency> {
    let code: Option<String> = row.get("dependency_type")?;
    Ok(Dependency {
        predecessor: row.get("predecessor_id")?,
        successor: row.get("successor_id")?,
        kind: DependencyKind::from_code(code.as_deref().unwrap_or("FS")),
    })
}

/// Fields for a task about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub parent_id: Option<TaskId>,
    pub name: String,
    pub description: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub progress: u8,
    pub is_milestone: bool,
    pub color: Option<String>,
    pub assignee: Option<String>,
}

impl NewTask {
    pub fn new(project_id: ProjectId, name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            project_id,
            parent_id: None,
            name: name.into(),
            description: String::new(),
            start,
            end,
            progress: 0,
            is_milestone: false,
            color: None,
            assignee: None,
        }
    }
}

/// Partial update of a task. `None` leaves a column untouched; the nested
/// options of nullable columns distinguish "clear" from "keep".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub progress: Option<u8>,
    pub is_milestone: Option<bool>,
    pub is_expanded: Option<bool>,
    pub parent_id: Option<Option<TaskId>>,
    pub sort_order: Option<i64>,
    pub color: Option<Option<String>>,
    pub assignee: Option<Option<String>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Owns the SQLite connection.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file at `path` and migrate it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened task database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let added = schema::initialize(&conn)?;
        if !added.is_empty() {
            info!(columns = ?added, "migrated schema");
        }
        Ok(Self { conn })
    }

    // ── Projects ──────────────────────────────────────────────────────────

    pub fn create_project(&self, name: &str, description: &str) -> Result<ProjectId> {
        self.conn.execute(
            "INSERT INTO projects (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(project_id = id, name, "created project");
        Ok(id)
    }

    /// All projects, newest first.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM projects ORDER BY created_at DESC, id DESC")?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row("SELECT * FROM projects WHERE id = ?1", params![id], project_from_row)
            .optional()?;
        Ok(project)
    }

    /// The newest project, or a freshly created default project seeded with
    /// sample tasks relative to `today` when the database is empty.
    pub fn first_or_create_default(&self, today: NaiveDate) -> Result<Project> {
        if let Some(project) = self.list_projects()?.into_iter().next() {
            return Ok(project);
        }
        let id = self.create_project("Default Project", "Gantt chart project")?;
        self.seed_sample_tasks(id, today)?;
        self.get_project(id)?
            .ok_or_else(|| StoreError::project_not_found(id))
    }

    fn seed_sample_tasks(&self, project_id: ProjectId, today: NaiveDate) -> Result<()> {
        let day = |n: i64| today + Duration::days(n);
        let task = |name: &str, start: i64, end: i64, progress: u8| NewTask {
            progress,
            ..NewTask::new(project_id, name, day(start), day(end))
        };

        let planning = self.create_task(&task("Project planning", 0, 5, 100))?;
        let design = self.create_task(&task("Design phase", 6, 15, 60))?;
        self.create_task(&NewTask {
            parent_id: Some(design),
            ..task("Requirements", 6, 9, 100)
        })?;
        self.create_task(&NewTask {
            parent_id: Some(design),
            ..task("Architecture", 10, 15, 50)
        })?;
        let build = self.create_task(&task("Implementation", 16, 30, 20))?;
        self.create_task(&NewTask {
            is_milestone: true,
            ..task("Release", 31, 31, 0)
        })?;

        self.create_dependency(planning, design, DependencyKind::FinishToStart)?;
        self.create_dependency(design, build, DependencyKind::FinishToStart)?;
        info!(project_id, "seeded sample tasks");
        Ok(())
    }

    // ── Tasks ─────────────────────────────────────────────────────────────

    /// Insert a task after its current siblings. Milestones are stored with
    /// `end == start`.
    pub fn create_task(&self, task: &NewTask) -> Result<TaskId> {
        let end = if task.is_milestone {
            task.start
        } else {
            task.end.max(task.start)
        };
        let sort_order: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM tasks
             WHERE project_id = ?1 AND parent_id IS ?2",
            params![task.project_id, task.parent_id],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO tasks (project_id, parent_id, name, description, start_date, end_date,
                                progress, is_milestone, sort_order, color, assignee)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                task.project_id,
                task.parent_id,
                task.name,
                task.description,
                fmt_date(task.start),
                fmt_date(end),
                task.progress.min(100),
                task.is_milestone,
                sort_order,
                task.color.as_deref().filter(|s| !s.is_empty()),
                task.assignee.as_deref().filter(|s| !s.is_empty()),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(task_id = id, name = %task.name, "created task");
        Ok(id)
    }

    /// Raw rows of a project in `sort_order, id` order.
    pub fn list_tasks(&self, project_id: ProjectId) -> Result<Vec<TaskRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM tasks WHERE project_id = ?1 ORDER BY sort_order, id")?;
        let rows = stmt
            .query_map(params![project_id], |row| Ok(task_from_row(row)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_task(&self, id: TaskId) -> Result<Option<TaskRecord>> {
        let row = self
            .conn
            .query_row("SELECT * FROM tasks WHERE id = ?1", params![id], |row| {
                Ok(task_from_row(row))
            })
            .optional()?;
        Ok(row)
    }

    /// Apply a partial update. Returns `false` when the task does not exist.
    pub fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(self.get_task(id)?.is_some());
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(name) = &update.name {
            sets.push("name = ?");
            values.push(Box::new(name.clone()));
        }
        if let Some(description) = &update.description {
            sets.push("description = ?");
            values.push(Box::new(description.clone()));
        }
        if let Some(start) = update.start {
            sets.push("start_date = ?");
            values.push(Box::new(fmt_date(start)));
        }
        if let Some(end) = update.end {
            sets.push("end_date = ?");
            values.push(Box::new(fmt_date(end)));
        }
        if let Some(progress) = update.progress {
            sets.push("progress = ?");
            values.push(Box::new(progress.min(100)));
        }
        if let Some(milestone) = update.is_milestone {
            sets.push("is_milestone = ?");
            values.push(Box::new(milestone));
        }
        if let Some(expanded) = update.is_expanded {
            sets.push("is_expanded = ?");
            values.push(Box::new(expanded));
        }
        if let Some(parent) = update.parent_id {
            sets.push("parent_id = ?");
            values.push(Box::new(parent));
        }
        if let Some(order) = update.sort_order {
            sets.push("sort_order = ?");
            values.push(Box::new(order));
        }
        if let Some(color) = &update.color {
            sets.push("color = ?");
            values.push(Box::new(color.clone().filter(|s| !s.is_empty())));
        }
        if let Some(assignee) = &update.assignee {
            sets.push("assignee = ?");
            values.push(Box::new(assignee.clone().filter(|s| !s.is_empty())));
        }

        let sql = format!(
            "UPDATE tasks SET {}, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            sets.join(", ")
        );
        values.push(Box::new(id));
        let changed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        debug!(task_id = id, fields = sets.len(), "updated task");
        Ok(changed > 0)
    }

    pub fn update_dates(&self, id: TaskId, start: NaiveDate, end: NaiveDate) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET start_date = ?1, end_date = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?3",
            params![fmt_date(start), fmt_date(end.max(start)), id],
        )?;
        if changed == 0 {
            return Err(StoreError::task_not_found(id));
        }
        info!(task_id = id, %start, %end, "rescheduled task");
        Ok(())
    }

    pub fn update_progress(&self, id: TaskId, progress: u8) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET progress = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![progress.min(100), id],
        )?;
        if changed == 0 {
            return Err(StoreError::task_not_found(id));
        }
        info!(task_id = id, progress, "updated progress");
        Ok(())
    }

    pub fn set_expanded(&self, id: TaskId, expanded: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE tasks SET is_expanded = ?1 WHERE id = ?2",
            params![expanded, id],
        )?;
        Ok(())
    }

    /// Snapshot the current dates as the baseline.
    pub fn set_baseline(&self, id: TaskId) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET baseline_start_date = start_date, baseline_end_date = end_date,
                              updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(StoreError::task_not_found(id));
        }
        info!(task_id = id, "baseline set");
        Ok(())
    }

    pub fn clear_baseline(&self, id: TaskId) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET baseline_start_date = NULL, baseline_end_date = NULL,
                              updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(StoreError::task_not_found(id));
        }
        info!(task_id = id, "baseline cleared");
        Ok(())
    }

    /// Write new sibling sort orders in one transaction.
    pub fn apply_reorder(&mut self, orders: &[(TaskId, i64)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE tasks SET sort_order = ?1 WHERE id = ?2")?;
            for (id, order) in orders {
                stmt.execute(params![order, id])?;
            }
        }
        tx.commit()?;
        info!(count = orders.len(), "reordered tasks");
        Ok(())
    }

    /// Delete several tasks atomically, typically a subtree in depth-first order.
    pub fn delete_tasks(&mut self, ids: &[TaskId]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM tasks WHERE id = ?1")?;
            // Leaves first so no child is detached on the way.
            for id in ids.iter().rev() {
                deleted += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        info!(count = deleted, "deleted tasks");
        Ok(deleted)
    }

    // ── Dependencies ──────────────────────────────────────────────────────

    /// Link two tasks. Returns `None` when the link already exists or would
    /// point a task at itself.
    pub fn create_dependency(
        &self,
        predecessor: TaskId,
        successor: TaskId,
        kind: DependencyKind,
    ) -> Result<Option<i64>> {
        let inserted = self.conn.execute(
            "INSERT INTO task_dependencies (predecessor_id, successor_id, dependency_type)
             VALUES (?1, ?2, ?3)",
            params![predecessor, successor, kind.short_label()],
        );
        match inserted {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                info!(predecessor, successor, kind = kind.short_label(), "linked tasks");
                Ok(Some(id))
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                debug!(predecessor, successor, "dependency rejected by constraint");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn delete_dependency(&self, predecessor: TaskId, successor: TaskId) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM task_dependencies WHERE predecessor_id = ?1 AND successor_id = ?2",
            params![predecessor, successor],
        )?;
        if changed > 0 {
            info!(predecessor, successor, "unlinked tasks");
        }
        Ok(changed > 0)
    }

    /// Every dependency whose predecessor belongs to the project.
    pub fn list_dependencies(&self, project_id: ProjectId) -> Result<Vec<Dependency>> {
        let mut stmt = self.conn.prepare(
            "SELECT td.predecessor_id, td.successor_id, td.dependency_type
             FROM task_dependencies td
             JOIN tasks t ON td.predecessor_id = t.id
             WHERE t.project_id = ?1
             ORDER BY td.id",
        )?;
        let deps = stmt
            .query_map(params![project_id], dependency_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Task, TaskTree};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn store_with_project() -> (Store, ProjectId) {
        let store = Store::open_in_memory().unwrap();
        let pid = store.create_project("Test", "").unwrap();
        (store, pid)
    }

    fn load(store: &Store, id: TaskId) -> Task {
        Task::try_from(store.get_task(id).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn create_and_read_back_task() {
        let (store, pid) = store_with_project();
        let id = store
            .create_task(&NewTask {
                description: "first".into(),
                progress: 30,
                color: Some("#112233".into()),
                assignee: Some("Sam".into()),
                ..NewTask::new(pid, "Build", d(1, 10), d(1, 12))
            })
            .unwrap();

        let task = load(&store, id);
        assert_eq!(task.name, "Build");
        assert_eq!(task.description, "first");
        assert_eq!((task.start, task.end), (d(1, 10), d(1, 12)));
        assert_eq!(task.progress, 30);
        assert_eq!(task.color.as_deref(), Some("#112233"));
        assert_eq!(task.assignee.as_deref(), Some("Sam"));
        assert!(task.is_expanded);
        assert!(!task.has_baseline());
    }

    #[test]
    fn milestone_is_stored_as_single_day() {
        let (store, pid) = store_with_project();
        let id = store
            .create_task(&NewTask {
                is_milestone: true,
                ..NewTask::new(pid, "Ship", d(2, 1), d(2, 9))
            })
            .unwrap();
        let task = load(&store, id);
        assert_eq!(task.start, task.end);
        assert_eq!(task.duration_days(), 1);
    }

    #[test]
    fn new_tasks_append_after_siblings() {
        let (store, pid) = store_with_project();
        let a = store.create_task(&NewTask::new(pid, "a", d(1, 1), d(1, 2))).unwrap();
        let b = store.create_task(&NewTask::new(pid, "b", d(1, 1), d(1, 2))).unwrap();
        let child = store
            .create_task(&NewTask {
                parent_id: Some(a),
                ..NewTask::new(pid, "c", d(1, 1), d(1, 2))
            })
            .unwrap();
        assert_eq!(load(&store, a).sort_order, 0);
        assert_eq!(load(&store, b).sort_order, 1);
        assert_eq!(load(&store, child).sort_order, 0);
    }

    #[test]
    fn list_orders_by_sort_order_then_id() {
        let (mut store, pid) = store_with_project();
        let a = store.create_task(&NewTask::new(pid, "a", d(1, 1), d(1, 2))).unwrap();
        let b = store.create_task(&NewTask::new(pid, "b", d(1, 1), d(1, 2))).unwrap();
        let c = store.create_task(&NewTask::new(pid, "c", d(1, 1), d(1, 2))).unwrap();
        store.apply_reorder(&[(c, 0), (a, 1), (b, 1)]).unwrap();

        let ids: Vec<_> = store
            .list_tasks(pid)
            .unwrap()
            .into_iter()
            .map(|r| r.id.unwrap())
            .collect();
        assert_eq!(ids, vec![c, a, b]);
    }

    #[test]
    fn partial_update_touches_only_given_fields() {
        let (store, pid) = store_with_project();
        let id = store
            .create_task(&NewTask {
                assignee: Some("Kim".into()),
                ..NewTask::new(pid, "a", d(1, 1), d(1, 5))
            })
            .unwrap();

        let update = TaskUpdate {
            name: Some("renamed".into()),
            progress: Some(120),
            assignee: Some(None),
            is_expanded: Some(false),
            ..Default::default()
        };
        assert!(store.update_task(id, &update).unwrap());
        let task = load(&store, id);
        assert_eq!(task.name, "renamed");
        assert_eq!(task.progress, 100);
        assert_eq!(task.assignee, None);
        assert!(!task.is_expanded);
        assert_eq!((task.start, task.end), (d(1, 1), d(1, 5)));

        assert!(!store.update_task(999, &update).unwrap());
        assert!(store.update_task(id, &TaskUpdate::default()).unwrap());
        assert!(!store.update_task(999, &TaskUpdate::default()).unwrap());
        assert!(TaskUpdate::default().is_empty() && !update.is_empty());
    }

    #[test]
    fn date_and_progress_updates() {
        let (store, pid) = store_with_project();
        let id = store.create_task(&NewTask::new(pid, "a", d(1, 10), d(1, 12))).unwrap();
        store.update_dates(id, d(1, 11), d(1, 13)).unwrap();
        store.update_progress(id, 75).unwrap();
        let task = load(&store, id);
        assert_eq!((task.start, task.end), (d(1, 11), d(1, 13)));
        assert_eq!(task.progress, 75);

        assert!(matches!(
            store.update_dates(42, d(1, 1), d(1, 2)),
            Err(StoreError::NotFound { entity: "Task", id: 42 })
        ));
    }

    #[test]
    fn baseline_snapshots_current_dates() {
        let (store, pid) = store_with_project();
        let id = store.create_task(&NewTask::new(pid, "a", d(1, 10), d(1, 12))).unwrap();
        store.set_baseline(id).unwrap();
        store.update_dates(id, d(1, 12), d(1, 15)).unwrap();

        let task = load(&store, id);
        assert_eq!(task.baseline_start, Some(d(1, 10)));
        assert_eq!(task.baseline_end, Some(d(1, 12)));
        assert_eq!(task.end_variance_days(), 3);

        store.clear_baseline(id).unwrap();
        assert!(!load(&store, id).has_baseline());
    }

    #[test]
    fn dependencies_are_unique_per_pair() {
        let (store, pid) = store_with_project();
        let a = store.create_task(&NewTask::new(pid, "a", d(1, 1), d(1, 2))).unwrap();
        let b = store.create_task(&NewTask::new(pid, "b", d(1, 3), d(1, 4))).unwrap();

        assert!(store.create_dependency(a, b, DependencyKind::FinishToStart).unwrap().is_some());
        assert!(store.create_dependency(a, b, DependencyKind::StartToStart).unwrap().is_none());
        assert!(store.create_dependency(a, a, DependencyKind::FinishToStart).unwrap().is_none());
        assert!(store.create_dependency(b, a, DependencyKind::FinishToFinish).unwrap().is_some());

        let deps = store.list_dependencies(pid).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0], Dependency { predecessor: a, successor: b, kind: DependencyKind::FinishToStart });
        assert_eq!(deps[1].kind, DependencyKind::FinishToFinish);

        assert!(store.delete_dependency(a, b).unwrap());
        assert!(!store.delete_dependency(a, b).unwrap());
        assert_eq!(store.list_dependencies(pid).unwrap().len(), 1);
    }

    #[test]
    fn deleting_a_task_detaches_children_and_drops_links() {
        let (mut store, pid) = store_with_project();
        let parent = store.create_task(&NewTask::new(pid, "p", d(1, 1), d(1, 9))).unwrap();
        let child = store
            .create_task(&NewTask {
                parent_id: Some(parent),
                ..NewTask::new(pid, "c", d(1, 2), d(1, 3))
            })
            .unwrap();
        let other = store.create_task(&NewTask::new(pid, "o", d(1, 4), d(1, 5))).unwrap();
        store.create_dependency(parent, other, DependencyKind::FinishToStart).unwrap();

        assert_eq!(store.delete_tasks(&[parent]).unwrap(), 1);
        assert_eq!(load(&store, child).parent_id, None);
        assert!(store.list_dependencies(pid).unwrap().is_empty());
        assert_eq!(store.delete_tasks(&[parent]).unwrap(), 0);
    }

    #[test]
    fn subtree_delete_removes_every_listed_task() {
        let (mut store, pid) = store_with_project();
        let root = store.create_task(&NewTask::new(pid, "r", d(1, 1), d(1, 9))).unwrap();
        let mid = store
            .create_task(&NewTask { parent_id: Some(root), ..NewTask::new(pid, "m", d(1, 1), d(1, 2)) })
            .unwrap();
        let leaf = store
            .create_task(&NewTask { parent_id: Some(mid), ..NewTask::new(pid, "l", d(1, 1), d(1, 2)) })
            .unwrap();
        let keep = store.create_task(&NewTask::new(pid, "k", d(1, 1), d(1, 2))).unwrap();

        let tree = TaskTree::from_records(store.list_tasks(pid).unwrap());
        assert_eq!(store.delete_tasks(&tree.subtree(root)).unwrap(), 3);
        let left: Vec<_> = store.list_tasks(pid).unwrap().into_iter().filter_map(|r| r.id).collect();
        assert_eq!(left, vec![keep]);
        assert!(store.get_task(leaf).unwrap().is_none());
    }

    #[test]
    fn default_project_is_created_once_with_samples() {
        let store = Store::open_in_memory().unwrap();
        let today = d(3, 1);
        let project = store.first_or_create_default(today).unwrap();
        assert_eq!(project.name, "Default Project");

        let tree = TaskTree::from_records(store.list_tasks(project.id).unwrap());
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.flatten_all().iter().filter(|(_, depth)| *depth == 0).count(), 4);
        assert!(tree.tasks().any(|t| t.is_milestone));
        assert_eq!(store.list_dependencies(project.id).unwrap().len(), 2);

        let again = store.first_or_create_default(today).unwrap();
        assert_eq!(again.id, project.id);
        assert_eq!(store.list_projects().unwrap().len(), 1);
    }

    #[test]
    fn on_disk_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gantt.db");

        let id = {
            let store = Store::open(&path).unwrap();
            let pid = store.create_project("Disk", "").unwrap();
            store.create_task(&NewTask::new(pid, "persisted", d(1, 1), d(1, 2))).unwrap()
        };

        let store = Store::open(&path).unwrap();
        assert_eq!(load(&store, id).name, "persisted");
    }

    #[test]
    fn legacy_file_is_upgraded_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE projects (id INTEGER PRIMARY KEY, name TEXT NOT NULL,
                                        description TEXT, created_at TEXT, updated_at TEXT);
                 CREATE TABLE tasks (id INTEGER PRIMARY KEY, project_id INTEGER, parent_id INTEGER,
                                     name TEXT, description TEXT, start_date TEXT, end_date TEXT,
                                     progress INTEGER, is_milestone INTEGER, is_expanded INTEGER,
                                     sort_order INTEGER, created_at TEXT, updated_at TEXT);
                 INSERT INTO projects (id, name) VALUES (1, 'old');
                 INSERT INTO tasks (id, project_id, name, start_date, end_date)
                 VALUES (1, 1, 'old task', '2024-01-01', '2024-01-04');",
            )
            .unwrap();
        }

        let store = Store::open(&path).unwrap();
        let task = load(&store, 1);
        assert_eq!(task.name, "old task");
        assert_eq!(task.progress, 0);
        assert_eq!(task.color, None);
        store.set_baseline(1).unwrap();
        assert!(load(&store, 1).has_baseline());
    }

    #[test]
    fn minimal_legacy_tables_still_load_and_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE projects (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
                 CREATE TABLE tasks (id INTEGER PRIMARY KEY, project_id INTEGER, parent_id INTEGER,
                                     name TEXT, start_date TEXT, end_date TEXT);
                 INSERT INTO projects (id, name) VALUES (1, 'bare');
                 INSERT INTO tasks (id, project_id, name, start_date, end_date)
                 VALUES (1, 1, 'bare task', '2024-01-01', '2024-01-04');",
            )
            .unwrap();
        }

        let store = Store::open(&path).unwrap();
        let project = store.first_or_create_default(d(1, 1)).unwrap();
        assert_eq!(project.name, "bare");
        assert_eq!(store.list_tasks(1).unwrap().len(), 1);

        let task = load(&store, 1);
        assert_eq!((task.progress, task.is_expanded, task.sort_order), (0, true, 0));
        assert!(store.update_task(1, &TaskUpdate { progress: Some(30), ..Default::default() }).unwrap());
        assert_eq!(load(&store, 1).progress, 30);
    }

    #[test]
    fn malformed_rows_are_returned_raw() {
        let (store, pid) = store_with_project();
        store
            .conn
            .execute(
                "INSERT INTO tasks (project_id, name, start_date, end_date) VALUES (?1, 'bad', 'soon', '2024-01-01')",
                params![pid],
            )
            .unwrap();
        store.create_task(&NewTask::new(pid, "good", d(1, 1), d(1, 2))).unwrap();

        let rows = store.list_tasks(pid).unwrap();
        assert_eq!(rows.len(), 2);
        let tree = TaskTree::from_records(rows);
        assert_eq!(tree.len(), 1);
    }
}
