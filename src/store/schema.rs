//! Table definitions and in-place column migrations.
//!
//! The base tables are created with `IF NOT EXISTS`. Columns added after the
//! first release are looked up with `PRAGMA table_info` and appended with
//! `ALTER TABLE ... ADD COLUMN`, so opening an old database upgrades it and
//! opening a current one changes nothing.

use rusqlite::Connection;
use tracing::info;

use super::error::Result;

const BASE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS tasks (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id   INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    parent_id    INTEGER REFERENCES tasks(id) ON DELETE SET NULL,
    name         TEXT NOT NULL,
    description  TEXT NOT NULL DEFAULT '',
    start_date   TEXT NOT NULL,
    end_date     TEXT NOT NULL,
    progress     INTEGER NOT NULL DEFAULT 0,
    is_milestone INTEGER NOT NULL DEFAULT 0,
    is_expanded  INTEGER NOT NULL DEFAULT 1,
    sort_order   INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at   TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS task_dependencies (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    predecessor_id  INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    successor_id    INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    dependency_type TEXT NOT NULL DEFAULT 'FS',
    UNIQUE (predecessor_id, successor_id),
    CHECK (predecessor_id <> successor_id)
);

CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_id);
";

type ColumnSet = &'static [(&'static str, &'static str)];

/// Columns an existing database may lack, per table. Only `id`, `name`, the
/// foreign keys and the task dates are required of an old file; everything
/// else is added with its default. `ADD COLUMN` cannot take a
/// `CURRENT_TIMESTAMP` default, so timestamps come back nullable.
const LATE_COLUMNS: &[(&str, ColumnSet)] = &[
    (
        "projects",
        &[
            ("description", "TEXT NOT NULL DEFAULT ''"),
            ("created_at", "TEXT DEFAULT NULL"),
            ("updated_at", "TEXT DEFAULT NULL"),
        ],
    ),
    (
        "tasks",
        &[
            ("description", "TEXT NOT NULL DEFAULT ''"),
            ("progress", "INTEGER NOT NULL DEFAULT 0"),
            ("is_milestone", "INTEGER NOT NULL DEFAULT 0"),
            ("is_expanded", "INTEGER NOT NULL DEFAULT 1"),
            ("sort_order", "INTEGER NOT NULL DEFAULT 0"),
            ("created_at", "TEXT DEFAULT NULL"),
            ("updated_at", "TEXT DEFAULT NULL"),
            ("color", "TEXT DEFAULT NULL"),
            ("assignee", "TEXT DEFAULT NULL"),
            ("baseline_start_date", "TEXT DEFAULT NULL"),
            ("baseline_end_date", "TEXT DEFAULT NULL"),
        ],
    ),
];

/// Create missing tables and bring old ones up to the current column set.
///
/// Returns the added columns as `table.column`.
pub fn initialize(conn: &Connection) -> Result<Vec<String>> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(BASE_SCHEMA)?;
    migrate(conn)
}

fn migrate(conn: &Connection) -> Result<Vec<String>> {
    let mut added = Vec::new();
    for (table, columns) in LATE_COLUMNS {
        let existing = column_names(conn, table)?;
        for (name, decl) in columns.iter() {
            if existing.iter().any(|c| c == name) {
                continue;
            }
            conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {name} {decl};"))?;
            info!(table, column = name, "added column");
            added.push(format!("{table}.{name}"));
        }
    }
    Ok(added)
}

pub fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_memory() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn fresh_database_gets_every_column() {
        let conn = open_memory();
        let added = initialize(&conn).unwrap();
        assert_eq!(
            added,
            vec![
                "tasks.color",
                "tasks.assignee",
                "tasks.baseline_start_date",
                "tasks.baseline_end_date"
            ]
        );

        for (table, columns) in LATE_COLUMNS {
            let cols = column_names(&conn, table).unwrap();
            for (name, _) in columns.iter() {
                assert!(cols.iter().any(|c| c == name), "missing {table}.{name}");
            }
        }
    }

    #[test]
    fn initialize_is_idempotent() {
        let conn = open_memory();
        initialize(&conn).unwrap();
        let before = column_names(&conn, "tasks").unwrap();
        assert!(initialize(&conn).unwrap().is_empty());
        assert_eq!(column_names(&conn, "tasks").unwrap(), before);
    }

    #[test]
    fn partially_migrated_table_gets_remaining_columns() {
        let conn = open_memory();
        conn.execute_batch(
            "CREATE TABLE projects (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE tasks (
                 id INTEGER PRIMARY KEY,
                 project_id INTEGER NOT NULL,
                 parent_id INTEGER,
                 name TEXT NOT NULL,
                 start_date TEXT NOT NULL,
                 end_date TEXT NOT NULL,
                 color TEXT
             );
             INSERT INTO tasks (project_id, name, start_date, end_date, color)
             VALUES (1, 'legacy', '2024-01-01', '2024-01-02', '#FF0000');",
        )
        .unwrap();

        let added = initialize(&conn).unwrap();
        assert!(!added.iter().any(|c| c == "tasks.color"));
        for column in ["projects.created_at", "tasks.sort_order", "tasks.progress", "tasks.is_expanded", "tasks.assignee"] {
            assert!(added.iter().any(|c| c == column), "{column} not added");
        }

        let (color, assignee, progress, expanded, order): (Option<String>, Option<String>, i64, bool, i64) = conn
            .query_row(
                "SELECT color, assignee, progress, is_expanded, sort_order FROM tasks
                 WHERE name = 'legacy' ORDER BY sort_order, id",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )
            .unwrap();
        assert_eq!(color.as_deref(), Some("#FF0000"));
        assert_eq!(assignee, None);
        assert_eq!((progress, expanded, order), (0, true, 0));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let conn = open_memory();
        initialize(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO projects (name) VALUES ('p');
             INSERT INTO tasks (project_id, name, start_date, end_date)
             VALUES (1, 't', '2024-01-01', '2024-01-01');",
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO task_dependencies (predecessor_id, successor_id) VALUES (1, 1)",
            [],
        );
        assert!(result.is_err());
    }
}
