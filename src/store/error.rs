use thiserror::Error;

/// Errors from the SQLite task store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },
}

impl StoreError {
    pub fn task_not_found(id: i64) -> Self {
        Self::NotFound { entity: "Task", id }
    }

    pub fn project_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "Project",
            id,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
