use serde::{Deserialize, Serialize};

use super::task::ProjectId;

/// A Gantt project. Tasks and dependencies are loaded separately per project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}
