use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type TaskId = i64;
pub type ProjectId = i64;

/// Represents the type of dependency between two tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 4] = [
        DependencyKind::FinishToStart,
        DependencyKind::StartToStart,
        DependencyKind::FinishToFinish,
        DependencyKind::StartToFinish,
    ];

    /// Two-letter code used in the database column.
    pub fn short_label(self) -> &'static str {
        match self {
            DependencyKind::FinishToStart => "FS",
            DependencyKind::StartToStart => "SS",
            DependencyKind::FinishToFinish => "FF",
            DependencyKind::StartToFinish => "SF",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DependencyKind::FinishToStart => "Finish → Start",
            DependencyKind::StartToStart => "Start → Start",
            DependencyKind::FinishToFinish => "Finish → Finish",
            DependencyKind::StartToFinish => "Start → Finish",
        }
    }

    /// Parse the stored code. Unknown codes fall back to finish-to-start.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "SS" => DependencyKind::StartToStart,
            "FF" => DependencyKind::FinishToFinish,
            "SF" => DependencyKind::StartToFinish,
            _ => DependencyKind::FinishToStart,
        }
    }
}

/// A directed link from a predecessor to a successor. Drawn, never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub predecessor: TaskId,
    pub successor: TaskId,
    pub kind: DependencyKind,
}

/// A single task or milestone in the Gantt chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub parent_id: Option<TaskId>,
    pub name: String,
    pub description: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Percent complete, 0..=100.
    pub progress: u8,
    pub is_milestone: bool,
    pub is_expanded: bool,
    pub sort_order: i64,
    /// Custom bar color as `#RRGGBB`.
    pub color: Option<String>,
    pub assignee: Option<String>,
    pub baseline_start: Option<NaiveDate>,
    pub baseline_end: Option<NaiveDate>,
}

impl Task {
    /// Create a new task with sensible defaults.
    #[cfg(test)]
    pub fn new(
        id: TaskId,
        project_id: ProjectId,
        name: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            id,
            project_id,
            parent_id: None,
            name: name.into(),
            description: String::new(),
            start,
            end: end.max(start),
            progress: 0,
            is_milestone: false,
            is_expanded: true,
            sort_order: 0,
            color: None,
            assignee: None,
            baseline_start: None,
            baseline_end: None,
        }
    }

    /// Create a new milestone.
    #[cfg(test)]
    pub fn new_milestone(
        id: TaskId,
        project_id: ProjectId,
        name: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            is_milestone: true,
            ..Self::new(id, project_id, name, date, date)
        }
    }

    /// Inclusive length in days. A milestone is always one day.
    pub fn duration_days(&self) -> i64 {
        if self.is_milestone {
            return 1;
        }
        (self.end - self.start).num_days() + 1
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline_start.is_some() && self.baseline_end.is_some()
    }

    /// Positive when the task now starts later than planned.
    pub fn start_variance_days(&self) -> i64 {
        match (self.baseline_start, self.baseline_end) {
            (Some(bs), Some(_)) => (self.start - bs).num_days(),
            _ => 0,
        }
    }

    /// Positive when the task now finishes later than planned.
    pub fn end_variance_days(&self) -> i64 {
        match (self.baseline_start, self.baseline_end) {
            (Some(_), Some(be)) => (self.end - be).num_days(),
            _ => 0,
        }
    }
}

/// Why a stored row could not become a [`Task`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("row has no id")]
    MissingId,
    #[error("task {id}: missing {field}")]
    MissingField { id: TaskId, field: &'static str },
    #[error("task {id}: invalid {field} '{value}'")]
    InvalidDate {
        id: TaskId,
        field: &'static str,
        value: String,
    },
    #[error("task {id}: start {start} is after end {end}")]
    InvertedRange {
        id: TaskId,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// A task row exactly as it comes out of the store.
///
/// Every column is optional so hydration never fails on a missing column;
/// conversion into a [`Task`] applies defaults and rejects rows whose identity or
/// dates are unusable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskRecord {
    pub id: Option<TaskId>,
    pub project_id: Option<ProjectId>,
    pub parent_id: Option<TaskId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub progress: Option<i64>,
    pub is_milestone: Option<bool>,
    pub is_expanded: Option<bool>,
    pub sort_order: Option<i64>,
    pub color: Option<String>,
    pub assignee: Option<String>,
    pub baseline_start_date: Option<String>,
    pub baseline_end_date: Option<String>,
}

fn parse_required(
    id: TaskId,
    field: &'static str,
    value: Option<&str>,
) -> Result<NaiveDate, RowError> {
    let raw = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RowError::MissingField { id, field })?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| RowError::InvalidDate {
        id,
        field,
        value: raw.to_string(),
    })
}

/// Optional dates that fail to parse are treated as absent.
fn parse_optional(value: Option<&str>) -> Option<NaiveDate> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl TryFrom<TaskRecord> for Task {
    type Error = RowError;

    fn try_from(row: TaskRecord) -> Result<Self, Self::Error> {
        let id = row.id.ok_or(RowError::MissingId)?;
        let is_milestone = row.is_milestone.unwrap_or(false);
        let start = parse_required(id, "start_date", row.start_date.as_deref())?;
        let mut end = parse_required(id, "end_date", row.end_date.as_deref())?;
        if is_milestone {
            end = start;
        }
        if start > end {
            return Err(RowError::InvertedRange { id, start, end });
        }

        // A baseline is only meaningful as a complete, ordered pair.
        let (baseline_start, baseline_end) = match (
            parse_optional(row.baseline_start_date.as_deref()),
            parse_optional(row.baseline_end_date.as_deref()),
        ) {
            (Some(bs), Some(be)) if bs <= be => (Some(bs), Some(be)),
            _ => (None, None),
        };

        Ok(Task {
            id,
            project_id: row.project_id.unwrap_or_default(),
            parent_id: row.parent_id.filter(|pid| *pid != id),
            name: row.name.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            start,
            end,
            progress: row.progress.unwrap_or(0).clamp(0, 100) as u8,
            is_milestone,
            is_expanded: row.is_expanded.unwrap_or(true),
            sort_order: row.sort_order.unwrap_or(0),
            color: non_empty(row.color),
            assignee: non_empty(row.assignee),
            baseline_start,
            baseline_end,
        })
    }
}
