use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{Granularity, Task, TaskTree, TimeAxis};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub const HEADERS: [&str; 11] = [
    "Task",
    "Progress",
    "Assignee",
    "Start",
    "End",
    "Duration (days)",
    "Description",
    "Milestone",
    "Baseline Start",
    "Baseline End",
    "Variance (days)",
];

const INDENT: &str = "  ";

/// Day-grid cell for a day inside the current schedule.
pub const SCHEDULED: &str = "■";
/// Day-grid cell for a day only the baseline covers.
pub const BASELINE_ONLY: &str = "□";

fn indented_name(task: &Task, depth: usize) -> String {
    let marker = if task.is_milestone { "◆ " } else { "" };
    format!("{}{marker}{}", INDENT.repeat(depth), task.name)
}

fn task_row(task: &Task, depth: usize) -> [String; 11] {
    let fmt = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
    [
        indented_name(task, depth),
        format!("{}%", task.progress),
        task.assignee.clone().unwrap_or_default(),
        fmt(task.start),
        fmt(task.end),
        task.duration_days().to_string(),
        task.description.clone(),
        if task.is_milestone { "yes".into() } else { String::new() },
        task.baseline_start.map(fmt).unwrap_or_default(),
        task.baseline_end.map(fmt).unwrap_or_default(),
        if task.has_baseline() {
            format!("{:+}", task.end_variance_days())
        } else {
            String::new()
        },
    ]
}

/// Write the whole hierarchy depth-first, names indented by depth.
/// Collapsed tasks still export their children. Returns the number of tasks written.
pub fn write_csv<W: Write>(tree: &TaskTree, out: W) -> Result<usize, ExportError> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(HEADERS)?;

    let rows = tree.flatten_all();
    for (id, depth) in &rows {
        if let Some(task) = tree.get(*id) {
            wtr.write_record(task_row(task, *depth))?;
        }
    }
    wtr.flush()?;
    Ok(rows.len())
}

pub fn export_csv(tree: &TaskTree, path: &Path) -> Result<usize, ExportError> {
    let file = std::fs::File::create(path)?;
    let count = write_csv(tree, file)?;
    tracing::info!(path = %path.display(), count, "exported tasks");
    Ok(count)
}

/// Where the day grid goes next to a task list export: `plan.csv` becomes
/// `plan-timeline.csv`.
pub fn timeline_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".into());
    path.with_file_name(format!("{stem}-timeline.csv"))
}

fn day_mark(task: &Task, day: NaiveDate) -> &'static str {
    if task.start <= day && day <= task.end {
        return SCHEDULED;
    }
    match (task.baseline_start, task.baseline_end) {
        (Some(bs), Some(be)) if bs <= day && day <= be => BASELINE_ONLY,
        _ => "",
    }
}

/// Write the schedule as a day grid: one column per day over the task range
/// padded like the chart axis. Today's column header is bracketed.
pub fn write_timeline_csv<W: Write>(tree: &TaskTree, today: NaiveDate, out: W) -> Result<usize, ExportError> {
    let mut wtr = csv::Writer::from_writer(out);
    let mut header: Vec<String> = ["Task", "Progress", "Assignee"].map(String::from).to_vec();

    let axis = TimeAxis::from_dates(tree.tasks().map(|t| (t.start, t.end)), Granularity::Day);
    let days: Vec<NaiveDate> = match axis {
        Some(axis) => axis
            .min_date
            .iter_days()
            .take_while(|d| *d <= axis.max_date)
            .collect(),
        None => Vec::new(),
    };
    header.extend(days.iter().map(|d| {
        let label = d.format("%m/%d").to_string();
        if *d == today {
            format!("[{label}]")
        } else {
            label
        }
    }));
    wtr.write_record(&header)?;

    let rows = tree.flatten_all();
    for (id, depth) in &rows {
        let Some(task) = tree.get(*id) else { continue };
        let mut record = vec![
            indented_name(task, *depth),
            format!("{}%", task.progress),
            task.assignee.clone().unwrap_or_default(),
        ];
        record.extend(days.iter().map(|d| day_mark(task, *d).to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

pub fn export_timeline_csv(tree: &TaskTree, today: NaiveDate, path: &Path) -> Result<usize, ExportError> {
    let file = std::fs::File::create(path)?;
    let count = write_timeline_csv(tree, today, file)?;
    tracing::info!(path = %path.display(), count, "exported timeline grid");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_tree() -> TaskTree {
        let mut parent = Task::new(1, 1, "Design", d(10), d(14));
        parent.progress = 60;
        parent.is_expanded = false;
        parent.assignee = Some("Ana".into());
        parent.baseline_start = Some(d(10));
        parent.baseline_end = Some(d(12));

        let mut child = Task::new(2, 1, "Specs, draft", d(10), d(11));
        child.parent_id = Some(1);

        let mut release = Task::new_milestone(3, 1, "Release", d(20));
        release.sort_order = 1;
        TaskTree::build(vec![parent, child, release])
    }

    fn read_back(bytes: &[u8]) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes)
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn rows_follow_hierarchy_with_indent() {
        let mut buf = Vec::new();
        let count = write_csv(&sample_tree(), &mut buf).unwrap();
        assert_eq!(count, 3);

        let rows = read_back(&buf);
        assert_eq!(rows[0], HEADERS.map(String::from).to_vec());
        assert_eq!(rows[1][0], "Design");
        assert_eq!(rows[2][0], "  Specs, draft");
        assert_eq!(rows[3][0], "◆ Release");
    }

    #[test]
    fn row_columns() {
        let mut buf = Vec::new();
        write_csv(&sample_tree(), &mut buf).unwrap();
        let rows = read_back(&buf);

        let design = &rows[1];
        assert_eq!(design[1], "60%");
        assert_eq!(design[2], "Ana");
        assert_eq!(design[3], "2024-01-10");
        assert_eq!(design[4], "2024-01-14");
        assert_eq!(design[5], "5");
        assert_eq!(design[8], "2024-01-10");
        assert_eq!(design[9], "2024-01-12");
        assert_eq!(design[10], "+2");

        let release = &rows[3];
        assert_eq!(release[5], "1");
        assert_eq!(release[7], "yes");
        assert_eq!(release[10], "");
    }

    #[test]
    fn export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.csv");
        assert_eq!(export_csv(&sample_tree(), &path).unwrap(), 3);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Task,Progress,Assignee"));
        assert!(text.contains("\"  Specs, draft\""));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("tasks.csv");
        assert!(matches!(export_csv(&sample_tree(), &path), Err(ExportError::Io(_))));
    }

    #[test]
    fn timeline_grid_marks_scheduled_days_and_today() {
        let mut buf = Vec::new();
        let count = write_timeline_csv(&sample_tree(), d(15), &mut buf).unwrap();
        assert_eq!(count, 3);
        let rows = read_back(&buf);

        // 2024-01-07 ..= 2024-01-23 after three days of padding either side.
        let header = &rows[0];
        assert_eq!(header.len(), 3 + 17);
        assert_eq!(header[3], "01/07");
        assert_eq!(header[3 + 8], "[01/15]");
        assert_eq!(header.last().unwrap(), "01/23");

        let design = &rows[1];
        assert_eq!(design[0], "Design");
        assert_eq!(design[1], "60%");
        assert_eq!(design[3 + 2], "");
        assert!(design[3 + 3..=3 + 7].iter().all(|c| c == SCHEDULED));
        assert_eq!(design[3 + 8], "");

        let release = &rows[3];
        let marked: Vec<usize> = (3..release.len()).filter(|i| release[*i] == SCHEDULED).collect();
        assert_eq!(marked, vec![3 + 13]);
    }

    #[test]
    fn timeline_grid_marks_baseline_only_days() {
        let mut late = Task::new(1, 1, "Late", d(10), d(12));
        late.baseline_start = Some(d(8));
        late.baseline_end = Some(d(11));
        let mut buf = Vec::new();
        write_timeline_csv(&TaskTree::build(vec![late]), d(1), &mut buf).unwrap();
        let rows = read_back(&buf);

        assert!(rows[0].iter().all(|h| !h.starts_with('[')));
        let cells = &rows[1][3..];
        assert_eq!(cells[0], "");
        assert_eq!(cells[1], BASELINE_ONLY);
        assert_eq!(cells[2], BASELINE_ONLY);
        assert_eq!(cells[3], SCHEDULED);
        assert_eq!(cells[5], SCHEDULED);
        assert_eq!(cells[6], "");
    }

    #[test]
    fn empty_tree_writes_only_the_header() {
        let mut buf = Vec::new();
        assert_eq!(write_timeline_csv(&TaskTree::default(), d(1), &mut buf).unwrap(), 0);
        assert_eq!(read_back(&buf), vec![vec!["Task", "Progress", "Assignee"]]);
    }

    #[test]
    fn timeline_file_sits_next_to_the_task_list() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("plan.csv");
        let grid = timeline_path(&list);
        assert_eq!(grid, dir.path().join("plan-timeline.csv"));
        assert_eq!(export_timeline_csv(&sample_tree(), d(15), &grid).unwrap(), 3);
        assert!(std::fs::read_to_string(&grid).unwrap().starts_with("Task,Progress,Assignee,01/07"));
    }
}
