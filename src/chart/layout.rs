//! Row assignment and bar geometry for one render pass.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use egui::{Color32, Pos2, Rect, Vec2};

use super::interaction::{DragMode, DragState};
use crate::model::{Task, TaskId, TaskTree, TimeAxis};
use crate::ui::theme;

/// Which way a task has slipped relative to its baseline end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarianceKind {
    Late,
    Early,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceOverlay {
    pub rect: Rect,
    pub kind: VarianceKind,
    pub days: i64,
}

/// Everything needed to draw and hit-test one task row.
#[derive(Debug, Clone, PartialEq)]
pub struct BarGeometry {
    pub task_id: TaskId,
    pub row: usize,
    pub depth: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub progress: u8,
    pub is_milestone: bool,
    pub rect: Rect,
    pub progress_rect: Option<Rect>,
    pub baseline_rect: Option<Rect>,
    pub variance: Option<VarianceOverlay>,
    pub color: Color32,
}

impl BarGeometry {
    /// Horizontal containment with inclusive edges; the row band is the bar height.
    pub fn contains(&self, pos: Pos2) -> bool {
        pos.x >= self.rect.left()
            && pos.x <= self.rect.right()
            && pos.y >= self.rect.top()
            && pos.y <= self.rect.bottom()
    }

    pub fn progress_contains(&self, pos: Pos2) -> bool {
        self.progress_rect.is_some_and(|r| {
            pos.x >= r.left() && pos.x <= r.right() && pos.y >= r.top() && pos.y <= r.bottom()
        })
    }
}

/// Bar color: explicit custom color, then milestone color, then progress tier.
pub fn resolve_color(task: &Task) -> Color32 {
    if let Some(custom) = task.color.as_deref().and_then(theme::parse_hex_color) {
        return custom;
    }
    if task.is_milestone {
        return theme::MILESTONE_COLOR;
    }
    match task.progress {
        0 => theme::TIER_NOT_STARTED,
        100..=u8::MAX => theme::TIER_DONE,
        _ => theme::TIER_IN_PROGRESS,
    }
}

/// Left-anchored sub-rectangle covering `progress` percent of `bar`.
pub fn progress_rect_for(bar: Rect, progress: u8) -> Rect {
    let width = bar.width() * f32::from(progress.min(100)) / 100.0;
    Rect::from_min_size(bar.min, Vec2::new(width, bar.height()))
}

fn row_top(row: usize) -> f32 {
    theme::HEADER_HEIGHT + row as f32 * theme::ROW_HEIGHT
}

/// Bar rectangle for a task placed on `row`.
pub fn bar_rect(task: &Task, row: usize, axis: &TimeAxis) -> Rect {
    let y = row_top(row) + theme::BAR_INSET;
    let height = theme::ROW_HEIGHT - 2.0 * theme::BAR_INSET;
    if task.is_milestone {
        let center_x = axis.date_to_x(task.start) + axis.unit_width / 2.0;
        return Rect::from_min_size(
            Pos2::new(center_x - theme::MILESTONE_SIZE / 2.0, y),
            Vec2::new(theme::MILESTONE_SIZE, height),
        );
    }
    Rect::from_min_size(
        Pos2::new(axis.date_to_x(task.start), y),
        Vec2::new(task.duration_days() as f32 * axis.unit_width, height),
    )
}

fn baseline_geometry(
    task: &Task,
    bar: Rect,
    axis: &TimeAxis,
) -> (Option<Rect>, Option<VarianceOverlay>) {
    let (Some(bs), Some(be)) = (task.baseline_start, task.baseline_end) else {
        return (None, None);
    };
    let y = bar.bottom() + theme::BASELINE_GAP;
    let size_y = theme::BASELINE_HEIGHT;
    let left = axis.date_to_x(bs);
    let baseline_right = axis.date_to_x(be + Duration::days(1));
    let baseline = Rect::from_min_max(Pos2::new(left, y), Pos2::new(baseline_right, y + size_y));

    let days = task.end_variance_days();
    let variance = (days != 0).then(|| {
        let current_right = axis.date_to_x(task.end + Duration::days(1));
        VarianceOverlay {
            rect: Rect::from_min_max(
                Pos2::new(baseline_right.min(current_right), y),
                Pos2::new(baseline_right.max(current_right), y + size_y),
            ),
            kind: if days > 0 {
                VarianceKind::Late
            } else {
                VarianceKind::Early
            },
            days,
        }
    });
    (Some(baseline), variance)
}

/// Geometry of every visible bar, keyed by task id.
#[derive(Debug, Clone)]
pub struct ChartLayout {
    pub axis: TimeAxis,
    pub bars: Vec<BarGeometry>,
    index: HashMap<TaskId, usize>,
}

impl ChartLayout {
    /// Assign rows in visible depth-first order and compute each bar.
    pub fn compute(tree: &TaskTree, axis: &TimeAxis) -> Self {
        let mut bars = Vec::with_capacity(tree.len());
        let mut index = HashMap::with_capacity(tree.len());

        for (row, (id, depth)) in tree.flatten_visible().into_iter().enumerate() {
            let Some(task) = tree.get(id) else { continue };
            let rect = bar_rect(task, row, axis);
            let progress_rect = (task.progress > 0 && !task.is_milestone)
                .then(|| progress_rect_for(rect, task.progress));
            let (baseline_rect, variance) = baseline_geometry(task, rect, axis);

            index.insert(id, bars.len());
            bars.push(BarGeometry {
                task_id: id,
                row,
                depth,
                start: task.start,
                end: task.end,
                progress: task.progress,
                is_milestone: task.is_milestone,
                rect,
                progress_rect,
                baseline_rect,
                variance,
                color: resolve_color(task),
            });
        }

        Self {
            axis: *axis,
            bars,
            index,
        }
    }

    pub fn bar(&self, id: TaskId) -> Option<&BarGeometry> {
        self.index.get(&id).map(|i| &self.bars[*i])
    }

    pub fn row_count(&self) -> usize {
        self.bars.len()
    }

    /// The bar under `pos`, if any.
    pub fn bar_at(&self, pos: Pos2) -> Option<&BarGeometry> {
        self.bars.iter().find(|b| b.contains(pos))
    }

    /// Height of the header plus all rows.
    pub fn content_height(&self) -> f32 {
        row_top(self.bars.len())
    }

    /// Replace the dragged bar's cached geometry with the live drag preview.
    pub fn apply_drag(&mut self, state: &DragState) {
        let DragState::Dragging(drag) = state else {
            return;
        };
        let Some(&i) = self.index.get(&drag.task_id) else {
            return;
        };
        let bar = &mut self.bars[i];
        match drag.mode {
            DragMode::ProgressDrag => bar.progress_rect = Some(drag.rect),
            DragMode::Move | DragMode::ResizeStart | DragMode::ResizeEnd => {
                bar.rect = drag.rect;
                bar.progress_rect = bar
                    .progress_rect
                    .map(|_| progress_rect_for(drag.rect, bar.progress));
            }
        }
    }
}
