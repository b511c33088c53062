//! Pointer-driven drag state machine for the timeline.
//!
//! The controller never touches the task model. While a drag is active it only
//! mutates its own copy of the dragged rectangle; on release the final rectangle
//! is translated back into dates or a progress value and reported as a
//! [`ChartEvent`] for a collaborator to persist.

use std::fmt;

use chrono::{Duration, NaiveDate};
use egui::{Pos2, Rect};
use tracing::debug;

use super::layout::{BarGeometry, ChartLayout};
use crate::model::{TaskId, TimeAxis};

/// Distance from a bar's left/right border that grabs the edge instead of the body.
pub const EDGE_MARGIN: f32 = 10.0;
/// Horizontal movement a press must exceed before release counts as a drag.
pub const JITTER_THRESHOLD: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Move,
    ResizeStart,
    ResizeEnd,
    ProgressDrag,
}

/// The committed value of the dragged task at press time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginalValue {
    Dates { start: NaiveDate, end: NaiveDate },
    Progress(u8),
}

/// An active drag. `rect` is the live geometry: the bar itself, or the progress
/// sub-bar for [`DragMode::ProgressDrag`].
#[derive(Debug, Clone, PartialEq)]
pub struct Drag {
    pub mode: DragMode,
    pub task_id: TaskId,
    pub original: OriginalValue,
    pub is_milestone: bool,
    /// Bar rectangle when the drag started.
    pub bar: Rect,
    pub rect: Rect,
    press_x: f32,
    anchor_x: f32,
    moved: bool,
}

impl Drag {
    /// Whether the pointer has left the jitter band since the press.
    pub fn has_moved(&self) -> bool {
        self.moved
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(Drag),
}

/// Changes and requests reported by the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartEvent {
    Selected(TaskId),
    DateChanged {
        task_id: TaskId,
        start: NaiveDate,
        end: NaiveDate,
    },
    ProgressChanged {
        task_id: TaskId,
        progress: u8,
    },
    EditRequested(TaskId),
    DeleteRequested(TaskId),
}

impl fmt::Display for ChartEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartEvent::Selected(id) => write!(f, "task_selected({id})"),
            ChartEvent::DateChanged {
                task_id,
                start,
                end,
            } => write!(f, "task_date_changed({task_id}, {start}, {end})"),
            ChartEvent::ProgressChanged { task_id, progress } => {
                write!(f, "task_progress_changed({task_id}, {progress})")
            }
            ChartEvent::EditRequested(id) => write!(f, "task_edit_requested({id})"),
            ChartEvent::DeleteRequested(id) => write!(f, "task_delete_requested({id})"),
        }
    }
}

/// Cursor affordance the UI should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    ResizeHorizontal,
    Grab,
    Grabbing,
}

/// Which part of `bar` a press at `pos` grabs.
pub fn hit_mode(bar: &BarGeometry, pos: Pos2) -> DragMode {
    if bar.is_milestone {
        return DragMode::Move;
    }
    // Keep a grabbable body on bars narrower than two full margins.
    let margin = EDGE_MARGIN.min(bar.rect.width() / 3.0);
    let local_x = pos.x - bar.rect.left();
    if local_x < margin {
        DragMode::ResizeStart
    } else if local_x > bar.rect.width() - margin {
        DragMode::ResizeEnd
    } else if bar.progress_contains(pos) {
        DragMode::ProgressDrag
    } else {
        DragMode::Move
    }
}

/// Locate the bar under `pos` and the drag mode a press there would start.
pub fn hit_test(layout: &ChartLayout, pos: Pos2) -> Option<(TaskId, DragMode)> {
    layout.bar_at(pos).map(|bar| (bar.task_id, hit_mode(bar, pos)))
}

/// Owns the drag state and turns pointer events into chart events.
#[derive(Debug, Default)]
pub struct InteractionController {
    state: DragState,
}

impl InteractionController {
    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Start a drag on the bar under `pos`. Reports the selection when a bar was
    /// hit. Ignored while another drag is active.
    pub fn pointer_down(&mut self, pos: Pos2, layout: &ChartLayout) -> Option<ChartEvent> {
        if self.is_dragging() {
            return None;
        }
        let bar = layout.bar_at(pos)?;
        let mode = hit_mode(bar, pos);
        let (original, rect) = match mode {
            DragMode::ProgressDrag => (
                OriginalValue::Progress(bar.progress),
                bar.progress_rect.unwrap_or(bar.rect),
            ),
            _ => (
                OriginalValue::Dates {
                    start: bar.start,
                    end: bar.end,
                },
                bar.rect,
            ),
        };
        debug!(task_id = bar.task_id, ?mode, "drag started");
        self.state = DragState::Dragging(Drag {
            mode,
            task_id: bar.task_id,
            original,
            is_milestone: bar.is_milestone,
            bar: bar.rect,
            rect,
            press_x: pos.x,
            anchor_x: pos.x,
            moved: false,
        });
        Some(ChartEvent::Selected(bar.task_id))
    }

    /// Update the dragged rectangle so it follows the pointer.
    pub fn pointer_move(&mut self, pos: Pos2, axis: &TimeAxis) {
        let DragState::Dragging(drag) = &mut self.state else {
            return;
        };
        if (pos.x - drag.press_x).abs() > JITTER_THRESHOLD {
            drag.moved = true;
        }

        let delta = pos.x - drag.anchor_x;
        let min_width = axis.unit_width;
        let rect = &mut drag.rect;
        match drag.mode {
            DragMode::Move => {
                *rect = rect.translate(egui::vec2(delta, 0.0));
                drag.anchor_x = pos.x;
            }
            DragMode::ResizeStart => {
                let left = (rect.left() + delta).min(rect.right() - min_width);
                drag.anchor_x += left - rect.left();
                rect.min.x = left;
            }
            DragMode::ResizeEnd => {
                let right = (rect.right() + delta).max(rect.left() + min_width);
                drag.anchor_x += right - rect.right();
                rect.max.x = right;
            }
            DragMode::ProgressDrag => {
                let right = (rect.right() + delta).clamp(drag.bar.left(), drag.bar.right());
                drag.anchor_x += right - rect.right();
                rect.max.x = right;
            }
        }
    }

    /// Finish the drag. Returns a change event only when the pointer left the
    /// jitter band and the committed value differs from the original.
    pub fn pointer_up(&mut self, axis: &TimeAxis) -> Option<ChartEvent> {
        let DragState::Dragging(drag) = std::mem::take(&mut self.state) else {
            return None;
        };
        if !drag.has_moved() {
            debug!(task_id = drag.task_id, "released within jitter threshold");
            return None;
        }
        let event = commit(&drag, axis);
        debug!(task_id = drag.task_id, mode = ?drag.mode, ?event, "drag committed");
        event
    }

    /// Cursor for the current frame. Hovering never changes any state.
    pub fn cursor(&self, layout: &ChartLayout, pos: Option<Pos2>) -> CursorHint {
        if let DragState::Dragging(drag) = &self.state {
            return match drag.mode {
                DragMode::Move => CursorHint::Grabbing,
                _ => CursorHint::ResizeHorizontal,
            };
        }
        match pos.and_then(|p| hit_test(layout, p)) {
            Some((_, DragMode::ResizeStart | DragMode::ResizeEnd | DragMode::ProgressDrag)) => {
                CursorHint::ResizeHorizontal
            }
            Some((_, DragMode::Move)) => CursorHint::Grab,
            None => CursorHint::Default,
        }
    }
}

fn commit(drag: &Drag, axis: &TimeAxis) -> Option<ChartEvent> {
    match (drag.mode, drag.original) {
        (DragMode::ProgressDrag, OriginalValue::Progress(original)) => {
            let bar_width = drag.bar.width();
            if bar_width <= 0.0 {
                return None;
            }
            let progress = (drag.rect.width() / bar_width * 100.0).round().clamp(0.0, 100.0) as u8;
            (progress != original).then_some(ChartEvent::ProgressChanged {
                task_id: drag.task_id,
                progress,
            })
        }
        (mode, OriginalValue::Dates { start, end }) => {
            let (new_start, new_end) = match mode {
                DragMode::Move => {
                    // The milestone marker is centered on its day cell.
                    let left = if drag.is_milestone {
                        drag.rect.center().x - axis.unit_width / 2.0
                    } else {
                        drag.rect.left()
                    };
                    let new_start = axis.x_to_date(left);
                    let duration = (end - start).num_days() + 1;
                    (new_start, new_start + Duration::days(duration - 1))
                }
                DragMode::ResizeStart => (axis.x_to_date(drag.rect.left()), end),
                DragMode::ResizeEnd => (start, axis.x_to_date(drag.rect.right()) - Duration::days(1)),
                DragMode::ProgressDrag => return None,
            };
            (new_start != start || new_end != end).then_some(ChartEvent::DateChanged {
                task_id: drag.task_id,
                start: new_start,
                end: new_end,
            })
        }
        (_, OriginalValue::Progress(_)) => None,
    }
}
