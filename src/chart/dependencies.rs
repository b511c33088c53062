//! Connector geometry between dependent bars.

use egui::{Pos2, Vec2};

use super::layout::ChartLayout;
use crate::model::{Dependency, DependencyKind, TaskId};

pub const ARROW_LENGTH: f32 = 8.0;
pub const ARROW_HALF_WIDTH: f32 = 4.0;

/// A routed connector from predecessor to successor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connector {
    pub predecessor: TaskId,
    pub successor: TaskId,
    pub kind: DependencyKind,
    /// Right-center of the predecessor bar.
    pub from: Pos2,
    /// Left-center of the successor bar.
    pub to: Pos2,
}

impl Connector {
    /// Triangle for the arrowhead at `to`, pointing along the connector.
    pub fn arrow_head(&self) -> [Pos2; 3] {
        arrow_head(self.from, self.to)
    }
}

/// Route every dependency whose endpoints both have a visible bar.
///
/// The connector is always drawn finish-to-start style regardless of `kind`.
pub fn route(layout: &ChartLayout, dependencies: &[Dependency]) -> Vec<Connector> {
    dependencies
        .iter()
        .filter_map(|dep| {
            let pred = layout.bar(dep.predecessor)?;
            let succ = layout.bar(dep.successor)?;
            Some(Connector {
                predecessor: dep.predecessor,
                successor: dep.successor,
                kind: dep.kind,
                from: pred.rect.right_center(),
                to: succ.rect.left_center(),
            })
        })
        .collect()
}

pub fn arrow_head(from: Pos2, to: Pos2) -> [Pos2; 3] {
    let dir = (to - from).normalized();
    // Degenerate connectors point right.
    let dir = if dir.is_finite() && dir != Vec2::ZERO {
        dir
    } else {
        Vec2::X
    };
    let back = to - dir * ARROW_LENGTH;
    let normal = dir.rot90() * ARROW_HALF_WIDTH;
    [to, back + normal, back - normal]
}

/// Split the segment `from..to` into dash segments of `dash` length separated by `gap`.
pub fn dash_segments(from: Pos2, to: Pos2, dash: f32, gap: f32) -> Vec<[Pos2; 2]> {
    let delta = to - from;
    let length = delta.length();
    if length <= f32::EPSILON || dash <= 0.0 {
        return Vec::new();
    }
    let dir = delta / length;
    let step = dash + gap.max(0.0);
    let mut out = Vec::new();
    let mut t = 0.0;
    while t < length {
        let end = (t + dash).min(length);
        out.push([from + dir * t, from + dir * end]);
        t += step;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Granularity, Task, TaskTree, TimeAxis};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn layout(tasks: Vec<Task>) -> ChartLayout {
        let tree = TaskTree::build(tasks);
        let axis = TimeAxis::from_dates(tree.tasks().map(|t| (t.start, t.end)), Granularity::Day).unwrap();
        ChartLayout::compute(&tree, &axis)
    }

    fn dep(predecessor: TaskId, successor: TaskId) -> Dependency {
        Dependency {
            predecessor,
            successor,
            kind: DependencyKind::FinishToStart,
        }
    }

    #[test]
    fn connector_runs_from_right_center_to_left_center() {
        let a = Task::new(1, 1, "a", d(10), d(12));
        let mut b = Task::new(2, 1, "b", d(13), d(15));
        b.sort_order = 1;
        let layout = layout(vec![a, b]);

        let routed = route(&layout, &[dep(1, 2)]);
        assert_eq!(routed.len(), 1);
        let c = routed[0];
        assert_eq!(c.from, layout.bar(1).unwrap().rect.right_center());
        assert_eq!(c.to, layout.bar(2).unwrap().rect.left_center());
        assert!(c.from.y < c.to.y);
    }

    #[test]
    fn hidden_endpoint_skips_connector() {
        let mut a = Task::new(1, 1, "a", d(10), d(12));
        a.is_expanded = false;
        let mut b = Task::new(2, 1, "b", d(13), d(15));
        b.parent_id = Some(1);
        let mut c = Task::new(3, 1, "c", d(16), d(18));
        c.sort_order = 1;
        let layout = layout(vec![a, b, c]);

        let routed = route(&layout, &[dep(1, 2), dep(2, 3), dep(1, 3), dep(1, 99)]);
        assert_eq!(routed.len(), 1);
        assert_eq!((routed[0].predecessor, routed[0].successor), (1, 3));
    }

    #[test]
    fn arrow_points_at_target() {
        let head = arrow_head(Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0));
        assert_eq!(head[0], Pos2::new(100.0, 0.0));
        assert_eq!(head[1].x, 100.0 - ARROW_LENGTH);
        assert_eq!(head[2].x, 100.0 - ARROW_LENGTH);
        assert!((head[1].y - head[2].y).abs() > 0.0);

        let same = arrow_head(Pos2::new(5.0, 5.0), Pos2::new(5.0, 5.0));
        assert!(same.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn dashes_cover_segment() {
        let dashes = dash_segments(Pos2::new(0.0, 0.0), Pos2::new(20.0, 0.0), 4.0, 2.0);
        assert_eq!(dashes.len(), 4);
        assert_eq!(dashes[0], [Pos2::new(0.0, 0.0), Pos2::new(4.0, 0.0)]);
        assert_eq!(dashes[3], [Pos2::new(18.0, 0.0), Pos2::new(20.0, 0.0)]);
        assert!(dash_segments(Pos2::ZERO, Pos2::ZERO, 4.0, 2.0).is_empty());
    }
}
