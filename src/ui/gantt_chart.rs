use chrono::{Datelike, Duration, NaiveDate, Weekday};
use egui::{Color32, CursorIcon, Id, Painter, Pos2, Rect, Rounding, Sense, Stroke, Ui, Vec2};

use crate::chart::{
    dash_segments, route, scroll_offset_for, today_marker, BarGeometry, ChartEvent, ChartLayout, CursorHint,
    DeferredScroll, InteractionController, VarianceKind,
};
use crate::model::{Dependency, Granularity, TaskId, TaskTree, TimeAxis};
use crate::ui::theme;

/// Chart widget state that survives between frames: the drag state machine,
/// a pending scroll-to-today and the task under the last context menu.
#[derive(Debug, Default)]
pub struct GanttChart {
    controller: InteractionController,
    scroll: DeferredScroll,
    menu_task: Option<TaskId>,
}

impl GanttChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_scroll_to_today(&mut self) {
        self.scroll.schedule();
    }

    pub fn is_dragging(&self) -> bool {
        self.controller.is_dragging()
    }

    /// Render the chart area and return what the user did with it.
    pub fn show(
        &mut self,
        ui: &mut Ui,
        tree: &TaskTree,
        layout: &ChartLayout,
        dependencies: &[Dependency],
        selected: Option<TaskId>,
        today: NaiveDate,
    ) -> Vec<ChartEvent> {
        let mut events = Vec::new();
        let axis = layout.axis;
        let available = ui.available_size();
        let canvas_size = Vec2::new(
            axis.total_width().max(available.x),
            (layout.content_height() + theme::ROW_HEIGHT).max(available.y),
        );

        let mut area = egui::ScrollArea::both()
            .auto_shrink([false, false])
            .drag_to_scroll(false);
        if self.scroll.tick() {
            if let Some(marker) = today_marker(&axis, today) {
                area = area.horizontal_scroll_offset(scroll_offset_for(marker.x, available.x));
            }
        }
        if self.scroll.is_pending() {
            ui.ctx().request_repaint();
        }

        area.show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(canvas_size, Sense::click_and_drag());
            let origin = response.rect.min.to_vec2();
            let to_local = |p: Pos2| p - origin;

            // Pointer → drag state machine.
            let (pressed, down, released, pointer) = ui.input(|i| {
                (
                    i.pointer.primary_pressed(),
                    i.pointer.primary_down(),
                    i.pointer.primary_released(),
                    i.pointer.interact_pos(),
                )
            });
            let local_pointer = pointer.map(to_local);

            if pressed && response.hovered() {
                if let Some(pos) = local_pointer {
                    events.extend(self.controller.pointer_down(pos, layout));
                    // Don't yank the canvas out from under a bar being dragged.
                    if self.controller.is_dragging() {
                        self.scroll.cancel();
                    }
                }
            }
            if self.controller.is_dragging() {
                if let Some(pos) = local_pointer.filter(|_| down || released) {
                    self.controller.pointer_move(pos, &axis);
                }
                if released || !down {
                    events.extend(self.controller.pointer_up(&axis));
                }
            }

            let hover = response.hover_pos().map(to_local);
            if response.double_clicked() {
                if let Some(bar) = hover.and_then(|p| layout.bar_at(p)) {
                    events.push(ChartEvent::EditRequested(bar.task_id));
                }
            }
            if response.secondary_clicked() {
                self.menu_task = hover.and_then(|p| layout.bar_at(p)).map(|b| b.task_id);
                events.extend(self.menu_task.map(ChartEvent::Selected));
            }

            let cursor = self.controller.cursor(layout, hover);
            if let Some(icon) = cursor_icon(cursor) {
                ui.ctx().set_cursor_icon(icon);
            }

            // Geometry with the live drag preview applied.
            let mut preview = layout.clone();
            preview.apply_drag(self.controller.state());

            let canvas = response.rect;
            painter.rect_filled(canvas, 0.0, theme::BG_DARK);
            draw_rows(&painter, canvas, &preview);
            draw_grid(&painter, canvas, &axis);
            draw_header(&painter, canvas, &axis);

            for bar in &preview.bars {
                draw_baseline(&painter, origin, bar);
            }
            draw_dependencies(&painter, origin, &preview, dependencies);
            for bar in &preview.bars {
                let Some(task) = tree.get(bar.task_id) else { continue };
                let is_selected = selected == Some(bar.task_id);
                if bar.is_milestone {
                    draw_milestone(&painter, origin, bar, &task.name, is_selected);
                } else {
                    draw_task_bar(&painter, origin, bar, &task.name, is_selected);
                }
            }
            if let Some(marker) = today_marker(&axis, today) {
                draw_today_line(&painter, canvas, marker.x + origin.x);
            }

            if !self.controller.is_dragging() {
                if let Some(bar) = hover.and_then(|p| layout.bar_at(p)) {
                    if let Some(task) = tree.get(bar.task_id) {
                        egui::show_tooltip_at_pointer(
                            ui.ctx(),
                            ui.layer_id(),
                            Id::new(("task-tip", bar.task_id)),
                            |ui| {
                                ui.strong(&task.name);
                                ui.label(format!(
                                    "{} → {} ({} d)",
                                    task.start.format("%Y-%m-%d"),
                                    task.end.format("%Y-%m-%d"),
                                    task.duration_days(),
                                ));
                                ui.label(format!("Progress: {}%", task.progress));
                                if let Some(assignee) = &task.assignee {
                                    ui.label(format!("Assignee: {assignee}"));
                                }
                                if task.has_baseline() {
                                    ui.label(format!(
                                        "Variance: start {:+} d, end {:+} d",
                                        task.start_variance_days(),
                                        task.end_variance_days(),
                                    ));
                                }
                            },
                        );
                    }
                }
            }

            let menu_task = self.menu_task;
            response.context_menu(|ui| {
                let Some(id) = menu_task else {
                    ui.label("No task here");
                    return;
                };
                if ui.button(format!("{} Edit", egui_phosphor::regular::PENCIL_SIMPLE)).clicked() {
                    events.push(ChartEvent::EditRequested(id));
                    ui.close_menu();
                }
                if ui.button(format!("{} Delete", egui_phosphor::regular::TRASH)).clicked() {
                    events.push(ChartEvent::DeleteRequested(id));
                    ui.close_menu();
                }
            });
        });

        events
    }
}

fn cursor_icon(hint: CursorHint) -> Option<CursorIcon> {
    match hint {
        CursorHint::Default => None,
        CursorHint::ResizeHorizontal => Some(CursorIcon::ResizeHorizontal),
        CursorHint::Grab => Some(CursorIcon::Grab),
        CursorHint::Grabbing => Some(CursorIcon::Grabbing),
    }
}

fn draw_rows(painter: &Painter, canvas: Rect, layout: &ChartLayout) {
    for row in 0..layout.row_count() {
        let y = canvas.top() + theme::HEADER_HEIGHT + row as f32 * theme::ROW_HEIGHT;
        let fill = if row % 2 == 0 { theme::BG_PANEL } else { theme::BG_DARK };
        let band = Rect::from_min_size(
            Pos2::new(canvas.left(), y),
            Vec2::new(canvas.width(), theme::ROW_HEIGHT),
        );
        painter.rect_filled(band, 0.0, fill);
        painter.line_segment(
            [band.left_bottom(), band.right_bottom()],
            Stroke::new(0.5, theme::BORDER_SUBTLE),
        );
    }
}

/// Dates that start a grid column at this granularity.
fn column_starts(axis: &TimeAxis) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut date = axis.min_date;
    while date <= axis.max_date {
        let starts = match axis.granularity {
            Granularity::Day => true,
            Granularity::Week => date.weekday() == Weekday::Mon,
            Granularity::Month => date.day() == 1,
        };
        if starts {
            out.push(date);
        }
        date += Duration::days(1);
    }
    out
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn draw_grid(painter: &Painter, canvas: Rect, axis: &TimeAxis) {
    let top = canvas.top() + theme::HEADER_HEIGHT;
    if axis.granularity == Granularity::Day {
        let mut date = axis.min_date;
        while date <= axis.max_date {
            if is_weekend(date) {
                let x = canvas.left() + axis.date_to_x(date);
                painter.rect_filled(
                    Rect::from_min_max(
                        Pos2::new(x, top),
                        Pos2::new(x + axis.unit_width, canvas.bottom()),
                    ),
                    0.0,
                    theme::BG_WEEKEND,
                );
            }
            date += Duration::days(1);
        }
    }
    for date in column_starts(axis) {
        let x = canvas.left() + axis.date_to_x(date);
        painter.line_segment(
            [Pos2::new(x, top), Pos2::new(x, canvas.bottom())],
            Stroke::new(0.5, theme::GRID_LINE),
        );
    }
}

fn draw_header(painter: &Painter, canvas: Rect, axis: &TimeAxis) {
    let header = Rect::from_min_size(canvas.min, Vec2::new(canvas.width(), theme::HEADER_HEIGHT));
    painter.rect_filled(header, 0.0, theme::BG_HEADER);
    painter.line_segment(
        [header.left_bottom(), header.right_bottom()],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    let upper_y = header.top() + 12.0;
    let lower_y = header.top() + 30.0;
    let columns = column_starts(axis);

    for (i, date) in columns.iter().copied().enumerate() {
        let x = canvas.left() + axis.date_to_x(date);
        match axis.granularity {
            Granularity::Day => {
                let color = if is_weekend(date) { theme::TEXT_DIM } else { theme::TEXT_SECONDARY };
                painter.text(
                    Pos2::new(x + axis.unit_width / 2.0, lower_y),
                    egui::Align2::CENTER_CENTER,
                    date.format("%d").to_string(),
                    theme::font_sub(),
                    color,
                );
                if date.day() == 1 || i == 0 {
                    painter.text(
                        Pos2::new(x + 3.0, upper_y),
                        egui::Align2::LEFT_CENTER,
                        date.format("%b %Y").to_string(),
                        theme::font_header(),
                        theme::TEXT_PRIMARY,
                    );
                }
            }
            Granularity::Week => {
                painter.text(
                    Pos2::new(x + 3.0, lower_y),
                    egui::Align2::LEFT_CENTER,
                    date.format("W%V").to_string(),
                    theme::font_sub(),
                    theme::TEXT_SECONDARY,
                );
                if date.day() <= 7 || i == 0 {
                    painter.text(
                        Pos2::new(x + 3.0, upper_y),
                        egui::Align2::LEFT_CENTER,
                        date.format("%b %Y").to_string(),
                        theme::font_header(),
                        theme::TEXT_PRIMARY,
                    );
                }
            }
            Granularity::Month => {
                painter.text(
                    Pos2::new(x + 4.0, lower_y),
                    egui::Align2::LEFT_CENTER,
                    date.format("%b").to_string(),
                    theme::font_sub(),
                    theme::TEXT_SECONDARY,
                );
                if date.month() == 1 || i == 0 {
                    painter.text(
                        Pos2::new(x + 4.0, upper_y),
                        egui::Align2::LEFT_CENTER,
                        date.format("%Y").to_string(),
                        theme::font_header(),
                        theme::TEXT_PRIMARY,
                    );
                }
            }
        }
    }
}

fn draw_baseline(painter: &Painter, origin: Vec2, bar: &BarGeometry) {
    if let Some(baseline) = bar.baseline_rect {
        painter.rect_filled(baseline.translate(origin), Rounding::same(1.0), theme::BASELINE_FILL);
    }
    if let Some(variance) = bar.variance {
        let color = match variance.kind {
            VarianceKind::Late => theme::VARIANCE_LATE,
            VarianceKind::Early => theme::VARIANCE_EARLY,
        };
        painter.rect_filled(variance.rect.translate(origin), Rounding::same(1.0), color);
    }
}

fn draw_dependencies(painter: &Painter, origin: Vec2, layout: &ChartLayout, deps: &[Dependency]) {
    let stroke = Stroke::new(1.5, theme::DEPENDENCY_LINE);
    for connector in route(layout, deps) {
        let from = connector.from + origin;
        let to = connector.to + origin;
        for [a, b] in dash_segments(from, to, 6.0, 4.0) {
            painter.line_segment([a, b], stroke);
        }
        let head = connector.arrow_head().map(|p| p + origin);
        painter.add(egui::Shape::convex_polygon(head.to_vec(), theme::DEPENDENCY_LINE, Stroke::NONE));
    }
}

fn draw_task_bar(painter: &Painter, origin: Vec2, bar: &BarGeometry, name: &str, is_selected: bool) {
    let rect = bar.rect.translate(origin);
    let rounding = Rounding::same(theme::BAR_ROUNDING);

    painter.rect_filled(rect.translate(Vec2::new(1.0, 2.0)), rounding, Color32::from_black_alpha(35));
    painter.rect_filled(rect, rounding, bar.color);
    let highlight = Rect::from_min_size(rect.min, Vec2::new(rect.width(), (rect.height() * 0.45).max(4.0)));
    painter.rect_filled(
        highlight,
        Rounding {
            nw: theme::BAR_ROUNDING,
            ne: theme::BAR_ROUNDING,
            sw: 0.0,
            se: 0.0,
        },
        Color32::from_white_alpha(25),
    );

    if let Some(progress) = bar.progress_rect {
        let progress = progress.translate(origin);
        painter.rect_filled(progress, rounding, theme::PROGRESS_OVERLAY);
        if progress.right() < rect.right() - 2.0 {
            painter.line_segment(
                [
                    Pos2::new(progress.right(), rect.top() + 2.0),
                    Pos2::new(progress.right(), rect.bottom() - 2.0),
                ],
                Stroke::new(1.5, theme::HANDLE_COLOR),
            );
        }
    }

    if is_selected {
        painter.rect_stroke(
            rect.expand(1.5),
            Rounding::same(theme::BAR_ROUNDING + 1.5),
            Stroke::new(2.0, theme::BORDER_ACCENT),
        );
    }

    if rect.width() > 30.0 {
        let galley = painter.layout_no_wrap(name.to_owned(), theme::font_bar(), theme::TEXT_ON_BAR);
        let text_y = rect.top() + (rect.height() - galley.size().y) / 2.0;
        painter
            .with_clip_rect(rect.shrink(2.0))
            .galley(Pos2::new(rect.left() + 6.0, text_y), galley, Color32::TRANSPARENT);
    }

    painter.text(
        Pos2::new(rect.right() + 6.0, rect.center().y),
        egui::Align2::LEFT_CENTER,
        format!("{}%", bar.progress),
        theme::font_small(),
        theme::TEXT_SECONDARY,
    );
}

fn draw_milestone(painter: &Painter, origin: Vec2, bar: &BarGeometry, name: &str, is_selected: bool) {
    let center = bar.rect.center() + origin;
    let size = theme::MILESTONE_SIZE / 2.0;
    let diamond = |c: Pos2| {
        vec![
            Pos2::new(c.x, c.y - size),
            Pos2::new(c.x + size, c.y),
            Pos2::new(c.x, c.y + size),
            Pos2::new(c.x - size, c.y),
        ]
    };

    painter.add(egui::Shape::convex_polygon(
        diamond(center + Vec2::new(1.0, 1.5)),
        Color32::from_black_alpha(40),
        Stroke::NONE,
    ));
    let outline = if is_selected {
        Stroke::new(2.0, theme::BORDER_ACCENT)
    } else {
        Stroke::NONE
    };
    painter.add(egui::Shape::convex_polygon(diamond(center), bar.color, outline));

    painter.text(
        Pos2::new(center.x + size + 6.0, center.y),
        egui::Align2::LEFT_CENTER,
        name,
        theme::font_bar(),
        theme::TEXT_SECONDARY,
    );
}

fn draw_today_line(painter: &Painter, canvas: Rect, x: f32) {
    let top = canvas.top() + theme::HEADER_HEIGHT;
    painter.line_segment(
        [Pos2::new(x, top), Pos2::new(x, canvas.bottom())],
        Stroke::new(1.5, theme::TODAY_LINE),
    );

    let badge = Rect::from_min_size(Pos2::new(x - 21.0, top - 1.0), Vec2::new(42.0, 14.0));
    painter.rect_filled(badge, Rounding::same(3.0), theme::TODAY_LINE);
    painter.text(
        badge.center(),
        egui::Align2::CENTER_CENTER,
        "Today",
        theme::font_small(),
        Color32::WHITE,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(granularity: Granularity) -> TimeAxis {
        let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        TimeAxis::from_dates([(start, end)], granularity).unwrap()
    }

    #[test]
    fn week_columns_start_on_monday() {
        let cols = column_starts(&axis(Granularity::Week));
        assert!(!cols.is_empty());
        assert!(cols.iter().all(|d| d.weekday() == Weekday::Mon));
        assert!(cols.windows(2).all(|w| (w[1] - w[0]).num_days() == 7));
    }

    #[test]
    fn month_columns_start_on_the_first() {
        let cols = column_starts(&axis(Granularity::Month));
        let firsts: Vec<_> = cols.iter().map(|d| (d.month(), d.day())).collect();
        assert_eq!(firsts, vec![(2, 1), (3, 1)]);
    }

    #[test]
    fn day_columns_cover_every_day() {
        let a = axis(Granularity::Day);
        assert_eq!(column_starts(&a).len() as i64, a.day_count());
    }
}
