use egui::{Color32, RichText, Ui};
use egui_phosphor::regular as icons;

use crate::chart::layout::resolve_color;
use crate::model::{Task, TaskId, TaskTree};
use crate::ui::theme;

/// Actions that the task tree can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeAction {
    Select(TaskId),
    SetExpanded(TaskId, bool),
    AddRoot,
    AddChild(TaskId),
    Edit(TaskId),
    SetBaseline(TaskId),
    ClearBaseline(TaskId),
    MoveUp(TaskId),
    MoveDown(TaskId),
    Delete(TaskId),
}

/// Display label for the name column.
pub fn display_name(task: &Task) -> String {
    if task.is_milestone {
        format!("◆ {}", task.name)
    } else {
        task.name.clone()
    }
}

const ROW_HEIGHT: f32 = 26.0;
const COL_PROGRESS: f32 = 44.0;
const COL_DATE: f32 = 70.0;
const COL_ASSIGNEE: f32 = 70.0;

/// Render the left-side indented task list.
pub fn show_task_tree(tree: &TaskTree, selected: Option<TaskId>, ui: &mut Ui) -> Option<TreeAction> {
    let mut action = None;

    ui.add_space(2.0);
    ui.horizontal(|ui| {
        ui.label(RichText::new("Tasks").strong().size(15.0).color(theme::TEXT_PRIMARY));
        ui.add_space(4.0);
        ui.label(RichText::new(format!("({})", tree.len())).size(11.0).color(theme::TEXT_DIM));
    });
    ui.add_space(4.0);

    let btn = egui::Button::new(
        RichText::new(format!("{}  Add Task", icons::PLUS)).color(Color32::WHITE).size(12.0),
    )
    .fill(theme::ACCENT)
    .rounding(egui::Rounding::same(5.0));
    if ui.add_sized([ui.available_width(), 30.0], btn).clicked() {
        action = Some(TreeAction::AddRoot);
    }

    ui.add_space(6.0);
    ui.separator();

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 4.0;
        let hdr = |ui: &mut Ui, text: &str, width: f32| {
            ui.add_sized(
                [width, 16.0],
                egui::Label::new(RichText::new(text).size(9.0).color(theme::TEXT_DIM).strong()),
            );
        };
        let name_width = (ui.available_width() - COL_PROGRESS - 2.0 * COL_DATE - COL_ASSIGNEE - 16.0).max(60.0);
        hdr(ui, "TASK", name_width);
        hdr(ui, "DONE", COL_PROGRESS);
        hdr(ui, "START", COL_DATE);
        hdr(ui, "END", COL_DATE);
        hdr(ui, "ASSIGNEE", COL_ASSIGNEE);
    });

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for (i, (id, depth)) in tree.flatten_visible().into_iter().enumerate() {
                let Some(task) = tree.get(id) else { continue };
                let is_selected = selected == Some(id);
                let row_bg = if is_selected {
                    theme::BG_SELECTED
                } else if i % 2 == 0 {
                    theme::BG_PANEL
                } else {
                    theme::BG_DARK
                };

                // The row is allocated before its contents so the caret button
                // stays clickable on top of it.
                let (row_rect, row) = ui.allocate_exact_size(
                    egui::vec2(ui.available_width(), ROW_HEIGHT),
                    egui::Sense::click(),
                );
                ui.painter().rect_filled(row_rect, egui::Rounding::same(4.0), row_bg);

                let content = row_rect.shrink2(egui::vec2(6.0, 2.0));
                ui.allocate_new_ui(
                    egui::UiBuilder::new()
                        .max_rect(content)
                        .layout(egui::Layout::left_to_right(egui::Align::Center)),
                    |ui| {
                        ui.spacing_mut().item_spacing.x = 4.0;
                        let name_width = (ui.available_width()
                            - COL_PROGRESS
                            - 2.0 * COL_DATE
                            - COL_ASSIGNEE
                            - 16.0)
                            .max(60.0);

                        ui.allocate_ui_with_layout(
                            egui::vec2(name_width, 18.0),
                            egui::Layout::left_to_right(egui::Align::Center),
                            |ui| {
                                ui.add_space(depth as f32 * theme::TREE_INDENT);
                                if tree.has_children(id) {
                                    let caret = if task.is_expanded { icons::CARET_DOWN } else { icons::CARET_RIGHT };
                                    let toggle = ui.add(
                                        egui::Button::new(RichText::new(caret).size(11.0).color(theme::TEXT_SECONDARY))
                                            .frame(false),
                                    );
                                    if toggle.clicked() {
                                        action = Some(TreeAction::SetExpanded(id, !task.is_expanded));
                                    }
                                } else {
                                    ui.add_space(14.0);
                                }
                                let (dot, _) = ui.allocate_exact_size(egui::vec2(6.0, 6.0), egui::Sense::hover());
                                ui.painter().circle_filled(dot.center(), 3.0, resolve_color(task));
                                let color = if is_selected { Color32::WHITE } else { theme::TEXT_PRIMARY };
                                ui.add(egui::Label::new(RichText::new(display_name(task)).size(12.0).color(color)).truncate().selectable(false));
                            },
                        );

                        let cell = |ui: &mut Ui, text: String, width: f32| {
                            ui.add_sized(
                                [width, 18.0],
                                egui::Label::new(RichText::new(text).size(10.5).color(theme::TEXT_SECONDARY))
                                    .truncate()
                                    .selectable(false),
                            );
                        };
                        cell(ui, format!("{}%", task.progress), COL_PROGRESS);
                        cell(ui, task.start.format("%Y-%m-%d").to_string(), COL_DATE);
                        cell(ui, task.end.format("%Y-%m-%d").to_string(), COL_DATE);
                        cell(ui, task.assignee.clone().unwrap_or_default(), COL_ASSIGNEE);
                    },
                );

                if row.clicked() && action.is_none() {
                    action = Some(TreeAction::Select(id));
                }
                if row.double_clicked() {
                    action = Some(TreeAction::Edit(id));
                }
                row.context_menu(|ui| {
                    let mut item = |ui: &mut Ui, icon: &str, label: &str, what: TreeAction| {
                        if ui.button(format!("{icon}  {label}")).clicked() {
                            action = Some(what);
                            ui.close_menu();
                        }
                    };
                    item(ui, icons::PENCIL_SIMPLE, "Edit", TreeAction::Edit(id));
                    item(ui, icons::PLUS, "Add Child Task", TreeAction::AddChild(id));
                    ui.separator();
                    item(ui, icons::FLAG, "Set Baseline", TreeAction::SetBaseline(id));
                    if task.has_baseline() {
                        item(ui, icons::X, "Clear Baseline", TreeAction::ClearBaseline(id));
                    }
                    ui.separator();
                    item(ui, icons::ARROW_UP, "Move Up", TreeAction::MoveUp(id));
                    item(ui, icons::ARROW_DOWN, "Move Down", TreeAction::MoveDown(id));
                    ui.separator();
                    item(ui, icons::TRASH, "Delete", TreeAction::Delete(id));
                });

                ui.add_space(1.0);
            }
        });

    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn milestones_get_diamond_prefix() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(display_name(&Task::new_milestone(1, 1, "Release", day)), "◆ Release");
        assert_eq!(display_name(&Task::new(2, 1, "Build", day, day)), "Build");
    }
}
