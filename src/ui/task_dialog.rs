use chrono::{Duration, NaiveDate};
use egui::{Color32, Context, RichText, Window};
use egui_phosphor::regular as icons;

use crate::model::{Dependency, DependencyKind, ProjectId, Task, TaskId, TaskTree};
use crate::store::{NewTask, TaskUpdate};
use crate::ui::task_tree::display_name;
use crate::ui::theme;

/// Editable copy of a task's user-facing fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskForm {
    pub name: String,
    pub description: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub progress: u8,
    pub is_milestone: bool,
    pub color: Option<String>,
    pub assignee: String,
}

impl TaskForm {
    pub fn for_new(start: NaiveDate) -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            start,
            end: start + Duration::days(7),
            progress: 0,
            is_milestone: false,
            color: None,
            assignee: String::new(),
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            description: task.description.clone(),
            start: task.start,
            end: task.end,
            progress: task.progress,
            is_milestone: task.is_milestone,
            color: task.color.clone(),
            assignee: task.assignee.clone().unwrap_or_default(),
        }
    }

    /// Enforce the form's own rules: a name, `end >= start`, single-day
    /// milestones and progress within 0..=100.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        out.name = out.name.trim().to_string();
        if out.name.is_empty() {
            out.name = "New Task".into();
        }
        if out.is_milestone || out.end < out.start {
            out.end = out.start;
        }
        out.progress = out.progress.min(100);
        out.assignee = out.assignee.trim().to_string();
        out
    }

    pub fn to_new_task(&self, project_id: ProjectId, parent_id: Option<TaskId>) -> NewTask {
        let f = self.normalized();
        NewTask {
            project_id,
            parent_id,
            name: f.name,
            description: f.description,
            start: f.start,
            end: f.end,
            progress: f.progress,
            is_milestone: f.is_milestone,
            color: f.color,
            assignee: Some(f.assignee).filter(|a| !a.is_empty()),
        }
    }

    pub fn to_update(&self) -> TaskUpdate {
        let f = self.normalized();
        TaskUpdate {
            name: Some(f.name),
            description: Some(f.description),
            start: Some(f.start),
            end: Some(f.end),
            progress: Some(f.progress),
            is_milestone: Some(f.is_milestone),
            color: Some(f.color),
            assignee: Some(Some(f.assignee).filter(|a| !a.is_empty())),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Create { parent_id: Option<TaskId> },
    Edit(TaskId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogOutcome {
    Save(DialogMode, TaskForm),
    Cancel,
    AddPredecessor {
        predecessor: TaskId,
        successor: TaskId,
        kind: DependencyKind,
    },
    RemovePredecessor {
        predecessor: TaskId,
        successor: TaskId,
    },
}

/// Modal create/edit form.
#[derive(Debug, Clone)]
pub struct TaskDialog {
    pub mode: DialogMode,
    pub form: TaskForm,
    pick_predecessor: Option<TaskId>,
    pick_kind: DependencyKind,
}

impl TaskDialog {
    pub fn create(parent_id: Option<TaskId>, start: NaiveDate) -> Self {
        Self {
            mode: DialogMode::Create { parent_id },
            form: TaskForm::for_new(start),
            pick_predecessor: None,
            pick_kind: DependencyKind::FinishToStart,
        }
    }

    pub fn edit(task: &Task) -> Self {
        Self {
            mode: DialogMode::Edit(task.id),
            form: TaskForm::from_task(task),
            pick_predecessor: None,
            pick_kind: DependencyKind::FinishToStart,
        }
    }

    fn title(&self) -> &'static str {
        match self.mode {
            DialogMode::Create { parent_id: Some(_) } => "Add Child Task",
            DialogMode::Create { parent_id: None } => "Add Task",
            DialogMode::Edit(_) => "Edit Task",
        }
    }

    /// Render the dialog. Returns an outcome when the user acts on it.
    pub fn show(&mut self, ctx: &Context, tree: &TaskTree, dependencies: &[Dependency]) -> Option<DialogOutcome> {
        let mut outcome = None;

        Window::new(RichText::new(self.title()).strong().size(14.0))
            .resizable(false)
            .collapsible(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .fixed_size([380.0, 0.0])
            .show(ctx, |ui| {
                ui.visuals_mut().extreme_bg_color = theme::BG_FIELD;
                ui.add_space(4.0);
                self.form_grid(ui);

                if let DialogMode::Edit(task_id) = self.mode {
                    ui.add_space(6.0);
                    ui.separator();
                    if let Some(o) = self.predecessor_section(ui, task_id, tree, dependencies) {
                        outcome = Some(o);
                    }
                }

                ui.add_space(6.0);
                ui.separator();
                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    let save = egui::Button::new(RichText::new("Save").color(Color32::WHITE))
                        .fill(theme::ACCENT)
                        .rounding(egui::Rounding::same(4.0));
                    if ui.add_sized([80.0, 28.0], save).clicked() {
                        outcome = Some(DialogOutcome::Save(self.mode, self.form.normalized()));
                    }
                    if ui.add_sized([80.0, 28.0], egui::Button::new("Cancel")).clicked() {
                        outcome = Some(DialogOutcome::Cancel);
                    }
                });
                ui.add_space(2.0);
            });

        if outcome.is_none() && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            outcome = Some(DialogOutcome::Cancel);
        }
        outcome
    }

    fn form_grid(&mut self, ui: &mut egui::Ui) {
        let form = &mut self.form;
        egui::Grid::new("task_dialog_grid")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                let label = |ui: &mut egui::Ui, text: &str| {
                    ui.label(RichText::new(text).color(theme::TEXT_SECONDARY));
                };

                label(ui, "Name");
                ui.add_sized(
                    [240.0, 24.0],
                    egui::TextEdit::singleline(&mut form.name).hint_text("Task name..."),
                );
                ui.end_row();

                label(ui, "Description");
                ui.add_sized(
                    [240.0, 48.0],
                    egui::TextEdit::multiline(&mut form.description).hint_text("Notes..."),
                );
                ui.end_row();

                label(ui, "Start");
                if ui
                    .add(egui_extras::DatePickerButton::new(&mut form.start).id_salt("dlg_start"))
                    .changed()
                    && (form.is_milestone || form.end < form.start)
                {
                    form.end = form.start;
                }
                ui.end_row();

                label(ui, "End");
                ui.add_enabled_ui(!form.is_milestone, |ui| {
                    if ui
                        .add(egui_extras::DatePickerButton::new(&mut form.end).id_salt("dlg_end"))
                        .changed()
                        && form.end < form.start
                    {
                        form.end = form.start;
                    }
                });
                ui.end_row();

                label(ui, "Progress");
                ui.add(egui::Slider::new(&mut form.progress, 0..=100).suffix("%"));
                ui.end_row();

                label(ui, "");
                if ui.checkbox(&mut form.is_milestone, "Milestone").changed() && form.is_milestone {
                    form.end = form.start;
                }
                ui.end_row();

                label(ui, "Color");
                ui.horizontal_wrapped(|ui| {
                    ui.spacing_mut().item_spacing = egui::vec2(4.0, 4.0);
                    if ui.selectable_label(form.color.is_none(), "Auto").clicked() {
                        form.color = None;
                    }
                    for color in theme::TASK_COLORS {
                        let hex = theme::to_hex_color(*color);
                        let is_current = form.color.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(&hex));
                        let (rect, resp) = ui.allocate_exact_size(egui::vec2(16.0, 16.0), egui::Sense::click());
                        ui.painter().rect_filled(rect, egui::Rounding::same(3.0), *color);
                        if is_current {
                            ui.painter().rect_stroke(
                                rect.expand(1.0),
                                egui::Rounding::same(4.0),
                                egui::Stroke::new(2.0, Color32::WHITE),
                            );
                        }
                        if resp.on_hover_text(&hex).clicked() {
                            form.color = Some(hex);
                        }
                    }
                });
                ui.end_row();

                label(ui, "Assignee");
                ui.add_sized([240.0, 24.0], egui::TextEdit::singleline(&mut form.assignee));
                ui.end_row();
            });
    }

    fn predecessor_section(
        &mut self,
        ui: &mut egui::Ui,
        task_id: TaskId,
        tree: &TaskTree,
        dependencies: &[Dependency],
    ) -> Option<DialogOutcome> {
        let mut outcome = None;
        let name_of = |id: TaskId| tree.get(id).map(display_name).unwrap_or_else(|| "?".into());

        ui.label(RichText::new("Predecessors").size(10.0).color(theme::TEXT_DIM).strong());
        let incoming: Vec<&Dependency> = dependencies.iter().filter(|d| d.successor == task_id).collect();
        if incoming.is_empty() {
            ui.label(RichText::new("No predecessors").size(9.5).color(theme::TEXT_DIM));
        }
        for dep in &incoming {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(format!("[{}] {}", dep.kind.short_label(), name_of(dep.predecessor)))
                        .size(11.0)
                        .color(theme::TEXT_SECONDARY),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let del = ui.add(
                        egui::Button::new(RichText::new(icons::X).size(9.0).color(theme::TEXT_DIM)).frame(false),
                    );
                    if del.on_hover_text("Remove dependency").clicked() {
                        outcome = Some(DialogOutcome::RemovePredecessor {
                            predecessor: dep.predecessor,
                            successor: task_id,
                        });
                    }
                });
            });
        }

        let candidates = predecessor_candidates(tree, dependencies, task_id);
        if candidates.is_empty() {
            return outcome;
        }

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            let kind = &mut self.pick_kind;
            egui::ComboBox::from_id_salt("dlg-dep-kind")
                .selected_text(kind.short_label())
                .width(46.0)
                .show_ui(ui, |ui| {
                    for k in DependencyKind::ALL {
                        ui.selectable_value(kind, k, k.short_label()).on_hover_text(k.description());
                    }
                });

            let target_label = self
                .pick_predecessor
                .map(name_of)
                .unwrap_or_else(|| "Pick a task...".into());
            let pick = &mut self.pick_predecessor;
            egui::ComboBox::from_id_salt("dlg-dep-target")
                .selected_text(target_label)
                .width(200.0)
                .show_ui(ui, |ui| {
                    for id in &candidates {
                        ui.selectable_value(pick, Some(*id), name_of(*id));
                    }
                });

            let btn = egui::Button::new(RichText::new(icons::PLUS).color(Color32::WHITE))
                .fill(theme::ACCENT)
                .rounding(egui::Rounding::same(4.0));
            if ui.add_enabled(self.pick_predecessor.is_some(), btn).clicked() {
                if let Some(predecessor) = self.pick_predecessor.take() {
                    outcome = Some(DialogOutcome::AddPredecessor {
                        predecessor,
                        successor: task_id,
                        kind: self.pick_kind,
                    });
                }
            }
        });
        outcome
    }
}

/// Tasks that could become a new predecessor of `task_id`, in tree order.
pub fn predecessor_candidates(tree: &TaskTree, dependencies: &[Dependency], task_id: TaskId) -> Vec<TaskId> {
    tree.flatten_all()
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| *id != task_id)
        .filter(|id| {
            !dependencies
                .iter()
                .any(|d| d.predecessor == *id && d.successor == task_id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn normalization_rules() {
        let form = TaskForm {
            name: "  ".into(),
            end: d(5),
            assignee: " Lee ".into(),
            ..TaskForm::for_new(d(10))
        };
        let f = form.normalized();
        assert_eq!(f.name, "New Task");
        assert_eq!(f.end, d(10));
        assert_eq!(f.assignee, "Lee");

        let milestone = TaskForm {
            is_milestone: true,
            ..TaskForm::for_new(d(10))
        };
        assert_eq!(milestone.normalized().end, d(10));
    }

    #[test]
    fn edit_form_round_trips_to_update() {
        let mut task = Task::new(3, 1, "Build", d(10), d(12));
        task.progress = 40;
        task.assignee = Some("Ana".into());
        let mut form = TaskForm::from_task(&task);
        form.assignee.clear();
        form.color = Some("#FF0000".into());

        let update = form.to_update();
        assert_eq!(update.name.as_deref(), Some("Build"));
        assert_eq!(update.progress, Some(40));
        assert_eq!(update.assignee, Some(None));
        assert_eq!(update.color, Some(Some("#FF0000".into())));
        assert_eq!(update.sort_order, None);
    }

    #[test]
    fn new_task_carries_parent() {
        let form = TaskForm {
            name: "Child".into(),
            ..TaskForm::for_new(d(1))
        };
        let new = form.to_new_task(7, Some(2));
        assert_eq!(new.project_id, 7);
        assert_eq!(new.parent_id, Some(2));
        assert_eq!(new.end, d(8));
        assert_eq!(new.assignee, None);
    }

    #[test]
    fn candidates_exclude_self_and_existing_predecessors() {
        let mut b = Task::new(2, 1, "b", d(1), d(2));
        b.sort_order = 1;
        let mut c = Task::new(3, 1, "c", d(1), d(2));
        c.sort_order = 2;
        let tree = TaskTree::build(vec![Task::new(1, 1, "a", d(1), d(2)), b, c]);
        let deps = [Dependency {
            predecessor: 1,
            successor: 3,
            kind: DependencyKind::FinishToStart,
        }];
        assert_eq!(predecessor_candidates(&tree, &deps, 3), vec![2]);
        assert_eq!(predecessor_candidates(&tree, &deps, 1), vec![2, 3]);
    }
}
