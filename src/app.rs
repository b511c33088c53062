use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::chart::{ChartEvent, ChartLayout};
use crate::io::{export_csv, export_timeline_csv, timeline_path};
use crate::model::{Dependency, Granularity, Project, Task, TaskId, TaskTree, TimeAxis};
use crate::settings::AppSettings;
use crate::store::{self, Store, StoreError};
use crate::ui;
use crate::ui::gantt_chart::GanttChart;
use crate::ui::task_dialog::{DialogMode, DialogOutcome, TaskDialog};
use crate::ui::task_tree::TreeAction;
use crate::ui::toolbar::ToolbarAction;

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn selection_status(task: &Task) -> String {
    format!(
        "Selected: {} ({} ~ {})",
        task.name,
        task.start.format("%Y-%m-%d"),
        task.end.format("%Y-%m-%d")
    )
}

/// Main application state. The store is the source of truth; everything else
/// is rebuilt from it after each change.
pub struct GanttApp {
    store: Store,
    settings: AppSettings,
    project: Project,

    tree: TaskTree,
    dependencies: Vec<Dependency>,
    axis: Option<TimeAxis>,
    layout: Option<ChartLayout>,

    chart: GanttChart,
    selected: Option<TaskId>,
    dialog: Option<TaskDialog>,
    show_about: bool,

    status_message: String,
}

impl GanttApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Result<Self, StoreError> {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);
        ui::theme::apply_theme(&cc.egui_ctx);

        let settings = AppSettings::load();
        let mut status_message = "Ready".to_string();
        let db_path = settings.database_path();
        let store = match Store::open(&db_path) {
            Ok(store) => store,
            Err(e) => {
                warn!(path = %db_path.display(), error = %e, "falling back to in-memory database");
                status_message = format!("Could not open {} ({e}); changes will not be saved", db_path.display());
                Store::open_in_memory()?
            }
        };
        let project = store.first_or_create_default(today())?;
        info!(project_id = project.id, name = %project.name, "loaded project");

        let mut app = Self {
            store,
            settings,
            project,
            tree: TaskTree::default(),
            dependencies: Vec::new(),
            axis: None,
            layout: None,
            chart: GanttChart::new(),
            selected: None,
            dialog: None,
            show_about: false,
            status_message,
        };
        app.reload();
        if app.settings.scroll_to_today {
            app.chart.schedule_scroll_to_today();
        }
        Ok(app)
    }

    // --- Model ---

    fn reload(&mut self) {
        if let Err(e) = self.load_model() {
            warn!(error = %e, "reload failed");
            self.status_message = format!("Could not load tasks: {e}");
        }
    }

    fn load_model(&mut self) -> store::Result<()> {
        let records = self.store.list_tasks(self.project.id)?;
        self.tree = TaskTree::from_records(records);
        self.dependencies = self.store.list_dependencies(self.project.id)?;
        self.axis = TimeAxis::from_dates(
            self.tree.tasks().map(|t| (t.start, t.end)),
            self.settings.granularity,
        );
        self.relayout();
        if self.selected.is_some_and(|id| !self.tree.contains(id)) {
            self.selected = None;
        }
        debug!(tasks = self.tree.len(), dependencies = self.dependencies.len(), "model reloaded");
        Ok(())
    }

    fn relayout(&mut self) {
        self.layout = self.axis.as_ref().map(|axis| ChartLayout::compute(&self.tree, axis));
    }

    fn select(&mut self, id: TaskId) {
        self.selected = Some(id);
        if let Some(task) = self.tree.get(id) {
            self.status_message = selection_status(task);
        }
    }

    fn task_name(&self, id: TaskId) -> String {
        self.tree.get(id).map(|t| t.name.clone()).unwrap_or_default()
    }

    /// Report the outcome of a store write and refresh from the database.
    fn finish(&mut self, outcome: store::Result<String>) {
        match outcome {
            Ok(message) => self.status_message = message,
            Err(e) => {
                warn!(error = %e, "store operation failed");
                self.status_message = format!("Database error: {e}");
            }
        }
        self.reload();
    }

    // --- Actions ---

    fn set_granularity(&mut self, granularity: Granularity) {
        if self.settings.granularity == granularity {
            return;
        }
        self.settings.granularity = granularity;
        self.settings.save();
        if let Some(axis) = self.axis.as_mut() {
            axis.set_granularity(granularity);
        }
        self.relayout();
        self.status_message = format!("{} view", granularity.label());
    }

    fn open_editor(&mut self, id: TaskId) {
        if let Some(task) = self.tree.get(id) {
            self.selected = Some(id);
            self.dialog = Some(TaskDialog::edit(task));
        }
    }

    fn open_create(&mut self, parent_id: Option<TaskId>) {
        let start = parent_id
            .and_then(|id| self.tree.get(id))
            .map(|parent| parent.start)
            .unwrap_or_else(today);
        self.dialog = Some(TaskDialog::create(parent_id, start));
    }

    /// Delete `id` and all of its descendants after a native confirmation.
    fn delete_with_confirm(&mut self, id: TaskId) {
        let ids = self.tree.subtree(id);
        if ids.is_empty() {
            return;
        }
        let name = self.task_name(id);
        let description = match ids.len() - 1 {
            0 => format!("Delete '{name}'?"),
            n => format!("Delete '{name}' and its {n} subtask(s)?"),
        };
        let confirm = rfd::MessageDialog::new()
            .set_title("Delete Task")
            .set_description(description)
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        if confirm != rfd::MessageDialogResult::Yes {
            return;
        }
        let outcome = self
            .store
            .delete_tasks(&ids)
            .map(|count| format!("Deleted {count} task(s)"));
        self.finish(outcome);
    }

    fn apply_chart_event(&mut self, event: ChartEvent) {
        debug!(%event, "chart event");
        let outcome = match event {
            ChartEvent::Selected(id) => return self.select(id),
            ChartEvent::EditRequested(id) => return self.open_editor(id),
            ChartEvent::DeleteRequested(id) => return self.delete_with_confirm(id),
            ChartEvent::DateChanged { task_id, start, end } => {
                let name = self.task_name(task_id);
                self.store.update_dates(task_id, start, end).map(|()| {
                    format!(
                        "Updated '{}' ({} → {})",
                        name,
                        start.format("%Y-%m-%d"),
                        end.format("%Y-%m-%d")
                    )
                })
            }
            ChartEvent::ProgressChanged { task_id, progress } => {
                let name = self.task_name(task_id);
                self.store
                    .update_progress(task_id, progress)
                    .map(|()| format!("'{name}' is {progress}% done"))
            }
        };
        self.finish(outcome);
    }

    fn apply_tree_action(&mut self, action: TreeAction) {
        let outcome = match action {
            TreeAction::Select(id) => return self.select(id),
            TreeAction::AddRoot => return self.open_create(None),
            TreeAction::AddChild(id) => return self.open_create(Some(id)),
            TreeAction::Edit(id) => return self.open_editor(id),
            TreeAction::Delete(id) => return self.delete_with_confirm(id),
            TreeAction::SetExpanded(id, expanded) => {
                if let Err(e) = self.store.set_expanded(id, expanded) {
                    warn!(task_id = id, error = %e, "could not persist expanded flag");
                    self.status_message = format!("Database error: {e}");
                }
                return self.reload();
            }
            TreeAction::SetBaseline(id) => {
                let name = self.task_name(id);
                self.store
                    .set_baseline(id)
                    .map(|()| format!("Baseline set for '{name}'"))
            }
            TreeAction::ClearBaseline(id) => {
                let name = self.task_name(id);
                self.store
                    .clear_baseline(id)
                    .map(|()| format!("Baseline cleared for '{name}'"))
            }
            TreeAction::MoveUp(id) | TreeAction::MoveDown(id) => {
                let offset = if matches!(action, TreeAction::MoveUp(_)) { -1 } else { 1 };
                let Some(orders) = self.tree.reorder_siblings(id, offset) else {
                    return;
                };
                self.store.apply_reorder(&orders).map(|()| "Task moved".to_string())
            }
        };
        self.finish(outcome);
    }

    fn apply_dialog_outcome(&mut self, outcome: DialogOutcome) {
        let result = match outcome {
            DialogOutcome::Cancel => {
                self.dialog = None;
                return;
            }
            DialogOutcome::Save(DialogMode::Create { parent_id }, form) => {
                self.dialog = None;
                let new = form.to_new_task(self.project.id, parent_id);
                self.store.create_task(&new).map(|id| {
                    self.selected = Some(id);
                    format!("Added '{}'", new.name)
                })
            }
            DialogOutcome::Save(DialogMode::Edit(id), form) => {
                self.dialog = None;
                self.store
                    .update_task(id, &form.to_update())
                    .map(|_| format!("Updated '{}'", form.name))
            }
            DialogOutcome::AddPredecessor {
                predecessor,
                successor,
                kind,
            } => {
                let from = self.task_name(predecessor);
                let to = self.task_name(successor);
                self.store
                    .create_dependency(predecessor, successor, kind)
                    .map(|created| match created {
                        Some(_) => format!("Linked '{from}' → '{to}' ({})", kind.short_label()),
                        None => "Dependency already exists".to_string(),
                    })
            }
            DialogOutcome::RemovePredecessor {
                predecessor,
                successor,
            } => self
                .store
                .delete_dependency(predecessor, successor)
                .map(|_| "Dependency removed".to_string()),
        };
        self.finish(result);
    }

    fn apply_toolbar_action(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::AddTask => self.open_create(None),
            ToolbarAction::SetGranularity(g) => self.set_granularity(g),
            ToolbarAction::ScrollToToday => {
                if self.axis.is_some_and(|axis| axis.contains(today())) {
                    self.chart.schedule_scroll_to_today();
                } else {
                    self.status_message = "Today is outside the timeline".to_string();
                }
            }
            ToolbarAction::Refresh => {
                self.reload();
                self.status_message = "Reloaded".to_string();
            }
            ToolbarAction::ExportCsv => self.export_csv(),
            ToolbarAction::About => self.show_about = true,
        }
    }

    pub fn export_csv(&mut self) {
        if self.tree.is_empty() {
            self.status_message = "Nothing to export: project has no tasks".to_string();
            return;
        }

        let default_name = format!("{}.csv", self.project.name);
        let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .set_file_name(&default_name)
            .save_file()
        else {
            return;
        };
        let grid_path = timeline_path(&path);
        let written = export_csv(&self.tree, &path)
            .and_then(|count| export_timeline_csv(&self.tree, today(), &grid_path).map(|_| count));
        match written {
            Ok(count) => {
                self.status_message = format!(
                    "Exported {count} tasks to CSV (timeline in {})",
                    grid_path.display()
                );
                let open_it = rfd::MessageDialog::new()
                    .set_title("Export CSV")
                    .set_description(format!("Exported {count} tasks. Open the file now?"))
                    .set_buttons(rfd::MessageButtons::YesNo)
                    .show();
                if open_it == rfd::MessageDialogResult::Yes {
                    if let Err(e) = open::that(&path) {
                        warn!(path = %path.display(), error = %e, "could not open exported file");
                        self.status_message = format!("Could not open {}: {e}", path.display());
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "CSV export failed");
                self.status_message = format!("CSV export failed: {e}");
            }
        }
    }

    fn show_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_HEADER)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .font(ui::theme::font_small())
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let dim = |text: String| egui::RichText::new(text).size(10.5).color(ui::theme::TEXT_DIM);
                        ui.label(dim(format!("Tasks: {}", self.tree.len())));
                        ui.label(dim(" · ".into()));
                        ui.label(dim(format!("Links: {}", self.dependencies.len())));
                        ui.label(dim(" · ".into()));
                        ui.label(dim(format!("{} view", self.settings.granularity.label())));
                    });
                });
            });
    }

    fn show_about_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("About")
            .open(&mut self.show_about)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.heading("Timeline Gantt");
                ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                ui.add_space(6.0);
                ui.label("Drag bars to reschedule, drag their edges to resize,");
                ui.label("and drag the shaded part to change progress.");
            });
    }
}

impl eframe::App for GanttApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let today = today();

        if self.dialog.is_none()
            && !self.chart.is_dragging()
            && ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::N))
        {
            self.open_create(None);
        }

        // Top panel: toolbar
        let mut toolbar_action = None;
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            toolbar_action = ui::toolbar::show_toolbar(ui, &self.project.name, self.settings.granularity);
        });

        self.show_status_bar(ctx);

        // Left panel: task tree
        let mut tree_action = None;
        egui::SidePanel::left("task_panel")
            .default_width(ui::theme::SIDE_PANEL_WIDTH)
            .min_width(240.0)
            .resizable(true)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_PANEL)
                    .inner_margin(egui::Margin::same(8.0))
                    .stroke(egui::Stroke::new(1.0, ui::theme::BORDER_SUBTLE)),
            )
            .show(ctx, |ui| {
                tree_action = ui::task_tree::show_task_tree(&self.tree, self.selected, ui);
            });

        // Central panel: Gantt chart
        let mut chart_events = Vec::new();
        let chart_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        egui::CentralPanel::default().frame(chart_frame).show(ctx, |ui| match &self.layout {
            Some(layout) => {
                chart_events = self.chart.show(ui, &self.tree, layout, &self.dependencies, self.selected, today);
            }
            None => {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        egui::RichText::new("No tasks yet. Add one to see the timeline.")
                            .color(ui::theme::TEXT_DIM),
                    );
                });
            }
        });

        let dialog_outcome = self
            .dialog
            .as_mut()
            .and_then(|dialog| dialog.show(ctx, &self.tree, &self.dependencies));
        self.show_about_window(ctx);

        if let Some(action) = toolbar_action {
            self.apply_toolbar_action(action);
        }
        if let Some(action) = tree_action {
            self.apply_tree_action(action);
        }
        for event in chart_events {
            self.apply_chart_event(event);
        }
        if let Some(outcome) = dialog_outcome {
            self.apply_dialog_outcome(outcome);
        }
    }
}
