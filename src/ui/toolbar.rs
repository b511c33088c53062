use egui::{menu, RichText, Ui};
use egui_phosphor::regular as icons;

use crate::model::Granularity;
use crate::ui::theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    AddTask,
    SetGranularity(Granularity),
    ScrollToToday,
    Refresh,
    ExportCsv,
    About,
}

/// Render the top menu bar with the view controls.
pub fn show_toolbar(ui: &mut Ui, project_name: &str, granularity: Granularity) -> Option<ToolbarAction> {
    let mut action = None;

    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  File  ").font(theme::font_sub()), |ui| {
            if ui.button(format!("{}  New Task", icons::PLUS)).clicked() {
                action = Some(ToolbarAction::AddTask);
                ui.close_menu();
            }
            ui.separator();
            if ui.button(format!("{}  Export CSV...", icons::EXPORT)).clicked() {
                action = Some(ToolbarAction::ExportCsv);
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  View  ").font(theme::font_sub()), |ui| {
            ui.label(RichText::new("Timeline Scale").small().weak());
            for g in Granularity::ALL {
                if ui.radio(granularity == g, g.label()).clicked() {
                    action = Some(ToolbarAction::SetGranularity(g));
                    ui.close_menu();
                }
            }
            ui.separator();
            if ui.button(format!("{}  Refresh", icons::ARROWS_CLOCKWISE)).clicked() {
                action = Some(ToolbarAction::Refresh);
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Help  ").font(theme::font_sub()), |ui| {
            if ui.button("About").clicked() {
                action = Some(ToolbarAction::About);
                ui.close_menu();
            }
        });

        ui.separator();

        let add = egui::Button::new(
            RichText::new(format!("{}  Add Task", icons::PLUS)).color(egui::Color32::WHITE),
        )
        .fill(theme::ACCENT);
        if ui.add(add).clicked() {
            action = Some(ToolbarAction::AddTask);
        }

        ui.add_space(8.0);
        for g in Granularity::ALL {
            if ui.selectable_label(granularity == g, g.label()).clicked() && granularity != g {
                action = Some(ToolbarAction::SetGranularity(g));
            }
        }

        ui.add_space(8.0);
        if ui
            .button(format!("{}  Today", icons::CALENDAR))
            .on_hover_text("Scroll to today")
            .clicked()
        {
            action = Some(ToolbarAction::ScrollToToday);
        }
        if ui
            .button(icons::ARROWS_CLOCKWISE)
            .on_hover_text("Reload from database")
            .clicked()
        {
            action = Some(ToolbarAction::Refresh);
        }
        if ui
            .button(icons::EXPORT)
            .on_hover_text("Export CSV")
            .clicked()
        {
            action = Some(ToolbarAction::ExportCsv);
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(RichText::new(project_name).size(11.0).weak());
        });
    });

    action
}
