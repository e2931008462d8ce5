//! Page bodies rendered inside the central panel

use eframe::egui;
use tracing::Level;

use crate::viewmodels::{
    DetectionViewModel, HistoryViewModel, HomeViewModel, SettingsViewModel, TestViewModel,
};

use super::super::constants::{FAKE_NEWS, ITEM_SPACING, REAL_NEWS, SECTION_SPACING, SUSPICIOUS_NEWS};
use super::settings_editor;

/// Something a page asked for that needs the runtime
pub enum PageAction {
    SaveSettings,
    ResetSettings,
}

pub fn home(ui: &mut egui::Ui, vm: &HomeViewModel) {
    ui.label("Paste an article or a link and get a credibility verdict.");
    ui.add_space(SECTION_SPACING);

    ui.group(|ui| {
        ui.label(egui::RichText::new("Verdicts").strong());
        ui.colored_label(REAL_NEWS, "\u{25CF}  Real");
        ui.colored_label(SUSPICIOUS_NEWS, "\u{25CF}  Suspicious");
        ui.colored_label(FAKE_NEWS, "\u{25CF}  Fake");
    });

    ui.add_space(SECTION_SPACING);

    ui.horizontal(|ui| {
        if ui.button("Start Detection").clicked() {
            let _ = vm.start_detection();
        }
        if ui.button("Open Feature Tests").clicked() {
            let _ = vm.open_tests_with("Hello from the home page");
        }
    });
}

pub fn detection(ui: &mut egui::Ui, vm: &DetectionViewModel) {
    ui.group(|ui| {
        ui.label(egui::RichText::new("Article URL").strong());
        ui.text_edit_singleline(&mut *vm.source_url.lock());
        ui.add_space(ITEM_SPACING);
        ui.label(egui::RichText::new("Article Text").strong());
        ui.add(
            egui::TextEdit::multiline(&mut *vm.news_content.lock())
                .desired_rows(12)
                .desired_width(f32::INFINITY),
        );
    });

    ui.add_space(SECTION_SPACING);
    ui.add_enabled(vm.can_detect(), egui::Button::new("Analyze"));
}

pub fn settings(ui: &mut egui::Ui, vm: &SettingsViewModel) -> Option<PageAction> {
    let mut action = None;
    let mut draft = vm.draft();

    egui::ScrollArea::vertical().show(ui, |ui| {
        if settings_editor::ui(ui, &mut draft) {
            vm.edit(|doc| *doc = draft.clone());
        }

        ui.add_space(SECTION_SPACING);

        let validation = vm.validation();
        for violation in validation.iter() {
            ui.colored_label(FAKE_NEWS, violation.to_string());
        }

        ui.horizontal(|ui| {
            if ui.add_enabled(vm.is_dirty(), egui::Button::new("Save")).clicked() {
                action = Some(PageAction::SaveSettings);
            }
            if ui.button("Discard").clicked() {
                vm.reload_draft();
            }
            if ui.button("Reset to Defaults").clicked() {
                action = Some(PageAction::ResetSettings);
            }
        });
    });

    action
}

pub fn history(ui: &mut egui::Ui, vm: &HistoryViewModel) {
    ui.horizontal(|ui| {
        ui.label("Filter:");
        ui.text_edit_singleline(&mut *vm.filter.lock());
    });
    ui.add_space(SECTION_SPACING);
    ui.label("No analyses yet.");
}

pub fn statistics(ui: &mut egui::Ui) {
    ui.label("Statistics appear once articles have been analyzed.");
}

const LOG_LEVELS: [Level; 5] = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE];

/// Returns true when the log level was changed
pub fn tests(ui: &mut egui::Ui, vm: &TestViewModel, log_level: &mut Level) -> bool {
    let mut level_changed = false;

    ui.group(|ui| {
        ui.label(egui::RichText::new("Navigation Parameter").strong());
        ui.label(vm.parameter_info.lock().as_str());
        ui.add_space(ITEM_SPACING);
        ui.text_edit_multiline(&mut *vm.content.lock());
    });

    ui.add_space(SECTION_SPACING);

    if ui.button("Publish Test Event").clicked() {
        vm.publish_test_event();
    }

    ui.add_space(SECTION_SPACING);

    ui.horizontal(|ui| {
        ui.label("Log Level:");
        ui.add_space(5.0);
        egui::ComboBox::from_id_salt("log_level")
            .selected_text(log_level.as_str())
            .show_ui(ui, |ui| {
                for level in LOG_LEVELS {
                    if ui.selectable_value(log_level, level, level.as_str()).changed() {
                        level_changed = true;
                    }
                }
            });
    });

    level_changed
}
