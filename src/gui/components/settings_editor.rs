//! Settings editor component for modifying configuration

use eframe::egui;

use crate::config::ConfigDocument;
use crate::constants::validation::{
    MAX_API_TIMEOUT, MAX_FONT_SIZE, MAX_RETRY_COUNT, MIN_API_TIMEOUT, MIN_FONT_SIZE,
    MIN_RETRY_COUNT, VALID_LANGUAGES, VALID_THEMES,
};

use super::super::constants::{ITEM_SPACING, SECTION_SPACING};

/// Renders the settings editor UI and returns true if any changes were made
pub fn ui(ui: &mut egui::Ui, config: &mut ConfigDocument) -> bool {
    let mut changed = false;

    // General
    ui.group(|ui| {
        ui.label(egui::RichText::new("General").heading().strong());
        ui.add_space(ITEM_SPACING);

        ui.horizontal(|ui| {
            ui.label("Theme:");
            ui.add_space(5.0);
            changed |= choice(ui, "theme", &mut config.theme, VALID_THEMES);
        });

        ui.add_space(ITEM_SPACING);

        ui.horizontal(|ui| {
            ui.label("Language:");
            ui.add_space(5.0);
            changed |= choice(ui, "language", &mut config.language, VALID_LANGUAGES);
        });
    });

    ui.add_space(SECTION_SPACING);

    // API
    ui.group(|ui| {
        ui.label(egui::RichText::new("Detection Service").heading().strong());
        ui.add_space(ITEM_SPACING);

        let api = &mut config.api_settings;
        ui.horizontal(|ui| {
            ui.label("Base URL:");
            ui.add_space(5.0);
            if ui.text_edit_singleline(&mut api.base_url).changed() {
                changed = true;
            }
        });

        ui.add_space(ITEM_SPACING);

        ui.horizontal(|ui| {
            ui.label("Timeout:");
            ui.add_space(5.0);
            if ui
                .add(egui::Slider::new(&mut api.timeout, MIN_API_TIMEOUT..=MAX_API_TIMEOUT)
                    .suffix(" s")
                    .text(""))
                .changed()
            {
                changed = true;
            }
        });

        ui.add_space(ITEM_SPACING);

        ui.horizontal(|ui| {
            ui.label("Retries:");
            ui.add_space(5.0);
            if ui
                .add(egui::DragValue::new(&mut api.retry_count).range(MIN_RETRY_COUNT..=MAX_RETRY_COUNT))
                .changed()
            {
                changed = true;
            }
        });

        ui.add_space(ITEM_SPACING);

        ui.horizontal(|ui| {
            ui.label("API Key:");
            ui.add_space(5.0);
            let mut key = api.api_key.clone().unwrap_or_default();
            if ui.add(egui::TextEdit::singleline(&mut key).password(true)).changed() {
                api.api_key = (!key.trim().is_empty()).then_some(key);
                changed = true;
            }
        });
    });

    ui.add_space(SECTION_SPACING);

    // Interface
    ui.group(|ui| {
        ui.label(egui::RichText::new("Interface").heading().strong());
        ui.add_space(ITEM_SPACING);

        let settings = &mut config.ui_settings;
        ui.horizontal(|ui| {
            ui.label("Font Size:");
            ui.add_space(5.0);
            if ui
                .add(egui::Slider::new(&mut settings.font_size, MIN_FONT_SIZE..=MAX_FONT_SIZE).text(""))
                .changed()
            {
                changed = true;
            }
        });

        ui.add_space(ITEM_SPACING);

        changed |= ui.checkbox(&mut settings.show_status_bar, "Show status bar").changed();
        changed |= ui.checkbox(&mut settings.show_toolbar, "Show toolbar").changed();
        changed |= ui.checkbox(&mut settings.auto_save, "Save settings automatically").changed();
        changed |= ui.checkbox(&mut settings.confirm_on_exit, "Confirm on exit").changed();
    });

    changed
}

fn choice(ui: &mut egui::Ui, id: &str, value: &mut String, options: &[&str]) -> bool {
    let mut changed = false;
    egui::ComboBox::from_id_salt(id)
        .selected_text(value.as_str())
        .show_ui(ui, |ui| {
            for option in options {
                let selected = value.as_str() == *option;
                if ui.selectable_label(selected, *option).clicked() && !selected {
                    *value = option.to_string();
                    changed = true;
                }
            }
        });
    changed
}
