//! Minimal repair of invalid configuration documents
//!
//! Each violation resets only the offending field to its built-in default;
//! everything else the user customized is left alone. If the document still
//! fails validation afterwards, repair escalates to a fully default document.

use tracing::{debug, warn};

use super::document::{ConfigDocument, ConfigLayer};
use super::validator::{ConfigField, ConfigValidator};

/// Outcome of a repair pass
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired<T> {
    pub value: T,
    /// Paths of the fields that were reset or dropped
    pub fixed: Vec<String>,
    /// True when field-level repair was not enough and defaults were used
    pub escalated: bool,
}

impl<T> Repaired<T> {
    pub fn changed(&self) -> bool {
        !self.fixed.is_empty() || self.escalated
    }
}

/// Repair `config` against `validator`, returning a document that validates clean
pub fn repair_document(validator: &dyn ConfigValidator, config: &ConfigDocument) -> Repaired<ConfigDocument> {
    let result = validator.validate(config);
    if result.is_valid() {
        return Repaired {
            value: config.clone(),
            fixed: Vec::new(),
            escalated: false,
        };
    }

    let defaults = ConfigDocument::default();
    let mut fixed = config.clone();
    let mut blank_entries = Vec::new();
    let mut paths = Vec::new();

    for violation in &result {
        paths.push(violation.path());
        match violation.field {
            ConfigField::Theme => fixed.theme = defaults.theme.clone(),
            ConfigField::Language => fixed.language = defaults.language.clone(),
            ConfigField::WindowWidth => fixed.window_state.width = defaults.window_state.width,
            ConfigField::WindowHeight => fixed.window_state.height = defaults.window_state.height,
            ConfigField::ApiBaseUrl => fixed.api_settings.base_url = defaults.api_settings.base_url.clone(),
            ConfigField::ApiTimeout => fixed.api_settings.timeout = defaults.api_settings.timeout,
            ConfigField::ApiRetryCount => fixed.api_settings.retry_count = defaults.api_settings.retry_count,
            ConfigField::FontSize => fixed.ui_settings.font_size = defaults.ui_settings.font_size,
            ConfigField::RecentFile(idx) => blank_entries.push(idx),
        }
    }

    if !blank_entries.is_empty() {
        fixed.recent_files = fixed
            .recent_files
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !blank_entries.contains(idx))
            .map(|(_, path)| path)
            .collect();
    }

    let residual = validator.validate(&fixed);
    if residual.is_valid() {
        debug!(fields = ?paths, "Repaired configuration fields");
        Repaired {
            value: fixed,
            fixed: paths,
            escalated: false,
        }
    } else {
        warn!(remaining = %residual, "Field repair insufficient, using defaults");
        Repaired {
            value: defaults,
            fixed: paths,
            escalated: true,
        }
    }
}

/// Repair a partial layer, keeping only the sections it already defines
///
/// The layer is judged as it would appear over built-in defaults, so an
/// absent section never counts as a violation.
pub fn repair_layer(validator: &dyn ConfigValidator, layer: &ConfigLayer) -> Repaired<ConfigLayer> {
    let expanded = layer.overlay_onto(ConfigDocument::default());
    let repaired = repair_document(validator, &expanded);
    Repaired {
        value: layer.with_values_from(&repaired.value),
        fixed: repaired.fixed,
        escalated: repaired.escalated,
    }
}
