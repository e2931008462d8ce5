//! Configuration document model
//!
//! A [`ConfigDocument`] is the complete, effective configuration the rest of the
//! application reads. Each scope (System, User, Session) stores a partial
//! [`ConfigLayer`] where every top-level section is optional; the effective
//! document is built by overlaying Session over User over System over the
//! built-in defaults, section by section.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Scope of a configuration layer, in increasing precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigLevel {
    /// Shared by every user of the installation
    System,
    /// Per-user settings
    User,
    /// In-memory only, never persisted
    Session,
}

impl ConfigLevel {
    /// Levels backed by a file, in load order
    pub const PERSISTED: [ConfigLevel; 2] = [ConfigLevel::System, ConfigLevel::User];

    pub fn is_persisted(self) -> bool {
        !matches!(self, ConfigLevel::Session)
    }
}

impl fmt::Display for ConfigLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigLevel::System => "System",
            ConfigLevel::User => "User",
            ConfigLevel::Session => "Session",
        };
        f.write_str(name)
    }
}

/// Top-level section of a document, used for reset and change reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigSection {
    Theme,
    Language,
    WindowState,
    RecentFiles,
    ApiSettings,
    UiSettings,
    All,
}

impl ConfigSection {
    /// camelCase key of the section in the JSON file
    pub fn key(self) -> &'static str {
        match self {
            ConfigSection::Theme => "theme",
            ConfigSection::Language => "language",
            ConfigSection::WindowState => "windowState",
            ConfigSection::RecentFiles => "recentFiles",
            ConfigSection::ApiSettings => "apiSettings",
            ConfigSection::UiSettings => "uiSettings",
            ConfigSection::All => "all",
        }
    }
}

impl fmt::Display for ConfigSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ConfigSection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let section = match s.to_ascii_lowercase().as_str() {
            "theme" => ConfigSection::Theme,
            "language" => ConfigSection::Language,
            "windowstate" => ConfigSection::WindowState,
            "recentfiles" => ConfigSection::RecentFiles,
            "apisettings" => ConfigSection::ApiSettings,
            "uisettings" => ConfigSection::UiSettings,
            "all" => ConfigSection::All,
            _ => return Err(format!("unknown config section '{s}'")),
        };
        Ok(section)
    }
}

/// Main window geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WindowState {
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub is_maximized: bool,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            width: defaults::WINDOW_WIDTH,
            height: defaults::WINDOW_HEIGHT,
            x: defaults::WINDOW_X,
            y: defaults::WINDOW_Y,
            is_maximized: false,
        }
    }
}

/// Analysis backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout: i32,
    pub retry_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: defaults::API_BASE_URL.to_string(),
            timeout: defaults::API_TIMEOUT,
            retry_count: defaults::API_RETRY_COUNT,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiSettings {
    pub font_size: f64,
    pub show_status_bar: bool,
    pub show_toolbar: bool,
    pub auto_save: bool,
    pub confirm_on_exit: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            font_size: defaults::FONT_SIZE,
            show_status_bar: true,
            show_toolbar: true,
            auto_save: true,
            confirm_on_exit: true,
        }
    }
}

/// Complete effective configuration
///
/// Immutable by convention: the service hands out clones and replaces its copy
/// wholesale on every change, which keeps change detection a plain diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigDocument {
    pub theme: String,
    pub language: String,
    pub window_state: WindowState,
    pub recent_files: Vec<String>,
    pub api_settings: ApiSettings,
    pub ui_settings: UiSettings,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            theme: defaults::THEME.to_string(),
            language: defaults::LANGUAGE.to_string(),
            window_state: WindowState::default(),
            recent_files: Vec::new(),
            api_settings: ApiSettings::default(),
            ui_settings: UiSettings::default(),
        }
    }
}

/// Partial document stored for a single scope
///
/// Absent sections fall through to the next lower scope during merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_state: Option<WindowState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_settings: Option<ApiSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_settings: Option<UiSettings>,
}

impl ConfigLayer {
    /// Layer with every section set to built-in defaults
    pub fn defaults() -> Self {
        ConfigDocument::default().into()
    }

    /// Set one section (or all of them) to its built-in default
    pub fn reset_section(&mut self, section: ConfigSection) {
        let defaults = ConfigDocument::default();
        match section {
            ConfigSection::Theme => self.theme = Some(defaults.theme),
            ConfigSection::Language => self.language = Some(defaults.language),
            ConfigSection::WindowState => self.window_state = Some(defaults.window_state),
            ConfigSection::RecentFiles => self.recent_files = Some(defaults.recent_files),
            ConfigSection::ApiSettings => self.api_settings = Some(defaults.api_settings),
            ConfigSection::UiSettings => self.ui_settings = Some(defaults.ui_settings),
            ConfigSection::All => *self = defaults.into(),
        }
    }

    /// Replace the sections of `base` that this layer defines
    pub fn overlay_onto(&self, mut base: ConfigDocument) -> ConfigDocument {
        if let Some(theme) = &self.theme {
            base.theme = theme.clone();
        }
        if let Some(language) = &self.language {
            base.language = language.clone();
        }
        if let Some(window_state) = &self.window_state {
            base.window_state = window_state.clone();
        }
        if let Some(recent_files) = &self.recent_files {
            base.recent_files = recent_files.clone();
        }
        if let Some(api_settings) = &self.api_settings {
            base.api_settings = api_settings.clone();
        }
        if let Some(ui_settings) = &self.ui_settings {
            base.ui_settings = ui_settings.clone();
        }
        base
    }

    /// Keep this layer's set of defined sections but take their values from `source`
    pub fn with_values_from(&self, source: &ConfigDocument) -> ConfigLayer {
        ConfigLayer {
            theme: self.theme.as_ref().map(|_| source.theme.clone()),
            language: self.language.as_ref().map(|_| source.language.clone()),
            window_state: self.window_state.as_ref().map(|_| source.window_state.clone()),
            recent_files: self.recent_files.as_ref().map(|_| source.recent_files.clone()),
            api_settings: self.api_settings.as_ref().map(|_| source.api_settings.clone()),
            ui_settings: self.ui_settings.as_ref().map(|_| source.ui_settings.clone()),
        }
    }
}

impl From<ConfigDocument> for ConfigLayer {
    fn from(doc: ConfigDocument) -> Self {
        Self {
            theme: Some(doc.theme),
            language: Some(doc.language),
            window_state: Some(doc.window_state),
            recent_files: Some(doc.recent_files),
            api_settings: Some(doc.api_settings),
            ui_settings: Some(doc.ui_settings),
        }
    }
}

/// Build the effective document: Session > User > System > defaults
pub fn merge_layers(system: &ConfigLayer, user: &ConfigLayer, session: &ConfigLayer) -> ConfigDocument {
    let merged = system.overlay_onto(ConfigDocument::default());
    let merged = user.overlay_onto(merged);
    session.overlay_onto(merged)
}

/// One changed section of the effective configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigChange {
    /// No previous document existed (first load)
    All(ConfigDocument),
    Theme { old: String, new: String },
    Language { old: String, new: String },
    WindowState { old: WindowState, new: WindowState },
    RecentFiles { old: Vec<String>, new: Vec<String> },
    ApiSettings { old: ApiSettings, new: ApiSettings },
    UiSettings { old: UiSettings, new: UiSettings },
}

impl ConfigChange {
    pub fn section(&self) -> ConfigSection {
        match self {
            ConfigChange::All(_) => ConfigSection::All,
            ConfigChange::Theme { .. } => ConfigSection::Theme,
            ConfigChange::Language { .. } => ConfigSection::Language,
            ConfigChange::WindowState { .. } => ConfigSection::WindowState,
            ConfigChange::RecentFiles { .. } => ConfigSection::RecentFiles,
            ConfigChange::ApiSettings { .. } => ConfigSection::ApiSettings,
            ConfigChange::UiSettings { .. } => ConfigSection::UiSettings,
        }
    }
}

/// List the sections that differ between two documents, in document field order
///
/// With no previous document a single [`ConfigChange::All`] is produced.
pub fn diff_documents(old: Option<&ConfigDocument>, new: &ConfigDocument) -> Vec<ConfigChange> {
    let Some(old) = old else {
        return vec![ConfigChange::All(new.clone())];
    };

    let mut changes = Vec::new();
    if old.theme != new.theme {
        changes.push(ConfigChange::Theme {
            old: old.theme.clone(),
            new: new.theme.clone(),
        });
    }
    if old.language != new.language {
        changes.push(ConfigChange::Language {
            old: old.language.clone(),
            new: new.language.clone(),
        });
    }
    if old.window_state != new.window_state {
        changes.push(ConfigChange::WindowState {
            old: old.window_state.clone(),
            new: new.window_state.clone(),
        });
    }
    if old.recent_files != new.recent_files {
        changes.push(ConfigChange::RecentFiles {
            old: old.recent_files.clone(),
            new: new.recent_files.clone(),
        });
    }
    if old.api_settings != new.api_settings {
        changes.push(ConfigChange::ApiSettings {
            old: old.api_settings.clone(),
            new: new.api_settings.clone(),
        });
    }
    if old.ui_settings != new.ui_settings {
        changes.push(ConfigChange::UiSettings {
            old: old.ui_settings.clone(),
            new: new.ui_settings.clone(),
        });
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validator::{ConfigValidator, RuleValidator};
    use crate::constants::validation::*;
    use proptest::prelude::*;

    fn layer_with_theme(theme: &str) -> ConfigLayer {
        ConfigLayer {
            theme: Some(theme.to_string()),
            ..ConfigLayer::default()
        }
    }

    #[test]
    fn test_merge_user_overrides_system() {
        let system = layer_with_theme("Light");
        let user = layer_with_theme("Dark");
        let session = ConfigLayer::default();

        let merged = merge_layers(&system, &user, &session);
        assert_eq!(merged.theme, "Dark");
    }

    #[test]
    fn test_merge_session_wins_over_everything() {
        let system = layer_with_theme("Light");
        let user = layer_with_theme("Dark");
        let session = layer_with_theme("System");

        let merged = merge_layers(&system, &user, &session);
        assert_eq!(merged.theme, "System");
    }

    #[test]
    fn test_merge_falls_back_to_defaults_per_section() {
        let user = ConfigLayer {
            language: Some("en-US".to_string()),
            ..ConfigLayer::default()
        };

        let merged = merge_layers(&ConfigLayer::default(), &user, &ConfigLayer::default());
        assert_eq!(merged.language, "en-US");
        assert_eq!(merged.theme, defaults::THEME);
        assert_eq!(merged.api_settings, ApiSettings::default());
    }

    #[test]
    fn test_layer_json_uses_camel_case_and_skips_absent_sections() {
        let layer = ConfigLayer {
            window_state: Some(WindowState::default()),
            ..ConfigLayer::default()
        };
        let json = serde_json::to_string(&layer).unwrap();

        assert!(json.contains("\"windowState\""));
        assert!(json.contains("\"isMaximized\""));
        assert!(!json.contains("theme"));
    }

    #[test]
    fn test_partial_section_fills_missing_fields_with_defaults() {
        let layer: ConfigLayer =
            serde_json::from_str(r#"{ "apiSettings": { "timeout": 60 } }"#).unwrap();
        let api = layer.api_settings.unwrap();

        assert_eq!(api.timeout, 60);
        assert_eq!(api.base_url, defaults::API_BASE_URL);
        assert_eq!(api.retry_count, defaults::API_RETRY_COUNT);
    }

    fn valid_document() -> impl Strategy<Value = ConfigDocument> {
        let general = (
            prop::sample::select(VALID_THEMES),
            prop::sample::select(VALID_LANGUAGES),
            prop::collection::vec("/[a-z]{1,8}/[a-z0-9 ]{1,12}\\.txt", 0..=crate::constants::config::MAX_RECENT_FILES),
        );
        // Quarter steps keep the geometry fractional and exactly representable
        let window = (
            (MIN_WINDOW_WIDTH as i32 * 4..=MAX_WINDOW_WIDTH as i32 * 4).prop_map(|n| f64::from(n) / 4.0),
            (MIN_WINDOW_HEIGHT as i32 * 4..=MAX_WINDOW_HEIGHT as i32 * 4).prop_map(|n| f64::from(n) / 4.0),
            (-8000..=8000).prop_map(|n| f64::from(n) / 4.0),
            (-8000..=8000).prop_map(|n| f64::from(n) / 4.0),
            any::<bool>(),
        );
        let api = (
            prop::sample::select(&["https://api.fakenewsdetector.com", "http://localhost:8080/v1"][..]),
            MIN_API_TIMEOUT..=MAX_API_TIMEOUT,
            MIN_RETRY_COUNT..=MAX_RETRY_COUNT,
            prop::option::of("[A-Za-z0-9]{8,32}"),
        );
        let ui = (
            (MIN_FONT_SIZE as i32 * 2..=MAX_FONT_SIZE as i32 * 2).prop_map(|n| f64::from(n) / 2.0),
            any::<[bool; 4]>(),
        );

        (general, window, api, ui).prop_map(
            |((theme, language, recent_files), (width, height, x, y, is_maximized), (base_url, timeout, retry_count, api_key), (font_size, toggles))| {
                ConfigDocument {
                    theme: theme.to_string(),
                    language: language.to_string(),
                    window_state: WindowState {
                        width,
                        height,
                        x,
                        y,
                        is_maximized,
                    },
                    recent_files,
                    api_settings: ApiSettings {
                        base_url: base_url.to_string(),
                        timeout,
                        retry_count,
                        api_key,
                    },
                    ui_settings: UiSettings {
                        font_size,
                        show_status_bar: toggles[0],
                        show_toolbar: toggles[1],
                        auto_save: toggles[2],
                        confirm_on_exit: toggles[3],
                    },
                }
            },
        )
    }

    proptest! {
        #[test]
        fn test_valid_documents_survive_json_round_trip(doc in valid_document()) {
            prop_assert!(RuleValidator::new().validate(&doc).is_valid());

            let json = serde_json::to_string_pretty(&doc).unwrap();
            let back: ConfigDocument = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, doc);
        }
    }

    #[test]
    fn test_layer_reset_section_is_idempotent() {
        let mut layer = ConfigLayer::default();
        layer.window_state = Some(WindowState {
            width: 2000.0,
            ..WindowState::default()
        });

        layer.reset_section(ConfigSection::WindowState);
        let once = layer.clone();
        layer.reset_section(ConfigSection::WindowState);

        assert_eq!(layer, once);
        assert_eq!(layer.window_state, Some(WindowState::default()));
    }

    #[test]
    fn test_with_values_from_keeps_presence_mask() {
        let layer = layer_with_theme("Purple");
        let source = ConfigDocument::default();

        let fixed = layer.with_values_from(&source);
        assert_eq!(fixed.theme.as_deref(), Some(defaults::THEME));
        assert!(fixed.language.is_none());
        assert!(fixed.api_settings.is_none());
    }

    #[test]
    fn test_diff_without_previous_is_single_all() {
        let doc = ConfigDocument::default();
        let changes = diff_documents(None, &doc);

        assert_eq!(changes, vec![ConfigChange::All(doc)]);
    }

    #[test]
    fn test_diff_reports_sections_in_field_order() {
        let old = ConfigDocument::default();
        let mut new = old.clone();
        new.ui_settings.font_size = 16.0;
        new.theme = "Dark".to_string();
        new.recent_files.push("/tmp/news.txt".to_string());

        let sections: Vec<_> = diff_documents(Some(&old), &new)
            .iter()
            .map(ConfigChange::section)
            .collect();
        assert_eq!(
            sections,
            vec![ConfigSection::Theme, ConfigSection::RecentFiles, ConfigSection::UiSettings]
        );
    }

    #[test]
    fn test_diff_identical_documents_is_empty() {
        let doc = ConfigDocument::default();
        assert!(diff_documents(Some(&doc), &doc).is_empty());
    }

    #[test]
    fn test_section_parse_is_case_insensitive() {
        assert_eq!("WindowState".parse::<ConfigSection>(), Ok(ConfigSection::WindowState));
        assert_eq!("all".parse::<ConfigSection>(), Ok(ConfigSection::All));
        assert!("colors".parse::<ConfigSection>().is_err());
    }
}
