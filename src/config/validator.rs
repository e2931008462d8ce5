//! Rule-based validation of configuration documents

use std::fmt;

use url::Url;

use super::document::ConfigDocument;
use crate::constants::validation::*;

/// Individual field that a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    Theme,
    Language,
    WindowWidth,
    WindowHeight,
    ApiBaseUrl,
    ApiTimeout,
    ApiRetryCount,
    FontSize,
    /// Entry of the recent files list by index
    RecentFile(usize),
}

impl ConfigField {
    /// Dotted camelCase path, matching the JSON layout
    pub fn path(&self) -> String {
        match self {
            ConfigField::Theme => "theme".to_string(),
            ConfigField::Language => "language".to_string(),
            ConfigField::WindowWidth => "windowState.width".to_string(),
            ConfigField::WindowHeight => "windowState.height".to_string(),
            ConfigField::ApiBaseUrl => "apiSettings.baseUrl".to_string(),
            ConfigField::ApiTimeout => "apiSettings.timeout".to_string(),
            ConfigField::ApiRetryCount => "apiSettings.retryCount".to_string(),
            ConfigField::FontSize => "uiSettings.fontSize".to_string(),
            ConfigField::RecentFile(idx) => format!("recentFiles[{idx}]"),
        }
    }
}

/// A single failed rule
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub field: ConfigField,
    pub message: String,
}

impl Violation {
    fn new(field: ConfigField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub fn path(&self) -> String {
        self.field.path()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.path(), self.message)
    }
}

/// Ordered list of violations; empty means valid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn has_field(&self, field: ConfigField) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl FromIterator<Violation> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self {
            violations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ValidationResult {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.violations.is_empty() {
            return f.write_str("no violations");
        }
        for (idx, violation) in self.violations.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {violation}")?;
        }
        Ok(())
    }
}

/// Stateless check of a document against domain rules
pub trait ConfigValidator: Send + Sync {
    /// Returns every violation, never just the first
    fn validate(&self, config: &ConfigDocument) -> ValidationResult;
}

/// Validator enforcing the bounds in [`crate::constants::validation`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl RuleValidator {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigValidator for RuleValidator {
    fn validate(&self, config: &ConfigDocument) -> ValidationResult {
        let mut violations = Vec::new();

        if !VALID_THEMES.contains(&config.theme.as_str()) {
            violations.push(Violation::new(
                ConfigField::Theme,
                format!("'{}' is not one of {}", config.theme, VALID_THEMES.join(", ")),
            ));
        }

        if !VALID_LANGUAGES.contains(&config.language.as_str()) {
            violations.push(Violation::new(
                ConfigField::Language,
                format!("'{}' is not one of {}", config.language, VALID_LANGUAGES.join(", ")),
            ));
        }

        let window = &config.window_state;
        if !in_range(window.width, MIN_WINDOW_WIDTH, MAX_WINDOW_WIDTH) {
            violations.push(Violation::new(
                ConfigField::WindowWidth,
                format!("{} is outside [{MIN_WINDOW_WIDTH}, {MAX_WINDOW_WIDTH}]", window.width),
            ));
        }
        if !in_range(window.height, MIN_WINDOW_HEIGHT, MAX_WINDOW_HEIGHT) {
            violations.push(Violation::new(
                ConfigField::WindowHeight,
                format!("{} is outside [{MIN_WINDOW_HEIGHT}, {MAX_WINDOW_HEIGHT}]", window.height),
            ));
        }

        for (idx, entry) in config.recent_files.iter().enumerate() {
            if entry.trim().is_empty() {
                violations.push(Violation::new(ConfigField::RecentFile(idx), "path must not be empty"));
            }
        }

        let api = &config.api_settings;
        if let Err(reason) = check_base_url(&api.base_url) {
            violations.push(Violation::new(ConfigField::ApiBaseUrl, reason));
        }
        if !(MIN_API_TIMEOUT..=MAX_API_TIMEOUT).contains(&api.timeout) {
            violations.push(Violation::new(
                ConfigField::ApiTimeout,
                format!("{}s is outside [{MIN_API_TIMEOUT}, {MAX_API_TIMEOUT}]", api.timeout),
            ));
        }
        if !(MIN_RETRY_COUNT..=MAX_RETRY_COUNT).contains(&api.retry_count) {
            violations.push(Violation::new(
                ConfigField::ApiRetryCount,
                format!("{} is outside [{MIN_RETRY_COUNT}, {MAX_RETRY_COUNT}]", api.retry_count),
            ));
        }

        let font_size = config.ui_settings.font_size;
        if !in_range(font_size, MIN_FONT_SIZE, MAX_FONT_SIZE) {
            violations.push(Violation::new(
                ConfigField::FontSize,
                format!("{font_size} is outside [{MIN_FONT_SIZE}, {MAX_FONT_SIZE}]"),
            ));
        }

        violations.into_iter().collect()
    }
}

// NaN fails every comparison and is rejected here
fn in_range(value: f64, min: f64, max: f64) -> bool {
    value >= min && value <= max
}

fn check_base_url(raw: &str) -> Result<(), String> {
    if raw.trim().is_empty() {
        return Err("base URL must not be empty".to_string());
    }
    let url = Url::parse(raw).map_err(|e| format!("'{raw}' is not an absolute URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("scheme '{}' is not http or https", url.scheme()));
    }
    if !url.has_host() {
        return Err(format!("'{raw}' has no host"));
    }
    Ok(())
}
