//! Application events and the bus that carries them

mod bus;

pub use bus::{EventBus, Handler, Subscription};
pub(crate) use bus::panic_message;

use std::fmt;

use crate::config::ConfigLevel;
use crate::navigation::PageType;
use crate::theme::Theme;

/// A navigation request finished and the page is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationCompleted {
    pub page: PageType,
}

/// How loudly an error notification should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorSeverity::Info => "Info",
            ErrorSeverity::Warning => "Warning",
            ErrorSeverity::Error => "Error",
            ErrorSeverity::Critical => "Critical",
        };
        f.write_str(label)
    }
}

/// User-facing error notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorOccurred {
    pub title: String,
    pub message: String,
    pub severity: ErrorSeverity,
}

impl ErrorOccurred {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: ErrorSeverity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeChanged {
    pub old: Theme,
    pub new: Theme,
}

/// Configuration was (re)read from storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigReloaded {
    /// Level that was read, `None` for a full load
    pub level: Option<ConfigLevel>,
    /// True when triggered by an edit outside the application
    pub external: bool,
}
