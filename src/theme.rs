//! Application theme tracking

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::{ConfigChange, ConfigLevel, ConfigService};
use crate::error::ConfigError;
use crate::events::{EventBus, Subscription, ThemeChanged};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
    /// Follow the operating system
    System,
}

impl Theme {
    /// Light becomes Dark; anything else becomes Light
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark | Theme::System => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
            Theme::System => "System",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Light" => Ok(Theme::Light),
            "Dark" => Ok(Theme::Dark),
            "System" => Ok(Theme::System),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

fn parse_or_default(raw: &str) -> Theme {
    raw.parse().unwrap_or_else(|_| {
        warn!(theme = raw, "Unknown theme in configuration, using Light");
        Theme::default()
    })
}

/// Keeps the current theme in step with configuration
pub struct ThemeService {
    config: Arc<ConfigService>,
    current: Arc<RwLock<Theme>>,
    _subscription: Subscription<ConfigChange>,
}

impl ThemeService {
    pub fn new(config: Arc<ConfigService>) -> Self {
        let initial = config
            .get_config()
            .map(|doc| parse_or_default(&doc.theme))
            .unwrap_or_default();
        let current = Arc::new(RwLock::new(initial));

        let events: EventBus = config.events().clone();
        let tracked = Arc::clone(&current);
        let subscription = config.events().subscribe_fn(move |change: &ConfigChange| {
            let raw = match change {
                ConfigChange::Theme { new, .. } => new,
                ConfigChange::All(doc) => &doc.theme,
                _ => return,
            };
            let new = parse_or_default(raw);
            let old = std::mem::replace(&mut *tracked.write(), new);
            if old != new {
                info!(%old, %new, "Theme changed");
                events.publish(&ThemeChanged { old, new });
            }
        });

        Self {
            config,
            current,
            _subscription: subscription,
        }
    }

    pub fn current(&self) -> Theme {
        *self.current.read()
    }

    /// Store `theme` at the User level
    pub async fn set_theme(&self, theme: Theme) -> Result<(), ConfigError> {
        self.config
            .edit_layer(ConfigLevel::User, move |layer| layer.theme = Some(theme.to_string()))
            .await
    }

    /// Flip between Light and Dark and persist the result
    pub async fn toggle_theme(&self) -> Result<Theme, ConfigError> {
        let next = self.current().toggled();
        self.set_theme(next).await?;
        Ok(next)
    }
}
