#![forbid(unsafe_code)]

//! Desktop shell of the fake news detector: layered configuration,
//! an in-process event bus and page navigation.

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod gui;
pub mod logging;
pub mod navigation;
pub mod theme;
pub mod viewmodels;

pub use config::{ConfigDocument, ConfigLevel, ConfigService};
pub use error::{ConfigError, NavigationError, ResolveError};
pub use events::EventBus;
pub use navigation::{NavigationService, PageType};
pub use theme::{Theme, ThemeService};
