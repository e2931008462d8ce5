//! Layered application configuration
//!
//! Three scopes (System, User, Session) are merged into one effective
//! document. System and User are persisted as JSON; Session lives in memory.

pub mod document;
pub mod repair;
pub mod service;
pub mod storage;
pub mod validator;
pub mod watcher;

pub use document::{
    ApiSettings, ConfigChange, ConfigDocument, ConfigLayer, ConfigLevel, ConfigSection, UiSettings,
    WindowState, diff_documents, merge_layers,
};
pub use repair::{Repaired, repair_document, repair_layer};
pub use service::ConfigService;
pub use storage::{ConfigPaths, ConfigStorage, JsonFileStorage, StoredLayer};
pub use validator::{ConfigField, ConfigValidator, RuleValidator, ValidationResult, Violation};
pub use watcher::{ConfigWatcher, SuspendGuard, WriteSuspension};
