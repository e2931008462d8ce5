//! Authoritative in-memory configuration backed by per-level storage

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::document::{
    ConfigChange, ConfigDocument, ConfigLayer, ConfigLevel, ConfigSection, diff_documents,
    merge_layers,
};
use super::repair::{repair_document, repair_layer};
use super::storage::{ConfigStorage, StoredLayer};
use super::validator::{ConfigValidator, ValidationResult};
use super::watcher::{ConfigWatcher, WriteSuspension};
use crate::constants::config::MAX_RECENT_FILES;
use crate::constants::timing::{SELF_WRITE_GRACE_MS, WATCH_DEBOUNCE_MS};
use crate::error::ConfigError;
use crate::events::{ConfigReloaded, ErrorOccurred, ErrorSeverity, EventBus};

#[derive(Debug, Default)]
struct ConfigState {
    system: ConfigLayer,
    user: ConfigLayer,
    session: ConfigLayer,
    /// `None` until the first load or update
    effective: Option<ConfigDocument>,
}

impl ConfigState {
    fn layer(&self, level: ConfigLevel) -> &ConfigLayer {
        match level {
            ConfigLevel::System => &self.system,
            ConfigLevel::User => &self.user,
            ConfigLevel::Session => &self.session,
        }
    }

    fn set_layer(&mut self, level: ConfigLevel, layer: ConfigLayer) {
        match level {
            ConfigLevel::System => self.system = layer,
            ConfigLevel::User => self.user = layer,
            ConfigLevel::Session => self.session = layer,
        }
    }

    /// Recompute the effective document and return what changed
    fn remerge(&mut self) -> Vec<ConfigChange> {
        let merged = merge_layers(&self.system, &self.user, &self.session);
        let changes = diff_documents(self.effective.as_ref(), &merged);
        self.effective = Some(merged);
        changes
    }
}

/// Owns configuration state for all three levels
///
/// Reads hand out clones; every mutation goes through `update_*`/`reset_config`
/// so change notifications stay accurate. Change events are published on the
/// [`EventBus`] as [`ConfigChange`] values after the persistence attempt.
pub struct ConfigService {
    storage: Arc<dyn ConfigStorage>,
    validator: Arc<dyn ConfigValidator>,
    events: EventBus,
    state: RwLock<ConfigState>,
    /// Serializes load/save/update so file writes never interleave
    write_lock: tokio::sync::Mutex<()>,
    suspension: WriteSuspension,
    watcher: Mutex<Option<ConfigWatcher>>,
}

impl ConfigService {
    pub fn new(storage: Arc<dyn ConfigStorage>, validator: Arc<dyn ConfigValidator>, events: EventBus) -> Self {
        Self {
            storage,
            validator,
            events,
            state: RwLock::new(ConfigState::default()),
            write_lock: tokio::sync::Mutex::new(()),
            suspension: WriteSuspension::new(Duration::from_millis(SELF_WRITE_GRACE_MS)),
            watcher: Mutex::new(None),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Effective (merged) configuration
    pub fn get_config(&self) -> Result<ConfigDocument, ConfigError> {
        self.state
            .read()
            .effective
            .clone()
            .ok_or(ConfigError::NotInitialized)
    }

    /// Raw, unmerged layer of a single level
    pub fn get_layer(&self, level: ConfigLevel) -> ConfigLayer {
        self.state.read().layer(level).clone()
    }

    /// Read one level from storage, or every persisted level when `level` is `None`
    ///
    /// Missing, corrupt or invalid documents are replaced by defaults or a
    /// repaired copy, which is written back. An unreadable file is reported
    /// through `ErrorOccurred` and the level falls back to defaults.
    pub async fn load_config(&self, level: Option<ConfigLevel>) -> Result<(), ConfigError> {
        let levels = match level {
            None => ConfigLevel::PERSISTED.to_vec(),
            Some(ConfigLevel::Session) => return Err(ConfigError::UnsupportedLevel(ConfigLevel::Session)),
            Some(level) => vec![level],
        };
        self.reload(&levels, level, false).await
    }

    /// Persist the current layer of `level` (User when `None`)
    pub async fn save_config(&self, level: Option<ConfigLevel>) -> Result<(), ConfigError> {
        let level = level.unwrap_or(ConfigLevel::User);
        if !level.is_persisted() {
            return Err(ConfigError::UnsupportedLevel(level));
        }
        let _write = self.write_lock.lock().await;
        let layer = self.get_layer(level);
        self.persist(layer, level).await
    }

    /// Replace a level with a full document (User when `None`)
    ///
    /// Invalid fields are repaired before anything is stored. The returned
    /// error reports a failed write; in-memory state is updated regardless.
    pub async fn update_config(&self, config: ConfigDocument, level: Option<ConfigLevel>) -> Result<(), ConfigError> {
        let level = level.unwrap_or(ConfigLevel::User);
        let repaired = repair_document(self.validator.as_ref(), &config);
        if repaired.changed() {
            warn!(level = %level, fields = ?repaired.fixed, escalated = repaired.escalated, "Repaired configuration before update");
        }

        let _write = self.write_lock.lock().await;
        self.apply_layer(level, repaired.value.into()).await
    }

    /// Replace a level with a partial layer, e.g. a Session-only override
    pub async fn update_layer(&self, layer: ConfigLayer, level: ConfigLevel) -> Result<(), ConfigError> {
        let repaired = repair_layer(self.validator.as_ref(), &layer);
        if repaired.changed() {
            warn!(level = %level, fields = ?repaired.fixed, "Repaired configuration layer before update");
        }

        let _write = self.write_lock.lock().await;
        self.apply_layer(level, repaired.value).await
    }

    /// Change part of a level's layer; read, edit and store happen under the write lock
    pub async fn edit_layer<F>(&self, level: ConfigLevel, edit: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut ConfigLayer) + Send,
    {
        let _write = self.write_lock.lock().await;

        let mut layer = self.get_layer(level);
        edit(&mut layer);
        let repaired = repair_layer(self.validator.as_ref(), &layer);
        if repaired.changed() {
            warn!(level = %level, fields = ?repaired.fixed, "Repaired configuration layer before update");
        }
        self.apply_layer(level, repaired.value).await
    }

    /// Restore one section, or everything, of a level to built-in defaults
    pub async fn reset_config(&self, level: Option<ConfigLevel>, section: ConfigSection) -> Result<(), ConfigError> {
        let level = level.unwrap_or(ConfigLevel::User);
        info!(level = %level, section = %section, "Resetting configuration section");
        self.edit_layer(level, |layer| layer.reset_section(section)).await
    }

    /// Put `path` at the front of the recent files list
    pub async fn add_recent_file(&self, path: &str) -> Result<(), ConfigError> {
        let path = path.trim();
        if path.is_empty() {
            debug!("Ignoring blank recent file path");
            return Ok(());
        }

        let _write = self.write_lock.lock().await;
        let mut recent = self.get_config()?.recent_files;
        recent.retain(|existing| existing != path);
        recent.insert(0, path.to_string());
        recent.truncate(MAX_RECENT_FILES);

        let mut layer = self.get_layer(ConfigLevel::User);
        layer.recent_files = Some(recent);
        self.apply_layer(ConfigLevel::User, layer).await
    }

    pub fn validate_config(&self, config: &ConfigDocument) -> ValidationResult {
        self.validator.validate(config)
    }

    pub fn validate_current(&self) -> Result<ValidationResult, ConfigError> {
        Ok(self.validate_config(&self.get_config()?))
    }

    /// Minimal repair of `config`, escalating to defaults when needed
    pub fn fix_config(&self, config: &ConfigDocument) -> ConfigDocument {
        repair_document(self.validator.as_ref(), config).value
    }

    /// Reload the User level whenever its file changes outside the application
    ///
    /// Must be called inside a tokio runtime. Calling it again while already
    /// watching is a no-op.
    pub fn start_watching(self: &Arc<Self>) -> Result<(), ConfigError> {
        let mut watcher = self.watcher.lock();
        if watcher.is_some() {
            return Ok(());
        }
        let path = self
            .storage
            .config_path(ConfigLevel::User)
            .ok_or(ConfigError::UnsupportedLevel(ConfigLevel::User))?;

        let service = Arc::downgrade(self);
        *watcher = Some(ConfigWatcher::start(
            &path,
            self.suspension.clone(),
            Duration::from_millis(WATCH_DEBOUNCE_MS),
            move || {
                let service = service.clone();
                async move {
                    let Some(service) = service.upgrade() else {
                        return false;
                    };
                    info!("User config changed on disk, reloading");
                    if let Err(e) = service
                        .reload(&[ConfigLevel::User], Some(ConfigLevel::User), true)
                        .await
                    {
                        error!(error = %e, "Failed to reload externally modified config");
                    }
                    true
                }
            },
        )?);
        Ok(())
    }

    pub fn stop_watching(&self) {
        self.watcher.lock().take();
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    async fn reload(&self, levels: &[ConfigLevel], requested: Option<ConfigLevel>, external: bool) -> Result<(), ConfigError> {
        let _write = self.write_lock.lock().await;

        for &level in levels {
            let layer = self.read_level(level).await?;
            self.state.write().set_layer(level, layer);
        }

        let changes = self.state.write().remerge();
        info!(levels = ?levels, external, changes = changes.len(), "Configuration loaded");
        self.notify(changes);
        self.events.publish(&ConfigReloaded {
            level: requested,
            external,
        });
        Ok(())
    }

    /// Read, recover and if needed rewrite a single level
    async fn read_level(&self, level: ConfigLevel) -> Result<ConfigLayer, ConfigError> {
        let storage = Arc::clone(&self.storage);
        let stored = match run_blocking(move || storage.load(level)).await {
            Ok(stored) => stored,
            Err(e @ ConfigError::Storage { .. }) => {
                // Left in place; writing over a file we cannot read would fail the same way
                warn!(level = %level, error = %e, "Config file is unreadable, using defaults");
                self.report_error("Could not read settings", &e, ErrorSeverity::Warning);
                return Ok(self.fallback_layer(level));
            }
            Err(e) => return Err(e),
        };

        let (layer, needs_write) = match stored {
            StoredLayer::Parsed(layer) => {
                let repaired = repair_layer(self.validator.as_ref(), &layer);
                if repaired.changed() {
                    warn!(level = %level, fields = ?repaired.fixed, "Stored configuration was invalid, repaired");
                }
                let changed = repaired.changed();
                (repaired.value, changed)
            }
            StoredLayer::Missing => {
                info!(level = %level, "No config file found, writing defaults");
                (self.fallback_layer(level), true)
            }
            StoredLayer::Corrupt { reason } => {
                warn!(level = %level, reason = %reason, "Config file is corrupt, using defaults");
                (self.fallback_layer(level), true)
            }
        };

        if needs_write {
            if let Err(e) = self.persist(layer.clone(), level).await {
                self.report_error("Could not save settings", &e, ErrorSeverity::Warning);
            }
        }
        Ok(layer)
    }

    /// Layer used when a level has no usable file: User is seeded from System
    fn fallback_layer(&self, level: ConfigLevel) -> ConfigLayer {
        match level {
            ConfigLevel::User => {
                let system = self.state.read().system.clone();
                system.overlay_onto(ConfigDocument::default()).into()
            }
            _ => ConfigLayer::defaults(),
        }
    }

    /// Store `layer` for `level`, persist it, then notify
    ///
    /// Caller must hold `write_lock`.
    async fn apply_layer(&self, level: ConfigLevel, layer: ConfigLayer) -> Result<(), ConfigError> {
        self.state.write().set_layer(level, layer.clone());

        let saved = if level.is_persisted() {
            self.persist(layer, level).await
        } else {
            Ok(())
        };
        if let Err(e) = &saved {
            self.report_error("Could not save settings", e, ErrorSeverity::Error);
        }

        let changes = self.state.write().remerge();
        self.notify(changes);
        saved
    }

    async fn persist(&self, layer: ConfigLayer, level: ConfigLevel) -> Result<(), ConfigError> {
        let _suspended = self.suspension.suspend();
        let storage = Arc::clone(&self.storage);
        run_blocking(move || storage.save(&layer, level)).await
    }

    fn notify(&self, changes: Vec<ConfigChange>) {
        for change in changes {
            debug!(section = %change.section(), "Configuration changed");
            self.events.publish(&change);
        }
    }

    fn report_error(&self, title: &str, err: &ConfigError, severity: ErrorSeverity) {
        error!(error = %err, "{title}");
        self.events
            .publish(&ErrorOccurred::new(title, err.to_string(), severity));
    }
}

impl Drop for ConfigService {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, ConfigError>
where
    F: FnOnce() -> Result<T, ConfigError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConfigError::Background(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::storage::{ConfigPaths, JsonFileStorage};
    use crate::config::validator::RuleValidator;
    use crate::constants::config::USER_FILENAME;
    use crate::constants::defaults;
    use crate::events::Subscription;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn service_in(dir: &TempDir) -> ConfigService {
        let storage = JsonFileStorage::new(ConfigPaths::in_dir(dir.path()));
        ConfigService::new(Arc::new(storage), Arc::new(RuleValidator), EventBus::new())
    }

    fn record_changes(service: &ConfigService) -> (Arc<Mutex<Vec<ConfigChange>>>, Subscription<ConfigChange>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = service
            .events()
            .subscribe_fn(move |change: &ConfigChange| sink.lock().push(change.clone()));
        (seen, sub)
    }

    fn user_file(dir: &TempDir) -> PathBuf {
        dir.path().join(USER_FILENAME)
    }

    /// Storage whose writes always fail
    struct ReadOnlyStorage;

    impl ConfigStorage for ReadOnlyStorage {
        fn config_path(&self, level: ConfigLevel) -> Option<PathBuf> {
            level.is_persisted().then(|| PathBuf::from("/read-only/config.json"))
        }

        fn load(&self, _level: ConfigLevel) -> Result<StoredLayer, ConfigError> {
            Ok(StoredLayer::Parsed(ConfigLayer::default()))
        }

        fn save(&self, _layer: &ConfigLayer, _level: ConfigLevel) -> Result<(), ConfigError> {
            Err(ConfigError::storage(
                "/read-only/config.json",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ))
        }
    }

    #[tokio::test]
    async fn test_get_config_before_load_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);

        assert!(matches!(service.get_config(), Err(ConfigError::NotInitialized)));
        assert!(matches!(service.validate_current(), Err(ConfigError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_load_without_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);

        service.load_config(None).await.unwrap();

        assert_eq!(service.get_config().unwrap().theme, "Light");
        assert!(user_file(&dir).exists());
        let written: ConfigLayer = serde_json::from_str(&fs::read_to_string(user_file(&dir)).unwrap()).unwrap();
        assert_eq!(written, ConfigLayer::defaults());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(user_file(&dir), "{ \"theme\": ").unwrap();
        let service = service_in(&dir);

        service.load_config(None).await.unwrap();

        assert_eq!(service.get_config().unwrap(), ConfigDocument::default());
    }

    #[tokio::test]
    async fn test_unreadable_file_loads_defaults_and_reports() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(user_file(&dir)).unwrap();
        let service = service_in(&dir);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let _sub = service
            .events()
            .subscribe_fn(move |e: &ErrorOccurred| sink.lock().push(e.severity));

        service.load_config(None).await.unwrap();

        assert_eq!(service.get_config().unwrap(), ConfigDocument::default());
        assert_eq!(*errors.lock(), vec![ErrorSeverity::Warning]);
        assert!(user_file(&dir).is_dir());
    }

    #[tokio::test]
    async fn test_invalid_stored_field_is_repaired_and_rewritten() {
        let dir = TempDir::new().unwrap();
        fs::write(
            user_file(&dir),
            r#"{ "theme": "Dark", "apiSettings": { "timeout": 999 } }"#,
        )
        .unwrap();
        let service = service_in(&dir);

        service.load_config(Some(ConfigLevel::User)).await.unwrap();

        let config = service.get_config().unwrap();
        assert_eq!(config.theme, "Dark");
        assert_eq!(config.api_settings.timeout, defaults::API_TIMEOUT);
        let on_disk = fs::read_to_string(user_file(&dir)).unwrap();
        assert!(on_disk.contains("\"timeout\": 30"));
    }

    #[tokio::test]
    async fn test_first_load_notifies_all_once() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        let (seen, _sub) = record_changes(&service);

        service.load_config(None).await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].section(), ConfigSection::All);
    }

    #[tokio::test]
    async fn test_update_repairs_timeout_before_persisting() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        service.load_config(None).await.unwrap();

        let mut config = service.get_config().unwrap();
        config.api_settings.timeout = 200;
        service.update_config(config, None).await.unwrap();

        assert_eq!(service.get_config().unwrap().api_settings.timeout, defaults::API_TIMEOUT);
        let on_disk: ConfigLayer = serde_json::from_str(&fs::read_to_string(user_file(&dir)).unwrap()).unwrap();
        assert_eq!(on_disk.api_settings.unwrap().timeout, defaults::API_TIMEOUT);
    }

    #[tokio::test]
    async fn test_update_notifies_changed_sections_in_field_order() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        service.load_config(None).await.unwrap();
        let (seen, _sub) = record_changes(&service);

        let mut config = service.get_config().unwrap();
        config.ui_settings.show_toolbar = false;
        config.language = "en-US".to_string();
        config.theme = "Dark".to_string();
        service.update_config(config, None).await.unwrap();

        let sections: Vec<_> = seen.lock().iter().map(ConfigChange::section).collect();
        assert_eq!(
            sections,
            vec![ConfigSection::Theme, ConfigSection::Language, ConfigSection::UiSettings]
        );
        assert_eq!(
            seen.lock()[0],
            ConfigChange::Theme {
                old: "Light".to_string(),
                new: "Dark".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_session_override_wins_and_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        service.load_config(None).await.unwrap();

        let layer = ConfigLayer {
            theme: Some("System".to_string()),
            ..ConfigLayer::default()
        };
        service.update_layer(layer, ConfigLevel::Session).await.unwrap();

        assert_eq!(service.get_config().unwrap().theme, "System");
        assert_eq!(service.get_layer(ConfigLevel::User).theme.as_deref(), Some("Light"));
        assert!(matches!(
            service.save_config(Some(ConfigLevel::Session)).await,
            Err(ConfigError::UnsupportedLevel(ConfigLevel::Session))
        ));
    }

    #[tokio::test]
    async fn test_reset_window_state_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        service.load_config(None).await.unwrap();

        let mut config = service.get_config().unwrap();
        config.window_state.width = 1920.0;
        config.window_state.is_maximized = true;
        service.update_config(config, None).await.unwrap();

        service.reset_config(None, ConfigSection::WindowState).await.unwrap();
        let once = service.get_config().unwrap();
        service.reset_config(None, ConfigSection::WindowState).await.unwrap();

        assert_eq!(service.get_config().unwrap(), once);
        assert_eq!(once.window_state, crate::config::WindowState::default());
    }

    #[tokio::test]
    async fn test_save_failure_surfaces_and_publishes_error() {
        let service = ConfigService::new(Arc::new(ReadOnlyStorage), Arc::new(RuleValidator), EventBus::new());
        service.load_config(None).await.unwrap();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let _sub = service
            .events()
            .subscribe_fn(move |e: &ErrorOccurred| sink.lock().push(e.clone()));

        let mut config = service.get_config().unwrap();
        config.theme = "Dark".to_string();
        let result = service.update_config(config, None).await;

        assert!(matches!(result, Err(ConfigError::Storage { .. })));
        assert_eq!(service.get_config().unwrap().theme, "Dark");
        assert_eq!(errors.lock().len(), 1);
        assert!(service.save_config(None).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_layer_edits_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        service.load_config(None).await.unwrap();

        let (theme, language, font) = tokio::join!(
            service.edit_layer(ConfigLevel::User, |layer| layer.theme = Some("Dark".to_string())),
            service.edit_layer(ConfigLevel::User, |layer| layer.language = Some("en-US".to_string())),
            service.edit_layer(ConfigLevel::User, |layer| {
                layer.ui_settings.get_or_insert_with(Default::default).font_size = 20.0;
            }),
        );
        theme.unwrap();
        language.unwrap();
        font.unwrap();

        let config = service.get_config().unwrap();
        assert_eq!(config.theme, "Dark");
        assert_eq!(config.language, "en-US");
        assert_eq!(config.ui_settings.font_size, 20.0);
        let on_disk: ConfigLayer = serde_json::from_str(&fs::read_to_string(user_file(&dir)).unwrap()).unwrap();
        assert_eq!(on_disk.theme.as_deref(), Some("Dark"));
        assert_eq!(on_disk.language.as_deref(), Some("en-US"));
    }

    #[tokio::test]
    async fn test_edit_layer_repairs_invalid_values() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        service.load_config(None).await.unwrap();

        service
            .edit_layer(ConfigLevel::User, |layer| {
                layer.api_settings.get_or_insert_with(Default::default).timeout = 500;
            })
            .await
            .unwrap();

        assert_eq!(service.get_config().unwrap().api_settings.timeout, defaults::API_TIMEOUT);
    }

    #[tokio::test]
    async fn test_add_recent_file_dedups_and_caps() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        service.load_config(None).await.unwrap();

        for idx in 0..12 {
            service.add_recent_file(&format!("/news/{idx}.txt")).await.unwrap();
        }
        service.add_recent_file("/news/5.txt").await.unwrap();

        let recent = service.get_config().unwrap().recent_files;
        assert_eq!(recent.len(), MAX_RECENT_FILES);
        assert_eq!(recent[0], "/news/5.txt");
        assert_eq!(recent.iter().filter(|p| *p == "/news/5.txt").count(), 1);
    }

    #[tokio::test]
    async fn test_fix_config_leaves_valid_input_alone() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        let mut config = ConfigDocument::default();
        config.language = "en-US".to_string();

        assert_eq!(service.fix_config(&config), config);
        assert!(service.validate_config(&config).is_valid());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_external_edit_triggers_reload() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(service_in(&dir));
        service.load_config(None).await.unwrap();
        service.start_watching().unwrap();
        let reloads = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reloads);
        let _sub = service
            .events()
            .subscribe_fn(move |e: &ConfigReloaded| sink.lock().push(*e));

        // Outlast the grace window left by the initial write
        tokio::time::sleep(Duration::from_millis(SELF_WRITE_GRACE_MS + 200)).await;
        let mut layer = ConfigLayer::defaults();
        layer.theme = Some("Dark".to_string());
        fs::write(user_file(&dir), serde_json::to_string_pretty(&layer).unwrap()).unwrap();

        let mut reloaded = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if service.get_config().unwrap().theme == "Dark" {
                reloaded = true;
                break;
            }
        }
        assert!(reloaded, "external edit was not picked up");
        assert!(reloads.lock().iter().any(|e| e.external));
        service.stop_watching();
        assert!(!service.is_watching());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_own_save_does_not_trigger_reload() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(service_in(&dir));
        service.load_config(None).await.unwrap();
        service.start_watching().unwrap();
        let reloads = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&reloads);
        let _sub = service
            .events()
            .subscribe_fn(move |_: &ConfigReloaded| *sink.lock() += 1);

        let mut config = service.get_config().unwrap();
        config.theme = "Dark".to_string();
        service.update_config(config, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(WATCH_DEBOUNCE_MS + SELF_WRITE_GRACE_MS + 300)).await;

        assert_eq!(*reloads.lock(), 0);
    }
}
