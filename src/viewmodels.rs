//! View-models for the shell and every page

use std::any::Any;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};
use url::Url;

use crate::config::{ConfigDocument, ConfigSection, ConfigService, ValidationResult};
use crate::error::ConfigError;
use crate::events::{ErrorOccurred, ErrorSeverity, EventBus, NavigationCompleted, Subscription};
use crate::navigation::{
    NavigationParameter, NavigationRequester, ParameterPage, PageType, PendingNavigation,
    ViewModel, ViewModelContainer, ViewModelKind,
};

/// Main window: mirrors the displayed page and issues navigation commands
pub struct MainWindowViewModel {
    navigation: NavigationRequester,
    current_page: Arc<RwLock<PageType>>,
    _subscription: Subscription<NavigationCompleted>,
}

impl MainWindowViewModel {
    pub fn new(events: &EventBus, navigation: NavigationRequester) -> Self {
        let current_page = Arc::new(RwLock::new(PageType::Home));
        let mirror = Arc::clone(&current_page);
        let subscription = events.subscribe_fn(move |e: &NavigationCompleted| {
            *mirror.write() = e.page;
        });
        Self {
            navigation,
            current_page,
            _subscription: subscription,
        }
    }

    /// Show the first page once the window exists
    pub fn initialize_navigation(&self, start: PageType) -> PendingNavigation {
        info!(page = %start, "Initializing navigation");
        self.navigation.navigate(start, None)
    }

    /// Navigation command bound to a page name
    pub fn navigate(&self, name: &str) -> PendingNavigation {
        self.navigation.navigate_by_name(name, None)
    }

    pub fn current_page(&self) -> PageType {
        *self.current_page.read()
    }

    pub fn current_title(&self) -> &'static str {
        self.current_page().title()
    }
}

impl ViewModel for MainWindowViewModel {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::Shell
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct HomeViewModel {
    navigation: NavigationRequester,
}

impl HomeViewModel {
    pub fn new(navigation: NavigationRequester) -> Self {
        Self { navigation }
    }

    pub fn start_detection(&self) -> PendingNavigation {
        self.navigation.navigate(PageType::Detection, None)
    }

    /// Open the feature test page with a text parameter
    pub fn open_tests_with(&self, text: &str) -> PendingNavigation {
        let parameter: NavigationParameter = Arc::new(text.to_string());
        self.navigation.navigate(PageType::Test, Some(parameter))
    }
}

impl ViewModel for HomeViewModel {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::Home
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Input for a single detection; accepts the article text or URL as parameter
#[derive(Default)]
pub struct DetectionViewModel {
    pub news_content: Mutex<String>,
    pub source_url: Mutex<String>,
}

impl DetectionViewModel {
    pub fn can_detect(&self) -> bool {
        !self.news_content.lock().trim().is_empty() || !self.source_url.lock().trim().is_empty()
    }
}

impl ParameterPage for DetectionViewModel {
    fn initialize_parameters(&self, parameter: &NavigationParameter) {
        let Some(text) = parameter.downcast_ref::<String>() else {
            debug!("Detection page ignores non-text parameter");
            return;
        };
        let is_url = Url::parse(text).is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
        if is_url {
            *self.source_url.lock() = text.clone();
        } else {
            *self.news_content.lock() = text.clone();
        }
    }
}

impl ViewModel for DetectionViewModel {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::Detection
    }

    fn as_parameter_page(&self) -> Option<&dyn ParameterPage> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Edits a copy of the effective configuration
pub struct SettingsViewModel {
    config: Arc<ConfigService>,
    draft: Mutex<ConfigDocument>,
}

impl SettingsViewModel {
    pub fn new(config: Arc<ConfigService>) -> Self {
        let draft = config.get_config().unwrap_or_default();
        Self {
            config,
            draft: Mutex::new(draft),
        }
    }

    pub fn draft(&self) -> ConfigDocument {
        self.draft.lock().clone()
    }

    pub fn edit(&self, f: impl FnOnce(&mut ConfigDocument)) {
        f(&mut self.draft.lock());
    }

    pub fn validation(&self) -> ValidationResult {
        self.config.validate_config(&self.draft.lock())
    }

    pub fn is_dirty(&self) -> bool {
        self.config
            .get_config()
            .map(|current| current != *self.draft.lock())
            .unwrap_or(true)
    }

    /// Persist the draft at the User level, then pick up the repaired result
    pub async fn save(&self) -> Result<(), ConfigError> {
        let draft = self.draft();
        let saved = self.config.update_config(draft, None).await;
        self.reload_draft();
        saved
    }

    pub async fn reset_section(&self, section: ConfigSection) -> Result<(), ConfigError> {
        let reset = self.config.reset_config(None, section).await;
        self.reload_draft();
        reset
    }

    /// Discard edits and copy the current configuration again
    pub fn reload_draft(&self) {
        if let Ok(current) = self.config.get_config() {
            *self.draft.lock() = current;
        }
    }
}

impl ViewModel for SettingsViewModel {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::Settings
    }

    fn on_navigated_from(&self) {
        if self.is_dirty() {
            info!("Leaving settings with unsaved changes");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Past analyses; accepts a search filter as parameter
#[derive(Default)]
pub struct HistoryViewModel {
    pub filter: Mutex<String>,
}

impl ParameterPage for HistoryViewModel {
    fn initialize_parameters(&self, parameter: &NavigationParameter) {
        if let Some(filter) = parameter.downcast_ref::<String>() {
            *self.filter.lock() = filter.clone();
        }
    }
}

impl ViewModel for HistoryViewModel {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::History
    }

    fn as_parameter_page(&self) -> Option<&dyn ParameterPage> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
pub struct StatisticsViewModel;

impl ViewModel for StatisticsViewModel {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::Statistics
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Feature test page: shows received parameters and fires test events
pub struct TestViewModel {
    events: EventBus,
    pub parameter_info: Mutex<String>,
    pub content: Mutex<String>,
}

impl TestViewModel {
    pub fn new(events: EventBus) -> Self {
        Self {
            events,
            parameter_info: Mutex::new("No parameter received".to_string()),
            content: Mutex::new(String::new()),
        }
    }

    pub fn publish_test_event(&self) {
        self.events.publish(&ErrorOccurred::new(
            "Test event published",
            "Event bus round trip",
            ErrorSeverity::Info,
        ));
    }
}

impl ParameterPage for TestViewModel {
    fn initialize_parameters(&self, parameter: &NavigationParameter) {
        let info = match parameter.downcast_ref::<String>() {
            Some(text) => {
                *self.content.lock() = text.clone();
                format!("Received text parameter: {text}")
            }
            None => "Received parameter of unsupported type".to_string(),
        };
        *self.parameter_info.lock() = info;
    }
}

impl ViewModel for TestViewModel {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::Test
    }

    fn as_parameter_page(&self) -> Option<&dyn ParameterPage> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Services the page view-models depend on
#[derive(Clone)]
pub struct ViewModelDeps {
    pub events: EventBus,
    pub config: Arc<ConfigService>,
    pub navigation: NavigationRequester,
}

/// Register the shell as a singleton and every page as transient
pub fn register_defaults(container: &ViewModelContainer, deps: ViewModelDeps) {
    let shell_deps = deps.clone();
    container.register_singleton(ViewModelKind::Shell, move || {
        Ok(Arc::new(MainWindowViewModel::new(&shell_deps.events, shell_deps.navigation.clone())) as Arc<dyn ViewModel>)
    });

    let navigation = deps.navigation.clone();
    container.register_transient(ViewModelKind::Home, move || {
        Ok(Arc::new(HomeViewModel::new(navigation.clone())) as Arc<dyn ViewModel>)
    });
    container.register_transient(ViewModelKind::Detection, || {
        Ok(Arc::new(DetectionViewModel::default()) as Arc<dyn ViewModel>)
    });
    let config = Arc::clone(&deps.config);
    container.register_transient(ViewModelKind::Settings, move || {
        Ok(Arc::new(SettingsViewModel::new(Arc::clone(&config))) as Arc<dyn ViewModel>)
    });
    container.register_transient(ViewModelKind::History, || {
        Ok(Arc::new(HistoryViewModel::default()) as Arc<dyn ViewModel>)
    });
    container.register_transient(ViewModelKind::Statistics, || {
        Ok(Arc::new(StatisticsViewModel) as Arc<dyn ViewModel>)
    });
    let events = deps.events;
    container.register_transient(ViewModelKind::Test, move || {
        Ok(Arc::new(TestViewModel::new(events.clone())) as Arc<dyn ViewModel>)
    });
}
