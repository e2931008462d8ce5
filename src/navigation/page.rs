//! Pages, view-models and the host that displays them

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::constants::titles;

/// Navigable screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    Home,
    Detection,
    Settings,
    History,
    Statistics,
    Test,
}

impl PageType {
    pub const ALL: [PageType; 6] = [
        PageType::Home,
        PageType::Detection,
        PageType::Settings,
        PageType::History,
        PageType::Statistics,
        PageType::Test,
    ];

    pub fn title(self) -> &'static str {
        match self {
            PageType::Home => titles::HOME,
            PageType::Detection => titles::DETECTION,
            PageType::Settings => titles::SETTINGS,
            PageType::History => titles::HISTORY,
            PageType::Statistics => titles::STATISTICS,
            PageType::Test => titles::TEST,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PageType::Home => "Home",
            PageType::Detection => "Detection",
            PageType::Settings => "Settings",
            PageType::History => "History",
            PageType::Statistics => "Statistics",
            PageType::Test => "Test",
        }
    }

    pub fn view_model_kind(self) -> ViewModelKind {
        match self {
            PageType::Home => ViewModelKind::Home,
            PageType::Detection => ViewModelKind::Detection,
            PageType::Settings => ViewModelKind::Settings,
            PageType::History => ViewModelKind::History,
            PageType::Statistics => ViewModelKind::Statistics,
            PageType::Test => ViewModelKind::Test,
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageType::ALL
            .into_iter()
            .find(|page| page.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown page '{s}'"))
    }
}

/// Title for a page given by name, "Unknown" when it names no page
pub fn page_title_for(name: &str) -> &'static str {
    name.parse::<PageType>()
        .map(PageType::title)
        .unwrap_or(titles::UNKNOWN)
}

/// Registration key of a view-model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewModelKind {
    /// Main window, shared for the application lifetime
    Shell,
    Home,
    Detection,
    Settings,
    History,
    Statistics,
    Test,
    /// Placeholder shown when nothing else can be resolved
    Empty,
}

/// Opaque value handed to a page before it is shown
pub type NavigationParameter = Arc<dyn Any + Send + Sync>;

pub trait ViewModel: Send + Sync {
    fn kind(&self) -> ViewModelKind;

    /// Pages that accept a navigation parameter return themselves here
    fn as_parameter_page(&self) -> Option<&dyn ParameterPage> {
        None
    }

    /// Called when the page is replaced by another one
    fn on_navigated_from(&self) {}

    fn as_any(&self) -> &dyn Any;
}

/// Capability of receiving a [`NavigationParameter`]
pub trait ParameterPage {
    fn initialize_parameters(&self, parameter: &NavigationParameter);
}

/// View-model used when resolution fails outright
#[derive(Debug, Default)]
pub struct EmptyViewModel;

impl ViewModel for EmptyViewModel {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::Empty
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// View rendered for a view-model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Home,
    Detection,
    Settings,
    History,
    Statistics,
    Test,
}

impl ViewKind {
    /// Every view-model maps to one view; anything without a page of its own shows Home
    pub fn for_view_model(kind: ViewModelKind) -> Self {
        match kind {
            ViewModelKind::Home => ViewKind::Home,
            ViewModelKind::Detection => ViewKind::Detection,
            ViewModelKind::Settings => ViewKind::Settings,
            ViewModelKind::History => ViewKind::History,
            ViewModelKind::Statistics => ViewKind::Statistics,
            ViewModelKind::Test => ViewKind::Test,
            ViewModelKind::Shell | ViewModelKind::Empty => ViewKind::Home,
        }
    }
}

/// A view bound to its view-model, ready to be placed in a host
#[derive(Clone)]
pub struct PageView {
    pub page: PageType,
    pub view: ViewKind,
    pub view_model: Arc<dyn ViewModel>,
}

impl PageView {
    pub fn new(page: PageType, view_model: Arc<dyn ViewModel>) -> Self {
        Self {
            page,
            view: ViewKind::for_view_model(view_model.kind()),
            view_model,
        }
    }

    /// Borrow the view-model as its concrete type
    pub fn view_model_as<T: 'static>(&self) -> Option<&T> {
        self.view_model.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for PageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageView")
            .field("page", &self.page)
            .field("view", &self.view)
            .field("view_model", &self.view_model.kind())
            .finish()
    }
}

/// UI container whose content the navigation service replaces
///
/// `set_content` is only ever called on the UI thread.
pub trait NavigationHost: Send + Sync {
    /// Show `view`, returning what was shown before
    fn set_content(&self, view: PageView) -> Option<PageView>;

    fn content(&self) -> Option<PageView>;
}

/// Plain single-slot host
#[derive(Debug, Default)]
pub struct ContentSlot {
    current: Mutex<Option<PageView>>,
}

impl ContentSlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NavigationHost for ContentSlot {
    fn set_content(&self, view: PageView) -> Option<PageView> {
        self.current.lock().replace(view)
    }

    fn content(&self) -> Option<PageView> {
        self.current.lock().clone()
    }
}
