//! Page navigation: page identifiers, view-model resolution and the service

pub mod page;
pub mod resolver;
pub mod service;

pub use page::{
    ContentSlot, EmptyViewModel, NavigationHost, NavigationParameter, PageType, PageView,
    ParameterPage, ViewKind, ViewModel, ViewModelKind, page_title_for,
};
pub use resolver::{Lifetime, ViewModelContainer, ViewModelResolver};
pub use service::{NavigationRequester, NavigationService, PendingNavigation};
