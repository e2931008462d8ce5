//! View-model registration and resolution with singleton/transient lifetimes

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::page::{ViewModel, ViewModelKind};
use crate::error::ResolveError;

/// Produces view-model instances by kind
pub trait ViewModelResolver: Send + Sync {
    fn resolve(&self, kind: ViewModelKind) -> Result<Arc<dyn ViewModel>, ResolveError>;
}

/// How long a resolved instance lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Created once and shared by every resolution
    Singleton,
    /// Created fresh on every resolution
    Transient,
}

type Factory = Box<dyn Fn() -> Result<Arc<dyn ViewModel>, ResolveError> + Send + Sync>;

struct Registration {
    factory: Factory,
    lifetime: Lifetime,
    instance: Option<Arc<dyn ViewModel>>,
}

/// Registry of view-model factories keyed by [`ViewModelKind`]
#[derive(Default)]
pub struct ViewModelContainer {
    registrations: RwLock<HashMap<ViewModelKind, Registration>>,
}

impl ViewModelContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; a later registration for the same kind replaces it
    ///
    /// Factories run under the registry lock and must not resolve from this container.
    pub fn register<F>(&self, kind: ViewModelKind, lifetime: Lifetime, factory: F)
    where
        F: Fn() -> Result<Arc<dyn ViewModel>, ResolveError> + Send + Sync + 'static,
    {
        let previous = self.registrations.write().insert(
            kind,
            Registration {
                factory: Box::new(factory),
                lifetime,
                instance: None,
            },
        );
        if previous.is_some() {
            debug!(?kind, "Replaced view-model registration");
        } else {
            debug!(?kind, ?lifetime, "Registered view-model");
        }
    }

    pub fn register_singleton<F>(&self, kind: ViewModelKind, factory: F)
    where
        F: Fn() -> Result<Arc<dyn ViewModel>, ResolveError> + Send + Sync + 'static,
    {
        self.register(kind, Lifetime::Singleton, factory);
    }

    pub fn register_transient<F>(&self, kind: ViewModelKind, factory: F)
    where
        F: Fn() -> Result<Arc<dyn ViewModel>, ResolveError> + Send + Sync + 'static,
    {
        self.register(kind, Lifetime::Transient, factory);
    }
}

impl ViewModelResolver for ViewModelContainer {
    fn resolve(&self, kind: ViewModelKind) -> Result<Arc<dyn ViewModel>, ResolveError> {
        let mut registrations = self.registrations.write();
        let registration = registrations
            .get_mut(&kind)
            .ok_or(ResolveError::NotRegistered(kind))?;

        match registration.lifetime {
            Lifetime::Singleton => {
                if let Some(instance) = &registration.instance {
                    return Ok(Arc::clone(instance));
                }
                let instance = (registration.factory)()?;
                registration.instance = Some(Arc::clone(&instance));
                Ok(instance)
            }
            Lifetime::Transient => (registration.factory)(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::page::EmptyViewModel;
    use std::any::Any;

    struct Counter(ViewModelKind);

    impl ViewModel for Counter {
        fn kind(&self) -> ViewModelKind {
            self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_singleton_is_shared() {
        let container = ViewModelContainer::new();
        container.register_singleton(ViewModelKind::Shell, || Ok(Arc::new(Counter(ViewModelKind::Shell))));

        let a = container.resolve(ViewModelKind::Shell).unwrap();
        let b = container.resolve(ViewModelKind::Shell).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_transient_is_fresh() {
        let container = ViewModelContainer::new();
        container.register_transient(ViewModelKind::Home, || Ok(Arc::new(Counter(ViewModelKind::Home))));

        let a = container.resolve(ViewModelKind::Home).unwrap();
        let b = container.resolve(ViewModelKind::Home).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unregistered_kind_fails() {
        let container = ViewModelContainer::new();
        assert_eq!(
            container.resolve(ViewModelKind::Settings).err(),
            Some(ResolveError::NotRegistered(ViewModelKind::Settings))
        );
    }

    #[test]
    fn test_failed_singleton_factory_is_retried() {
        let container = ViewModelContainer::new();
        let attempts = Arc::new(parking_lot::Mutex::new(0));
        let seen = Arc::clone(&attempts);
        container.register_singleton(ViewModelKind::Empty, move || {
            let mut n = seen.lock();
            *n += 1;
            if *n == 1 {
                Err(ResolveError::FactoryFailed {
                    kind: ViewModelKind::Empty,
                    reason: "not ready".to_string(),
                })
            } else {
                Ok(Arc::new(EmptyViewModel) as Arc<dyn ViewModel>)
            }
        });

        assert!(container.resolve(ViewModelKind::Empty).is_err());
        assert!(container.resolve(ViewModelKind::Empty).is_ok());
        assert_eq!(*attempts.lock(), 2);
    }
}
