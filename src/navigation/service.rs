//! Serialized page navigation
//!
//! Requests go into a FIFO queue consumed by a single worker task, so at most
//! one navigation is in flight and they complete in request order. Each request
//! runs in its own task; a panic fails that request only and the worker moves
//! on to the next one.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::page::{
    EmptyViewModel, NavigationHost, NavigationParameter, PageType, PageView, ViewModel,
    page_title_for,
};
use super::resolver::ViewModelResolver;
use crate::dispatcher::UiDispatcher;
use crate::error::NavigationError;
use crate::events::{ErrorOccurred, ErrorSeverity, EventBus, NavigationCompleted, panic_message};

type Reply = oneshot::Sender<Result<(), NavigationError>>;

struct NavigationRequest {
    page: PageType,
    parameter: Option<NavigationParameter>,
    reply: Reply,
}

struct NavigationState {
    host: Option<Arc<dyn NavigationHost>>,
    current_page: PageType,
    current_view_model: Option<Arc<dyn ViewModel>>,
}

struct Shared {
    resolver: Arc<dyn ViewModelResolver>,
    dispatcher: UiDispatcher,
    events: EventBus,
    state: RwLock<NavigationState>,
}

/// Outcome of a queued navigation; awaiting it is optional
#[must_use = "call `wait` to observe the outcome, or drop to fire and forget"]
pub struct PendingNavigation {
    rx: Option<oneshot::Receiver<Result<(), NavigationError>>>,
}

impl PendingNavigation {
    pub async fn wait(self) -> Result<(), NavigationError> {
        match self.rx {
            Some(rx) => rx.await.unwrap_or(Err(NavigationError::WorkerStopped)),
            None => Err(NavigationError::WorkerStopped),
        }
    }
}

/// Queues navigation requests without keeping the service alive
///
/// Held by view-models that issue navigation commands.
#[derive(Clone)]
pub struct NavigationRequester {
    tx: mpsc::WeakUnboundedSender<NavigationRequest>,
}

impl NavigationRequester {
    pub fn navigate(&self, page: PageType, parameter: Option<NavigationParameter>) -> PendingNavigation {
        match self.tx.upgrade() {
            Some(tx) => enqueue(&tx, page, parameter),
            None => {
                warn!(page = %page, "Navigation service is gone, dropping request");
                PendingNavigation { rx: None }
            }
        }
    }

    /// Navigate by page name; unknown names go to Home
    pub fn navigate_by_name(&self, name: &str, parameter: Option<NavigationParameter>) -> PendingNavigation {
        self.navigate(parse_page_name(name), parameter)
    }
}

/// Single point of control for the displayed page
pub struct NavigationService {
    shared: Arc<Shared>,
    tx: mpsc::UnboundedSender<NavigationRequest>,
}

impl NavigationService {
    /// Create the service and start its worker on the current tokio runtime
    pub fn new(
        resolver: Arc<dyn ViewModelResolver>,
        dispatcher: UiDispatcher,
        events: EventBus,
    ) -> Result<Self, NavigationError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| NavigationError::NoRuntime)?;
        let shared = Arc::new(Shared {
            resolver,
            dispatcher,
            events,
            state: RwLock::new(NavigationState {
                host: None,
                current_page: PageType::Home,
                current_view_model: None,
            }),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_worker(Arc::clone(&shared), rx));
        Ok(Self { shared, tx })
    }

    /// Register the container that future navigations populate; the latest wins
    pub fn set_navigation_target(&self, host: Arc<dyn NavigationHost>) {
        let mut state = self.shared.state.write();
        if state.host.replace(host).is_some() {
            debug!("Navigation target replaced");
        } else {
            debug!("Navigation target registered");
        }
    }

    /// Navigate and wait for the page to be shown
    pub async fn navigate_to(&self, page: PageType, parameter: Option<NavigationParameter>) -> Result<(), NavigationError> {
        self.navigate(page, parameter).wait().await
    }

    /// Queue a navigation; failures are also reported as [`ErrorOccurred`] events
    pub fn navigate(&self, page: PageType, parameter: Option<NavigationParameter>) -> PendingNavigation {
        enqueue(&self.tx, page, parameter)
    }

    pub fn navigate_by_name(&self, name: &str, parameter: Option<NavigationParameter>) -> PendingNavigation {
        self.navigate(parse_page_name(name), parameter)
    }

    pub fn requester(&self) -> NavigationRequester {
        NavigationRequester {
            tx: self.tx.downgrade(),
        }
    }

    pub fn page_title(&self, page: PageType) -> &'static str {
        page.title()
    }

    pub fn page_title_for(&self, name: &str) -> &'static str {
        page_title_for(name)
    }

    pub fn current_page(&self) -> PageType {
        self.shared.state.read().current_page
    }

    pub fn current_title(&self) -> &'static str {
        self.current_page().title()
    }

    pub fn current_view_model(&self) -> Option<Arc<dyn ViewModel>> {
        self.shared.state.read().current_view_model.clone()
    }
}

fn parse_page_name(name: &str) -> PageType {
    name.parse().unwrap_or_else(|_| {
        warn!(name, "Unknown page requested, navigating to Home");
        PageType::Home
    })
}

fn enqueue(
    tx: &mpsc::UnboundedSender<NavigationRequest>,
    page: PageType,
    parameter: Option<NavigationParameter>,
) -> PendingNavigation {
    let (reply, rx) = oneshot::channel();
    let request = NavigationRequest { page, parameter, reply };
    match tx.send(request) {
        Ok(()) => PendingNavigation { rx: Some(rx) },
        Err(_) => {
            warn!(page = %page, "Navigation worker stopped, dropping request");
            PendingNavigation { rx: None }
        }
    }
}

async fn run_worker(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<NavigationRequest>) {
    debug!("Navigation worker started");
    while let Some(NavigationRequest { page, parameter, reply }) = rx.recv().await {
        let task = tokio::spawn(process(Arc::clone(&shared), page, parameter));
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(join) if join.is_panic() => Err(NavigationError::Panicked(panic_message(&join.into_panic()))),
            Err(join) => Err(NavigationError::Panicked(join.to_string())),
        };

        if let Err(e) = &outcome {
            match e {
                NavigationError::TargetMissing => {}
                e => {
                    error!(page = %page, error = %e, "Navigation failed");
                    shared.report_failure(page);
                }
            }
        }
        let _ = reply.send(outcome);
    }
    debug!("Navigation worker stopped");
}

async fn process(shared: Arc<Shared>, page: PageType, parameter: Option<NavigationParameter>) -> Result<(), NavigationError> {
    let host = shared.state.read().host.clone();
    let Some(host) = host else {
        error!(page = %page, "Navigation requested before a navigation target was set");
        return Err(NavigationError::TargetMissing);
    };

    let (shown, view_model) = shared.resolve_or_fallback(page);

    if let Some(parameter) = &parameter {
        match view_model.as_parameter_page() {
            Some(target) => target.initialize_parameters(parameter),
            None => debug!(page = %shown, "Page takes no parameter, ignoring it"),
        }
    }

    let view = PageView::new(shown, view_model);
    let ui_shared = Arc::clone(&shared);
    shared
        .dispatcher
        .invoke(move || {
            if let Some(previous) = host.content() {
                previous.view_model.on_navigated_from();
            }
            let view_model = Arc::clone(&view.view_model);
            host.set_content(view);

            let mut state = ui_shared.state.write();
            state.current_page = shown;
            state.current_view_model = Some(view_model);
        })
        .await?;

    info!(page = %shown, title = shown.title(), "Navigated");
    shared.events.publish(&NavigationCompleted { page: shown });
    Ok(())
}

impl Shared {
    /// Resolve the page's view-model, falling back to Home and then to an empty one
    fn resolve_or_fallback(&self, page: PageType) -> (PageType, Arc<dyn ViewModel>) {
        match self.resolver.resolve(page.view_model_kind()) {
            Ok(view_model) => (page, view_model),
            Err(e) => {
                error!(page = %page, error = %e, "Failed to resolve view-model, falling back to Home");
                self.report_failure(page);
                let fallback = match page {
                    PageType::Home => None,
                    _ => self.resolver.resolve(PageType::Home.view_model_kind()).ok(),
                };
                let view_model = fallback.unwrap_or_else(|| Arc::new(EmptyViewModel));
                (PageType::Home, view_model)
            }
        }
    }

    fn report_failure(&self, page: PageType) {
        self.events.publish(&ErrorOccurred::new(
            "Navigation failed",
            format!("Could not open page {}", page.title()),
            ErrorSeverity::Error,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::spawn_ui_thread;
    use crate::error::ResolveError;
    use crate::navigation::page::{ContentSlot, ParameterPage, ViewModelKind};
    use crate::navigation::resolver::ViewModelContainer;
    use parking_lot::Mutex;
    use std::any::Any;
    use std::thread::{self, ThreadId};

    struct TestPage {
        kind: ViewModelKind,
        parameter: Mutex<Option<String>>,
        left: Mutex<bool>,
    }

    impl TestPage {
        fn new(kind: ViewModelKind) -> Self {
            Self {
                kind,
                parameter: Mutex::new(None),
                left: Mutex::new(false),
            }
        }
    }

    impl ViewModel for TestPage {
        fn kind(&self) -> ViewModelKind {
            self.kind
        }

        fn as_parameter_page(&self) -> Option<&dyn ParameterPage> {
            Some(self)
        }

        fn on_navigated_from(&self) {
            *self.left.lock() = true;
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl ParameterPage for TestPage {
        fn initialize_parameters(&self, parameter: &NavigationParameter) {
            *self.parameter.lock() = parameter.downcast_ref::<String>().cloned();
        }
    }

    /// Host that records which thread mutated it and in what order
    #[derive(Default)]
    struct RecordingHost {
        slot: ContentSlot,
        threads: Mutex<Vec<ThreadId>>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl NavigationHost for RecordingHost {
        fn set_content(&self, view: PageView) -> Option<PageView> {
            self.threads.lock().push(thread::current().id());
            self.log.lock().push(format!("show {}", view.page));
            self.slot.set_content(view)
        }

        fn content(&self) -> Option<PageView> {
            self.slot.content()
        }
    }

    /// Resolver that logs each resolution into the same log as the host
    struct LoggingResolver {
        inner: ViewModelContainer,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ViewModelResolver for LoggingResolver {
        fn resolve(&self, kind: ViewModelKind) -> Result<Arc<dyn ViewModel>, ResolveError> {
            self.log.lock().push(format!("resolve {kind:?}"));
            self.inner.resolve(kind)
        }
    }

    fn page_container() -> ViewModelContainer {
        let container = ViewModelContainer::new();
        for page in PageType::ALL {
            let kind = page.view_model_kind();
            container.register_transient(kind, move || Ok(Arc::new(TestPage::new(kind)) as Arc<dyn ViewModel>));
        }
        container
    }

    struct Harness {
        service: NavigationService,
        host: Arc<RecordingHost>,
        events: EventBus,
        log: Arc<Mutex<Vec<String>>>,
        ui_thread: ThreadId,
    }

    fn harness(container: ViewModelContainer) -> Harness {
        let (dispatcher, handle) = spawn_ui_thread("nav-ui").unwrap();
        let ui_thread = handle.thread().id();
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolver = LoggingResolver {
            inner: container,
            log: Arc::clone(&log),
        };
        let events = EventBus::new();
        let service = NavigationService::new(Arc::new(resolver), dispatcher, events.clone()).unwrap();
        let host = Arc::new(RecordingHost {
            log: Arc::clone(&log),
            ..RecordingHost::default()
        });
        service.set_navigation_target(Arc::clone(&host) as Arc<dyn NavigationHost>);
        Harness {
            service,
            host,
            events,
            log,
            ui_thread,
        }
    }

    fn record<T: Clone + Send + 'static>(events: &EventBus) -> (Arc<Mutex<Vec<T>>>, crate::events::Subscription<T>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = events.subscribe_fn(move |e: &T| sink.lock().push(e.clone()));
        (seen, sub)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_back_to_back_requests_complete_in_order() {
        let h = harness(page_container());
        let (completed, _sub) = record::<NavigationCompleted>(&h.events);

        let first = h.service.navigate(PageType::Detection, None);
        let second = h.service.navigate(PageType::History, None);
        first.wait().await.unwrap();
        second.wait().await.unwrap();

        let pages: Vec<_> = completed.lock().iter().map(|e| e.page).collect();
        assert_eq!(pages, vec![PageType::Detection, PageType::History]);
        assert_eq!(h.host.content().map(|v| v.page), Some(PageType::History));
        assert_eq!(h.service.current_page(), PageType::History);
        assert_eq!(h.service.current_title(), "History");
        assert_eq!(
            *h.log.lock(),
            vec!["resolve Detection", "show Detection", "resolve History", "show History"]
        );
    }

    #[tokio::test]
    async fn test_host_is_mutated_on_ui_thread_only() {
        let h = harness(page_container());

        h.service.navigate_to(PageType::Settings, None).await.unwrap();
        h.service.navigate_to(PageType::Statistics, None).await.unwrap();

        let threads = h.host.threads.lock();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|id| *id == h.ui_thread));
    }

    #[tokio::test]
    async fn test_missing_target_fails_without_event() {
        let (dispatcher, _handle) = spawn_ui_thread("nav-ui").unwrap();
        let events = EventBus::new();
        let service = NavigationService::new(Arc::new(page_container()), dispatcher, events.clone()).unwrap();
        let (errors, _sub) = record::<ErrorOccurred>(&events);

        let result = service.navigate_to(PageType::Detection, None).await;

        assert!(matches!(result, Err(NavigationError::TargetMissing)));
        assert!(errors.lock().is_empty());
        assert_eq!(service.current_page(), PageType::Home);
    }

    #[tokio::test]
    async fn test_unknown_name_goes_home() {
        let h = harness(page_container());
        h.service.navigate_to(PageType::Test, None).await.unwrap();

        h.service.navigate_by_name("Reports", None).wait().await.unwrap();

        assert_eq!(h.service.current_page(), PageType::Home);
        assert_eq!(h.service.page_title_for("Reports"), "Unknown");
    }

    #[tokio::test]
    async fn test_parameter_delivered_before_display() {
        let h = harness(page_container());
        let parameter: NavigationParameter = Arc::new("https://news.example/story".to_string());

        h.service.navigate_to(PageType::Detection, Some(parameter)).await.unwrap();

        let view = h.host.content().unwrap();
        let page = view.view_model_as::<TestPage>().unwrap();
        assert_eq!(page.parameter.lock().as_deref(), Some("https://news.example/story"));
    }

    #[tokio::test]
    async fn test_previous_page_is_notified_when_replaced() {
        let h = harness(page_container());
        h.service.navigate_to(PageType::Home, None).await.unwrap();
        let first = h.service.current_view_model().unwrap();

        h.service.navigate_to(PageType::Settings, None).await.unwrap();

        let first = first.as_any().downcast_ref::<TestPage>().unwrap();
        assert!(*first.left.lock());
    }

    #[tokio::test]
    async fn test_unresolvable_page_falls_back_to_home_and_reports() {
        let container = ViewModelContainer::new();
        container.register_transient(ViewModelKind::Home, || {
            Ok(Arc::new(TestPage::new(ViewModelKind::Home)) as Arc<dyn ViewModel>)
        });
        let h = harness(container);
        let (errors, _sub) = record::<ErrorOccurred>(&h.events);

        h.service.navigate_to(PageType::Statistics, None).await.unwrap();

        assert_eq!(h.service.current_page(), PageType::Home);
        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Could not open page Statistics");
    }

    #[tokio::test]
    async fn test_nothing_resolvable_shows_empty_page() {
        let h = harness(ViewModelContainer::new());

        h.service.navigate_to(PageType::Home, None).await.unwrap();

        let view = h.host.content().unwrap();
        assert_eq!(view.view_model.kind(), ViewModelKind::Empty);
        assert_eq!(view.view, crate::navigation::page::ViewKind::Home);
    }

    #[tokio::test]
    async fn test_panicking_page_does_not_wedge_queue() {
        struct ExplodingPage;

        impl ViewModel for ExplodingPage {
            fn kind(&self) -> ViewModelKind {
                ViewModelKind::Test
            }

            fn as_parameter_page(&self) -> Option<&dyn ParameterPage> {
                panic!("exploding page")
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let container = page_container();
        container.register_transient(ViewModelKind::Test, || Ok(Arc::new(ExplodingPage) as Arc<dyn ViewModel>));
        let h = harness(container);
        let (errors, _sub) = record::<ErrorOccurred>(&h.events);
        let parameter: NavigationParameter = Arc::new(1u32);

        let failed = h.service.navigate_to(PageType::Test, Some(parameter)).await;
        assert!(matches!(failed, Err(NavigationError::Panicked(_))));
        assert_eq!(errors.lock().len(), 1);

        h.service.navigate_to(PageType::History, None).await.unwrap();
        assert_eq!(h.service.current_page(), PageType::History);
    }

    #[tokio::test]
    async fn test_requester_stops_after_service_dropped() {
        let h = harness(page_container());
        let requester = h.service.requester();

        requester.navigate(PageType::Settings, None).wait().await.unwrap();
        assert_eq!(h.service.current_page(), PageType::Settings);

        drop(h);
        assert!(matches!(
            requester.navigate(PageType::Home, None).wait().await,
            Err(NavigationError::WorkerStopped)
        ));
    }
}
