//! UI-owned execution context
//!
//! All mutation of UI-visible state runs on one designated thread. Other
//! threads hand closures to a [`UiDispatcher`]; the owning thread drains them
//! through its [`UiLoop`], either once per frame (`run_pending`) or blocking
//! on a dedicated thread (`run`).

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::error::NavigationError;
use crate::events::panic_message;

type Job = Box<dyn FnOnce() + Send>;
type Waker = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Shared {
    ui_thread: OnceLock<ThreadId>,
    /// Called after a job is queued so an idle UI wakes up
    waker: Mutex<Option<Waker>>,
}

/// Sending half: schedules work onto the UI thread
#[derive(Clone)]
pub struct UiDispatcher {
    tx: mpsc::UnboundedSender<Job>,
    shared: Arc<Shared>,
}

/// Receiving half, owned by the UI thread
pub struct UiLoop {
    rx: mpsc::UnboundedReceiver<Job>,
    shared: Arc<Shared>,
}

/// Create a connected dispatcher and loop
pub fn channel() -> (UiDispatcher, UiLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared::default());
    (
        UiDispatcher {
            tx,
            shared: Arc::clone(&shared),
        },
        UiLoop { rx, shared },
    )
}

/// Run a [`UiLoop`] on its own named thread, for headless use
pub fn spawn_ui_thread(name: &str) -> std::io::Result<(UiDispatcher, thread::JoinHandle<()>)> {
    let (dispatcher, ui_loop) = channel();
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || ui_loop.run())?;
    Ok((dispatcher, handle))
}

impl UiDispatcher {
    /// Queue `f` without waiting for it
    pub fn post(&self, f: impl FnOnce() + Send + 'static) -> Result<(), NavigationError> {
        self.tx
            .send(Box::new(f))
            .map_err(|_| NavigationError::UiContextClosed)?;
        if let Some(wake) = self.shared.waker.lock().as_ref() {
            wake();
        }
        Ok(())
    }

    /// Run `f` on the UI thread and wait for its result
    ///
    /// Runs inline when already on the UI thread. A panic inside `f` is
    /// returned as [`NavigationError::Panicked`].
    pub async fn invoke<R, F>(&self, f: F) -> Result<R, NavigationError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_ui_thread() {
            return catch_unwind(AssertUnwindSafe(f))
                .map_err(|panic| NavigationError::Panicked(panic_message(&panic)));
        }

        let (tx, rx) = oneshot::channel();
        self.post(move || {
            let _ = tx.send(catch_unwind(AssertUnwindSafe(f)));
        })?;
        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(panic)) => Err(NavigationError::Panicked(panic_message(&panic))),
            Err(_) => Err(NavigationError::UiContextClosed),
        }
    }

    /// Wake callback run after every post, e.g. an egui repaint request
    pub fn set_waker(&self, wake: impl Fn() + Send + Sync + 'static) {
        *self.shared.waker.lock() = Some(Box::new(wake));
    }

    pub fn is_ui_thread(&self) -> bool {
        self.shared.ui_thread.get() == Some(&thread::current().id())
    }
}

impl UiLoop {
    fn claim_thread(&self) {
        let current = thread::current().id();
        let owner = *self.shared.ui_thread.get_or_init(|| current);
        if owner != current {
            warn!(?owner, ?current, "UI loop drained from a thread other than its owner");
        }
    }

    /// Run every queued job without blocking, returning how many ran
    pub fn run_pending(&mut self) -> usize {
        self.claim_thread();
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            run_job(job);
            ran += 1;
        }
        ran
    }

    /// Block the current thread running jobs until every dispatcher is dropped
    pub fn run(mut self) {
        self.claim_thread();
        debug!("UI loop started");
        while let Some(job) = self.rx.blocking_recv() {
            run_job(job);
        }
        debug!("UI loop finished");
    }
}

fn run_job(job: Job) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
        error!(panic = panic_message(&panic), "UI job panicked");
    }
}
