//! File watching for external edits of the user configuration
//!
//! The parent directory is watched rather than the file itself so that editors
//! which replace the file (write temp + rename) are still observed. Events that
//! arrive while the service is writing, or shortly after, are treated as
//! self-inflicted and dropped.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::timing::WATCH_CHANNEL_CAPACITY;
use crate::error::ConfigError;

/// Shared flag telling the watcher to ignore writes made by the service itself
#[derive(Debug, Clone)]
pub struct WriteSuspension {
    inner: Arc<SuspensionState>,
}

#[derive(Debug)]
struct SuspensionState {
    writes_in_progress: AtomicUsize,
    resumed_at: Mutex<Option<Instant>>,
    grace: Duration,
}

impl WriteSuspension {
    pub fn new(grace: Duration) -> Self {
        Self {
            inner: Arc::new(SuspensionState {
                writes_in_progress: AtomicUsize::new(0),
                resumed_at: Mutex::new(None),
                grace,
            }),
        }
    }

    /// Suspend change handling until the returned guard is dropped
    pub fn suspend(&self) -> SuspendGuard {
        self.inner.writes_in_progress.fetch_add(1, Ordering::SeqCst);
        SuspendGuard {
            state: Arc::clone(&self.inner),
        }
    }

    /// True while a write is in progress or within the grace window after one
    pub fn is_suspended(&self) -> bool {
        if self.inner.writes_in_progress.load(Ordering::SeqCst) > 0 {
            return true;
        }
        self.inner
            .resumed_at
            .lock()
            .is_some_and(|at| at.elapsed() < self.inner.grace)
    }
}

/// Resumes change handling on drop
#[must_use = "change handling resumes as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SuspendGuard {
    state: Arc<SuspensionState>,
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        *self.state.resumed_at.lock() = Some(Instant::now());
        self.state.writes_in_progress.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Running watch on one configuration file
///
/// Dropping it stops both the OS watch and the reload task.
pub struct ConfigWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching `path`, calling `reload` once per debounced burst of changes
    ///
    /// `reload` returns false to stop watching. Must be called inside a tokio runtime.
    pub fn start<F, Fut>(
        path: &Path,
        suspension: WriteSuspension,
        debounce: Duration,
        reload: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ConfigError::Background(e.to_string()))?;

        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::storage(&dir, e))?;

        let file_name = path.file_name().map(|name| name.to_os_string());
        let (tx, mut rx) = mpsc::channel::<()>(WATCH_CHANNEL_CAPACITY);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !is_content_change(&event.kind) {
                        return;
                    }
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == file_name.as_deref());
                    if !touches_file {
                        return;
                    }
                    if suspension.is_suspended() {
                        debug!(kind = ?event.kind, "Ignoring change caused by own write");
                        return;
                    }
                    // A full channel already has a reload pending
                    let _ = tx.try_send(());
                }
                Err(e) => warn!(error = %e, "Config watch error"),
            },
            notify::Config::default(),
        )
        .map_err(|source| ConfigError::Watch {
            path: dir.clone(),
            source,
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| ConfigError::Watch {
                path: dir.clone(),
                source,
            })?;

        let task = runtime.spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(debounce).await;
                while rx.try_recv().is_ok() {}
                if !reload().await {
                    debug!("Config reload target dropped, stopping watcher task");
                    break;
                }
            }
        });

        info!(path = %path.display(), "Watching config file for external changes");
        Ok(Self {
            path: path.to_path_buf(),
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
        debug!(path = %self.path.display(), "Stopped watching config file");
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suspended_while_guard_alive() {
        let suspension = WriteSuspension::new(Duration::ZERO);
        assert!(!suspension.is_suspended());

        let guard = suspension.suspend();
        assert!(suspension.is_suspended());

        drop(guard);
        assert!(!suspension.is_suspended());
    }

    #[test]
    fn test_grace_window_after_write() {
        let suspension = WriteSuspension::new(Duration::from_secs(60));

        drop(suspension.suspend());
        assert!(suspension.is_suspended());
    }

    #[test]
    fn test_nested_guards_resume_after_last() {
        let suspension = WriteSuspension::new(Duration::ZERO);
        let outer = suspension.suspend();
        let inner = suspension.suspend();

        drop(inner);
        assert!(suspension.is_suspended());
        drop(outer);
        assert!(!suspension.is_suspended());
    }

    #[test]
    fn test_access_events_are_not_changes() {
        use notify::event::{AccessKind, CreateKind};

        assert!(!is_content_change(&EventKind::Access(AccessKind::Any)));
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
    }
}
