//! The reloadable service itself.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::types::{ReloadFailure, ReloadOutcome, ReloadStatus, ServiceState};
use super::watcher::ReloadWatcher;
use crate::builder::ComponentBuilder;
use crate::component::{PinnedComponent, ServiceableComponent};
use crate::config::ServiceConfig;
use crate::constants::{DEFAULT_POLL_INTERVAL_MS, MAX_PIN_ATTEMPTS, WATCHER_THREAD_PREFIX};
use crate::error::{Error, Result};
use crate::resource::{ChangeDetector, ConfigResource, FileResource, Snapshot};

struct Lifecycle {
    state: ServiceState,
    watcher: Option<ReloadWatcher>,
}

/// A service that rebuilds its component when configuration changes.
///
/// Readers call [`pin`](Self::pin) (or
/// [`get_serviceable_component`](Self::get_serviceable_component) followed by
/// [`ServiceableComponent::pin`]) and use the value through the returned
/// guard. A single writer, either the watcher thread or an explicit
/// [`reload`](Self::reload), builds new versions and swaps them in; the
/// previous version is destroyed once its last pin is released.
///
/// A failed rebuild never disturbs the published version.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use reloadable::resource::{ConfigResource, StaticResource};
/// use reloadable::service::ReloadableService;
///
/// let resources: Vec<Arc<dyn ConfigResource>> =
///     vec![Arc::new(StaticResource::new("greeting", "hello"))];
/// let service = Arc::new(ReloadableService::new(
///     "greeter",
///     resources,
///     |resources: &[Arc<dyn ConfigResource>]| -> anyhow::Result<String> {
///         Ok(resources[0].read_to_string()?.to_uppercase())
///     },
/// ));
///
/// service.start().unwrap();
/// assert_eq!(service.pin().unwrap().as_str(), "HELLO");
/// service.stop();
/// ```
pub struct ReloadableService<T> {
    id: String,
    resources: Vec<Arc<dyn ConfigResource>>,
    builder: Box<dyn ComponentBuilder<T>>,
    fail_fast: bool,
    poll_interval: Duration,
    current: ArcSwapOption<ServiceableComponent<T>>,
    detector: ChangeDetector,
    /// Serialises writers. Never held by readers or by `stop()`.
    reload_lock: Mutex<()>,
    lifecycle: Mutex<Lifecycle>,
    status: Mutex<ReloadStatus>,
    generation: AtomicU64,
}

impl<T: Send + Sync + 'static> ReloadableService<T> {
    /// Create an unstarted service.
    ///
    /// Fail-fast is on and the poll interval is
    /// [`DEFAULT_POLL_INTERVAL_MS`] until changed with the `with_*` methods.
    pub fn new(
        id: impl Into<String>,
        resources: Vec<Arc<dyn ConfigResource>>,
        builder: impl ComponentBuilder<T> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            resources,
            builder: Box::new(builder),
            fail_fast: true,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            current: ArcSwapOption::empty(),
            detector: ChangeDetector::new(),
            reload_lock: Mutex::new(()),
            lifecycle: Mutex::new(Lifecycle {
                state: ServiceState::Unstarted,
                watcher: None,
            }),
            status: Mutex::new(ReloadStatus::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Create a service from a validated service file.
    ///
    /// Every configured resource becomes a [`FileResource`].
    pub fn from_config(config: &ServiceConfig, builder: impl ComponentBuilder<T> + 'static) -> Self {
        let resources = config
            .resource_paths()
            .into_iter()
            .map(|path| Arc::new(FileResource::new(path)) as Arc<dyn ConfigResource>)
            .collect();

        Self::new(config.id.clone(), resources, builder)
            .with_fail_fast(config.fail_fast)
            .with_poll_interval(config.poll_interval())
    }

    /// Whether a failed initial build aborts `start()`.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// How often the watcher checks for changes. Zero disables the watcher.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Perform the initial build and schedule the watcher.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyStarted`] on a second call. With fail-fast, a failed
    /// build is returned as [`Error::Build`] and the service ends up stopped.
    /// Without fail-fast the failure is logged and the service runs with no
    /// component until a later reload succeeds.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != ServiceState::Unstarted {
                return Err(Error::AlreadyStarted(self.id.clone()));
            }
            lifecycle.state = ServiceState::Running;
        }
        info!(service = %self.id, resources = self.resources.len(), "Starting reloadable service");

        if let Err(err) = self.rebuild(true) {
            if self.fail_fast {
                error!(service = %self.id, error = %err, "Initial build failed, stopping service");
                self.stop();
                return Err(err);
            }
            warn!(service = %self.id, "Continuing without a component until a reload succeeds");
        }

        if self.poll_interval.is_zero() {
            debug!(service = %self.id, "Polling disabled");
            return Ok(());
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let watcher = ReloadWatcher::spawn(
            format!("{WATCHER_THREAD_PREFIX}{}", self.id),
            self.poll_interval,
            move || match weak.upgrade() {
                Some(service) => service.tick(),
                None => false,
            },
        )?;

        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state == ServiceState::Running {
            lifecycle.watcher = Some(watcher);
        } else {
            watcher.cancel();
        }
        Ok(())
    }

    /// The currently published version, not pinned.
    ///
    /// The returned version may be superseded at any moment; pin it before
    /// use and be prepared for [`Error::PinAfterDestroy`].
    pub fn get_serviceable_component(&self) -> Option<Arc<ServiceableComponent<T>>> {
        self.current.load_full()
    }

    /// Pin the currently published version.
    ///
    /// Retries when a reload destroys the loaded version between loading and
    /// pinning it.
    ///
    /// # Errors
    ///
    /// [`Error::NoComponent`] when nothing is published.
    pub fn pin(&self) -> Result<PinnedComponent<T>> {
        let mut last_error = Error::NoComponent(self.id.clone());
        for attempt in 1..=MAX_PIN_ATTEMPTS {
            let Some(component) = self.current.load_full() else {
                return Err(Error::NoComponent(self.id.clone()));
            };
            match component.pin() {
                Ok(pinned) => return Ok(pinned),
                Err(err @ Error::PinAfterDestroy { .. }) => {
                    debug!(service = %self.id, attempt, error = %err, "Lost race with reload, retrying pin");
                    last_error = err;
                },
                Err(err) => return Err(err),
            }
        }
        Err(last_error)
    }

    /// Rebuild if any resource changed since the last successful build.
    ///
    /// Returns [`ReloadOutcome::Skipped`] when the service is not running.
    ///
    /// # Errors
    ///
    /// [`Error::Build`] if the rebuild failed. The published version is kept.
    pub fn poll(&self) -> Result<ReloadOutcome> {
        self.rebuild(false)
    }

    /// Rebuild now, whether or not the resources changed.
    ///
    /// # Errors
    ///
    /// [`Error::NotRunning`] unless running, [`Error::Build`] if the rebuild
    /// failed. The published version is kept on failure.
    pub fn reload(&self) -> Result<ReloadOutcome> {
        if !self.is_running() {
            return Err(Error::NotRunning(self.id.clone()));
        }
        self.rebuild(true)
    }

    /// Stop the service.
    ///
    /// Cancels the watcher without waiting for a reload in progress, then
    /// unpublishes and supersedes the current version. Idempotent.
    pub fn stop(&self) {
        let (watcher, previous) = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state == ServiceState::Stopped {
                return;
            }
            lifecycle.state = ServiceState::Stopped;
            (lifecycle.watcher.take(), self.current.swap(None))
        };

        if let Some(watcher) = watcher {
            watcher.cancel();
        }
        if let Some(previous) = previous {
            previous.mark_superseded_and_maybe_destroy();
        }
        info!(service = %self.id, "Stopped reloadable service");
    }

    /// Current reload status.
    pub fn status(&self) -> ReloadStatus {
        let mut status = self.status.lock().clone();
        status.state = self.state();
        status
    }

    pub fn state(&self) -> ServiceState {
        self.lifecycle.lock().state
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    pub fn resources(&self) -> &[Arc<dyn ConfigResource>] {
        &self.resources
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// One watcher iteration. Returns false once the service is stopped.
    fn tick(&self) -> bool {
        match self.poll() {
            Ok(ReloadOutcome::Skipped) => false,
            Ok(_) => true,
            // Already logged and recorded by rebuild.
            Err(_) => self.is_running(),
        }
    }

    fn rebuild(&self, forced: bool) -> Result<ReloadOutcome> {
        let _writer = self.reload_lock.lock();
        if !self.is_running() {
            return Ok(ReloadOutcome::Skipped);
        }

        let attempt = Utc::now();
        self.status.lock().last_reload_attempt = Some(attempt);

        let snapshot = match self.detector.changed(&self.resources) {
            Some(snapshot) => snapshot,
            None if !forced => {
                debug!(service = %self.id, "Configuration unchanged");
                return Ok(ReloadOutcome::Unchanged);
            },
            None => Snapshot::capture(&self.resources),
        };

        debug!(service = %self.id, forced, "Building component");
        let built = panic::catch_unwind(AssertUnwindSafe(|| self.builder.build(&self.resources)))
            .unwrap_or_else(|payload| Err(anyhow::anyhow!("builder panicked: {}", panic_message(&*payload))));

        let value = match built {
            Ok(value) => value,
            Err(source) => {
                let err = Error::build(&self.id, source);
                error!(service = %self.id, error = %err, "Reload failed, keeping current component");
                self.status.lock().last_failure = Some(ReloadFailure {
                    at: attempt,
                    message: err.to_string(),
                });
                return Err(err);
            },
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let component = Arc::new(ServiceableComponent::new(value, generation));

        let previous = {
            let lifecycle = self.lifecycle.lock();
            if lifecycle.state != ServiceState::Running {
                drop(lifecycle);
                info!(service = %self.id, generation, "Service stopped during reload, discarding component");
                component.mark_superseded_and_maybe_destroy();
                return Ok(ReloadOutcome::Discarded { generation });
            }
            self.current.swap(Some(component))
        };

        self.detector.commit(snapshot);
        {
            let mut status = self.status.lock();
            status.generation = generation;
            status.last_successful_reload = Some(attempt);
            status.last_failure = None;
        }

        match previous {
            Some(previous) => {
                info!(
                    service = %self.id,
                    generation,
                    previous = previous.generation(),
                    "Published reloaded component"
                );
                previous.mark_superseded_and_maybe_destroy();
            },
            None => info!(service = %self.id, generation, "Published component"),
        }

        Ok(ReloadOutcome::Reloaded { generation })
    }
}

impl<T> Drop for ReloadableService<T> {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.get_mut();
        if lifecycle.state == ServiceState::Stopped {
            return;
        }
        lifecycle.state = ServiceState::Stopped;
        if let Some(watcher) = lifecycle.watcher.take() {
            watcher.cancel();
        }
        if let Some(previous) = self.current.swap(None) {
            previous.mark_superseded_and_maybe_destroy();
        }
        debug!(service = %self.id, "Dropped reloadable service");
    }
}

impl<T> fmt::Debug for ReloadableService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadableService")
            .field("id", &self.id)
            .field("resources", &self.resources)
            .field("fail_fast", &self.fail_fast)
            .field("poll_interval", &self.poll_interval)
            .field("state", &self.lifecycle.lock().state)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
