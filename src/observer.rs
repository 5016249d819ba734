//! Observers for bean lifecycle events.
//!
//! Observers see every creation, failure, proxy substitution and disposal
//! the container performs. They are meant for tracing and metrics; they
//! cannot change the outcome of a resolution.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::aop::ProxyKind;
use crate::error::ContainerError;

/// Hooks for observing container activity.
///
/// All methods default to no-ops, so implementors override only what they
/// need.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanContainer, ContainerObserver};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder {
///     created: Mutex<Vec<String>>,
/// }
///
/// impl ContainerObserver for Recorder {
///     fn created(&self, name: &str, _elapsed: Duration) {
///         self.created.lock().unwrap().push(name.to_string());
///     }
/// }
///
/// let container = BeanContainer::new();
/// let recorder = Arc::new(Recorder::default());
/// container.add_observer(recorder.clone());
/// ```
pub trait ContainerObserver: Send + Sync {
    /// A bean is about to be created.
    fn creating(&self, _name: &str) {}

    /// A bean was created (populated and initialized).
    fn created(&self, _name: &str, _elapsed: Duration) {}

    /// Creating a bean failed.
    fn creation_failed(&self, _name: &str, _error: &ContainerError) {}

    /// A bean was replaced by a proxy.
    fn proxy_created(&self, _name: &str, _kind: ProxyKind) {}

    /// A bean's disposer ran.
    fn destroyed(&self, _name: &str, _error: Option<&ContainerError>) {}
}

/// Registered observers. Cheap to check when empty.
#[derive(Default)]
pub(crate) struct Observers {
    observers: RwLock<Vec<Arc<dyn ContainerObserver>>>,
}

impl Observers {
    pub(crate) fn add(&self, observer: Arc<dyn ContainerObserver>) {
        self.observers.write().push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.read().is_empty()
    }

    fn each(&self, f: impl Fn(&dyn ContainerObserver)) {
        let snapshot: Vec<_> = self.observers.read().clone();
        for observer in &snapshot {
            f(observer.as_ref());
        }
    }

    pub(crate) fn creating(&self, name: &str) {
        self.each(|o| o.creating(name));
    }

    pub(crate) fn created(&self, name: &str, elapsed: Duration) {
        self.each(|o| o.created(name, elapsed));
    }

    pub(crate) fn creation_failed(&self, name: &str, error: &ContainerError) {
        self.each(|o| o.creation_failed(name, error));
    }

    pub(crate) fn proxy_created(&self, name: &str, kind: ProxyKind) {
        self.each(|o| o.proxy_created(name, kind));
    }

    pub(crate) fn destroyed(&self, name: &str, error: Option<&ContainerError>) {
        self.each(|o| o.destroyed(name, error));
    }
}

/// Observer that forwards events to `tracing`.
///
/// ```
/// use ferrous_beans::{BeanContainer, LoggingObserver};
/// use std::sync::Arc;
///
/// let container = BeanContainer::new();
/// container.add_observer(Arc::new(LoggingObserver::new()));
/// ```
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl LoggingObserver {
    pub fn new() -> Self {
        LoggingObserver
    }
}

impl ContainerObserver for LoggingObserver {
    fn creating(&self, name: &str) {
        debug!(bean = %name, "creating bean");
    }

    fn created(&self, name: &str, elapsed: Duration) {
        debug!(bean = %name, ?elapsed, "created bean");
    }

    fn creation_failed(&self, name: &str, error: &ContainerError) {
        warn!(bean = %name, %error, "bean creation failed");
    }

    fn proxy_created(&self, name: &str, kind: ProxyKind) {
        info!(bean = %name, ?kind, "bean replaced by proxy");
    }

    fn destroyed(&self, name: &str, error: Option<&ContainerError>) {
        match error {
            Some(error) => warn!(bean = %name, %error, "destroy hook failed"),
            None => debug!(bean = %name, "destroyed bean"),
        }
    }
}

/// Observer that counts lifecycle events.
///
/// ```
/// use ferrous_beans::{Bean, BeanContainer, BeanDefinition, BeanType, MetricsObserver};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Clock;
/// impl Bean for Clock {}
///
/// let container = BeanContainer::new();
/// let metrics = Arc::new(MetricsObserver::new());
/// container.add_observer(metrics.clone());
/// container.register_definition("clock", BeanDefinition::new(BeanType::of::<Clock>()));
///
/// container.resolve("clock").unwrap();
/// container.resolve("clock").unwrap();
/// assert_eq!(metrics.creation_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MetricsObserver {
    creations: AtomicU64,
    creation_nanos: AtomicU64,
    failures: AtomicU64,
    proxies: AtomicU64,
    destructions: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn creation_count(&self) -> u64 {
        self.creations.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn proxy_count(&self) -> u64 {
        self.proxies.load(Ordering::Relaxed)
    }

    pub fn destruction_count(&self) -> u64 {
        self.destructions.load(Ordering::Relaxed)
    }

    /// Total time spent creating beans. Nested creations are counted in
    /// both the inner and the outer bean.
    pub fn total_creation_time(&self) -> Duration {
        Duration::from_nanos(self.creation_nanos.load(Ordering::Relaxed))
    }

    pub fn average_creation_time(&self) -> Option<Duration> {
        let count = self.creation_count();
        if count == 0 {
            return None;
        }
        Some(Duration::from_nanos(self.creation_nanos.load(Ordering::Relaxed) / count))
    }

    pub fn reset(&self) {
        self.creations.store(0, Ordering::Relaxed);
        self.creation_nanos.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.proxies.store(0, Ordering::Relaxed);
        self.destructions.store(0, Ordering::Relaxed);
    }
}

impl ContainerObserver for MetricsObserver {
    fn created(&self, _name: &str, elapsed: Duration) {
        self.creations.fetch_add(1, Ordering::Relaxed);
        self.creation_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    fn creation_failed(&self, _name: &str, _error: &ContainerError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn proxy_created(&self, _name: &str, _kind: ProxyKind) {
        self.proxies.fetch_add(1, Ordering::Relaxed);
    }

    fn destroyed(&self, _name: &str, _error: Option<&ContainerError>) {
        self.destructions.fetch_add(1, Ordering::Relaxed);
    }
}
