//! Hooks for observing compilation and service resolution.
//!
//! Observers are registered on the [`ContainerBuilder`](crate::ContainerBuilder)
//! and receive an event for every definition compiled and, once the graph runs
//! inside a [`CompiledContainer`](crate::CompiledContainer), for every service
//! built.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ContainerError;

/// Observer of compiler and container events.
///
/// Calls are synchronous; keep implementations cheap.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use viserio_container::{ClassRegistry, ContainerBuilder, CompilerObserver, Definition};
///
/// struct Printer;
///
/// impl CompilerObserver for Printer {
///     fn compiled(&self, id: &str, duration: Duration) {
///         println!("compiled {} in {:?}", id, duration);
///     }
/// }
///
/// let mut builder = ContainerBuilder::new(ClassRegistry::new());
/// builder.add_observer(Arc::new(Printer));
/// builder.set_parameter("debug", true);
/// builder.compile()?;
/// # Ok::<(), viserio_container::ContainerError>(())
/// ```
pub trait CompilerObserver: Send + Sync {
    /// A definition is about to be compiled.
    fn compiling(&self, _id: &str) {}

    fn compiled(&self, _id: &str, _duration: Duration) {}

    /// Compiling `id` failed; compilation continues with the next definition.
    fn compile_failed(&self, _id: &str, _error: &ContainerError) {}

    /// A compiled container starts building `id`.
    fn resolving(&self, _id: &str) {}

    fn resolved(&self, _id: &str, _duration: Duration) {}
}

/// Fan-out over registered observers.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn CompilerObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn CompilerObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn compiling(&self, id: &str) {
        for observer in &self.observers {
            observer.compiling(id);
        }
    }

    pub(crate) fn compiled(&self, id: &str, duration: Duration) {
        for observer in &self.observers {
            observer.compiled(id, duration);
        }
    }

    pub(crate) fn compile_failed(&self, id: &str, error: &ContainerError) {
        for observer in &self.observers {
            observer.compile_failed(id, error);
        }
    }

    pub(crate) fn resolving(&self, id: &str) {
        for observer in &self.observers {
            observer.resolving(id);
        }
    }

    pub(crate) fn resolved(&self, id: &str, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(id, duration);
        }
    }
}

/// Forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl CompilerObserver for TracingObserver {
    fn compiling(&self, id: &str) {
        debug!(service = id, "compiling definition");
    }

    fn compiled(&self, id: &str, duration: Duration) {
        debug!(service = id, ?duration, "compiled definition");
    }

    fn compile_failed(&self, id: &str, error: &ContainerError) {
        warn!(service = id, %error, "definition failed to compile");
    }

    fn resolving(&self, id: &str) {
        debug!(service = id, "resolving service");
    }

    fn resolved(&self, id: &str, duration: Duration) {
        debug!(service = id, ?duration, "resolved service");
    }
}

/// Counts events, mostly useful in tests and benchmarks.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    compiled: AtomicU64,
    failed: AtomicU64,
    resolved: AtomicU64,
    resolution_nanos: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compiled_count(&self) -> u64 {
        self.compiled.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn resolution_count(&self) -> u64 {
        self.resolved.load(Ordering::Relaxed)
    }

    pub fn total_resolution_time(&self) -> Duration {
        Duration::from_nanos(self.resolution_nanos.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.compiled.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.resolved.store(0, Ordering::Relaxed);
        self.resolution_nanos.store(0, Ordering::Relaxed);
    }
}

impl CompilerObserver for MetricsObserver {
    fn compiled(&self, _id: &str, _duration: Duration) {
        self.compiled.fetch_add(1, Ordering::Relaxed);
    }

    fn compile_failed(&self, _id: &str, _error: &ContainerError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn resolved(&self, _id: &str, duration: Duration) {
        self.resolved.fetch_add(1, Ordering::Relaxed);
        self.resolution_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }
}
