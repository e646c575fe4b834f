//! Instance cache and invocation helpers shared by compiled containers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use super::loading::LoadingStack;
use super::ServiceLocator;
use crate::compiler::CLOSURE_CLASS;
use crate::error::{ContainerError, ContainerResult};
use crate::reflection::{ClassRegistry, Invoker};
use crate::value::{Instance, Value};

/// Finished instances plus the shared builds still in progress.
#[derive(Default)]
struct SharedState {
    instances: HashMap<String, Value>,
    /// Id being built, and the thread building it
    building: HashMap<String, ThreadId>,
    /// Thread blocked on another thread's build of an id
    waiting: HashMap<ThreadId, String>,
}

impl SharedState {
    /// Follows the owners of the builds `id` depends on. Returns the path
    /// when the chain leads back to a build owned by `me`.
    fn wait_cycle(&self, id: &str, me: ThreadId, mut path: Vec<String>) -> Option<Vec<String>> {
        let mut owner = *self.building.get(id)?;
        for _ in 0..=self.waiting.len() {
            let next = self.waiting.get(&owner)?;
            path.push(next.clone());
            owner = *self.building.get(next)?;
            if owner == me {
                return Some(path);
            }
        }
        None
    }
}

/// Builds and caches services for one container instance.
///
/// Shared services are built at most once: concurrent first requests for
/// the same id wait for the one build in progress. A request that would
/// close a dependency cycle fails with [`ContainerError::Circular`], whether
/// the cycle stays on one thread or runs through builds owned by others.
pub struct ServiceRuntime {
    registry: Arc<ClassRegistry>,
    closures: HashMap<String, Invoker>,
    shared: Mutex<SharedState>,
    built: Condvar,
    loading: LoadingStack,
}

/// Releases an in-progress build and wakes the waiting threads.
struct BuildGuard<'a> {
    runtime: &'a ServiceRuntime,
    id: &'a str,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.runtime.shared.lock().building.remove(self.id);
        self.runtime.built.notify_all();
    }
}

impl ServiceRuntime {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self {
            registry,
            closures: HashMap::new(),
            shared: Mutex::new(SharedState::default()),
            built: Condvar::new(),
            loading: LoadingStack::default(),
        }
    }

    /// Closure invokers by service id.
    pub fn with_closures(mut self, closures: impl IntoIterator<Item = (String, Invoker)>) -> Self {
        self.closures.extend(closures);
        self
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Returns the cached instance of `id`, building it with `build` first.
    ///
    /// A failed build is not cached; the next request builds again.
    pub fn shared<F>(&self, id: &str, build: F) -> ContainerResult<Value>
    where
        F: FnOnce() -> ContainerResult<Value>,
    {
        if let Some(value) = self.shared.lock().instances.get(id) {
            return Ok(value.clone());
        }

        let _loading = self.loading.enter(id)?;
        let me = thread::current().id();
        {
            let mut state = self.shared.lock();
            loop {
                if let Some(value) = state.instances.get(id) {
                    return Ok(value.clone());
                }
                if !state.building.contains_key(id) {
                    state.building.insert(id.to_string(), me);
                    break;
                }
                if let Some(path) = state.wait_cycle(id, me, self.loading.current()) {
                    debug!(service = id, ?path, "cross-thread dependency cycle");
                    return Err(ContainerError::Circular(path));
                }

                state.waiting.insert(me, id.to_string());
                self.built.wait(&mut state);
                state.waiting.remove(&me);
            }
        }

        let _building = BuildGuard { runtime: self, id };
        let value = build()?;
        self.shared.lock().instances.insert(id.to_string(), value.clone());
        Ok(value)
    }

    /// Builds a fresh instance of `id`.
    pub fn transient<F>(&self, id: &str, build: F) -> ContainerResult<Value>
    where
        F: FnOnce() -> ContainerResult<Value>,
    {
        let _guard = self.loading.enter(id)?;
        build()
    }

    pub fn initialized(&self, id: &str) -> bool {
        self.shared.lock().instances.contains_key(id)
    }

    /// Drops every cached instance.
    pub fn reset(&self) {
        self.shared.lock().instances.clear();
    }

    pub fn construct(&self, class: &str, locator: &dyn ServiceLocator, args: Vec<Value>) -> ContainerResult<Value> {
        let constructor = self
            .registry
            .class(class)?
            .get_constructor()
            .ok_or_else(|| ContainerError::Runtime(format!("Class [{}] has no constructor.", class)))?;
        (constructor.invoker)(locator, args)
    }

    pub fn call_static(
        &self,
        class: &str,
        method: &str,
        locator: &dyn ServiceLocator,
        args: Vec<Value>,
    ) -> ContainerResult<Value> {
        let metadata = self.registry.method(class, method)?;
        (metadata.invoker)(locator, None, args)
    }

    /// Calls `method` on `receiver`; static methods get no receiver.
    pub fn call_method(
        &self,
        class: &str,
        method: &str,
        locator: &dyn ServiceLocator,
        receiver: &Value,
        args: Vec<Value>,
    ) -> ContainerResult<Value> {
        let metadata = self.registry.method(class, method)?;
        let receiver = if metadata.is_static { None } else { Some(receiver) };
        (metadata.invoker)(locator, receiver, args)
    }

    pub fn call_function(&self, name: &str, locator: &dyn ServiceLocator, args: Vec<Value>) -> ContainerResult<Value> {
        let function = self.registry.function(name)?;
        (function.invoker)(locator, args)
    }

    pub fn call_closure(&self, id: &str, locator: &dyn ServiceLocator, args: Vec<Value>) -> ContainerResult<Value> {
        let invoker = self
            .closures
            .get(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        invoker(locator, args)
    }

    /// The closure registered for `id` as a value; downcast it to
    /// [`Invoker`] to call it.
    pub fn closure_value(&self, id: &str) -> ContainerResult<Value> {
        let invoker = self
            .closures
            .get(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        Ok(Value::Object(Instance::new(CLOSURE_CLASS, invoker.clone())))
    }

    pub fn set_property(
        &self,
        class: &str,
        name: &str,
        receiver: Option<&Value>,
        value: Value,
    ) -> ContainerResult<()> {
        let property = self.registry.property(class, name)?;
        (property.setter)(receiver, value)
    }

    pub fn deprecated(&self, id: &str, message: &str) {
        warn!(service = id, "{}", message);
    }
}

impl fmt::Debug for ServiceRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut initialized: Vec<String> = self.shared.lock().instances.keys().cloned().collect();
        initialized.sort();

        f.debug_struct("ServiceRuntime")
            .field("registry", &self.registry)
            .field("closures", &self.closures.len())
            .field("initialized", &initialized)
            .finish()
    }
}
