//! Runs a compiled graph without generating source.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::runtime::ServiceRuntime;
use super::{downcast_service, ServiceLocator};
use crate::compiler::{CallTarget, CompiledGraph, CompiledServiceEntry, Expr};
use crate::error::{ContainerError, ContainerResult};
use crate::observer::Observers;
use crate::reflection::ClassRegistry;
use crate::value::Value;

/// A container executing a [`CompiledGraph`].
///
/// Behaves like the generated source would: shared services are built once
/// per container, everything else on every request.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use viserio_container::{
///     reference, ClassMetadata, ClassRegistry, ContainerBuilder, Instance, ParameterDescriptor, Value,
/// };
///
/// struct Clock;
/// struct Scheduler { clock: Arc<Clock> }
///
/// let mut registry = ClassRegistry::new();
/// registry
///     .register_class(ClassMetadata::new("Clock").constructor(vec![], |_, _| {
///         Ok(Value::Object(Instance::new("Clock", Clock)))
///     }))
///     .register_class(ClassMetadata::new("Scheduler").constructor(
///         vec![ParameterDescriptor::typed("clock", "Clock")],
///         |_, args| {
///             let clock = args[0].downcast::<Clock>().unwrap();
///             Ok(Value::Object(Instance::new("Scheduler", Scheduler { clock })))
///         },
///     ));
///
/// let mut builder = ContainerBuilder::new(registry);
/// builder.bind("clock", "Clock");
/// builder.bind("scheduler", "Scheduler").add_argument(reference("clock"));
///
/// let container = builder.build()?;
/// let scheduler = container.get_typed::<Scheduler>("scheduler")?;
/// let clock = container.get_typed::<Clock>("clock")?;
/// assert!(Arc::ptr_eq(&scheduler.clock, &clock));
/// # Ok::<(), viserio_container::ContainerError>(())
/// ```
pub struct CompiledContainer {
    graph: CompiledGraph,
    runtime: ServiceRuntime,
    observers: Observers,
}

impl CompiledContainer {
    pub fn new(graph: CompiledGraph, registry: Arc<ClassRegistry>) -> Self {
        let closures = graph
            .closures()
            .iter()
            .map(|(id, invoker)| (id.clone(), invoker.clone()));
        let runtime = ServiceRuntime::new(registry).with_closures(closures);

        Self {
            graph,
            runtime,
            observers: Observers::new(),
        }
    }

    pub(crate) fn with_observers(mut self, observers: Observers) -> Self {
        self.observers = observers;
        self
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    pub fn runtime(&self) -> &ServiceRuntime {
        &self.runtime
    }

    /// True once a shared service has been built and cached.
    pub fn initialized(&self, id: &str) -> bool {
        self.graph
            .resolve_id(id)
            .map_or(false, |id| self.runtime.initialized(id))
    }

    /// Builds every shared service that is not lazy; returns how many.
    pub fn warm_up(&self) -> ContainerResult<usize> {
        let mut built = 0;
        for entry in self.graph.entries().filter(|entry| entry.shared && !entry.lazy) {
            if !self.runtime.initialized(&entry.service_id) {
                self.resolve(entry)?;
                built += 1;
            }
        }

        debug!(built, "warmed up container");
        Ok(built)
    }

    /// Forgets every cached instance.
    pub fn reset(&self) {
        self.runtime.reset();
    }

    pub fn get_typed<T: Any + Send + Sync>(&self, id: &str) -> ContainerResult<Arc<T>> {
        downcast_service(id, self.get(id)?)
    }

    fn resolve(&self, entry: &CompiledServiceEntry) -> ContainerResult<Value> {
        let id = entry.service_id.as_str();
        if let Some(message) = &entry.deprecation {
            self.runtime.deprecated(id, message);
        }

        self.observers.resolving(id);
        let started = Instant::now();
        let build = || self.build(entry);
        let value = if entry.shared {
            self.runtime.shared(id, build)?
        } else {
            self.runtime.transient(id, build)?
        };
        self.observers.resolved(id, started.elapsed());

        Ok(value)
    }

    fn build(&self, entry: &CompiledServiceEntry) -> ContainerResult<Value> {
        let mut instance = self.eval(&entry.construct)?;

        for call in &entry.method_calls {
            let args = self.eval_all(&call.args)?;
            let result = self
                .runtime
                .call_method(&call.class, &call.method, self, &instance, args)?;
            if call.returns_clone {
                instance = result;
            }
        }

        for property in &entry.properties {
            let value = self.eval(&property.value)?;
            let receiver = if property.is_static { None } else { Some(&instance) };
            self.runtime
                .set_property(&property.class, &property.name, receiver, value)?;
        }

        Ok(instance)
    }

    fn eval_all(&self, exprs: &[Expr]) -> ContainerResult<Vec<Value>> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    fn eval(&self, expr: &Expr) -> ContainerResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::List(items) => Ok(Value::List(self.eval_all(items)?)),
            Expr::Service(id) => self.get(id),
            Expr::Parameter(name) => self.parameter(name),
            Expr::New { class, args, .. } => {
                let args = self.eval_all(args)?;
                self.runtime.construct(class, self, args)
            }
            Expr::Invoke { target, args, .. } => {
                let args = self.eval_all(args)?;
                match target {
                    CallTarget::StaticMethod { class, method } => {
                        self.runtime.call_static(class, method, self, args)
                    }
                    CallTarget::ServiceMethod { id, class, method } => {
                        let receiver = self.get(id)?;
                        self.runtime.call_method(class, method, self, &receiver, args)
                    }
                    CallTarget::Function(name) => self.runtime.call_function(name, self, args),
                    CallTarget::Closure(id) => self.runtime.call_closure(id, self, args),
                }
            }
            Expr::Closure(id) => self.runtime.closure_value(id),
        }
    }
}

impl ServiceLocator for CompiledContainer {
    fn get(&self, id: &str) -> ContainerResult<Value> {
        let entry = self
            .graph
            .entry(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        self.resolve(entry)
    }

    fn has(&self, id: &str) -> bool {
        self.graph.has(id)
    }

    fn parameter(&self, name: &str) -> ContainerResult<Value> {
        self.graph
            .parameter(name)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }
}

impl std::fmt::Debug for CompiledContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledContainer")
            .field("services", &self.graph.service_ids())
            .field("runtime", &self.runtime)
            .finish()
    }
}
