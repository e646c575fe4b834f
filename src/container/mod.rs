//! Registration API and runtime containers.
//!
//! [`ContainerBuilder`] collects definitions and compiles them.
//! The resulting graph runs either through [`CompiledContainer`], which
//! interprets it directly, or through source produced by the
//! [`Emitter`](crate::compiler::Emitter); both build services with a
//! [`ServiceRuntime`].

mod builder;
mod compiled;
mod loading;
mod runtime;

pub use builder::ContainerBuilder;
pub use compiled::CompiledContainer;
pub use runtime::ServiceRuntime;

use std::any::Any;
use std::sync::Arc;

use crate::error::{ContainerError, ContainerResult};
use crate::value::Value;

/// Read access to a container, as seen by invokers and generated code.
pub trait ServiceLocator: Send + Sync {
    fn get(&self, id: &str) -> ContainerResult<Value>;

    fn has(&self, id: &str) -> bool;

    fn parameter(&self, name: &str) -> ContainerResult<Value>;

    /// Fetches `id` and downcasts it to `T`.
    fn get_typed<T: Any + Send + Sync>(&self, id: &str) -> ContainerResult<Arc<T>>
    where
        Self: Sized,
    {
        downcast_service(id, self.get(id)?)
    }
}

/// Downcasts a service value, reporting the actual type on mismatch.
pub fn downcast_service<T: Any + Send + Sync>(id: &str, value: Value) -> ContainerResult<Arc<T>> {
    value.downcast::<T>().ok_or_else(|| {
        ContainerError::Runtime(format!(
            "Service [{}] is a [{}], not a [{}].",
            id,
            value.type_name(),
            std::any::type_name::<T>()
        ))
    })
}
