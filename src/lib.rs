//! # viserio-container
//!
//! Dependency injection container compiler.
//!
//! Services are described by [`Definition`]s, compiled against explicit class
//! metadata ([`ClassRegistry`]) into a [`CompiledGraph`], and then either run
//! directly by a [`CompiledContainer`] or emitted as Rust source with one
//! accessor per service.
//!
//! ## Features
//!
//! - **Definition model**: arguments, method calls, properties, tags,
//!   decoration, deprecation and change tracking
//! - **Autowiring**: parameters resolved from registered metadata, by
//!   service, alias or class, with fresh construction for unregistered classes
//! - **Closure analysis**: closures located by line in a parsed source unit,
//!   with self references detected and magic constants rewritten
//! - **Code generation**: deterministic output, shared services built at most
//!   once per container, cycles reported instead of overflowing the stack
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use viserio_container::{
//!     reference, ClassMetadata, ClassRegistry, ContainerBuilder, Instance, ParameterDescriptor,
//!     ServiceLocator, Value,
//! };
//!
//! struct FileLogger { path: String }
//! struct App { logger: Arc<FileLogger> }
//!
//! static LOGGERS: AtomicUsize = AtomicUsize::new(0);
//!
//! let mut registry = ClassRegistry::new();
//! registry
//!     .register_class(ClassMetadata::new("FileLogger").constructor(
//!         vec![ParameterDescriptor::typed("path", "string")],
//!         |_, args| {
//!             LOGGERS.fetch_add(1, Ordering::SeqCst);
//!             let path = args[0].as_str().unwrap_or_default().to_string();
//!             Ok(Value::Object(Instance::new("FileLogger", FileLogger { path })))
//!         },
//!     ))
//!     .register_class(ClassMetadata::new("App").constructor(
//!         vec![ParameterDescriptor::typed("logger", "FileLogger")],
//!         |_, args| {
//!             let logger = args[0].downcast::<FileLogger>().unwrap();
//!             Ok(Value::Object(Instance::new("App", App { logger })))
//!         },
//!     ));
//!
//! let mut builder = ContainerBuilder::new(registry);
//! builder.bind("logger", "FileLogger").add_argument("/tmp/log");
//! builder.bind("service", "App").add_argument(reference("logger"));
//!
//! let container = builder.build()?;
//! let first = container.get_typed::<App>("service")?;
//! let second = container.get_typed::<App>("service")?;
//!
//! assert!(Arc::ptr_eq(&first.logger, &second.logger));
//! assert_eq!(first.logger.path, "/tmp/log");
//! assert_eq!(LOGGERS.load(Ordering::SeqCst), 1);
//! assert!(container.has("logger"));
//!
//! // The same graph as Rust source
//! let source = builder.dump()?;
//! assert!(source.contains("fn get_logger(&self)"));
//! # Ok::<(), viserio_container::ContainerError>(())
//! ```
//!
//! ## Binding types
//!
//! - **Singleton**: built on first access and cached
//! - **Plain**: cached like a singleton; meant for eagerly shared values
//! - **Transient**: built on every access

pub mod ast;
pub mod compiler;
pub mod config;
pub mod container;
pub mod definition;
pub mod error;
pub mod observer;
pub mod reflection;
pub mod value;

pub use compiler::{CompiledGraph, CompiledServiceEntry, Compiler, Emitter};
pub use config::CompilerConfig;
pub use container::{downcast_service, CompiledContainer, ContainerBuilder, ServiceLocator, ServiceRuntime};
pub use definition::{BindingType, Change, Definition, DefinitionKind, FactoryTarget};
pub use error::{ContainerError, ContainerResult, OutOfBounds};
pub use observer::{CompilerObserver, MetricsObserver, TracingObserver};
pub use reflection::{
    ClassMetadata, ClassRegistry, ClosureReference, FunctionMetadata, ParameterDescriptor,
};
pub use value::{reference, Argument, ArgumentKey, Instance, Reference, ReferenceBehavior, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_compiles() {
        let builder = ContainerBuilder::new(ClassRegistry::new());
        let graph = builder.compile().unwrap();

        assert!(graph.is_empty());
        assert!(graph.service_ids().is_empty());
    }

    #[test]
    fn test_unknown_service() {
        let container = ContainerBuilder::new(ClassRegistry::new()).build().unwrap();

        assert!(!container.has("missing"));
        assert_eq!(
            container.get("missing").unwrap_err(),
            ContainerError::NotFound("missing".into())
        );
        assert_eq!(
            container.parameter("missing").unwrap_err(),
            ContainerError::NotFound("missing".into())
        );
    }
}
