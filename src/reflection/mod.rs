//! Parameter metadata and autowiring.
//!
//! There is no runtime introspection: classes, methods and functions are
//! described once in a [`ClassRegistry`] (explicit metadata tables carrying
//! parameter descriptors and invokers). The [`ReflectionResolver`] reads
//! those tables, caches one [`Signature`] per callable and turns parameters
//! into [`ParameterBinding`]s.

mod registry;
mod resolver;

pub use registry::{
    ClassMetadata, ClassRegistry, ConstructorMetadata, FunctionMetadata, MethodInvoker,
    MethodMetadata, PropertyMetadata, PropertySetter,
};
pub use resolver::{
    ParameterBinding, ReflectionResolver, ResolveMode, ResolvedCall, ServiceLookup, ServiceMatch,
};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::container::ServiceLocator;
use crate::error::ContainerResult;
use crate::value::Value;

/// Native callable used to build services, run factories and closures.
///
/// Parameters bound to the container are not part of the value list; the
/// container is always available through the first argument.
pub type Invoker = Arc<dyn Fn(&dyn ServiceLocator, Vec<Value>) -> ContainerResult<Value> + Send + Sync>;

/// Type names that always bind to the container itself.
pub const CONTAINER_TYPES: &[&str] = &[
    "ContainerInterface",
    "ServiceLocator",
    "Psr::Container::ContainerInterface",
    "Viserio::Contract::Container::CompiledContainer",
];

const BUILTIN_TYPES: &[&str] = &[
    "array", "bool", "callable", "false", "float", "int", "iterable", "mixed", "null", "object",
    "self", "static", "string", "void",
];

/// Returns true for scalar and pseudo types that are never autowired.
pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name.trim_start_matches('?').to_ascii_lowercase().as_str())
}

/// Returns true for types that resolve to the container.
pub fn is_container_type(name: &str) -> bool {
    let name = name.trim_start_matches('?');
    CONTAINER_TYPES.iter().any(|candidate| {
        *candidate == name || candidate.rsplit("::").next() == Some(name)
    })
}

/// One formal parameter of a constructor, method, function or closure.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub declared_type: Option<String>,
    pub nullable: bool,
    pub is_optional: bool,
    pub default_value: Option<Value>,
}

impl ParameterDescriptor {
    /// Required, untyped parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            nullable: false,
            is_optional: false,
            default_value: None,
        }
    }

    /// Required parameter with a declared type; a leading `?` marks it nullable.
    pub fn typed(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        let nullable = declared_type.starts_with('?');
        Self {
            name: name.into(),
            declared_type: Some(declared_type.trim_start_matches('?').to_string()),
            nullable,
            is_optional: false,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            self.nullable = true;
        }
        self.default_value = Some(value);
        self.is_optional = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn has_default_value(&self) -> bool {
        self.default_value.is_some()
    }

    /// Declared type when it names a class rather than a scalar.
    pub fn class_type(&self) -> Option<&str> {
        self.declared_type
            .as_deref()
            .filter(|declared| !is_builtin_type(declared))
    }
}

/// Identity of a callable, used as the signature cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallableId {
    Constructor(String),
    Method(String, String),
    Function(String),
    Closure(PathBuf, u32),
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallableId::Constructor(class) => write!(f, "{}::new", class),
            CallableId::Method(class, method) => write!(f, "{}::{}", class, method),
            CallableId::Function(name) => write!(f, "{}", name),
            CallableId::Closure(file, line) => write!(f, "{{closure}}@{}:{}", file.display(), line),
        }
    }
}

/// Ordered parameters of one callable.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub id: CallableId,
    pub parameters: Vec<ParameterDescriptor>,
    pub return_type: Option<String>,
}

impl Signature {
    pub fn new(id: CallableId, parameters: Vec<ParameterDescriptor>, return_type: Option<String>) -> Self {
        Self {
            id,
            parameters,
            return_type,
        }
    }

    pub fn required_count(&self) -> usize {
        self.parameters.iter().filter(|parameter| !parameter.is_optional).count()
    }
}

/// A closure registered as a factory, with where it was declared.
///
/// `file` and `line` are what the closure analysis uses to find the closure
/// in its parsed source unit.
#[derive(Clone)]
pub struct ClosureReference {
    pub file: PathBuf,
    pub line: u32,
    pub parameters: Vec<ParameterDescriptor>,
    pub return_type: Option<String>,
    /// Class the closure is bound to, if any.
    pub scope_class: Option<String>,
    pub invoker: Invoker,
}

impl ClosureReference {
    pub fn new<F>(file: impl Into<PathBuf>, line: u32, parameters: Vec<ParameterDescriptor>, invoker: F) -> Self
    where
        F: Fn(&dyn ServiceLocator, Vec<Value>) -> ContainerResult<Value> + Send + Sync + 'static,
    {
        Self {
            file: file.into(),
            line,
            parameters,
            return_type: None,
            scope_class: None,
            invoker: Arc::new(invoker),
        }
    }

    pub fn returns(mut self, class: impl Into<String>) -> Self {
        self.return_type = Some(class.into());
        self
    }

    pub fn bound_to(mut self, class: impl Into<String>) -> Self {
        self.scope_class = Some(class.into());
        self
    }

    pub fn callable_id(&self) -> CallableId {
        CallableId::Closure(self.file.clone(), self.line)
    }
}

impl fmt::Debug for ClosureReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureReference")
            .field("file", &self.file)
            .field("line", &self.line)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .field("scope_class", &self.scope_class)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        assert!(is_builtin_type("string"));
        assert!(is_builtin_type("?int"));
        assert!(!is_builtin_type("FileLogger"));
    }

    #[test]
    fn test_container_types_match_short_names() {
        assert!(is_container_type("ContainerInterface"));
        assert!(is_container_type("Psr::Container::ContainerInterface"));
        assert!(is_container_type("?ServiceLocator"));
        assert!(!is_container_type("Logger"));
    }

    #[test]
    fn test_typed_nullable_descriptor() {
        let parameter = ParameterDescriptor::typed("logger", "?Logger");
        assert_eq!(parameter.declared_type.as_deref(), Some("Logger"));
        assert!(parameter.nullable);
        assert!(!parameter.has_default_value());

        let parameter = ParameterDescriptor::new("level").with_default(3);
        assert!(parameter.is_optional);
        assert_eq!(parameter.default_value, Some(Value::Int(3)));
        assert_eq!(parameter.class_type(), None);
    }
}
