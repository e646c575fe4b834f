//! Error types for the container compiler.

use std::fmt;
use std::path::PathBuf;

/// Why an index or key lookup on a definition failed.
///
/// The variants mirror the order in which `replace_argument` validates its
/// input: an empty list is reported first, then a numeric index outside the
/// configured range, then a key that simply is not present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutOfBounds {
    /// No arguments have been configured on the definition yet
    NoneConfigured { key: String },
    /// Numeric index outside `[0, max]`
    OutOfRange { index: i64, max: usize },
    /// Key not present
    Missing { key: String },
}

impl fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutOfBounds::NoneConfigured { key } => write!(
                f,
                "Cannot replace argument [{}] if none have been configured yet.",
                key
            ),
            OutOfBounds::OutOfRange { index, max } => {
                write!(f, "The index [{}] is not in the range [0, {}].", index, max)
            }
            OutOfBounds::Missing { key } => write!(f, "The argument [{}] doesn't exist.", key),
        }
    }
}

/// Container compiler errors
///
/// Configuration errors are raised by the definition setters, resolution
/// errors by the reflection resolver and closure analysis, and compilation
/// errors by the compiler, which reports everything it found in one pass.
///
/// # Examples
///
/// ```rust
/// use viserio_container::{ContainerError, Definition};
///
/// let mut definition = Definition::object("logger", "FileLogger");
/// match definition.add_method_call("", Vec::new(), false) {
///     Err(ContainerError::InvalidArgument(message)) => {
///         assert_eq!(message, "Method name cannot be empty.");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerError {
    /// Index or key outside what a definition holds
    OutOfBounds(OutOfBounds),
    /// Invalid value passed to a definition setter
    InvalidArgument(String),
    /// Generic runtime failure with a message
    Runtime(String),
    /// Two closures declared on the same line of the same file
    AmbiguousClosure { file: PathBuf, line: u32 },
    /// Parameter that can be neither autowired nor defaulted
    UnresolvableParameter { parameter: String, class: String },
    /// Service id or parameter not registered
    NotFound(String),
    /// Class or function without registered metadata
    UnknownClass(String),
    /// Re-entrant construction or alias cycle (includes path)
    Circular(Vec<String>),
    /// Decorators forming a loop
    DecorationCycle(Vec<String>),
    /// Service-scoped failure, wraps the cause with the offending id
    Service { id: String, source: Box<ContainerError> },
    /// Every error found during one compilation pass
    Compilation(Vec<ContainerError>),
}

impl ContainerError {
    /// Attaches the offending service id to an error.
    pub fn for_service(id: impl Into<String>, error: ContainerError) -> Self {
        match error {
            already @ ContainerError::Service { .. } => already,
            other => ContainerError::Service {
                id: id.into(),
                source: Box::new(other),
            },
        }
    }

    /// Number of leaf errors carried by this error.
    pub fn count(&self) -> usize {
        match self {
            ContainerError::Compilation(errors) => errors.iter().map(ContainerError::count).sum(),
            _ => 1,
        }
    }
}

impl From<OutOfBounds> for ContainerError {
    fn from(error: OutOfBounds) -> Self {
        ContainerError::OutOfBounds(error)
    }
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::OutOfBounds(error) => write!(f, "{}", error),
            ContainerError::InvalidArgument(message) => write!(f, "{}", message),
            ContainerError::Runtime(message) => write!(f, "{}", message),
            ContainerError::AmbiguousClosure { file, line } => write!(
                f,
                "Two closures were declared on line [{}] of file [{}]; unable to determine which one to analyse.",
                line,
                file.display()
            ),
            ContainerError::UnresolvableParameter { parameter, class } => write!(
                f,
                "Unresolvable dependency resolving [${}] in [{}]: the parameter has no type, no default value and is not autowirable.",
                parameter, class
            ),
            ContainerError::NotFound(id) => write!(f, "Service not found: {}", id),
            ContainerError::UnknownClass(name) => write!(f, "No metadata registered for [{}]", name),
            ContainerError::Circular(path) => {
                write!(f, "Circular dependency: {}", path.join(" -> "))
            }
            ContainerError::DecorationCycle(path) => {
                write!(f, "Decoration cycle: {}", path.join(" -> "))
            }
            ContainerError::Service { id, source } => write!(f, "[{}] {}", id, source),
            ContainerError::Compilation(errors) => {
                write!(f, "Container compilation failed with {} error(s)", errors.len())?;
                for error in errors {
                    write!(f, "\n  - {}", error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContainerError::Service { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type for container operations
pub type ContainerResult<T> = Result<T, ContainerError>;
