//! Runtime values and definition-time arguments.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A constructed object handed out by the container.
///
/// Instances are reference counted; cloning an `Instance` never clones the
/// underlying object, so [`Instance::ptr_eq`] can be used to check identity.
#[derive(Clone)]
pub struct Instance {
    class: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Wraps an object under the given class name.
    pub fn new<T: Any + Send + Sync>(class: impl Into<Arc<str>>, object: T) -> Self {
        Self {
            class: class.into(),
            inner: Arc::new(object),
        }
    }

    /// Wraps an already shared object.
    pub fn from_arc(class: impl Into<Arc<str>>, inner: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            class: class.into(),
            inner,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// True when both handles point to the same object.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.class)
    }
}

/// Runtime value produced by the container.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(Instance),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Downcasts an object value to its concrete type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.as_instance().and_then(Instance::downcast::<T>)
    }

    /// Name used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(instance) => instance.class(),
        }
    }

    /// Identity for objects, structural equality for everything else.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|((ka, va), (kb, vb))| ka == kb && va.same(vb))
            }
            _ => self == other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Object(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

/// What happens when a referenced service is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum ReferenceBehavior {
    /// Resolution fails with `NotFound`
    #[default]
    Exception,
    /// `Value::Null` is injected instead
    Null,
}

/// Reference to another service by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: String,
    pub behavior: ReferenceBehavior,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            behavior: ReferenceBehavior::Exception,
        }
    }

    pub fn nullable(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            behavior: ReferenceBehavior::Null,
        }
    }
}

/// Shorthand for [`Reference::new`] wrapped as an argument.
pub fn reference(id: impl Into<String>) -> Argument {
    Argument::Reference(Reference::new(id))
}

/// Definition-time argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Literal value
    Value(Value),
    /// Another service
    Reference(Reference),
    /// Every service carrying the tag
    Tagged(String),
    /// Container parameter by name
    Parameter(String),
    /// Nested list of arguments
    List(Vec<Argument>),
}

impl Argument {
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            Argument::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}

macro_rules! literal_argument {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Argument {
                fn from(value: $ty) -> Self {
                    Argument::Value(Value::from(value))
                }
            }
        )*
    };
}

literal_argument!(bool, i64, i32, f64, &str, String);

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

impl From<Reference> for Argument {
    fn from(reference: Reference) -> Self {
        Argument::Reference(reference)
    }
}

/// Position or name of an argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArgumentKey {
    Index(i64),
    Named(String),
}

impl ArgumentKey {
    pub fn index(&self) -> Option<i64> {
        match self {
            ArgumentKey::Index(index) => Some(*index),
            ArgumentKey::Named(_) => None,
        }
    }
}

impl fmt::Display for ArgumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentKey::Index(index) => write!(f, "{}", index),
            ArgumentKey::Named(name) => write!(f, "${}", name),
        }
    }
}

impl From<i64> for ArgumentKey {
    fn from(index: i64) -> Self {
        ArgumentKey::Index(index)
    }
}

impl From<i32> for ArgumentKey {
    fn from(index: i32) -> Self {
        ArgumentKey::Index(index as i64)
    }
}

impl From<usize> for ArgumentKey {
    fn from(index: usize) -> Self {
        ArgumentKey::Index(index as i64)
    }
}

impl From<&str> for ArgumentKey {
    fn from(name: &str) -> Self {
        ArgumentKey::Named(name.trim_start_matches('$').to_string())
    }
}

impl From<String> for ArgumentKey {
    fn from(name: String) -> Self {
        ArgumentKey::from(name.as_str())
    }
}
