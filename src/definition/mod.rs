//! Service definitions: the mutable description of how to build a service.
//!
//! A [`Definition`] is composed of small capability structs, one per concern
//! (arguments, method calls, properties, decoration, deprecation, change
//! tracking). Every setter records a [`Change`] so the compiler can tell an
//! explicitly configured value from a default.

mod arguments;
mod changes;
mod decorator;
mod deprecation;
mod method_calls;
mod properties;

pub use arguments::Arguments;
pub use changes::{Change, Changes};
pub use decorator::DecoratorLink;
pub use deprecation::{Deprecation, DEFAULT_DEPRECATION_TEMPLATE};
pub use method_calls::{MethodCall, MethodCalls};
pub use properties::{Properties, Property};

use std::collections::BTreeMap;

use crate::error::ContainerResult;
use crate::reflection::ClosureReference;
use crate::value::{Argument, ArgumentKey, Value};

/// How instances of a definition are cached by the generated container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub enum BindingType {
    /// Built once on first access and cached
    Singleton,
    /// Plain value or eagerly shared service, cached
    Plain,
    /// Built fresh on every access
    Transient,
}

/// What a factory definition calls to build the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryTarget {
    /// `Class::method(...)`
    Static { class: String, method: String },
    /// `container.get(id).method(...)`
    Service { id: String, method: String },
    /// Free function
    Function(String),
}

/// Closure-based factory.
#[derive(Debug, Clone)]
pub struct ClosureFactory {
    pub reference: ClosureReference,
    /// Invoke the closure to obtain the service; otherwise the closure is the service.
    pub executable: bool,
}

/// The kind of binding a definition describes.
#[derive(Debug, Clone)]
pub enum DefinitionKind {
    Object { class: String },
    Factory { target: FactoryTarget, return_type: Option<String> },
    Closure(ClosureFactory),
    Alias { target: String },
    Parameter(Value),
}

/// Tag name to tag attributes.
pub type Tags = BTreeMap<String, BTreeMap<String, Value>>;

/// Description of one bindable service.
///
/// # Examples
///
/// ```rust
/// use viserio_container::{reference, Definition};
///
/// let mut definition = Definition::object("mailer", "Mailer");
/// definition
///     .add_argument(reference("transport"))
///     .set_argument("sender", "noreply@example.com");
/// definition.add_method_call("setLogger", vec![reference("logger")], false)?;
/// definition.decorate("mailer.base", Some("mailer.inner"), 5)?;
///
/// assert_eq!(definition.get_method_calls().len(), 1);
/// assert_eq!(
///     definition.get_decorator().map(|link| link.as_tuple()),
///     Some(("mailer.base", Some("mailer.inner"), 5))
/// );
/// # Ok::<(), viserio_container::ContainerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Definition {
    name: String,
    kind: DefinitionKind,
    binding: BindingType,
    arguments: Arguments,
    method_calls: MethodCalls,
    properties: Properties,
    tags: Tags,
    autowired: bool,
    lazy: bool,
    deprecation: Deprecation,
    decorator: Option<DecoratorLink>,
    changes: Changes,
}

impl Definition {
    pub fn new(name: impl Into<String>, kind: DefinitionKind) -> Self {
        let binding = match kind {
            DefinitionKind::Parameter(_) | DefinitionKind::Alias { .. } => BindingType::Plain,
            _ => BindingType::Singleton,
        };

        Self {
            name: name.into(),
            kind,
            binding,
            arguments: Arguments::new(),
            method_calls: MethodCalls::default(),
            properties: Properties::default(),
            tags: Tags::new(),
            autowired: false,
            lazy: false,
            deprecation: Deprecation::default(),
            decorator: None,
            changes: Changes::default(),
        }
    }

    pub fn object(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self::new(name, DefinitionKind::Object { class: class.into() })
    }

    pub fn factory(name: impl Into<String>, target: FactoryTarget) -> Self {
        Self::new(
            name,
            DefinitionKind::Factory {
                target,
                return_type: None,
            },
        )
    }

    pub fn closure(name: impl Into<String>, reference: ClosureReference, executable: bool) -> Self {
        Self::new(
            name,
            DefinitionKind::Closure(ClosureFactory {
                reference,
                executable,
            }),
        )
    }

    pub fn alias(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, DefinitionKind::Alias { target: target.into() })
    }

    pub fn parameter(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, DefinitionKind::Parameter(value.into()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DefinitionKind {
        &self.kind
    }

    /// Declared class of the built service, when known without metadata.
    pub fn class(&self) -> Option<&str> {
        match &self.kind {
            DefinitionKind::Object { class } => Some(class),
            DefinitionKind::Factory { return_type, .. } => return_type.as_deref(),
            DefinitionKind::Closure(closure) => closure.reference.return_type.as_deref(),
            DefinitionKind::Alias { .. } | DefinitionKind::Parameter(_) => None,
        }
    }

    /// Sets the class of an object, or the return type of a factory.
    pub fn set_class(&mut self, class: impl Into<String>) -> &mut Self {
        let class = class.into();
        match &mut self.kind {
            DefinitionKind::Object { class: current } => *current = class,
            DefinitionKind::Factory { return_type, .. } => *return_type = Some(class),
            DefinitionKind::Closure(closure) => closure.reference.return_type = Some(class),
            DefinitionKind::Alias { .. } | DefinitionKind::Parameter(_) => return self,
        }
        self.changes.mark(Change::Class);
        self
    }

    // ----- Arguments -----

    pub fn set_argument(&mut self, key: impl Into<ArgumentKey>, value: impl Into<Argument>) -> &mut Self {
        self.arguments.set(key.into(), value.into());
        self.changes.mark(Change::Arguments);
        self
    }

    pub fn add_argument(&mut self, value: impl Into<Argument>) -> &mut Self {
        self.arguments.add(value.into());
        self.changes.mark(Change::Arguments);
        self
    }

    pub fn get_argument(&self, key: impl Into<ArgumentKey>) -> ContainerResult<&Argument> {
        self.arguments.get(&key.into())
    }

    pub fn replace_argument(
        &mut self,
        key: impl Into<ArgumentKey>,
        value: impl Into<Argument>,
    ) -> ContainerResult<&mut Self> {
        self.arguments.replace(key.into(), value.into())?;
        self.changes.mark(Change::Arguments);
        Ok(self)
    }

    pub fn set_arguments(&mut self, arguments: Vec<Argument>) -> &mut Self {
        self.arguments = arguments.into_iter().collect();
        self.changes.mark(Change::Arguments);
        self
    }

    pub fn remove_argument(&mut self, key: impl Into<ArgumentKey>) -> Option<Argument> {
        let removed = self.arguments.remove(&key.into());
        if removed.is_some() {
            self.changes.mark(Change::Arguments);
        }
        removed
    }

    pub fn get_arguments(&self) -> &Arguments {
        &self.arguments
    }

    // ----- Method calls -----

    pub fn add_method_call(
        &mut self,
        method: impl Into<String>,
        arguments: Vec<Argument>,
        returns_clone: bool,
    ) -> ContainerResult<&mut Self> {
        self.method_calls.add(method, arguments, returns_clone)?;
        self.changes.mark(Change::MethodCalls);
        Ok(self)
    }

    pub fn remove_method_call(&mut self, method: &str) -> &mut Self {
        if self.method_calls.remove(method) {
            self.changes.mark(Change::MethodCalls);
        }
        self
    }

    pub fn has_method_call(&self, method: &str) -> bool {
        self.method_calls.contains(method)
    }

    pub fn set_method_calls(&mut self, calls: Vec<MethodCall>) -> ContainerResult<&mut Self> {
        self.method_calls.set(calls)?;
        self.changes.mark(Change::MethodCalls);
        Ok(self)
    }

    pub fn get_method_calls(&self) -> &[MethodCall] {
        self.method_calls.as_slice()
    }

    // ----- Properties -----

    pub fn set_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Argument>,
        is_static: bool,
    ) -> &mut Self {
        self.properties.set(name, value.into(), is_static);
        self.changes.mark(Change::Properties);
        self
    }

    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Property> {
        let removed = self.properties.remove(name);
        if removed.is_some() {
            self.changes.mark(Change::Properties);
        }
        removed
    }

    pub fn get_properties(&self) -> &Properties {
        &self.properties
    }

    // ----- Tags -----

    /// Adds a tag, merging attributes into an existing tag of the same name.
    pub fn add_tag(&mut self, name: impl Into<String>, attributes: BTreeMap<String, Value>) -> &mut Self {
        self.tags.entry(name.into()).or_default().extend(attributes);
        self.changes.mark(Change::Tags);
        self
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn get_tag(&self, name: &str) -> Option<&BTreeMap<String, Value>> {
        self.tags.get(name)
    }

    pub fn clear_tag(&mut self, name: &str) -> &mut Self {
        if self.tags.remove(name).is_some() {
            self.changes.mark(Change::Tags);
        }
        self
    }

    pub fn get_tags(&self) -> &Tags {
        &self.tags
    }

    // ----- Flags -----

    pub fn set_autowired(&mut self, autowired: bool) -> &mut Self {
        self.autowired = autowired;
        self.changes.mark(Change::Autowired);
        self
    }

    pub fn is_autowired(&self) -> bool {
        self.autowired
    }

    pub fn set_lazy(&mut self, lazy: bool) -> &mut Self {
        self.lazy = lazy;
        self.changes.mark(Change::Lazy);
        self
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn set_binding_type(&mut self, binding: BindingType) -> &mut Self {
        self.binding = binding;
        self.changes.mark(Change::BindingType);
        self
    }

    pub fn binding_type(&self) -> BindingType {
        self.binding
    }

    /// True for singleton-like bindings; their accessor caches the instance.
    pub fn is_shared(&self) -> bool {
        matches!(self.binding, BindingType::Singleton | BindingType::Plain)
    }

    // ----- Deprecation -----

    pub fn set_deprecated(&mut self, status: bool, template: Option<&str>) -> ContainerResult<&mut Self> {
        self.deprecation.set(status, template)?;
        self.changes.mark(Change::Deprecated);
        Ok(self)
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation.is_deprecated()
    }

    pub fn get_deprecation_message(&self) -> String {
        self.deprecation.message(&self.name)
    }

    // ----- Decoration -----

    /// Marks this definition as a decorator of `id`.
    ///
    /// `renamed_id` is where the decorated service moves to; it defaults to
    /// `<this name>.inner`.
    pub fn decorate(
        &mut self,
        id: impl Into<String>,
        renamed_id: Option<&str>,
        priority: i32,
    ) -> ContainerResult<&mut Self> {
        self.decorator = Some(DecoratorLink::new(id, renamed_id.map(str::to_string), priority)?);
        self.changes.mark(Change::Decorated);
        Ok(self)
    }

    pub fn get_decorator(&self) -> Option<&DecoratorLink> {
        self.decorator.as_ref()
    }

    pub fn remove_decorator(&mut self) -> &mut Self {
        if self.decorator.take().is_some() {
            self.changes.mark(Change::Decorated);
        }
        self
    }

    // ----- Change tracking -----

    pub fn is_changed(&self, change: Change) -> bool {
        self.changes.is_changed(change)
    }

    pub fn get_changes(&self) -> &Changes {
        &self.changes
    }

    pub fn set_changes(&mut self, changes: impl IntoIterator<Item = Change>) -> &mut Self {
        self.changes.set(changes);
        self
    }
}
