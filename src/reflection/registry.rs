//! Explicit metadata tables standing in for runtime reflection.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use super::{CallableId, Invoker, ParameterDescriptor, Signature};
use crate::container::ServiceLocator;
use crate::error::{ContainerError, ContainerResult};
use crate::value::Value;

/// Method invoker; the receiver is `None` for static methods.
pub type MethodInvoker =
    Arc<dyn Fn(&dyn ServiceLocator, Option<&Value>, Vec<Value>) -> ContainerResult<Value> + Send + Sync>;

/// Property setter; the receiver is `None` for static properties.
pub type PropertySetter = Arc<dyn Fn(Option<&Value>, Value) -> ContainerResult<()> + Send + Sync>;

#[derive(Clone)]
pub struct ConstructorMetadata {
    pub parameters: Vec<ParameterDescriptor>,
    pub invoker: Invoker,
}

#[derive(Clone)]
pub struct MethodMetadata {
    pub name: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub return_type: Option<String>,
    pub is_static: bool,
    pub invoker: MethodInvoker,
}

#[derive(Clone)]
pub struct PropertyMetadata {
    pub is_static: bool,
    pub setter: PropertySetter,
}

/// Everything the container needs to know about one class.
///
/// # Examples
///
/// ```rust
/// use viserio_container::{ClassMetadata, ClassRegistry, Instance, ParameterDescriptor, Value};
///
/// struct FileLogger { path: String }
///
/// let mut registry = ClassRegistry::new();
/// registry.register_class(
///     ClassMetadata::new("FileLogger")
///         .implements("Logger")
///         .constructor(vec![ParameterDescriptor::typed("path", "string")], |_, args| {
///             let path = args[0].as_str().unwrap_or_default().to_string();
///             Ok(Value::Object(Instance::new("FileLogger", FileLogger { path })))
///         }),
/// );
///
/// assert!(registry.is_subtype("FileLogger", "Logger"));
/// assert!(!registry.class("FileLogger").unwrap().is_trivially_instantiable());
/// ```
#[derive(Clone)]
pub struct ClassMetadata {
    name: String,
    parent: Option<String>,
    interfaces: Vec<String>,
    is_abstract: bool,
    constructor: Option<ConstructorMetadata>,
    methods: BTreeMap<String, MethodMetadata>,
    properties: BTreeMap<String, PropertyMetadata>,
}

impl ClassMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            interfaces: Vec::new(),
            is_abstract: false,
            constructor: None,
            methods: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Interfaces and abstract classes cannot be constructed.
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn constructor<F>(mut self, parameters: Vec<ParameterDescriptor>, invoker: F) -> Self
    where
        F: Fn(&dyn ServiceLocator, Vec<Value>) -> ContainerResult<Value> + Send + Sync + 'static,
    {
        self.constructor = Some(ConstructorMetadata {
            parameters,
            invoker: Arc::new(invoker),
        });
        self
    }

    pub fn method<F>(
        self,
        name: impl Into<String>,
        parameters: Vec<ParameterDescriptor>,
        return_type: Option<&str>,
        invoker: F,
    ) -> Self
    where
        F: Fn(&dyn ServiceLocator, Option<&Value>, Vec<Value>) -> ContainerResult<Value> + Send + Sync + 'static,
    {
        self.with_method(name.into(), parameters, return_type, false, Arc::new(invoker))
    }

    pub fn static_method<F>(
        self,
        name: impl Into<String>,
        parameters: Vec<ParameterDescriptor>,
        return_type: Option<&str>,
        invoker: F,
    ) -> Self
    where
        F: Fn(&dyn ServiceLocator, Option<&Value>, Vec<Value>) -> ContainerResult<Value> + Send + Sync + 'static,
    {
        self.with_method(name.into(), parameters, return_type, true, Arc::new(invoker))
    }

    pub fn property<F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(Option<&Value>, Value) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.properties.insert(
            name.into(),
            PropertyMetadata {
                is_static: false,
                setter: Arc::new(setter),
            },
        );
        self
    }

    pub fn static_property<F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(Option<&Value>, Value) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.properties.insert(
            name.into(),
            PropertyMetadata {
                is_static: true,
                setter: Arc::new(setter),
            },
        );
        self
    }

    fn with_method(
        mut self,
        name: String,
        parameters: Vec<ParameterDescriptor>,
        return_type: Option<&str>,
        is_static: bool,
        invoker: MethodInvoker,
    ) -> Self {
        self.methods.insert(
            name.clone(),
            MethodMetadata {
                name,
                parameters,
                return_type: return_type.map(str::to_string),
                is_static,
                invoker,
            },
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn is_instantiable(&self) -> bool {
        !self.is_abstract && self.constructor.is_some()
    }

    /// Instantiable without any argument.
    pub fn is_trivially_instantiable(&self) -> bool {
        self.is_instantiable()
            && self
                .constructor
                .as_ref()
                .map_or(false, |constructor| constructor.parameters.is_empty())
    }

    pub fn get_constructor(&self) -> Option<&ConstructorMetadata> {
        self.constructor.as_ref()
    }

    pub fn get_method(&self, name: &str) -> Option<&MethodMetadata> {
        self.methods.get(name)
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.get(name)
    }
}

impl fmt::Debug for ClassMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMetadata")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("interfaces", &self.interfaces)
            .field("is_abstract", &self.is_abstract)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Free function usable as a factory.
#[derive(Clone)]
pub struct FunctionMetadata {
    pub name: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub return_type: Option<String>,
    pub invoker: Invoker,
}

impl FunctionMetadata {
    pub fn new<F>(name: impl Into<String>, parameters: Vec<ParameterDescriptor>, invoker: F) -> Self
    where
        F: Fn(&dyn ServiceLocator, Vec<Value>) -> ContainerResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parameters,
            return_type: None,
            invoker: Arc::new(invoker),
        }
    }

    pub fn returns(mut self, class: impl Into<String>) -> Self {
        self.return_type = Some(class.into());
        self
    }
}

/// Metadata for every class and function the container may touch.
#[derive(Default, Clone)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassMetadata>,
    functions: HashMap<String, FunctionMetadata>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_class(&mut self, metadata: ClassMetadata) -> &mut Self {
        self.classes.insert(metadata.name.clone(), metadata);
        self
    }

    pub fn register_function(&mut self, metadata: FunctionMetadata) -> &mut Self {
        self.functions.insert(metadata.name.clone(), metadata);
        self
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn class(&self, name: &str) -> ContainerResult<&ClassMetadata> {
        self.classes
            .get(name)
            .ok_or_else(|| ContainerError::UnknownClass(name.to_string()))
    }

    pub fn function(&self, name: &str) -> ContainerResult<&FunctionMetadata> {
        self.functions
            .get(name)
            .ok_or_else(|| ContainerError::UnknownClass(name.to_string()))
    }

    /// Finds a method on the class or its ancestors.
    pub fn method(&self, class: &str, method: &str) -> ContainerResult<&MethodMetadata> {
        let mut current = Some(class);
        while let Some(name) = current {
            let metadata = self.class(name)?;
            if let Some(found) = metadata.get_method(method) {
                return Ok(found);
            }
            current = metadata.parent();
        }

        Err(ContainerError::Runtime(format!(
            "Method [{}::{}] does not exist.",
            class, method
        )))
    }

    /// Finds a property on the class or its ancestors.
    pub fn property(&self, class: &str, property: &str) -> ContainerResult<&PropertyMetadata> {
        let mut current = Some(class);
        while let Some(name) = current {
            let metadata = self.class(name)?;
            if let Some(found) = metadata.get_property(property) {
                return Ok(found);
            }
            current = metadata.parent();
        }

        Err(ContainerError::Runtime(format!(
            "Property [{}::${}] does not exist.",
            class, property
        )))
    }

    /// True when `class` is `ty`, extends it or implements it.
    pub fn is_subtype(&self, class: &str, ty: &str) -> bool {
        let mut current = Some(class);
        let mut depth = 0;
        while let Some(name) = current {
            if name == ty {
                return true;
            }
            let Some(metadata) = self.classes.get(name) else {
                return false;
            };
            if metadata.interfaces.iter().any(|interface| interface == ty) {
                return true;
            }
            current = metadata.parent();
            depth += 1;
            if depth > self.classes.len() {
                return false;
            }
        }
        false
    }

    /// Builds the signature of a callable from the tables.
    pub(crate) fn signature(&self, id: &CallableId) -> ContainerResult<Option<Signature>> {
        match id {
            CallableId::Constructor(class) => Ok(self.class(class)?.get_constructor().map(|constructor| {
                Signature::new(id.clone(), constructor.parameters.clone(), Some(class.clone()))
            })),
            CallableId::Method(class, method) => {
                let metadata = self.method(class, method)?;
                Ok(Some(Signature::new(
                    id.clone(),
                    metadata.parameters.clone(),
                    metadata.return_type.clone(),
                )))
            }
            CallableId::Function(name) => {
                let metadata = self.function(name)?;
                Ok(Some(Signature::new(
                    id.clone(),
                    metadata.parameters.clone(),
                    metadata.return_type.clone(),
                )))
            }
            CallableId::Closure(..) => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<&String> = self.classes.keys().collect();
        classes.sort();
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        f.debug_struct("ClassRegistry")
            .field("classes", &classes)
            .field("functions", &functions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_lookup_walks_parents() {
        let mut registry = ClassRegistry::new();
        registry
            .register_class(ClassMetadata::new("Base").abstract_class().method(
                "setName",
                vec![ParameterDescriptor::typed("name", "string")],
                None,
                |_, _, _| Ok(Value::Null),
            ))
            .register_class(ClassMetadata::new("Child").extends("Base").constructor(vec![], |_, _| Ok(Value::Null)));

        assert!(registry.method("Child", "setName").is_ok());
        assert!(registry.method("Child", "missing").is_err());
        assert!(registry.is_subtype("Child", "Base"));
        assert!(!registry.class("Base").unwrap().is_instantiable());
        assert!(registry.class("Child").unwrap().is_trivially_instantiable());
    }

    #[test]
    fn test_unknown_class() {
        let registry = ClassRegistry::new();
        assert_eq!(
            registry.class("Missing").unwrap_err(),
            ContainerError::UnknownClass("Missing".into())
        );
    }

    #[test]
    fn test_constructor_signature_is_none_without_constructor() {
        let mut registry = ClassRegistry::new();
        registry.register_class(ClassMetadata::new("Marker").abstract_class());

        let signature = registry
            .signature(&CallableId::Constructor("Marker".into()))
            .unwrap();
        assert!(signature.is_none());
    }
}
