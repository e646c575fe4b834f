//! Turns registered definitions into a [`CompiledGraph`].
//!
//! Compilation runs in stages: definitions are split into services, aliases
//! and parameters; decoration chains are applied; aliases are resolved to
//! their final target; then every service is compiled on its own into a
//! [`CompiledServiceEntry`]. Errors from every stage are collected and
//! reported together, and no graph is produced if there is any.

mod decoration;
mod emitter;
mod graph;
mod types;

pub use emitter::{Emitter, NameCache};
pub use graph::{CallTarget, CompiledGraph, CompiledMethodCall, CompiledProperty, CompiledServiceEntry, Expr};

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use self::types::TypeIndex;
use crate::ast::{ClosureAnalyzer, SourceMap};
use crate::config::CompilerConfig;
use crate::definition::{Arguments, Definition, DefinitionKind, FactoryTarget};
use crate::error::{ContainerError, ContainerResult};
use crate::observer::{CompilerObserver, Observers};
use crate::reflection::{
    CallableId, ClassRegistry, ParameterBinding, ReflectionResolver, ResolveMode, ResolvedCall,
};
use crate::value::{Argument, ReferenceBehavior, Value};

/// Class reported for services that are an uninvoked closure.
pub const CLOSURE_CLASS: &str = "Closure";

/// A service definition under the id it is compiled as.
pub(crate) struct Slot<'a> {
    pub(crate) id: String,
    pub(crate) definition: &'a Definition,
    /// Registration order
    pub(crate) order: usize,
}

/// Container compiler.
///
/// # Examples
///
/// ```rust
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use viserio_container::compiler::{Compiler, Expr};
/// use viserio_container::{ClassMetadata, ClassRegistry, Definition, ParameterDescriptor, Value};
///
/// let mut registry = ClassRegistry::new();
/// registry.register_class(
///     ClassMetadata::new("FileLogger")
///         .constructor(vec![ParameterDescriptor::typed("path", "string")], |_, _| Ok(Value::Null)),
/// );
///
/// let mut logger = Definition::object("logger", "FileLogger");
/// logger.add_argument("/tmp/log");
///
/// let graph = Compiler::new(Arc::new(registry)).compile([&logger], &BTreeMap::new())?;
/// let entry = graph.entry("logger").unwrap();
/// assert!(entry.shared);
/// assert!(matches!(&entry.construct, Expr::New { class, .. } if class == "FileLogger"));
/// # Ok::<(), viserio_container::ContainerError>(())
/// ```
pub struct Compiler {
    registry: Arc<ClassRegistry>,
    config: CompilerConfig,
    sources: SourceMap,
    observers: Observers,
}

impl Compiler {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self {
            registry,
            config: CompilerConfig::default(),
            sources: SourceMap::new(),
            observers: Observers::new(),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Parsed sources used to analyse closure factories.
    pub fn with_sources(mut self, sources: SourceMap) -> Self {
        self.sources = sources;
        self
    }

    pub(crate) fn with_observers(mut self, observers: Observers) -> Self {
        self.observers = observers;
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn CompilerObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles `definitions` plus the explicit `aliases`.
    ///
    /// Alias and parameter definitions are accepted as well. A service id
    /// used by more than one definition is reported as an error; the first
    /// definition is still compiled so its own errors show up too.
    pub fn compile<'a, I>(&self, definitions: I, aliases: &BTreeMap<String, String>) -> ContainerResult<CompiledGraph>
    where
        I: IntoIterator<Item = &'a Definition>,
    {
        let started = Instant::now();
        let mut errors = Vec::new();
        let mut slots: Vec<Slot<'_>> = Vec::new();
        let mut alias_map = aliases.clone();
        let mut parameters = BTreeMap::new();
        let mut seen = HashSet::new();

        for (order, definition) in definitions.into_iter().enumerate() {
            match definition.kind() {
                DefinitionKind::Parameter(value) => {
                    parameters.insert(definition.name().to_string(), value.clone());
                }
                DefinitionKind::Alias { target } => {
                    alias_map.insert(definition.name().to_string(), target.clone());
                }
                _ if seen.insert(definition.name().to_string()) => slots.push(Slot {
                    id: definition.name().to_string(),
                    definition,
                    order,
                }),
                _ => errors.push(ContainerError::for_service(
                    definition.name(),
                    ContainerError::InvalidArgument(format!(
                        "The service [{}] is defined more than once.",
                        definition.name()
                    )),
                )),
            }
        }

        for slot in &slots {
            if alias_map.contains_key(&slot.id) {
                errors.push(ContainerError::for_service(
                    slot.id.as_str(),
                    ContainerError::InvalidArgument(format!(
                        "[{}] is registered both as a service and as an alias.",
                        slot.id
                    )),
                ));
            }
        }

        errors.extend(decoration::apply(&mut slots, &mut alias_map));

        let ids: HashSet<String> = slots.iter().map(|slot| slot.id.clone()).collect();
        let (resolved_aliases, alias_errors) = resolve_aliases(&alias_map, &ids);
        errors.extend(alias_errors);

        let mut index = TypeIndex::new(self.registry.clone(), resolved_aliases);
        for slot in &slots {
            let class = self.service_class(slot.definition);
            index.add(&slot.id, slot.definition, class.as_deref(), self.config.inline_trivial_services);
        }

        let tagged = tagged_services(&slots, &index);
        let mut run = CompileRun {
            compiler: self,
            resolver: ReflectionResolver::new(self.registry.clone()),
            index,
            parameters: &parameters,
            tagged,
        };

        let mut graph = CompiledGraph::default();
        for slot in &slots {
            self.observers.compiling(&slot.id);
            let compiled_at = Instant::now();

            match run.compile_entry(slot) {
                Ok(entry) => {
                    self.observers.compiled(&slot.id, compiled_at.elapsed());
                    if let DefinitionKind::Closure(factory) = slot.definition.kind() {
                        graph.closures.insert(slot.id.clone(), factory.reference.invoker.clone());
                    }
                    graph.entries.insert(slot.id.clone(), entry);
                }
                Err(error) => {
                    let error = ContainerError::for_service(slot.id.as_str(), error);
                    self.observers.compile_failed(&slot.id, &error);
                    errors.push(error);
                }
            }
        }

        if !errors.is_empty() {
            debug!(errors = errors.len(), "container compilation failed");
            return Err(if errors.len() == 1 {
                errors.remove(0)
            } else {
                ContainerError::Compilation(errors)
            });
        }

        graph.aliases = run.index.aliases().clone();
        let signatures = run.resolver.cached();
        drop(run);
        graph.parameters = parameters;
        debug!(
            services = graph.entries.len(),
            aliases = graph.aliases.len(),
            parameters = graph.parameters.len(),
            signatures,
            elapsed = ?started.elapsed(),
            "compiled container"
        );

        Ok(graph)
    }

    /// Class of the instance a definition produces, when it can be known
    /// without building it.
    fn service_class(&self, definition: &Definition) -> Option<String> {
        match definition.kind() {
            DefinitionKind::Object { class } => Some(class.clone()),
            DefinitionKind::Factory { return_type: Some(class), .. } => Some(class.clone()),
            DefinitionKind::Factory { target, return_type: None } => match target {
                FactoryTarget::Static { class, method } => self
                    .registry
                    .method(class, method)
                    .ok()
                    .and_then(|method| method.return_type.clone()),
                FactoryTarget::Function(name) => self
                    .registry
                    .function(name)
                    .ok()
                    .and_then(|function| function.return_type.clone()),
                FactoryTarget::Service { .. } => None,
            },
            DefinitionKind::Closure(factory) if factory.executable => factory.reference.return_type.clone(),
            DefinitionKind::Closure(_) => Some(CLOSURE_CLASS.to_string()),
            DefinitionKind::Alias { .. } | DefinitionKind::Parameter(_) => None,
        }
    }
}

/// State of one compile run; the signature cache lives and dies with it.
struct CompileRun<'c> {
    compiler: &'c Compiler,
    resolver: ReflectionResolver,
    index: TypeIndex,
    parameters: &'c BTreeMap<String, Value>,
    tagged: BTreeMap<String, Vec<String>>,
}

impl CompileRun<'_> {
    fn compile_entry(&mut self, slot: &Slot<'_>) -> ContainerResult<CompiledServiceEntry> {
        let definition = slot.definition;
        let autowire = definition.is_autowired();
        let class = self.compiler.service_class(definition);
        let mut closure = None;

        let construct = match definition.kind() {
            DefinitionKind::Object { class } => {
                let metadata = self.compiler.registry.class(class)?;
                if !metadata.is_instantiable() {
                    return Err(ContainerError::Runtime(format!(
                        "Class [{}] is not instantiable.",
                        class
                    )));
                }

                let call = self.resolve_callable(
                    &CallableId::Constructor(class.clone()),
                    definition.get_arguments(),
                    ResolveMode { autowire, factory: false },
                )?;
                Expr::New {
                    class: class.clone(),
                    pass_container: call.pass_container,
                    args: self.bindings(call.bindings)?,
                }
            }
            DefinitionKind::Factory { target, .. } => {
                let (target, callable) = self.factory_target(target)?;
                let call = self.resolve_callable(
                    &callable,
                    definition.get_arguments(),
                    ResolveMode { autowire, factory: true },
                )?;
                Expr::Invoke {
                    target,
                    pass_container: call.pass_container,
                    args: self.bindings(call.bindings)?,
                }
            }
            DefinitionKind::Closure(factory) => {
                if self.compiler.config.analyze_closures {
                    if let Some(unit) = self.compiler.sources.get(&factory.reference.file) {
                        closure = Some(ClosureAnalyzer::new().analyze(unit, &factory.reference)?);
                    }
                }

                if factory.executable {
                    let signature = self.resolver.closure_signature(&factory.reference);
                    let call = self.resolver.resolve(
                        &signature.id.to_string(),
                        &signature,
                        definition.get_arguments(),
                        ResolveMode { autowire, factory: true },
                        &self.index,
                    )?;
                    Expr::Invoke {
                        target: CallTarget::Closure(slot.id.clone()),
                        pass_container: call.pass_container,
                        args: self.bindings(call.bindings)?,
                    }
                } else {
                    Expr::Closure(slot.id.clone())
                }
            }
            DefinitionKind::Alias { .. } | DefinitionKind::Parameter(_) => {
                return Err(ContainerError::Runtime(format!(
                    "[{}] does not describe a service.",
                    definition.name()
                )));
            }
        };

        let mut method_calls = Vec::new();
        for call in definition.get_method_calls() {
            let owner = class.as_deref().ok_or_else(|| {
                ContainerError::Runtime(format!(
                    "Cannot call method [{}] on a service whose class is unknown.",
                    call.method
                ))
            })?;
            let arguments: Arguments = call.arguments.iter().cloned().collect();
            let resolved = self.resolve_callable(
                &CallableId::Method(owner.to_string(), call.method.clone()),
                &arguments,
                ResolveMode { autowire, factory: false },
            )?;
            method_calls.push(CompiledMethodCall {
                class: owner.to_string(),
                method: call.method.clone(),
                pass_container: resolved.pass_container,
                args: self.bindings(resolved.bindings)?,
                returns_clone: call.returns_clone,
            });
        }

        let mut properties = Vec::new();
        for (name, property) in definition.get_properties().iter() {
            let owner = class.as_deref().ok_or_else(|| {
                ContainerError::Runtime(format!(
                    "Cannot set property [{}] on a service whose class is unknown.",
                    name
                ))
            })?;
            let metadata = self.compiler.registry.property(owner, name)?;
            if metadata.is_static != property.is_static {
                return Err(ContainerError::Runtime(format!(
                    "Property [{}::${}] is {}static.",
                    owner,
                    name,
                    if metadata.is_static { "" } else { "not " }
                )));
            }
            properties.push(CompiledProperty {
                class: owner.to_string(),
                name: name.clone(),
                is_static: property.is_static,
                value: self.argument(&property.value)?,
            });
        }

        Ok(CompiledServiceEntry {
            service_id: slot.id.clone(),
            class,
            construct,
            method_calls,
            properties,
            shared: definition.is_shared(),
            lazy: definition.is_lazy(),
            deprecation: definition
                .is_deprecated()
                .then(|| definition.get_deprecation_message()),
            closure,
        })
    }

    fn factory_target(&self, target: &FactoryTarget) -> ContainerResult<(CallTarget, CallableId)> {
        match target {
            FactoryTarget::Static { class, method } => {
                if !self.compiler.registry.method(class, method)?.is_static {
                    return Err(ContainerError::Runtime(format!(
                        "Factory method [{}::{}] is not static.",
                        class, method
                    )));
                }
                Ok((
                    CallTarget::StaticMethod {
                        class: class.clone(),
                        method: method.clone(),
                    },
                    CallableId::Method(class.clone(), method.clone()),
                ))
            }
            FactoryTarget::Service { id, method } => {
                let service = self
                    .index
                    .lookup_id(id)
                    .ok_or_else(|| ContainerError::NotFound(id.clone()))?
                    .to_string();
                let owner = self.class_of(&service).ok_or_else(|| {
                    ContainerError::Runtime(format!(
                        "Unable to determine the class of factory service [{}].",
                        id
                    ))
                })?;
                Ok((
                    CallTarget::ServiceMethod {
                        id: service,
                        class: owner.clone(),
                        method: method.clone(),
                    },
                    CallableId::Method(owner, method.clone()),
                ))
            }
            FactoryTarget::Function(name) => Ok((
                CallTarget::Function(name.clone()),
                CallableId::Function(name.clone()),
            )),
        }
    }

    fn class_of(&self, id: &str) -> Option<String> {
        self.index.class_of(id).map(str::to_string)
    }

    fn resolve_callable(
        &mut self,
        callable: &CallableId,
        arguments: &Arguments,
        mode: ResolveMode,
    ) -> ContainerResult<ResolvedCall> {
        let signature = self
            .resolver
            .signature(callable)?
            .ok_or_else(|| ContainerError::Runtime(format!("No signature registered for [{}].", callable)))?;
        let context = match callable {
            CallableId::Constructor(class) => class.clone(),
            other => other.to_string(),
        };
        self.resolver.resolve(&context, &signature, arguments, mode, &self.index)
    }

    fn bindings(&self, bindings: Vec<ParameterBinding>) -> ContainerResult<Vec<Expr>> {
        bindings.into_iter().map(|binding| self.binding(binding)).collect()
    }

    fn binding(&self, binding: ParameterBinding) -> ContainerResult<Expr> {
        match binding {
            ParameterBinding::Argument(argument) => self.argument(&argument),
            ParameterBinding::Service(id) => Ok(Expr::Service(id)),
            ParameterBinding::Construct { class, call } => Ok(Expr::New {
                class,
                pass_container: call.pass_container,
                args: self.bindings(call.bindings)?,
            }),
            ParameterBinding::Default(value) => Ok(Expr::Literal(value)),
            ParameterBinding::Null => Ok(Expr::Literal(Value::Null)),
        }
    }

    fn argument(&self, argument: &Argument) -> ContainerResult<Expr> {
        match argument {
            Argument::Value(value) => Ok(Expr::Literal(value.clone())),
            Argument::Reference(reference) => match self.index.lookup_id(&reference.id) {
                Some(id) => Ok(Expr::Service(id.to_string())),
                None if reference.behavior == ReferenceBehavior::Null => Ok(Expr::Literal(Value::Null)),
                None => Err(ContainerError::NotFound(reference.id.clone())),
            },
            Argument::Tagged(tag) => Ok(Expr::List(
                self.tagged
                    .get(tag)
                    .map(|ids| ids.iter().map(|id| Expr::Service(id.clone())).collect())
                    .unwrap_or_default(),
            )),
            Argument::Parameter(name) if self.parameters.contains_key(name) => Ok(Expr::Parameter(name.clone())),
            Argument::Parameter(name) => Err(ContainerError::Runtime(format!(
                "Parameter [{}] is not defined.",
                name
            ))),
            Argument::List(items) => Ok(Expr::List(
                items
                    .iter()
                    .map(|item| self.argument(item))
                    .collect::<ContainerResult<_>>()?,
            )),
        }
    }
}

/// Follows every alias to a service id.
fn resolve_aliases(
    aliases: &BTreeMap<String, String>,
    ids: &HashSet<String>,
) -> (BTreeMap<String, String>, Vec<ContainerError>) {
    let mut resolved = BTreeMap::new();
    let mut errors = Vec::new();
    let mut reported: BTreeSet<Vec<String>> = BTreeSet::new();

    for alias in aliases.keys() {
        let mut path = vec![alias.clone()];
        let mut current = alias;
        loop {
            let Some(next) = aliases.get(current) else {
                break;
            };
            if ids.contains(next) {
                resolved.insert(alias.clone(), next.clone());
                break;
            }
            if let Some(start) = path.iter().position(|seen| seen == next) {
                let mut cycle = path[start..].to_vec();
                let mut members = cycle.clone();
                members.sort();
                cycle.push(next.clone());
                if reported.insert(members) {
                    errors.push(ContainerError::Circular(cycle));
                }
                break;
            }
            if !aliases.contains_key(next) {
                errors.push(ContainerError::for_service(
                    alias.as_str(),
                    ContainerError::NotFound(next.clone()),
                ));
                break;
            }
            path.push(next.clone());
            current = next;
        }
    }

    (resolved, errors)
}

/// Service ids per tag: `priority` attribute descending, then registration
/// order.
fn tagged_services(slots: &[Slot<'_>], index: &TypeIndex) -> BTreeMap<String, Vec<String>> {
    let mut tagged: BTreeMap<String, Vec<(i64, usize, String)>> = BTreeMap::new();
    for slot in slots {
        let Some(id) = index.lookup_id(slot.definition.name()) else {
            continue;
        };
        for (tag, attributes) in slot.definition.get_tags() {
            let priority = attributes.get("priority").and_then(Value::as_int).unwrap_or(0);
            tagged
                .entry(tag.clone())
                .or_default()
                .push((priority, slot.order, id.to_string()));
        }
    }

    tagged
        .into_iter()
        .map(|(tag, mut services)| {
            services.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
            (tag, services.into_iter().map(|(_, _, id)| id).collect())
        })
        .collect()
}
