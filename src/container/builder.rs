//! Registration API.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::compiled::CompiledContainer;
use crate::ast::{SourceMap, SourceUnit};
use crate::compiler::{CompiledGraph, Compiler, Emitter};
use crate::config::CompilerConfig;
use crate::definition::{Definition, DefinitionKind, FactoryTarget};
use crate::error::ContainerResult;
use crate::observer::{CompilerObserver, Observers};
use crate::reflection::{ClassRegistry, ClosureReference};
use crate::value::Value;

/// Collects definitions, aliases and parameters, then compiles them.
///
/// Registering an id again replaces the previous definition but keeps its
/// registration position.
///
/// # Examples
///
/// ```rust
/// use viserio_container::{ClassMetadata, ClassRegistry, ContainerBuilder, Value};
///
/// let mut registry = ClassRegistry::new();
/// registry.register_class(ClassMetadata::new("Clock").constructor(vec![], |_, _| Ok(Value::Null)));
///
/// let mut builder = ContainerBuilder::new(registry);
/// builder.bind("clock", "Clock").set_lazy(true);
/// builder.set_alias("time", "clock");
/// builder.set_parameter("timezone", "UTC");
///
/// let graph = builder.compile()?;
/// assert_eq!(graph.resolve_id("time"), Some("clock"));
/// assert_eq!(graph.parameter("timezone"), Some(&Value::from("UTC")));
/// # Ok::<(), viserio_container::ContainerError>(())
/// ```
pub struct ContainerBuilder {
    registry: Arc<ClassRegistry>,
    config: CompilerConfig,
    definitions: Vec<Definition>,
    positions: HashMap<String, usize>,
    aliases: BTreeMap<String, String>,
    parameters: BTreeMap<String, Definition>,
    sources: SourceMap,
    observers: Observers,
}

impl ContainerBuilder {
    pub fn new(registry: ClassRegistry) -> Self {
        Self::with_registry(Arc::new(registry))
    }

    pub fn with_registry(registry: Arc<ClassRegistry>) -> Self {
        Self {
            registry,
            config: CompilerConfig::default(),
            definitions: Vec::new(),
            positions: HashMap::new(),
            aliases: BTreeMap::new(),
            parameters: BTreeMap::new(),
            sources: SourceMap::new(),
            observers: Observers::new(),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// Registers a definition of any kind and returns it for further setup.
    pub fn set_definition(&mut self, definition: Definition) -> &mut Definition {
        let id = definition.name().to_string();
        match definition.kind() {
            DefinitionKind::Parameter(_) => match self.parameters.entry(id) {
                Entry::Occupied(mut entry) => {
                    entry.insert(definition);
                    entry.into_mut()
                }
                Entry::Vacant(entry) => entry.insert(definition),
            },
            _ => {
                self.aliases.remove(&id);
                match self.positions.get(&id) {
                    Some(&position) => {
                        self.definitions[position] = definition;
                        &mut self.definitions[position]
                    }
                    None => {
                        self.positions.insert(id, self.definitions.len());
                        self.definitions.push(definition);
                        let last = self.definitions.len() - 1;
                        &mut self.definitions[last]
                    }
                }
            }
        }
    }

    /// Registers `class` under `id`.
    pub fn bind(&mut self, id: impl Into<String>, class: impl Into<String>) -> &mut Definition {
        self.set_definition(Definition::object(id, class))
    }

    pub fn factory(&mut self, id: impl Into<String>, target: FactoryTarget) -> &mut Definition {
        self.set_definition(Definition::factory(id, target))
    }

    /// Registers a closure; when `executable` the closure is invoked to
    /// build the service, otherwise the closure itself is the service.
    pub fn closure(&mut self, id: impl Into<String>, reference: ClosureReference, executable: bool) -> &mut Definition {
        self.set_definition(Definition::closure(id, reference, executable))
    }

    /// Points `alias` at `target`, replacing any definition named `alias`.
    pub fn set_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) -> &mut Self {
        let alias = alias.into();
        self.remove_definition(&alias);
        self.aliases.insert(alias, target.into());
        self
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        self.parameters
            .insert(name.clone(), Definition::parameter(name, value));
        self
    }

    pub fn get_parameter(&self, name: &str) -> Option<&Value> {
        match self.parameters.get(name)?.kind() {
            DefinitionKind::Parameter(value) => Some(value),
            _ => None,
        }
    }

    pub fn has_definition(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// True for definitions and aliases.
    pub fn has(&self, id: &str) -> bool {
        self.has_definition(id) || self.aliases.contains_key(id)
    }

    pub fn get_definition(&self, id: &str) -> Option<&Definition> {
        self.positions.get(id).map(|&position| &self.definitions[position])
    }

    pub fn get_definition_mut(&mut self, id: &str) -> Option<&mut Definition> {
        let position = *self.positions.get(id)?;
        self.definitions.get_mut(position)
    }

    pub fn remove_definition(&mut self, id: &str) -> Option<Definition> {
        let position = self.positions.remove(id)?;
        let removed = self.definitions.remove(position);
        for index in self.positions.values_mut() {
            if *index > position {
                *index -= 1;
            }
        }
        Some(removed)
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.iter()
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Ids of definitions carrying `tag`, in registration order.
    pub fn find_tagged_service_ids(&self, tag: &str) -> Vec<&str> {
        self.definitions
            .iter()
            .filter(|definition| definition.has_tag(tag))
            .map(Definition::name)
            .collect()
    }

    /// Attaches a parsed source unit for closure analysis.
    pub fn add_source(&mut self, unit: SourceUnit) -> &mut Self {
        self.sources.add(unit);
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn CompilerObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    fn compiler(&self) -> Compiler {
        Compiler::new(self.registry.clone())
            .with_config(self.config.clone())
            .with_sources(self.sources.clone())
            .with_observers(self.observers.clone())
    }

    pub fn compile(&self) -> ContainerResult<CompiledGraph> {
        debug!(
            definitions = self.definitions.len(),
            aliases = self.aliases.len(),
            parameters = self.parameters.len(),
            "compiling container"
        );
        self.compiler()
            .compile(self.definitions.iter().chain(self.parameters.values()), &self.aliases)
    }

    /// Compiles and wraps the graph in a [`CompiledContainer`].
    pub fn build(&self) -> ContainerResult<CompiledContainer> {
        let graph = self.compile()?;
        Ok(CompiledContainer::new(graph, self.registry.clone()).with_observers(self.observers.clone()))
    }

    /// Compiles and renders the container as Rust source.
    pub fn dump(&self) -> ContainerResult<String> {
        Emitter::new(self.config.clone()).emit(&self.compile()?)
    }

    /// Compiles and writes the container source to `path` atomically.
    pub fn dump_to(&self, path: impl AsRef<Path>) -> ContainerResult<()> {
        Emitter::new(self.config.clone()).write_to(&self.compile()?, path)
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("definitions", &self.definitions.iter().map(Definition::name).collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .field("parameters", &self.parameters.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}
