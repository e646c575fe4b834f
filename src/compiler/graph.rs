//! The compiler's output: one entry per service plus the lookup tables.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ast::AnalyzedClosure;
use crate::reflection::Invoker;
use crate::value::Value;

/// How one value is produced at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    /// Accessor of another compiled service, aliases already resolved
    Service(String),
    Parameter(String),
    /// Constructor call; also used for inlined and freshly autowired classes
    New {
        class: String,
        pass_container: bool,
        args: Vec<Expr>,
    },
    /// Factory call
    Invoke {
        target: CallTarget,
        pass_container: bool,
        args: Vec<Expr>,
    },
    /// The closure registered under this service id, not invoked
    Closure(String),
}

impl Expr {
    /// Service ids this expression reads, recursively.
    pub fn dependencies<'a>(&'a self, into: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Service(id) => {
                into.insert(id);
            }
            Expr::List(items) => items.iter().for_each(|item| item.dependencies(into)),
            Expr::New { args, .. } => args.iter().for_each(|arg| arg.dependencies(into)),
            Expr::Invoke { target, args, .. } => {
                if let CallTarget::ServiceMethod { id, .. } = target {
                    into.insert(id);
                }
                args.iter().for_each(|arg| arg.dependencies(into));
            }
            Expr::Literal(_) | Expr::Parameter(_) | Expr::Closure(_) => {}
        }
    }
}

/// What a factory invocation calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    StaticMethod { class: String, method: String },
    /// Method on another service; `class` is that service's class
    ServiceMethod { id: String, class: String, method: String },
    Function(String),
    /// Closure registered under the given service id
    Closure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMethodCall {
    pub class: String,
    pub method: String,
    pub pass_container: bool,
    pub args: Vec<Expr>,
    /// The result replaces the service instance
    pub returns_clone: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProperty {
    pub class: String,
    pub name: String,
    pub is_static: bool,
    pub value: Expr,
}

/// One accessor of the compiled container.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledServiceEntry {
    pub service_id: String,
    /// Class of the produced instance, when known
    pub class: Option<String>,
    pub construct: Expr,
    pub method_calls: Vec<CompiledMethodCall>,
    pub properties: Vec<CompiledProperty>,
    /// Cache the instance after the first access
    pub shared: bool,
    pub lazy: bool,
    /// Final deprecation message, placeholder already substituted
    pub deprecation: Option<String>,
    /// Analysed closure source, when the factory is a closure and its
    /// source unit was attached
    pub closure: Option<AnalyzedClosure>,
}

impl CompiledServiceEntry {
    /// Every service id this entry reads while being built.
    pub fn dependencies(&self) -> BTreeSet<&str> {
        let mut dependencies = BTreeSet::new();
        self.construct.dependencies(&mut dependencies);
        for call in &self.method_calls {
            call.args.iter().for_each(|arg| arg.dependencies(&mut dependencies));
        }
        for property in &self.properties {
            property.value.dependencies(&mut dependencies);
        }
        dependencies
    }
}

/// A fully resolved service graph.
///
/// Ids are kept sorted so anything derived from the graph is deterministic.
#[derive(Clone, Default)]
pub struct CompiledGraph {
    pub(crate) entries: BTreeMap<String, CompiledServiceEntry>,
    pub(crate) aliases: BTreeMap<String, String>,
    pub(crate) parameters: BTreeMap<String, Value>,
    pub(crate) closures: BTreeMap<String, Invoker>,
}

impl CompiledGraph {
    pub fn entries(&self) -> impl Iterator<Item = &CompiledServiceEntry> {
        self.entries.values()
    }

    pub fn entry(&self, id: &str) -> Option<&CompiledServiceEntry> {
        self.resolve_id(id).and_then(|id| self.entries.get(id))
    }

    /// Alias to final service id.
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Closure invokers by service id.
    pub fn closures(&self) -> &BTreeMap<String, Invoker> {
        &self.closures
    }

    /// Id of the entry that serves `id`.
    pub fn resolve_id<'a>(&'a self, id: &'a str) -> Option<&'a str> {
        if self.entries.contains_key(id) {
            return Some(id);
        }
        self.aliases.get(id).map(String::as_str)
    }

    pub fn has(&self, id: &str) -> bool {
        self.resolve_id(id).is_some()
    }

    /// Service ids and aliases, sorted.
    pub fn service_ids(&self) -> Vec<&str> {
        let ids: BTreeSet<&str> = self
            .entries
            .keys()
            .chain(self.aliases.keys())
            .map(String::as_str)
            .collect();
        ids.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("entries", &self.entries)
            .field("aliases", &self.aliases)
            .field("parameters", &self.parameters)
            .field("closures", &self.closures.keys().collect::<Vec<_>>())
            .finish()
    }
}
