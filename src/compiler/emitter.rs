//! Rust source emitter for a compiled graph.
//!
//! The generated module defines one struct implementing
//! [`ServiceLocator`](crate::ServiceLocator). Every service gets a private
//! `get_<id>` accessor; construction goes through a
//! [`ServiceRuntime`](crate::ServiceRuntime), which owns the instance cache
//! and the class metadata. Output only depends on the graph, so compiling
//! the same definitions twice produces identical source.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use tracing::debug;

use super::graph::{CallTarget, CompiledGraph, CompiledServiceEntry, Expr};
use crate::config::CompilerConfig;
use crate::error::{ContainerError, ContainerResult};
use crate::value::Value;

const HEADER: &str = "// @generated by viserio-container. Do not edit.\n";

/// Accessor names per service id.
///
/// Ids are converted to snake case; ids that collapse to the same name get
/// a numeric suffix in the order they are first requested.
#[derive(Debug, Default, Clone)]
pub struct NameCache {
    names: BTreeMap<String, String>,
    used: HashSet<String>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method_name(&mut self, id: &str) -> String {
        if let Some(name) = self.names.get(id) {
            return name.clone();
        }

        let base = format!("get_{}", snake_case(id));
        let mut name = base.clone();
        let mut counter = 1;
        while self.used.contains(&name) {
            counter += 1;
            name = format!("{}_{}", base, counter);
        }

        self.used.insert(name.clone());
        self.names.insert(id.to_string(), name.clone());
        name
    }

    /// Name already assigned to `id`.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }
}

/// `Foo\BarService.inner` becomes `foo_bar_service_inner`.
fn snake_case(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 4);
    let mut previous: Option<char> = None;
    for ch in id.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase()
                && previous.map_or(false, |p| p.is_ascii_lowercase() || p.is_ascii_digit())
            {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
        previous = Some(ch);
    }

    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "service".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Writes a compiled graph as Rust source.
#[derive(Debug, Clone, Default)]
pub struct Emitter {
    config: CompilerConfig,
}

impl Emitter {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn emit(&self, graph: &CompiledGraph) -> ContainerResult<String> {
        let mut names = NameCache::new();
        for entry in graph.entries() {
            names.method_name(&entry.service_id);
        }

        let name = &self.config.container_name;
        let mut out = String::new();
        out.push_str(HEADER);
        out.push('\n');
        out.push_str("use std::collections::HashMap;\n");
        out.push_str("use std::sync::Arc;\n\n");
        out.push_str("use viserio_container::reflection::{ClassRegistry, Invoker};\n");
        out.push_str("use viserio_container::{ContainerError, ContainerResult, ServiceLocator, ServiceRuntime, Value};\n\n");

        out.push_str(&format!("pub struct {} {{\n    runtime: ServiceRuntime,\n}}\n\n", name));
        out.push_str(&format!("impl {} {{\n", name));
        out.push_str("    pub fn new(registry: Arc<ClassRegistry>, closures: HashMap<String, Invoker>) -> Self {\n");
        out.push_str("        Self {\n");
        out.push_str("            runtime: ServiceRuntime::new(registry).with_closures(closures),\n");
        out.push_str("        }\n");
        out.push_str("    }\n\n");
        out.push_str("    pub fn runtime(&self) -> &ServiceRuntime {\n        &self.runtime\n    }\n");

        for entry in graph.entries() {
            out.push('\n');
            out.push_str(&self.accessor(entry, &names)?);
        }
        out.push_str("}\n\n");

        out.push_str(&self.locator_impl(graph, &names)?);

        debug!(
            container = %name,
            services = graph.len(),
            bytes = out.len(),
            "emitted container source"
        );
        Ok(out)
    }

    /// Emits and replaces `path` atomically: the source goes to a sibling
    /// temporary file first, which is then renamed over the target.
    pub fn write_to(&self, graph: &CompiledGraph, path: impl AsRef<Path>) -> ContainerResult<()> {
        let path = path.as_ref();
        let source = self.emit(graph)?;
        let file_name = path
            .file_name()
            .ok_or_else(|| ContainerError::InvalidArgument(format!("[{}] is not a file path.", path.display())))?;
        let temporary = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

        let io_error = |error: std::io::Error| {
            ContainerError::Runtime(format!("Failed to write [{}]: {}", path.display(), error))
        };
        fs::write(&temporary, source).map_err(io_error)?;
        if let Err(error) = fs::rename(&temporary, path) {
            let _ = fs::remove_file(&temporary);
            return Err(io_error(error));
        }

        debug!(path = %path.display(), "wrote compiled container");
        Ok(())
    }

    fn accessor(&self, entry: &CompiledServiceEntry, names: &NameCache) -> ContainerResult<String> {
        let id = &entry.service_id;
        let method = names.get(id).unwrap_or_default();
        let mut out = String::new();

        if self.config.debug_comments {
            out.push_str(&format!(
                "    // {} ({}, {})\n",
                id,
                entry.class.as_deref().unwrap_or("unknown class"),
                if entry.shared { "shared" } else { "transient" }
            ));
        }
        if let Some(closure) = &entry.closure {
            out.push_str(&format!(
                "    // Closure declared in {} on line {}:\n",
                closure.location.file.as_deref().unwrap_or_default(),
                closure.location.line.unwrap_or_default()
            ));
            for line in closure.source(0).lines() {
                out.push_str(&format!("    //     {}\n", line));
            }
        }

        out.push_str(&format!("    fn {}(&self) -> ContainerResult<Value> {{\n", method));
        if let Some(message) = &entry.deprecation {
            out.push_str(&format!("        self.runtime.deprecated({:?}, {:?});\n", id, message));
        }
        out.push_str(&format!(
            "        self.runtime.{}({:?}, || {{\n",
            if entry.shared { "shared" } else { "transient" },
            id
        ));
        out.push_str(&format!(
            "            let instance = {};\n",
            self.expr(&entry.construct, names)?
        ));

        for call in &entry.method_calls {
            let invocation = format!(
                "self.runtime.call_method({:?}, {:?}, self, &instance, {})?",
                call.class,
                call.method,
                self.args(&call.args, names)?
            );
            if call.returns_clone {
                out.push_str(&format!("            let instance = {};\n", invocation));
            } else {
                out.push_str(&format!("            {};\n", invocation));
            }
        }

        for property in &entry.properties {
            out.push_str(&format!(
                "            self.runtime.set_property({:?}, {:?}, {}, {})?;\n",
                property.class,
                property.name,
                if property.is_static { "None" } else { "Some(&instance)" },
                self.expr(&property.value, names)?
            ));
        }

        out.push_str("            Ok(instance)\n");
        out.push_str("        })\n");
        out.push_str("    }\n");
        Ok(out)
    }

    fn locator_impl(&self, graph: &CompiledGraph, names: &NameCache) -> ContainerResult<String> {
        let mut out = String::new();
        out.push_str(&format!("impl ServiceLocator for {} {{\n", self.config.container_name));

        out.push_str("    fn get(&self, id: &str) -> ContainerResult<Value> {\n");
        out.push_str("        match id {\n");
        for id in graph.service_ids() {
            let target = graph.resolve_id(id).unwrap_or(id);
            out.push_str(&format!(
                "            {:?} => self.{}(),\n",
                id,
                names.get(target).unwrap_or_default()
            ));
        }
        out.push_str("            _ => Err(ContainerError::NotFound(id.to_string())),\n");
        out.push_str("        }\n");
        out.push_str("    }\n\n");

        out.push_str("    fn has(&self, id: &str) -> bool {\n");
        let ids = graph.service_ids();
        if ids.is_empty() {
            out.push_str("        let _ = id;\n        false\n");
        } else {
            let patterns: Vec<String> = ids.iter().map(|id| format!("{:?}", id)).collect();
            out.push_str(&format!("        matches!(id, {})\n", patterns.join(" | ")));
        }
        out.push_str("    }\n\n");

        out.push_str("    fn parameter(&self, name: &str) -> ContainerResult<Value> {\n");
        out.push_str("        match name {\n");
        for (name, value) in graph.parameters() {
            out.push_str(&format!("            {:?} => Ok({}),\n", name, literal(value)?));
        }
        out.push_str("            _ => Err(ContainerError::NotFound(name.to_string())),\n");
        out.push_str("        }\n");
        out.push_str("    }\n");
        out.push_str("}\n");
        Ok(out)
    }

    fn args(&self, args: &[Expr], names: &NameCache) -> ContainerResult<String> {
        let rendered = args
            .iter()
            .map(|arg| self.expr(arg, names))
            .collect::<ContainerResult<Vec<_>>>()?;
        Ok(format!("vec![{}]", rendered.join(", ")))
    }

    fn expr(&self, expr: &Expr, names: &NameCache) -> ContainerResult<String> {
        Ok(match expr {
            Expr::Literal(value) => literal(value)?,
            Expr::List(items) => format!("Value::List({})", self.args(items, names)?),
            Expr::Service(id) => format!("self.{}()?", accessor_name(names, id)?),
            Expr::Parameter(name) => format!("self.parameter({:?})?", name),
            Expr::New { class, args, .. } => format!(
                "self.runtime.construct({:?}, self, {})?",
                class,
                self.args(args, names)?
            ),
            Expr::Invoke { target, args, .. } => {
                let args = self.args(args, names)?;
                match target {
                    CallTarget::StaticMethod { class, method } => format!(
                        "self.runtime.call_static({:?}, {:?}, self, {})?",
                        class, method, args
                    ),
                    CallTarget::ServiceMethod { id, class, method } => format!(
                        "self.runtime.call_method({:?}, {:?}, self, &self.{}()?, {})?",
                        class,
                        method,
                        accessor_name(names, id)?,
                        args
                    ),
                    CallTarget::Function(name) => {
                        format!("self.runtime.call_function({:?}, self, {})?", name, args)
                    }
                    CallTarget::Closure(id) => {
                        format!("self.runtime.call_closure({:?}, self, {})?", id, args)
                    }
                }
            }
            Expr::Closure(id) => format!("self.runtime.closure_value({:?})?", id),
        })
    }
}

fn accessor_name<'a>(names: &'a NameCache, id: &str) -> ContainerResult<&'a str> {
    names
        .get(id)
        .ok_or_else(|| ContainerError::NotFound(id.to_string()))
}

/// Rust expression building `value`.
fn literal(value: &Value) -> ContainerResult<String> {
    Ok(match value {
        Value::Null => "Value::Null".to_string(),
        Value::Bool(value) => format!("Value::Bool({})", value),
        Value::Int(value) => format!("Value::Int({})", value),
        Value::Float(value) if value.is_nan() => "Value::Float(f64::NAN)".to_string(),
        Value::Float(value) if value.is_infinite() && *value > 0.0 => "Value::Float(f64::INFINITY)".to_string(),
        Value::Float(value) if value.is_infinite() => "Value::Float(f64::NEG_INFINITY)".to_string(),
        Value::Float(value) => format!("Value::Float({:?})", value),
        Value::Str(value) => format!("Value::Str({:?}.to_string())", value),
        Value::List(values) => {
            let items = values.iter().map(literal).collect::<ContainerResult<Vec<_>>>()?;
            format!("Value::List(vec![{}])", items.join(", "))
        }
        Value::Map(values) => {
            let items = values
                .iter()
                .map(|(key, value)| Ok(format!("({:?}.to_string(), {})", key, literal(value)?)))
                .collect::<ContainerResult<Vec<_>>>()?;
            format!("Value::Map([{}].into_iter().collect())", items.join(", "))
        }
        Value::Object(instance) => {
            return Err(ContainerError::Runtime(format!(
                "An instance of [{}] cannot be written as a literal; register it as a service instead.",
                instance.class()
            )))
        }
    })
}
