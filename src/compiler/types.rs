//! Service lookup by type for autowiring.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::definition::{Definition, DefinitionKind};
use crate::reflection::{is_builtin_type, ClassRegistry, ServiceLookup, ServiceMatch};

/// Index of compiled services by id, alias and class.
pub(crate) struct TypeIndex {
    registry: Arc<ClassRegistry>,
    ids: HashSet<String>,
    aliases: BTreeMap<String, String>,
    /// `(service id, class)` in registration order
    classes: Vec<(String, String)>,
    /// Services that may be built inline, by id
    inline: HashMap<String, String>,
}

impl TypeIndex {
    pub(crate) fn new(registry: Arc<ClassRegistry>, aliases: BTreeMap<String, String>) -> Self {
        Self {
            registry,
            ids: HashSet::new(),
            aliases,
            classes: Vec::new(),
            inline: HashMap::new(),
        }
    }

    pub(crate) fn add(&mut self, id: &str, definition: &Definition, class: Option<&str>, allow_inline: bool) {
        self.ids.insert(id.to_string());
        let Some(class) = class else {
            return;
        };

        self.classes.push((id.to_string(), class.to_string()));
        if allow_inline && self.is_trivial(definition, class) {
            self.inline.insert(id.to_string(), class.to_string());
        }
    }

    /// Final service id for an id or alias.
    pub(crate) fn lookup_id<'a>(&'a self, id: &'a str) -> Option<&'a str> {
        if self.ids.contains(id) {
            return Some(id);
        }
        self.aliases.get(id).map(String::as_str)
    }

    /// Known class of a service id.
    pub(crate) fn class_of(&self, id: &str) -> Option<&str> {
        self.classes
            .iter()
            .find(|(candidate, _)| candidate == id)
            .map(|(_, class)| class.as_str())
    }

    pub(crate) fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    // Shared services are never inlined: that would build them once per use.
    fn is_trivial(&self, definition: &Definition, class: &str) -> bool {
        matches!(definition.kind(), DefinitionKind::Object { .. })
            && !definition.is_shared()
            && !definition.is_deprecated()
            && definition.get_arguments().is_empty()
            && definition.get_method_calls().is_empty()
            && definition.get_properties().is_empty()
            && self
                .registry
                .class(class)
                .map(|metadata| metadata.is_trivially_instantiable())
                .unwrap_or(false)
    }
}

impl ServiceLookup for TypeIndex {
    fn find_by_type(&self, ty: &str) -> Option<ServiceMatch> {
        if is_builtin_type(ty) {
            return None;
        }

        let id = match self.lookup_id(ty) {
            Some(id) => id.to_string(),
            None => {
                let mut candidates = self
                    .classes
                    .iter()
                    .filter(|(_, class)| self.registry.is_subtype(class, ty));
                let (id, _) = candidates.next()?;
                if candidates.next().is_some() {
                    return None;
                }
                id.clone()
            }
        };

        Some(ServiceMatch {
            inline_class: self.inline.get(&id).cloned(),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{ClassMetadata, ParameterDescriptor};
    use crate::definition::BindingType;
    use crate::value::Value;

    fn registry() -> Arc<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        registry
            .register_class(
                ClassMetadata::new("FileLogger")
                    .implements("Logger")
                    .constructor(vec![], |_, _| Ok(Value::Null)),
            )
            .register_class(
                ClassMetadata::new("NullLogger")
                    .implements("Logger")
                    .constructor(vec![], |_, _| Ok(Value::Null)),
            )
            .register_class(ClassMetadata::new("Clock").constructor(
                vec![ParameterDescriptor::new("zone").with_default("UTC")],
                |_, _| Ok(Value::Null),
            ));
        Arc::new(registry)
    }

    #[test]
    fn test_unique_class_match() {
        let mut index = TypeIndex::new(registry(), BTreeMap::new());
        index.add("logger", &Definition::object("logger", "FileLogger"), Some("FileLogger"), true);

        let found = index.find_by_type("Logger").unwrap();
        assert_eq!(found.id, "logger");
        assert_eq!(found.inline_class, None);
        assert!(index.find_by_type("string").is_none());
    }

    #[test]
    fn test_ambiguous_class_match() {
        let mut index = TypeIndex::new(registry(), BTreeMap::new());
        index.add("file", &Definition::object("file", "FileLogger"), Some("FileLogger"), true);
        index.add("null", &Definition::object("null", "NullLogger"), Some("NullLogger"), true);

        assert!(index.find_by_type("Logger").is_none());
        assert_eq!(index.find_by_type("NullLogger").unwrap().id, "null");
    }

    #[test]
    fn test_alias_match_wins() {
        let aliases = BTreeMap::from([("Logger".to_string(), "null".to_string())]);
        let mut index = TypeIndex::new(registry(), aliases);
        index.add("file", &Definition::object("file", "FileLogger"), Some("FileLogger"), true);
        index.add("null", &Definition::object("null", "NullLogger"), Some("NullLogger"), true);

        assert_eq!(index.find_by_type("Logger").unwrap().id, "null");
    }

    #[test]
    fn test_only_non_shared_trivial_services_inline() {
        let mut transient = Definition::object("logger", "FileLogger");
        transient.set_binding_type(BindingType::Transient);
        let mut clock = Definition::object("clock", "Clock");
        clock.set_binding_type(BindingType::Transient);

        let mut index = TypeIndex::new(registry(), BTreeMap::new());
        index.add("logger", &transient, Some("FileLogger"), true);
        index.add("clock", &clock, Some("Clock"), true);
        assert_eq!(index.find_by_type("FileLogger").unwrap().inline_class.as_deref(), Some("FileLogger"));
        assert_eq!(index.find_by_type("Clock").unwrap().inline_class, None);

        let mut index = TypeIndex::new(registry(), BTreeMap::new());
        index.add("logger", &Definition::object("logger", "FileLogger"), Some("FileLogger"), true);
        assert_eq!(index.find_by_type("FileLogger").unwrap().inline_class, None);

        let mut index = TypeIndex::new(registry(), BTreeMap::new());
        index.add("logger", &transient, Some("FileLogger"), false);
        assert_eq!(index.find_by_type("FileLogger").unwrap().inline_class, None);
    }
}
