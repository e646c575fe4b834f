//! Where a closure was declared.

use std::path::Path;

use super::node::{Node, NodeKind};
use super::traverser::{NodeVisitor, VisitAction};
use crate::error::{ContainerError, ContainerResult};

const NAMESPACE_SEPARATOR: &str = "::";

/// Declaration site of a closure.
///
/// Once resolved, `directory`, `file`, `function` and `line` are always
/// present and at most one of `class` / `trait_name` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureLocation {
    pub directory: Option<String>,
    pub file: Option<String>,
    pub namespace: Option<String>,
    pub class: Option<String>,
    pub trait_name: Option<String>,
    pub function: Option<String>,
    pub method: Option<String>,
    pub line: Option<u32>,
}

impl ClosureLocation {
    pub fn is_complete(&self) -> bool {
        self.directory.is_some() && self.file.is_some() && self.function.is_some() && self.line.is_some()
    }
}

/// Builds a [`ClosureLocation`] while the traversal enters and leaves scopes.
///
/// `directory` and `file` are known up front. Namespace, class, trait and
/// function are kept as stacks of open scopes: leaving a nested scope
/// restores the enclosing one. The innermost of each is frozen when the
/// closure on the target line is entered.
#[derive(Debug)]
pub struct LocationBuilder {
    line: u32,
    scope_class: Option<String>,
    location: ClosureLocation,
    namespaces: Vec<Option<String>>,
    classes: Vec<String>,
    traits: Vec<String>,
    functions: Vec<String>,
    found: bool,
}

impl LocationBuilder {
    /// `scope_class` is the class a trait closure is bound to at runtime.
    pub fn new(file: &Path, line: u32, scope_class: Option<&str>) -> Self {
        let location = ClosureLocation {
            directory: file.parent().map(|parent| parent.display().to_string()),
            file: Some(file.display().to_string()),
            ..ClosureLocation::default()
        };

        Self {
            line,
            scope_class: scope_class.map(str::to_string),
            location,
            namespaces: Vec::new(),
            classes: Vec::new(),
            traits: Vec::new(),
            functions: Vec::new(),
            found: false,
        }
    }

    /// Partial location, as far as the traversal got.
    pub fn location(&self) -> &ClosureLocation {
        &self.location
    }

    /// Resolves qualified names, the method and the class/trait precedence.
    pub fn finish(self) -> ContainerResult<ClosureLocation> {
        let mut location = self.location;
        if !self.found {
            return Err(ContainerError::Runtime(format!(
                "No closure found on line [{}] of [{}].",
                self.line,
                location.file.as_deref().unwrap_or_default()
            )));
        }

        let qualify = |name: String| match &location.namespace {
            Some(namespace) => format!("{}{}{}", namespace, NAMESPACE_SEPARATOR, name),
            None => name,
        };
        location.class = location.class.take().map(qualify);
        location.trait_name = location.trait_name.take().map(qualify);

        if location.trait_name.is_some() && location.class.is_none() {
            if let Some(scope) = self.scope_class {
                if Some(&scope) != location.trait_name.as_ref() {
                    location.class = Some(scope);
                }
            }
        }

        if location.class.is_some() {
            location.trait_name = None;
        }

        let function = location.function.take().unwrap_or_else(|| "{closure}".to_string());
        location.method = Some(match location.class.as_ref().or(location.trait_name.as_ref()) {
            Some(owner) => format!("{}{}{}", owner, NAMESPACE_SEPARATOR, function),
            None => function.clone(),
        });
        location.function = Some(function);

        if !location.is_complete() {
            return Err(ContainerError::Runtime(format!(
                "Incomplete location for closure on line [{}].",
                self.line
            )));
        }

        Ok(location)
    }
}

impl NodeVisitor for LocationBuilder {
    fn enter_node(&mut self, node: &Node) -> ContainerResult<VisitAction> {
        if self.found {
            return Ok(VisitAction::Continue);
        }

        match &node.kind {
            NodeKind::Namespace { name, .. } => self.namespaces.push(name.clone()),
            NodeKind::Class { name, .. } => self.classes.push(name.clone()),
            NodeKind::Trait { name, .. } => self.traits.push(name.clone()),
            NodeKind::Function { name, .. } | NodeKind::Method { name, .. } => self.functions.push(name.clone()),
            _ if node.is_closure() && node.line == self.line => {
                self.found = true;
                self.location.namespace = self.namespaces.last().cloned().flatten();
                self.location.class = self.classes.last().cloned();
                self.location.trait_name = self.traits.last().cloned();
                self.location.function = self.functions.last().cloned();
                self.location.line = Some(node.line);
            }
            _ => {}
        }

        Ok(VisitAction::Continue)
    }

    fn leave_node(&mut self, node: &Node) -> ContainerResult<Option<Node>> {
        if self.found {
            return Ok(None);
        }

        match &node.kind {
            NodeKind::Namespace { .. } => {
                self.namespaces.pop();
            }
            NodeKind::Class { .. } => {
                self.classes.pop();
            }
            NodeKind::Trait { .. } => {
                self.traits.pop();
            }
            NodeKind::Function { .. } | NodeKind::Method { .. } => {
                self.functions.pop();
            }
            _ => {}
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::traverser::NodeTraverser;

    fn build(nodes: &mut [Node], line: u32, scope: Option<&str>) -> ContainerResult<ClosureLocation> {
        let mut builder = LocationBuilder::new(Path::new("/srv/app/config/services.php"), line, scope);
        NodeTraverser::new().add_visitor(&mut builder).traverse(nodes)?;
        builder.finish()
    }

    #[test]
    fn test_closure_in_class_method() {
        let mut nodes = vec![Node::namespace(
            Some("App::Provider"),
            1,
            vec![Node::class(
                "MailProvider",
                3,
                vec![Node::method(
                    "register",
                    5,
                    vec![],
                    vec![Node::ret(Some(Node::closure(6, vec![], vec![])), 6)],
                )],
            )],
        )];

        let location = build(&mut nodes, 6, None).unwrap();

        assert_eq!(location.directory.as_deref(), Some("/srv/app/config"));
        assert_eq!(location.file.as_deref(), Some("/srv/app/config/services.php"));
        assert_eq!(location.namespace.as_deref(), Some("App::Provider"));
        assert_eq!(location.class.as_deref(), Some("App::Provider::MailProvider"));
        assert_eq!(location.trait_name, None);
        assert_eq!(location.function.as_deref(), Some("register"));
        assert_eq!(location.method.as_deref(), Some("App::Provider::MailProvider::register"));
        assert_eq!(location.line, Some(6));
    }

    #[test]
    fn test_scope_left_before_closure_is_cleared() {
        let mut nodes = vec![
            Node::class("Before", 1, vec![Node::method("boot", 2, vec![], vec![])]),
            Node::closure(10, vec![], vec![]),
        ];

        let location = build(&mut nodes, 10, None).unwrap();

        assert_eq!(location.class, None);
        assert_eq!(location.function.as_deref(), Some("{closure}"));
        assert_eq!(location.method.as_deref(), Some("{closure}"));
    }

    #[test]
    fn test_nested_function_restores_enclosing_method() {
        let mut nodes = vec![Node::class(
            "Kernel",
            1,
            vec![Node::method(
                "boot",
                2,
                vec![],
                vec![
                    Node::function("helper", 3, vec![], vec![]),
                    Node::expression(Node::closure(5, vec![], vec![]), 5),
                ],
            )],
        )];

        let location = build(&mut nodes, 5, None).unwrap();

        assert_eq!(location.class.as_deref(), Some("Kernel"));
        assert_eq!(location.function.as_deref(), Some("boot"));
        assert_eq!(location.method.as_deref(), Some("Kernel::boot"));
    }

    #[test]
    fn test_nested_class_restores_enclosing_class() {
        let mut nodes = vec![Node::namespace(
            Some("App"),
            1,
            vec![Node::class(
                "Outer",
                2,
                vec![
                    Node::class("Inner", 3, vec![]),
                    Node::method("make", 4, vec![], vec![Node::ret(Some(Node::closure(5, vec![], vec![])), 5)]),
                ],
            )],
        )];

        let location = build(&mut nodes, 5, None).unwrap();

        assert_eq!(location.class.as_deref(), Some("App::Outer"));
        assert_eq!(location.method.as_deref(), Some("App::Outer::make"));
    }

    #[test]
    fn test_trait_closure_prefers_bound_class() {
        let mut nodes = vec![Node::trait_decl(
            "Greets",
            1,
            vec![Node::method("greeter", 2, vec![], vec![Node::closure(3, vec![], vec![])])],
        )];

        let location = build(&mut nodes, 3, Some("Greeter")).unwrap();
        assert_eq!(location.class.as_deref(), Some("Greeter"));
        assert_eq!(location.trait_name, None);
        assert_eq!(location.method.as_deref(), Some("Greeter::greeter"));

        let location = build(&mut nodes, 3, None).unwrap();
        assert_eq!(location.class, None);
        assert_eq!(location.trait_name.as_deref(), Some("Greets"));
        assert_eq!(location.method.as_deref(), Some("Greets::greeter"));
    }

    #[test]
    fn test_missing_closure_is_an_error() {
        let mut nodes = vec![Node::closure(1, vec![], vec![])];
        assert!(build(&mut nodes, 2, None).is_err());
    }
}
