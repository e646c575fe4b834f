//! Replaces magic constants with the values they had at the declaration site.

use super::location::ClosureLocation;
use super::node::{MagicConstant, Node, NodeKind};
use super::traverser::NodeVisitor;
use crate::error::ContainerResult;

/// Rewrites magic constants into literals.
///
/// Code moved into a generated container would otherwise report the
/// generated file, class and line. Every constant becomes a string literal
/// except the line constant, which becomes an integer literal holding the
/// line the constant was written on.
#[derive(Debug, Clone)]
pub struct MagicConstantRewriter {
    location: ClosureLocation,
}

impl MagicConstantRewriter {
    pub fn new(location: ClosureLocation) -> Self {
        Self { location }
    }

    /// Literal kind a constant turns into.
    pub fn literal(&self, constant: MagicConstant, line: u32) -> NodeKind {
        let text = |value: &Option<String>| NodeKind::String(value.clone().unwrap_or_default());
        match constant {
            MagicConstant::Class => text(&self.location.class),
            MagicConstant::Dir => text(&self.location.directory),
            MagicConstant::File => text(&self.location.file),
            MagicConstant::Function => text(&self.location.function),
            MagicConstant::Line => NodeKind::Int(line as i64),
            MagicConstant::Method => text(&self.location.method),
            MagicConstant::Namespace => text(&self.location.namespace),
            MagicConstant::Trait => text(&self.location.trait_name),
        }
    }
}

impl NodeVisitor for MagicConstantRewriter {
    fn leave_node(&mut self, node: &Node) -> ContainerResult<Option<Node>> {
        match &node.kind {
            NodeKind::MagicConstant(constant) => {
                Ok(Some(Node::new(self.literal(*constant, node.line), node.line)))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::traverser::NodeTraverser;

    fn location() -> ClosureLocation {
        ClosureLocation {
            directory: Some("/srv/app".into()),
            file: Some("/srv/app/services.php".into()),
            namespace: Some("App".into()),
            class: Some("App::Kernel".into()),
            trait_name: Some("App::Boots".into()),
            function: Some("boot".into()),
            method: Some("App::Kernel::boot".into()),
            line: Some(12),
        }
    }

    fn rewrite(constant: MagicConstant) -> NodeKind {
        let mut nodes = vec![Node::magic(constant, 14)];
        let mut rewriter = MagicConstantRewriter::new(location());
        NodeTraverser::new().add_visitor(&mut rewriter).traverse(&mut nodes).unwrap();
        nodes.remove(0).kind
    }

    #[test]
    fn test_class_constant() {
        assert_eq!(rewrite(MagicConstant::Class), NodeKind::String("App::Kernel".into()));
    }

    #[test]
    fn test_dir_constant() {
        assert_eq!(rewrite(MagicConstant::Dir), NodeKind::String("/srv/app".into()));
    }

    #[test]
    fn test_file_constant() {
        assert_eq!(rewrite(MagicConstant::File), NodeKind::String("/srv/app/services.php".into()));
    }

    #[test]
    fn test_function_constant() {
        assert_eq!(rewrite(MagicConstant::Function), NodeKind::String("boot".into()));
    }

    #[test]
    fn test_line_constant_is_integer() {
        assert_eq!(rewrite(MagicConstant::Line), NodeKind::Int(14));
    }

    #[test]
    fn test_method_constant() {
        assert_eq!(rewrite(MagicConstant::Method), NodeKind::String("App::Kernel::boot".into()));
    }

    #[test]
    fn test_namespace_constant() {
        assert_eq!(rewrite(MagicConstant::Namespace), NodeKind::String("App".into()));
    }

    #[test]
    fn test_trait_constant() {
        assert_eq!(rewrite(MagicConstant::Trait), NodeKind::String("App::Boots".into()));
    }

    #[test]
    fn test_nested_constants_are_rewritten() {
        let mut nodes = vec![Node::closure(
            12,
            vec![],
            vec![Node::ret(
                Some(Node::new_object(
                    "Logger",
                    vec![Node::magic(MagicConstant::Dir, 13), Node::magic(MagicConstant::Line, 13)],
                    13,
                )),
                13,
            )],
        )];
        let mut rewriter = MagicConstantRewriter::new(location());
        NodeTraverser::new().add_visitor(&mut rewriter).traverse(&mut nodes).unwrap();

        let NodeKind::Closure { body, .. } = &nodes[0].kind else {
            panic!("expected closure");
        };
        let NodeKind::Return(Some(expr)) = &body[0].kind else {
            panic!("expected return");
        };
        let NodeKind::New { args, .. } = &expr.kind else {
            panic!("expected new");
        };
        assert_eq!(args[0].kind, NodeKind::String("/srv/app".into()));
        assert_eq!(args[1].kind, NodeKind::Int(13));
    }
}
