//! Single traversal driver running any number of visitors.

use super::node::Node;
use crate::error::ContainerResult;

/// What a visitor wants done after entering a node.
#[derive(Debug, Clone, PartialEq)]
pub enum VisitAction {
    Continue,
    /// Do not descend into the node's children
    SkipChildren,
    /// Replace the node before later visitors and children see it
    Replace(Node),
    /// Abort the traversal
    Stop,
}

/// A pass over a node tree.
///
/// Visitors run in registration order on enter and leave. Returning an error
/// aborts the traversal.
pub trait NodeVisitor {
    fn before_traverse(&mut self, _nodes: &[Node]) -> ContainerResult<()> {
        Ok(())
    }

    fn enter_node(&mut self, _node: &Node) -> ContainerResult<VisitAction> {
        Ok(VisitAction::Continue)
    }

    /// Returning a node replaces the visited one.
    fn leave_node(&mut self, _node: &Node) -> ContainerResult<Option<Node>> {
        Ok(None)
    }

    fn after_traverse(&mut self, _nodes: &[Node]) -> ContainerResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Depth-first driver composing several visitors into one walk.
///
/// # Examples
///
/// ```rust
/// use viserio_container::ast::{Node, NodeTraverser, ThisDetector};
///
/// let mut nodes = vec![Node::closure(3, vec![], vec![
///     Node::ret(Some(Node::variable("this", 3)), 3),
/// ])];
///
/// let mut detector = ThisDetector::default();
/// NodeTraverser::new().add_visitor(&mut detector).traverse(&mut nodes)?;
/// assert!(detector.uses_this());
/// # Ok::<(), viserio_container::ContainerError>(())
/// ```
#[derive(Default)]
pub struct NodeTraverser<'a> {
    visitors: Vec<&'a mut dyn NodeVisitor>,
}

impl<'a> NodeTraverser<'a> {
    pub fn new() -> Self {
        Self { visitors: Vec::new() }
    }

    pub fn add_visitor(&mut self, visitor: &'a mut dyn NodeVisitor) -> &mut Self {
        self.visitors.push(visitor);
        self
    }

    pub fn traverse(&mut self, nodes: &mut [Node]) -> ContainerResult<()> {
        for visitor in self.visitors.iter_mut() {
            visitor.before_traverse(nodes)?;
        }

        for node in nodes.iter_mut() {
            if self.traverse_node(node)? == Flow::Stop {
                break;
            }
        }

        for visitor in self.visitors.iter_mut() {
            visitor.after_traverse(nodes)?;
        }

        Ok(())
    }

    fn traverse_node(&mut self, node: &mut Node) -> ContainerResult<Flow> {
        let mut descend = true;
        for visitor in self.visitors.iter_mut() {
            match visitor.enter_node(node)? {
                VisitAction::Continue => {}
                VisitAction::SkipChildren => descend = false,
                VisitAction::Replace(replacement) => *node = replacement,
                VisitAction::Stop => return Ok(Flow::Stop),
            }
        }

        if descend {
            for child in node.children_mut() {
                if self.traverse_node(child)? == Flow::Stop {
                    return Ok(Flow::Stop);
                }
            }
        }

        for visitor in self.visitors.iter_mut() {
            if let Some(replacement) = visitor.leave_node(node)? {
                *node = replacement;
            }
        }

        Ok(Flow::Continue)
    }
}
