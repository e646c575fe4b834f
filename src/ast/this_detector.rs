//! Detects use of the enclosing object inside a closure.

use super::node::{Node, NodeKind};
use super::traverser::{NodeVisitor, VisitAction};
use crate::error::ContainerResult;

pub const SELF_VARIABLE: &str = "this";

/// Sets a flag the first time the self variable is seen; never reset.
#[derive(Debug, Default)]
pub struct ThisDetector {
    uses_this: bool,
}

impl ThisDetector {
    pub fn uses_this(&self) -> bool {
        self.uses_this
    }
}

impl NodeVisitor for ThisDetector {
    fn enter_node(&mut self, node: &Node) -> ContainerResult<VisitAction> {
        if let NodeKind::Variable(name) = &node.kind {
            if name == SELF_VARIABLE {
                self.uses_this = true;
            }
        }
        Ok(VisitAction::Continue)
    }
}
