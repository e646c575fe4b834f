//! Finds the closure declared on a given line.

use std::path::PathBuf;

use super::node::Node;
use super::traverser::{NodeVisitor, VisitAction};
use crate::error::{ContainerError, ContainerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorState {
    Searching,
    Found,
    /// A second closure started on the target line; terminal
    Ambiguous,
}

/// Locates a closure by the line its declaration starts on.
///
/// Line numbers are all the runtime knows about a closure, so a second
/// closure starting on the same line makes the lookup fail instead of
/// picking one of them.
#[derive(Debug)]
pub struct ClosureLocator {
    file: PathBuf,
    line: u32,
    state: LocatorState,
    closure: Option<Node>,
}

impl ClosureLocator {
    pub fn new(file: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            state: LocatorState::Searching,
            closure: None,
        }
    }

    pub fn state(&self) -> LocatorState {
        self.state
    }

    pub fn closure(&self) -> Option<&Node> {
        self.closure.as_ref()
    }

    pub fn into_closure(self) -> Option<Node> {
        self.closure
    }

    fn ambiguous(&self) -> ContainerError {
        ContainerError::AmbiguousClosure {
            file: self.file.clone(),
            line: self.line,
        }
    }
}

impl NodeVisitor for ClosureLocator {
    fn enter_node(&mut self, node: &Node) -> ContainerResult<VisitAction> {
        if !node.is_closure() || node.line != self.line {
            return Ok(VisitAction::Continue);
        }

        match self.state {
            LocatorState::Searching => {
                self.closure = Some(node.clone());
                self.state = LocatorState::Found;
                Ok(VisitAction::Continue)
            }
            LocatorState::Found | LocatorState::Ambiguous => {
                self.state = LocatorState::Ambiguous;
                self.closure = None;
                Err(self.ambiguous())
            }
        }
    }
}
