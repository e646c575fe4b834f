//! Closure analysis over an already parsed syntax tree.
//!
//! The tree uses a small generic node taxonomy ([`Node`] / [`NodeKind`]).
//! Each concern is an independent [`NodeVisitor`]; a [`NodeTraverser`]
//! composes them into a single walk.

mod analyzer;
mod location;
mod locator;
mod magic_constants;
mod node;
mod printer;
mod this_detector;
mod traverser;

pub use analyzer::{AnalyzedClosure, ClosureAnalyzer, SourceMap, SourceUnit};
pub use location::{ClosureLocation, LocationBuilder};
pub use locator::{ClosureLocator, LocatorState};
pub use magic_constants::MagicConstantRewriter;
pub use node::{MagicConstant, Node, NodeKind, Param};
pub use printer::Printer;
pub use this_detector::{ThisDetector, SELF_VARIABLE};
pub use traverser::{NodeTraverser, NodeVisitor, VisitAction};
