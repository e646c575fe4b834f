//! Closure analysis: locate, describe, inspect and rewrite one closure.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::location::{ClosureLocation, LocationBuilder};
use super::locator::ClosureLocator;
use super::magic_constants::MagicConstantRewriter;
use super::node::Node;
use super::printer::Printer;
use super::this_detector::ThisDetector;
use super::traverser::NodeTraverser;
use crate::error::{ContainerError, ContainerResult};
use crate::reflection::ClosureReference;

/// Parsed nodes of one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub nodes: Vec<Node>,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, nodes: Vec<Node>) -> Self {
        Self {
            path: path.into(),
            nodes,
        }
    }
}

/// Parsed source units by path.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    units: HashMap<PathBuf, SourceUnit>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, unit: SourceUnit) -> &mut Self {
        self.units.insert(unit.path.clone(), unit);
        self
    }

    pub fn get(&self, path: &Path) -> Option<&SourceUnit> {
        self.units.get(path)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// A closure ready to be relocated into generated code.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedClosure {
    /// Closure node with magic constants rewritten
    pub node: Node,
    pub location: ClosureLocation,
    pub uses_this: bool,
}

impl AnalyzedClosure {
    pub fn source(&self, depth: usize) -> String {
        Printer::with_depth(depth).print(&self.node)
    }
}

/// Runs the closure passes over a source unit.
///
/// The first traversal locates the closure and builds its location; the
/// second runs over the extracted closure only, detecting self references
/// and rewriting magic constants.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClosureAnalyzer;

impl ClosureAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, unit: &SourceUnit, reference: &ClosureReference) -> ContainerResult<AnalyzedClosure> {
        let mut nodes = unit.nodes.clone();
        let mut locator = ClosureLocator::new(&unit.path, reference.line);
        let mut builder = LocationBuilder::new(&unit.path, reference.line, reference.scope_class.as_deref());

        NodeTraverser::new()
            .add_visitor(&mut locator)
            .add_visitor(&mut builder)
            .traverse(&mut nodes)?;

        let Some(closure) = locator.into_closure() else {
            return Err(ContainerError::Runtime(format!(
                "No closure declared on line [{}] of [{}].",
                reference.line,
                unit.path.display()
            )));
        };
        let location = builder.finish()?;

        let mut detector = ThisDetector::default();
        let mut rewriter = MagicConstantRewriter::new(location.clone());
        let mut extracted = vec![closure];
        NodeTraverser::new()
            .add_visitor(&mut detector)
            .add_visitor(&mut rewriter)
            .traverse(&mut extracted)?;

        debug!(
            file = %unit.path.display(),
            line = reference.line,
            uses_this = detector.uses_this(),
            "analyzed closure"
        );

        Ok(AnalyzedClosure {
            node: extracted.remove(0),
            location,
            uses_this: detector.uses_this(),
        })
    }

    /// Looks the closure's file up in `sources` first.
    pub fn analyze_in(&self, sources: &SourceMap, reference: &ClosureReference) -> ContainerResult<AnalyzedClosure> {
        let unit = sources.get(&reference.file).ok_or_else(|| {
            ContainerError::Runtime(format!(
                "No parsed source loaded for [{}].",
                reference.file.display()
            ))
        })?;
        self.analyze(unit, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::{MagicConstant, NodeKind, Param};
    use crate::value::Value;

    fn reference(line: u32) -> ClosureReference {
        ClosureReference::new("/srv/app/services.php", line, vec![], |_, _| Ok(Value::Null))
    }

    fn unit() -> SourceUnit {
        SourceUnit::new(
            "/srv/app/services.php",
            vec![Node::namespace(
                Some("App"),
                1,
                vec![
                    Node::closure(
                        3,
                        vec![Param::new("container")],
                        vec![Node::ret(Some(Node::magic(MagicConstant::Namespace, 4)), 4)],
                    ),
                    Node::closure(
                        6,
                        vec![],
                        vec![Node::ret(Some(Node::method_call(Node::variable("this", 7), "logger", vec![], 7)), 7)],
                    ),
                ],
            )],
        )
    }

    #[test]
    fn test_analyze_rewrites_and_detects() {
        let analyzed = ClosureAnalyzer::new().analyze(&unit(), &reference(3)).unwrap();

        assert!(!analyzed.uses_this);
        assert_eq!(analyzed.location.namespace.as_deref(), Some("App"));
        let NodeKind::Closure { body, .. } = &analyzed.node.kind else {
            panic!("expected closure");
        };
        assert_eq!(body[0].kind, NodeKind::Return(Some(Box::new(Node::string("App", 4)))));

        let analyzed = ClosureAnalyzer::new().analyze(&unit(), &reference(6)).unwrap();
        assert!(analyzed.uses_this);
        assert_eq!(analyzed.source(0), "move || {\n    return self.logger();\n}");
    }

    #[test]
    fn test_missing_source_unit() {
        let error = ClosureAnalyzer::new()
            .analyze_in(&SourceMap::new(), &reference(3))
            .unwrap_err();
        assert!(matches!(error, ContainerError::Runtime(_)));
    }

    #[test]
    fn test_missing_closure() {
        let error = ClosureAnalyzer::new().analyze(&unit(), &reference(99)).unwrap_err();
        assert!(error.to_string().contains("line [99]"));
    }
}
