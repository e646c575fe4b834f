//! Renders nodes back to source text for the emitter.

use super::node::{MagicConstant, Node, NodeKind, Param};
use super::this_detector::SELF_VARIABLE;

const INDENT: &str = "    ";

/// Pretty printer producing Rust-flavoured source.
///
/// Closures print as `move` closures with untyped parameters, the self
/// variable prints as `self`, and any magic constant that was not rewritten
/// falls back to the closest compiler macro.
#[derive(Debug, Clone, Copy, Default)]
pub struct Printer {
    base_depth: usize,
}

impl Printer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indents nested blocks relative to `depth` levels.
    pub fn with_depth(depth: usize) -> Self {
        Self { base_depth: depth }
    }

    pub fn print(&self, node: &Node) -> String {
        self.node(node, self.base_depth)
    }

    pub fn print_all(&self, nodes: &[Node]) -> String {
        nodes
            .iter()
            .map(|node| format!("{}{}", indent(self.base_depth), self.statement(node, self.base_depth)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn statement(&self, node: &Node, depth: usize) -> String {
        match &node.kind {
            NodeKind::Return(Some(expr)) => format!("return {};", self.node(expr, depth)),
            NodeKind::Return(None) => "return;".to_string(),
            NodeKind::Expression(expr) => format!("{};", self.node(expr, depth)),
            _ => self.node(node, depth),
        }
    }

    fn block(&self, body: &[Node], depth: usize) -> String {
        if body.is_empty() {
            return "{}".to_string();
        }

        let mut out = String::from("{\n");
        for node in body {
            out.push_str(&indent(depth + 1));
            out.push_str(&self.statement(node, depth + 1));
            out.push('\n');
        }
        out.push_str(&indent(depth));
        out.push('}');
        out
    }

    fn node(&self, node: &Node, depth: usize) -> String {
        match &node.kind {
            NodeKind::Namespace { name: Some(name), body } => {
                format!("mod {} {}", name.replace("::", "_"), self.block(body, depth))
            }
            NodeKind::Namespace { name: None, body } => self.block(body, depth),
            NodeKind::Class { name, body } => format!("impl {} {}", name, self.block(body, depth)),
            NodeKind::Trait { name, body } => format!("trait {} {}", name, self.block(body, depth)),
            NodeKind::Function { name, params, body } | NodeKind::Method { name, params, body, .. } => {
                format!("fn {}({}) {}", name, params_list(params), self.block(body, depth))
            }
            NodeKind::Closure { params, body, .. } => {
                format!("move |{}| {}", closure_params(params), self.block(body, depth))
            }
            NodeKind::ArrowFunction { params, expr, .. } => {
                format!("move |{}| {}", closure_params(params), self.node(expr, depth))
            }
            NodeKind::Variable(name) if name == SELF_VARIABLE => "self".to_string(),
            NodeKind::Variable(name) => name.clone(),
            NodeKind::MagicConstant(constant) => fallback(*constant),
            NodeKind::String(value) => format!("{:?}", value),
            NodeKind::Int(value) => value.to_string(),
            NodeKind::Bool(value) => value.to_string(),
            NodeKind::Null => "None".to_string(),
            NodeKind::Call { callee, args } => {
                format!("{}({})", self.node(callee, depth), self.args(args, depth))
            }
            NodeKind::MethodCall { target, method, args } => format!(
                "{}.{}({})",
                self.node(target, depth),
                method,
                self.args(args, depth)
            ),
            NodeKind::New { class, args } => format!("{}::new({})", class, self.args(args, depth)),
            NodeKind::Return(_) | NodeKind::Expression(_) => self.statement(node, depth),
            NodeKind::Raw(code) => code.clone(),
        }
    }

    fn args(&self, args: &[Node], depth: usize) -> String {
        args.iter()
            .map(|arg| self.node(arg, depth))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn indent(depth: usize) -> String {
    INDENT.repeat(depth)
}

fn closure_params(params: &[Param]) -> String {
    params
        .iter()
        .map(|param| param.name.clone())
        .collect::<Vec<_>>()
        .join(", ")
}

fn params_list(params: &[Param]) -> String {
    params
        .iter()
        .map(|param| match &param.type_hint {
            Some(type_hint) => format!("{}: {}", param.name, type_hint),
            None => param.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn fallback(constant: MagicConstant) -> String {
    match constant {
        MagicConstant::File => "file!()".to_string(),
        MagicConstant::Line => "line!()".to_string(),
        MagicConstant::Namespace => "module_path!()".to_string(),
        MagicConstant::Dir => "env!(\"CARGO_MANIFEST_DIR\")".to_string(),
        other => format!("{:?}", other.name()),
    }
}
