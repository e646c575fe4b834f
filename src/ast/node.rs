//! Node taxonomy consumed by the closure analysis passes.

use std::iter;

/// Compile-time constants whose value depends on where code is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagicConstant {
    Class,
    Dir,
    File,
    Function,
    Line,
    Method,
    Namespace,
    Trait,
}

impl MagicConstant {
    pub const ALL: [MagicConstant; 8] = [
        MagicConstant::Class,
        MagicConstant::Dir,
        MagicConstant::File,
        MagicConstant::Function,
        MagicConstant::Line,
        MagicConstant::Method,
        MagicConstant::Namespace,
        MagicConstant::Trait,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MagicConstant::Class => "__CLASS__",
            MagicConstant::Dir => "__DIR__",
            MagicConstant::File => "__FILE__",
            MagicConstant::Function => "__FUNCTION__",
            MagicConstant::Line => "__LINE__",
            MagicConstant::Method => "__METHOD__",
            MagicConstant::Namespace => "__NAMESPACE__",
            MagicConstant::Trait => "__TRAIT__",
        }
    }
}

/// Formal parameter of a function-like node.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_hint: Option<String>,
    pub default: Option<Box<Node>>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default: None,
        }
    }

    pub fn typed(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: Some(type_hint.into()),
            default: None,
        }
    }

    pub fn with_default(mut self, default: Node) -> Self {
        self.default = Some(Box::new(default));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Namespace { name: Option<String>, body: Vec<Node> },
    Class { name: String, body: Vec<Node> },
    Trait { name: String, body: Vec<Node> },
    Function { name: String, params: Vec<Param>, body: Vec<Node> },
    Method { name: String, is_static: bool, params: Vec<Param>, body: Vec<Node> },
    Closure { params: Vec<Param>, uses: Vec<String>, is_static: bool, body: Vec<Node> },
    ArrowFunction { params: Vec<Param>, is_static: bool, expr: Box<Node> },
    Variable(String),
    MagicConstant(MagicConstant),
    String(String),
    Int(i64),
    Bool(bool),
    Null,
    Call { callee: Box<Node>, args: Vec<Node> },
    MethodCall { target: Box<Node>, method: String, args: Vec<Node> },
    New { class: String, args: Vec<Node> },
    Return(Option<Box<Node>>),
    Expression(Box<Node>),
    /// Opaque code, printed verbatim
    Raw(String),
}

/// A syntax node and the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub line: u32,
}

impl Node {
    pub fn new(kind: NodeKind, line: u32) -> Self {
        Self { kind, line }
    }

    pub fn namespace(name: Option<&str>, line: u32, body: Vec<Node>) -> Self {
        Self::new(
            NodeKind::Namespace {
                name: name.map(str::to_string),
                body,
            },
            line,
        )
    }

    pub fn class(name: impl Into<String>, line: u32, body: Vec<Node>) -> Self {
        Self::new(NodeKind::Class { name: name.into(), body }, line)
    }

    pub fn trait_decl(name: impl Into<String>, line: u32, body: Vec<Node>) -> Self {
        Self::new(NodeKind::Trait { name: name.into(), body }, line)
    }

    pub fn function(name: impl Into<String>, line: u32, params: Vec<Param>, body: Vec<Node>) -> Self {
        Self::new(
            NodeKind::Function {
                name: name.into(),
                params,
                body,
            },
            line,
        )
    }

    pub fn method(name: impl Into<String>, line: u32, params: Vec<Param>, body: Vec<Node>) -> Self {
        Self::new(
            NodeKind::Method {
                name: name.into(),
                is_static: false,
                params,
                body,
            },
            line,
        )
    }

    pub fn closure(line: u32, params: Vec<Param>, body: Vec<Node>) -> Self {
        Self::new(
            NodeKind::Closure {
                params,
                uses: Vec::new(),
                is_static: false,
                body,
            },
            line,
        )
    }

    pub fn arrow(line: u32, params: Vec<Param>, expr: Node) -> Self {
        Self::new(
            NodeKind::ArrowFunction {
                params,
                is_static: false,
                expr: Box::new(expr),
            },
            line,
        )
    }

    pub fn variable(name: impl Into<String>, line: u32) -> Self {
        Self::new(NodeKind::Variable(name.into()), line)
    }

    pub fn magic(constant: MagicConstant, line: u32) -> Self {
        Self::new(NodeKind::MagicConstant(constant), line)
    }

    pub fn string(value: impl Into<String>, line: u32) -> Self {
        Self::new(NodeKind::String(value.into()), line)
    }

    pub fn int(value: i64, line: u32) -> Self {
        Self::new(NodeKind::Int(value), line)
    }

    pub fn call(callee: Node, args: Vec<Node>, line: u32) -> Self {
        Self::new(
            NodeKind::Call {
                callee: Box::new(callee),
                args,
            },
            line,
        )
    }

    pub fn method_call(target: Node, method: impl Into<String>, args: Vec<Node>, line: u32) -> Self {
        Self::new(
            NodeKind::MethodCall {
                target: Box::new(target),
                method: method.into(),
                args,
            },
            line,
        )
    }

    pub fn new_object(class: impl Into<String>, args: Vec<Node>, line: u32) -> Self {
        Self::new(NodeKind::New { class: class.into(), args }, line)
    }

    pub fn ret(expr: Option<Node>, line: u32) -> Self {
        Self::new(NodeKind::Return(expr.map(Box::new)), line)
    }

    pub fn expression(expr: Node, line: u32) -> Self {
        Self::new(NodeKind::Expression(Box::new(expr)), line)
    }

    /// Closures and arrow functions.
    pub fn is_closure(&self) -> bool {
        matches!(self.kind, NodeKind::Closure { .. } | NodeKind::ArrowFunction { .. })
    }

    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Namespace { body, .. } | NodeKind::Class { body, .. } | NodeKind::Trait { body, .. } => {
                body.iter().collect()
            }
            NodeKind::Function { params, body, .. }
            | NodeKind::Method { params, body, .. }
            | NodeKind::Closure { params, body, .. } => params
                .iter()
                .filter_map(|param| param.default.as_deref())
                .chain(body.iter())
                .collect(),
            NodeKind::ArrowFunction { params, expr, .. } => params
                .iter()
                .filter_map(|param| param.default.as_deref())
                .chain(iter::once(expr.as_ref()))
                .collect(),
            NodeKind::Call { callee: target, args } | NodeKind::MethodCall { target, args, .. } => {
                iter::once(target.as_ref()).chain(args.iter()).collect()
            }
            NodeKind::New { args, .. } => args.iter().collect(),
            NodeKind::Return(Some(expr)) | NodeKind::Expression(expr) => vec![expr.as_ref()],
            _ => Vec::new(),
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Node> {
        match &mut self.kind {
            NodeKind::Namespace { body, .. } | NodeKind::Class { body, .. } | NodeKind::Trait { body, .. } => {
                body.iter_mut().collect()
            }
            NodeKind::Function { params, body, .. }
            | NodeKind::Method { params, body, .. }
            | NodeKind::Closure { params, body, .. } => params
                .iter_mut()
                .filter_map(|param| param.default.as_deref_mut())
                .chain(body.iter_mut())
                .collect(),
            NodeKind::ArrowFunction { params, expr, .. } => params
                .iter_mut()
                .filter_map(|param| param.default.as_deref_mut())
                .chain(iter::once(expr.as_mut()))
                .collect(),
            NodeKind::Call { callee: target, args } | NodeKind::MethodCall { target, args, .. } => {
                iter::once(target.as_mut()).chain(args.iter_mut()).collect()
            }
            NodeKind::New { args, .. } => args.iter_mut().collect(),
            NodeKind::Return(Some(expr)) | NodeKind::Expression(expr) => vec![expr.as_mut()],
            _ => Vec::new(),
        }
    }
}
