use std::rc::Rc;

use indexmap::IndexMap;

use crate::{diagnostics::SourcePos, value::Function};

#[derive(Debug, Clone, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogAnd,
    LogOr,
    LogNot,
    BitAnd,
    BitOr,
    BitNot,
}

impl BinaryOp {
    /// Operator spelling used in diagnostics.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogOr => "||",
            BinaryOp::LogNot => "!",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: SourcePos,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    NullLit,
    BoolLit(bool),
    CharLit(char),
    IntLit(i64),
    DoubleLit(f64),
    StringLit(String),
    ArrayLit(Vec<Expr>),
    Ident(String),
    /// `name[index]`; the target is always a variable looked up by name.
    Index {
        name: String,
        index: Box<Expr>,
    },
    /// A binary application. `rhs` of `None` marks a unary application of
    /// `op` to `lhs`; unary minus/not are not a separate node kind.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Option<Box<Expr>>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// `name(args)`; the callee is resolved by name at call time against
    /// builtins, named functions, then closure variables, in that order.
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// Anonymous `func (params) { ... }`; captures the chain at evaluation.
    Closure {
        params: Vec<String>,
        body: Rc<Vec<Stmt>>,
    },
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: SourcePos,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(Expr),
    If {
        condition: Expr,
        then_block: Vec<Stmt>,
        else_block: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    For {
        init: Expr,
        condition: Expr,
        post: Expr,
        body: Vec<Stmt>,
    },
    ForEach {
        binding: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Match {
        subject: Option<Expr>,
        arms: Vec<MatchArm>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    /// `None` is the wildcard `_`, which matches without evaluating anything.
    pub case: Option<Expr>,
    pub body: Vec<Stmt>,
    pub pos: SourcePos,
}

/// One parsed source unit: the ordered top-level statements plus the table
/// of named function declarations. Nodes are built once by the parser and
/// stay read-only for the lifetime of the run.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub functions: IndexMap<String, Rc<Function>>,
}
