use std::{fmt, rc::Rc};

use crate::{
    ast::Stmt,
    diagnostics::{Diagnostic, DiagnosticKind, SeleneError, SourcePos},
    environment::ScopeRef,
};

/// Runtime value: a closed sum over the eight Selene kinds. Values obey
/// copy semantics — `clone` deep-copies an Array, so two variables never
/// alias the same element storage through ordinary assignment. A Closure
/// copy shares its captured scopes by design.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Closure(Function),
}

/// A callable unit: parameter names, a body, and the scope chain captured
/// at creation time. Named declarations carry no captured chain and start
/// every call from a fresh one.
#[derive(Clone)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Rc<Vec<Stmt>>,
    pub captured: Option<Vec<ScopeRef>>,
}

impl fmt::Debug for Function {
    // Captured scopes can reference the closure itself, so only the
    // signature is printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Char(_) => "Char",
            Value::Int(_) => "Int",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Closure(_) => "Closure",
        }
    }

    /// Conditions require Bool; no other kind has a truth value.
    pub fn expect_bool(&self, pos: SourcePos) -> Result<bool, SeleneError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(SeleneError::from(
                Diagnostic::new(
                    DiagnosticKind::Type,
                    format!("expected Bool condition, found {}", self.type_name()),
                )
                .at(pos),
            )),
        }
    }

    /// Structural value equality. Mismatched kinds compare unequal rather
    /// than failing, so match arms over mixed cases stay expressible.
    /// Closures are never equal to anything.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(l, r)| l.equals(r))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(values) => {
                write!(f, "[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Closure(fun) => write!(
                f,
                "<func {}>",
                fun.name.clone().unwrap_or_else(|| "anonymous".into())
            ),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Char(c) => write!(f, "'{c}'"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Array(values) => f.debug_list().entries(values.iter()).finish(),
            other => write!(f, "{other}"),
        }
    }
}
