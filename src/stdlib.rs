use std::io::BufRead;

use indexmap::IndexMap;

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, Result, SeleneError, SourcePos},
    environment::ScopeChain,
    value::Value,
};

/// A builtin receives the current scope chain and the already-evaluated
/// argument values. Builtins are looked up ahead of user-defined functions.
pub type BuiltinFn = fn(&mut ScopeChain, &[Value]) -> Result<Value>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    /// `None` accepts any argument count.
    pub arity: Option<usize>,
    callback: BuiltinFn,
}

impl Builtin {
    pub fn call(&self, chain: &mut ScopeChain, args: &[Value], pos: SourcePos) -> Result<Value> {
        if let Some(arity) = self.arity {
            if args.len() != arity {
                return Err(SeleneError::from(
                    Diagnostic::new(
                        DiagnosticKind::Argument,
                        format!(
                            "`{}` expects {arity} arguments but got {}",
                            self.name,
                            args.len()
                        ),
                    )
                    .at(pos),
                ));
            }
        }
        (self.callback)(chain, args).map_err(|err| match err {
            SeleneError::Diagnostic(diag) if diag.pos.is_none() => {
                SeleneError::from(diag.at(pos))
            }
            other => other,
        })
    }
}

/// The builtin function table installed into every interpreter.
pub fn install() -> IndexMap<&'static str, Builtin> {
    let mut builtins = IndexMap::new();
    for builtin in [
        native("print", None, io_print),
        native("println", None, io_println),
        native("typeof", Some(1), value_typeof),
        native("len", Some(1), value_len),
        native("str", Some(1), convert_str),
        native("to_int", Some(1), convert_to_int),
        native("to_double", Some(1), convert_to_double),
        native("input", Some(0), io_input),
        native("range", Some(2), array_range),
        native("assert", None, check_assert),
    ] {
        builtins.insert(builtin.name, builtin);
    }
    builtins
}

fn native(name: &'static str, arity: Option<usize>, callback: BuiltinFn) -> Builtin {
    Builtin {
        name,
        arity,
        callback,
    }
}

fn error(message: impl Into<String>) -> SeleneError {
    SeleneError::from(Diagnostic::new(DiagnosticKind::Runtime, message))
}

fn io_print(_chain: &mut ScopeChain, args: &[Value]) -> Result<Value> {
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            print!(" ");
        }
        print!("{arg}");
    }
    Ok(Value::Null)
}

fn io_println(chain: &mut ScopeChain, args: &[Value]) -> Result<Value> {
    io_print(chain, args)?;
    println!();
    Ok(Value::Null)
}

fn value_typeof(_chain: &mut ScopeChain, args: &[Value]) -> Result<Value> {
    Ok(Value::String(args[0].type_name().to_string()))
}

fn value_len(_chain: &mut ScopeChain, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::Array(items) => Ok(Value::Int(items.len() as i64)),
        other => Err(error(format!(
            "`len` expects String or Array, found {}",
            other.type_name()
        ))),
    }
}

fn convert_str(_chain: &mut ScopeChain, args: &[Value]) -> Result<Value> {
    Ok(Value::String(args[0].to_string()))
}

fn convert_to_int(_chain: &mut ScopeChain, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Double(n) => Ok(Value::Int(*n as i64)),
        Value::Char(c) => Ok(Value::Int(*c as i64)),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| error(format!("`to_int` cannot parse `{s}`"))),
        other => Err(error(format!(
            "`to_int` expects Int, Double, Char, or String, found {}",
            other.type_name()
        ))),
    }
}

fn convert_to_double(_chain: &mut ScopeChain, args: &[Value]) -> Result<Value> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Double(*n as f64)),
        Value::Double(n) => Ok(Value::Double(*n)),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Value::Double)
            .map_err(|_| error(format!("`to_double` cannot parse `{s}`"))),
        other => Err(error(format!(
            "`to_double` expects Int, Double, or String, found {}",
            other.type_name()
        ))),
    }
}

fn io_input(_chain: &mut ScopeChain, _args: &[Value]) -> Result<Value> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Value::String(line))
}

/// `range(start, end)` builds `[start, end)` counting toward `end` in steps
/// of one in either direction.
fn array_range(_chain: &mut ScopeChain, args: &[Value]) -> Result<Value> {
    let (start, end) = match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => (*a, *b),
        _ => {
            return Err(error(format!(
                "`range` expects Int bounds, found {} and {}",
                args[0].type_name(),
                args[1].type_name()
            )));
        }
    };
    let step = if start <= end { 1 } else { -1 };
    let mut values = Vec::new();
    let mut current = start;
    while current != end {
        values.push(Value::Int(current));
        current += step;
    }
    Ok(Value::Array(values))
}

fn check_assert(_chain: &mut ScopeChain, args: &[Value]) -> Result<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(SeleneError::from(Diagnostic::new(
            DiagnosticKind::Argument,
            format!("`assert` expects 1 or 2 arguments but got {}", args.len()),
        )));
    }
    let passed = match &args[0] {
        Value::Bool(b) => *b,
        other => {
            return Err(error(format!(
                "`assert` expects a Bool condition, found {}",
                other.type_name()
            )));
        }
    };
    if !passed {
        let message = match args.get(1) {
            Some(value) => format!("assertion failed: {value}"),
            None => "assertion failed".to_string(),
        };
        return Err(error(message));
    }
    Ok(Value::Null)
}
