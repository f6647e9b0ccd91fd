use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    ast::{AssignOp, BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind},
    diagnostics::{Diagnostic, DiagnosticKind, Result, SeleneError, SourcePos},
    environment::ScopeChain,
    parser,
    stdlib::{self, Builtin},
    value::{Function, Value},
};

/// The control-flow outcome of interpreting one statement. Constructs
/// running a statement sequence stop at the first non-Normal signal and
/// forward it unchanged; loops intercept Break and Continue, the call
/// boundary intercepts Return.
#[derive(Debug)]
pub enum ExecSignal {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Tree-walking evaluator. Holds the named-function and builtin tables plus
/// the global scope chain, which persists across `eval_source` calls so a
/// REPL session accumulates state.
pub struct Interpreter {
    functions: IndexMap<String, Rc<Function>>,
    builtins: IndexMap<&'static str, Builtin>,
    globals: ScopeChain,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let mut globals = ScopeChain::new();
        globals.push_scope();
        Self {
            functions: IndexMap::new(),
            builtins: stdlib::install(),
            globals,
        }
    }

    /// Parse and run a source unit. The result is the value of the last
    /// top-level expression statement, or of a top-level `return`.
    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        let program = parser::parse_program(source).map_err(SeleneError::from)?;
        self.run(program)
    }

    pub fn run(&mut self, program: Program) -> Result<Value> {
        for (name, function) in program.functions {
            self.functions.insert(name, function);
        }
        let mut chain = std::mem::take(&mut self.globals);
        let result = self.eval_toplevel(&program.body, &mut chain);
        self.globals = chain;
        result
    }

    fn eval_toplevel(&self, body: &[Stmt], chain: &mut ScopeChain) -> Result<Value> {
        let mut last_value = Value::Null;
        for stmt in body {
            if let StmtKind::Expr(expr) = &stmt.kind {
                last_value = self.evaluate(expr, chain)?;
                continue;
            }
            match self.execute_statement(stmt, chain)? {
                ExecSignal::Normal => {}
                ExecSignal::Return(value) => return Ok(value),
                ExecSignal::Break => {
                    return Err(fail(
                        DiagnosticKind::Runtime,
                        "`break` outside loop".into(),
                        stmt.pos,
                    ));
                }
                ExecSignal::Continue => {
                    return Err(fail(
                        DiagnosticKind::Runtime,
                        "`continue` outside loop".into(),
                        stmt.pos,
                    ));
                }
            }
        }
        Ok(last_value)
    }

    fn execute_statement(&self, stmt: &Stmt, chain: &mut ScopeChain) -> Result<ExecSignal> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.evaluate(expr, chain)?;
                Ok(ExecSignal::Normal)
            }
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                // Only the taken branch gets a scope.
                if self.evaluate(condition, chain)?.expect_bool(condition.pos)? {
                    self.execute_scoped(then_block, chain)
                } else if let Some(block) = else_block {
                    self.execute_scoped(block, chain)
                } else {
                    Ok(ExecSignal::Normal)
                }
            }
            StmtKind::While { condition, body } => {
                // One scope for the loop's whole lifetime, never per
                // iteration: variables created in the body survive into
                // later iterations.
                chain.push_scope();
                let result = self.run_while(condition, body, chain);
                chain.pop_scope();
                result
            }
            StmtKind::For {
                init,
                condition,
                post,
                body,
            } => {
                chain.push_scope();
                let result = self.run_for(init, condition, post, body, chain);
                chain.pop_scope();
                result
            }
            StmtKind::ForEach {
                binding,
                iterable,
                body,
            } => {
                chain.push_scope();
                let result = self.run_foreach(binding, iterable, body, chain);
                chain.pop_scope();
                result
            }
            StmtKind::Match { subject, arms } => {
                let subject_value = match subject {
                    Some(expr) => self.evaluate(expr, chain)?,
                    // Subjectless match compares every case against true,
                    // so the arms act as guard conditions.
                    None => Value::Bool(true),
                };
                for arm in arms {
                    // The wildcard check comes before evaluating the case
                    // expression: `_` must match even where evaluating it
                    // as an identifier would fail.
                    let hit = match &arm.case {
                        None => true,
                        Some(case) => subject_value.equals(&self.evaluate(case, chain)?),
                    };
                    if hit {
                        return self.execute_scoped(&arm.body, chain);
                    }
                }
                Ok(ExecSignal::Normal)
            }
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.evaluate(expr, chain)?,
                    None => Value::Null,
                };
                Ok(ExecSignal::Return(value))
            }
            StmtKind::Break => Ok(ExecSignal::Break),
            StmtKind::Continue => Ok(ExecSignal::Continue),
        }
    }

    /// Run a statement sequence in a fresh scope, forwarding the first
    /// non-Normal signal unchanged.
    fn execute_scoped(&self, statements: &[Stmt], chain: &mut ScopeChain) -> Result<ExecSignal> {
        chain.push_scope();
        let result = self.run_sequence(statements, chain);
        chain.pop_scope();
        result
    }

    /// Run a statement sequence in the current innermost scope.
    fn run_sequence(&self, statements: &[Stmt], chain: &mut ScopeChain) -> Result<ExecSignal> {
        for stmt in statements {
            match self.execute_statement(stmt, chain)? {
                ExecSignal::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(ExecSignal::Normal)
    }

    fn run_while(
        &self,
        condition: &Expr,
        body: &[Stmt],
        chain: &mut ScopeChain,
    ) -> Result<ExecSignal> {
        loop {
            if !self.evaluate(condition, chain)?.expect_bool(condition.pos)? {
                return Ok(ExecSignal::Normal);
            }
            match self.run_sequence(body, chain)? {
                ExecSignal::Normal | ExecSignal::Continue => {}
                ExecSignal::Break => return Ok(ExecSignal::Normal),
                ret @ ExecSignal::Return(_) => return Ok(ret),
            }
        }
    }

    fn run_for(
        &self,
        init: &Expr,
        condition: &Expr,
        post: &Expr,
        body: &[Stmt],
        chain: &mut ScopeChain,
    ) -> Result<ExecSignal> {
        self.evaluate(init, chain)?;
        loop {
            if !self.evaluate(condition, chain)?.expect_bool(condition.pos)? {
                return Ok(ExecSignal::Normal);
            }
            match self.run_sequence(body, chain)? {
                ExecSignal::Normal | ExecSignal::Continue => {}
                ExecSignal::Break => return Ok(ExecSignal::Normal),
                ret @ ExecSignal::Return(_) => return Ok(ret),
            }
            self.evaluate(post, chain)?;
        }
    }

    fn run_foreach(
        &self,
        binding: &str,
        iterable: &Expr,
        body: &[Stmt],
        chain: &mut ScopeChain,
    ) -> Result<ExecSignal> {
        // The loop variable is declared once and rebound in place.
        chain.create(binding.to_string(), Value::Null);
        let items = match self.evaluate(iterable, chain)? {
            Value::Array(items) => items,
            other => {
                return Err(fail(
                    DiagnosticKind::Type,
                    format!("foreach expects Array, found {}", other.type_name()),
                    iterable.pos,
                ));
            }
        };
        // `items` is a snapshot: mutating the source array inside the body
        // does not change the iteration sequence.
        for item in items {
            chain.create(binding.to_string(), item);
            match self.run_sequence(body, chain)? {
                ExecSignal::Normal | ExecSignal::Continue => {}
                ExecSignal::Break => return Ok(ExecSignal::Normal),
                ret @ ExecSignal::Return(_) => return Ok(ret),
            }
        }
        Ok(ExecSignal::Normal)
    }

    fn evaluate(&self, expr: &Expr, chain: &mut ScopeChain) -> Result<Value> {
        match &expr.kind {
            ExprKind::NullLit => Ok(Value::Null),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::CharLit(c) => Ok(Value::Char(*c)),
            ExprKind::IntLit(n) => Ok(Value::Int(*n)),
            ExprKind::DoubleLit(n) => Ok(Value::Double(*n)),
            ExprKind::StringLit(s) => Ok(Value::String(s.clone())),
            ExprKind::ArrayLit(elements) => {
                let mut values = Vec::new();
                for element in elements {
                    values.push(self.evaluate(element, chain)?);
                }
                Ok(Value::Array(values))
            }
            ExprKind::Ident(name) => chain
                .lookup(name)
                .ok_or_else(|| undefined_variable(name, expr.pos)),
            ExprKind::Index { name, index } => {
                let target = chain
                    .lookup(name)
                    .ok_or_else(|| undefined_variable(name, expr.pos))?;
                let idx = self.index_value(index, chain)?;
                match target {
                    Value::Array(items) => {
                        if idx < 0 || idx as usize >= items.len() {
                            return Err(fail(
                                DiagnosticKind::Index,
                                format!("index {idx} out of range"),
                                expr.pos,
                            ));
                        }
                        Ok(items[idx as usize].clone())
                    }
                    other => Err(fail(
                        DiagnosticKind::Type,
                        format!("cannot index {} `{name}`", other.type_name()),
                        expr.pos,
                    )),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                // Both operands are always evaluated; `&&` and `||` do not
                // short-circuit in this language.
                let left = self.evaluate(lhs, chain)?;
                match rhs {
                    Some(rhs) => {
                        let right = self.evaluate(rhs, chain)?;
                        binary_op(op, left, right, expr.pos)
                    }
                    None => unary_op(op, left, expr.pos),
                }
            }
            ExprKind::Assign { op, target, value } => {
                let rhs = self.evaluate(value, chain)?;
                self.assign(*op, target, rhs, chain)
            }
            ExprKind::Call { name, args } => self.call(name, args, expr.pos, chain),
            ExprKind::Closure { params, body } => Ok(Value::Closure(Function {
                name: None,
                params: params.clone(),
                body: Rc::clone(body),
                captured: Some(chain.capture()),
            })),
        }
    }

    fn index_value(&self, index: &Expr, chain: &mut ScopeChain) -> Result<i64> {
        match self.evaluate(index, chain)? {
            Value::Int(idx) => Ok(idx),
            other => Err(fail(
                DiagnosticKind::Type,
                format!("expected Int index, found {}", other.type_name()),
                index.pos,
            )),
        }
    }

    /// Assignment semantics: rhs has already been evaluated. The target must
    /// be an identifier or an index expression; plain `=` to an unknown name
    /// creates it in the innermost scope, while compound operators require
    /// an existing binding. The expression's result is the rhs value.
    fn assign(
        &self,
        op: AssignOp,
        target: &Expr,
        rhs: Value,
        chain: &mut ScopeChain,
    ) -> Result<Value> {
        match &target.kind {
            ExprKind::Ident(name) => {
                if let Some(old) = chain.lookup(name) {
                    let new_value = apply_assign(op, old, rhs.clone(), target.pos)?;
                    chain.assign_existing(name, new_value);
                    return Ok(rhs);
                }
                if op != AssignOp::Assign {
                    return Err(undefined_variable(name, target.pos));
                }
                chain.create(name.clone(), rhs.clone());
                Ok(rhs)
            }
            ExprKind::Index { name, index } => {
                let idx = self.index_value(index, chain)?;
                let target_value = chain
                    .lookup(name)
                    .ok_or_else(|| undefined_variable(name, target.pos))?;
                let mut items = match target_value {
                    Value::Array(items) => items,
                    other => {
                        return Err(fail(
                            DiagnosticKind::Type,
                            format!("expected Array `{name}`, found {}", other.type_name()),
                            target.pos,
                        ));
                    }
                };
                if idx < 0 || idx as usize >= items.len() {
                    return Err(fail(
                        DiagnosticKind::Index,
                        format!("index {idx} out of range"),
                        target.pos,
                    ));
                }
                let slot = idx as usize;
                items[slot] = apply_assign(op, items[slot].clone(), rhs.clone(), target.pos)?;
                // The whole rewritten array is stored back into the one
                // variable slot; copies held elsewhere are untouched.
                chain.assign_existing(name, Value::Array(items));
                Ok(rhs)
            }
            _ => Err(fail(
                DiagnosticKind::Syntax,
                "cannot assign to this expression".into(),
                target.pos,
            )),
        }
    }

    /// Callee resolution order: builtin table, named function table, then a
    /// Closure-kind variable in the current chain.
    fn call(
        &self,
        name: &str,
        args: &[Expr],
        pos: SourcePos,
        chain: &mut ScopeChain,
    ) -> Result<Value> {
        if let Some(builtin) = self.builtins.get(name) {
            let builtin = *builtin;
            let values = self.eval_args(args, chain)?;
            return builtin.call(chain, &values, pos);
        }

        if let Some(function) = self.functions.get(name) {
            let function = Rc::clone(function);
            check_arity(function.params.len(), args.len(), pos)?;
            let values = self.eval_args(args, chain)?;
            return self.call_function(&function, values, pos);
        }

        if let Some(Value::Closure(function)) = chain.lookup(name) {
            check_arity(function.params.len(), args.len(), pos)?;
            let values = self.eval_args(args, chain)?;
            return self.call_function(&function, values, pos);
        }

        Err(fail(
            DiagnosticKind::Runtime,
            format!("cannot find function definition of `{name}`"),
            pos,
        ))
    }

    fn eval_args(&self, args: &[Expr], chain: &mut ScopeChain) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg, chain)?);
        }
        Ok(values)
    }

    /// The call protocol: arguments are already evaluated in the caller's
    /// chain. A named (or capture-less) function starts from a brand-new
    /// chain; a closure works against its captured chain. Either way one
    /// fresh frame is pushed for the parameters and released on return.
    pub fn call_function(
        &self,
        function: &Function,
        args: Vec<Value>,
        pos: SourcePos,
    ) -> Result<Value> {
        let mut callee_chain = match &function.captured {
            Some(scopes) if function.name.is_none() => ScopeChain::from_captured(scopes.clone()),
            _ => ScopeChain::new(),
        };
        callee_chain.push_scope();
        for (param, value) in function.params.iter().zip(args) {
            callee_chain.create(param.clone(), value);
        }
        for stmt in function.body.iter() {
            match self.execute_statement(stmt, &mut callee_chain)? {
                ExecSignal::Normal => {}
                ExecSignal::Return(value) => return Ok(value),
                ExecSignal::Break | ExecSignal::Continue => {
                    return Err(fail(
                        DiagnosticKind::Runtime,
                        "loop control flow cannot escape a function".into(),
                        pos,
                    ));
                }
            }
        }
        Ok(Value::Null)
    }
}

fn check_arity(expected: usize, got: usize, pos: SourcePos) -> Result<()> {
    if expected != got {
        return Err(fail(
            DiagnosticKind::Argument,
            format!("expects {expected} arguments but got {got}"),
            pos,
        ));
    }
    Ok(())
}

/// Binary operator dispatch. Operators are total over matching operand
/// kinds and fail with a TypeError otherwise; there is no numeric promotion
/// between Int and Double.
fn binary_op(op: &BinaryOp, lhs: Value, rhs: Value, pos: SourcePos) -> Result<Value> {
    use BinaryOp::*;
    match op {
        Add => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(b))),
            (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (l, r) => Err(operand_error(op, &l, &r, pos)),
        },
        Sub => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(b))),
            (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a - b)),
            (l, r) => Err(operand_error(op, &l, &r, pos)),
        },
        Mul => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(b))),
            (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a * b)),
            (l, r) => Err(operand_error(op, &l, &r, pos)),
        },
        Div => match (lhs, rhs) {
            (Value::Int(_), Value::Int(0)) => Err(division_by_zero(pos)),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_div(b))),
            (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a / b)),
            (l, r) => Err(operand_error(op, &l, &r, pos)),
        },
        Mod => match (lhs, rhs) {
            (Value::Int(_), Value::Int(0)) => Err(division_by_zero(pos)),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_rem(b))),
            (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a % b)),
            (l, r) => Err(operand_error(op, &l, &r, pos)),
        },
        Equal => Ok(Value::Bool(lhs.equals(&rhs))),
        NotEqual => Ok(Value::Bool(!lhs.equals(&rhs))),
        Less => compare(op, lhs, rhs, pos, |ord| ord.is_lt()),
        LessEqual => compare(op, lhs, rhs, pos, |ord| ord.is_le()),
        Greater => compare(op, lhs, rhs, pos, |ord| ord.is_gt()),
        GreaterEqual => compare(op, lhs, rhs, pos, |ord| ord.is_ge()),
        LogAnd => match (lhs, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a && b)),
            (l, r) => Err(operand_error(op, &l, &r, pos)),
        },
        LogOr => match (lhs, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a || b)),
            (l, r) => Err(operand_error(op, &l, &r, pos)),
        },
        BitAnd => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a & b)),
            (l, r) => Err(operand_error(op, &l, &r, pos)),
        },
        BitOr => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a | b)),
            (l, r) => Err(operand_error(op, &l, &r, pos)),
        },
        LogNot | BitNot => Err(fail(
            DiagnosticKind::Internal,
            format!("unary operator `{}` reached binary dispatch", op.symbol()),
            pos,
        )),
    }
}

/// A Binary node without a right operand is a unary application.
fn unary_op(op: &BinaryOp, operand: Value, pos: SourcePos) -> Result<Value> {
    match op {
        BinaryOp::Sub => match operand {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Double(n) => Ok(Value::Double(-n)),
            other => Err(unary_operand_error("-", &other, pos)),
        },
        BinaryOp::LogNot => match operand {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(unary_operand_error("!", &other, pos)),
        },
        BinaryOp::BitNot => match operand {
            Value::Int(n) => Ok(Value::Int(!n)),
            other => Err(unary_operand_error("~", &other, pos)),
        },
        other => Err(fail(
            DiagnosticKind::Internal,
            format!("operator `{}` has no unary form", other.symbol()),
            pos,
        )),
    }
}

fn compare(
    op: &BinaryOp,
    lhs: Value,
    rhs: Value,
    pos: SourcePos,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<Value> {
    let ordering = match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::Char(a), Value::Char(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        _ => return Err(operand_error(op, &lhs, &rhs, pos)),
    };
    // NaN comparisons are false, matching IEEE ordering.
    Ok(Value::Bool(ordering.map(accept).unwrap_or(false)))
}

/// Compound assignment operators are defined via their binary counterpart
/// applied to (old value, rhs).
fn apply_assign(op: AssignOp, old: Value, rhs: Value, pos: SourcePos) -> Result<Value> {
    let binary = match op {
        AssignOp::Assign => return Ok(rhs),
        AssignOp::AddAssign => BinaryOp::Add,
        AssignOp::SubAssign => BinaryOp::Sub,
        AssignOp::MulAssign => BinaryOp::Mul,
        AssignOp::DivAssign => BinaryOp::Div,
        AssignOp::ModAssign => BinaryOp::Mod,
    };
    binary_op(&binary, old, rhs, pos)
}

fn fail(kind: DiagnosticKind, message: String, pos: SourcePos) -> SeleneError {
    SeleneError::from(Diagnostic::new(kind, message).at(pos))
}

fn undefined_variable(name: &str, pos: SourcePos) -> SeleneError {
    fail(
        DiagnosticKind::Runtime,
        format!("use of undefined variable `{name}`"),
        pos,
    )
}

fn division_by_zero(pos: SourcePos) -> SeleneError {
    fail(DiagnosticKind::Runtime, "division by zero".into(), pos)
}

fn operand_error(op: &BinaryOp, lhs: &Value, rhs: &Value, pos: SourcePos) -> SeleneError {
    fail(
        DiagnosticKind::Type,
        format!(
            "invalid operand types for operator `{}`: {} and {}",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ),
        pos,
    )
}

fn unary_operand_error(symbol: &str, operand: &Value, pos: SourcePos) -> SeleneError {
    fail(
        DiagnosticKind::Type,
        format!(
            "invalid operand type for operator `{symbol}`: {}",
            operand.type_name()
        ),
        pos,
    )
}
