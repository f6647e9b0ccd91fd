use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::value::Value;

/// One lexical frame: a mapping from identifier to its mutable variable
/// slot. Names are unique within a scope; re-creating a name overwrites its
/// slot in place.
#[derive(Debug, Default)]
pub struct Scope {
    variables: IndexMap<String, Value>,
}

impl Scope {
    pub fn define(&mut self, name: String, value: Value) {
        self.variables.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.variables.get_mut(name) {
            *slot = value;
        }
    }
}

/// Scopes are shared: a closure's captured chain holds the same frames the
/// evaluator pushed, and keeps them alive after the evaluator pops them.
pub type ScopeRef = Rc<RefCell<Scope>>;

fn new_scope() -> ScopeRef {
    Rc::new(RefCell::new(Scope::default()))
}

/// The ordered nesting of scopes visible at a point in execution, outermost
/// first. Resolution always walks innermost to outermost and stops at the
/// first scope containing the name.
///
/// Block, branch and loop scopes follow stack discipline: pushed on entry,
/// popped on exit. Captured chains clone the `Vec` of `Rc` handles, so the
/// frames themselves outlive the push/pop that created them for as long as
/// any closure value references them.
#[derive(Default)]
pub struct ScopeChain {
    scopes: Vec<ScopeRef>,
}

impl ScopeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a chain around the frames a closure captured at creation.
    pub fn from_captured(scopes: Vec<ScopeRef>) -> Self {
        Self { scopes }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(new_scope());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Snapshot of the chain for a closure: shares the frames, not copies.
    pub fn capture(&self) -> Vec<ScopeRef> {
        self.scopes.clone()
    }

    /// Innermost-to-outermost search; the first match wins.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.borrow().get(name) {
                return Some(value);
            }
        }
        None
    }

    /// Update the slot of an already-visible name; `false` when no scope in
    /// the chain contains it.
    pub fn assign_existing(&mut self, name: &str, value: Value) -> bool {
        for scope in self.scopes.iter().rev() {
            if scope.borrow().contains(name) {
                scope.borrow_mut().set(name, value);
                return true;
            }
        }
        false
    }

    /// Create (or overwrite) a variable in the innermost scope.
    pub fn create(&mut self, name: String, value: Value) {
        let scope = self
            .scopes
            .last()
            .expect("scope chain holds at least one scope");
        scope.borrow_mut().define(name, value);
    }
}
