//! Scope management for name resolution during compilation.

use rustc_hash::FxHashSet;

/// A stack of lexical scopes, innermost last.
///
/// The bottom scope is the module scope and is never popped. Names that are
/// not found anywhere are not errors: they resolve as globals and are looked
/// up at run time.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<FxHashSet<String>>,
}

impl SymbolTable {
    /// Creates a table holding only the module scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashSet::default()],
        }
    }

    /// Number of open scopes, the module scope included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Opens a nested scope.
    pub fn enter_scope(&mut self) {
        self.scopes.push(FxHashSet::default());
    }

    /// Closes the innermost scope.
    pub fn exit_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot exit the module scope");
        self.scopes.pop();
    }

    /// Declares a name in the innermost scope. Returns false if it was
    /// already declared there.
    pub fn add_symbol(&mut self, name: &str) -> bool {
        match self.scopes.last_mut() {
            Some(scope) => scope.insert(name.to_string()),
            None => unreachable!("the module scope is never popped"),
        }
    }

    /// Whether `name` is declared in any open scope.
    pub fn is_symbol_defined(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }

    /// Whether `name` resolves to a module-level global.
    ///
    /// True at module scope, and for names that are declared nowhere but the
    /// module scope (or nowhere at all).
    pub fn is_global(&self, name: &str) -> bool {
        self.is_in_global_scope() || !self.scopes[1..].iter().any(|scope| scope.contains(name))
    }

    /// Whether only the module scope is open.
    pub fn is_in_global_scope(&self) -> bool {
        self.scopes.len() == 1
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
