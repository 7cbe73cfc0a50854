//! Emit contexts: where the compiler is emitting, and under which rules.

use super::builder::{CodeBuilder, Label};
use super::bytecode::CodeObject;

/// The compilation state of one body (module, function or class body).
///
/// A context owns its [`CodeBuilder`]. Nested bodies get a fresh context
/// built from their parent with [`EmitContext::function`] or
/// [`EmitContext::class_body`]; the parent stays borrowed-free while the child
/// compiles, and the child is consumed by [`EmitContext::finish`]. The class
/// flags are fixed at construction. Loop labels and the pattern temporary are
/// only changed through the scoped `with_*` helpers, which restore the
/// previous state on every exit path.
#[derive(Debug)]
pub struct EmitContext {
    /// The instruction buffer for this body
    pub code: CodeBuilder,
    is_in_class: bool,
    is_in_class_body: bool,
    pattern_temporary: Option<String>,
    break_labels: Vec<Label>,
    continue_labels: Vec<Label>,
    depth: usize,
}

impl EmitContext {
    fn with_flags(is_in_class: bool, is_in_class_body: bool, depth: usize) -> Self {
        Self {
            code: CodeBuilder::new(),
            is_in_class,
            is_in_class_body,
            pattern_temporary: None,
            break_labels: Vec::new(),
            continue_labels: Vec::new(),
            depth,
        }
    }

    /// The context for a module initializer.
    pub fn module() -> Self {
        Self::with_flags(false, false, 0)
    }

    /// A context for a function, lambda or generator body nested in `parent`.
    pub fn function(parent: &EmitContext) -> Self {
        Self::with_flags(
            parent.is_in_class || parent.is_in_class_body,
            false,
            parent.depth + 1,
        )
    }

    /// A context for the members of a class, contract, trait or mixin.
    ///
    /// Members are emitted into the parent's builder, so the class-body
    /// context borrows nothing and only changes the flags; the caller moves
    /// the parent's code into it and back.
    pub fn class_body(parent: &mut EmitContext) -> Self {
        let mut context = Self::with_flags(true, true, parent.depth + 1);
        context.code = std::mem::take(&mut parent.code);
        context
    }

    /// Hands the class body's builder back to `parent`.
    pub fn end_class_body(self, parent: &mut EmitContext) {
        parent.code = self.code;
    }

    /// Whether `self` refers to an instance here.
    pub fn is_in_class(&self) -> bool {
        self.is_in_class
    }

    /// Whether declarations here become class members.
    pub fn is_in_class_body(&self) -> bool {
        self.is_in_class_body
    }

    /// Whether a pattern is being compiled.
    pub fn is_pattern_expression(&self) -> bool {
        self.pattern_temporary.is_some()
    }

    /// The temporary holding the value being matched.
    pub fn pattern_temporary(&self) -> Option<&str> {
        self.pattern_temporary.as_deref()
    }

    /// Nesting depth (0 for the module).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Target of `break` in the innermost loop.
    pub fn break_label(&self) -> Option<Label> {
        self.break_labels.last().copied()
    }

    /// Target of `continue` in the innermost loop.
    pub fn continue_label(&self) -> Option<Label> {
        self.continue_labels.last().copied()
    }

    /// Runs `f` with `break_label`/`continue_label` as the innermost loop.
    pub fn with_loop<T>(
        &mut self,
        break_label: Label,
        continue_label: Label,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.break_labels.push(break_label);
        self.continue_labels.push(continue_label);
        let result = f(self);
        self.break_labels.pop();
        self.continue_labels.pop();
        result
    }

    /// Runs `f` as a pattern expression matching against `temporary`.
    pub fn with_pattern<T>(&mut self, temporary: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.pattern_temporary.replace(temporary.to_string());
        let result = f(self);
        self.pattern_temporary = previous;
        result
    }

    /// Finalizes the body.
    pub fn finish(self) -> CodeObject {
        self.code.finalize()
    }
}
