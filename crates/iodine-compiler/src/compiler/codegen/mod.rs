//! Code generation from AST to bytecode.
//!
//! The [`Compiler`] walks a [`CompilationUnit`] and emits into the
//! [`EmitContext`] it is handed. Every visitor method takes the active context
//! explicitly; nested bodies (functions, lambdas, generators) build their own
//! context and finish it into a constant before the parent continues.
//!
//! Operands of binary operators are visited right to left so that the left
//! operand ends up on top of the stack: the VM computes
//! `stack[-1] op stack[-2]`.

mod declarations;
mod expressions;
mod patterns;
mod statements;

#[cfg(test)]
mod tests;

use super::analysis::analyze;
use super::bytecode::{CodeObject, Constant, Module, OpCode};
use super::context::EmitContext;
use super::optimizer::Optimizer;
use super::symbols::SymbolTable;
use crate::ast::CompilationUnit;
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use tracing::{debug, instrument};

/// Compiles AST to bytecode.
///
/// One compiler owns the symbol table of the unit it is compiling; use a
/// separate instance per module.
#[derive(Debug)]
pub struct Compiler {
    symbols: SymbolTable,
    config: CompilerConfig,
    optimizer: Optimizer,
    temporaries: usize,
}

/// Compiles `unit` with a fresh compiler.
pub fn compile(unit: &CompilationUnit, config: &CompilerConfig) -> Result<Module> {
    Compiler::new(config.clone()).compile(unit)
}

impl Compiler {
    /// Creates a compiler with the given configuration.
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            symbols: SymbolTable::new(),
            config,
            optimizer: Optimizer::new(),
            temporaries: 0,
        }
    }

    /// The configuration this compiler was created with.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Analyzes and compiles a unit into a module.
    ///
    /// Nothing is emitted when analysis reports errors; they come back
    /// together as [`CompileError::Syntax`].
    #[instrument(skip_all, fields(module = %unit.name))]
    pub fn compile(&mut self, unit: &CompilationUnit) -> Result<Module> {
        self.symbols = analyze(unit).map_err(CompileError::Syntax)?;
        self.temporaries = 0;

        let mut ctx = EmitContext::module();
        ctx.code.set_location(&unit.location);
        self.statements(&mut ctx, &unit.body)?;

        Ok(Module {
            name: unit.name.clone(),
            location: unit.location.clone(),
            initializer: self.finish(ctx),
        })
    }

    /// Finalizes a context and runs the optimizer over the result.
    fn finish(&self, ctx: EmitContext) -> CodeObject {
        let depth = ctx.depth();
        let code = ctx.finish();
        debug!(depth, instructions = code.len(), "finalized code object");
        if self.config.optimize {
            self.optimizer.optimize(code)
        } else {
            code
        }
    }

    /// Runs `f` inside a fresh lexical scope.
    ///
    /// The scope is closed again whether `f` succeeds or not.
    fn in_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.symbols.enter_scope();
        let result = f(self);
        self.symbols.exit_scope();
        result
    }

    /// A compiler-private local name, e.g. `$iter3`.
    fn temporary(&mut self, prefix: &str) -> String {
        let n = self.temporaries;
        self.temporaries += 1;
        format!("${}{}", prefix, n)
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    fn is_local(&self, name: &str) -> bool {
        self.symbols.is_symbol_defined(name) && !self.symbols.is_global(name)
    }

    fn load_name(&self, ctx: &mut EmitContext, name: &str) {
        let op = if self.is_local(name) {
            OpCode::LoadLocal
        } else {
            OpCode::LoadGlobal
        };
        ctx.code.emit_name(op, name);
    }

    /// Stores to an existing binding, or declares a new local.
    ///
    /// At module scope everything is global and the name joins the module
    /// scope. Inside a function or block a name that is only known at module
    /// level is written as a global; an unknown name becomes a local of the
    /// innermost scope.
    fn store_name(&mut self, ctx: &mut EmitContext, name: &str) {
        if self.symbols.is_in_global_scope() {
            self.symbols.add_symbol(name);
            ctx.code.emit_name(OpCode::StoreGlobal, name);
        } else if self.symbols.is_symbol_defined(name) && self.symbols.is_global(name) {
            ctx.code.emit_name(OpCode::StoreGlobal, name);
        } else {
            self.symbols.add_symbol(name);
            ctx.code.emit_name(OpCode::StoreLocal, name);
        }
    }

    /// Declares `name` in the innermost scope and stores to it.
    ///
    /// Used by `var`, loop variables and pattern captures, which shadow any
    /// outer binding. `global` forces a module-level store.
    fn declare_name(&mut self, ctx: &mut EmitContext, name: &str, global: bool) {
        if global || self.symbols.is_in_global_scope() {
            ctx.code.emit_name(OpCode::StoreGlobal, name);
        } else {
            self.symbols.add_symbol(name);
            ctx.code.emit_name(OpCode::StoreLocal, name);
        }
    }

    /// Pops the value on top of the stack into each of `names` by index.
    ///
    /// A single name binds the value itself.
    fn bind_names(&mut self, ctx: &mut EmitContext, names: &[String], global: bool) {
        if let [name] = names {
            self.declare_name(ctx, name, global);
            return;
        }
        let temp = self.temporary("unpack");
        ctx.code.emit_name(OpCode::StoreLocal, &temp);
        for (i, name) in names.iter().enumerate() {
            ctx.code.emit_constant(OpCode::LoadConst, Constant::Int(i as i64));
            ctx.code.emit_name(OpCode::LoadLocal, &temp);
            ctx.code.emit(OpCode::LoadIndex);
            self.declare_name(ctx, name, global);
        }
    }

    fn load_string(ctx: &mut EmitContext, value: &str) {
        ctx.code
            .emit_constant(OpCode::LoadConst, Constant::String(value.to_string()));
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}
