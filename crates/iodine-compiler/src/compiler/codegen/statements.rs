//! Statement compilation.
//!
//! Statements leave the stack as they found it. Loops register their
//! `break`/`continue` targets on the context with
//! [`EmitContext::with_loop`]; blocks open a scope with `in_scope`.
//!
//! ```text
//! while (cond) { body }
//!
//! start:
//!   [cond]
//!   JumpIfFalse -> end
//!   [body]
//!   Jump -> start
//! end:
//! ```

use super::Compiler;
use crate::ast::*;
use crate::compiler::builder::Label;
use crate::compiler::bytecode::OpCode;
use crate::compiler::context::EmitContext;
use crate::error::{CompileError, Result};

impl Compiler {
    pub(super) fn statements(&mut self, ctx: &mut EmitContext, body: &[Statement]) -> Result<()> {
        for statement in body {
            self.statement(ctx, statement)?;
        }
        Ok(())
    }

    pub(super) fn statement(&mut self, ctx: &mut EmitContext, statement: &Statement) -> Result<()> {
        ctx.code.set_location(&statement.location);

        match &statement.kind {
            StatementKind::Expression(expr) => self.expression_statement(ctx, expr)?,
            StatementKind::Block(body) => {
                self.in_scope(|this| this.statements(ctx, body))?;
            }
            StatementKind::Variable(var) => self.variable(ctx, var)?,
            StatementKind::If(if_stmt) => self.if_statement(ctx, if_stmt)?,
            StatementKind::While(loop_stmt) => self.while_statement(ctx, loop_stmt)?,
            StatementKind::DoWhile(loop_stmt) => self.do_while_statement(ctx, loop_stmt)?,
            StatementKind::For(for_stmt) => self.for_statement(ctx, for_stmt)?,
            StatementKind::ForEach(foreach) => self.foreach_statement(ctx, foreach)?,
            StatementKind::TryExcept(try_stmt) => self.try_statement(ctx, try_stmt)?,
            StatementKind::With(with) => {
                self.in_scope(|this| {
                    this.expression(ctx, &with.resource)?;
                    ctx.code.emit(OpCode::BeginWith);
                    this.statement(ctx, &with.body)?;
                    ctx.code.emit(OpCode::EndWith);
                    Ok(())
                })?;
            }
            StatementKind::Raise(expr) => {
                self.expression(ctx, expr)?;
                ctx.code.emit(OpCode::Raise);
            }
            StatementKind::Return(value) => {
                match value {
                    Some(value) => self.expression(ctx, value)?,
                    None => {
                        ctx.code.emit(OpCode::LoadNull);
                    }
                }
                ctx.code.emit(OpCode::Return);
            }
            StatementKind::Yield(value) => {
                self.expression(ctx, value)?;
                ctx.code.emit(OpCode::Yield);
            }
            StatementKind::Break => {
                let label = loop_target(ctx.break_label(), "break")?;
                ctx.code.emit_branch(OpCode::Jump, label);
            }
            StatementKind::Continue => {
                let label = loop_target(ctx.continue_label(), "continue")?;
                ctx.code.emit_branch(OpCode::Jump, label);
            }
            StatementKind::Use(use_stmt) => self.use_statement(ctx, use_stmt),
            StatementKind::Function(func) => {
                self.declare_function(ctx, func)?;
            }
            StatementKind::Decorated(decorated) => {
                self.declare_decorated(ctx, decorated)?;
            }
            StatementKind::Class(class) => {
                self.class_value(ctx, class)?;
                self.store_declaration(ctx, &class.name);
            }
            StatementKind::Contract(decl) => {
                self.interface_value(ctx, decl, OpCode::BuildContract)?;
                self.store_declaration(ctx, &decl.name);
            }
            StatementKind::Trait(decl) => {
                self.interface_value(ctx, decl, OpCode::BuildTrait)?;
                self.store_declaration(ctx, &decl.name);
            }
            StatementKind::Mixin(decl) => {
                self.interface_value(ctx, decl, OpCode::BuildMixin)?;
                self.store_declaration(ctx, &decl.name);
            }
            StatementKind::Enum(decl) => {
                self.enum_value(ctx, decl);
                self.store_declaration(ctx, &decl.name);
            }
        }

        Ok(())
    }

    fn variable(&mut self, ctx: &mut EmitContext, var: &VariableDeclaration) -> Result<()> {
        match &var.initializer {
            Some(init) => self.expression(ctx, init)?,
            None => {
                ctx.code.emit(OpCode::LoadNull);
            }
        }
        self.bind_names(ctx, &var.names, var.is_global);
        Ok(())
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    fn if_statement(&mut self, ctx: &mut EmitContext, if_stmt: &IfStatement) -> Result<()> {
        let else_label = ctx.code.create_label();
        let end_label = ctx.code.create_label();

        self.expression(ctx, &if_stmt.condition)?;
        ctx.code.emit_branch(OpCode::JumpIfFalse, else_label);
        self.statement(ctx, &if_stmt.consequent)?;

        match &if_stmt.alternate {
            Some(alternate) => {
                ctx.code.emit_branch(OpCode::Jump, end_label);
                ctx.code.mark_label(else_label);
                self.statement(ctx, alternate)?;
            }
            None => ctx.code.mark_label(else_label),
        }

        ctx.code.mark_label(end_label);
        Ok(())
    }

    fn while_statement(&mut self, ctx: &mut EmitContext, loop_stmt: &WhileStatement) -> Result<()> {
        let start = ctx.code.create_label();
        let end = ctx.code.create_label();

        ctx.code.mark_label(start);
        self.expression(ctx, &loop_stmt.condition)?;
        ctx.code.emit_branch(OpCode::JumpIfFalse, end);
        ctx.with_loop(end, start, |ctx| self.statement(ctx, &loop_stmt.body))?;
        ctx.code.emit_branch(OpCode::Jump, start);
        ctx.code.mark_label(end);
        Ok(())
    }

    fn do_while_statement(&mut self, ctx: &mut EmitContext, loop_stmt: &WhileStatement) -> Result<()> {
        let start = ctx.code.create_label();
        let condition = ctx.code.create_label();
        let end = ctx.code.create_label();

        ctx.code.mark_label(start);
        ctx.with_loop(end, condition, |ctx| self.statement(ctx, &loop_stmt.body))?;
        ctx.code.mark_label(condition);
        self.expression(ctx, &loop_stmt.condition)?;
        ctx.code.emit_branch(OpCode::JumpIfTrue, start);
        ctx.code.mark_label(end);
        Ok(())
    }

    fn for_statement(&mut self, ctx: &mut EmitContext, for_stmt: &ForStatement) -> Result<()> {
        self.in_scope(|this| {
            let start = ctx.code.create_label();
            let step = ctx.code.create_label();
            let end = ctx.code.create_label();

            if let Some(init) = &for_stmt.initializer {
                this.statement(ctx, init)?;
            }

            ctx.code.mark_label(start);
            if let Some(condition) = &for_stmt.condition {
                this.expression(ctx, condition)?;
                ctx.code.emit_branch(OpCode::JumpIfFalse, end);
            }

            ctx.with_loop(end, step, |ctx| this.statement(ctx, &for_stmt.body))?;

            ctx.code.mark_label(step);
            if let Some(step_expr) = &for_stmt.step {
                this.expression_statement(ctx, step_expr)?;
            }
            ctx.code.emit_branch(OpCode::Jump, start);
            ctx.code.mark_label(end);
            Ok(())
        })
    }

    fn foreach_statement(&mut self, ctx: &mut EmitContext, foreach: &ForEachStatement) -> Result<()> {
        self.in_scope(|this| {
            this.iterate(ctx, &foreach.iterable, &foreach.variables, |this, ctx, start, end| {
                ctx.with_loop(end, start, |ctx| this.statement(ctx, &foreach.body))
            })
        })
    }

    /// Emits the iterator protocol loop shared by `foreach` and comprehensions.
    ///
    /// ```text
    ///   [iterable]
    ///   GetIter; Dup; StoreLocal $iterN; IterReset
    /// start:
    ///   LoadLocal $iterN; IterMoveNext; JumpIfFalse -> end
    ///   LoadLocal $iterN; IterGetCurrent; [bind variables]
    ///   [body]
    ///   Jump -> start
    /// end:
    /// ```
    pub(super) fn iterate(
        &mut self,
        ctx: &mut EmitContext,
        iterable: &Expression,
        variables: &[String],
        body: impl FnOnce(&mut Self, &mut EmitContext, Label, Label) -> Result<()>,
    ) -> Result<()> {
        let iterator = self.temporary("iter");
        let start = ctx.code.create_label();
        let end = ctx.code.create_label();

        self.expression(ctx, iterable)?;
        ctx.code.emit(OpCode::GetIter);
        ctx.code.emit(OpCode::Dup);
        ctx.code.emit_name(OpCode::StoreLocal, &iterator);
        ctx.code.emit(OpCode::IterReset);

        ctx.code.mark_label(start);
        ctx.code.emit_name(OpCode::LoadLocal, &iterator);
        ctx.code.emit(OpCode::IterMoveNext);
        ctx.code.emit_branch(OpCode::JumpIfFalse, end);
        ctx.code.emit_name(OpCode::LoadLocal, &iterator);
        ctx.code.emit(OpCode::IterGetCurrent);
        self.bind_names(ctx, variables, false);

        body(self, ctx, start, end)?;

        ctx.code.emit_branch(OpCode::Jump, start);
        ctx.code.mark_label(end);
        Ok(())
    }

    fn try_statement(&mut self, ctx: &mut EmitContext, try_stmt: &TryExceptStatement) -> Result<()> {
        let handler = ctx.code.create_label();
        let end = ctx.code.create_label();

        ctx.code.emit_branch(OpCode::PushExceptionHandler, handler);
        self.statement(ctx, &try_stmt.body)?;
        ctx.code.emit(OpCode::PopExceptionHandler);
        ctx.code.emit_branch(OpCode::Jump, end);

        ctx.code.mark_label(handler);
        for ty in &try_stmt.types {
            self.expression(ctx, ty)?;
        }
        ctx.code
            .emit_argument(OpCode::BeginExcept, try_stmt.types.len() as i32);

        self.in_scope(|this| {
            if let Some(binding) = &try_stmt.binding {
                ctx.code.emit(OpCode::LoadException);
                this.declare_name(ctx, binding, false);
            }
            this.statement(ctx, &try_stmt.handler)
        })?;

        ctx.code.mark_label(end);
        Ok(())
    }

    fn use_statement(&mut self, ctx: &mut EmitContext, use_stmt: &UseStatement) {
        if use_stmt.wildcard {
            ctx.code.emit_name(OpCode::ImportAll, &use_stmt.module);
        } else if use_stmt.items.is_empty() {
            ctx.code.emit_name(OpCode::Import, &use_stmt.module);
        } else {
            for item in &use_stmt.items {
                Self::load_string(ctx, item);
            }
            ctx.code
                .emit_argument(OpCode::BuildTuple, use_stmt.items.len() as i32);
            ctx.code.emit_name(OpCode::ImportFrom, &use_stmt.module);
        }
    }

    /// Evaluates an expression for its side effects only.
    pub(super) fn expression_statement(&mut self, ctx: &mut EmitContext, expr: &Expression) -> Result<()> {
        if let ExpressionKind::Assign(assign) = &expr.kind {
            self.assign(ctx, assign, &expr.location, false)
        } else {
            self.expression(ctx, expr)?;
            ctx.code.emit(OpCode::Pop);
            Ok(())
        }
    }
}

fn loop_target(label: Option<Label>, keyword: &str) -> Result<Label> {
    label.ok_or_else(|| CompileError::internal(format!("'{}' reached emission outside of a loop", keyword)))
}
