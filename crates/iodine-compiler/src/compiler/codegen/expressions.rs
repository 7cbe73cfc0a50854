//! Expression compilation.
//!
//! Every expression leaves exactly one value on the stack, with one
//! exception: a ternary without an else branch pushes nothing when its
//! condition is false.
//!
//! | Expression | Lowering |
//! |------------|----------|
//! | `a op b` | `[b] [a] BinOp op` |
//! | `a && b` | `[a] Dup JumpIfFalse end [b] BinOp && end:` |
//! | `a ?? b` | `[a] Dup LoadNull BinOp == JumpIfFalse end Pop [b] end:` |
//! | `x = v` | `[v] Store x Load x` |
//! | `o.f = v` | `[v] [o] StoreAttribute f [o] LoadAttribute f` |
//! | `o[i] = v` | `[v] [i] [o] StoreIndex [i] [o] LoadIndex` |
//! | `f(a, b)` | `[a] [b] [f] Invoke 2` |
//! | `f(a, k=v)` | `[a] "k" [v] BuildHash 1 [f] InvokeVar 1` |

use super::Compiler;
use crate::ast::*;
use crate::compiler::builder::Label;
use crate::compiler::bytecode::{Constant, OpCode};
use crate::compiler::context::EmitContext;
use crate::error::{CompileError, Result};
use crate::source::SourceLocation;
use std::sync::Arc;

impl Compiler {
    pub(super) fn expression(&mut self, ctx: &mut EmitContext, expr: &Expression) -> Result<()> {
        ctx.code.set_location(&expr.location);

        match &expr.kind {
            ExpressionKind::Integer(value) => {
                ctx.code.emit_constant(OpCode::LoadConst, Constant::Int(*value));
            }
            ExpressionKind::BigInteger(value) => {
                ctx.code
                    .emit_constant(OpCode::LoadConst, Constant::BigInt(value.clone()));
            }
            ExpressionKind::Float(value) => {
                ctx.code.emit_constant(OpCode::LoadConst, Constant::Float(*value));
            }
            ExpressionKind::String(value) => Self::load_string(ctx, value),
            ExpressionKind::Boolean(true) => {
                ctx.code.emit(OpCode::LoadTrue);
            }
            ExpressionKind::Boolean(false) => {
                ctx.code.emit(OpCode::LoadFalse);
            }
            ExpressionKind::Null => {
                ctx.code.emit(OpCode::LoadNull);
            }
            ExpressionKind::SelfRef => {
                ctx.code.emit(OpCode::LoadSelf);
            }
            ExpressionKind::Name(name) => self.load_name(ctx, name),
            ExpressionKind::Binary(binary) => {
                if self.config.fold_constants {
                    let reduced = expr.reduce()?;
                    match &reduced.kind {
                        ExpressionKind::Binary(binary) => self.binary(ctx, binary)?,
                        _ => self.expression(ctx, &reduced)?,
                    }
                } else {
                    self.binary(ctx, binary)?;
                }
            }
            ExpressionKind::Unary(unary) => {
                self.expression(ctx, &unary.operand)?;
                ctx.code
                    .emit_argument(OpCode::UnaryOp, unary.operator as i32);
            }
            ExpressionKind::Assign(assign) => {
                self.assign(ctx, assign, &expr.location, true)?;
            }
            ExpressionKind::Member(member) => {
                self.expression(ctx, &member.target)?;
                let op = if member.optional {
                    OpCode::LoadAttributeOrNull
                } else {
                    OpCode::LoadAttribute
                };
                ctx.code.emit_name(op, &member.field);
            }
            ExpressionKind::Index(index) => {
                self.expression(ctx, &index.index)?;
                self.expression(ctx, &index.target)?;
                ctx.code.emit(OpCode::LoadIndex);
            }
            ExpressionKind::Slice(slice) => {
                for bound in [&slice.step, &slice.stop, &slice.start] {
                    match bound {
                        Some(bound) => self.expression(ctx, bound)?,
                        None => {
                            ctx.code.emit(OpCode::LoadNull);
                        }
                    }
                }
                self.expression(ctx, &slice.target)?;
                ctx.code.emit(OpCode::Slice);
            }
            ExpressionKind::Call(call) => self.call(ctx, call)?,
            ExpressionKind::SuperCall(arguments) => {
                self.expressions(ctx, arguments)?;
                ctx.code
                    .emit_argument(OpCode::InvokeSuper, arguments.len() as i32);
            }
            ExpressionKind::List(items) => {
                self.expressions(ctx, items)?;
                ctx.code.emit_argument(OpCode::BuildList, items.len() as i32);
            }
            ExpressionKind::Tuple(items) => {
                self.expressions(ctx, items)?;
                ctx.code.emit_argument(OpCode::BuildTuple, items.len() as i32);
            }
            ExpressionKind::Hash(pairs) => {
                for (key, value) in pairs {
                    self.expression(ctx, key)?;
                    self.expression(ctx, value)?;
                }
                ctx.code.emit_argument(OpCode::BuildHash, pairs.len() as i32);
            }
            ExpressionKind::Lambda(func) => {
                self.function_value(ctx, func)?;
                if !self.symbols.is_in_global_scope() {
                    ctx.code.emit(OpCode::BuildClosure);
                }
            }
            ExpressionKind::Ternary(ternary) => self.ternary(ctx, ternary)?,
            ExpressionKind::Comprehension(comp) => self.comprehension(ctx, comp)?,
            ExpressionKind::Match(match_expr) => self.match_expression(ctx, match_expr)?,
        }

        Ok(())
    }

    pub(super) fn expressions(&mut self, ctx: &mut EmitContext, exprs: &[Expression]) -> Result<()> {
        for expr in exprs {
            self.expression(ctx, expr)?;
        }
        Ok(())
    }

    fn binary(&mut self, ctx: &mut EmitContext, binary: &BinaryExpression) -> Result<()> {
        let operator = binary.operator;
        match operator {
            BinaryOperator::BoolAnd | BinaryOperator::BoolOr => {
                let end = ctx.code.create_label();
                let skip = if operator == BinaryOperator::BoolAnd {
                    OpCode::JumpIfFalse
                } else {
                    OpCode::JumpIfTrue
                };
                self.expression(ctx, &binary.left)?;
                ctx.code.emit(OpCode::Dup);
                ctx.code.emit_branch(skip, end);
                self.expression(ctx, &binary.right)?;
                ctx.code.emit_argument(OpCode::BinOp, operator as i32);
                ctx.code.mark_label(end);
            }
            BinaryOperator::NullCoalescing => {
                let end = ctx.code.create_label();
                self.expression(ctx, &binary.left)?;
                ctx.code.emit(OpCode::Dup);
                ctx.code.emit(OpCode::LoadNull);
                ctx.code
                    .emit_argument(OpCode::BinOp, BinaryOperator::Equals as i32);
                ctx.code.emit_branch(OpCode::JumpIfFalse, end);
                ctx.code.emit(OpCode::Pop);
                self.expression(ctx, &binary.right)?;
                ctx.code.mark_label(end);
            }
            _ => {
                self.expression(ctx, &binary.right)?;
                self.expression(ctx, &binary.left)?;
                ctx.code.emit_argument(OpCode::BinOp, operator as i32);
            }
        }
        Ok(())
    }

    /// Compiles an assignment. With `keep` the assigned value is left on the
    /// stack as the expression's result.
    pub(super) fn assign(
        &mut self,
        ctx: &mut EmitContext,
        assign: &AssignExpression,
        location: &SourceLocation,
        keep: bool,
    ) -> Result<()> {
        match assign.operator {
            Some(operator) => {
                let value = Expression::binary(
                    operator,
                    (*assign.target).clone(),
                    (*assign.value).clone(),
                    location.clone(),
                );
                self.expression(ctx, &value)?;
            }
            None => self.expression(ctx, &assign.value)?,
        }
        ctx.code.set_location(location);

        match &assign.target.kind {
            ExpressionKind::Name(name) => {
                self.store_name(ctx, name);
                if keep {
                    self.load_name(ctx, name);
                }
            }
            ExpressionKind::Member(member) => {
                self.expression(ctx, &member.target)?;
                ctx.code.emit_name(OpCode::StoreAttribute, &member.field);
                if keep {
                    self.expression(ctx, &member.target)?;
                    ctx.code.emit_name(OpCode::LoadAttribute, &member.field);
                }
            }
            ExpressionKind::Index(index) => {
                self.expression(ctx, &index.index)?;
                self.expression(ctx, &index.target)?;
                ctx.code.emit(OpCode::StoreIndex);
                if keep {
                    self.expression(ctx, &index.index)?;
                    self.expression(ctx, &index.target)?;
                    ctx.code.emit(OpCode::LoadIndex);
                }
            }
            _ => {
                return Err(CompileError::internal(format!(
                    "{}: invalid assignment target reached emission",
                    location
                )));
            }
        }
        Ok(())
    }

    fn call(&mut self, ctx: &mut EmitContext, call: &CallExpression) -> Result<()> {
        self.expressions(ctx, &call.arguments)?;
        let argc = call.arguments.len() as i32;

        if call.keyword_arguments.is_empty() {
            self.expression(ctx, &call.target)?;
            ctx.code.emit_argument(OpCode::Invoke, argc);
        } else {
            for (name, value) in &call.keyword_arguments {
                Self::load_string(ctx, name);
                self.expression(ctx, value)?;
            }
            ctx.code
                .emit_argument(OpCode::BuildHash, call.keyword_arguments.len() as i32);
            self.expression(ctx, &call.target)?;
            ctx.code.emit_argument(OpCode::InvokeVar, argc);
        }
        Ok(())
    }

    /// `cond ? a : b`.
    ///
    /// Without an else branch nothing is pushed on the false path; callers
    /// rely on this.
    fn ternary(&mut self, ctx: &mut EmitContext, ternary: &TernaryExpression) -> Result<()> {
        let false_label = ctx.code.create_label();
        let end = ctx.code.create_label();

        self.expression(ctx, &ternary.condition)?;
        ctx.code.emit_branch(OpCode::JumpIfFalse, false_label);
        self.expression(ctx, &ternary.when_true)?;
        ctx.code.emit_branch(OpCode::Jump, end);
        ctx.code.mark_label(false_label);
        if let Some(when_false) = &ternary.when_false {
            self.expression(ctx, when_false)?;
        }
        ctx.code.mark_label(end);
        Ok(())
    }

    fn comprehension(&mut self, ctx: &mut EmitContext, comp: &ComprehensionExpression) -> Result<()> {
        match comp.kind {
            ComprehensionKind::List => self.in_scope(|this| {
                let result = this.temporary("result");
                ctx.code.emit_argument(OpCode::BuildList, 0);
                ctx.code.emit_name(OpCode::StoreLocal, &result);

                this.iterate(ctx, &comp.iterable, &comp.variables, |this, ctx, start, _| {
                    this.predicate(ctx, comp, start)?;
                    this.expression(ctx, &comp.expression)?;
                    ctx.code.emit_name(OpCode::LoadLocal, &result);
                    ctx.code.emit_name(OpCode::LoadAttribute, "append");
                    ctx.code.emit_argument(OpCode::Invoke, 1);
                    ctx.code.emit(OpCode::Pop);
                    Ok(())
                })?;

                ctx.code.emit_name(OpCode::LoadLocal, &result);
                Ok(())
            }),
            ComprehensionKind::Generator => {
                let mut body = EmitContext::function(ctx);
                body.code.set_location(&comp.expression.location);
                self.in_scope(|this| {
                    this.iterate(&mut body, &comp.iterable, &comp.variables, |this, ctx, start, _| {
                        this.predicate(ctx, comp, start)?;
                        this.expression(ctx, &comp.expression)?;
                        ctx.code.emit(OpCode::Yield);
                        Ok(())
                    })
                })?;
                let code = self.finish(body);
                ctx.code
                    .emit_constant(OpCode::LoadConst, Constant::Code(Arc::new(code)));
                ctx.code.emit(OpCode::BuildGenExpr);
                Ok(())
            }
        }
    }

    fn predicate(
        &mut self,
        ctx: &mut EmitContext,
        comp: &ComprehensionExpression,
        start: Label,
    ) -> Result<()> {
        if let Some(predicate) = &comp.predicate {
            self.expression(ctx, predicate)?;
            ctx.code.emit_branch(OpCode::JumpIfFalse, start);
        }
        Ok(())
    }
}
