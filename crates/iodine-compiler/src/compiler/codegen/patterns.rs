//! `match` expressions and pattern compilation.
//!
//! The subject is evaluated once into a temporary. Each arm compiles its
//! pattern as a chain of tests against that temporary; any failing test
//! jumps to the arm's `next` label, so a pattern never leaves anything on the
//! stack.
//!
//! ```text
//!   [subject] StoreLocal $matchN
//!   [pattern 0 tests] -> next0
//!   [guard] JumpIfFalse -> next0
//!   [body 0]
//!   Jump -> end
//! next0:
//!   ...
//!   LoadNull
//! end:
//! ```

use super::Compiler;
use crate::ast::*;
use crate::compiler::builder::Label;
use crate::compiler::bytecode::{Constant, OpCode};
use crate::compiler::context::EmitContext;
use crate::error::{CompileError, Result};

/// Global holding the tuple type, used by tuple patterns.
const TUPLE_TYPE: &str = "Tuple";

/// Global length builtin, used by tuple patterns.
const LEN_BUILTIN: &str = "len";

/// Type pattern that matches anything.
const WILDCARD: &str = "_";

impl Compiler {
    pub(super) fn match_expression(&mut self, ctx: &mut EmitContext, match_expr: &MatchExpression) -> Result<()> {
        let subject = self.temporary("match");
        let end = ctx.code.create_label();

        self.expression(ctx, &match_expr.subject)?;
        ctx.code.emit_name(OpCode::StoreLocal, &subject);

        for arm in &match_expr.arms {
            let next = ctx.code.create_label();
            ctx.code.set_location(&arm.location);

            self.in_scope(|this| {
                ctx.with_pattern(&subject, |ctx| this.pattern(ctx, &arm.pattern, next))?;

                if let Some(guard) = &arm.guard {
                    this.expression(ctx, guard)?;
                    ctx.code.emit_branch(OpCode::JumpIfFalse, next);
                }

                match &arm.body {
                    ArmBody::Expression(body) => this.expression(ctx, body)?,
                    ArmBody::Statement(body) => {
                        this.statement(ctx, body)?;
                        ctx.code.emit(OpCode::LoadNull);
                    }
                }
                ctx.code.emit_branch(OpCode::Jump, end);
                Ok(())
            })?;

            ctx.code.mark_label(next);
        }

        ctx.code.emit(OpCode::LoadNull);
        ctx.code.mark_label(end);
        Ok(())
    }

    /// Emits the tests for `pattern` against the current pattern temporary,
    /// jumping to `fail` when it does not match.
    fn pattern(&mut self, ctx: &mut EmitContext, pattern: &Pattern, fail: Label) -> Result<()> {
        let subject = ctx
            .pattern_temporary()
            .ok_or_else(|| CompileError::internal("pattern compiled outside of a match arm"))?
            .to_string();

        match pattern {
            Pattern::Literal(value) => {
                self.expression(ctx, value)?;
                ctx.code.emit_name(OpCode::LoadLocal, &subject);
                ctx.code
                    .emit_argument(OpCode::BinOp, BinaryOperator::Equals as i32);
                ctx.code.emit_branch(OpCode::JumpIfFalse, fail);
            }
            Pattern::Type(ty) => {
                if !matches!(&ty.kind, ExpressionKind::Name(name) if name == WILDCARD) {
                    self.instance_check(ctx, &subject, fail, |this, ctx| this.expression(ctx, ty))?;
                }
            }
            Pattern::Capture(name) => {
                ctx.code.emit_name(OpCode::LoadLocal, &subject);
                self.declare_name(ctx, name, false);
            }
            Pattern::Range {
                start,
                end,
                inclusive,
            } => {
                self.expression(ctx, end)?;
                self.expression(ctx, start)?;
                ctx.code.emit_name(OpCode::LoadLocal, &subject);
                ctx.code
                    .emit_argument(OpCode::RangeCheck, i32::from(*inclusive));
                ctx.code.emit_branch(OpCode::JumpIfFalse, fail);
            }
            Pattern::Tuple(items) => {
                self.instance_check(ctx, &subject, fail, |_, ctx| {
                    ctx.code.emit_name(OpCode::LoadGlobal, TUPLE_TYPE);
                    Ok(())
                })?;
                ctx.code
                    .emit_constant(OpCode::LoadConst, Constant::Int(items.len() as i64));
                ctx.code.emit_name(OpCode::LoadLocal, &subject);
                ctx.code.emit_name(OpCode::LoadGlobal, LEN_BUILTIN);
                ctx.code.emit_argument(OpCode::Invoke, 1);
                ctx.code
                    .emit_argument(OpCode::BinOp, BinaryOperator::Equals as i32);
                ctx.code.emit_branch(OpCode::JumpIfFalse, fail);

                self.element_patterns(ctx, &subject, items, fail)?;
            }
            Pattern::Extraction { target, fields } => {
                self.instance_check(ctx, &subject, fail, |this, ctx| this.expression(ctx, target))?;
                let unwrapped = self.temporary("match");
                ctx.code.emit_name(OpCode::LoadLocal, &subject);
                ctx.code.emit_argument(OpCode::Unwrap, fields.len() as i32);
                ctx.code.emit_name(OpCode::StoreLocal, &unwrapped);

                self.element_patterns(ctx, &unwrapped, fields, fail)?;
            }
            Pattern::Or(left, right) => {
                let try_right = ctx.code.create_label();
                let matched = ctx.code.create_label();
                self.pattern(ctx, left, try_right)?;
                ctx.code.emit_branch(OpCode::Jump, matched);
                ctx.code.mark_label(try_right);
                self.pattern(ctx, right, fail)?;
                ctx.code.mark_label(matched);
            }
            Pattern::And(left, right) => {
                self.pattern(ctx, left, fail)?;
                self.pattern(ctx, right, fail)?;
            }
        }

        Ok(())
    }

    /// `subject is [type]`, jumping to `fail` when false.
    fn instance_check(
        &mut self,
        ctx: &mut EmitContext,
        subject: &str,
        fail: Label,
        push_type: impl FnOnce(&mut Self, &mut EmitContext) -> Result<()>,
    ) -> Result<()> {
        push_type(self, ctx)?;
        ctx.code.emit_name(OpCode::LoadLocal, subject);
        ctx.code
            .emit_argument(OpCode::BinOp, BinaryOperator::InstanceOf as i32);
        ctx.code.emit_branch(OpCode::JumpIfFalse, fail);
        Ok(())
    }

    /// Matches each element of the indexable `source` against its pattern.
    fn element_patterns(&mut self, ctx: &mut EmitContext, source: &str, patterns: &[Pattern], fail: Label) -> Result<()> {
        for (i, pattern) in patterns.iter().enumerate() {
            let element = self.temporary("match");
            ctx.code.emit_constant(OpCode::LoadConst, Constant::Int(i as i64));
            ctx.code.emit_name(OpCode::LoadLocal, source);
            ctx.code.emit(OpCode::LoadIndex);
            ctx.code.emit_name(OpCode::StoreLocal, &element);
            ctx.with_pattern(&element, |ctx| self.pattern(ctx, pattern, fail))?;
        }
        Ok(())
    }
}
