//! Function, class and type declarations.
//!
//! A declaration first builds its value on the stack and then stores it
//! with [`Compiler::store_declaration`]. Inside a class body the value is
//! left where it is, followed by the member name, for the enclosing
//! `BuildClass` to collect.

use super::Compiler;
use crate::ast::*;
use crate::compiler::bytecode::{Constant, FunctionFlags, OpCode};
use crate::compiler::context::EmitContext;
use crate::error::{CompileError, Result};
use std::sync::Arc;

impl Compiler {
    /// Stores the value on top of the stack under a declared name.
    pub(super) fn store_declaration(&mut self, ctx: &mut EmitContext, name: &str) {
        if ctx.is_in_class_body() {
            return;
        }
        self.declare_name(ctx, name, false);
    }

    pub(super) fn declare_function(&mut self, ctx: &mut EmitContext, func: &FunctionDeclaration) -> Result<()> {
        self.predeclare(ctx, &func.name);
        self.function_value(ctx, func)?;
        self.wrap_closure(ctx);
        self.store_declaration(ctx, &func.name);
        Ok(())
    }

    /// `@decorator func f` is `f = decorator(func f)`.
    pub(super) fn declare_decorated(&mut self, ctx: &mut EmitContext, decorated: &DecoratedFunction) -> Result<()> {
        let func = &decorated.function;
        self.predeclare(ctx, &func.name);
        self.function_value(ctx, func)?;
        self.wrap_closure(ctx);
        self.expression(ctx, &decorated.decorator)?;
        ctx.code.emit_argument(OpCode::Invoke, 1);
        self.store_declaration(ctx, &func.name);
        Ok(())
    }

    /// Makes the function's own name visible to its body.
    fn predeclare(&mut self, ctx: &EmitContext, name: &str) {
        if !ctx.is_in_class_body() && !self.symbols.is_in_global_scope() {
            self.symbols.add_symbol(name);
        }
    }

    fn wrap_closure(&self, ctx: &mut EmitContext) {
        if !ctx.is_in_class_body() && !self.symbols.is_in_global_scope() {
            ctx.code.emit(OpCode::BuildClosure);
        }
    }

    /// Compiles a function body and pushes the function value.
    ///
    /// ```text
    ///   [defaults...] BuildTuple n      ; only with defaults
    ///   "p0" "p1" ... BuildTuple m      ; parameter names
    ///   LoadConst <code>
    ///   LoadConst "doc" | LoadNull
    ///   LoadConst "name"
    ///   BuildFunction flags
    /// ```
    pub(super) fn function_value(&mut self, ctx: &mut EmitContext, func: &FunctionDeclaration) -> Result<()> {
        let mut body = EmitContext::function(ctx);
        body.code.set_location(&func.location);

        let names = self.in_scope(|this| {
            let names = this.parameters(&mut body, func)?;
            this.statements(&mut body, &func.body)?;
            Ok(names)
        })?;
        let code = self.finish(body);

        ctx.code.set_location(&func.location);
        let defaults: Vec<&Expression> = func
            .parameters
            .iter()
            .filter_map(|p| match p {
                Parameter::Named { default, .. } => default.as_ref(),
                Parameter::Tuple(_) => None,
            })
            .collect();
        if !defaults.is_empty() {
            for default in &defaults {
                self.expression(ctx, default)?;
            }
            ctx.code.emit_argument(OpCode::BuildTuple, defaults.len() as i32);
        }

        for name in &names {
            Self::load_string(ctx, name);
        }
        ctx.code.emit_argument(OpCode::BuildTuple, names.len() as i32);
        ctx.code
            .emit_constant(OpCode::LoadConst, Constant::Code(Arc::new(code)));
        match &func.doc {
            Some(doc) => Self::load_string(ctx, doc),
            None => {
                ctx.code.emit(OpCode::LoadNull);
            }
        }
        Self::load_string(ctx, &func.name);

        let flags = FunctionFlags::new(
            func.varargs.is_some(),
            func.kwargs.is_some(),
            !defaults.is_empty(),
        );
        ctx.code.emit_argument(OpCode::BuildFunction, flags.bits());
        Ok(())
    }

    /// Declares the parameters in the body's scope and emits their binding
    /// code. Returns the names the VM binds arguments to, in order.
    fn parameters(&mut self, body: &mut EmitContext, func: &FunctionDeclaration) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(func.parameters.len() + 2);
        let mut tuples = Vec::new();

        for parameter in &func.parameters {
            match parameter {
                Parameter::Named { name, .. } => names.push(name.clone()),
                Parameter::Tuple(items) => {
                    let temp = self.temporary("param");
                    names.push(temp.clone());
                    tuples.push((temp, items));
                }
            }
        }
        names.extend(func.varargs.iter().cloned());
        names.extend(func.kwargs.iter().cloned());

        for name in &names {
            self.symbols.add_symbol(name);
        }

        for parameter in &func.parameters {
            if let Parameter::Named {
                name,
                type_hint: Some(hint),
                ..
            } = parameter
            {
                self.expression(body, hint)?;
                body.code.emit_name(OpCode::CastLocal, name);
            }
        }

        for (temp, items) in tuples {
            self.unpack_parameter(body, &temp, items)?;
        }

        Ok(names)
    }

    /// Binds the elements of a tuple parameter held in local `source`.
    fn unpack_parameter(&mut self, body: &mut EmitContext, source: &str, items: &[Parameter]) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            body.code.emit_constant(OpCode::LoadConst, Constant::Int(i as i64));
            body.code.emit_name(OpCode::LoadLocal, source);
            body.code.emit(OpCode::LoadIndex);
            match item {
                Parameter::Named { name, type_hint, .. } => {
                    self.symbols.add_symbol(name);
                    body.code.emit_name(OpCode::StoreLocal, name);
                    if let Some(hint) = type_hint {
                        self.expression(body, hint)?;
                        body.code.emit_name(OpCode::CastLocal, name);
                    }
                }
                Parameter::Tuple(nested) => {
                    let temp = self.temporary("param");
                    body.code.emit_name(OpCode::StoreLocal, &temp);
                    self.unpack_parameter(body, &temp, nested)?;
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Classes and types
    // ========================================================================

    /// Pushes a class value.
    ///
    /// ```text
    ///   [member0] "member0" ... [memberN] "memberN"
    ///   [contracts...] BuildTuple k
    ///   [base] | LoadNull
    ///   [constructor]
    ///   LoadConst "doc" | LoadNull
    ///   LoadConst "name"
    ///   BuildClass N
    /// ```
    pub(super) fn class_value(&mut self, ctx: &mut EmitContext, class: &ClassDeclaration) -> Result<()> {
        ctx.code.set_location(&class.location);
        let count = self.members(ctx, &class.members)?;

        self.expressions(ctx, &class.contracts)?;
        ctx.code
            .emit_argument(OpCode::BuildTuple, class.contracts.len() as i32);

        match &class.base {
            Some(base) => self.expression(ctx, base)?,
            None => {
                ctx.code.emit(OpCode::LoadNull);
            }
        }

        let mut body = EmitContext::class_body(ctx);
        let constructor = self.function_value(&mut body, &class.constructor);
        body.end_class_body(ctx);
        constructor?;

        match &class.doc {
            Some(doc) => Self::load_string(ctx, doc),
            None => {
                ctx.code.emit(OpCode::LoadNull);
            }
        }
        Self::load_string(ctx, &class.name);
        ctx.code.emit_argument(OpCode::BuildClass, count as i32);
        Ok(())
    }

    /// Pushes a contract, trait or mixin value built with `op`.
    pub(super) fn interface_value(&mut self, ctx: &mut EmitContext, decl: &TypeDeclaration, op: OpCode) -> Result<()> {
        ctx.code.set_location(&decl.location);
        let count = self.members(ctx, &decl.members)?;
        Self::load_string(ctx, &decl.name);
        ctx.code.emit_argument(op, count as i32);
        Ok(())
    }

    /// Pushes an enum value: name/value pairs, then the enum name.
    ///
    /// Items without an explicit value continue from the previous one.
    pub(super) fn enum_value(&mut self, ctx: &mut EmitContext, decl: &EnumDeclaration) {
        ctx.code.set_location(&decl.location);
        let mut next = 0i64;
        for item in &decl.items {
            let value = item.value.unwrap_or(next);
            Self::load_string(ctx, &item.name);
            ctx.code.emit_constant(OpCode::LoadConst, Constant::Int(value));
            next = value.wrapping_add(1);
        }
        Self::load_string(ctx, &decl.name);
        ctx.code
            .emit_argument(OpCode::BuildEnum, decl.items.len() as i32);
    }

    /// Compiles members in a class-body context, each followed by its name.
    /// Returns the member count.
    fn members(&mut self, ctx: &mut EmitContext, members: &[Statement]) -> Result<usize> {
        let mut body = EmitContext::class_body(ctx);
        let result = self.in_scope(|this| {
            for member in members {
                this.member(&mut body, member)?;
            }
            Ok(members.len())
        });
        body.end_class_body(ctx);
        result
    }

    fn member(&mut self, body: &mut EmitContext, member: &Statement) -> Result<()> {
        body.code.set_location(&member.location);
        let name = member.member_name().ok_or_else(|| {
            CompileError::internal(format!("{}: invalid class member reached emission", member.location))
        })?;

        match &member.kind {
            StatementKind::Variable(var) => match &var.initializer {
                Some(init) => self.expression(body, init)?,
                None => {
                    body.code.emit(OpCode::LoadNull);
                }
            },
            StatementKind::Function(func) => self.function_value(body, func)?,
            StatementKind::Decorated(decorated) => self.declare_decorated(body, decorated)?,
            StatementKind::Class(class) => self.class_value(body, class)?,
            StatementKind::Contract(decl) => self.interface_value(body, decl, OpCode::BuildContract)?,
            StatementKind::Trait(decl) => self.interface_value(body, decl, OpCode::BuildTrait)?,
            StatementKind::Mixin(decl) => self.interface_value(body, decl, OpCode::BuildMixin)?,
            StatementKind::Enum(decl) => self.enum_value(body, decl),
            _ => {
                return Err(CompileError::internal(format!(
                    "{}: invalid class member reached emission",
                    member.location
                )));
            }
        }

        Self::load_string(body, name);
        Ok(())
    }
}
