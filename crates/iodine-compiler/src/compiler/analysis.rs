//! Semantic analysis run before any bytecode is emitted.
//!
//! The analyzer walks the whole unit once, collecting every problem it finds
//! into an [`ErrorLog`] instead of stopping at the first. Emission only starts
//! on a unit that produced no diagnostics, so the code generator can treat
//! the conditions checked here as invariants.

use super::symbols::SymbolTable;
use crate::ast::*;
use crate::error::ErrorLog;
use rustc_hash::FxHashSet;

/// Lexical facts that decide which constructs are legal at a point.
#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    in_loop: bool,
    in_function: bool,
    in_class: bool,
}

struct Analyzer {
    log: ErrorLog,
    frame: Frame,
}

/// Checks `unit` and returns the module-level symbol table.
///
/// The table holds every name the module body declares (functions, classes,
/// variables and imported items) so later passes see them as declared.
pub fn analyze(unit: &CompilationUnit) -> Result<SymbolTable, ErrorLog> {
    let mut analyzer = Analyzer {
        log: ErrorLog::new(),
        frame: Frame::default(),
    };
    let mut symbols = SymbolTable::new();

    for statement in &unit.body {
        declare_module_names(statement, &mut symbols);
        analyzer.statement(statement);
    }

    if analyzer.log.is_empty() {
        Ok(symbols)
    } else {
        Err(analyzer.log)
    }
}

fn declare_module_names(statement: &Statement, symbols: &mut SymbolTable) {
    match &statement.kind {
        StatementKind::Variable(var) => {
            for name in &var.names {
                symbols.add_symbol(name);
            }
        }
        StatementKind::Use(use_stmt) if !use_stmt.wildcard => {
            if use_stmt.items.is_empty() {
                let root = use_stmt.module.rsplit('.').next().unwrap_or(&use_stmt.module);
                symbols.add_symbol(root);
            } else {
                for item in &use_stmt.items {
                    symbols.add_symbol(item);
                }
            }
        }
        StatementKind::Expression(Expression {
            kind: ExpressionKind::Assign(assign),
            ..
        }) => {
            if let ExpressionKind::Name(name) = &assign.target.kind {
                symbols.add_symbol(name);
            }
        }
        _ => {
            if let Some(name) = statement.declared_name() {
                symbols.add_symbol(name);
            }
        }
    }
}

impl Analyzer {
    fn nested(&mut self, frame: Frame, f: impl FnOnce(&mut Self)) {
        let saved = std::mem::replace(&mut self.frame, frame);
        f(self);
        self.frame = saved;
    }

    fn in_loop(&mut self, f: impl FnOnce(&mut Self)) {
        let frame = Frame {
            in_loop: true,
            ..self.frame
        };
        self.nested(frame, f);
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &Statement) {
        let location = &statement.location;
        match &statement.kind {
            StatementKind::Expression(expr) => self.expression(expr),
            StatementKind::Block(body) => self.statements(body),
            StatementKind::Variable(var) => {
                if let Some(init) = &var.initializer {
                    self.expression(init);
                }
            }
            StatementKind::If(if_stmt) => {
                self.expression(&if_stmt.condition);
                self.statement(&if_stmt.consequent);
                if let Some(alternate) = &if_stmt.alternate {
                    self.statement(alternate);
                }
            }
            StatementKind::While(loop_stmt) | StatementKind::DoWhile(loop_stmt) => {
                self.expression(&loop_stmt.condition);
                self.in_loop(|this| this.statement(&loop_stmt.body));
            }
            StatementKind::For(for_stmt) => {
                if let Some(init) = &for_stmt.initializer {
                    self.statement(init);
                }
                if let Some(condition) = &for_stmt.condition {
                    self.expression(condition);
                }
                if let Some(step) = &for_stmt.step {
                    self.expression(step);
                }
                self.in_loop(|this| this.statement(&for_stmt.body));
            }
            StatementKind::ForEach(foreach) => {
                self.expression(&foreach.iterable);
                self.in_loop(|this| this.statement(&foreach.body));
            }
            StatementKind::TryExcept(try_stmt) => {
                self.statement(&try_stmt.body);
                for ty in &try_stmt.types {
                    self.expression(ty);
                }
                self.statement(&try_stmt.handler);
            }
            StatementKind::With(with) => {
                self.expression(&with.resource);
                self.statement(&with.body);
            }
            StatementKind::Raise(expr) => self.expression(expr),
            StatementKind::Return(value) => {
                if !self.frame.in_function {
                    self.log.error(location, "'return' outside of a function");
                }
                if let Some(value) = value {
                    self.expression(value);
                }
            }
            StatementKind::Yield(value) => {
                if !self.frame.in_function {
                    self.log.error(location, "'yield' outside of a function");
                }
                self.expression(value);
            }
            StatementKind::Break => {
                if !self.frame.in_loop {
                    self.log.error(location, "'break' outside of a loop");
                }
            }
            StatementKind::Continue => {
                if !self.frame.in_loop {
                    self.log.error(location, "'continue' outside of a loop");
                }
            }
            StatementKind::Use(_) => {}
            StatementKind::Function(func) => self.function(func),
            StatementKind::Decorated(decorated) => {
                self.expression(&decorated.decorator);
                self.function(&decorated.function);
            }
            StatementKind::Class(class) => self.class(class),
            StatementKind::Contract(decl) => self.interface("contract", decl),
            StatementKind::Trait(decl) => self.interface("trait", decl),
            StatementKind::Mixin(decl) => {
                self.class_members(&decl.members, false);
            }
            StatementKind::Enum(decl) => {
                let mut seen = FxHashSet::default();
                for item in &decl.items {
                    if !seen.insert(item.name.as_str()) {
                        self.log.error(
                            &decl.location,
                            format!("duplicate item '{}' in enum '{}'", item.name, decl.name),
                        );
                    }
                }
            }
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn function(&mut self, func: &FunctionDeclaration) {
        let mut seen = FxHashSet::default();
        let names = func
            .parameters
            .iter()
            .flat_map(Parameter::bound_names)
            .chain(func.varargs.as_deref())
            .chain(func.kwargs.as_deref());
        for name in names {
            if !seen.insert(name) {
                self.log.error(
                    &func.location,
                    format!("duplicate parameter '{}' in '{}'", name, func.name),
                );
            }
        }

        for parameter in &func.parameters {
            self.parameter(parameter);
        }

        let frame = Frame {
            in_loop: false,
            in_function: true,
            in_class: self.frame.in_class,
        };
        self.nested(frame, |this| this.statements(&func.body));
    }

    fn parameter(&mut self, parameter: &Parameter) {
        match parameter {
            Parameter::Named {
                type_hint, default, ..
            } => {
                if let Some(hint) = type_hint {
                    self.expression(hint);
                }
                if let Some(default) = default {
                    self.expression(default);
                }
            }
            Parameter::Tuple(items) => {
                for item in items {
                    self.parameter(item);
                }
            }
        }
    }

    fn class(&mut self, class: &ClassDeclaration) {
        if let Some(base) = &class.base {
            self.expression(base);
        }
        for contract in &class.contracts {
            self.expression(contract);
        }
        self.class_members(&class.members, false);
        let frame = Frame {
            in_class: true,
            ..Frame::default()
        };
        self.nested(frame, |this| this.function(&class.constructor));
    }

    fn interface(&mut self, kind: &str, decl: &TypeDeclaration) {
        for member in &decl.members {
            if !matches!(member.kind, StatementKind::Function(_)) {
                self.log.error(
                    &member.location,
                    format!("{} '{}' may only contain functions", kind, decl.name),
                );
            }
        }
        self.class_members(&decl.members, true);
    }

    fn class_members(&mut self, members: &[Statement], functions_only: bool) {
        let frame = Frame {
            in_class: true,
            ..Frame::default()
        };
        self.nested(frame, |this| {
            for member in members {
                if member.member_name().is_none() && !functions_only {
                    this.log.error(&member.location, "invalid class member");
                    continue;
                }
                this.statement(member);
            }
        });
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self, expr: &Expression) {
        let location = &expr.location;
        match &expr.kind {
            ExpressionKind::Integer(_)
            | ExpressionKind::BigInteger(_)
            | ExpressionKind::Float(_)
            | ExpressionKind::String(_)
            | ExpressionKind::Boolean(_)
            | ExpressionKind::Null
            | ExpressionKind::Name(_) => {}
            ExpressionKind::SelfRef => {
                if !self.frame.in_class {
                    self.log.error(location, "'self' used outside of a class");
                }
            }
            ExpressionKind::Binary(binary) => {
                self.expression(&binary.left);
                self.expression(&binary.right);
            }
            ExpressionKind::Unary(unary) => self.expression(&unary.operand),
            ExpressionKind::Assign(assign) => {
                if !matches!(
                    assign.target.kind,
                    ExpressionKind::Name(_) | ExpressionKind::Member(_) | ExpressionKind::Index(_)
                ) {
                    self.log.error(&assign.target.location, "invalid assignment target");
                }
                self.expression(&assign.target);
                self.expression(&assign.value);
            }
            ExpressionKind::Member(member) => self.expression(&member.target),
            ExpressionKind::Index(index) => {
                self.expression(&index.target);
                self.expression(&index.index);
            }
            ExpressionKind::Slice(slice) => {
                self.expression(&slice.target);
                for bound in [&slice.start, &slice.stop, &slice.step].into_iter().flatten() {
                    self.expression(bound);
                }
            }
            ExpressionKind::Call(call) => {
                self.expression(&call.target);
                self.expressions(&call.arguments);
                for (_, value) in &call.keyword_arguments {
                    self.expression(value);
                }
            }
            ExpressionKind::SuperCall(arguments) => {
                if !self.frame.in_class {
                    self.log.error(location, "'super' used outside of a class");
                }
                self.expressions(arguments);
            }
            ExpressionKind::List(items) | ExpressionKind::Tuple(items) => self.expressions(items),
            ExpressionKind::Hash(pairs) => {
                for (key, value) in pairs {
                    self.expression(key);
                    self.expression(value);
                }
            }
            ExpressionKind::Lambda(func) => self.function(func),
            ExpressionKind::Ternary(ternary) => {
                self.expression(&ternary.condition);
                self.expression(&ternary.when_true);
                if let Some(when_false) = &ternary.when_false {
                    self.expression(when_false);
                }
            }
            ExpressionKind::Comprehension(comp) => {
                self.expression(&comp.iterable);
                self.expression(&comp.expression);
                if let Some(predicate) = &comp.predicate {
                    self.expression(predicate);
                }
            }
            ExpressionKind::Match(match_expr) => {
                self.expression(&match_expr.subject);
                for arm in &match_expr.arms {
                    self.pattern(&arm.pattern);
                    if let Some(guard) = &arm.guard {
                        self.expression(guard);
                    }
                    match &arm.body {
                        ArmBody::Expression(body) => self.expression(body),
                        ArmBody::Statement(body) => self.statement(body),
                    }
                }
            }
        }
    }

    fn expressions(&mut self, exprs: &[Expression]) {
        for expr in exprs {
            self.expression(expr);
        }
    }

    fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Literal(expr) | Pattern::Type(expr) => self.expression(expr),
            Pattern::Capture(_) => {}
            Pattern::Range { start, end, .. } => {
                self.expression(start);
                self.expression(end);
            }
            Pattern::Tuple(items) => {
                for item in items {
                    self.pattern(item);
                }
            }
            Pattern::Extraction { target, fields } => {
                self.expression(target);
                for field in fields {
                    self.pattern(field);
                }
            }
            Pattern::Or(left, right) | Pattern::And(left, right) => {
                self.pattern(left);
                self.pattern(right);
            }
        }
    }
}
