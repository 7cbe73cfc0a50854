//! Tests for the bytecode compiler.

use super::*;
use crate::ast::*;
use crate::compiler::bytecode::FunctionFlags;
use crate::error::FoldError;
use crate::source::SourceLocation;

fn at() -> SourceLocation {
    SourceLocation::new("test.id", 1, 1)
}

fn int(value: i64) -> Expression {
    Expression::integer(value, at())
}

fn name(id: &str) -> Expression {
    Expression::name(id, at())
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::binary(operator, left, right, at())
}

fn assign(target: &str, value: Expression) -> Statement {
    Statement::expression(Expression::assign(name(target), value, at()))
}

fn stmt(kind: StatementKind) -> Statement {
    Statement::new(kind, at())
}

fn var(id: &str, value: Expression) -> Statement {
    stmt(StatementKind::Variable(VariableDeclaration {
        names: vec![id.into()],
        initializer: Some(value),
        is_global: false,
    }))
}

fn function(id: &str, params: &[&str], body: Vec<Statement>) -> FunctionDeclaration {
    FunctionDeclaration::new(id, params.iter().map(|p| Parameter::named(*p)).collect(), body, at())
}

fn compile_with(body: Vec<Statement>, config: CompilerConfig) -> Result<Module> {
    compile(&CompilationUnit::new("test", at(), body), &config)
}

fn compile_ok(body: Vec<Statement>) -> Module {
    compile_with(body, CompilerConfig::default()).expect("Compilation should succeed")
}

fn compile_raw(body: Vec<Statement>) -> Module {
    let config = CompilerConfig {
        optimize: false,
        ..CompilerConfig::default()
    };
    compile_with(body, config).expect("Compilation should succeed")
}

type Shape = (OpCode, i32, Option<Constant>);

fn shape(code: &CodeObject) -> Vec<Shape> {
    code.instructions()
        .iter()
        .map(|i| (i.opcode, i.argument, i.constant.clone()))
        .collect()
}

fn op(opcode: OpCode) -> Shape {
    (opcode, 0, None)
}

fn arg(opcode: OpCode, argument: i32) -> Shape {
    (opcode, argument, None)
}

fn named(opcode: OpCode, id: &str) -> Shape {
    (opcode, 0, Some(Constant::name(id)))
}

fn konst(constant: Constant) -> Shape {
    (OpCode::LoadConst, 0, Some(constant))
}

fn string(value: &str) -> Shape {
    konst(Constant::String(value.into()))
}

fn ops(code: &CodeObject) -> Vec<OpCode> {
    code.instructions().iter().map(|i| i.opcode).collect()
}

fn first_nested(code: &CodeObject) -> &CodeObject {
    code.nested().next().expect("a nested code object")
}

// ============================================================================
// Literals and folding
// ============================================================================

#[test]
fn test_compiler_default() {
    let compiler = Compiler::default();
    assert!(compiler.config().optimize);
}

#[test]
fn test_compile_empty_unit() {
    let module = compile_ok(vec![]);
    assert_eq!(module.name, "test");
    assert!(module.initializer.is_empty());
}

#[test]
fn test_folded_expression_is_a_single_load() {
    let expr = binary(
        BinaryOperator::Add,
        int(1),
        binary(BinaryOperator::Mul, int(2), int(3)),
    );
    let module = compile_ok(vec![assign("x", expr)]);
    assert_eq!(
        shape(&module.initializer),
        vec![konst(Constant::Int(7)), named(OpCode::StoreGlobal, "x")]
    );
}

#[test]
fn test_unfolded_operands_are_visited_right_to_left() {
    let expr = binary(
        BinaryOperator::Add,
        int(1),
        binary(BinaryOperator::Mul, int(2), int(3)),
    );
    let config = CompilerConfig {
        fold_constants: false,
        ..CompilerConfig::default()
    };
    let module = compile_with(vec![assign("x", expr)], config).unwrap();
    assert_eq!(
        shape(&module.initializer),
        vec![
            konst(Constant::Int(3)),
            konst(Constant::Int(2)),
            arg(OpCode::BinOp, BinaryOperator::Mul as i32),
            konst(Constant::Int(1)),
            arg(OpCode::BinOp, BinaryOperator::Add as i32),
            named(OpCode::StoreGlobal, "x"),
        ]
    );
}

#[test]
fn test_folded_division_by_zero_fails() {
    let expr = binary(BinaryOperator::Div, int(1), int(0));
    let err = compile_with(vec![Statement::expression(expr)], CompilerConfig::default()).unwrap_err();
    assert!(matches!(err, CompileError::Fold(FoldError::DivisionByZero(_))));
}

#[test]
fn test_literal_statement_is_optimized_away() {
    let module = compile_ok(vec![Statement::expression(Expression::string("doc", at()))]);
    assert!(module.initializer.is_empty());
}

#[test]
fn test_instructions_carry_locations() {
    let expr = Expression::name("x", SourceLocation::new("test.id", 12, 5));
    let module = compile_ok(vec![Statement::expression(expr)]);
    assert_eq!(module.initializer.instructions()[0].line(), Some(12));
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_logical_and_short_circuits() {
    let expr = binary(BinaryOperator::BoolAnd, name("a"), name("b"));
    let module = compile_ok(vec![Statement::expression(expr)]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            named(OpCode::LoadGlobal, "a"),
            op(OpCode::Dup),
            arg(OpCode::JumpIfFalse, 5),
            named(OpCode::LoadGlobal, "b"),
            arg(OpCode::BinOp, BinaryOperator::BoolAnd as i32),
            op(OpCode::Pop),
        ]
    );
}

#[test]
fn test_logical_or_short_circuits_on_true() {
    let expr = binary(BinaryOperator::BoolOr, name("a"), name("b"));
    let module = compile_ok(vec![Statement::expression(expr)]);
    assert_eq!(module.initializer.instructions()[2].opcode, OpCode::JumpIfTrue);
}

#[test]
fn test_null_coalescing_lowering() {
    let expr = binary(BinaryOperator::NullCoalescing, name("a"), int(0));
    let module = compile_raw(vec![assign("x", expr)]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            named(OpCode::LoadGlobal, "a"),
            op(OpCode::Dup),
            op(OpCode::LoadNull),
            arg(OpCode::BinOp, BinaryOperator::Equals as i32),
            arg(OpCode::JumpIfFalse, 7),
            op(OpCode::Pop),
            konst(Constant::Int(0)),
            named(OpCode::StoreGlobal, "x"),
        ]
    );
}

#[test]
fn test_dynamic_cast_is_a_plain_binop() {
    let expr = binary(BinaryOperator::DynamicCast, name("a"), name("Int"));
    let module = compile_ok(vec![assign("x", expr)]);
    assert_eq!(
        ops(&module.initializer),
        vec![OpCode::LoadGlobal, OpCode::LoadGlobal, OpCode::BinOp, OpCode::StoreGlobal]
    );
}

#[test]
fn test_ternary_without_else_pushes_nothing_when_false() {
    let expr = Expression::new(
        ExpressionKind::Ternary(TernaryExpression {
            condition: Box::new(name("c")),
            when_true: Box::new(int(1)),
            when_false: None,
        }),
        at(),
    );
    let module = compile_raw(vec![Statement::expression(expr)]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            named(OpCode::LoadGlobal, "c"),
            arg(OpCode::JumpIfFalse, 4),
            konst(Constant::Int(1)),
            arg(OpCode::Jump, 4),
            op(OpCode::Pop),
        ]
    );
}

#[test]
fn test_keyword_arguments_use_invoke_var() {
    let call = Expression::new(
        ExpressionKind::Call(CallExpression {
            target: Box::new(name("f")),
            arguments: vec![int(1)],
            keyword_arguments: vec![("sep".into(), Expression::string(",", at()))],
        }),
        at(),
    );
    let module = compile_ok(vec![Statement::expression(call)]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            konst(Constant::Int(1)),
            string("sep"),
            string(","),
            arg(OpCode::BuildHash, 1),
            named(OpCode::LoadGlobal, "f"),
            arg(OpCode::InvokeVar, 1),
            op(OpCode::Pop),
        ]
    );
}

#[test]
fn test_optional_member_access() {
    let member = Expression::new(
        ExpressionKind::Member(MemberExpression {
            target: Box::new(name("a")),
            field: "b".into(),
            optional: true,
        }),
        at(),
    );
    let module = compile_ok(vec![assign("x", member)]);
    assert_eq!(
        shape(&module.initializer)[1],
        named(OpCode::LoadAttributeOrNull, "b")
    );
}

// ============================================================================
// Assignment and scopes
// ============================================================================

#[test]
fn test_index_assignment_reloads_value() {
    let target = Expression::new(
        ExpressionKind::Index(IndexExpression {
            target: Box::new(name("xs")),
            index: Box::new(int(0)),
        }),
        at(),
    );
    let value = Expression::assign(target, int(5), at());
    let module = compile_raw(vec![assign("y", value)]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            konst(Constant::Int(5)),
            konst(Constant::Int(0)),
            named(OpCode::LoadGlobal, "xs"),
            op(OpCode::StoreIndex),
            konst(Constant::Int(0)),
            named(OpCode::LoadGlobal, "xs"),
            op(OpCode::LoadIndex),
            named(OpCode::StoreGlobal, "y"),
        ]
    );
}

#[test]
fn test_parameters_and_locals_resolve_locally() {
    let body = vec![
        var("y", name("p")),
        stmt(StatementKind::Return(Some(binary(
            BinaryOperator::Add,
            name("y"),
            name("g"),
        )))),
    ];
    let module = compile_ok(vec![
        stmt(StatementKind::Function(function("f", &["p"], body))),
        Statement::expression(name("y")),
    ]);

    let init = &module.initializer;
    assert_eq!(
        ops(init),
        vec![
            OpCode::LoadConst,
            OpCode::BuildTuple,
            OpCode::LoadConst,
            OpCode::LoadNull,
            OpCode::LoadConst,
            OpCode::BuildFunction,
            OpCode::StoreGlobal,
            OpCode::LoadGlobal,
            OpCode::Pop,
        ]
    );
    assert_eq!(shape(init)[7], named(OpCode::LoadGlobal, "y"));

    assert_eq!(
        shape(first_nested(init)),
        vec![
            named(OpCode::LoadLocal, "p"),
            named(OpCode::StoreLocal, "y"),
            named(OpCode::LoadGlobal, "g"),
            named(OpCode::LoadLocal, "y"),
            arg(OpCode::BinOp, BinaryOperator::Add as i32),
            op(OpCode::Return),
        ]
    );
}

#[test]
fn test_nested_function_is_a_closure_over_outer_locals() {
    let inner = function(
        "inner",
        &[],
        vec![stmt(StatementKind::Return(Some(name("outer_local"))))],
    );
    let outer = function(
        "outer",
        &[],
        vec![
            var("outer_local", int(1)),
            stmt(StatementKind::Function(inner)),
        ],
    );
    let module = compile_ok(vec![stmt(StatementKind::Function(outer))]);

    let outer_code = first_nested(&module.initializer);
    let tail: Vec<Shape> = shape(outer_code).into_iter().rev().take(2).collect();
    assert_eq!(
        tail,
        vec![named(OpCode::StoreLocal, "inner"), op(OpCode::BuildClosure)]
    );
    assert_eq!(
        shape(first_nested(outer_code)),
        vec![named(OpCode::LoadLocal, "outer_local"), op(OpCode::Return)]
    );
}

#[test]
fn test_assignment_in_function_to_module_name_stores_global() {
    let module = compile_ok(vec![
        var("counter", int(0)),
        stmt(StatementKind::Function(function(
            "bump",
            &[],
            vec![assign("counter", int(1)), assign("fresh", int(2))],
        ))),
    ]);
    assert_eq!(
        shape(first_nested(&module.initializer)),
        vec![
            konst(Constant::Int(1)),
            named(OpCode::StoreGlobal, "counter"),
            konst(Constant::Int(2)),
            named(OpCode::StoreLocal, "fresh"),
        ]
    );
}

#[test]
fn test_function_stores_to_bare_assigned_module_name() {
    let module = compile_ok(vec![
        assign("counter", int(0)),
        stmt(StatementKind::Function(function("bump", &[], vec![assign("counter", int(1))]))),
    ]);
    assert_eq!(
        shape(first_nested(&module.initializer)),
        vec![konst(Constant::Int(1)), named(OpCode::StoreGlobal, "counter")]
    );
}

#[test]
fn test_module_block_updates_bare_assigned_global() {
    let body = Statement::block(
        vec![assign("total", binary(BinaryOperator::Add, name("total"), int(1)))],
        at(),
    );
    let module = compile_ok(vec![
        assign("total", int(0)),
        stmt(StatementKind::If(IfStatement {
            condition: name("flag"),
            consequent: Box::new(body),
            alternate: None,
        })),
    ]);
    let code = &module.initializer;
    let stores: Vec<_> = code
        .instructions()
        .iter()
        .filter(|i| matches!(i.opcode, OpCode::StoreGlobal | OpCode::StoreLocal))
        .map(|i| (i.opcode, i.constant.clone()))
        .collect();
    let total = Some(Constant::Name("total".into()));
    assert_eq!(
        stores,
        vec![(OpCode::StoreGlobal, total.clone()), (OpCode::StoreGlobal, total)]
    );
    assert!(!ops(code).contains(&OpCode::LoadLocal));
}

#[test]
fn test_global_modifier_forces_global_store() {
    let decl = stmt(StatementKind::Variable(VariableDeclaration {
        names: vec!["g".into()],
        initializer: Some(int(3)),
        is_global: true,
    }));
    let module = compile_ok(vec![stmt(StatementKind::Function(function("f", &[], vec![decl])))]);
    assert_eq!(
        shape(first_nested(&module.initializer)),
        vec![konst(Constant::Int(3)), named(OpCode::StoreGlobal, "g")]
    );
}

#[test]
fn test_compound_assignment() {
    let add = Expression::new(
        ExpressionKind::Assign(AssignExpression {
            target: Box::new(name("n")),
            operator: Some(BinaryOperator::Add),
            value: Box::new(int(1)),
        }),
        at(),
    );
    let module = compile_ok(vec![stmt(StatementKind::Function(function(
        "f",
        &["n"],
        vec![Statement::expression(add)],
    )))]);
    assert_eq!(
        shape(first_nested(&module.initializer)),
        vec![
            konst(Constant::Int(1)),
            named(OpCode::LoadLocal, "n"),
            arg(OpCode::BinOp, BinaryOperator::Add as i32),
            named(OpCode::StoreLocal, "n"),
        ]
    );
}

#[test]
fn test_destructuring_declaration_uses_indexing() {
    let decl = stmt(StatementKind::Variable(VariableDeclaration {
        names: vec!["a".into(), "b".into()],
        initializer: Some(name("pair")),
        is_global: false,
    }));
    let module = compile_ok(vec![decl]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            named(OpCode::LoadGlobal, "pair"),
            named(OpCode::StoreLocal, "$unpack0"),
            konst(Constant::Int(0)),
            named(OpCode::LoadLocal, "$unpack0"),
            op(OpCode::LoadIndex),
            named(OpCode::StoreGlobal, "a"),
            konst(Constant::Int(1)),
            named(OpCode::LoadLocal, "$unpack0"),
            op(OpCode::LoadIndex),
            named(OpCode::StoreGlobal, "b"),
        ]
    );
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_defaults_varargs_and_type_hints() {
    let mut func = FunctionDeclaration::new(
        "f",
        vec![
            Parameter::Named {
                name: "a".into(),
                type_hint: Some(name("Int")),
                default: None,
            },
            Parameter::Named {
                name: "b".into(),
                type_hint: None,
                default: Some(int(2)),
            },
        ],
        vec![],
        at(),
    );
    func.varargs = Some("rest".into());
    func.doc = Some("adds".into());
    let module = compile_ok(vec![stmt(StatementKind::Function(func))]);

    let init = &module.initializer;
    let flags = FunctionFlags::new(true, false, true).bits();
    let listing = shape(init);
    assert_eq!(listing[0], konst(Constant::Int(2)));
    assert_eq!(listing[1], arg(OpCode::BuildTuple, 1));
    assert_eq!(&listing[2..5], &[string("a"), string("b"), string("rest")]);
    assert_eq!(listing[5], arg(OpCode::BuildTuple, 3));
    assert_eq!(listing[7], string("adds"));
    assert_eq!(listing[8], string("f"));
    assert_eq!(listing[9], arg(OpCode::BuildFunction, flags));

    assert_eq!(
        shape(first_nested(init)),
        vec![named(OpCode::LoadGlobal, "Int"), named(OpCode::CastLocal, "a")]
    );
}

#[test]
fn test_tuple_parameter_is_unpacked() {
    let func = FunctionDeclaration::new(
        "f",
        vec![Parameter::Tuple(vec![Parameter::named("x"), Parameter::named("y")])],
        vec![stmt(StatementKind::Return(Some(name("y"))))],
        at(),
    );
    let module = compile_ok(vec![stmt(StatementKind::Function(func))]);
    assert_eq!(shape(&module.initializer)[0], string("$param0"));
    assert_eq!(
        shape(first_nested(&module.initializer)),
        vec![
            konst(Constant::Int(0)),
            named(OpCode::LoadLocal, "$param0"),
            op(OpCode::LoadIndex),
            named(OpCode::StoreLocal, "x"),
            konst(Constant::Int(1)),
            named(OpCode::LoadLocal, "$param0"),
            op(OpCode::LoadIndex),
            named(OpCode::StoreLocal, "y"),
            named(OpCode::LoadLocal, "y"),
            op(OpCode::Return),
        ]
    );
}

#[test]
fn test_decorated_function() {
    let decorated = DecoratedFunction {
        decorator: name("memoize"),
        function: function("fib", &["n"], vec![]),
    };
    let module = compile_ok(vec![stmt(StatementKind::Decorated(decorated))]);
    let tail: Vec<Shape> = shape(&module.initializer).into_iter().rev().take(4).collect();
    assert_eq!(
        tail,
        vec![
            named(OpCode::StoreGlobal, "fib"),
            arg(OpCode::Invoke, 1),
            named(OpCode::LoadGlobal, "memoize"),
            arg(OpCode::BuildFunction, 0),
        ]
    );
}

#[test]
fn test_lambda_at_module_scope_is_not_a_closure() {
    let lambda = Expression::new(
        ExpressionKind::Lambda(Box::new(function("<lambda>", &["x"], vec![]))),
        at(),
    );
    let module = compile_ok(vec![assign("f", lambda)]);
    assert!(!ops(&module.initializer).contains(&OpCode::BuildClosure));
}

// ============================================================================
// Classes and types
// ============================================================================

#[test]
fn test_record_class_constructor() {
    let class = ClassDeclaration::record("Point", &["x", "y"], at());
    let module = compile_ok(vec![stmt(StatementKind::Class(class))]);
    let init = &module.initializer;

    assert_eq!(
        ops(init),
        vec![
            OpCode::BuildTuple,
            OpCode::LoadNull,
            OpCode::LoadConst,
            OpCode::LoadConst,
            OpCode::BuildTuple,
            OpCode::LoadConst,
            OpCode::LoadNull,
            OpCode::LoadConst,
            OpCode::BuildFunction,
            OpCode::LoadNull,
            OpCode::LoadConst,
            OpCode::BuildClass,
            OpCode::StoreGlobal,
        ]
    );
    assert_eq!(shape(init)[7], string(CONSTRUCTOR_NAME));
    assert_eq!(shape(init)[10], string("Point"));
    assert_eq!(shape(init)[11], arg(OpCode::BuildClass, 0));

    assert_eq!(
        shape(first_nested(init)),
        vec![
            arg(OpCode::InvokeSuper, 0),
            op(OpCode::Pop),
            named(OpCode::LoadLocal, "x"),
            op(OpCode::LoadSelf),
            named(OpCode::StoreAttribute, "x"),
            named(OpCode::LoadLocal, "y"),
            op(OpCode::LoadSelf),
            named(OpCode::StoreAttribute, "y"),
        ]
    );
}

#[test]
fn test_class_members_are_followed_by_their_names() {
    let mut class = ClassDeclaration::new("Counter", at());
    class.base = Some(name("Base"));
    class.members = vec![
        var("count", int(0)),
        stmt(StatementKind::Function(function("inc", &[], vec![]))),
    ];
    let module = compile_ok(vec![stmt(StatementKind::Class(class))]);
    let listing = shape(&module.initializer);

    assert_eq!(listing[0], konst(Constant::Int(0)));
    assert_eq!(listing[1], string("count"));
    assert_eq!(listing[6], arg(OpCode::BuildFunction, 0));
    assert_eq!(listing[7], string("inc"));
    assert_eq!(listing[8], arg(OpCode::BuildTuple, 0));
    assert_eq!(listing[9], named(OpCode::LoadGlobal, "Base"));
    assert!(listing.contains(&arg(OpCode::BuildClass, 2)));
    assert!(!listing.contains(&op(OpCode::BuildClosure)));
}

#[test]
fn test_trait_and_enum() {
    let decl = TypeDeclaration {
        name: "Show".into(),
        doc: None,
        members: vec![stmt(StatementKind::Function(function("show", &[], vec![])))],
        location: at(),
    };
    let colors = EnumDeclaration {
        name: "Color".into(),
        doc: None,
        items: vec![
            EnumItem { name: "Red".into(), value: None },
            EnumItem { name: "Green".into(), value: Some(5) },
            EnumItem { name: "Blue".into(), value: None },
        ],
        location: at(),
    };
    let module = compile_ok(vec![
        stmt(StatementKind::Trait(decl)),
        stmt(StatementKind::Enum(colors)),
    ]);
    let listing = shape(&module.initializer);

    assert!(listing.contains(&arg(OpCode::BuildTrait, 1)));
    let start = listing
        .iter()
        .position(|s| *s == string("Red"))
        .expect("enum items");
    assert_eq!(
        &listing[start..],
        &[
            string("Red"),
            konst(Constant::Int(0)),
            string("Green"),
            konst(Constant::Int(5)),
            string("Blue"),
            konst(Constant::Int(6)),
            string("Color"),
            arg(OpCode::BuildEnum, 3),
            named(OpCode::StoreGlobal, "Color"),
        ]
    );
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_while_with_break_and_continue() {
    let body = Statement::block(
        vec![
            stmt(StatementKind::If(IfStatement {
                condition: name("done"),
                consequent: Box::new(stmt(StatementKind::Break)),
                alternate: None,
            })),
            stmt(StatementKind::Continue),
        ],
        at(),
    );
    let loop_stmt = stmt(StatementKind::While(WhileStatement {
        condition: name("running"),
        body: Box::new(body),
    }));
    let module = compile_raw(vec![loop_stmt]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            named(OpCode::LoadGlobal, "running"),
            arg(OpCode::JumpIfFalse, 7),
            named(OpCode::LoadGlobal, "done"),
            arg(OpCode::JumpIfFalse, 5),
            arg(OpCode::Jump, 7),
            arg(OpCode::Jump, 0),
            arg(OpCode::Jump, 0),
        ]
    );
}

#[test]
fn test_do_while_tests_after_body() {
    let loop_stmt = stmt(StatementKind::DoWhile(WhileStatement {
        condition: name("again"),
        body: Box::new(Statement::expression(Expression::call(name("step"), vec![], at()))),
    }));
    let module = compile_ok(vec![loop_stmt]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            named(OpCode::LoadGlobal, "step"),
            arg(OpCode::Invoke, 0),
            op(OpCode::Pop),
            named(OpCode::LoadGlobal, "again"),
            arg(OpCode::JumpIfTrue, 0),
        ]
    );
}

#[test]
fn test_foreach_uses_the_iterator_protocol() {
    let foreach = stmt(StatementKind::ForEach(ForEachStatement {
        variables: vec!["k".into(), "v".into()],
        iterable: name("pairs"),
        body: Box::new(Statement::block(vec![], at())),
    }));
    let module = compile_ok(vec![foreach]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            named(OpCode::LoadGlobal, "pairs"),
            op(OpCode::GetIter),
            op(OpCode::Dup),
            named(OpCode::StoreLocal, "$iter0"),
            op(OpCode::IterReset),
            named(OpCode::LoadLocal, "$iter0"),
            op(OpCode::IterMoveNext),
            arg(OpCode::JumpIfFalse, 20),
            named(OpCode::LoadLocal, "$iter0"),
            op(OpCode::IterGetCurrent),
            named(OpCode::StoreLocal, "$unpack1"),
            konst(Constant::Int(0)),
            named(OpCode::LoadLocal, "$unpack1"),
            op(OpCode::LoadIndex),
            named(OpCode::StoreLocal, "k"),
            konst(Constant::Int(1)),
            named(OpCode::LoadLocal, "$unpack1"),
            op(OpCode::LoadIndex),
            named(OpCode::StoreLocal, "v"),
            arg(OpCode::Jump, 5),
        ]
    );
}

#[test]
fn test_try_except_with_binding() {
    let try_stmt = stmt(StatementKind::TryExcept(TryExceptStatement {
        body: Box::new(Statement::expression(Expression::call(name("risky"), vec![], at()))),
        binding: Some("e".into()),
        types: vec![name("IOException")],
        handler: Box::new(Statement::block(vec![], at())),
    }));
    let module = compile_ok(vec![try_stmt]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            arg(OpCode::PushExceptionHandler, 6),
            named(OpCode::LoadGlobal, "risky"),
            arg(OpCode::Invoke, 0),
            op(OpCode::Pop),
            op(OpCode::PopExceptionHandler),
            arg(OpCode::Jump, 10),
            named(OpCode::LoadGlobal, "IOException"),
            arg(OpCode::BeginExcept, 1),
            op(OpCode::LoadException),
            named(OpCode::StoreLocal, "e"),
        ]
    );
}

#[test]
fn test_with_statement() {
    let with = stmt(StatementKind::With(WithStatement {
        resource: name("lock"),
        body: Box::new(Statement::block(vec![], at())),
    }));
    let module = compile_ok(vec![with]);
    assert_eq!(
        ops(&module.initializer),
        vec![OpCode::LoadGlobal, OpCode::BeginWith, OpCode::EndWith]
    );
}

#[test]
fn test_use_statements() {
    let module = compile_ok(vec![
        stmt(StatementKind::Use(UseStatement {
            module: "os".into(),
            items: vec![],
            wildcard: false,
        })),
        stmt(StatementKind::Use(UseStatement {
            module: "math".into(),
            items: vec!["sin".into(), "cos".into()],
            wildcard: false,
        })),
        stmt(StatementKind::Use(UseStatement {
            module: "strings".into(),
            items: vec![],
            wildcard: true,
        })),
    ]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            named(OpCode::Import, "os"),
            string("sin"),
            string("cos"),
            arg(OpCode::BuildTuple, 2),
            named(OpCode::ImportFrom, "math"),
            named(OpCode::ImportAll, "strings"),
        ]
    );
}

// ============================================================================
// Comprehensions and match
// ============================================================================

#[test]
fn test_list_comprehension_appends() {
    let comp = Expression::new(
        ExpressionKind::Comprehension(ComprehensionExpression {
            kind: ComprehensionKind::List,
            expression: Box::new(name("x")),
            variables: vec!["x".into()],
            iterable: Box::new(name("xs")),
            predicate: Some(Box::new(name("x"))),
        }),
        at(),
    );
    let module = compile_ok(vec![assign("ys", comp)]);
    let listing = shape(&module.initializer);

    assert_eq!(listing[0], arg(OpCode::BuildList, 0));
    assert_eq!(listing[1], named(OpCode::StoreLocal, "$result0"));
    assert!(listing.contains(&named(OpCode::LoadAttribute, "append")));
    assert!(listing.contains(&arg(OpCode::Invoke, 1)));
    assert_eq!(
        &listing[listing.len() - 2..],
        &[named(OpCode::LoadLocal, "$result0"), named(OpCode::StoreGlobal, "ys")]
    );
}

#[test]
fn test_generator_expression_is_a_nested_code_object() {
    let comp = Expression::new(
        ExpressionKind::Comprehension(ComprehensionExpression {
            kind: ComprehensionKind::Generator,
            expression: Box::new(binary(BinaryOperator::Mul, name("x"), int(2))),
            variables: vec!["x".into()],
            iterable: Box::new(name("xs")),
            predicate: None,
        }),
        at(),
    );
    let module = compile_ok(vec![assign("g", comp)]);
    let init = &module.initializer;

    assert_eq!(
        ops(init),
        vec![OpCode::LoadConst, OpCode::BuildGenExpr, OpCode::StoreGlobal]
    );
    let body = ops(first_nested(init));
    assert!(body.contains(&OpCode::GetIter));
    assert!(body.contains(&OpCode::Yield));
}

#[test]
fn test_match_expression() {
    let arms = vec![
        MatchArm {
            pattern: Pattern::Literal(int(0)),
            guard: None,
            body: ArmBody::Expression(Expression::string("zero", at())),
            location: at(),
        },
        MatchArm {
            pattern: Pattern::Capture("n".into()),
            guard: Some(binary(BinaryOperator::GreaterThan, name("n"), int(0))),
            body: ArmBody::Expression(name("n")),
            location: at(),
        },
    ];
    let expr = Expression::new(
        ExpressionKind::Match(MatchExpression {
            subject: Box::new(name("v")),
            arms,
        }),
        at(),
    );
    let module = compile_raw(vec![assign("r", expr)]);
    assert_eq!(
        shape(&module.initializer),
        vec![
            named(OpCode::LoadGlobal, "v"),
            named(OpCode::StoreLocal, "$match0"),
            // case 0 => "zero"
            konst(Constant::Int(0)),
            named(OpCode::LoadLocal, "$match0"),
            arg(OpCode::BinOp, BinaryOperator::Equals as i32),
            arg(OpCode::JumpIfFalse, 8),
            string("zero"),
            arg(OpCode::Jump, 17),
            // case n when n > 0 => n
            named(OpCode::LoadLocal, "$match0"),
            named(OpCode::StoreLocal, "n"),
            konst(Constant::Int(0)),
            named(OpCode::LoadLocal, "n"),
            arg(OpCode::BinOp, BinaryOperator::GreaterThan as i32),
            arg(OpCode::JumpIfFalse, 16),
            named(OpCode::LoadLocal, "n"),
            arg(OpCode::Jump, 17),
            // no match
            op(OpCode::LoadNull),
            named(OpCode::StoreGlobal, "r"),
        ]
    );
}

#[test]
fn test_wildcard_type_pattern_emits_no_test() {
    let arms = vec![MatchArm {
        pattern: Pattern::Type(name("_")),
        guard: None,
        body: ArmBody::Expression(int(1)),
        location: at(),
    }];
    let expr = Expression::new(
        ExpressionKind::Match(MatchExpression {
            subject: Box::new(name("v")),
            arms,
        }),
        at(),
    );
    let module = compile_raw(vec![assign("r", expr)]);
    assert!(!ops(&module.initializer).contains(&OpCode::BinOp));
}

#[test]
fn test_tuple_pattern_checks_type_and_length() {
    let arms = vec![MatchArm {
        pattern: Pattern::Tuple(vec![Pattern::Capture("a".into()), Pattern::Literal(int(1))]),
        guard: None,
        body: ArmBody::Expression(name("a")),
        location: at(),
    }];
    let expr = Expression::new(
        ExpressionKind::Match(MatchExpression {
            subject: Box::new(name("v")),
            arms,
        }),
        at(),
    );
    let module = compile_raw(vec![assign("r", expr)]);
    let listing = shape(&module.initializer);
    assert_eq!(listing[2], named(OpCode::LoadGlobal, "Tuple"));
    assert_eq!(listing[4], arg(OpCode::BinOp, BinaryOperator::InstanceOf as i32));
    assert!(listing.contains(&named(OpCode::LoadGlobal, "len")));
    assert!(listing.contains(&named(OpCode::StoreLocal, "a")));
    assert!(listing.contains(&named(OpCode::StoreLocal, "$match2")));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_semantic_errors_abort_before_emission() {
    let err = compile_with(
        vec![stmt(StatementKind::Break), stmt(StatementKind::Continue)],
        CompilerConfig::default(),
    )
    .unwrap_err();
    match err {
        CompileError::Syntax(log) => assert_eq!(log.len(), 2),
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn test_compiler_instance_is_reusable() {
    let mut compiler = Compiler::default();
    let unit = CompilationUnit::new("a", at(), vec![var("x", int(1))]);
    let first = compiler.compile(&unit).unwrap();
    let second = compiler.compile(&unit).unwrap();
    assert_eq!(first, second);
}
