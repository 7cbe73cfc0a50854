//! Abstract Syntax Tree (AST) definitions for Iodine.
//!
//! The parser is an external collaborator: it hands the compiler a
//! [`CompilationUnit`] built from these types (directly, or as JSON through
//! serde). Every node owns its children outright and carries the
//! [`SourceLocation`] it was parsed from.

mod reduce;

use crate::source::SourceLocation;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Name of the synthesized constructor every class carries.
pub const CONSTRUCTOR_NAME: &str = "__init__";

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Module name
    pub name: String,
    /// Location of the start of the file
    pub location: SourceLocation,
    /// Top-level statements
    pub body: Vec<Statement>,
}

impl CompilationUnit {
    /// Creates a new compilation unit.
    pub fn new(name: impl Into<String>, location: SourceLocation, body: Vec<Statement>) -> Self {
        Self {
            name: name.into(),
            location,
            body,
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Binary operators.
///
/// The discriminant is the integer immediate of the `BinOp` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BinaryOperator {
    /// `+`
    Add = 0,
    /// `-`
    Sub = 1,
    /// `*`
    Mul = 2,
    /// `/`
    Div = 3,
    /// `%`
    Mod = 4,
    /// `**`
    Pow = 5,
    /// `<<`
    LeftShift = 6,
    /// `>>`
    RightShift = 7,
    /// `&`
    BitAnd = 8,
    /// `|`
    BitOr = 9,
    /// `^`
    BitXor = 10,
    /// `&&`
    BoolAnd = 11,
    /// `||`
    BoolOr = 12,
    /// `==`
    Equals = 13,
    /// `!=`
    NotEquals = 14,
    /// `>`
    GreaterThan = 15,
    /// `>=`
    GreaterThanOrEqual = 16,
    /// `<`
    LessThan = 17,
    /// `<=`
    LessThanOrEqual = 18,
    /// `is`
    InstanceOf = 19,
    /// `isnot`
    NotInstanceOf = 20,
    /// `as`
    DynamicCast = 21,
    /// `??`
    NullCoalescing = 22,
    /// `..` (both ends included)
    ClosedRange = 23,
    /// `...` (upper end excluded)
    HalfRange = 24,
}

impl BinaryOperator {
    /// Whether the operator short-circuits and needs bespoke lowering.
    pub fn is_short_circuit(self) -> bool {
        matches!(
            self,
            BinaryOperator::BoolAnd | BinaryOperator::BoolOr | BinaryOperator::NullCoalescing
        )
    }

    /// Whether the operator yields a boolean comparison result.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equals
                | BinaryOperator::NotEquals
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
        )
    }

    /// Decodes a `BinOp` immediate.
    pub fn from_immediate(value: i32) -> Option<Self> {
        use BinaryOperator::*;
        const ALL: [BinaryOperator; 25] = [
            Add,
            Sub,
            Mul,
            Div,
            Mod,
            Pow,
            LeftShift,
            RightShift,
            BitAnd,
            BitOr,
            BitXor,
            BoolAnd,
            BoolOr,
            Equals,
            NotEquals,
            GreaterThan,
            GreaterThanOrEqual,
            LessThan,
            LessThanOrEqual,
            InstanceOf,
            NotInstanceOf,
            DynamicCast,
            NullCoalescing,
            ClosedRange,
            HalfRange,
        ];
        usize::try_from(value).ok().and_then(|i| ALL.get(i).copied())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum UnaryOperator {
    /// `-x`
    Negate = 0,
    /// `!x`
    BoolNot = 1,
    /// `~x`
    BitNot = 2,
}

impl UnaryOperator {
    /// Decodes a `UnaryOp` immediate.
    pub fn from_immediate(value: i32) -> Option<Self> {
        match value {
            0 => Some(UnaryOperator::Negate),
            1 => Some(UnaryOperator::BoolNot),
            2 => Some(UnaryOperator::BitNot),
            _ => None,
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// An expression together with its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// What kind of expression this is
    pub kind: ExpressionKind,
    /// Where it came from
    pub location: SourceLocation,
}

/// The expression variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    /// 64-bit integer literal
    Integer(i64),
    /// Arbitrary precision integer literal
    BigInteger(BigInt),
    /// Float literal
    Float(f64),
    /// String literal
    String(String),
    /// `true` / `false`
    Boolean(bool),
    /// `null`
    Null,
    /// `self`
    SelfRef,
    /// A bare identifier
    Name(String),
    /// `left op right`
    Binary(BinaryExpression),
    /// `op operand`
    Unary(UnaryExpression),
    /// `target = value` and compound assignment
    Assign(AssignExpression),
    /// `target.field` / `target?.field`
    Member(MemberExpression),
    /// `target[index]`
    Index(IndexExpression),
    /// `target[start:stop:step]`
    Slice(SliceExpression),
    /// `target(args)`
    Call(CallExpression),
    /// `super(args)`
    SuperCall(Vec<Expression>),
    /// `[a, b]`
    List(Vec<Expression>),
    /// `(a, b)`
    Tuple(Vec<Expression>),
    /// `{k: v}`
    Hash(Vec<(Expression, Expression)>),
    /// `lambda (params) => body`
    Lambda(Box<FunctionDeclaration>),
    /// `cond ? a : b` and `a if cond else b`
    Ternary(TernaryExpression),
    /// List comprehension or generator expression
    Comprehension(ComprehensionExpression),
    /// `match subject { case ... }`
    Match(MatchExpression),
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub operand: Box<Expression>,
}

/// An assignment; `operator` is set for compound forms such as `+=`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignExpression {
    /// Name, member or index expression being assigned
    pub target: Box<Expression>,
    /// Operator of a compound assignment
    pub operator: Option<BinaryOperator>,
    /// Right-hand side
    pub value: Box<Expression>,
}

/// Attribute access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpression {
    /// The object
    pub target: Box<Expression>,
    /// Attribute name
    pub field: String,
    /// `?.` access yields null instead of raising
    pub optional: bool,
}

/// Subscript access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexExpression {
    /// The indexed object
    pub target: Box<Expression>,
    /// The index
    pub index: Box<Expression>,
}

/// Slice access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceExpression {
    /// The sliced object
    pub target: Box<Expression>,
    /// Start bound
    pub start: Option<Box<Expression>>,
    /// Stop bound
    pub stop: Option<Box<Expression>>,
    /// Step
    pub step: Option<Box<Expression>>,
}

/// A call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpression {
    /// The callee
    pub target: Box<Expression>,
    /// Positional arguments
    pub arguments: Vec<Expression>,
    /// Keyword arguments in source order
    pub keyword_arguments: Vec<(String, Expression)>,
}

/// A conditional expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TernaryExpression {
    /// The condition
    pub condition: Box<Expression>,
    /// Value when true
    pub when_true: Box<Expression>,
    /// Value when false
    pub when_false: Option<Box<Expression>>,
}

/// Which container a comprehension produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComprehensionKind {
    /// `[x for x in xs]`
    List,
    /// `(x for x in xs)`
    Generator,
}

/// A list comprehension or generator expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensionExpression {
    /// What is produced
    pub kind: ComprehensionKind,
    /// Per-element expression
    pub expression: Box<Expression>,
    /// Loop variables; more than one destructures each element
    pub variables: Vec<String>,
    /// The iterated value
    pub iterable: Box<Expression>,
    /// Optional filter
    pub predicate: Option<Box<Expression>>,
}

/// A match expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchExpression {
    /// The scrutinee
    pub subject: Box<Expression>,
    /// Case arms in source order
    pub arms: Vec<MatchArm>,
}

/// A single `case` arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchArm {
    /// The pattern
    pub pattern: Pattern,
    /// `when` guard
    pub guard: Option<Expression>,
    /// The arm body
    pub body: ArmBody,
    /// Location of the `case` keyword
    pub location: SourceLocation,
}

/// The body of a match arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArmBody {
    /// `case p => expr`, yields the expression's value
    Expression(Expression),
    /// `case p { ... }`, yields null
    Statement(Box<Statement>),
}

/// A pattern in a `case` arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// Equality against a literal or constant expression
    Literal(Expression),
    /// Instance-of check against a type expression; the name `_` always matches
    Type(Expression),
    /// Binds the value to a name and always matches
    Capture(String),
    /// Range membership
    Range {
        /// Lower bound
        start: Expression,
        /// Upper bound
        end: Expression,
        /// Whether the upper bound is included
        inclusive: bool,
    },
    /// Positional tuple pattern
    Tuple(Vec<Pattern>),
    /// `Type(p0, p1, ...)` extraction through the object's unwrap protocol
    Extraction {
        /// The type being extracted
        target: Expression,
        /// Patterns for the unwrapped fields
        fields: Vec<Pattern>,
    },
    /// `p | q`
    Or(Box<Pattern>, Box<Pattern>),
    /// `p & q`
    And(Box<Pattern>, Box<Pattern>),
}

impl Expression {
    /// Creates an expression.
    pub fn new(kind: ExpressionKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    /// Integer literal.
    pub fn integer(value: i64, location: SourceLocation) -> Self {
        Self::new(ExpressionKind::Integer(value), location)
    }

    /// Big integer literal.
    pub fn big_integer(value: BigInt, location: SourceLocation) -> Self {
        Self::new(ExpressionKind::BigInteger(value), location)
    }

    /// String literal.
    pub fn string(value: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ExpressionKind::String(value.into()), location)
    }

    /// Boolean literal.
    pub fn boolean(value: bool, location: SourceLocation) -> Self {
        Self::new(ExpressionKind::Boolean(value), location)
    }

    /// Identifier.
    pub fn name(name: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ExpressionKind::Name(name.into()), location)
    }

    /// Binary expression.
    pub fn binary(
        operator: BinaryOperator,
        left: Expression,
        right: Expression,
        location: SourceLocation,
    ) -> Self {
        Self::new(
            ExpressionKind::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            }),
            location,
        )
    }

    /// Plain assignment.
    pub fn assign(target: Expression, value: Expression, location: SourceLocation) -> Self {
        Self::new(
            ExpressionKind::Assign(AssignExpression {
                target: Box::new(target),
                operator: None,
                value: Box::new(value),
            }),
            location,
        )
    }

    /// Attribute access.
    pub fn member(target: Expression, field: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(
            ExpressionKind::Member(MemberExpression {
                target: Box::new(target),
                field: field.into(),
                optional: false,
            }),
            location,
        )
    }

    /// Call with positional arguments.
    pub fn call(target: Expression, arguments: Vec<Expression>, location: SourceLocation) -> Self {
        Self::new(
            ExpressionKind::Call(CallExpression {
                target: Box::new(target),
                arguments,
                keyword_arguments: Vec::new(),
            }),
            location,
        )
    }

    /// Whether this is a literal the compiler can load as a constant.
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Integer(_)
                | ExpressionKind::BigInteger(_)
                | ExpressionKind::Float(_)
                | ExpressionKind::String(_)
                | ExpressionKind::Boolean(_)
                | ExpressionKind::Null
        )
    }
}

// ============================================================================
// Statements
// ============================================================================

/// A statement together with its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// What kind of statement this is
    pub kind: StatementKind,
    /// Where it came from
    pub location: SourceLocation,
}

/// The statement variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// Expression evaluated for effect
    Expression(Expression),
    /// `{ ... }`, opens a scope
    Block(Vec<Statement>),
    /// `var a = x`, `var a, b = pair`, `global a = x`
    Variable(VariableDeclaration),
    /// `if`
    If(IfStatement),
    /// `while`
    While(WhileStatement),
    /// `do ... while`
    DoWhile(WhileStatement),
    /// C-style `for`
    For(ForStatement),
    /// `for (x in xs)`
    ForEach(ForEachStatement),
    /// `try ... except`
    TryExcept(TryExceptStatement),
    /// `with (resource) { ... }`
    With(WithStatement),
    /// `raise x`
    Raise(Expression),
    /// `return [x]`
    Return(Option<Expression>),
    /// `yield x`
    Yield(Expression),
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `use` import
    Use(UseStatement),
    /// `func`
    Function(FunctionDeclaration),
    /// `@decorator func`
    Decorated(DecoratedFunction),
    /// `class`
    Class(ClassDeclaration),
    /// `contract`
    Contract(TypeDeclaration),
    /// `trait`
    Trait(TypeDeclaration),
    /// `mixin`
    Mixin(TypeDeclaration),
    /// `enum`
    Enum(EnumDeclaration),
}

impl Statement {
    /// Creates a statement.
    pub fn new(kind: StatementKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    /// Expression statement.
    pub fn expression(expression: Expression) -> Self {
        let location = expression.location.clone();
        Self::new(StatementKind::Expression(expression), location)
    }

    /// Block statement.
    pub fn block(body: Vec<Statement>, location: SourceLocation) -> Self {
        Self::new(StatementKind::Block(body), location)
    }

    /// The declared name, for declaration statements.
    pub fn declared_name(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Function(func) => Some(&func.name),
            StatementKind::Decorated(decorated) => Some(&decorated.function.name),
            StatementKind::Class(class) => Some(&class.name),
            StatementKind::Contract(decl)
            | StatementKind::Trait(decl)
            | StatementKind::Mixin(decl) => Some(&decl.name),
            StatementKind::Enum(decl) => Some(&decl.name),
            _ => None,
        }
    }

    /// The name this statement binds when it appears as a class member.
    ///
    /// Declarations and single-name `var` fields qualify; anything else is
    /// not a valid member.
    pub fn member_name(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Variable(var) if var.names.len() == 1 && !var.is_global => {
                Some(&var.names[0])
            }
            _ => self.declared_name(),
        }
    }
}

/// A variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Declared names; more than one destructures the initializer by index
    pub names: Vec<String>,
    /// Initial value
    pub initializer: Option<Expression>,
    /// `global` modifier
    pub is_global: bool,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    /// The condition
    pub condition: Expression,
    /// The then branch
    pub consequent: Box<Statement>,
    /// The optional else branch
    pub alternate: Option<Box<Statement>>,
}

/// A while or do-while statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStatement {
    /// The condition
    pub condition: Expression,
    /// The loop body
    pub body: Box<Statement>,
}

/// A C-style for statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStatement {
    /// Runs once before the loop
    pub initializer: Option<Box<Statement>>,
    /// Checked before each iteration
    pub condition: Option<Expression>,
    /// Runs after each iteration
    pub step: Option<Expression>,
    /// The loop body
    pub body: Box<Statement>,
}

/// A foreach statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForEachStatement {
    /// Loop variables; more than one destructures each element
    pub variables: Vec<String>,
    /// The iterated value
    pub iterable: Expression,
    /// The loop body
    pub body: Box<Statement>,
}

/// A try/except statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryExceptStatement {
    /// Protected body
    pub body: Box<Statement>,
    /// Name the exception is bound to
    pub binding: Option<String>,
    /// Exception types handled; empty handles everything
    pub types: Vec<Expression>,
    /// Handler body
    pub handler: Box<Statement>,
}

/// A with statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithStatement {
    /// The managed resource
    pub resource: Expression,
    /// The body
    pub body: Box<Statement>,
}

/// A use (import) statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseStatement {
    /// Dotted module path
    pub module: String,
    /// Imported items; empty imports the module itself
    pub items: Vec<String>,
    /// `use * from module`
    pub wildcard: bool,
}

// ============================================================================
// Declarations
// ============================================================================

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Parameter {
    /// `name [: Type] [= default]`
    Named {
        /// Parameter name
        name: String,
        /// Type the argument is checked against
        type_hint: Option<Expression>,
        /// Default value
        default: Option<Expression>,
    },
    /// `(a, b)` destructuring parameter
    Tuple(Vec<Parameter>),
}

impl Parameter {
    /// A plain named parameter.
    pub fn named(name: impl Into<String>) -> Self {
        Parameter::Named {
            name: name.into(),
            type_hint: None,
            default: None,
        }
    }

    /// Every name the parameter binds, depth first.
    pub fn bound_names(&self) -> Vec<&str> {
        match self {
            Parameter::Named { name, .. } => vec![name.as_str()],
            Parameter::Tuple(items) => items.iter().flat_map(Parameter::bound_names).collect(),
        }
    }
}

/// A function, method or lambda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Function name (`<lambda>` for lambdas)
    pub name: String,
    /// Documentation string
    pub doc: Option<String>,
    /// Positional parameters
    pub parameters: Vec<Parameter>,
    /// `*args` parameter name
    pub varargs: Option<String>,
    /// `**kwargs` parameter name
    pub kwargs: Option<String>,
    /// The body
    pub body: Vec<Statement>,
    /// Location of the declaration
    pub location: SourceLocation,
}

impl FunctionDeclaration {
    /// Creates a function with plain named parameters.
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        body: Vec<Statement>,
        location: SourceLocation,
    ) -> Self {
        Self {
            name: name.into(),
            doc: None,
            parameters,
            varargs: None,
            kwargs: None,
            body,
            location,
        }
    }

    /// Whether any parameter carries a default value.
    pub fn has_defaults(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| matches!(p, Parameter::Named { default: Some(_), .. }))
    }
}

/// A function with a decorator applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoratedFunction {
    /// The decorator expression
    pub decorator: Expression,
    /// The decorated function
    pub function: FunctionDeclaration,
}

/// A class declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDeclaration {
    /// Class name
    pub name: String,
    /// Documentation string
    pub doc: Option<String>,
    /// Base class
    pub base: Option<Expression>,
    /// Implemented contracts and traits
    pub contracts: Vec<Expression>,
    /// Members (methods, fields, nested declarations)
    pub members: Vec<Statement>,
    /// The constructor, synthesized unless the source supplies one
    pub constructor: FunctionDeclaration,
    /// Location of the declaration
    pub location: SourceLocation,
}

impl ClassDeclaration {
    /// A class with a default constructor that only calls `super()`.
    pub fn new(name: impl Into<String>, location: SourceLocation) -> Self {
        let constructor = synthesize_constructor(&[], &location);
        Self {
            name: name.into(),
            doc: None,
            base: None,
            contracts: Vec::new(),
            members: Vec::new(),
            constructor,
            location,
        }
    }

    /// A record-style class, `class Point(x, y)`.
    ///
    /// The constructor calls `super()` and then assigns each parameter to the
    /// same-named attribute of `self`, in declaration order.
    pub fn record(
        name: impl Into<String>,
        fields: &[&str],
        location: SourceLocation,
    ) -> Self {
        let constructor = synthesize_constructor(fields, &location);
        Self {
            constructor,
            ..Self::new(name, location)
        }
    }
}

fn synthesize_constructor(fields: &[&str], location: &SourceLocation) -> FunctionDeclaration {
    let at = || location.clone();
    let mut body = vec![Statement::expression(Expression::new(
        ExpressionKind::SuperCall(Vec::new()),
        at(),
    ))];
    for field in fields {
        let target = Expression::member(Expression::new(ExpressionKind::SelfRef, at()), *field, at());
        body.push(Statement::expression(Expression::assign(
            target,
            Expression::name(*field, at()),
            at(),
        )));
    }
    let parameters = fields.iter().map(|f| Parameter::named(*f)).collect();
    FunctionDeclaration::new(CONSTRUCTOR_NAME, parameters, body, at())
}

/// A contract, trait or mixin declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    /// Declared name
    pub name: String,
    /// Documentation string
    pub doc: Option<String>,
    /// Members
    pub members: Vec<Statement>,
    /// Location of the declaration
    pub location: SourceLocation,
}

/// An enum declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDeclaration {
    /// Enum name
    pub name: String,
    /// Documentation string
    pub doc: Option<String>,
    /// Items; an item without a value takes the previous value plus one
    pub items: Vec<EnumItem>,
    /// Location of the declaration
    pub location: SourceLocation,
}

/// A single enum item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumItem {
    /// Item name
    pub name: String,
    /// Explicit value
    pub value: Option<i64>,
}
