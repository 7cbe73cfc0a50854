//! Shared helpers for the integration tests.
//!
//! Provides syntax tree builders and [`Machine`], a small stack machine that
//! runs the subset of the instruction set used by straight-line and looping
//! module code. Native functions record every call so tests can observe
//! which operands were evaluated.

#![allow(dead_code)]

use iodine_compiler::ast::*;
use iodine_compiler::compiler::{CodeObject, Constant, OpCode};
use iodine_compiler::{CompilerConfig, Module, SourceLocation, compile};
use std::collections::HashMap;

// =============================================================================
// Syntax tree builders
// =============================================================================

pub fn at() -> SourceLocation {
    SourceLocation::new("test.id", 1, 1)
}

pub fn int(value: i64) -> Expression {
    Expression::integer(value, at())
}

pub fn name(id: &str) -> Expression {
    Expression::name(id, at())
}

pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::binary(operator, left, right, at())
}

/// A call of a global without arguments, e.g. `yes()`.
pub fn call(function: &str) -> Expression {
    Expression::call(name(function), vec![], at())
}

pub fn ternary(condition: Expression, when_true: Expression, when_false: Option<Expression>) -> Expression {
    Expression::new(
        ExpressionKind::Ternary(TernaryExpression {
            condition: Box::new(condition),
            when_true: Box::new(when_true),
            when_false: when_false.map(Box::new),
        }),
        at(),
    )
}

pub fn stmt(kind: StatementKind) -> Statement {
    Statement::new(kind, at())
}

pub fn assign(target: &str, value: Expression) -> Statement {
    Statement::expression(Expression::assign(name(target), value, at()))
}

pub fn var(id: &str, value: Expression) -> Statement {
    stmt(StatementKind::Variable(VariableDeclaration {
        names: vec![id.into()],
        initializer: Some(value),
        is_global: false,
    }))
}

pub fn block(body: Vec<Statement>) -> Statement {
    Statement::block(body, at())
}

pub fn if_else(condition: Expression, consequent: Statement, alternate: Option<Statement>) -> Statement {
    stmt(StatementKind::If(IfStatement {
        condition,
        consequent: Box::new(consequent),
        alternate: alternate.map(Box::new),
    }))
}

pub fn unit(body: Vec<Statement>) -> CompilationUnit {
    CompilationUnit::new("test", at(), body)
}

pub fn compile_ok(body: Vec<Statement>) -> Module {
    compile(&unit(body), &CompilerConfig::default()).expect("Compilation should succeed")
}

pub fn compile_with(body: Vec<Statement>, optimize: bool, fold_constants: bool) -> Module {
    let config = CompilerConfig {
        optimize,
        fold_constants,
        ..CompilerConfig::default()
    };
    compile(&unit(body), &config).expect("Compilation should succeed")
}

// =============================================================================
// Machine
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Native(String),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(_) | Value::Native(_) => true,
        }
    }
}

/// Natives installed as globals in every machine.
///
/// - `yes()` / `no()` return booleans
/// - `nothing()` returns null
/// - `tick()` returns how many native calls have been made so far
pub const NATIVES: &[&str] = &["yes", "no", "nothing", "tick"];

const FUEL: usize = 100_000;

#[derive(Debug)]
pub struct Machine {
    pub globals: HashMap<String, Value>,
    pub locals: HashMap<String, Value>,
    pub calls: Vec<String>,
    stack: Vec<Value>,
}

impl Machine {
    pub fn new() -> Self {
        let globals = NATIVES
            .iter()
            .map(|n| (n.to_string(), Value::Native(n.to_string())))
            .collect();
        Self {
            globals,
            locals: HashMap::new(),
            calls: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Runs a module and returns the machine for inspection.
    pub fn run_module(module: &Module) -> Self {
        let mut machine = Self::new();
        machine.run(&module.initializer);
        assert!(machine.stack.is_empty(), "stack not balanced: {:?}", machine.stack);
        machine
    }

    pub fn global(&self, id: &str) -> Option<&Value> {
        self.globals.get(id)
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow")
    }

    pub fn run(&mut self, code: &CodeObject) -> Option<Value> {
        let instructions = code.instructions();
        let mut pc = 0;
        let mut fuel = FUEL;

        while pc < instructions.len() {
            fuel = fuel.checked_sub(1).expect("program did not terminate");
            let ins = &instructions[pc];
            pc += 1;

            match ins.opcode {
                OpCode::Nop => {}
                OpCode::LoadConst => {
                    let value = match &ins.constant {
                        None | Some(Constant::Null) => Value::Null,
                        Some(Constant::Int(n)) => Value::Int(*n),
                        Some(Constant::Bool(b)) => Value::Bool(*b),
                        Some(Constant::String(s)) => Value::Str(s.clone()),
                        Some(other) => panic!("unsupported constant {:?}", other),
                    };
                    self.stack.push(value);
                }
                OpCode::LoadNull => self.stack.push(Value::Null),
                OpCode::LoadTrue => self.stack.push(Value::Bool(true)),
                OpCode::LoadFalse => self.stack.push(Value::Bool(false)),
                OpCode::LoadGlobal => {
                    let id = operand_name(ins.constant.as_ref());
                    let value = self.globals.get(&id).cloned();
                    self.stack.push(value.unwrap_or_else(|| panic!("undefined global {}", id)));
                }
                OpCode::StoreGlobal => {
                    let value = self.pop();
                    self.globals.insert(operand_name(ins.constant.as_ref()), value);
                }
                OpCode::LoadLocal => {
                    let id = operand_name(ins.constant.as_ref());
                    let value = self.locals.get(&id).cloned();
                    self.stack.push(value.unwrap_or_else(|| panic!("undefined local {}", id)));
                }
                OpCode::StoreLocal => {
                    let value = self.pop();
                    self.locals.insert(operand_name(ins.constant.as_ref()), value);
                }
                OpCode::Dup => {
                    let top = self.stack.last().cloned().expect("stack underflow");
                    self.stack.push(top);
                }
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::BinOp => {
                    let left = self.pop();
                    let right = self.pop();
                    let op = BinaryOperator::from_immediate(ins.argument).expect("binary operator");
                    self.stack.push(binary_op(op, left, right));
                }
                OpCode::UnaryOp => {
                    let operand = self.pop();
                    let op = UnaryOperator::from_immediate(ins.argument).expect("unary operator");
                    let value = match (op, operand) {
                        (UnaryOperator::Negate, Value::Int(n)) => Value::Int(n.wrapping_neg()),
                        (UnaryOperator::BitNot, Value::Int(n)) => Value::Int(!n),
                        (UnaryOperator::BoolNot, v) => Value::Bool(!v.is_truthy()),
                        (op, v) => panic!("cannot apply {:?} to {:?}", op, v),
                    };
                    self.stack.push(value);
                }
                OpCode::Jump => pc = target(ins.argument),
                OpCode::JumpIfTrue => {
                    if self.pop().is_truthy() {
                        pc = target(ins.argument);
                    }
                }
                OpCode::JumpIfFalse => {
                    if !self.pop().is_truthy() {
                        pc = target(ins.argument);
                    }
                }
                OpCode::Invoke => {
                    let callee = self.pop();
                    let argc = usize::try_from(ins.argument).expect("argument count");
                    let at = self.stack.len() - argc;
                    let args = self.stack.split_off(at);
                    let result = self.call(callee, args);
                    self.stack.push(result);
                }
                OpCode::Return => return Some(self.pop()),
                other => panic!("unsupported opcode {:?}", other),
            }
        }

        None
    }

    fn call(&mut self, callee: Value, _args: Vec<Value>) -> Value {
        let Value::Native(function) = callee else {
            panic!("{:?} is not callable", callee);
        };
        self.calls.push(function.clone());
        match function.as_str() {
            "yes" => Value::Bool(true),
            "no" => Value::Bool(false),
            "nothing" => Value::Null,
            "tick" => Value::Int(self.calls.len() as i64),
            other => panic!("unknown native {}", other),
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

fn operand_name(constant: Option<&Constant>) -> String {
    match constant {
        Some(Constant::Name(id)) => id.clone(),
        other => panic!("expected a name operand, found {:?}", other),
    }
}

fn target(argument: i32) -> usize {
    usize::try_from(argument).expect("branch target")
}

fn binary_op(op: BinaryOperator, left: Value, right: Value) -> Value {
    use BinaryOperator::*;
    match (op, &left, &right) {
        (Add, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(*b)),
        (Sub, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_sub(*b)),
        (Mul, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_mul(*b)),
        (Div, Value::Int(a), Value::Int(b)) => Value::Int(a.checked_div(*b).expect("division")),
        (Mod, Value::Int(a), Value::Int(b)) => Value::Int(a.checked_rem(*b).expect("remainder")),
        (LeftShift, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_shl(*b as u32)),
        (RightShift, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_shr(*b as u32)),
        (Equals, _, _) => Value::Bool(left == right),
        (NotEquals, _, _) => Value::Bool(left != right),
        (LessThan, Value::Int(a), Value::Int(b)) => Value::Bool(a < b),
        (LessThanOrEqual, Value::Int(a), Value::Int(b)) => Value::Bool(a <= b),
        (GreaterThan, Value::Int(a), Value::Int(b)) => Value::Bool(a > b),
        (GreaterThanOrEqual, Value::Int(a), Value::Int(b)) => Value::Bool(a >= b),
        (BoolAnd, _, _) => Value::Bool(left.is_truthy() && right.is_truthy()),
        (BoolOr, _, _) => Value::Bool(left.is_truthy() || right.is_truthy()),
        _ => panic!("cannot apply {:?} to {:?} and {:?}", op, left, right),
    }
}
