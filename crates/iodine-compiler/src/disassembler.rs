//! Bytecode disassembler for debugging.

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::compiler::bytecode::{CodeObject, Constant, Instruction, Module, OpCode, OperandKind};
use std::fmt::Write;

/// Disassemble a module into human-readable output.
///
/// The initializer is listed first; nested code objects follow in the order
/// their constants appear, each under its own heading.
pub fn disassemble(module: &Module) -> String {
    let mut output = String::new();
    let mut counter = 0;
    disassemble_code(&module.name, &module.initializer, &mut counter, &mut output);
    output
}

fn disassemble_code(name: &str, code: &CodeObject, counter: &mut usize, output: &mut String) {
    let _ = writeln!(output, "== {} ({} instructions) ==", name, code.len());

    let mut previous_line = None;
    for (offset, ins) in code.instructions().iter().enumerate() {
        disassemble_instruction(offset, ins, previous_line, output);
        previous_line = ins.line();
    }

    for nested in code.nested() {
        *counter += 1;
        let _ = writeln!(output);
        disassemble_code(&format!("{}/<code #{}>", name, counter), nested, counter, output);
    }
}

/// Disassemble a single instruction.
///
/// The line column shows `|` when the line repeats the previous one.
pub fn disassemble_instruction(offset: usize, ins: &Instruction, previous_line: Option<u32>, output: &mut String) {
    let _ = write!(output, "{:04} ", offset);

    match ins.line() {
        Some(line) if Some(line) == previous_line => {
            let _ = write!(output, "   | ");
        }
        Some(line) => {
            let _ = write!(output, "{:4} ", line);
        }
        None => {
            let _ = write!(output, "   - ");
        }
    }

    let _ = write!(output, "{:<22}", ins.opcode.name());

    match ins.opcode.operand_kind() {
        OperandKind::None => {}
        OperandKind::Branch => {
            let _ = write!(output, " -> {:04}", ins.argument);
        }
        OperandKind::Integer => {
            let _ = write!(output, " {}", ins.argument);
            if let Some(operator) = operator_name(ins.opcode, ins.argument) {
                let _ = write!(output, " ({})", operator);
            }
        }
        OperandKind::Constant => {
            let constant = ins.constant.as_ref().unwrap_or(&Constant::Null);
            let _ = write!(output, " {}", constant);
        }
    }

    let _ = writeln!(output);
}

fn operator_name(opcode: OpCode, argument: i32) -> Option<&'static str> {
    match opcode {
        OpCode::BinOp => BinaryOperator::from_immediate(argument).map(|op| match op {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Pow => "**",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::BoolAnd => "&&",
            BinaryOperator::BoolOr => "||",
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::InstanceOf => "is",
            BinaryOperator::NotInstanceOf => "isnot",
            BinaryOperator::DynamicCast => "as",
            BinaryOperator::NullCoalescing => "??",
            BinaryOperator::ClosedRange => "..",
            BinaryOperator::HalfRange => "...",
        }),
        OpCode::UnaryOp => UnaryOperator::from_immediate(argument).map(|op| match op {
            UnaryOperator::Negate => "-",
            UnaryOperator::BoolNot => "!",
            UnaryOperator::BitNot => "~",
        }),
        _ => None,
    }
}
