//! Bytecode compiler for Iodine.
//!
//! Transforms the AST into code objects that can be executed by the VM.
//!
//! # Module Structure
//!
//! - `bytecode`: Opcodes, instructions, constants and code objects
//! - `builder`: Instruction buffers with forward-referenced labels
//! - `symbols`: Scope stack for name resolution
//! - `context`: Per-body emission state
//! - `analysis`: Semantic checks run before emission
//! - `optimizer`: Passes over finalized code
//! - `codegen`: Code generation from AST

pub mod analysis;
pub mod builder;
pub mod bytecode;
pub mod codegen;
pub mod context;
pub mod optimizer;
pub mod symbols;

pub use builder::{CodeBuilder, Label};
pub use bytecode::{CodeObject, Constant, FunctionFlags, Instruction, Module, OpCode, OperandKind};
pub use codegen::{Compiler, compile};
pub use optimizer::{OptimizationPass, Optimizer};
pub use symbols::SymbolTable;
