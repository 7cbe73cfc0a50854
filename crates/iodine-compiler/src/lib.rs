// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # iodine-compiler
//!
//! The Iodine bytecode compiler, implemented in Rust.
//!
//! ## Overview
//!
//! This crate takes the AST produced by the Iodine parser and turns it into
//! code objects for the Iodine VM:
//! - Constant folding of literal arithmetic
//! - Semantic analysis with batched diagnostics
//! - Scope-aware code generation with label-based control flow
//! - Peephole and control-flow optimization
//! - A binary cache file format for compiled modules
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use iodine_compiler::{compile, CompilerConfig};
//!
//! let unit = serde_json::from_str(&ast_json)?;
//! let module = compile(&unit, &CompilerConfig::default())?;
//! println!("{}", iodine_compiler::disassemble(&module));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod compiler;
pub mod config;
pub mod container;
pub mod disassembler;
pub mod error;
pub mod source;

// Re-exports for convenience
pub use ast::CompilationUnit;
pub use compiler::{CodeObject, Compiler, Module, compile};
pub use config::CompilerConfig;
pub use disassembler::disassemble;
pub use error::{CompileError, ContainerError, Result};
pub use source::SourceLocation;

/// Compiles independent units, each with its own compiler.
///
/// Results come back in input order. With the `parallel` feature the units
/// are compiled on the rayon thread pool.
pub fn compile_batch(units: &[CompilationUnit], config: &CompilerConfig) -> Vec<Result<Module>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        units.par_iter().map(|unit| compile(unit, config)).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        units.iter().map(|unit| compile(unit, config)).collect()
    }
}
