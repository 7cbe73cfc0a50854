// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the compiler and the bytecode container.

use crate::source::SourceLocation;
use std::fmt;
use thiserror::Error;

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors that abort compilation of a module.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Semantic errors found before emission started
    #[error("SyntaxError:\n{0}")]
    Syntax(ErrorLog),

    /// A folded constant expression failed to evaluate
    #[error(transparent)]
    Fold(#[from] FoldError),

    /// The compiler reached a state the analysis pass should have ruled out
    #[error("InternalError: {0}")]
    Internal(String),
}

impl CompileError {
    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Arithmetic failures raised while folding literal expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FoldError {
    /// Integer division by zero
    #[error("{0}: division by zero in constant expression")]
    DivisionByZero(SourceLocation),

    /// Integer division overflowed
    #[error("{0}: integer overflow in constant expression")]
    Overflow(SourceLocation),
}

/// A single semantic error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Where the error was found
    pub location: SourceLocation,
    /// What went wrong
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Diagnostics accumulated by the semantic-analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn error(&mut self, location: &SourceLocation, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            location: location.clone(),
            message: message.into(),
        });
    }

    /// Whether no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// The recorded errors in the order they were found.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

/// Errors raised by the low-level bytecode container codec.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes are not a well-formed bytecode file
    #[error("malformed bytecode: {0}")]
    Format(String),
}

impl ContainerError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

/// Errors loading a compiler configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for the configuration
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
