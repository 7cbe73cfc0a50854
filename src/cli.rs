//! Command line interface for iodinec.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// iodinec - compiles Iodine syntax trees to cached bytecode
#[derive(Parser, Debug)]
#[command(name = "iodinec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable the optimizer
    #[arg(long, global = true)]
    pub no_optimize: bool,

    /// Disable constant folding
    #[arg(long, global = true)]
    pub no_fold: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile JSON syntax trees into bytecode cache files
    #[command(alias = "c")]
    Compile(CompileArgs),

    /// Print a bytecode cache file in readable form
    #[command(alias = "dis")]
    Disasm(DisasmArgs),

    /// Check whether a cache file is usable for a source file
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Syntax tree files (one JSON compilation unit each)
    #[arg(value_name = "FILE", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory (defaults to the configured cache directory)
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Print the disassembly of each compiled module
    #[arg(short, long)]
    pub disasm: bool,
}

#[derive(Args, Debug)]
pub struct DisasmArgs {
    /// Bytecode cache file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Bytecode cache file
    #[arg(value_name = "CACHE")]
    pub cache: PathBuf,

    /// Source file the cache was compiled from
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,
}
