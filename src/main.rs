// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! iodinec - the Iodine bytecode compiler driver
//!
//! Reads compilation units serialized as JSON, compiles them and writes one
//! `.bytecode` cache file per module.

mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{CheckArgs, Cli, Commands, CompileArgs, DisasmArgs};
use iodine_compiler::config::CompilerConfig;
use iodine_compiler::{CompilationUnit, CompileError, compile_batch, container, disassemble};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let result = match &cli.command {
        Commands::Compile(args) => run_compile(args, &cli),
        Commands::Disasm(args) => run_disasm(args),
        Commands::Check(args) => run_check(args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<CompilerConfig> {
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let mut config = CompilerConfig::discover(&cwd).context("failed to load iodine.toml")?;
    if cli.no_optimize {
        config.optimize = false;
    }
    if cli.no_fold {
        config.fold_constants = false;
    }
    debug!(?config, "loaded configuration");
    Ok(config)
}

fn output_dir(args: &CompileArgs, config: &CompilerConfig) -> Result<PathBuf> {
    if let Some(dir) = args.out_dir.clone().or_else(|| config.cache_dir.clone()) {
        return Ok(dir);
    }
    match dirs::cache_dir() {
        Some(dir) => Ok(dir.join("iodine")),
        None => bail!("no cache directory available; pass --out-dir"),
    }
}

fn read_unit(path: &Path) -> Result<CompilationUnit> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("'{}' is not a valid syntax tree", path.display()))
}

fn run_compile(args: &CompileArgs, cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli)?;
    let out_dir = output_dir(args, &config)?;

    let units = args
        .inputs
        .iter()
        .map(|path| read_unit(path))
        .collect::<Result<Vec<_>>>()?;

    let mut failed = 0;
    for (path, result) in args.inputs.iter().zip(compile_batch(&units, &config)) {
        match result {
            Ok(module) => {
                let target = container::cache_path(&out_dir, &module.name);
                container::write_module(&target, &module)
                    .with_context(|| format!("failed to write '{}'", target.display()))?;
                if args.disasm {
                    print!("{}", disassemble(&module));
                }
                println!(
                    "{} {} -> {}",
                    "Compiled".green().bold(),
                    module.name.cyan(),
                    target.display().dimmed()
                );
            }
            Err(e) => {
                failed += 1;
                report(path, &e);
            }
        }
    }

    if failed > 0 {
        eprintln!(
            "{}: {} of {} units failed to compile",
            "Error".red().bold(),
            failed,
            args.inputs.len()
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn report(path: &Path, error: &CompileError) {
    match error {
        CompileError::Syntax(log) => {
            for diagnostic in log.diagnostics() {
                eprintln!(
                    "{}: {}: {}",
                    "SyntaxError".red().bold(),
                    diagnostic.location.to_string().cyan(),
                    diagnostic.message
                );
            }
        }
        other => {
            eprintln!("{} {}: {}", "Error".red().bold(), path.display().cyan(), other);
        }
    }
}

fn run_disasm(args: &DisasmArgs) -> Result<ExitCode> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read '{}'", args.file.display()))?;
    let (header, module) = container::decode(&bytes)
        .with_context(|| format!("'{}' is not a usable bytecode file", args.file.display()))?;
    println!(
        "{} {}.{}.{}, written at {}",
        "version".dimmed(),
        header.version[0],
        header.version[1],
        header.version[2],
        header.timestamp
    );
    print!("{}", disassemble(&module));
    Ok(ExitCode::SUCCESS)
}

fn run_check(args: &CheckArgs) -> Result<ExitCode> {
    match container::try_read_module(&args.cache, &args.source) {
        Some(module) => {
            println!("{} {}", "Fresh".green().bold(), module.name.cyan());
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("{} {}", "Stale".yellow().bold(), args.cache.display().cyan());
            Ok(ExitCode::FAILURE)
        }
    }
}
