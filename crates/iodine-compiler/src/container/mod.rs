//! Bytecode cache files.
//!
//! # Layout
//!
//! All integers are little-endian; strings and byte arrays carry an `i32`
//! length prefix.
//!
//! ```text
//! magic      5 bytes   "IOWIZ"
//! version    3 bytes   major, minor, build
//! timestamp  i64       Unix seconds when the file was written
//! name       string    module name
//! code       code      the initializer
//!
//! code        := tag(7) i32:count instruction*
//! instruction := u8:opcode i32:argument constant i32:line (-1 when unknown)
//! constant    := tag payload
//! ```
//!
//! A cache file is usable only if its magic and version match exactly and
//! its timestamp is not older than the source file it was compiled from.
//! Concurrent writers to the same path are not coordinated; the last write
//! wins.

mod reader;
mod writer;

pub use reader::{MAX_CODE_NESTING, decode, read_header};

use crate::compiler::bytecode::Module;
use crate::error::ContainerError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// File signature.
pub const MAGIC: [u8; 5] = *b"IOWIZ";

/// Format version: major, minor, build.
pub const VERSION: [u8; 3] = [0, 1, 0];

/// File extension for cache files.
pub const EXTENSION: &str = "bytecode";

/// Line number written for instructions without a location.
const NO_LINE: i32 = -1;

/// One-byte discriminants for constant operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum ConstantTag {
    Name = 0,
    String = 1,
    Int = 2,
    Float = 3,
    Bool = 4,
    Null = 5,
    BigInt = 6,
    Code = 7,
}

impl ConstantTag {
    fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => ConstantTag::Name,
            1 => ConstantTag::String,
            2 => ConstantTag::Int,
            3 => ConstantTag::Float,
            4 => ConstantTag::Bool,
            5 => ConstantTag::Null,
            6 => ConstantTag::BigInt,
            7 => ConstantTag::Code,
            _ => return None,
        })
    }
}

/// The fixed-size file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// File signature
    pub magic: [u8; 5],
    /// Toolchain version that wrote the file
    pub version: [u8; 3],
    /// Unix seconds when the file was written
    pub timestamp: i64,
}

impl Header {
    /// Encoded size in bytes.
    pub const SIZE: usize = 5 + 3 + 8;
}

/// Encodes `module` with the given timestamp.
pub fn encode(module: &Module, timestamp: i64) -> Result<Vec<u8>, ContainerError> {
    let mut out = Vec::new();
    writer::write_to(&mut out, module, timestamp)?;
    Ok(out)
}

/// The cache file path for a module in `dir`.
pub fn cache_path(dir: &Path, module_name: &str) -> PathBuf {
    dir.join(format!("{}.{}", module_name, EXTENSION))
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn modified_secs(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(modified.duration_since(UNIX_EPOCH).ok()?.as_secs() as i64)
}

/// Writes `module` to `path`, stamped with the current time.
pub fn write_module(path: &Path, module: &Module) -> Result<(), ContainerError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    writer::write_to(&mut out, module, now())?;
    out.flush()?;
    info!(path = %path.display(), module = %module.name, "wrote bytecode cache");
    Ok(())
}

/// Loads a cached module if it is usable for `source`.
///
/// Every problem (missing or unreadable file, bad magic, version mismatch,
/// malformed body, stale timestamp) is a cache miss, logged at debug level.
/// A missing source file does not make the cache stale.
pub fn try_read_module(cache: &Path, source: &Path) -> Option<Module> {
    let bytes = match std::fs::read(cache) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %cache.display(), error = %e, "cache rejected: unreadable");
            return None;
        }
    };

    let (header, module) = match decode(&bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!(path = %cache.display(), error = %e, "cache rejected");
            return None;
        }
    };

    if let Some(source_time) = modified_secs(source) {
        if header.timestamp < source_time {
            debug!(
                path = %cache.display(),
                cache_time = header.timestamp,
                source_time,
                "cache rejected: stale"
            );
            return None;
        }
    }

    debug!(path = %cache.display(), module = %module.name, "cache accepted");
    Some(module)
}
