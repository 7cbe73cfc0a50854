//! Encoding modules into the cache file format.

use super::{ConstantTag, MAGIC, NO_LINE, VERSION};
use crate::compiler::bytecode::{CodeObject, Constant, Instruction, Module};
use std::io::{self, Write};

fn wr_u8<W: Write>(w: &mut W, v: u8) -> io::Result<()> {
    w.write_all(&[v])
}

fn wr_i32<W: Write>(w: &mut W, v: i32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn wr_i64<W: Write>(w: &mut W, v: i64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn wr_len<W: Write>(w: &mut W, len: usize) -> io::Result<()> {
    let len = i32::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length does not fit in i32"))?;
    wr_i32(w, len)
}

fn wr_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    wr_len(w, bytes.len())?;
    w.write_all(bytes)
}

fn wr_str<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    wr_bytes(w, s.as_bytes())
}

/// Writes the header and body of `module`.
pub fn write_to<W: Write>(w: &mut W, module: &Module, timestamp: i64) -> io::Result<()> {
    w.write_all(&MAGIC)?;
    w.write_all(&VERSION)?;
    wr_i64(w, timestamp)?;
    wr_str(w, &module.name)?;
    write_code(w, &module.initializer)
}

fn write_code<W: Write>(w: &mut W, code: &CodeObject) -> io::Result<()> {
    wr_u8(w, ConstantTag::Code as u8)?;
    wr_len(w, code.len())?;
    for ins in code.instructions() {
        write_instruction(w, ins)?;
    }
    Ok(())
}

fn write_instruction<W: Write>(w: &mut W, ins: &Instruction) -> io::Result<()> {
    wr_u8(w, ins.opcode as u8)?;
    wr_i32(w, ins.argument)?;
    match &ins.constant {
        Some(constant) => write_constant(w, constant)?,
        None => wr_u8(w, ConstantTag::Null as u8)?,
    }
    let line = ins
        .line()
        .and_then(|line| i32::try_from(line).ok())
        .unwrap_or(NO_LINE);
    wr_i32(w, line)
}

fn write_constant<W: Write>(w: &mut W, constant: &Constant) -> io::Result<()> {
    match constant {
        Constant::Name(name) => {
            wr_u8(w, ConstantTag::Name as u8)?;
            wr_str(w, name)
        }
        Constant::String(value) => {
            wr_u8(w, ConstantTag::String as u8)?;
            wr_str(w, value)
        }
        Constant::Int(value) => {
            wr_u8(w, ConstantTag::Int as u8)?;
            wr_i64(w, *value)
        }
        Constant::Float(value) => {
            wr_u8(w, ConstantTag::Float as u8)?;
            w.write_all(&value.to_le_bytes())
        }
        Constant::Bool(value) => {
            wr_u8(w, ConstantTag::Bool as u8)?;
            wr_u8(w, u8::from(*value))
        }
        Constant::Null => wr_u8(w, ConstantTag::Null as u8),
        Constant::BigInt(value) => {
            wr_u8(w, ConstantTag::BigInt as u8)?;
            wr_bytes(w, &value.to_signed_bytes_le())
        }
        Constant::Code(code) => write_code(w, code),
    }
}
