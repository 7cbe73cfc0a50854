//! Decoding the cache file format.

use super::{ConstantTag, Header, MAGIC, NO_LINE, VERSION};
use crate::compiler::bytecode::{CodeObject, Constant, Instruction, Module, OpCode};
use crate::error::ContainerError;
use crate::source::SourceLocation;
use num_bigint::BigInt;
use std::sync::Arc;

type Result<T> = std::result::Result<T, ContainerError>;

/// Deepest nesting of code objects a file may contain.
pub const MAX_CODE_NESTING: usize = 256;

/// A bounds-checked cursor over the file contents.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// File name attached to restored instruction locations
    file: Arc<str>,
    /// Code objects currently being decoded
    depth: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                ContainerError::format(format!("unexpected end of file at offset {}", self.pos))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn rd_u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn rd_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn rd_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn rd_bytes(&mut self) -> Result<&'a [u8]> {
        let at = self.pos;
        let len = self.rd_i32()?;
        let len = usize::try_from(len)
            .map_err(|_| ContainerError::format(format!("negative length {} at offset {}", len, at)))?;
        self.take(len)
    }

    fn rd_str(&mut self) -> Result<String> {
        let at = self.pos;
        let bytes = self.rd_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ContainerError::format(format!("invalid UTF-8 string at offset {}", at)))
    }

    fn tag(&mut self) -> Result<ConstantTag> {
        let at = self.pos;
        let byte = self.rd_u8()?;
        ConstantTag::from_u8(byte).ok_or_else(|| {
            ContainerError::format(format!("unknown constant tag {} at offset {}", byte, at))
        })
    }

    fn code(&mut self) -> Result<CodeObject> {
        let at = self.pos;
        match self.tag()? {
            ConstantTag::Code => self.code_body(),
            other => Err(ContainerError::format(format!(
                "expected a code object at offset {}, found {:?}",
                at, other
            ))),
        }
    }

    fn code_body(&mut self) -> Result<CodeObject> {
        let at = self.pos;
        if self.depth == MAX_CODE_NESTING {
            return Err(ContainerError::format(format!(
                "code objects nested deeper than {} at offset {}",
                MAX_CODE_NESTING, at
            )));
        }
        self.depth += 1;
        let count = self.rd_i32()?;
        let count = usize::try_from(count).map_err(|_| {
            ContainerError::format(format!("negative instruction count {} at offset {}", count, at))
        })?;
        // Every instruction takes at least ten bytes.
        let mut instructions = Vec::with_capacity(count.min(self.bytes.len() / 10));
        for _ in 0..count {
            instructions.push(self.instruction()?);
        }
        self.depth -= 1;
        Ok(CodeObject::new(instructions))
    }

    fn instruction(&mut self) -> Result<Instruction> {
        let at = self.pos;
        let byte = self.rd_u8()?;
        let opcode = OpCode::from_u8(byte)
            .ok_or_else(|| ContainerError::format(format!("unknown opcode {} at offset {}", byte, at)))?;
        let argument = self.rd_i32()?;
        let constant = self.constant()?;
        let line = self.rd_i32()?;
        let location = (line != NO_LINE)
            .then(|| u32::try_from(line).ok())
            .flatten()
            .map(|line| SourceLocation::new(self.file.clone(), line, 0));
        Ok(Instruction::new(opcode, argument, Some(constant), location))
    }

    fn constant(&mut self) -> Result<Constant> {
        let at = self.pos;
        Ok(match self.tag()? {
            ConstantTag::Name => Constant::Name(self.rd_str()?),
            ConstantTag::String => Constant::String(self.rd_str()?),
            ConstantTag::Int => Constant::Int(self.rd_i64()?),
            ConstantTag::Float => Constant::Float(f64::from_le_bytes(self.array()?)),
            ConstantTag::Bool => match self.rd_u8()? {
                0 => Constant::Bool(false),
                1 => Constant::Bool(true),
                other => {
                    return Err(ContainerError::format(format!(
                        "invalid boolean {} at offset {}",
                        other, at
                    )));
                }
            },
            ConstantTag::Null => Constant::Null,
            ConstantTag::BigInt => Constant::BigInt(BigInt::from_signed_bytes_le(self.rd_bytes()?)),
            ConstantTag::Code => Constant::Code(Arc::new(self.code_body()?)),
        })
    }
}

/// Reads only the header, without validating it.
pub fn read_header(bytes: &[u8]) -> Result<Header> {
    let mut reader = Reader {
        bytes,
        pos: 0,
        file: Arc::from(""),
        depth: 0,
    };
    let magic = reader.array::<5>()?;
    let version = reader.array::<3>()?;
    let timestamp = reader.rd_i64()?;
    Ok(Header {
        magic,
        version,
        timestamp,
    })
}

/// Decodes a whole file.
///
/// Fails on a wrong magic number or version, on truncation, and on trailing
/// bytes. Restored locations carry the module name as their file and only
/// the line number.
pub fn decode(bytes: &[u8]) -> Result<(Header, Module)> {
    let header = read_header(bytes)?;
    if header.magic != MAGIC {
        return Err(ContainerError::format("bad magic number"));
    }
    if header.version != VERSION {
        return Err(ContainerError::format(format!(
            "version {}.{}.{} does not match {}.{}.{}",
            header.version[0], header.version[1], header.version[2], VERSION[0], VERSION[1], VERSION[2]
        )));
    }

    let mut reader = Reader {
        bytes,
        pos: Header::SIZE,
        file: Arc::from(""),
        depth: 0,
    };
    let name = reader.rd_str()?;
    reader.file = Arc::from(name.as_str());
    let initializer = reader.code()?;

    if reader.pos != bytes.len() {
        return Err(ContainerError::format(format!(
            "{} trailing bytes after module",
            bytes.len() - reader.pos
        )));
    }

    let location = SourceLocation::new(reader.file.clone(), 0, 0);
    Ok((
        header,
        Module {
            name,
            location,
            initializer,
        },
    ))
}
