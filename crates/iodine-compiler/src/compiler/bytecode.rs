//! Bytecode definitions.

use crate::source::SourceLocation;
use num_bigint::BigInt;
use std::fmt;
use std::sync::Arc;

/// The shape of an instruction's immediate operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand
    None,
    /// Integer immediate (counts, flags, operator ids)
    Integer,
    /// Boxed constant immediate
    Constant,
    /// Integer immediate holding an absolute instruction index
    Branch,
}

macro_rules! opcodes {
    ($( $(#[$doc:meta])* $name:ident = $value:literal => $kind:ident, )*) => {
        /// Operation codes for the VM.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum OpCode {
            $( $(#[$doc])* $name = $value, )*
        }

        impl OpCode {
            /// Decodes an opcode byte.
            pub fn from_u8(byte: u8) -> Option<Self> {
                match byte {
                    $( $value => Some(OpCode::$name), )*
                    _ => None,
                }
            }

            /// The immediate operand this opcode expects.
            pub fn operand_kind(self) -> OperandKind {
                match self {
                    $( OpCode::$name => OperandKind::$kind, )*
                }
            }

            /// Mnemonic used by the disassembler.
            pub fn name(self) -> &'static str {
                match self {
                    $( OpCode::$name => stringify!($name), )*
                }
            }
        }
    };
}

opcodes! {
    /// No operation
    Nop = 0 => None,
    /// Binary operation, immediate is the operator; computes `stack[-1] op stack[-2]`
    BinOp = 1 => Integer,
    /// Unary operation, immediate is the operator
    UnaryOp = 2 => Integer,
    /// Pop the top value
    Pop = 3 => None,
    /// Duplicate the top value
    Dup = 4 => None,
    /// Push a constant
    LoadConst = 5 => Constant,
    /// Push null
    LoadNull = 6 => None,
    /// Push the receiver
    LoadSelf = 7 => None,
    /// Push true
    LoadTrue = 8 => None,
    /// Push false
    LoadFalse = 9 => None,
    /// Push the exception being handled
    LoadException = 10 => None,
    /// Pop into a local
    StoreLocal = 11 => Constant,
    /// Push a local
    LoadLocal = 12 => Constant,
    /// Pop into a global
    StoreGlobal = 13 => Constant,
    /// Push a global (or builtin)
    LoadGlobal = 14 => Constant,
    /// Pop target, pop value, set attribute
    StoreAttribute = 15 => Constant,
    /// Pop target, push attribute
    LoadAttribute = 16 => Constant,
    /// Pop target, push attribute or null when missing
    LoadAttributeOrNull = 17 => Constant,
    /// Pop target, pop index, pop value, store
    StoreIndex = 18 => None,
    /// Pop target, pop index, push element
    LoadIndex = 19 => None,
    /// Pop target, start, stop, step; push slice
    Slice = 20 => None,
    /// Pop a type, check the named local against it
    CastLocal = 21 => Constant,
    /// Wrap the function on top of the stack so it captures enclosing locals
    BuildClosure = 22 => None,
    /// Build a function; immediate holds [`FunctionFlags`]
    BuildFunction = 23 => Integer,
    /// Build a class; immediate is the member count
    BuildClass = 24 => Integer,
    /// Build a contract; immediate is the member count
    BuildContract = 25 => Integer,
    /// Build a trait; immediate is the member count
    BuildTrait = 26 => Integer,
    /// Build a mixin; immediate is the member count
    BuildMixin = 27 => Integer,
    /// Build an enum; immediate is the item count
    BuildEnum = 28 => Integer,
    /// Build a list from the top `n` values
    BuildList = 29 => Integer,
    /// Build a tuple from the top `n` values
    BuildTuple = 30 => Integer,
    /// Build a hash from the top `n` key/value pairs
    BuildHash = 31 => Integer,
    /// Build a generator from the code object on top of the stack
    BuildGenExpr = 32 => None,
    /// Return the top value
    Return = 33 => None,
    /// Yield the top value
    Yield = 34 => None,
    /// Unconditional jump
    Jump = 35 => Branch,
    /// Pop, jump if truthy
    JumpIfTrue = 36 => Branch,
    /// Pop, jump if falsy
    JumpIfFalse = 37 => Branch,
    /// Pop callee, pop `n` arguments, push result
    Invoke = 38 => Integer,
    /// Like `Invoke`, with a keyword-argument hash below the callee
    InvokeVar = 39 => Integer,
    /// Invoke the superclass constructor with `n` arguments
    InvokeSuper = 40 => Integer,
    /// Pop a value, push its iterator
    GetIter = 41 => None,
    /// Pop an iterator and rewind it
    IterReset = 42 => None,
    /// Pop an iterator, advance it, push whether an element is available
    IterMoveNext = 43 => None,
    /// Pop an iterator, push its current element
    IterGetCurrent = 44 => None,
    /// Install an exception handler at the target
    PushExceptionHandler = 45 => Branch,
    /// Remove the innermost exception handler
    PopExceptionHandler = 46 => None,
    /// Pop `n` types, re-raise unless the exception matches one
    BeginExcept = 47 => Integer,
    /// Pop and raise
    Raise = 48 => None,
    /// Pop a resource and enter it
    BeginWith = 49 => None,
    /// Exit the innermost resource
    EndWith = 50 => None,
    /// Import a module by path
    Import = 51 => Constant,
    /// Pop a tuple of names, import them from a module
    ImportFrom = 52 => Constant,
    /// Import every public name of a module
    ImportAll = 53 => Constant,
    /// Pop value, lower, upper; push membership; immediate 1 includes the upper bound
    RangeCheck = 54 => Integer,
    /// Pop a value, push the tuple its unwrap protocol produces
    Unwrap = 55 => Integer,
}

impl OpCode {
    /// Whether the integer immediate is an instruction index.
    pub fn is_branch(self) -> bool {
        self.operand_kind() == OperandKind::Branch
    }

    /// Conditional branches that pop their condition.
    pub fn is_conditional_branch(self) -> bool {
        matches!(self, OpCode::JumpIfTrue | OpCode::JumpIfFalse)
    }

    /// Instructions that only push a value and have no other effect.
    pub fn is_pure_load(self) -> bool {
        matches!(
            self,
            OpCode::LoadConst
                | OpCode::LoadNull
                | OpCode::LoadSelf
                | OpCode::LoadTrue
                | OpCode::LoadFalse
                | OpCode::LoadLocal
        )
    }
}

/// Flags carried by `BuildFunction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunctionFlags(i32);

impl FunctionFlags {
    /// Accepts `*args`
    pub const VARARGS: i32 = 0x1;
    /// Accepts `**kwargs`
    pub const KWARGS: i32 = 0x2;
    /// A tuple of default values sits below the parameter names
    pub const DEFAULTS: i32 = 0x4;

    /// Builds the flag set.
    pub fn new(varargs: bool, kwargs: bool, defaults: bool) -> Self {
        let mut bits = 0;
        if varargs {
            bits |= Self::VARARGS;
        }
        if kwargs {
            bits |= Self::KWARGS;
        }
        if defaults {
            bits |= Self::DEFAULTS;
        }
        Self(bits)
    }

    /// The raw immediate.
    pub fn bits(self) -> i32 {
        self.0
    }
}

/// A constant operand.
#[derive(Debug, Clone)]
pub enum Constant {
    /// null
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// Arbitrary precision integer
    BigInt(BigInt),
    /// 64-bit float
    Float(f64),
    /// Identifier (local, global or attribute name)
    Name(String),
    /// String value
    String(String),
    /// Nested code object
    Code(Arc<CodeObject>),
}

impl Constant {
    /// Shorthand for a name constant.
    pub fn name(name: impl Into<String>) -> Self {
        Constant::Name(name.into())
    }

    /// The nested code object, if this is one.
    pub fn as_code(&self) -> Option<&CodeObject> {
        match self {
            Constant::Code(code) => Some(code),
            _ => None,
        }
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::Null, Constant::Null) => true,
            (Constant::Bool(a), Constant::Bool(b)) => a == b,
            (Constant::Int(a), Constant::Int(b)) => a == b,
            (Constant::BigInt(a), Constant::BigInt(b)) => a == b,
            // Bitwise so NaN constants compare equal to themselves.
            (Constant::Float(a), Constant::Float(b)) => a.to_bits() == b.to_bits(),
            (Constant::Name(a), Constant::Name(b)) => a == b,
            (Constant::String(a), Constant::String(b)) => a == b,
            (Constant::Code(a), Constant::Code(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => write!(f, "null"),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Int(i) => write!(f, "{}", i),
            Constant::BigInt(i) => write!(f, "{}L", i),
            Constant::Float(x) => write!(f, "{:?}", x),
            Constant::Name(n) => write!(f, "{}", n),
            Constant::String(s) => write!(f, "{:?}", s),
            Constant::Code(code) => write!(f, "<code: {} instructions>", code.len()),
        }
    }
}

/// A single bytecode instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation code
    pub opcode: OpCode,
    /// Integer immediate
    pub argument: i32,
    /// Constant immediate
    pub constant: Option<Constant>,
    /// Source location, when known
    pub location: Option<SourceLocation>,
}

impl Instruction {
    /// Creates an instruction.
    ///
    /// A `Null` constant operand is stored as no operand; the two are
    /// indistinguishable on disk.
    pub fn new(
        opcode: OpCode,
        argument: i32,
        constant: Option<Constant>,
        location: Option<SourceLocation>,
    ) -> Self {
        let constant = constant.filter(|c| !matches!(c, Constant::Null));
        Self {
            opcode,
            argument,
            constant,
            location,
        }
    }

    /// Creates a new instruction with no operand.
    pub fn simple(opcode: OpCode) -> Self {
        Self::new(opcode, 0, None, None)
    }

    /// Creates a new instruction with an integer operand.
    pub fn with_argument(opcode: OpCode, argument: i32) -> Self {
        Self::new(opcode, argument, None, None)
    }

    /// Creates a new instruction with a constant operand.
    pub fn with_constant(opcode: OpCode, constant: Constant) -> Self {
        Self::new(opcode, 0, Some(constant), None)
    }

    /// Source line, if the instruction has a location.
    pub fn line(&self) -> Option<u32> {
        self.location.as_ref().map(|loc| loc.line)
    }
}

/// A finalized, immutable instruction sequence for one body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeObject {
    instructions: Vec<Instruction>,
}

impl CodeObject {
    /// Wraps a finished instruction vector.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// The instructions, in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Code objects referenced through constant operands, one level deep.
    pub fn nested(&self) -> impl Iterator<Item = &CodeObject> {
        self.instructions
            .iter()
            .filter_map(|ins| ins.constant.as_ref().and_then(Constant::as_code))
    }

    pub(crate) fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }
}

/// A compiled module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Module name
    pub name: String,
    /// Where the module was compiled from
    pub location: SourceLocation,
    /// Top-level initializer
    pub initializer: CodeObject,
}
