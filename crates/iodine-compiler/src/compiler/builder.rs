//! Per-body instruction buffer with forward-referenced labels.

use super::bytecode::{CodeObject, Constant, Instruction, OpCode};
use crate::source::SourceLocation;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_LABEL_ID: AtomicUsize = AtomicUsize::new(0);

/// A jump target whose position may not be known yet.
///
/// Created by [`CodeBuilder::create_label`] and bound with
/// [`CodeBuilder::mark_label`]. Ids are unique across every builder in the
/// process, so a label can never be confused with another body's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label {
    id: usize,
}

impl Label {
    /// The label's process-wide id.
    pub fn id(self) -> usize {
        self.id
    }
}

/// Builds the instruction sequence for one function, class body or module.
///
/// Instructions are appended in program order. Branches are emitted against
/// labels and patched to absolute instruction indices by
/// [`CodeBuilder::finalize`].
#[derive(Debug, Default)]
pub struct CodeBuilder {
    instructions: Vec<Instruction>,
    /// Label -> bound position
    labels: FxHashMap<Label, Option<usize>>,
    /// (instruction index, label) pairs awaiting patching
    pending: Vec<(usize, Label)>,
    location: Option<SourceLocation>,
}

impl CodeBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions emitted so far.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instructions emitted so far. Branch operands are not patched yet.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Sets the location attached to subsequently emitted instructions.
    pub fn set_location(&mut self, location: &SourceLocation) {
        self.location = Some(location.clone());
    }

    /// The location attached to new instructions.
    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    fn push(&mut self, opcode: OpCode, argument: i32, constant: Option<Constant>) -> usize {
        let index = self.instructions.len();
        self.instructions.push(Instruction::new(
            opcode,
            argument,
            constant,
            self.location.clone(),
        ));
        index
    }

    /// Emits an instruction with no operand.
    pub fn emit(&mut self, opcode: OpCode) -> usize {
        self.push(opcode, 0, None)
    }

    /// Emits an instruction with an integer operand.
    pub fn emit_argument(&mut self, opcode: OpCode, argument: i32) -> usize {
        self.push(opcode, argument, None)
    }

    /// Emits an instruction with a constant operand.
    pub fn emit_constant(&mut self, opcode: OpCode, constant: Constant) -> usize {
        self.push(opcode, 0, Some(constant))
    }

    /// Emits an instruction carrying a name constant.
    pub fn emit_name(&mut self, opcode: OpCode, name: &str) -> usize {
        self.emit_constant(opcode, Constant::name(name))
    }

    /// Emits a branch to `label`, patched at finalize.
    pub fn emit_branch(&mut self, opcode: OpCode, label: Label) -> usize {
        debug_assert!(opcode.is_branch(), "{:?} is not a branch", opcode);
        assert!(
            self.labels.contains_key(&label),
            "label {} belongs to another code builder",
            label.id
        );
        let index = self.push(opcode, 0, None);
        self.pending.push((index, label));
        index
    }

    /// Creates a new, unbound label.
    pub fn create_label(&mut self) -> Label {
        let label = Label {
            id: NEXT_LABEL_ID.fetch_add(1, Ordering::Relaxed),
        };
        self.labels.insert(label, None);
        label
    }

    /// Binds `label` to the position after the last emitted instruction.
    ///
    /// # Panics
    ///
    /// If the label was already marked or came from another builder.
    pub fn mark_label(&mut self, label: Label) {
        let position = self.instructions.len();
        let slot = self
            .labels
            .get_mut(&label)
            .unwrap_or_else(|| panic!("label {} belongs to another code builder", label.id));
        assert!(slot.is_none(), "label {} marked twice", label.id);
        *slot = Some(position);
    }

    /// Patches every branch and freezes the instructions.
    ///
    /// # Panics
    ///
    /// If a referenced label was never marked.
    pub fn finalize(self) -> CodeObject {
        let Self {
            mut instructions,
            labels,
            pending,
            ..
        } = self;

        for (index, label) in pending {
            let position = labels
                .get(&label)
                .copied()
                .flatten()
                .unwrap_or_else(|| panic!("label {} was never marked", label.id));
            instructions[index].argument = position as i32;
        }

        CodeObject::new(instructions)
    }
}
