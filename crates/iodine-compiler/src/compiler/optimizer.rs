//! Peephole and control-flow passes over finalized code.
//!
//! Passes only ever see label-free instruction vectors: every branch operand
//! is already an absolute index. Deleting instructions goes through
//! [`compact`], which remaps every branch target.

use super::bytecode::{CodeObject, Instruction, OpCode};
use tracing::{debug, trace};

/// Upper bound on pipeline rounds; each productive round shrinks the code.
const MAX_ROUNDS: usize = 32;

/// A semantics-preserving rewrite of a finalized instruction vector.
pub trait OptimizationPass: Sync {
    /// Name used in trace output.
    fn name(&self) -> &'static str;

    /// Rewrites `code` in place and reports whether anything changed.
    fn apply(&self, code: &mut Vec<Instruction>) -> bool;
}

/// Branch threading and removal of branches to the next instruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlFlowOptimization;

/// Removal of values that are pushed only to be popped.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstructionOptimization;

/// The pipeline every code buffer goes through, in order.
pub static DEFAULT_PASSES: &[&dyn OptimizationPass] =
    &[&ControlFlowOptimization, &InstructionOptimization];

/// An ordered list of passes run to a fixed point.
#[derive(Clone)]
pub struct Optimizer {
    passes: Vec<&'static dyn OptimizationPass>,
}

impl Optimizer {
    /// The default pipeline.
    pub fn new() -> Self {
        Self {
            passes: DEFAULT_PASSES.to_vec(),
        }
    }

    /// Appends a pass after the existing ones.
    pub fn with_pass(mut self, pass: &'static dyn OptimizationPass) -> Self {
        self.passes.push(pass);
        self
    }

    /// Names of the passes, in order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs the pipeline until a full round changes nothing.
    ///
    /// Running the result through the pipeline again returns it unchanged.
    pub fn optimize(&self, code: CodeObject) -> CodeObject {
        let before = code.len();
        let mut instructions = code.into_instructions();

        for _ in 0..MAX_ROUNDS {
            let mut changed = false;
            for pass in &self.passes {
                if pass.apply(&mut instructions) {
                    trace!(pass = pass.name(), len = instructions.len(), "pass changed code");
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        debug!(before, after = instructions.len(), "optimized code object");
        CodeObject::new(instructions)
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("passes", &self.pass_names())
            .finish()
    }
}

/// Marks every index some branch jumps to. The extra slot is the end.
fn branch_targets(code: &[Instruction]) -> Vec<bool> {
    let mut targets = vec![false; code.len() + 1];
    for ins in code.iter().filter(|ins| ins.opcode.is_branch()) {
        if let Some(slot) = usize::try_from(ins.argument)
            .ok()
            .and_then(|t| targets.get_mut(t))
        {
            *slot = true;
        }
    }
    targets
}

/// Deletes the instructions flagged in `removed` and remaps branch targets.
///
/// A branch to a deleted instruction lands on the next surviving one, so
/// only instructions with no net effect on that path may be deleted.
fn compact(code: &mut Vec<Instruction>, removed: &[bool]) {
    let mut new_index = Vec::with_capacity(code.len() + 1);
    let mut kept = 0i32;
    for &gone in removed {
        new_index.push(kept);
        if !gone {
            kept += 1;
        }
    }
    new_index.push(kept);

    let old = std::mem::take(code);
    for (ins, &gone) in old.into_iter().zip(removed) {
        if gone {
            continue;
        }
        let mut ins = ins;
        if ins.opcode.is_branch() {
            if let Some(&target) = usize::try_from(ins.argument)
                .ok()
                .and_then(|t| new_index.get(t))
            {
                ins.argument = target;
            }
        }
        code.push(ins);
    }
}

impl ControlFlowOptimization {
    /// Follows a chain of unconditional jumps; `None` if the chain loops.
    fn final_target(code: &[Instruction], start: usize) -> Option<usize> {
        let mut target = start;
        let mut steps = 0;
        while let Some(ins) = code.get(target) {
            if ins.opcode != OpCode::Jump {
                break;
            }
            steps += 1;
            if steps > code.len() {
                return None;
            }
            target = usize::try_from(ins.argument).ok()?;
        }
        Some(target)
    }

    fn thread_branches(code: &mut [Instruction]) -> bool {
        let mut changed = false;
        for i in 0..code.len() {
            let ins = &code[i];
            if !matches!(
                ins.opcode,
                OpCode::Jump | OpCode::JumpIfTrue | OpCode::JumpIfFalse
            ) {
                continue;
            }
            let Ok(start) = usize::try_from(ins.argument) else {
                continue;
            };
            if let Some(target) = Self::final_target(code, start) {
                if target != start {
                    code[i].argument = target as i32;
                    changed = true;
                }
            }
        }
        changed
    }

    fn drop_branches_to_next(code: &mut Vec<Instruction>) -> bool {
        let mut removed = vec![false; code.len()];
        let mut changed = false;
        for (i, ins) in code.iter_mut().enumerate() {
            if ins.argument != (i + 1) as i32 {
                continue;
            }
            match ins.opcode {
                OpCode::Jump => {
                    removed[i] = true;
                    changed = true;
                }
                // Both outcomes continue at the next instruction; only the pop remains.
                OpCode::JumpIfTrue | OpCode::JumpIfFalse => {
                    ins.opcode = OpCode::Pop;
                    ins.argument = 0;
                    changed = true;
                }
                _ => {}
            }
        }
        if removed.iter().any(|r| *r) {
            compact(code, &removed);
        }
        changed
    }
}

impl OptimizationPass for ControlFlowOptimization {
    fn name(&self) -> &'static str {
        "control-flow"
    }

    fn apply(&self, code: &mut Vec<Instruction>) -> bool {
        let mut changed = false;
        loop {
            let threaded = Self::thread_branches(code);
            let dropped = Self::drop_branches_to_next(code);
            if !(threaded || dropped) {
                return changed;
            }
            changed = true;
        }
    }
}

impl OptimizationPass for InstructionOptimization {
    fn name(&self) -> &'static str {
        "instruction"
    }

    fn apply(&self, code: &mut Vec<Instruction>) -> bool {
        let mut changed = false;
        loop {
            let targets = branch_targets(code);
            let mut removed = vec![false; code.len()];
            let mut any = false;

            let mut i = 0;
            while i < code.len() {
                if code[i].opcode == OpCode::Nop {
                    removed[i] = true;
                    any = true;
                    i += 1;
                    continue;
                }
                let pushes_only = code[i].opcode.is_pure_load() || code[i].opcode == OpCode::Dup;
                if pushes_only
                    && code.get(i + 1).is_some_and(|next| next.opcode == OpCode::Pop)
                    && !targets[i + 1]
                {
                    removed[i] = true;
                    removed[i + 1] = true;
                    any = true;
                    i += 2;
                    continue;
                }
                i += 1;
            }

            if !any {
                return changed;
            }
            compact(code, &removed);
            changed = true;
        }
    }
}
