//! Forward search for the next use of a local.
//!
//! Inlining-style transforms need to know whether the value produced by one
//! statement can be moved into a later statement: the move is only legal if
//! the later statement reads the variable before anything that must not be
//! reordered with the moved expression.
//!
//! # Example
//!
//! ```text
//! call AppendLiteral(ldloca h, ldstr "x")        // moved
//! call Log(ldloc a, ldloca h)                    // searched
//! ```
//!
//! Searching the second statement for `h` visits `ldloc a` first. Reading a
//! local can be reordered with a call, so the search continues and finds
//! `ldloca h` as the second argument of `Log`. Had the first argument been a
//! call itself, the two side effects could not be swapped and the search
//! would stop with [`FindResult::Conflict`].

use rustc_hash::FxHashSet;

use crate::il::{ILFunction, InstrId, Instruction, InstructionFlags, VariableId};

/// Result of [`find_load_in_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindResult {
    /// The first use of the variable, a `ldloc` or `ldloca` node.
    Found(InstrId),
    /// The searched tree does not use the variable.
    NotFound,
    /// An instruction that must be evaluated before the use cannot be
    /// reordered with the moved expression.
    Conflict,
}

impl FindResult {
    /// Returns the load if the search succeeded.
    #[must_use]
    pub fn load(self) -> Option<InstrId> {
        match self {
            FindResult::Found(id) => Some(id),
            _ => None,
        }
    }
}

/// Effects of an instruction subtree, with the locals it touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effects {
    /// Union of the flags of every node in the subtree.
    pub flags: InstructionFlags,
    /// Locals read through `ldloc`.
    pub reads: FxHashSet<VariableId>,
    /// Locals written through `stloc`.
    pub writes: FxHashSet<VariableId>,
}

impl Effects {
    /// Collects the effects of `id` and its subtree.
    #[must_use]
    pub fn of(function: &ILFunction, id: InstrId) -> Self {
        let mut effects = Effects {
            flags: InstructionFlags::empty(),
            reads: FxHashSet::default(),
            writes: FxHashSet::default(),
        };
        for node in function.descendants(id) {
            let Some(instr) = function.get(node) else {
                continue;
            };
            effects.flags |= instr.direct_flags();
            match instr {
                Instruction::LdLoc(v) => {
                    effects.reads.insert(*v);
                }
                Instruction::StLoc { variable, .. } => {
                    effects.writes.insert(*variable);
                }
                _ => {}
            }
        }
        effects
    }

    /// Returns true if the two subtrees can be evaluated in either order.
    ///
    /// Two side effects never commute, nor does anything with a control
    /// transfer. A local written by one side must not be read or written by
    /// the other.
    #[must_use]
    pub fn may_reorder(&self, other: &Effects) -> bool {
        if !may_reorder(self.flags, other.flags) {
            return false;
        }
        let conflicts = |writer: &Effects, other: &Effects| {
            writer
                .writes
                .iter()
                .any(|v| other.reads.contains(v) || other.writes.contains(v))
        };
        !conflicts(self, other) && !conflicts(other, self)
    }
}

/// Finds the first load (`ldloc` or `ldloca`) of `variable` in `expr`, in
/// evaluation order, that `moved` could be inlined into.
///
/// Blocks are only searched through their first statement (or their final
/// instruction if they have none); later statements are not evaluated
/// unconditionally before the block's value.
#[must_use]
pub fn find_load_in_next(
    function: &ILFunction,
    expr: InstrId,
    variable: VariableId,
    moved: InstrId,
) -> FindResult {
    let moved = Effects::of(function, moved);
    find_load(function, expr, variable, &moved)
}

fn find_load(
    function: &ILFunction,
    expr: InstrId,
    variable: VariableId,
    moved: &Effects,
) -> FindResult {
    let Some(instr) = function.get(expr) else {
        return FindResult::NotFound;
    };

    if instr.is_load_of(variable) {
        return FindResult::Found(expr);
    }

    if let Instruction::Block(block) = instr {
        let first = block
            .instructions
            .first()
            .copied()
            .or(block.final_instruction);
        return match first {
            Some(first) => find_load(function, first, variable, moved),
            None => FindResult::NotFound,
        };
    }

    for child in instr.children() {
        let result = find_load(function, child, variable, moved);
        if result != FindResult::NotFound {
            return result;
        }
        if !moved.may_reorder(&Effects::of(function, child)) {
            return FindResult::Conflict;
        }
    }
    FindResult::NotFound
}

/// Flag-level reordering check, without looking at which locals are touched.
///
/// Two side effects never commute, nor does anything with a control transfer.
/// Unlike [`Effects::may_reorder`] this ignores which locals either side
/// reads or writes.
#[must_use]
pub fn may_reorder(first: InstructionFlags, second: InstructionFlags) -> bool {
    if first.contains(InstructionFlags::SIDE_EFFECT) && second.contains(InstructionFlags::SIDE_EFFECT)
    {
        return false;
    }
    !first.contains(InstructionFlags::CONTROL_FLOW) && !second.contains(InstructionFlags::CONTROL_FLOW)
}
