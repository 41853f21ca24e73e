//! The IL tree the statement transforms operate on.
//!
//! This is the decompiler's intermediate representation after stack
//! elimination: every value is an explicit subtree, locals are named
//! [`ILVariable`]s, and statements are grouped into [`Block`]s.
//!
//! # Key Components
//!
//! - [`ILFunction`] - Arena owning all nodes and variables of one method
//! - [`Instruction`] - Closed set of instruction kinds
//! - [`ILVariable`] - Locals with store/load/address counters
//! - [`InstructionFlags`] - Effect summary used for reordering checks
//!
//! # Ownership Model
//!
//! Nodes are addressed by [`InstrId`]. A node lists its children by id and
//! keeps a back link to its parent, so the cyclic parent/child relation of a
//! tree never turns into an ownership cycle and replacing a node in place is
//! O(1) in the size of the tree.

mod function;
mod instruction;
mod printer;
mod variable;

pub use function::ILFunction;
pub use instruction::{
    Block, BlockKind, CallInstruction, CallOpCode, InstrId, Instruction, InstructionFlags,
};
pub use printer::InstructionDisplay;
pub use variable::{ILVariable, VariableId, VariableKind};
