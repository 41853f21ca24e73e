//! IL instruction kinds.
//!
//! Instructions form a tree: statements live in a [`Block`], and each
//! statement owns its argument sub-trees by [`InstrId`]. The set of kinds is
//! closed; transforms match on it exhaustively.

use std::fmt;

use bitflags::bitflags;

use crate::{il::VariableId, typesystem::MethodId};

/// Index of an instruction node in the arena of its function.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrId(pub(crate) usize);

impl InstrId {
    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}", self.0)
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}", self.0)
    }
}

/// How a call instruction dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallOpCode {
    /// Non-virtual call
    Call,
    /// Virtual call through the receiver
    CallVirt,
    /// Object construction; the constructed object is the result
    NewObj,
}

impl CallOpCode {
    /// IL mnemonic
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::CallVirt => "callvirt",
            Self::NewObj => "newobj",
        }
    }
}

/// A method invocation with positional arguments.
///
/// For instance methods called through `call`/`callvirt`, `arguments[0]` is
/// the receiver and the declared parameters follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInstruction {
    /// Dispatch kind
    pub opcode: CallOpCode,
    /// The invoked method
    pub method: MethodId,
    /// Argument instructions, in evaluation order
    pub arguments: Vec<InstrId>,
}

/// Role of a [`Block`] in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// A basic block of statements.
    ControlFlow,
    /// An interpolated string expression: the statements are handler append
    /// calls, the final instruction produces the string.
    InterpolatedString,
}

/// An ordered statement list with an optional value-producing tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block role
    pub kind: BlockKind,
    /// Statements, in order
    pub instructions: Vec<InstrId>,
    /// The value the block evaluates to
    pub final_instruction: Option<InstrId>,
}

/// A single IL instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Does nothing; also used as a value placeholder.
    Nop,
    /// `ldc.i4` integer literal
    LdcI4(i32),
    /// `ldstr` string literal
    LdStr(String),
    /// `ldnull`
    LdNull,
    /// Load a local's value
    LdLoc(VariableId),
    /// Load a local's address
    LdLoca(VariableId),
    /// Store a value into a local
    StLoc {
        /// Target local
        variable: VariableId,
        /// Stored value
        value: InstrId,
    },
    /// `call`, `callvirt` or `newobj`
    Call(CallInstruction),
    /// Nested block
    Block(Block),
    /// Return from the function
    Return {
        /// Returned value, if any
        value: Option<InstrId>,
    },
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Effects an instruction (and its subtree) may have
    pub struct InstructionFlags: u32 {
        /// Reads the value of a local
        const MAY_READ_LOCALS = 0x0001;
        /// Writes a local
        const MAY_WRITE_LOCALS = 0x0002;
        /// Observable side effect (calls, allocation)
        const SIDE_EFFECT = 0x0004;
        /// May raise an exception
        const MAY_THROW = 0x0008;
        /// Transfers control out of the current statement
        const CONTROL_FLOW = 0x0010;
    }
}

impl Instruction {
    /// IL mnemonic of the instruction kind.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::LdcI4(_) => "ldc.i4",
            Self::LdStr(_) => "ldstr",
            Self::LdNull => "ldnull",
            Self::LdLoc(_) => "ldloc",
            Self::LdLoca(_) => "ldloca",
            Self::StLoc { .. } => "stloc",
            Self::Call(call) => call.opcode.mnemonic(),
            Self::Block(_) => "Block",
            Self::Return { .. } => "ret",
        }
    }

    /// Child instructions in evaluation order.
    #[must_use]
    pub fn children(&self) -> Vec<InstrId> {
        match self {
            Self::Nop
            | Self::LdcI4(_)
            | Self::LdStr(_)
            | Self::LdNull
            | Self::LdLoc(_)
            | Self::LdLoca(_) => Vec::new(),
            Self::StLoc { value, .. } => vec![*value],
            Self::Call(call) => call.arguments.clone(),
            Self::Block(block) => block
                .instructions
                .iter()
                .copied()
                .chain(block.final_instruction)
                .collect(),
            Self::Return { value } => value.iter().copied().collect(),
        }
    }

    /// Replaces the child slot holding `old` with `new`.
    ///
    /// Returns false if `old` is not a child of this instruction.
    pub(crate) fn replace_child(&mut self, old: InstrId, new: InstrId) -> bool {
        let slot = match self {
            Self::StLoc { value, .. } => (*value == old).then_some(value),
            Self::Call(call) => call.arguments.iter_mut().find(|a| **a == old),
            Self::Block(block) => match block.instructions.iter_mut().find(|i| **i == old) {
                Some(slot) => Some(slot),
                None => block.final_instruction.as_mut().filter(|f| **f == old),
            },
            Self::Return { value } => value.as_mut().filter(|v| **v == old),
            _ => None,
        };
        match slot {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        }
    }

    /// Effects of this instruction alone, excluding its children.
    #[must_use]
    pub fn direct_flags(&self) -> InstructionFlags {
        match self {
            Self::Nop | Self::LdcI4(_) | Self::LdStr(_) | Self::LdNull | Self::LdLoca(_) => {
                InstructionFlags::empty()
            }
            Self::LdLoc(_) => InstructionFlags::MAY_READ_LOCALS,
            Self::StLoc { .. } => InstructionFlags::MAY_WRITE_LOCALS,
            Self::Call(_) => InstructionFlags::SIDE_EFFECT | InstructionFlags::MAY_THROW,
            Self::Block(_) => InstructionFlags::empty(),
            Self::Return { .. } => InstructionFlags::CONTROL_FLOW,
        }
    }

    /// Returns the integer literal if this is `ldc.i4`.
    #[must_use]
    pub fn match_ldc_i4(&self) -> Option<i32> {
        match self {
            Self::LdcI4(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string literal if this is `ldstr`.
    #[must_use]
    pub fn match_ldstr(&self) -> Option<&str> {
        match self {
            Self::LdStr(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true if this is `ldloca variable`.
    #[must_use]
    pub fn match_ldloca(&self, variable: VariableId) -> bool {
        matches!(self, Self::LdLoca(v) if *v == variable)
    }

    /// Returns true if this is `ldloc variable` or `ldloca variable`.
    #[must_use]
    pub fn is_load_of(&self, variable: VariableId) -> bool {
        matches!(self, Self::LdLoc(v) | Self::LdLoca(v) if *v == variable)
    }

    /// Returns the call payload of `call`, `callvirt` and `newobj`.
    #[must_use]
    pub fn as_call(&self) -> Option<&CallInstruction> {
        match self {
            Self::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Returns the block payload.
    #[must_use]
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Self::Block(block) => Some(block),
            _ => None,
        }
    }
}
