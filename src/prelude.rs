//! # dotlift Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dotlift library. Import this module to get quick access to the essential
//! types for building IL trees and running the statement transforms.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotlift operations
pub use crate::Error;

/// The result type used throughout dotlift
pub use crate::Result;

/// Metadata token of a method
pub use crate::token::Token;

// ================================================================================================
// IL Tree
// ================================================================================================

/// Function arena, instructions and variables
pub use crate::il::{
    Block, BlockKind, CallInstruction, CallOpCode, ILFunction, ILVariable, InstrId, Instruction,
    InstructionDisplay, InstructionFlags, VariableId, VariableKind,
};

// ================================================================================================
// Type System
// ================================================================================================

/// Type and method definitions
pub use crate::typesystem::{
    KnownTypeCode, MemberOptions, MethodDef, MethodId, MethodModifiers, Parameter, TypeDef,
    TypeFlavor, TypeId, TypeSig, TypeSystem, TypeSystemBuilder,
};

// ================================================================================================
// Transforms
// ================================================================================================

/// Statement transforms and their infrastructure
pub use crate::transforms::{
    DecompilerSettings, EventKind, EventLog, InterpolatedStringTransform, StatementTransform,
    StatementTransformContext, StatementTransformPipeline, TransformContext, TransformScheduler,
};
