//! Splicing a matched window into an interpolated string block.
//!
//! Both shapes move the window statements into a new
//! [`BlockKind::InterpolatedString`] block and drop them from the enclosing
//! block. They differ in what the new block replaces and what it evaluates to.
//!
//! Finalize shape:
//!
//! ```text
//! stloc h(newobj DefaultInterpolatedStringHandler..ctor(ldc.i4 2, ldc.i4 1))
//! call AppendLiteral(ldloca h, ldstr "x=")
//! call AppendFormatted(ldloca h, ldloc n)
//! stloc s(call ToStringAndClear(ldloca h))
//! ```
//!
//! becomes
//!
//! ```text
//! stloc s(Block (InterpolatedString) {
//!   stloc h(newobj DefaultInterpolatedStringHandler..ctor(ldc.i4 2, ldc.i4 1))
//!   call AppendLiteral(ldloca h, ldstr "x=")
//!   call AppendFormatted(ldloca h, ldloc n)
//!   final: call ToStringAndClear(ldloca h)
//! })
//! ```
//!
//! Argument shape: the consuming call is rebuilt against the `string`
//! overload, the block takes the handler argument's slot and ends in `nop`.
//!
//! ```text
//! call Log(Block (InterpolatedString) { ...; final: nop })
//! ```

use crate::{
    il::{BlockKind, CallOpCode, ILFunction, InstrId, VariableKind},
    transforms::{interpolation::InterpolationWindow, EventKind, StatementTransformContext},
    typesystem::MethodId,
    Result,
};

/// A fully validated rewrite. Building one performs every check that can
/// fail; applying it only mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rewrite {
    /// Replace the `ToStringAndClear` call by the block, which then ends in
    /// that call.
    Finalize {
        /// The `ToStringAndClear` call.
        call: InstrId,
    },
    /// Replace the consuming call by a call to `overload` with the block in
    /// argument slot `slot`.
    Retarget {
        /// The consuming call.
        call: InstrId,
        /// Dispatch kind of the replacement, same as the original.
        opcode: CallOpCode,
        /// The `string` overload.
        overload: MethodId,
        /// Argument index (receiver included) of the handler.
        slot: usize,
    },
}

/// Applies `rewrite` to `window` inside `block` and returns the new
/// interpolated string block.
///
/// # Errors
///
/// Returns an error only if the arena is inconsistent with the statements
/// the rewrite was planned against.
pub(crate) fn apply(
    function: &mut ILFunction,
    block: InstrId,
    window: &InterpolationWindow,
    rewrite: Rewrite,
    ctx: &StatementTransformContext<'_>,
) -> Result<InstrId> {
    let statements = function.remove_range(block, window.start, window.len())?;
    let removed = statements.len();
    let interpolated = function.block(BlockKind::InterpolatedString, statements, None);

    match rewrite {
        Rewrite::Finalize { call } => {
            function.replace(call, interpolated)?;
            function.set_final_instruction(interpolated, Some(call))?;
        }
        Rewrite::Retarget {
            call,
            opcode,
            overload,
            slot,
        } => {
            let original = function
                .instruction(call)?
                .as_call()
                .map(|c| c.method)
                .ok_or_else(|| malformed_error!("instruction {} is not a call", call))?;
            let mut arguments = function.take_arguments(call)?;
            let Some(argument) = arguments.get_mut(slot) else {
                return Err(malformed_error!(
                    "argument slot {} out of range for call {}",
                    slot,
                    call
                ));
            };
            *argument = interpolated;
            let retargeted = function.call_with(opcode, overload, arguments);
            function.replace(call, retargeted)?;
            let placeholder = function.nop();
            function.set_final_instruction(interpolated, Some(placeholder))?;

            ctx.record(
                EventKind::CallRetargeted,
                retargeted,
                format!(
                    "{} -> {}",
                    ctx.types.method_full_name(original),
                    ctx.types.method_full_name(overload)
                ),
            );
        }
    }

    let variable = function.variable_mut(window.variable);
    variable.kind = VariableKind::InitializerTarget;
    let name = variable.name.clone();
    ctx.record(
        EventKind::InstructionRemoved,
        interpolated,
        format!("{removed} statements moved into {interpolated}"),
    );
    ctx.record(
        EventKind::VariableAbsorbed,
        interpolated,
        format!("{name} is now an initializer target"),
    );
    ctx.record(
        EventKind::InterpolatedStringTransformed,
        interpolated,
        format!("handler {name}"),
    );
    Ok(interpolated)
}
