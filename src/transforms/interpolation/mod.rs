//! Interpolated string handler transform.
//!
//! Since C# 10 the compiler lowers `$"x={n}"` to explicit calls on a
//! `DefaultInterpolatedStringHandler` local. This transform recognizes that
//! lowering and folds it back into an interpolated string block, so later
//! stages can print the original `$"..."` expression.
//!
//! # Example
//!
//! Before:
//! ```text
//! stloc h(newobj DefaultInterpolatedStringHandler..ctor(ldc.i4 2, ldc.i4 1))
//! call AppendLiteral(ldloca h, ldstr "x=")
//! call AppendFormatted(ldloca h, ldloc n)
//! call Log(call ToStringAndClear(ldloca h))
//! ```
//!
//! After:
//! ```text
//! call Log(Block (InterpolatedString) {
//!   stloc h(newobj DefaultInterpolatedStringHandler..ctor(ldc.i4 2, ldc.i4 1))
//!   call AppendLiteral(ldloca h, ldstr "x=")
//!   call AppendFormatted(ldloca h, ldloc n)
//!   final: call ToStringAndClear(ldloca h)
//! })
//! ```
//!
//! # Algorithm
//!
//! 1. Match the window: the handler construction and the contiguous append
//!    calls on the same local ([`window`])
//! 2. Resolve the consumer in the statement after the window ([`usage`])
//! 3. Check the usage counters of the handler local
//! 4. For handlers passed to a method, find the `string` overload ([`overload`])
//! 5. Rewrite ([`rewrite`])
//!
//! Steps 1 to 4 never mutate; a miss in any of them leaves the function as it
//! was.
//!
//! # Handler shapes
//!
//! The runtime's `DefaultInterpolatedStringHandler` is only ever consumed by
//! `ToStringAndClear`; any other consumer means an earlier transform broke
//! the pattern, and the transform fails with
//! [`Error::UnresolvedHandlerConsumer`].
//!
//! The IL2CPP writer handlers are also passed by reference to methods that
//! have a `string` overload. Those calls are retargeted to the overload. An
//! unrecognized consumer of a custom handler is skipped silently.

mod overload;
mod rewrite;
mod usage;
mod window;

pub use usage::Consumer;
pub use window::InterpolationWindow;

use crate::{
    il::{CallOpCode, ILFunction, InstrId},
    transforms::{StatementTransform, StatementTransformContext},
    Error, Result,
};

use self::rewrite::Rewrite;

/// Folds interpolated string handler windows into interpolated string blocks.
///
/// Runs on every statement position; positions that do not hold a handler
/// construction are skipped at the first check. Disabled entirely by
/// [`DecompilerSettings::string_interpolation`](crate::transforms::DecompilerSettings::string_interpolation).
#[derive(Debug, Default, Clone, Copy)]
pub struct InterpolatedStringTransform;

impl InterpolatedStringTransform {
    /// Creates a new interpolated string transform.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validates the window against its consumer and decides on the rewrite.
    ///
    /// Returns `Ok(None)` for a silent miss.
    fn plan(
        function: &ILFunction,
        statements: &[InstrId],
        window: &InterpolationWindow,
        ctx: &StatementTransformContext<'_>,
    ) -> Result<Option<Rewrite>> {
        let types = ctx.types;
        let variable = function.variable(window.variable);
        let custom = types.is_custom_interpolation_builder(&variable.ty);

        let consumer = usage::find_consumer(function, types, statements, window);
        let consumer = match (consumer, custom) {
            (Some(Consumer::Finalize { call }), _) => Consumer::Finalize { call },
            (Some(argument @ Consumer::Argument { .. }), true) => argument,
            (None, true) => return Ok(None),
            (Some(Consumer::Argument { .. }) | None, false) => {
                return Err(Error::UnresolvedHandlerConsumer {
                    variable: variable.name.clone(),
                })
            }
        };

        if !usage::usage_matches(function, window) {
            return Ok(None);
        }

        match consumer {
            Consumer::Finalize { call } => Ok(Some(Rewrite::Finalize { call })),
            Consumer::Argument { call, parameter } => {
                let instr = function.instruction(call)?;
                let Some(target) = instr.as_call() else {
                    return Err(malformed_error!("consumer {} is not a call", call));
                };

                let overload = overload::find_string_overload(types, target.method, parameter)
                    .ok_or(Error::OverloadNotFound {
                        method: target.method,
                    })?;

                let opcode = match target.opcode {
                    CallOpCode::Call | CallOpCode::CallVirt => target.opcode,
                    CallOpCode::NewObj => {
                        return Err(Error::UnsupportedCallKind(
                            target.opcode.mnemonic().to_string(),
                        ))
                    }
                };

                let slot = parameter + usize::from(!types.method(overload).is_static());
                if slot >= target.arguments.len() {
                    return Ok(None);
                }

                Ok(Some(Rewrite::Retarget {
                    call,
                    opcode,
                    overload,
                    slot,
                }))
            }
        }
    }
}

impl StatementTransform for InterpolatedStringTransform {
    fn name(&self) -> &'static str {
        "interpolated-string"
    }

    fn description(&self) -> &'static str {
        "Folds interpolated string handler calls into interpolated string blocks"
    }

    fn run(
        &self,
        function: &mut ILFunction,
        block: InstrId,
        pos: usize,
        ctx: &StatementTransformContext<'_>,
    ) -> Result<()> {
        if !ctx.settings.string_interpolation {
            return Ok(());
        }
        let Some(statements) = function.block_instructions(block) else {
            return Ok(());
        };
        let statements = statements.to_vec();

        let Some(window) = window::match_window(function, ctx.types, &statements, pos) else {
            return Ok(());
        };
        let Some(plan) = Self::plan(function, &statements, &window, ctx)? else {
            return Ok(());
        };

        let name = &function.variable(window.variable).name;
        ctx.step(
            format!("Transform DefaultInterpolatedStringHandler {name}"),
            window.store,
        );
        rewrite::apply(function, block, &window, plan, ctx)?;
        Ok(())
    }
}
