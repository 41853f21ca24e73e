//! Recognition of the handler construction and its append calls.

use std::ops::Range;

use crate::{
    il::{CallOpCode, ILFunction, InstrId, Instruction, VariableId, VariableKind},
    typesystem::TypeSystem,
};

/// A matched handler window: the construction of the handler at `start`
/// followed by the append calls up to (excluding) `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpolationWindow {
    /// The handler local.
    pub variable: VariableId,
    /// The `stloc` constructing the handler, at `start`.
    pub store: InstrId,
    /// Index of the construction in the block.
    pub start: usize,
    /// Index of the first statement after the last append call.
    pub end: usize,
}

impl InterpolationWindow {
    /// Number of statements in the window, construction included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Always false; a window holds at least the construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Number of append calls.
    #[must_use]
    pub fn append_count(&self) -> usize {
        self.len() - 1
    }

    /// Statement indices covered by the window.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Matches a handler window starting at `statements[pos]`.
///
/// The statement at `pos` must be
///
/// ```text
/// stloc v(newobj Handler..ctor(ldc.i4 literalLength, ldc.i4 formattedCount, ...))
/// ```
///
/// with `v` an ordinary local of a handler type. The window then extends over
/// every following statement accepted by [`is_known_call`] for `v`.
pub(crate) fn match_window(
    function: &ILFunction,
    types: &TypeSystem,
    statements: &[InstrId],
    pos: usize,
) -> Option<InterpolationWindow> {
    let store = *statements.get(pos)?;
    let Some(Instruction::StLoc { variable, value }) = function.get(store) else {
        return None;
    };
    let variable = *variable;

    let local = function.variable(variable);
    if local.kind != VariableKind::Local || !types.is_interpolation_builder(&local.ty) {
        return None;
    }

    let construction = function.get(*value)?.as_call()?;
    if construction.opcode != CallOpCode::NewObj || construction.arguments.len() < 2 {
        return None;
    }
    let declaring = types.method(construction.method).declaring_type;
    if !types.is_interpolation_builder_def(declaring) {
        return None;
    }
    let is_literal = |arg: InstrId| {
        function
            .get(arg)
            .and_then(Instruction::match_ldc_i4)
            .is_some()
    };
    if !is_literal(construction.arguments[0]) || !is_literal(construction.arguments[1]) {
        return None;
    }

    let mut end = pos + 1;
    while is_known_call(function, types, statements, end, variable) {
        end += 1;
    }

    Some(InterpolationWindow {
        variable,
        store,
        start: pos,
        end,
    })
}

/// Returns true if `statements[pos]` is an append call on the handler `v`.
///
/// Accepted shapes, all as non-static `call` on a handler type with
/// `ldloca v` as receiver:
///
/// ```text
/// AppendLiteral(ldloca v, ldstr)
/// AppendFormatted(ldloca v, value)
/// AppendFormatted(ldloca v, value, ldc.i4 alignment)
/// AppendFormatted(ldloca v, value, ldstr format)
/// AppendFormatted(ldloca v, value, ldc.i4 alignment, ldstr format)
/// ```
///
/// The last statement of a block is never an append call; it is reserved for
/// the consumer.
pub(crate) fn is_known_call(
    function: &ILFunction,
    types: &TypeSystem,
    statements: &[InstrId],
    pos: usize,
    v: VariableId,
) -> bool {
    if pos + 1 >= statements.len() {
        return false;
    }
    let Some(call) = function.get(statements[pos]).and_then(Instruction::as_call) else {
        return false;
    };
    if call.opcode != CallOpCode::Call || call.arguments.len() < 2 {
        return false;
    }
    if !function
        .get(call.arguments[0])
        .is_some_and(|receiver| receiver.match_ldloca(v))
    {
        return false;
    }

    let method = types.method(call.method);
    if method.is_static() || !types.is_interpolation_builder_def(method.declaring_type) {
        return false;
    }

    let arg = |index: usize| function.get(call.arguments[index]);
    let is_ldstr = |index: usize| matches!(arg(index), Some(Instruction::LdStr(_)));
    let is_ldc_i4 = |index: usize| matches!(arg(index), Some(Instruction::LdcI4(_)));

    match (method.name.as_str(), call.arguments.len()) {
        ("AppendLiteral", 2) => is_ldstr(1),
        ("AppendFormatted", 2) => true,
        ("AppendFormatted", 3) => is_ldstr(2) || is_ldc_i4(2),
        ("AppendFormatted", 4) => is_ldc_i4(2) && is_ldstr(3),
        _ => false,
    }
}
