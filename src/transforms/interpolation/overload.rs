//! Lookup of the `string` overload replacing a handler-taking method.

use crate::typesystem::{KnownTypeCode, MemberOptions, MethodDef, MethodId, TypeSystem};

/// Finds the sibling of `method` that takes a plain `string` where `method`
/// takes the handler at `parameter`.
///
/// A candidate has the same name (ordinal), the same staticness and the same
/// parameter count as `method`, and its parameter at `parameter` is exactly
/// `string`. Methods declared on the declaring type of `method` win; only if
/// none exists is the base type chain searched as well.
pub(crate) fn find_string_overload(
    types: &TypeSystem,
    method: MethodId,
    parameter: usize,
) -> Option<MethodId> {
    let original = types.method(method);
    let is_candidate = |candidate: &MethodDef| {
        candidate.is_static() == original.is_static()
            && candidate.parameters.len() == original.parameters.len()
            && candidate.name == original.name
            && candidate
                .parameters
                .get(parameter)
                .is_some_and(|p| types.is_known_type(&p.ty, KnownTypeCode::String))
    };

    [MemberOptions::IGNORE_INHERITED_MEMBERS, MemberOptions::empty()]
        .into_iter()
        .find_map(|options| {
            types
                .get_methods(original.declaring_type, &is_candidate, options)
                .first()
                .copied()
        })
}
