//! Classification of interpolated string handler types.

use crate::typesystem::{KnownTypeCode, TypeId, TypeSig, TypeSystem};

impl TypeSystem {
    /// Returns true if `ty`, after stripping managed references, is any
    /// interpolated string handler: the runtime's
    /// `DefaultInterpolatedStringHandler` or one of the IL2CPP writer handlers.
    #[must_use]
    pub fn is_interpolation_builder(&self, ty: &TypeSig) -> bool {
        self.unwrap_by_ref(ty)
            .definition()
            .is_some_and(|id| self.is_interpolation_builder_def(id))
    }

    /// Returns true if the type definition `id` is an interpolated string handler.
    #[must_use]
    pub fn is_interpolation_builder_def(&self, id: TypeId) -> bool {
        self.type_def(id)
            .known
            .is_some_and(KnownTypeCode::is_interpolation_handler)
    }

    /// Returns true if `ty` is an interpolated string handler other than the
    /// runtime's `DefaultInterpolatedStringHandler`.
    #[must_use]
    pub fn is_custom_interpolation_builder(&self, ty: &TypeSig) -> bool {
        self.is_interpolation_builder(ty)
            && !self.is_known_type(
                self.unwrap_by_ref(ty),
                KnownTypeCode::DefaultInterpolatedStringHandler,
            )
    }
}
