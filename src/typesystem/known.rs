//! Well-known types the transforms recognize by identity.

use std::fmt;

use strum::{EnumCount, EnumIter};

/// Types with special meaning to the decompiler.
///
/// A [`crate::typesystem::TypeDef`] may carry one of these codes; the code is
/// assigned when the type is registered (see
/// [`crate::typesystem::TypeSystemBuilder::with_corlib`]) and never inferred
/// from the type's name afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum KnownTypeCode {
    /// `System.Object`
    Object,
    /// `System.String`
    String,
    /// `System.Int32`
    Int32,
    /// `System.Boolean`
    Boolean,
    /// `System.Void`
    Void,
    /// The runtime-provided handler the C# compiler targets for `$"..."`.
    DefaultInterpolatedStringHandler,
    /// Alternate handler used by the IL2CPP code writers.
    IL2CPPInterpolatedStringHandler,
    /// Handler interface implemented by IL2CPP direct writers.
    IDirectWriterInterpolatedStringHandler,
    /// Unindented handler used by the IL2CPP code writers.
    IL2CPPCodeWriterUnindentedInterpolatedStringHandler,
}

impl KnownTypeCode {
    /// Namespace of the known type.
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Object | Self::String | Self::Int32 | Self::Boolean | Self::Void => "System",
            Self::DefaultInterpolatedStringHandler => "System.Runtime.CompilerServices",
            Self::IL2CPPInterpolatedStringHandler
            | Self::IDirectWriterInterpolatedStringHandler
            | Self::IL2CPPCodeWriterUnindentedInterpolatedStringHandler => {
                "Unity.IL2CPP.CodeWriters"
            }
        }
    }

    /// Simple (unqualified) name of the known type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Object => "Object",
            Self::String => "String",
            Self::Int32 => "Int32",
            Self::Boolean => "Boolean",
            Self::Void => "Void",
            Self::DefaultInterpolatedStringHandler => "DefaultInterpolatedStringHandler",
            Self::IL2CPPInterpolatedStringHandler => "IL2CPPInterpolatedStringHandler",
            Self::IDirectWriterInterpolatedStringHandler => {
                "IDirectWriterInterpolatedStringHandler"
            }
            Self::IL2CPPCodeWriterUnindentedInterpolatedStringHandler => {
                "IL2CPPCodeWriterUnindentedInterpolatedStringHandler"
            }
        }
    }

    /// Fully qualified name, e.g. `System.String`.
    #[must_use]
    pub fn full_name(self) -> String {
        format!("{}.{}", self.namespace(), self.name())
    }

    /// Returns true for every handler type the interpolated string transform accepts.
    #[must_use]
    pub const fn is_interpolation_handler(self) -> bool {
        matches!(
            self,
            Self::DefaultInterpolatedStringHandler
                | Self::IL2CPPInterpolatedStringHandler
                | Self::IDirectWriterInterpolatedStringHandler
                | Self::IL2CPPCodeWriterUnindentedInterpolatedStringHandler
        )
    }
}

impl fmt::Display for KnownTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_full_names_are_unique() {
        let mut names: Vec<String> = KnownTypeCode::iter().map(KnownTypeCode::full_name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), KnownTypeCode::COUNT);
    }

    #[test]
    fn test_handler_codes() {
        let handlers: Vec<_> = KnownTypeCode::iter()
            .filter(|code| code.is_interpolation_handler())
            .collect();
        assert_eq!(handlers.len(), 4);
        assert!(!KnownTypeCode::String.is_interpolation_handler());
        assert_eq!(
            KnownTypeCode::DefaultInterpolatedStringHandler.to_string(),
            "System.Runtime.CompilerServices.DefaultInterpolatedStringHandler"
        );
    }
}
