//! Preloaded definitions for the runtime types the transforms depend on.

use crate::typesystem::{
    KnownTypeCode, MethodModifiers, Parameter, TypeFlavor, TypeId, TypeSig, TypeSystemBuilder,
};

impl TypeSystemBuilder {
    /// Creates a builder preloaded with the primitive known types and every
    /// interpolation handler type, including the handler members the C#
    /// compiler calls when lowering `$"..."`.
    #[must_use]
    pub fn with_corlib() -> Self {
        let mut builder = Self::new();

        let object = builder.add_known_type(KnownTypeCode::Object, TypeFlavor::Class, None);
        builder.add_known_type(KnownTypeCode::String, TypeFlavor::Class, Some(object));
        builder.add_known_type(KnownTypeCode::Int32, TypeFlavor::ValueType, Some(object));
        builder.add_known_type(KnownTypeCode::Boolean, TypeFlavor::ValueType, Some(object));
        builder.add_known_type(KnownTypeCode::Void, TypeFlavor::ValueType, Some(object));

        for code in [
            KnownTypeCode::DefaultInterpolatedStringHandler,
            KnownTypeCode::IL2CPPInterpolatedStringHandler,
            KnownTypeCode::IL2CPPCodeWriterUnindentedInterpolatedStringHandler,
        ] {
            let handler = builder.add_known_type(code, TypeFlavor::ValueType, Some(object));
            builder.add_constructor(
                handler,
                vec![
                    Parameter::new("literalLength", TypeSig::Int32),
                    Parameter::new("formattedCount", TypeSig::Int32),
                ],
            );
            builder.add_handler_members(handler, MethodModifiers::empty());
        }

        let writer = builder.add_known_type(
            KnownTypeCode::IDirectWriterInterpolatedStringHandler,
            TypeFlavor::Interface,
            None,
        );
        builder.add_handler_members(writer, MethodModifiers::VIRTUAL | MethodModifiers::ABSTRACT);

        builder
    }

    fn add_handler_members(&mut self, handler: TypeId, modifiers: MethodModifiers) {
        let value = || Parameter::new("value", TypeSig::Object);
        let alignment = || Parameter::new("alignment", TypeSig::Int32);
        let format = || Parameter::new("format", TypeSig::String);

        self.add_method(
            handler,
            "AppendLiteral",
            modifiers,
            vec![Parameter::new("value", TypeSig::String)],
            TypeSig::Void,
        );
        for parameters in [
            vec![value()],
            vec![value(), alignment()],
            vec![value(), format()],
            vec![value(), alignment(), format()],
        ] {
            self.add_method(handler, "AppendFormatted", modifiers, parameters, TypeSig::Void);
        }
        self.add_method(
            handler,
            "ToStringAndClear",
            modifiers,
            Vec::new(),
            TypeSig::String,
        );
    }
}
