//! IL builders for the lowered interpolated string patterns.

use crate::{
    il::{ILFunction, InstrId, VariableId, VariableKind},
    typesystem::{
        KnownTypeCode, MemberOptions, MethodId, Parameter, TypeFlavor, TypeId, TypeSig,
        TypeSystem, TypeSystemBuilder,
    },
};

/// Members of one interpolation handler type.
pub(crate) struct HandlerMethods {
    pub ty: TypeId,
    pub ctor: MethodId,
    pub append_literal: MethodId,
    pub append_formatted: MethodId,
    pub append_formatted_alignment: MethodId,
    pub append_formatted_format: MethodId,
    pub append_formatted_alignment_format: MethodId,
    pub to_string_and_clear: MethodId,
}

impl HandlerMethods {
    pub fn resolve(types: &TypeSystem, code: KnownTypeCode) -> Self {
        let ty = types.known_type(code).unwrap();
        let append_formatted_format = types
            .get_methods(
                ty,
                |m| {
                    m.name == "AppendFormatted"
                        && m.parameters.len() == 2
                        && m.parameters[1].ty == TypeSig::String
                },
                MemberOptions::IGNORE_INHERITED_MEMBERS,
            )
            .first()
            .copied()
            .unwrap();
        Self {
            ty,
            ctor: types.find_method(ty, ".ctor", 2).unwrap(),
            append_literal: types.find_method(ty, "AppendLiteral", 1).unwrap(),
            append_formatted: types.find_method(ty, "AppendFormatted", 1).unwrap(),
            append_formatted_alignment: types.find_method(ty, "AppendFormatted", 2).unwrap(),
            append_formatted_format,
            append_formatted_alignment_format: types.find_method(ty, "AppendFormatted", 3).unwrap(),
            to_string_and_clear: types.find_method(ty, "ToStringAndClear", 0).unwrap(),
        }
    }

    pub fn sig(&self) -> TypeSig {
        TypeSig::ValueType(self.ty)
    }

    /// `stloc v(newobj .ctor(ldc.i4 literal_length, ldc.i4 formatted_count))`
    pub fn create(
        &self,
        function: &mut ILFunction,
        v: VariableId,
        literal_length: i32,
        formatted_count: i32,
    ) -> InstrId {
        let a = function.ldc_i4(literal_length);
        let b = function.ldc_i4(formatted_count);
        let ctor = function.newobj(self.ctor, vec![a, b]);
        function.stloc(v, ctor)
    }

    /// `call AppendLiteral(ldloca v, ldstr text)`
    pub fn append_literal(&self, function: &mut ILFunction, v: VariableId, text: &str) -> InstrId {
        let addr = function.ldloca(v);
        let text = function.ldstr(text);
        function.call(self.append_literal, vec![addr, text])
    }

    /// `call AppendFormatted(ldloca v, value)`
    pub fn append_formatted(
        &self,
        function: &mut ILFunction,
        v: VariableId,
        value: InstrId,
    ) -> InstrId {
        let addr = function.ldloca(v);
        function.call(self.append_formatted, vec![addr, value])
    }

    /// `call ToStringAndClear(ldloca v)`
    pub fn to_string_and_clear(&self, function: &mut ILFunction, v: VariableId) -> InstrId {
        let addr = function.ldloca(v);
        function.call(self.to_string_and_clear, vec![addr])
    }
}

/// A logger type with a string overload and a handler overload of `Log`.
pub(crate) struct Logger {
    pub log_string: MethodId,
    pub log_handler: MethodId,
}

/// Builds a type system with the corlib handlers and a static `Logger.Log`
/// pair for the given handler type.
pub(crate) fn types_with_logger(code: KnownTypeCode) -> (TypeSystem, Logger) {
    let mut builder = TypeSystemBuilder::with_corlib();
    let handler = builder.known_type(code).unwrap();
    let ty = builder.add_type("Demo", "Logger", TypeFlavor::Class, None);
    let log_handler = builder.add_static_method(
        ty,
        "Log",
        vec![Parameter::new(
            "handler",
            TypeSig::ValueType(handler).by_ref(),
        )],
        TypeSig::Void,
    );
    let log_string = builder.add_static_method(
        ty,
        "Log",
        vec![Parameter::new("message", TypeSig::String)],
        TypeSig::Void,
    );
    (
        builder.build(),
        Logger {
            log_string,
            log_handler,
        },
    )
}

/// Declares a handler local of the given handler type.
pub(crate) fn handler_local(function: &mut ILFunction, handler: &HandlerMethods) -> VariableId {
    function.add_variable("handler", handler.sig(), VariableKind::Local)
}

/// Appends `statements` to the body and recounts variable usage.
pub(crate) fn push_all(function: &mut ILFunction, statements: &[InstrId]) {
    let body = function.body();
    for &statement in statements {
        function.push(body, statement).unwrap();
    }
    function.recount_variables();
}
