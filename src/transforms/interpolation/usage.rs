//! Resolution of the instruction consuming a handler window.

use crate::{
    il::{CallOpCode, ILFunction, InstrId},
    transforms::{find_load_in_next, interpolation::InterpolationWindow, FindResult},
    typesystem::TypeSystem,
};

/// How the handler built by a window is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumer {
    /// `call ToStringAndClear(ldloca v)` turns the handler into a string.
    Finalize {
        /// The `ToStringAndClear` call.
        call: InstrId,
    },
    /// The handler is passed by reference to a method parameter.
    Argument {
        /// The call receiving the handler.
        call: InstrId,
        /// Index of the handler parameter, excluding `this`.
        parameter: usize,
    },
}

impl Consumer {
    /// The consuming call instruction.
    #[must_use]
    pub fn call(&self) -> InstrId {
        match self {
            Consumer::Finalize { call } | Consumer::Argument { call, .. } => *call,
        }
    }
}

/// Finds the call consuming the handler of `window`.
///
/// The consumer must live in the statement directly after the window, and
/// the first use of the handler in that statement must be reachable from
/// every window statement: each of them is treated as the expression being
/// moved and must resolve to a load with the same parent call. Any
/// [`FindResult::Conflict`] or disagreement is a miss.
pub(crate) fn find_consumer(
    function: &ILFunction,
    types: &TypeSystem,
    statements: &[InstrId],
    window: &InterpolationWindow,
) -> Option<Consumer> {
    let next = *statements.get(window.end)?;

    let mut consumer = None;
    for &moved in &statements[window.range()] {
        let load = match find_load_in_next(function, next, window.variable, moved) {
            FindResult::Found(load) => load,
            FindResult::NotFound | FindResult::Conflict => return None,
        };
        let parent = function.parent(load)?;
        match consumer {
            None => consumer = Some((parent, load)),
            Some((existing, _)) if existing == parent => {}
            Some(_) => return None,
        }
    }
    let (call_id, load) = consumer?;
    let call = function.get(call_id)?.as_call()?;
    let method = types.method(call.method);

    if call.arguments.len() == 1 && method.name == "ToStringAndClear" && !method.is_static() {
        return Some(Consumer::Finalize { call: call_id });
    }

    // Parameter of the slot holding this handler's address; `newobj` passes
    // no receiver.
    let receiver = !method.is_static() && call.opcode != CallOpCode::NewObj;
    let slot = call.arguments.iter().position(|&argument| argument == load)?;
    let parameter = slot.checked_sub(usize::from(receiver))?;
    method
        .parameters
        .get(parameter)
        .filter(|p| types.is_interpolation_builder(&p.ty))
        .map(|_| Consumer::Argument {
            call: call_id,
            parameter,
        })
}

/// Returns true if the handler local is used exactly as the window and its
/// consumer require: one store, no plain loads, and one address per window
/// statement.
///
/// Counters must be current; the pipeline recounts after every change.
pub(crate) fn usage_matches(function: &ILFunction, window: &InterpolationWindow) -> bool {
    let variable = function.variable(window.variable);
    variable.store_count() == 1
        && variable.load_count() == 0
        && variable.address_count() == window.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        il::VariableKind,
        test::{handler_local, push_all, types_with_logger, HandlerMethods},
        transforms::interpolation::window::match_window,
        typesystem::{KnownTypeCode, Parameter, TypeFlavor, TypeSig, TypeSystemBuilder},
    };

    fn resolve(function: &ILFunction, types: &TypeSystem) -> (InterpolationWindow, Option<Consumer>) {
        let statements = function
            .block_instructions(function.body())
            .unwrap()
            .to_vec();
        let window = match_window(function, types, &statements, 0).unwrap();
        let consumer = find_consumer(function, types, &statements, &window);
        (window, consumer)
    }

    #[test]
    fn test_finalize_consumer() {
        let types = TypeSystemBuilder::with_corlib().build();
        let handler = HandlerMethods::resolve(&types, KnownTypeCode::DefaultInterpolatedStringHandler);
        let mut function = ILFunction::new("Finalize");
        let h = handler_local(&mut function, &handler);
        let s = function.add_variable("s", TypeSig::String, VariableKind::Local);

        let create = handler.create(&mut function, h, 1, 0);
        let literal = handler.append_literal(&mut function, h, "a");
        let finish = handler.to_string_and_clear(&mut function, h);
        let store = function.stloc(s, finish);
        push_all(&mut function, &[create, literal, store]);

        let (window, consumer) = resolve(&function, &types);
        assert_eq!(consumer, Some(Consumer::Finalize { call: finish }));
        assert_eq!(consumer.unwrap().call(), finish);
        // One address per append call plus the consumer's.
        assert_eq!(function.variable(h).address_count(), window.len());
        assert!(usage_matches(&function, &window));
    }

    #[test]
    fn test_argument_consumer() {
        let (types, logger) = types_with_logger(KnownTypeCode::IL2CPPInterpolatedStringHandler);
        let handler = HandlerMethods::resolve(&types, KnownTypeCode::IL2CPPInterpolatedStringHandler);
        let mut function = ILFunction::new("Argument");
        let h = handler_local(&mut function, &handler);

        let create = handler.create(&mut function, h, 1, 0);
        let literal = handler.append_literal(&mut function, h, "a");
        let addr = function.ldloca(h);
        let log = function.call(logger.log_handler, vec![addr]);
        push_all(&mut function, &[create, literal, log]);

        let (window, consumer) = resolve(&function, &types);
        assert_eq!(
            consumer,
            Some(Consumer::Argument {
                call: log,
                parameter: 0
            })
        );
        assert!(usage_matches(&function, &window));
    }

    #[test]
    fn test_argument_parameter_is_the_handler_slot() {
        let mut builder = TypeSystemBuilder::with_corlib();
        let code = KnownTypeCode::IL2CPPInterpolatedStringHandler;
        let handler_sig = TypeSig::ValueType(builder.known_type(code).unwrap()).by_ref();
        let ty = builder.add_type("Demo", "Pair", TypeFlavor::Class, None);
        let write = builder.add_static_method(
            ty,
            "Write",
            vec![
                Parameter::new("a", handler_sig.clone()),
                Parameter::new("b", handler_sig.clone()),
            ],
            TypeSig::Void,
        );
        let describe = builder.add_static_method(
            ty,
            "Describe",
            vec![
                Parameter::new("label", handler_sig),
                Parameter::new("value", TypeSig::Object),
            ],
            TypeSig::Void,
        );
        let types = builder.build();
        let handler = HandlerMethods::resolve(&types, code);

        let mut function = ILFunction::new("Slots");
        let a = function.add_variable("a", handler.sig(), VariableKind::Local);
        let h = handler_local(&mut function, &handler);
        let create = handler.create(&mut function, h, 0, 0);
        let first = function.ldloca(a);
        let second = function.ldloca(h);
        let call = function.call(write, vec![first, second]);
        push_all(&mut function, &[create, call]);

        let (_, consumer) = resolve(&function, &types);
        assert_eq!(
            consumer,
            Some(Consumer::Argument {
                call,
                parameter: 1
            })
        );

        // A handler passed where no handler is expected has no consumer.
        let mut function = ILFunction::new("Object");
        let a = function.add_variable("a", handler.sig(), VariableKind::Local);
        let h = handler_local(&mut function, &handler);
        let create = handler.create(&mut function, h, 0, 0);
        let label = function.ldloca(a);
        let value = function.ldloca(h);
        let call = function.call(describe, vec![label, value]);
        push_all(&mut function, &[create, call]);

        let (_, consumer) = resolve(&function, &types);
        assert_eq!(consumer, None);
    }

    #[test]
    fn test_no_consumer_after_window() {
        let types = TypeSystemBuilder::with_corlib().build();
        let handler = HandlerMethods::resolve(&types, KnownTypeCode::DefaultInterpolatedStringHandler);
        let mut function = ILFunction::new("Missing");
        let h = handler_local(&mut function, &handler);

        let create = handler.create(&mut function, h, 0, 0);
        let unrelated = function.ret(None);
        push_all(&mut function, &[create, unrelated]);

        let (_, consumer) = resolve(&function, &types);
        assert_eq!(consumer, None);
    }

    #[test]
    fn test_non_call_parent_is_not_a_consumer() {
        let types = TypeSystemBuilder::with_corlib().build();
        let handler = HandlerMethods::resolve(&types, KnownTypeCode::DefaultInterpolatedStringHandler);
        let mut function = ILFunction::new("Copy");
        let h = handler_local(&mut function, &handler);
        let copy = function.add_variable("copy", handler.sig(), VariableKind::Local);

        let create = handler.create(&mut function, h, 0, 0);
        let load = function.ldloc(h);
        let store = function.stloc(copy, load);
        push_all(&mut function, &[create, store]);

        let (_, consumer) = resolve(&function, &types);
        assert_eq!(consumer, None);
    }

    #[test]
    fn test_side_effect_before_use_blocks_consumer() {
        let (types, logger) = types_with_logger(KnownTypeCode::IL2CPPInterpolatedStringHandler);
        let handler = HandlerMethods::resolve(&types, KnownTypeCode::IL2CPPInterpolatedStringHandler);
        let mut function = ILFunction::new("Conflict");
        let h = handler_local(&mut function, &handler);

        let create = handler.create(&mut function, h, 1, 0);
        let literal = handler.append_literal(&mut function, h, "a");
        let text = function.ldstr("first");
        let side_effect = function.call(logger.log_string, vec![text]);
        let addr = function.ldloca(h);
        let log = function.call(logger.log_handler, vec![side_effect, addr]);
        push_all(&mut function, &[create, literal, log]);

        let (window, consumer) = resolve(&function, &types);
        assert_eq!(window.end, 2);
        assert_eq!(consumer, None);
    }

    #[test]
    fn test_usage_gate_rejects_extra_load() {
        let (types, logger) = types_with_logger(KnownTypeCode::IL2CPPInterpolatedStringHandler);
        let handler = HandlerMethods::resolve(&types, KnownTypeCode::IL2CPPInterpolatedStringHandler);
        let mut function = ILFunction::new("Gate");
        let h = handler_local(&mut function, &handler);
        let copy = function.add_variable("copy", handler.sig(), VariableKind::Local);

        let create = handler.create(&mut function, h, 1, 0);
        let literal = handler.append_literal(&mut function, h, "a");
        let addr = function.ldloca(h);
        let log = function.call(logger.log_handler, vec![addr]);
        let load = function.ldloc(h);
        let leak = function.stloc(copy, load);
        push_all(&mut function, &[create, literal, log, leak]);

        let (window, consumer) = resolve(&function, &types);
        assert!(consumer.is_some());
        assert_eq!(function.variable(h).load_count(), 1);
        assert!(!usage_matches(&function, &window));
    }
}
