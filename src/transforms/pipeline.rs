//! Per-function driver for statement transforms.

use crate::{
    il::{ILFunction, InstrId},
    transforms::{
        EventKind, InterpolatedStringTransform, StatementTransform, StatementTransformContext,
    },
    Result,
};

/// Runs an ordered list of [`StatementTransform`]s over a function.
///
/// Every `ControlFlow` block is visited innermost first, and within a block
/// every position from the last statement to the first. When a transform
/// reports a change, variable counters are recomputed and all transforms run
/// again at the same position, up to
/// [`DecompilerSettings::max_iterations_per_position`](crate::transforms::DecompilerSettings::max_iterations_per_position)
/// times.
pub struct StatementTransformPipeline {
    transforms: Vec<Box<dyn StatementTransform>>,
}

impl Default for StatementTransformPipeline {
    fn default() -> Self {
        Self::new(vec![Box::new(InterpolatedStringTransform::new())])
    }
}

impl StatementTransformPipeline {
    /// Creates a pipeline running `transforms` in order at every position.
    #[must_use]
    pub fn new(transforms: Vec<Box<dyn StatementTransform>>) -> Self {
        Self { transforms }
    }

    /// The transforms, in run order.
    #[must_use]
    pub fn transforms(&self) -> &[Box<dyn StatementTransform>] {
        &self.transforms
    }

    /// Runs all transforms over `function`.
    ///
    /// # Returns
    ///
    /// `true` if any transform changed the function.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a transform; the function keeps the
    /// changes committed before it.
    pub fn run(
        &self,
        function: &mut ILFunction,
        ctx: &StatementTransformContext<'_>,
    ) -> Result<bool> {
        ctx.events
            .record(EventKind::PassStarted)
            .method(ctx.method)
            .message(format!("statement transforms on {}", function.name()));

        function.recount_variables();
        let mut changed = false;

        for block in function.control_flow_blocks() {
            let mut pos = function.block_instructions(block).map_or(0, <[_]>::len);
            while pos > 0 {
                pos -= 1;
                changed |= self.run_at(function, block, pos, ctx)?;
            }
        }

        ctx.events
            .record(EventKind::PassCompleted)
            .method(ctx.method)
            .message(format!(
                "statement transforms on {} ({})",
                function.name(),
                if changed { "changed" } else { "unchanged" }
            ));
        Ok(changed)
    }

    fn run_at(
        &self,
        function: &mut ILFunction,
        block: InstrId,
        pos: usize,
        ctx: &StatementTransformContext<'_>,
    ) -> Result<bool> {
        let limit = ctx.settings.max_iterations_per_position;
        let mut changed = false;

        for _ in 0..limit {
            let mut rerun = false;
            for transform in &self.transforms {
                if pos >= function.block_instructions(block).map_or(0, <[_]>::len) {
                    return Ok(changed);
                }
                ctx.enter_pass(transform.name());
                transform.run(function, block, pos, ctx)?;
                if ctx.take_changed() {
                    function.recount_variables();
                    changed = true;
                    rerun = true;
                    break;
                }
            }
            if !rerun {
                return Ok(changed);
            }
        }

        ctx.events.warn(format!(
            "{}: statement {} of block {} still changing after {} iterations",
            function.name(),
            pos,
            block,
            limit
        ));
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        il::{BlockKind, Instruction, VariableKind},
        test::{handler_local, push_all, HandlerMethods},
        token::Token,
        transforms::{DecompilerSettings, EventLog},
        typesystem::{KnownTypeCode, TypeSig, TypeSystemBuilder},
    };

    /// Replaces the statement at the position with `nop` a fixed number of times.
    struct NopCounter {
        remaining: std::sync::atomic::AtomicUsize,
    }

    impl StatementTransform for NopCounter {
        fn name(&self) -> &'static str {
            "nop-counter"
        }

        fn run(
            &self,
            function: &mut ILFunction,
            block: InstrId,
            pos: usize,
            ctx: &StatementTransformContext<'_>,
        ) -> Result<()> {
            use std::sync::atomic::Ordering;
            if self.remaining.load(Ordering::Relaxed) == 0 {
                return Ok(());
            }
            self.remaining.fetch_sub(1, Ordering::Relaxed);
            let old = function.block_instructions(block).unwrap()[pos];
            ctx.step("replace with nop", old);
            let nop = function.nop();
            function.replace(old, nop)?;
            Ok(())
        }
    }

    #[test]
    fn test_default_pipeline() {
        let pipeline = StatementTransformPipeline::default();
        assert_eq!(pipeline.transforms().len(), 1);
        assert_eq!(pipeline.transforms()[0].name(), "interpolated-string");
    }

    #[test]
    fn test_rerun_is_bounded() {
        let types = TypeSystemBuilder::with_corlib().build();
        let settings = DecompilerSettings::default().with_max_iterations_per_position(3);
        let events = EventLog::new();
        let ctx = StatementTransformContext::new(&settings, &types, &events, Token::method_def(1));

        let mut function = ILFunction::new("Loop");
        let stmt = function.ldc_i4(0);
        push_all(&mut function, &[stmt]);

        let pipeline = StatementTransformPipeline::new(vec![Box::new(NopCounter {
            remaining: std::sync::atomic::AtomicUsize::new(10),
        })]);
        assert!(pipeline.run(&mut function, &ctx).unwrap());
        assert_eq!(events.count_kind(EventKind::TransformStep), 3);
        assert_eq!(events.count_kind(EventKind::Warning), 1);
        assert!(events.has(EventKind::PassStarted));
        assert!(events.has(EventKind::PassCompleted));
    }

    #[test]
    fn test_transforms_nested_blocks() {
        let types = TypeSystemBuilder::with_corlib().build();
        let handler = HandlerMethods::resolve(&types, KnownTypeCode::DefaultInterpolatedStringHandler);
        let settings = DecompilerSettings::default();
        let events = EventLog::new();
        let ctx = StatementTransformContext::new(&settings, &types, &events, Token::method_def(1));

        let mut function = ILFunction::new("Nested");
        let h = handler_local(&mut function, &handler);
        let s = function.add_variable("s", TypeSig::String, VariableKind::Local);
        let create = handler.create(&mut function, h, 1, 0);
        let literal = handler.append_literal(&mut function, h, "a");
        let finish = handler.to_string_and_clear(&mut function, h);
        let store = function.stloc(s, finish);
        let inner = function.block(BlockKind::ControlFlow, vec![create, literal, store], None);
        let ret = function.ret(None);
        push_all(&mut function, &[inner, ret]);

        let pipeline = StatementTransformPipeline::default();
        assert!(pipeline.run(&mut function, &ctx).unwrap());
        assert_eq!(function.block_instructions(inner).unwrap(), &[store]);
        assert_eq!(events.count_kind(EventKind::InterpolatedStringTransformed), 1);

        let Some(Instruction::StLoc { value, .. }) = function.get(store) else {
            panic!("store expected");
        };
        assert!(function.get(*value).and_then(Instruction::as_block).is_some());
        // The handler's counters reflect the rewritten tree.
        assert_eq!(function.variable(h).store_count(), 1);
        assert_eq!(function.variable(h).address_count(), 2);
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let types = TypeSystemBuilder::with_corlib().build();
        let handler = HandlerMethods::resolve(&types, KnownTypeCode::DefaultInterpolatedStringHandler);
        let settings = DecompilerSettings::default();
        let events = EventLog::new();
        let ctx = StatementTransformContext::new(&settings, &types, &events, Token::method_def(1));

        let mut function = ILFunction::new("Twice");
        let h = handler_local(&mut function, &handler);
        let s = function.add_variable("s", TypeSig::String, VariableKind::Local);
        let create = handler.create(&mut function, h, 1, 0);
        let literal = handler.append_literal(&mut function, h, "a");
        let finish = handler.to_string_and_clear(&mut function, h);
        let store = function.stloc(s, finish);
        push_all(&mut function, &[create, literal, store]);

        let pipeline = StatementTransformPipeline::default();
        assert!(pipeline.run(&mut function, &ctx).unwrap());
        let once = function.clone();
        assert!(!pipeline.run(&mut function, &ctx).unwrap());
        assert_eq!(function, once);
    }
}
