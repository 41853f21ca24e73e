//! Parallel execution of the statement transform pipeline.
//!
//! The `TransformScheduler` runs one [`StatementTransformPipeline`] over every
//! function of a [`TransformContext`]. Functions are independent, so they are
//! processed in parallel; each worker takes its function out of the shared
//! map, transforms it without holding any lock, and puts it back.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::{
    token::Token,
    transforms::{
        EventKind, StatementTransformContext, StatementTransformPipeline, TransformContext,
    },
    Error, Result,
};

/// Runs a statement transform pipeline over all functions of a context.
#[derive(Default)]
pub struct TransformScheduler {
    pipeline: StatementTransformPipeline,
}

impl TransformScheduler {
    /// Creates a scheduler for `pipeline`.
    #[must_use]
    pub fn new(pipeline: StatementTransformPipeline) -> Self {
        Self { pipeline }
    }

    /// The pipeline run on every function.
    #[must_use]
    pub fn pipeline(&self) -> &StatementTransformPipeline {
        &self.pipeline
    }

    /// Transforms every function in `ctx`.
    ///
    /// Functions that changed are added to `ctx.changed_functions`, including
    /// a failing function that committed steps before its error. All
    /// functions are processed even if one fails; failures are recorded as
    /// error events.
    ///
    /// # Returns
    ///
    /// `true` if any function changed.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing function with the lowest method
    /// token.
    pub fn run(&self, ctx: &TransformContext) -> Result<bool> {
        let any_changed = AtomicBool::new(false);
        let methods = ctx.methods();

        let mut failures: Vec<_> = methods
            .par_iter()
            .filter_map(|&method| {
                // Remove the function (brief lock, then released)
                let mut function = ctx.take_function(method)?;

                let local = StatementTransformContext::for_function(ctx, method);
                let result = self.pipeline.run(&mut function, &local);
                let name = function.name().to_string();

                ctx.add_function(method, function);
                if local.steps() > 0 {
                    any_changed.store(true, Ordering::Relaxed);
                    ctx.changed_functions.insert(method);
                }

                match result {
                    Ok(_) => None,
                    Err(error) => {
                        ctx.events
                            .record(EventKind::Error)
                            .method(method)
                            .message(format!("{name}: {error}"));
                        Some((method, error))
                    }
                }
            })
            .collect();

        failures.sort_by_key(|(method, _)| *method);
        match failures.into_iter().next() {
            Some((_, error)) => Err(error),
            None => Ok(any_changed.load(Ordering::Relaxed)),
        }
    }

    /// Transforms a single function of `ctx`.
    ///
    /// The function is added to `ctx.changed_functions` if any step was
    /// committed, even when the pipeline then fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Error`] if `ctx` has no function for `method`, or the
    /// pipeline's error.
    pub fn run_single(&self, ctx: &TransformContext, method: Token) -> Result<bool> {
        let mut function = ctx
            .take_function(method)
            .ok_or_else(|| Error::Error(format!("no function for method {method}")))?;
        let local = StatementTransformContext::for_function(ctx, method);
        let result = self.pipeline.run(&mut function, &local);
        ctx.add_function(method, function);
        if local.steps() > 0 {
            ctx.changed_functions.insert(method);
        }
        result
    }
}
