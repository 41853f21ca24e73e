//! Statement transforms over the IL tree.
//!
//! A statement transform looks at one statement position of one block and
//! either rewrites the statements around it or leaves the block untouched.
//! The [`StatementTransformPipeline`] drives a list of transforms over every
//! block of a function, and the [`TransformScheduler`] runs the pipeline over
//! many functions in parallel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    Statement Transform Pipeline                  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  TransformContext            Shared state for one run            │
//! │    ├─ DecompilerSettings      (switches and limits)              │
//! │    ├─ Arc<TypeSystem>         (read-only metadata)               │
//! │    ├─ IL functions            (DashMap keyed by method token)    │
//! │    └─ EventLog                                                   │
//! │                                                                  │
//! │  TransformScheduler          Parallel driver over functions      │
//! │                                                                  │
//! │  StatementTransformPipeline  Per-function driver                 │
//! │    ├─ ControlFlow blocks      innermost first                    │
//! │    ├─ positions               last to first                      │
//! │    └─ re-run after a change   bounded per position               │
//! │                                                                  │
//! │  StatementTransform trait    Interface for all transforms        │
//! │    └─ InterpolatedStringTransform                                │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod context;
mod events;
mod inlining;
mod interpolation;
mod pipeline;
mod scheduler;
mod settings;

pub use context::{StatementTransformContext, TransformContext};
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use inlining::{find_load_in_next, may_reorder, Effects, FindResult};
pub use interpolation::{Consumer, InterpolatedStringTransform, InterpolationWindow};
pub use pipeline::StatementTransformPipeline;
pub use scheduler::TransformScheduler;
pub use settings::DecompilerSettings;

use crate::{
    il::{ILFunction, InstrId},
    Result,
};

/// A transform that operates on one statement position of a block.
///
/// All transforms must be thread-safe (Send + Sync) so one pipeline can be
/// shared by the scheduler's worker threads. Transforms receive mutable
/// access to the function being transformed and shared access to everything
/// else through the [`StatementTransformContext`].
///
/// # Contract
///
/// - A transform that does not apply returns `Ok(())` without touching the
///   function.
/// - A transform that applies calls [`StatementTransformContext::step`]
///   before its first mutation; the driver uses that marker to recount
///   variables and re-run the transforms at the same position.
/// - Every check that can fail runs before the first mutation, so an error
///   never leaves a half-rewritten block behind.
pub trait StatementTransform: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Get a description of what this transform does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Runs the transform on statement `pos` of `block`.
    ///
    /// # Arguments
    ///
    /// * `function` - The function owning `block`.
    /// * `block` - A `ControlFlow` block of `function`.
    /// * `pos` - Statement index inside `block`.
    /// * `ctx` - Settings, type system and event sink for this invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the statements violate a contract the transform
    /// cannot skip over.
    fn run(
        &self,
        function: &mut ILFunction,
        block: InstrId,
        pos: usize,
        ctx: &StatementTransformContext<'_>,
    ) -> Result<()>;
}
