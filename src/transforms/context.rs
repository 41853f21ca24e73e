//! Shared and per-invocation state for statement transforms.
//!
//! [`TransformContext`] holds everything that outlives a single function:
//! the settings, the shared type system, the function bodies keyed by method
//! token, and the event log. It is `Sync`, so functions can be transformed in
//! parallel against one context.
//!
//! [`StatementTransformContext`] is created per function by the pipeline and
//! handed to every [`StatementTransform`](crate::transforms::StatementTransform)
//! invocation. Besides read access to the shared state it carries the step
//! marker a transform sets when it commits a change.

use std::{cell::Cell, sync::Arc};

use dashmap::{DashMap, DashSet};

use crate::{
    il::{ILFunction, InstrId},
    token::Token,
    transforms::{DecompilerSettings, EventKind, EventLog},
    typesystem::TypeSystem,
};

/// State shared by all functions of one pipeline run.
pub struct TransformContext {
    /// Transform switches and limits.
    pub settings: DecompilerSettings,

    /// Type and member metadata (read-only).
    pub types: Arc<TypeSystem>,

    /// IL bodies, keyed by their `MethodDef` token.
    pub functions: DashMap<Token, ILFunction>,

    /// Functions that were changed by at least one transform.
    pub changed_functions: DashSet<Token>,

    /// Accumulated events from all transforms.
    pub events: EventLog,
}

impl TransformContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new(settings: DecompilerSettings, types: Arc<TypeSystem>) -> Self {
        Self {
            settings,
            types,
            functions: DashMap::new(),
            changed_functions: DashSet::new(),
            events: EventLog::new(),
        }
    }

    /// Adds (or replaces) the body of `method`.
    pub fn add_function(&self, method: Token, function: ILFunction) {
        self.functions.insert(method, function);
    }

    /// Removes and returns the body of `method`.
    pub fn take_function(&self, method: Token) -> Option<ILFunction> {
        self.functions.remove(&method).map(|(_, f)| f)
    }

    /// All method tokens, in ascending order.
    #[must_use]
    pub fn methods(&self) -> Vec<Token> {
        let mut tokens: Vec<Token> = self.functions.iter().map(|e| *e.key()).collect();
        tokens.sort();
        tokens
    }
}

/// Context for transforming the statements of a single function.
pub struct StatementTransformContext<'a> {
    /// Transform switches and limits.
    pub settings: &'a DecompilerSettings,
    /// Type and member metadata.
    pub types: &'a TypeSystem,
    /// Destination for events.
    pub events: &'a EventLog,
    /// Token of the function being transformed.
    pub method: Token,
    pass: Cell<Option<&'static str>>,
    changed: Cell<bool>,
    steps: Cell<usize>,
}

impl<'a> StatementTransformContext<'a> {
    /// Creates a context for one function.
    #[must_use]
    pub fn new(
        settings: &'a DecompilerSettings,
        types: &'a TypeSystem,
        events: &'a EventLog,
        method: Token,
    ) -> Self {
        Self {
            settings,
            types,
            events,
            method,
            pass: Cell::new(None),
            changed: Cell::new(false),
            steps: Cell::new(0),
        }
    }

    /// Creates a context borrowing the shared state of `ctx`.
    #[must_use]
    pub fn for_function(ctx: &'a TransformContext, method: Token) -> Self {
        Self::new(&ctx.settings, &ctx.types, &ctx.events, method)
    }

    /// Marks the transform that is about to run, for event attribution.
    pub fn enter_pass(&self, name: &'static str) {
        self.pass.set(Some(name));
    }

    /// Name of the transform currently running.
    #[must_use]
    pub fn current_pass(&self) -> Option<&'static str> {
        self.pass.get()
    }

    /// Commits a change: records a step event at `location` and signals the
    /// driver to re-run the transforms at the current position.
    ///
    /// Must be called before the first mutation of the tree.
    pub fn step(&self, message: impl Into<String>, location: InstrId) {
        self.record(EventKind::TransformStep, location, message);
        self.changed.set(true);
        self.steps.set(self.steps.get() + 1);
    }

    /// Records an event attributed to the current function and pass.
    pub fn record(&self, kind: EventKind, location: InstrId, message: impl Into<String>) {
        let mut event = self
            .events
            .record(kind)
            .at(self.method, location.index())
            .message(message);
        if let Some(pass) = self.pass.get() {
            event = event.pass(pass);
        }
        drop(event);
    }

    /// Returns whether a step was committed since the last call, and resets the marker.
    pub fn take_changed(&self) -> bool {
        self.changed.replace(false)
    }

    /// Number of steps committed through this context.
    ///
    /// Unlike [`take_changed`](Self::take_changed) this is never reset, so it
    /// tells whether the function was touched even when a later transform
    /// failed.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::TypeSystemBuilder;

    #[test]
    fn test_step_marks_changed() {
        let settings = DecompilerSettings::default();
        let types = TypeSystemBuilder::with_corlib().build();
        let events = EventLog::new();
        let method = Token::method_def(3);
        let ctx = StatementTransformContext::new(&settings, &types, &events, method);

        assert!(!ctx.take_changed());
        ctx.enter_pass("demo");
        ctx.step("did something", InstrId(4));
        assert!(ctx.take_changed());
        assert!(!ctx.take_changed());
        ctx.step("again", InstrId(5));
        assert_eq!(ctx.steps(), 2);

        let event = events.iter().next().unwrap();
        assert_eq!(event.kind, EventKind::TransformStep);
        assert_eq!(event.method, Some(method));
        assert_eq!(event.location, Some(4));
        assert_eq!(event.pass.as_deref(), Some("demo"));
    }

    #[test]
    fn test_record_does_not_mark_changed() {
        let settings = DecompilerSettings::default();
        let types = TypeSystemBuilder::with_corlib().build();
        let events = EventLog::new();
        let ctx = StatementTransformContext::new(&settings, &types, &events, Token::method_def(1));

        ctx.record(EventKind::CallRetargeted, InstrId(0), "retarget");
        assert!(!ctx.take_changed());
        assert_eq!(ctx.steps(), 0);
        assert_eq!(events.count_kind(EventKind::CallRetargeted), 1);
    }

    #[test]
    fn test_transform_context_functions() {
        let types = Arc::new(TypeSystemBuilder::with_corlib().build());
        let ctx = TransformContext::new(DecompilerSettings::default(), types);
        ctx.add_function(Token::method_def(2), ILFunction::new("B"));
        ctx.add_function(Token::method_def(1), ILFunction::new("A"));

        assert_eq!(ctx.methods(), vec![Token::method_def(1), Token::method_def(2)]);
        let taken = ctx.take_function(Token::method_def(1)).unwrap();
        assert_eq!(taken.name(), "A");
        assert_eq!(ctx.methods().len(), 1);
    }
}
