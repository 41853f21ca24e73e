//! Event log of the statement transform pipeline.
//!
//! Transforms report each rewrite they perform; the pipeline and scheduler add
//! pass boundaries and diagnostics. The log is append-only and lock-free, so
//! workers transforming different functions share one log.
//!
//! # Example
//!
//! ```rust
//! use dotlift::token::Token;
//! use dotlift::transforms::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::InterpolatedStringTransformed)
//!     .at(Token::method_def(1), 3)
//!     .message("handler h");
//! assert_eq!(log.summary(), "1 interpolated string transformed");
//! ```

use std::{collections::BTreeMap, fmt};

use strum::Display;

use crate::token::Token;

/// What an [`Event`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum EventKind {
    /// A handler window became an interpolated string block.
    #[strum(to_string = "interpolated string transformed")]
    InterpolatedStringTransformed,
    /// A handler local became an initializer target.
    #[strum(to_string = "variable absorbed")]
    VariableAbsorbed,
    /// A handler-taking call now calls its `string` overload.
    #[strum(to_string = "call retargeted")]
    CallRetargeted,
    /// Statements left their block.
    #[strum(to_string = "instruction removed")]
    InstructionRemoved,

    /// A transform committed to a change at the current position.
    #[strum(to_string = "transform step")]
    TransformStep,
    /// The pipeline started on a function.
    #[strum(to_string = "pass started")]
    PassStarted,
    /// The pipeline finished a function.
    #[strum(to_string = "pass completed")]
    PassCompleted,

    /// Something unusual that did not stop the pipeline.
    #[strum(to_string = "warning")]
    Warning,
    /// A function failed to transform.
    #[strum(to_string = "error")]
    Error,
}

impl EventKind {
    /// Returns true for kinds that describe an edit of the IL tree.
    #[must_use]
    pub fn is_transformation(self) -> bool {
        matches!(
            self,
            Self::InterpolatedStringTransformed
                | Self::VariableAbsorbed
                | Self::CallRetargeted
                | Self::InstructionRemoved
        )
    }
}

/// One entry of an [`EventLog`].
#[derive(Debug, Clone)]
pub struct Event {
    /// Event kind
    pub kind: EventKind,
    /// Function the event belongs to
    pub method: Option<Token>,
    /// Instruction index inside the function
    pub location: Option<usize>,
    /// Free-form detail; the kind's name when none was given
    pub message: String,
    /// Name of the transform that emitted the event
    pub pass: Option<String>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(method) = self.method {
            write!(f, " {method}")?;
        }
        if let Some(location) = self.location {
            write!(f, "@{location}")?;
        }
        write!(f, " {}", self.message)
    }
}

/// Fills in an [`Event`]; the event is appended when the builder drops.
///
/// Returned by [`EventLog::record`].
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    event: Event,
}

impl EventBuilder<'_> {
    /// Attributes the event to `method`, at instruction `location`.
    pub fn at(mut self, method: Token, location: usize) -> Self {
        self.event.method = Some(method);
        self.event.location = Some(location);
        self
    }

    /// Attributes the event to `method`.
    pub fn method(mut self, method: Token) -> Self {
        self.event.method = Some(method);
        self
    }

    /// Sets the message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.event.message = message.into();
        self
    }

    /// Names the transform that emitted the event.
    pub fn pass(mut self, name: impl Into<String>) -> Self {
        self.event.pass = Some(name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        self.log.events.push(Event {
            kind: self.event.kind,
            method: self.event.method,
            location: self.event.location,
            message: std::mem::take(&mut self.event.message),
            pass: self.event.pass.take(),
        });
    }
}

/// Append-only, thread-safe list of [`Event`]s.
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let log = Self::new();
        log.merge(self);
        log
    }
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts an event of `kind`. Chain the builder methods; the event is
    /// stored once the builder goes out of scope.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder {
            log: self,
            event: Event {
                kind,
                method: None,
                location: None,
                message: kind.to_string(),
                pass: None,
            },
        }
    }

    /// Records a warning.
    pub fn warn(&self, message: impl Into<String>) {
        self.record(EventKind::Warning).message(message);
    }

    /// Appends a copy of every event of `other`.
    pub fn merge(&self, other: &EventLog) {
        for event in other.iter() {
            self.events.push(event.clone());
        }
    }

    /// All events, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, event)| event)
    }

    /// Events of one kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |event| event.kind == kind)
    }

    /// Error events.
    pub fn errors(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Error)
    }

    /// Returns true if an event of `kind` was recorded.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.filter_kind(kind).next().is_some()
    }

    /// Number of events of `kind`.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.filter_kind(kind).count()
    }

    /// One line listing how many edits of each kind were recorded, e.g.
    /// `"2 interpolated string transformed, 2 variable absorbed"`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut counts: BTreeMap<EventKind, usize> = BTreeMap::new();
        for event in self.iter().filter(|e| e.kind.is_transformation()) {
            *counts.entry(event.kind).or_default() += 1;
        }

        if counts.is_empty() {
            return match self.len() {
                0 => "no events".to_string(),
                n => format!("{n} events"),
            };
        }
        counts
            .iter()
            .map(|(kind, count)| format!("{count} {kind}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
