use thiserror::Error;

use crate::{il::InstrId, typesystem::MethodId};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers every failure a transform pipeline can report to
/// its driver.
///
/// Most statement transforms never fail: a pattern that does not match is simply left
/// alone. The variants below are reserved for inputs that violate a closed contract and
/// therefore must not be masked by a silent no-op.
///
/// # Error Categories
///
/// ## Pattern Contract Violations
/// - [`Error::UnresolvedHandlerConsumer`] - A standard interpolation handler has no valid consumer
/// - [`Error::UnsupportedCallKind`] - A consumer call cannot be retargeted without losing semantics
/// - [`Error::OverloadNotFound`] - No overload accepting a plain string exists for a custom handler
///
/// ## IL Tree Errors
/// - [`Error::Malformed`] - An arena invariant was broken (dangling or detached node)
/// - [`Error::InvalidInstruction`] - An instruction handle does not exist in the function
///
/// # Examples
///
/// ```rust,ignore
/// use dotlift::Error;
///
/// match scheduler.run(&ctx) {
///     Ok(changed) => println!("changed: {changed}"),
///     Err(Error::UnresolvedHandlerConsumer { variable }) => {
///         eprintln!("handler {variable} is never consumed");
///     }
///     Err(e) => eprintln!("pipeline failed: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A `DefaultInterpolatedStringHandler` window was matched but no
    /// `ToStringAndClear` call consumes it.
    ///
    /// The standard handler has exactly one valid consumption form, so this
    /// indicates an inconsistency introduced earlier in the pipeline.
    #[error("Can't find call consuming interpolated string handler {variable}")]
    UnresolvedHandlerConsumer {
        /// Name of the handler variable
        variable: String,
    },

    /// The consumer of a custom handler is a call form that cannot be rebuilt
    /// against a string overload.
    #[error("Call kind '{0}' is not supported for custom string interpolation handlers")]
    UnsupportedCallKind(String),

    /// No sibling overload accepting `string` exists for a call that takes a
    /// custom interpolation handler.
    #[error("No string overload found for {method}")]
    OverloadNotFound {
        /// The method whose overload was searched
        method: MethodId,
    },

    /// The IL tree is damaged and could not be processed.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An instruction handle does not refer to a node of the function.
    #[error("Instruction {0} does not exist")]
    InvalidInstruction(InstrId),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
