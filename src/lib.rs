// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dotlift
//!
//! Statement-level lifting of lowered C# constructs in a decompiler IL tree.
//!
//! The C# 10 compiler lowers interpolated strings such as `$"x={n}"` to a
//! sequence of calls on an interpolated string handler local. `dotlift`
//! recognizes those sequences in a block-structured IL tree and folds them
//! back into an interpolated string block, retargeting handler-taking calls to
//! their `string` overloads where needed.
//!
//! ## Features
//!
//! - **Arena IL tree** - Instructions, blocks and variables with parent links
//!   and usage counters
//! - **Type system view** - Just enough type and method metadata to recognize
//!   the runtime and IL2CPP handler types and resolve overloads
//! - **Statement transforms** - A pipeline that re-runs transforms at a
//!   position until it settles
//! - **Parallel scheduling** - Every function of a context is transformed on
//!   the rayon pool
//! - **Event log** - Every rewrite is recorded for later inspection
//!
//! ## Quick Start
//!
//! ```rust
//! use dotlift::prelude::*;
//!
//! let types = TypeSystemBuilder::with_corlib().build();
//! let handler = types
//!     .known_type(KnownTypeCode::DefaultInterpolatedStringHandler)
//!     .ok_or_else(|| dotlift::Error::Error("no handler".into()))?;
//! let ctor = types.find_method(handler, ".ctor", 2).unwrap();
//! let append = types.find_method(handler, "AppendLiteral", 1).unwrap();
//! let finish = types.find_method(handler, "ToStringAndClear", 0).unwrap();
//!
//! // s = $"hello";
//! let mut function = ILFunction::new("Greet");
//! let h = function.add_variable("handler", TypeSig::ValueType(handler), VariableKind::Local);
//! let s = function.add_variable("s", TypeSig::String, VariableKind::Local);
//!
//! let (length, holes) = (function.ldc_i4(5), function.ldc_i4(0));
//! let create = function.newobj(ctor, vec![length, holes]);
//! let create = function.stloc(h, create);
//! let (addr, text) = (function.ldloca(h), function.ldstr("hello"));
//! let literal = function.call(append, vec![addr, text]);
//! let addr = function.ldloca(h);
//! let result = function.call(finish, vec![addr]);
//! let store = function.stloc(s, result);
//!
//! let body = function.body();
//! for statement in [create, literal, store] {
//!     function.push(body, statement)?;
//! }
//!
//! let settings = DecompilerSettings::default();
//! let events = EventLog::new();
//! let ctx = StatementTransformContext::new(&settings, &types, &events, Token::method_def(1));
//! assert!(StatementTransformPipeline::default().run(&mut function, &ctx)?);
//! assert_eq!(function.block_instructions(body).unwrap(), &[store]);
//! assert!(events.has(EventKind::InterpolatedStringTransformed));
//! # Ok::<(), dotlift::Error>(())
//! ```
//!
//! ## Parallel use
//!
//! For whole assemblies, collect the functions in a [`transforms::TransformContext`]
//! and let a [`transforms::TransformScheduler`] run the pipeline over all of them.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotlift::prelude::*;
///
/// let types = TypeSystemBuilder::with_corlib().build();
/// assert!(types.known_type(KnownTypeCode::String).is_some());
/// ```
pub mod prelude;

/// The block-structured IL tree the transforms operate on.
///
/// # Key Types
///
/// - [`il::ILFunction`] - Arena of instructions and variables of one method
/// - [`il::Instruction`] - The closed set of instruction shapes
/// - [`il::ILVariable`] - A local with its store, load and address counters
pub mod il;

/// Metadata tokens identifying methods.
pub mod token;

/// Type and method definitions needed to recognize handler patterns.
///
/// # Key Types
///
/// - [`typesystem::TypeSystem`] - Immutable, shareable view of types and methods
/// - [`typesystem::TypeSystemBuilder`] - Builds a type system, optionally with
///   the corlib types preloaded
/// - [`typesystem::KnownTypeCode`] - Types the transforms refer to by role
pub mod typesystem;

/// Statement transforms, their driver and scheduler.
///
/// # Key Types
///
/// - [`transforms::InterpolatedStringTransform`] - Folds handler windows
/// - [`transforms::StatementTransformPipeline`] - Runs transforms over a function
/// - [`transforms::TransformScheduler`] - Runs the pipeline over many functions
/// - [`transforms::EventLog`] - Records what the transforms did
pub mod transforms;

/// `dotlift` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotlift` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;
