//! Core value types and error handling for the Sol runtime.
//!
//! This crate provides the foundational types shared by the allocator,
//! the bytecode system and the debug engine:
//!
//! - [`Value`] - Tagged representation of runtime values
//! - [`SolError`] - The error value carried by every non-local exit
//! - [`ErrorKind`] - Classification of runtime failures
//! - [`SourcePosition`] - Source location attached to an error
//! - [`StackFrame`] - One entry of a call-stack traceback
//! - [`chunk_id`] - Short display form of a source identifier
//!
//! # Examples
//!
//! ```
//! use core_types::{chunk_id, ErrorKind, SolError, Value};
//!
//! let n = Value::Integer(42);
//! assert_eq!(n.type_name(), "number");
//!
//! let err = SolError::runtime("attempt to call a nil value");
//! assert_eq!(err.kind, ErrorKind::Runtime);
//!
//! assert_eq!(chunk_id("@main.sol"), "main.sol");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod source;
mod value;

pub use error::{ErrorKind, SolError, SolResult};
pub use source::{chunk_id, SourcePosition, StackFrame, ID_SIZE};
pub use value::Value;
