//! Allocation failures.

use core_types::{ErrorKind, SolError};
use thiserror::Error;

/// Failures reported by the fatal allocation tier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// The raw allocator failed, even after an emergency collection
    #[error("not enough memory")]
    OutOfMemory,
    /// A growable array cannot grow past its hard limit
    #[error("too many {what} (limit is {limit})")]
    LimitExceeded {
        /// What the array holds, e.g. "local variables"
        what: String,
        /// The hard element limit
        limit: usize,
    },
    /// The requested byte size does not fit in `usize`
    #[error("memory allocation error: block too big")]
    BlockTooBig,
}

impl From<MemoryError> for SolError {
    fn from(err: MemoryError) -> Self {
        let kind = match err {
            MemoryError::OutOfMemory => ErrorKind::OutOfMemory,
            MemoryError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            MemoryError::BlockTooBig => ErrorKind::Runtime,
        };
        SolError::new(kind, err.to_string())
    }
}
