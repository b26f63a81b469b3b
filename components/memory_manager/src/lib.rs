//! Memory Manager - collector-aware allocation front end
//!
//! This component provides:
//! - A single choke point for every allocate/resize/free in the runtime
//! - Exact accounting of the collector debt counter
//! - One emergency full collection and retry when an allocation fails
//! - Amortized growth and exact shrinking for growable arrays
//! - Raw allocators: the system allocator and a byte-budgeted wrapper
//!
//! # Example
//!
//! ```
//! use memory_manager::{MemoryManager, NoopCollector, SystemAllocator};
//!
//! let mut mm = MemoryManager::new(SystemAllocator, NoopCollector::ready());
//! let block = mm.allocate(64).unwrap();
//! assert_eq!(mm.debt(), 64);
//!
//! // SAFETY: `block` was allocated by `mm` with size 64
//! unsafe { mm.free(block, 64) };
//! assert_eq!(mm.debt(), 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod config;
pub mod error;
pub mod gc;
pub mod growable;
pub mod heap;

// Re-export main types
pub use allocator::{MemoryManager, MemoryStats};
pub use config::MemoryConfig;
pub use error::MemoryError;
pub use gc::{Collector, GarbageList, NoopCollector};
pub use heap::{Block, BudgetAllocator, Heap, RawAllocator, SystemAllocator, MAX_ALIGN};
