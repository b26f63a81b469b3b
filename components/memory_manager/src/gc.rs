//! The collector seam.
//!
//! The allocator never traces objects itself. It only needs to know whether
//! a collection may run right now and how to ask for a full one when the raw
//! allocator fails.

use crate::heap::{Block, Heap, RawAllocator};
use tracing::trace;

/// What the allocator needs from the garbage collector.
pub trait Collector<A: RawAllocator> {
    /// True once the runtime state is fully built. Before that no
    /// collection can run.
    fn is_complete(&self) -> bool;

    /// True while a collection step is already running; a nested emergency
    /// collection is not allowed then.
    fn is_collecting(&self) -> bool;

    /// Run a full collection, freeing unreachable blocks through `heap`.
    /// `emergency` collections must not run finalizers or shrink anything.
    fn full_collection(&mut self, heap: &mut Heap<A>, emergency: bool);
}

/// A collector that never frees anything.
///
/// Useful for hosts that manage lifetimes themselves and for tests that only
/// care about accounting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoopCollector {
    complete: bool,
    collecting: bool,
}

impl NoopCollector {
    /// A collector whose state is fully built.
    pub fn ready() -> Self {
        Self {
            complete: true,
            collecting: false,
        }
    }

    /// A collector whose state is still being built.
    pub fn building() -> Self {
        Self::default()
    }

    /// Mark a collection as in progress (or finished).
    pub fn set_collecting(&mut self, collecting: bool) {
        self.collecting = collecting;
    }
}

impl<A: RawAllocator> Collector<A> for NoopCollector {
    fn is_complete(&self) -> bool {
        self.complete
    }

    fn is_collecting(&self) -> bool {
        self.collecting
    }

    fn full_collection(&mut self, _heap: &mut Heap<A>, _emergency: bool) {}
}

/// A collector over an explicit list of unreachable blocks.
///
/// Blocks handed to [`GarbageList::discard`] stay allocated until the next
/// full collection releases them. Hosts that know object lifetimes up front
/// use this to batch their frees behind the collector.
#[derive(Debug, Default)]
pub struct GarbageList {
    pending: Vec<(Block, usize)>,
    collections: usize,
}

impl GarbageList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `block` of `size` bytes for release at the next collection.
    pub fn discard(&mut self, block: Block, size: usize) {
        self.pending.push((block, size));
    }

    /// Bytes waiting to be released.
    pub fn pending_bytes(&self) -> usize {
        self.pending.iter().map(|&(_, size)| size).sum()
    }

    /// Full collections run so far.
    pub fn collections(&self) -> usize {
        self.collections
    }
}

impl<A: RawAllocator> Collector<A> for GarbageList {
    fn is_complete(&self) -> bool {
        true
    }

    fn is_collecting(&self) -> bool {
        false
    }

    fn full_collection(&mut self, heap: &mut Heap<A>, emergency: bool) {
        self.collections += 1;
        trace!(
            blocks = self.pending.len(),
            emergency,
            "releasing discarded blocks"
        );
        for (block, size) in self.pending.drain(..) {
            // SAFETY: `discard` callers hand over live blocks of this heap
            unsafe { heap.free(block, size) };
        }
    }
}
