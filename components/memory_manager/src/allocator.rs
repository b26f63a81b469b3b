//! The allocation choke point.
//!
//! [`MemoryManager`] owns the raw allocator (inside a [`Heap`]) and the
//! collector. Every size it moves is charged to the heap's debt counter:
//! `new - old` after a successful allocate/resize, `-old` after a free, and
//! nothing after a failure.

use crate::config::MemoryConfig;
use crate::error::MemoryError;
use crate::gc::Collector;
use crate::heap::{Block, Heap, RawAllocator};
use tracing::{debug, warn};

/// Counters describing what the allocator has done so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    /// Successful raw calls that produced or resized a block
    pub reallocations: usize,
    /// Emergency full collections triggered by failed allocations
    pub emergency_collections: usize,
    /// Allocations that failed even after the retry
    pub failures: usize,
}

/// Collector-aware allocation front end.
pub struct MemoryManager<A: RawAllocator, C: Collector<A>> {
    heap: Heap<A>,
    collector: C,
    config: MemoryConfig,
    stats: MemoryStats,
}

impl<A: RawAllocator, C: Collector<A>> MemoryManager<A, C> {
    /// Creates a manager with the default configuration.
    pub fn new(raw: A, collector: C) -> Self {
        Self::with_config(raw, collector, MemoryConfig::default())
    }

    /// Creates a manager with an explicit configuration.
    pub fn with_config(raw: A, collector: C, config: MemoryConfig) -> Self {
        MemoryManager {
            heap: Heap::new(raw),
            collector,
            config,
            stats: MemoryStats::default(),
        }
    }

    /// Current collector debt in bytes.
    pub fn debt(&self) -> isize {
        self.heap.debt()
    }

    /// The heap (raw allocator plus debt).
    pub fn heap(&self) -> &Heap<A> {
        &self.heap
    }

    /// The heap, mutably. Collectors use this to move their baseline.
    pub fn heap_mut(&mut self) -> &mut Heap<A> {
        &mut self.heap
    }

    /// The collector.
    pub fn collector(&self) -> &C {
        &self.collector
    }

    /// The collector, mutably.
    pub fn collector_mut(&mut self) -> &mut C {
        &mut self.collector
    }

    /// The configuration in effect.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Allocation counters.
    pub fn stats(&self) -> MemoryStats {
        self.stats
    }

    /// An emergency collection is only possible once the runtime is fully
    /// built and no collection step is already running.
    fn can_try_again(&self) -> bool {
        self.collector.is_complete() && !self.collector.is_collecting()
    }

    /// First raw attempt. In stress mode every attempt that could be
    /// retried fails, so each allocation runs an emergency collection.
    unsafe fn first_try(&mut self, block: Block, old_size: usize, new_size: usize) -> Block {
        if self.config.emergency_gc_stress && new_size > 0 && self.can_try_again() {
            None
        } else {
            self.heap.call_raw(block, old_size, new_size)
        }
    }

    /// Run one emergency full collection and retry the raw call once.
    unsafe fn try_again(&mut self, block: Block, old_size: usize, new_size: usize) -> Block {
        if !self.can_try_again() {
            return None;
        }
        debug!(old_size, new_size, "allocation failed; running emergency collection");
        self.stats.emergency_collections += 1;
        self.collector.full_collection(&mut self.heap, true);
        self.heap.call_raw(block, old_size, new_size)
    }

    /// Resize `block` from `old_size` to `new_size`, returning `None` when
    /// the raw allocator fails even after an emergency collection.
    ///
    /// On failure the debt is left untouched and `block` stays valid.
    ///
    /// # Safety
    ///
    /// `block` must be live and allocated through this manager with
    /// `old_size` bytes, or be `None` with `old_size` carrying a tag.
    pub unsafe fn try_realloc(
        &mut self,
        block: Block,
        old_size: usize,
        new_size: usize,
    ) -> Option<Block> {
        debug_assert!(block.is_none() || old_size > 0, "a live block must have a size");
        let mut new_block = self.first_try(block, old_size, new_size);
        if new_block.is_none() && new_size > 0 {
            new_block = self.try_again(block, old_size, new_size);
            if new_block.is_none() {
                self.stats.failures += 1;
                warn!(old_size, new_size, "allocation failed after emergency collection");
                return None;
            }
        }
        debug_assert_eq!(new_size == 0, new_block.is_none());
        let charged_old = if block.is_some() { old_size } else { 0 };
        self.heap.charge(charged_old, new_size);
        if new_size > 0 {
            self.stats.reallocations += 1;
        }
        Some(new_block)
    }

    /// Like [`try_realloc`](Self::try_realloc), failing with
    /// [`MemoryError::OutOfMemory`].
    ///
    /// # Safety
    ///
    /// Same contract as [`try_realloc`](Self::try_realloc).
    pub unsafe fn realloc(
        &mut self,
        block: Block,
        old_size: usize,
        new_size: usize,
    ) -> Result<Block, MemoryError> {
        self.try_realloc(block, old_size, new_size)
            .ok_or(MemoryError::OutOfMemory)
    }

    /// Run a regular (non-emergency) full collection.
    pub fn full_collection(&mut self) {
        self.collector.full_collection(&mut self.heap, false);
    }

    /// Free `block` of `old_size` bytes. Never fails.
    ///
    /// # Safety
    ///
    /// `block` must be live and allocated through this manager with
    /// `old_size` bytes. `old_size` is 0 exactly when `block` is `None`.
    pub unsafe fn free(&mut self, block: Block, old_size: usize) {
        self.heap.free(block, old_size);
    }

    /// Allocate `size` bytes, returning `None` on failure.
    pub fn try_allocate(&mut self, size: usize) -> Option<Block> {
        // SAFETY: a fresh allocation passes no live block
        unsafe { self.try_realloc(None, 0, size) }
    }

    /// Allocate `size` bytes. A zero size yields the null block.
    pub fn allocate(&mut self, size: usize) -> Result<Block, MemoryError> {
        self.allocate_tagged(size, 0)
    }

    /// Allocate `size` bytes, passing `tag` to the raw allocator in the old
    /// size slot to classify the allocation site. The tag is not charged.
    pub fn allocate_tagged(&mut self, size: usize, tag: usize) -> Result<Block, MemoryError> {
        if size == 0 {
            return Ok(None);
        }
        // SAFETY: a fresh allocation passes no live block; `tag` is only a label
        unsafe { self.realloc(None, tag, size) }
    }
}

impl<A: RawAllocator + std::fmt::Debug, C: Collector<A> + std::fmt::Debug> std::fmt::Debug
    for MemoryManager<A, C>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("heap", &self.heap)
            .field("collector", &self.collector)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}
