//! Raw allocation primitives and the debt-tracking heap.
//!
//! Every byte the runtime requests flows through a [`RawAllocator`] with a
//! single realloc-shaped entry point:
//!
//! - `realloc(block, old, 0)` frees `block` and returns `None`; it never fails.
//! - `realloc(None, tag, new)` creates a new block of size `new`; the old
//!   size slot carries an allocation-site tag with no accounting weight.
//! - `realloc(Some(b), old, new)` resizes `b`, returning `None` on failure
//!   and leaving `b` untouched.

use std::alloc::{alloc, dealloc, realloc, Layout};
use std::collections::HashMap;
use std::ptr::NonNull;

/// A possibly-empty memory block. `None` is the null block.
pub type Block = Option<NonNull<u8>>;

/// Alignment of every block handed out by [`SystemAllocator`].
pub const MAX_ALIGN: usize = 16;

/// The user-supplied raw allocation function.
pub trait RawAllocator {
    /// Allocate, resize or free a block.
    ///
    /// # Safety
    ///
    /// `block`, when present, must have been returned by this allocator and
    /// not freed since, and `old_size` must be the size it was allocated
    /// with. When `block` is `None`, `old_size` is a tag and is not a size.
    unsafe fn realloc(&mut self, block: Block, old_size: usize, new_size: usize) -> Block;
}

/// Raw allocator backed by the global Rust allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl RawAllocator for SystemAllocator {
    unsafe fn realloc(&mut self, block: Block, old_size: usize, new_size: usize) -> Block {
        match (block, new_size) {
            (None, 0) => None,
            (Some(ptr), 0) => {
                if let Ok(layout) = Layout::from_size_align(old_size, MAX_ALIGN) {
                    // SAFETY: caller guarantees `ptr` came from this allocator with `old_size`
                    dealloc(ptr.as_ptr(), layout);
                }
                None
            }
            (None, size) => {
                let layout = Layout::from_size_align(size, MAX_ALIGN).ok()?;
                // SAFETY: `layout` has a non-zero size
                NonNull::new(alloc(layout))
            }
            (Some(ptr), size) => {
                let layout = Layout::from_size_align(old_size, MAX_ALIGN).ok()?;
                Layout::from_size_align(size, MAX_ALIGN).ok()?;
                // SAFETY: caller guarantees `ptr`/`old_size`; the new size is non-zero
                // and forms a valid layout with the same alignment
                NonNull::new(realloc(ptr.as_ptr(), layout, size))
            }
        }
    }
}

/// Raw allocator wrapper that refuses to hold more than `limit` bytes.
///
/// Also counts fresh allocations per site tag, which makes it the usual
/// choice for sandboxed interpreters and for allocation-failure tests.
///
/// # Examples
///
/// ```
/// use memory_manager::{BudgetAllocator, RawAllocator, SystemAllocator};
///
/// let mut raw = BudgetAllocator::new(SystemAllocator, 100);
/// // SAFETY: fresh allocations and frees of blocks from this allocator
/// unsafe {
///     let a = raw.realloc(None, 0, 64);
///     assert!(a.is_some());
///     assert!(raw.realloc(None, 0, 64).is_none());
///     raw.realloc(a, 64, 0);
/// }
/// assert_eq!(raw.in_use(), 0);
/// ```
#[derive(Debug)]
pub struct BudgetAllocator<A: RawAllocator> {
    inner: A,
    limit: usize,
    in_use: usize,
    tags: HashMap<usize, usize>,
}

impl<A: RawAllocator> BudgetAllocator<A> {
    /// Wrap `inner`, allowing at most `limit` live bytes.
    pub fn new(inner: A, limit: usize) -> Self {
        Self {
            inner,
            limit,
            in_use: 0,
            tags: HashMap::new(),
        }
    }

    /// Bytes currently live through this allocator.
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// The byte budget.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the byte budget. Live blocks above the new budget stay valid.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// Number of fresh allocations made with the given site tag.
    pub fn tag_count(&self, tag: usize) -> usize {
        self.tags.get(&tag).copied().unwrap_or(0)
    }
}

impl<A: RawAllocator> RawAllocator for BudgetAllocator<A> {
    unsafe fn realloc(&mut self, block: Block, old_size: usize, new_size: usize) -> Block {
        let live_old = if block.is_some() { old_size } else { 0 };
        let over_budget = self
            .in_use
            .checked_sub(live_old)
            .and_then(|n| n.checked_add(new_size))
            .map_or(true, |n| n > self.limit);
        if new_size > 0 && over_budget {
            return None;
        }
        let result = self.inner.realloc(block, old_size, new_size);
        if result.is_some() || new_size == 0 {
            self.in_use = self.in_use - live_old + new_size;
            if block.is_none() && new_size > 0 {
                *self.tags.entry(old_size).or_insert(0) += 1;
            }
        }
        result
    }
}

/// The raw allocator together with the collector debt counter.
///
/// The heap is what an emergency collection gets to work with: it can free
/// blocks (lowering the debt) but cannot trigger another collection.
#[derive(Debug)]
pub struct Heap<A: RawAllocator> {
    raw: A,
    debt: isize,
}

impl<A: RawAllocator> Heap<A> {
    /// Creates a heap over `raw` with zero debt.
    pub fn new(raw: A) -> Self {
        Heap { raw, debt: 0 }
    }

    /// Bytes allocated beyond the collector's last threshold.
    pub fn debt(&self) -> isize {
        self.debt
    }

    /// Move the collector's accounting baseline. The allocation paths only
    /// ever adjust the counter by the sizes they move.
    pub fn shift_baseline(&mut self, delta: isize) {
        self.debt -= delta;
    }

    /// The raw allocator.
    pub fn raw(&self) -> &A {
        &self.raw
    }

    /// The raw allocator, mutably.
    pub fn raw_mut(&mut self) -> &mut A {
        &mut self.raw
    }

    /// Free `block` of `old_size` bytes. Never fails.
    ///
    /// # Safety
    ///
    /// `block` must be live and allocated through this heap with `old_size`.
    pub unsafe fn free(&mut self, block: Block, old_size: usize) {
        assert_eq!(
            old_size == 0,
            block.is_none(),
            "free: size 0 must coincide with the null block"
        );
        self.raw.realloc(block, old_size, 0);
        self.debt -= old_size as isize;
    }

    /// Call the raw allocator without touching the debt.
    pub(crate) unsafe fn call_raw(&mut self, block: Block, old_size: usize, new_size: usize) -> Block {
        self.raw.realloc(block, old_size, new_size)
    }

    pub(crate) fn charge(&mut self, old_size: usize, new_size: usize) {
        self.debt = self.debt + new_size as isize - old_size as isize;
    }
}
