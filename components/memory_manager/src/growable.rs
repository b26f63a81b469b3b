//! Growth and shrink policy for arrays whose capacity is tracked by the
//! caller (compiler buffers, prototype vectors, and the like).

use crate::allocator::MemoryManager;
use crate::error::MemoryError;
use crate::gc::Collector;
use crate::heap::{Block, RawAllocator};
use tracing::debug;

fn byte_size(count: usize, elem_size: usize) -> Result<usize, MemoryError> {
    count
        .checked_mul(elem_size)
        .filter(|&bytes| bytes <= isize::MAX as usize)
        .ok_or(MemoryError::BlockTooBig)
}

impl<A: RawAllocator, C: Collector<A>> MemoryManager<A, C> {
    /// Make room for one more element in an array of `count` elements.
    ///
    /// Returns the block unchanged when it already has room. Otherwise the
    /// capacity doubles (at least to the configured minimum) or, past half
    /// of `limit`, jumps straight to `limit`. `capacity` is only written
    /// after the reallocation succeeded.
    ///
    /// # Safety
    ///
    /// `block` must be live with `*capacity * elem_size` bytes, or `None`
    /// when `*capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use memory_manager::{MemoryManager, NoopCollector, SystemAllocator};
    ///
    /// let mut mm = MemoryManager::new(SystemAllocator, NoopCollector::ready());
    /// let mut capacity = 0;
    /// // SAFETY: the block starts empty and is only resized through `mm`
    /// let block = unsafe { mm.ensure_capacity(None, 0, &mut capacity, 8, 100, "items") }.unwrap();
    /// assert_eq!(capacity, 4);
    /// unsafe { mm.free(block, capacity * 8) };
    /// ```
    pub unsafe fn ensure_capacity(
        &mut self,
        block: Block,
        count: usize,
        capacity: &mut usize,
        elem_size: usize,
        limit: usize,
        what: &str,
    ) -> Result<Block, MemoryError> {
        if count < *capacity {
            return Ok(block);
        }
        let limit = if elem_size == 0 {
            limit
        } else {
            limit.min(isize::MAX as usize / elem_size)
        };
        let new_capacity = if *capacity >= limit / 2 {
            if *capacity >= limit {
                return Err(MemoryError::LimitExceeded {
                    what: what.to_string(),
                    limit,
                });
            }
            debug!(what, limit, "growable array clamped to its limit");
            limit
        } else {
            (*capacity * 2).max(self.config().min_array_size.max(1)).min(limit)
        };
        debug_assert!(count < new_capacity && new_capacity <= limit);
        let old_bytes = byte_size(*capacity, elem_size)?;
        let new_bytes = byte_size(new_capacity, elem_size)?;
        let new_block = self.realloc(block, old_bytes, new_bytes)?;
        *capacity = new_capacity;
        Ok(new_block)
    }

    /// Shrink an array to exactly `final_count` elements.
    ///
    /// # Safety
    ///
    /// Same contract as [`ensure_capacity`](Self::ensure_capacity);
    /// `final_count` must not exceed `*capacity`.
    pub unsafe fn shrink_to(
        &mut self,
        block: Block,
        capacity: &mut usize,
        final_count: usize,
        elem_size: usize,
    ) -> Result<Block, MemoryError> {
        debug_assert!(final_count <= *capacity);
        let old_bytes = byte_size(*capacity, elem_size)?;
        let new_bytes = byte_size(final_count, elem_size)?;
        let new_block = self.realloc(block, old_bytes, new_bytes)?;
        *capacity = final_count;
        Ok(new_block)
    }
}
