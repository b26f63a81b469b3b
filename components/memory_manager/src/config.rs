//! Allocator configuration.

use serde::{Deserialize, Serialize};

/// Minimum capacity a growable array jumps to on its first growth, to skip
/// reallocating to sizes 1, 2 and then 4.
pub const MIN_ARRAY_SIZE: usize = 4;

/// Tunables for [`MemoryManager`](crate::MemoryManager).
///
/// # Examples
///
/// ```
/// use memory_manager::MemoryConfig;
///
/// let config = MemoryConfig::default().with_emergency_gc_stress(true);
/// assert!(config.emergency_gc_stress);
/// assert_eq!(config.min_array_size, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Fail every first allocation attempt that could be retried, so each
    /// allocation runs a full emergency collection (collector stress mode)
    pub emergency_gc_stress: bool,
    /// Floor applied when a growable array doubles (never below one)
    pub min_array_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            emergency_gc_stress: false,
            min_array_size: MIN_ARRAY_SIZE,
        }
    }
}

impl MemoryConfig {
    /// Enable or disable the emergency collection stress mode
    pub fn with_emergency_gc_stress(mut self, enabled: bool) -> Self {
        self.emergency_gc_stress = enabled;
        self
    }

    /// Set the growth floor for growable arrays. A floor of zero acts as one.
    pub fn with_min_array_size(mut self, size: usize) -> Self {
        self.min_array_size = size.max(1);
        self
    }
}
