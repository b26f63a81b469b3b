//! Growth policy of growable arrays.

use memory_manager::{MemoryConfig, MemoryError, MemoryManager, NoopCollector, SystemAllocator};

#[test]
fn test_growth_is_logarithmic() {
    let mut mm = MemoryManager::new(SystemAllocator, NoopCollector::ready());
    let mut capacity = 0;
    let mut block = None;
    let limit = 1 << 20;
    let n = 10_000;

    // SAFETY: the block is only resized through `mm`
    unsafe {
        for count in 0..n {
            block = mm
                .ensure_capacity(block, count, &mut capacity, 8, limit, "elements")
                .unwrap();
            assert!(capacity > count);
            assert!(capacity <= limit);
        }
        // 4, 8, ..., 16384
        assert_eq!(mm.stats().reallocations, 13);
        mm.free(block, capacity * 8);
    }
    assert_eq!(mm.debt(), 0);
}

#[test]
fn test_one_past_limit_fails() {
    let mut mm = MemoryManager::new(SystemAllocator, NoopCollector::ready());
    let mut capacity = 0;
    let mut block = None;

    // SAFETY: the block is only resized through `mm`
    unsafe {
        for count in 0..255 {
            block = mm
                .ensure_capacity(block, count, &mut capacity, 16, 255, "registers")
                .unwrap();
        }
        assert_eq!(capacity, 255);
        let err = mm
            .ensure_capacity(block, 255, &mut capacity, 16, 255, "registers")
            .unwrap_err();
        assert_eq!(
            err,
            MemoryError::LimitExceeded {
                what: "registers".to_string(),
                limit: 255
            }
        );
        mm.free(block, capacity * 16);
    }
}

#[test]
fn test_configured_minimum() {
    let config = MemoryConfig::default().with_min_array_size(16);
    let mut mm = MemoryManager::with_config(SystemAllocator, NoopCollector::ready(), config);
    let mut capacity = 0;
    // SAFETY: the block is only resized through `mm`
    unsafe {
        let block = mm
            .ensure_capacity(None, 0, &mut capacity, 1, 100, "bytes")
            .unwrap();
        assert_eq!(capacity, 16);
        mm.free(block, 16);
    }
}

#[test]
fn test_shrink_to_same_capacity() {
    let mut mm = MemoryManager::new(SystemAllocator, NoopCollector::ready());
    let mut capacity = 0;
    // SAFETY: the block is only resized through `mm`
    unsafe {
        let block = mm
            .ensure_capacity(None, 0, &mut capacity, 4, 100, "words")
            .unwrap();
        let debt = mm.debt();
        let block = mm.shrink_to(block, &mut capacity, 4, 4).unwrap();
        assert_eq!(capacity, 4);
        assert_eq!(mm.debt(), debt);
        mm.free(block, 16);
    }
}

#[test]
fn test_zero_growth_floor_still_makes_room() {
    let config = MemoryConfig {
        min_array_size: 0,
        ..MemoryConfig::default()
    };
    let mut mm = MemoryManager::with_config(SystemAllocator, NoopCollector::ready(), config);
    let mut capacity = 0;

    // SAFETY: the block is only resized through `mm`
    unsafe {
        let block = mm
            .ensure_capacity(None, 0, &mut capacity, 8, 64, "elements")
            .unwrap();
        assert_eq!(capacity, 1);
        assert!(block.is_some());
        mm.free(block, capacity * 8);
    }
    assert_eq!(mm.debt(), 0);
    assert_eq!(
        MemoryConfig::default().with_min_array_size(0).min_array_size,
        1
    );
}
