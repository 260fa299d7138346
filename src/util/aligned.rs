//! Cache-line aligned atomics
//!
//! Worker control fields are written by one thread and polled by another in a
//! tight loop. Keeping each on its own cache line stops a writer's stores to
//! `completed` from invalidating the line its coordinator polls for `quota`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Cache-line aligned `u64` cell
///
/// # Memory Layout
///
/// ```text
/// [value: 8 bytes][padding: 56 bytes] = 64 bytes total
/// ```
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct AlignedU64 {
    value: AtomicU64,
}

impl AlignedU64 {
    /// Create a new cell with the given initial value
    pub const fn new(val: u64) -> Self {
        Self {
            value: AtomicU64::new(val),
        }
    }

    /// Load with acquire ordering
    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Store with release ordering
    #[inline]
    pub fn set(&self, val: u64) {
        self.value.store(val, Ordering::Release);
    }

    /// Replace `current` with `new` if the cell still holds `current`
    ///
    /// Returns true if the exchange happened.
    #[inline]
    pub fn claim(&self, current: u64, new: u64) -> bool {
        self.value
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Cache-line aligned flag
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct AlignedFlag {
    value: AtomicBool,
}

impl AlignedFlag {
    pub const fn new(val: bool) -> Self {
        Self {
            value: AtomicBool::new(val),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self) {
        self.value.store(true, Ordering::Release);
    }
}
