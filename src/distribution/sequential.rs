//! Sequential value generation
//!
//! Generates `start, start+stride, start+2*stride, ...`. Interleaving writers
//! by giving each a distinct start and a stride equal to the writer count
//! keeps their streams disjoint.

use crate::distribution::ValueSource;

/// Strided counter
#[derive(Debug, Clone)]
pub struct SequentialValues {
    start: u64,
    stride: u64,
    /// Next value to hand out
    current: u64,
}

impl SequentialValues {
    /// Create a stream; a zero stride is treated as 1
    pub fn new(start: u64, stride: u64) -> Self {
        Self {
            start,
            stride: stride.max(1),
            current: start,
        }
    }

    /// Stream for writer `index` of `num_writers`
    pub fn for_writer(index: usize, num_writers: usize) -> Self {
        Self::new(index as u64, num_writers as u64)
    }
}

impl Default for SequentialValues {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl ValueSource for SequentialValues {
    #[inline(always)]
    fn next_value(&mut self) -> u64 {
        let value = self.current;
        self.current = self.current.wrapping_add(self.stride);
        value
    }

    fn rewind(&mut self) {
        self.current = self.start;
    }
}
