//! Uniform random values
//!
//! Uses the xoshiro256++ PRNG, which is fast enough that value generation
//! does not dominate a sketch insert. Writers share one seed; writer `i`
//! advances its generator by `i` jumps (2^128 steps each), so streams never
//! overlap.
//!
//! # Example
//!
//! ```
//! use sketchpulse::distribution::{ValueSource, uniform::UniformValues};
//!
//! let mut a = UniformValues::for_writer(42, 0);
//! let mut b = UniformValues::for_writer(42, 0);
//! assert_eq!(a.next_value(), b.next_value());
//! ```

use super::ValueSource;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Uniformly distributed `u64` values
///
/// `rewind` recreates the generator from its seed and jump count.
pub struct UniformValues {
    seed: u64,
    jumps: usize,
    rng: Xoshiro256PlusPlus,
}

impl UniformValues {
    /// Create a stream from `seed` alone
    pub fn with_seed(seed: u64) -> Self {
        Self::for_writer(seed, 0)
    }

    /// Stream for writer `index`, independent from every other writer
    pub fn for_writer(seed: u64, index: usize) -> Self {
        Self {
            seed,
            jumps: index,
            rng: Self::generator(seed, index),
        }
    }

    fn generator(seed: u64, jumps: usize) -> Xoshiro256PlusPlus {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        for _ in 0..jumps {
            rng.jump();
        }
        rng
    }
}

impl ValueSource for UniformValues {
    #[inline(always)]
    fn next_value(&mut self) -> u64 {
        self.rng.gen()
    }

    fn rewind(&mut self) {
        self.rng = Self::generator(self.seed, self.jumps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_seeded() {
        let mut a = UniformValues::with_seed(12345);
        let mut b = UniformValues::with_seed(12345);

        for _ in 0..10 {
            assert_eq!(a.next_value(), b.next_value());
        }
    }

    #[test]
    fn test_uniform_rewind_replays_stream() {
        let mut values = UniformValues::for_writer(7, 3);
        let first: Vec<u64> = (0..20).map(|_| values.next_value()).collect();
        values.rewind();
        let second: Vec<u64> = (0..20).map(|_| values.next_value()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_uniform_writers_differ() {
        let mut w0 = UniformValues::for_writer(99, 0);
        let mut w1 = UniformValues::for_writer(99, 1);
        let a: Vec<u64> = (0..10).map(|_| w0.next_value()).collect();
        let b: Vec<u64> = (0..10).map(|_| w1.next_value()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_uniform_coverage() {
        let mut values = UniformValues::with_seed(42);
        let mut buckets = vec![0u32; 10];

        for _ in 0..10000 {
            let bucket = (values.next_value() % 10) as usize;
            buckets[bucket] += 1;
        }

        // Each bucket should hold roughly 1000 samples; allow 20% deviation
        for count in buckets {
            assert!(count > 800 && count < 1200, "Bucket count {} outside expected range", count);
        }
    }
}
