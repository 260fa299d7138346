//! Input value streams
//!
//! Writers insert synthetic `u64` values into the structure under test. The
//! stream decides how many distinct values a trial produces, which is what a
//! cardinality estimator is sensitive to.
//!
//! # Streams
//!
//! - **Sequential**: writer `i` of `W` yields `i, i+W, i+2W, ...`. Streams are
//!   disjoint, so every insert of a trial is a distinct value.
//! - **Uniform**: xoshiro256++ random values, one independent stream per writer.
//!
//! # Example
//!
//! ```
//! use sketchpulse::distribution::{ValueMode, ValueSource};
//!
//! let mut values = ValueMode::Sequential.for_writer(1, 4, 0);
//! assert_eq!(values.next_value(), 1);
//! assert_eq!(values.next_value(), 5);
//! values.rewind();
//! assert_eq!(values.next_value(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source of input values for one writer
///
/// Each writer thread owns its own source, so implementations need no
/// synchronization.
pub trait ValueSource: Send {
    /// Produce the next value of the stream
    fn next_value(&mut self) -> u64;

    /// Restart the stream from its first value
    fn rewind(&mut self);
}

/// Which value stream writers draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueMode {
    #[default]
    Sequential,
    Uniform,
}

impl ValueMode {
    /// Build the stream for writer `index` of `num_writers`
    ///
    /// `seed` only affects the uniform stream.
    pub fn for_writer(self, index: usize, num_writers: usize, seed: u64) -> Box<dyn ValueSource> {
        match self {
            ValueMode::Sequential => Box::new(sequential::SequentialValues::for_writer(
                index,
                num_writers,
            )),
            ValueMode::Uniform => Box::new(uniform::UniformValues::for_writer(seed, index)),
        }
    }
}

impl fmt::Display for ValueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueMode::Sequential => write!(f, "sequential"),
            ValueMode::Uniform => write!(f, "uniform"),
        }
    }
}

impl FromStr for ValueMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "seq" => Ok(ValueMode::Sequential),
            "uniform" | "random" => Ok(ValueMode::Uniform),
            _ => anyhow::bail!("unknown value mode '{}' (expected sequential or uniform)", s),
        }
    }
}

pub mod sequential;
pub mod uniform;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_mode_parse() {
        assert_eq!("sequential".parse::<ValueMode>().unwrap(), ValueMode::Sequential);
        assert_eq!("Uniform".parse::<ValueMode>().unwrap(), ValueMode::Uniform);
        assert_eq!("random".parse::<ValueMode>().unwrap(), ValueMode::Uniform);
        assert!("zipf".parse::<ValueMode>().is_err());
    }

    #[test]
    fn test_value_mode_display_round_trips() {
        for mode in [ValueMode::Sequential, ValueMode::Uniform] {
            assert_eq!(mode.to_string().parse::<ValueMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_sequential_writers_are_disjoint() {
        let writers = 3;
        let mut seen = std::collections::HashSet::new();
        for index in 0..writers {
            let mut values = ValueMode::Sequential.for_writer(index, writers, 0);
            for _ in 0..100 {
                assert!(seen.insert(values.next_value()));
            }
        }
        assert_eq!(seen.len(), 300);
    }
}
