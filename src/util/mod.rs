//! Utility modules

pub mod aligned;
pub mod time;
