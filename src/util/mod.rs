//! Shared utilities

pub mod rate_limit;
pub mod signal;
pub mod time;
