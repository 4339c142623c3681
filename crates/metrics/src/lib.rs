//! Metrics definitions for parley.
//!
//! The library crates only emit through the `metrics` facade; installing a
//! recorder (Prometheus, statsd, ...) is left to the host application.
//!
//! # Usage
//!
//! ```rust,ignore
//! use parley_metrics::{accounts, gauge};
//!
//! gauge!(accounts::REGISTERED).increment(1.0);
//! ```

mod definitions;

pub use definitions::*;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge};
