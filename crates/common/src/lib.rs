//! camwatch Common Utilities
//!
//! Shared infrastructure for all camwatch crates:
//! - Error types and result aliases
//! - The monitor clock used for debounce timing and artifact naming
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
