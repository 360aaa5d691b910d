//! IR model, name interning, errors and configuration shared by the golower backends.

#[macro_use]
pub mod macros;

pub mod config;
pub mod error;
pub mod ir;

// Re-export commonly used items for convenience
pub use tracing;

// Alias for error types
pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
