//! Centralized error handling for the thumbnail loader
//!
//! # Error Categories
//!
//! - **ResourceUnavailable**: the content/file provider could not open a stream
//! - **ResourceNotFound**: a bundled resource name has no match
//! - **Network**: connection failures, timeouts and HTTP status errors
//! - **Decode**: malformed or unsupported image bytes
//!
//! # Usage
//!
//! ```rust
//! use thumbnail_loader::errors::{LoaderError, LoaderResult};
//!
//! fn example_function() -> LoaderResult<u32> {
//!     Err(LoaderError::configuration("pool size must be non-zero"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using LoaderError
pub type LoaderResult<T> = Result<T, LoaderError>;
