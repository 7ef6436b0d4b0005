//! Error type definitions for the thumbnail loader
//!
//! Every failure a background load can hit maps onto one of four categories
//! (unavailable, not found, network, decode). All of them are handled the
//! same way by the loader: logged, swallowed, and the render target keeps
//! showing its placeholder. The remaining variants only surface while the
//! service is being constructed.

use thiserror::Error;

/// Top-level loader error type
#[derive(Error, Debug)]
pub enum LoaderError {
    /// The content/file provider could not open a stream for the locator
    #[error("Resource unavailable: {locator}: {source}")]
    ResourceUnavailable {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    /// No bundled resource matches the derived resource name
    #[error("Resource not found: '{name}' (from {locator})")]
    ResourceNotFound { locator: String, name: String },

    /// Connection failure, timeout or non-success HTTP status
    #[error("Network error: {url} - {message}")]
    Network { url: String, message: String },

    /// Malformed or unsupported image bytes
    #[error("Decode error: {locator} - {message}")]
    Decode { locator: String, message: String },

    /// Invalid configuration detected at initialization
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Worker runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl LoaderError {
    /// Create a resource unavailable error
    pub fn unavailable<S: Into<String>>(locator: S, source: std::io::Error) -> Self {
        Self::ResourceUnavailable {
            locator: locator.into(),
            source,
        }
    }

    /// Create a resource not found error
    pub fn not_found<L: Into<String>, N: Into<String>>(locator: L, name: N) -> Self {
        Self::ResourceNotFound {
            locator: locator.into(),
            name: name.into(),
        }
    }

    /// Create a network error
    pub fn network<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode<L: Into<String>, M: Into<String>>(locator: L, message: M) -> Self {
        Self::Decode {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Short category label used in log fields
    pub fn category(&self) -> &'static str {
        match self {
            Self::ResourceUnavailable { .. } => "resource_unavailable",
            Self::ResourceNotFound { .. } => "resource_not_found",
            Self::Network { .. } => "network",
            Self::Decode { .. } => "decode",
            Self::Configuration { .. } => "configuration",
            Self::Runtime(_) => "runtime",
        }
    }

    /// Whether this error belongs to the load-failure taxonomy that degrades
    /// to a placeholder
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::ResourceUnavailable { .. }
                | Self::ResourceNotFound { .. }
                | Self::Network { .. }
                | Self::Decode { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
