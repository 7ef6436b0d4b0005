//! Resource resolution: turn a locator into raw image bytes
//!
//! Dispatch happens on [`Scheme`]: content/file locators go through a
//! [`ContentResolver`], `resource://` locators through a [`ResourceBundle`],
//! and `http(s)://` through the [`HttpFetcher`]. Unknown schemes resolve to
//! no data at all, which the loader treats as "keep the placeholder".

pub mod bundle;
pub mod content;
pub mod http;

use bytes::Bytes;
use std::sync::Arc;
use tracing::trace;

pub use bundle::{EmbeddedBundle, ResourceBundle, StaticBundle};
pub use content::{ContentResolver, FsContentResolver};
pub use http::HttpFetcher;

use crate::errors::{LoaderError, LoaderResult};
use crate::locator::{Locator, Scheme};

/// Scheme-dispatching resolver shared by every load task
#[derive(Clone)]
pub struct ResourceResolver {
    content: Arc<dyn ContentResolver>,
    bundle: Arc<dyn ResourceBundle>,
    http: HttpFetcher,
}

impl ResourceResolver {
    pub fn new(
        content: Arc<dyn ContentResolver>,
        bundle: Arc<dyn ResourceBundle>,
        http: HttpFetcher,
    ) -> Self {
        Self {
            content,
            bundle,
            http,
        }
    }

    /// Resolve a locator into its full byte content.
    ///
    /// Returns `Ok(None)` for locators with an unrecognized scheme.
    pub async fn resolve(&self, locator: &Locator) -> LoaderResult<Option<Bytes>> {
        let scheme = locator.scheme();
        trace!("Resolving {} via {}", locator, scheme);

        match scheme {
            Scheme::ContentOrFile => self
                .content
                .open(locator)
                .await
                .map(Some)
                .map_err(|e| LoaderError::unavailable(locator.as_str(), e)),
            Scheme::EmbeddedResource => {
                let name = locator.resource_name();
                self.bundle
                    .lookup(&name)
                    .map(Some)
                    .ok_or_else(|| LoaderError::not_found(locator.as_str(), name))
            }
            Scheme::Network => self.http.fetch(locator.as_str()).await.map(Some),
            Scheme::Unknown => Ok(None),
        }
    }
}
