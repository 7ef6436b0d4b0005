//! Content and file access
//!
//! `content://authority/path` locators resolve against a configured root
//! directory per authority; `file://` URLs and bare absolute paths read the
//! filesystem directly.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use tracing::trace;

use crate::locator::Locator;
use crate::utils::url::UrlUtils;

/// Platform content-access layer. Implementations open the stream behind a
/// `content://`/`file://` locator and read it to the end.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn open(&self, locator: &Locator) -> io::Result<Bytes>;
}

/// Filesystem-backed content resolver
#[derive(Debug, Clone, Default)]
pub struct FsContentResolver {
    roots: BTreeMap<String, PathBuf>,
}

impl FsContentResolver {
    pub fn new(roots: BTreeMap<String, PathBuf>) -> Self {
        Self { roots }
    }

    /// Map a locator onto a filesystem path
    pub fn path_for(&self, locator: &Locator) -> io::Result<PathBuf> {
        let raw = locator.as_str();

        if raw.starts_with('/') {
            return Ok(PathBuf::from(raw));
        }

        if raw
            .get(..7)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("file://"))
        {
            return UrlUtils::file_url_to_path(raw).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("invalid file URL: {raw}"))
            });
        }

        let (authority, relative) = UrlUtils::split_content_uri(raw).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("invalid content URI: {raw}"))
        })?;

        if !UrlUtils::is_contained(&relative) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("content path escapes its root: {raw}"),
            ));
        }

        let root = self.roots.get(&authority).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no content provider for authority '{authority}'"),
            )
        })?;

        Ok(root.join(relative))
    }
}

#[async_trait]
impl ContentResolver for FsContentResolver {
    async fn open(&self, locator: &Locator) -> io::Result<Bytes> {
        let path = self.path_for(locator)?;
        trace!("Reading {} from {}", locator, path.display());
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }
}
