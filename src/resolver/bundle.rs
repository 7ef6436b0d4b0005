//! Application-bundled images addressed by `resource://` locators

use bytes::Bytes;
use std::collections::HashMap;
use tracing::debug;

use crate::assets::BundledImages;
use crate::locator::resource_name;

/// Lookup of bundled images by normalized resource name
pub trait ResourceBundle: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Bytes>;
}

/// Bundle backed by the images compiled into the binary
///
/// Embedded paths are indexed by the same normalization applied to
/// locators, so `resource://app/drawable/App-Logo.png` finds `app_logo.png`.
#[derive(Debug, Clone)]
pub struct EmbeddedBundle {
    index: HashMap<String, String>,
}

impl EmbeddedBundle {
    pub fn new() -> Self {
        let index: HashMap<String, String> = BundledImages::list_images()
            .map(|path| (resource_name(&path), path.into_owned()))
            .collect();
        debug!("Indexed {} bundled images", index.len());
        Self { index }
    }

    /// Resource names available in the bundle
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }
}

impl Default for EmbeddedBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBundle for EmbeddedBundle {
    fn lookup(&self, name: &str) -> Option<Bytes> {
        let path = self.index.get(name)?;
        BundledImages::get_image(path).map(|file| Bytes::from(file.data.into_owned()))
    }
}

/// In-memory bundle, for hosts that ship their images outside the binary
#[derive(Debug, Clone, Default)]
pub struct StaticBundle {
    images: HashMap<String, Bytes>,
}

impl StaticBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image under a name; the name is normalized like a locator
    pub fn with_image<N: AsRef<str>, B: Into<Bytes>>(mut self, name: N, bytes: B) -> Self {
        self.images.insert(resource_name(name.as_ref()), bytes.into());
        self
    }
}

impl ResourceBundle for StaticBundle {
    fn lookup(&self, name: &str) -> Option<Bytes> {
        self.images.get(name).cloned()
    }
}
