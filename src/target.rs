//! Render targets: the reusable handles images are delivered into

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::decode::DecodedImage;
use crate::locator::Locator;

static NEXT_TARGET_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a render target, used to key pending requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    /// Allocate a fresh, process-unique id
    pub fn next() -> Self {
        Self(NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target-{}", self.0)
    }
}

/// What a target shows while its image is missing or loading
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Placeholder {
    #[default]
    Blank,
    /// A host-defined placeholder, e.g. a drawable name
    Named(String),
}

impl Placeholder {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self::Named(name.into())
    }
}

/// A reusable display handle owned by the host
///
/// All `show_*` calls happen on the delivery thread. The loader only ever
/// holds targets weakly once work is scheduled.
pub trait RenderTarget: Send + Sync {
    fn id(&self) -> TargetId;

    /// Laid-out size, if the host has measured the target yet
    fn measured_size(&self) -> Option<(u32, u32)> {
        None
    }

    fn show_placeholder(&self, placeholder: &Placeholder);

    fn show_image(&self, locator: &Locator, image: Arc<DecodedImage>);
}

/// Content currently displayed by a [`MemoryTarget`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Displayed {
    Nothing,
    Placeholder(Placeholder),
    Image {
        locator: Locator,
        image: Arc<DecodedImage>,
    },
}

impl Displayed {
    /// Locator of the displayed image, if an image is shown
    pub fn locator(&self) -> Option<&Locator> {
        match self {
            Self::Image { locator, .. } => Some(locator),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&Arc<DecodedImage>> {
        match self {
            Self::Image { image, .. } => Some(image),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

/// Headless render target that records everything it displayed
#[derive(Debug)]
pub struct MemoryTarget {
    id: TargetId,
    measured: Option<(u32, u32)>,
    history: Mutex<Vec<Displayed>>,
}

impl MemoryTarget {
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// A target that reports a measured layout size
    pub fn measured(width: u32, height: u32) -> Arc<Self> {
        Self::build(Some((width, height)))
    }

    fn build(measured: Option<(u32, u32)>) -> Arc<Self> {
        Arc::new(Self {
            id: TargetId::next(),
            measured,
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn current(&self) -> Displayed {
        self.lock().last().cloned().unwrap_or(Displayed::Nothing)
    }

    /// Everything shown so far, oldest first
    pub fn history(&self) -> Vec<Displayed> {
        self.lock().clone()
    }

    /// Whether an image for `locator` was ever displayed
    pub fn ever_showed(&self, locator: &str) -> bool {
        self.lock()
            .iter()
            .any(|d| d.locator().is_some_and(|l| l.as_str() == locator))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Displayed>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderTarget for MemoryTarget {
    fn id(&self) -> TargetId {
        self.id
    }

    fn measured_size(&self) -> Option<(u32, u32)> {
        self.measured
    }

    fn show_placeholder(&self, placeholder: &Placeholder) {
        self.lock().push(Displayed::Placeholder(placeholder.clone()));
    }

    fn show_image(&self, locator: &Locator, image: Arc<DecodedImage>) {
        self.lock().push(Displayed::Image {
            locator: locator.clone(),
            image,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = MemoryTarget::new();
        let b = MemoryTarget::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_memory_target_records_history() {
        let target = MemoryTarget::measured(120, 80);
        assert_eq!(target.current(), Displayed::Nothing);
        assert_eq!(target.measured_size(), Some((120, 80)));

        target.show_placeholder(&Placeholder::named("loading"));
        assert!(target.current().is_placeholder());

        let image = Arc::new(DecodedImage::from_rgba(vec![0; 16], 2, 2));
        target.show_image(&Locator::from("http://a/b.png"), Arc::clone(&image));

        assert_eq!(target.current().image(), Some(&image));
        assert!(target.ever_showed("http://a/b.png"));
        assert!(!target.ever_showed("http://a/c.png"));
        assert_eq!(target.history().len(), 2);
    }
}
