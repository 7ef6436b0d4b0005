//! Concurrent image loading cache
//!
//! Fetches, decodes, downsamples and caches images off the caller's thread
//! and delivers them to reusable render targets, never letting a target that
//! was reassigned mid-flight show a stale image.
//!
//! ```no_run
//! use std::time::Duration;
//! use thumbnail_loader::{ImageLoader, LoaderConfig, MemoryTarget, Placeholder};
//!
//! let (loader, delivery) = ImageLoader::start(LoaderConfig::default())?;
//! let target = MemoryTarget::new();
//! loader.load_into(
//!     &target,
//!     Some("https://example.com/cover.png"),
//!     &Placeholder::Blank,
//!     None,
//!     None,
//! );
//! delivery.run_next(Duration::from_secs(5));
//! # Ok::<(), thumbnail_loader::LoaderError>(())
//! ```

pub mod assets;
pub mod cache;
pub mod config;
pub mod decode;
pub mod delivery;
pub mod errors;
pub mod loader;
pub mod locator;
pub mod resolver;
pub mod stats;
pub mod target;
pub mod utils;
pub mod worker_pool;

pub use cache::{CacheStats, MemoryCache};
pub use config::LoaderConfig;
pub use decode::{DecodedImage, TargetSize};
pub use delivery::{DeliveryLoop, DeliveryOutcome};
pub use errors::{LoaderError, LoaderResult};
pub use loader::{ImageLoader, ImageLoaderBuilder, LoadOutcome};
pub use locator::{Locator, Scheme};
pub use resolver::{ContentResolver, ResourceBundle, StaticBundle};
pub use stats::LoaderStats;
pub use target::{Displayed, MemoryTarget, Placeholder, RenderTarget, TargetId};
