//! The image loader service
//!
//! [`ImageLoader`] ties the pieces together: a synchronous, non-blocking
//! `load_into` entry point for the delivery thread, a shared memory cache, a
//! fixed worker pool running resolve + decode, and a [`DeliveryLoop`] that
//! hands finished images back to the delivery thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, MemoryCache};
use crate::config::{DecodeConfig, LoaderConfig};
use crate::decode::{DecodedImage, TargetSize, decode_subsampled};
use crate::delivery::{Delivery, DeliveryLoop, DeliverySender, PendingRequests};
use crate::errors::{LoaderError, LoaderResult};
use crate::locator::{Locator, Scheme};
use crate::resolver::{
    ContentResolver, EmbeddedBundle, FsContentResolver, HttpFetcher, ResourceBundle,
    ResourceResolver,
};
use crate::stats::{LoadCounters, LoaderStats};
use crate::target::{Placeholder, RenderTarget, TargetId};
use crate::utils::human_format::format_kib;
use crate::utils::url::UrlUtils;
use crate::worker_pool::WorkerPool;

/// Which path a `load_into` call took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No locator: placeholder shown, nothing scheduled
    NoLocator,
    /// Cached image applied synchronously
    AppliedFromCache,
    /// Cache miss while paused: placeholder shown, nothing scheduled
    Paused,
    /// Cache miss: placeholder shown, background load scheduled
    Scheduled,
}

/// Builder for [`ImageLoader`]
pub struct ImageLoaderBuilder {
    config: LoaderConfig,
    content: Option<Arc<dyn ContentResolver>>,
    bundle: Option<Arc<dyn ResourceBundle>>,
    cache: Option<Arc<MemoryCache>>,
}

impl ImageLoaderBuilder {
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the filesystem content resolver
    pub fn content_resolver<R: ContentResolver + 'static>(mut self, resolver: R) -> Self {
        self.content = Some(Arc::new(resolver));
        self
    }

    /// Replace the embedded resource bundle
    pub fn resource_bundle<B: ResourceBundle + 'static>(mut self, bundle: B) -> Self {
        self.bundle = Some(Arc::new(bundle));
        self
    }

    /// Use an existing cache instead of sizing one from configuration
    pub fn cache(mut self, cache: Arc<MemoryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Validate configuration, size the cache and start the worker pool
    pub fn build(self) -> LoaderResult<(ImageLoader, DeliveryLoop)> {
        self.config.validate()?;

        let content = match self.content {
            Some(content) => content,
            None => Arc::new(FsContentResolver::new(self.config.content.roots.clone())),
        };
        let bundle = match self.bundle {
            Some(bundle) => bundle,
            None => Arc::new(EmbeddedBundle::new()),
        };
        let http = HttpFetcher::new(&self.config.network)?;
        let cache = match self.cache {
            Some(cache) => cache,
            None => Arc::new(MemoryCache::from_config(&self.config.cache)),
        };
        let pool = WorkerPool::new(&self.config.workers)?;

        let (tx, rx) = mpsc::channel();
        let pending = Arc::new(PendingRequests::new());
        let counters = Arc::new(LoadCounters::default());
        let delivery_loop = DeliveryLoop::new(rx, Arc::clone(&pending), Arc::clone(&counters));

        info!(
            "Image loader ready ({} workers, cache {})",
            pool.pool_size(),
            format_kib(cache.capacity_kib())
        );

        let loader = ImageLoader {
            inner: Arc::new(LoaderInner {
                decode: self.config.decode.clone(),
                cache,
                resolver: ResourceResolver::new(content, bundle, http),
                pool,
                pending,
                paused: AtomicBool::new(false),
                counters,
                deliveries: tx,
            }),
        };
        Ok((loader, delivery_loop))
    }
}

struct LoaderInner {
    decode: DecodeConfig,
    cache: Arc<MemoryCache>,
    resolver: ResourceResolver,
    pool: WorkerPool,
    pending: Arc<PendingRequests>,
    paused: AtomicBool,
    counters: Arc<LoadCounters>,
    deliveries: DeliverySender,
}

/// Concurrent image loading cache
///
/// Cheap to clone; all clones share one cache, pool and pending map.
/// `load_into` must be called from the same thread that pumps the
/// [`DeliveryLoop`].
#[derive(Clone)]
pub struct ImageLoader {
    inner: Arc<LoaderInner>,
}

impl ImageLoader {
    pub fn builder() -> ImageLoaderBuilder {
        ImageLoaderBuilder {
            config: LoaderConfig::default(),
            content: None,
            bundle: None,
            cache: None,
        }
    }

    /// Start a loader with default collaborators
    pub fn start(config: LoaderConfig) -> LoaderResult<(Self, DeliveryLoop)> {
        Self::builder().config(config).build()
    }

    /// Request `locator` for `target`.
    ///
    /// Never blocks. A cache hit is applied before returning; a miss shows
    /// `placeholder` and schedules a background load whose result is applied
    /// later by the [`DeliveryLoop`], but only if this is still the target's
    /// latest request by then.
    ///
    /// An absent or blank `locator` shows `placeholder` and schedules
    /// nothing. It records no new request, but it does clear the target's
    /// previous one, so a load still in flight for the old locator is
    /// discarded instead of replacing the placeholder.
    pub fn load_into<T>(
        &self,
        target: &Arc<T>,
        locator: Option<&str>,
        placeholder: &Placeholder,
        width: Option<u32>,
        height: Option<u32>,
    ) -> LoadOutcome
    where
        T: RenderTarget + 'static,
    {
        let inner = &self.inner;
        let target_id = target.id();

        let Some(locator) = Locator::parse(locator) else {
            // Earlier requests for this target are no longer wanted
            inner.pending.detach(target_id);
            target.show_placeholder(placeholder);
            return LoadOutcome::NoLocator;
        };

        inner.counters.record_request();
        inner.pending.set(target_id, locator.clone());

        if let Some(image) = inner.cache.get(locator.as_str()) {
            debug!("Cache hit for {} on {}", display_locator(&locator), target_id);
            inner.counters.record_cache_hit();
            target.show_image(&locator, image);
            return LoadOutcome::AppliedFromCache;
        }

        inner.counters.record_cache_miss();
        target.show_placeholder(placeholder);

        if self.is_paused() {
            debug!("Paused, not scheduling {}", display_locator(&locator));
            inner.counters.record_paused_skip();
            return LoadOutcome::Paused;
        }

        let size = TargetSize::resolve(width, height, target.measured_size(), &inner.decode);
        let job = LoadJob {
            target: Arc::downgrade(target) as Weak<dyn RenderTarget>,
            target_id,
            locator,
            size,
            resolver: inner.resolver.clone(),
            cache: Arc::clone(&inner.cache),
            counters: Arc::clone(&inner.counters),
            deliveries: inner.deliveries.clone(),
        };

        debug!(
            "Scheduling {} at {}x{} for {}",
            display_locator(&job.locator),
            size.width,
            size.height,
            target_id
        );
        inner.counters.record_scheduled();
        inner.pool.submit(job.run());
        LoadOutcome::Scheduled
    }

    /// Suppress (or resume) scheduling of new background loads. Loads
    /// already running finish and deliver normally.
    pub fn set_paused(&self, paused: bool) {
        let previous = self.inner.paused.swap(paused, Ordering::SeqCst);
        if previous != paused {
            info!("Image loading {}", if paused { "paused" } else { "resumed" });
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    /// Forget a target's pending request so in-flight results for it are
    /// discarded
    pub fn detach(&self, target: TargetId) -> Option<Locator> {
        self.inner.pending.detach(target)
    }

    /// Latest requested locator for a target
    pub fn pending_for(&self, target: TargetId) -> Option<Locator> {
        self.inner.pending.current(target)
    }

    pub fn cache(&self) -> &Arc<MemoryCache> {
        &self.inner.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    pub fn stats(&self) -> LoaderStats {
        self.inner.counters.snapshot()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.inner.pool
    }
}

/// One background load: resolve, decode, cache, then hand off for delivery
///
/// Holds only what it needs, never the pool that runs it.
struct LoadJob {
    target: Weak<dyn RenderTarget>,
    target_id: TargetId,
    locator: Locator,
    size: TargetSize,
    resolver: ResourceResolver,
    cache: Arc<MemoryCache>,
    counters: Arc<LoadCounters>,
    deliveries: DeliverySender,
}

impl LoadJob {
    async fn run(self) {
        let label = display_locator(&self.locator);

        match self.fetch_and_decode(&label).await {
            Ok(Some(image)) => {
                let image = Arc::new(image);
                self.cache.put(self.locator.clone(), Arc::clone(&image));

                let delivery = Delivery {
                    target: self.target,
                    target_id: self.target_id,
                    locator: self.locator,
                    image,
                };
                if self.deliveries.send(delivery).is_err() {
                    debug!("Delivery loop gone, dropping result for {}", label);
                }
                // Counted after the send so `outstanding()` never reaches
                // zero while a result is still on its way
                self.counters.record_decoded();
            }
            Ok(None) => {
                debug!("No source for {}, keeping placeholder", label);
                self.counters.record_failed();
            }
            Err(e) => {
                log_load_failure(&label, &e);
                self.counters.record_failed();
            }
        }
    }

    async fn fetch_and_decode(&self, label: &str) -> LoaderResult<Option<DecodedImage>> {
        let Some(bytes) = self.resolver.resolve(&self.locator).await? else {
            return Ok(None);
        };

        let size = self.size;
        let decode_label = label.to_string();
        let image = tokio::task::spawn_blocking(move || {
            decode_subsampled(&bytes, size, &decode_label)
        })
        .await
        .map_err(|e| LoaderError::decode(label, format!("decode task failed: {e}")))??;

        Ok(Some(image))
    }
}

/// Load failures degrade to the placeholder; they are only ever logged
fn log_load_failure(label: &str, error: &LoaderError) {
    warn!(category = error.category(), "Failed to load image {}: {}", label, error);
}

/// Locator text safe for logs
fn display_locator(locator: &Locator) -> String {
    match locator.scheme() {
        Scheme::Network => UrlUtils::obfuscate_credentials(locator.as_str()),
        _ => locator.to_string(),
    }
}
