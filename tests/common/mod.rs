#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::{self, Cursor};
use std::time::{Duration, Instant};

use thumbnail_loader::config::CacheConfig;
use thumbnail_loader::locator::Locator;
use thumbnail_loader::{ContentResolver, DeliveryLoop, ImageLoader, LoaderConfig};

/// Encode a solid-colour PNG in memory
pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("Failed to encode test PNG");
    out
}

/// Config with a fixed, small cache so tests do not depend on host memory
pub fn test_config() -> LoaderConfig {
    LoaderConfig {
        cache: CacheConfig {
            capacity_kib: Some(8 * 1024),
            ..CacheConfig::default()
        },
        ..LoaderConfig::default()
    }
}

/// Content resolver serving canned bytes after a per-locator delay
#[derive(Default)]
pub struct DelayedContent {
    entries: HashMap<String, (Duration, Bytes)>,
}

impl DelayedContent {
    pub fn with(mut self, locator: &str, delay: Duration, bytes: Vec<u8>) -> Self {
        self.entries
            .insert(locator.to_string(), (delay, Bytes::from(bytes)));
        self
    }
}

#[async_trait]
impl ContentResolver for DelayedContent {
    async fn open(&self, locator: &Locator) -> io::Result<Bytes> {
        let (delay, bytes) = self
            .entries
            .get(locator.as_str())
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, locator.to_string()))?;
        tokio::time::sleep(delay).await;
        Ok(bytes)
    }
}

/// Pump the delivery loop until every scheduled load has finished and its
/// result has been processed
pub fn drain(loader: &ImageLoader, delivery: &DeliveryLoop) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while loader.stats().outstanding() > 0 {
        assert!(Instant::now() < deadline, "loads did not finish in time");
        delivery.run_next(Duration::from_millis(20));
    }
    delivery.run_pending();
}
