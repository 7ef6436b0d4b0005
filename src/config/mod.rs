use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::errors::{LoaderError, LoaderResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

/// Top-level loader configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

/// Background worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent resolve+decode tasks
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

/// Memory cache sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Capacity is `max_memory / heap_fraction`
    #[serde(default = "default_heap_fraction")]
    pub heap_fraction: u64,
    /// Explicit capacity in KiB, bypassing memory detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_kib: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(with = "duration_serde::duration", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_serde::duration", default = "default_read_timeout")]
    pub read_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Target size resolution when the caller gives no explicit size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Display width; unmeasured targets fall back to a third of it
    #[serde(default = "default_display_width")]
    pub display_width: u32,
    /// Height used when the target has not been measured
    #[serde(default = "default_fallback_height")]
    pub fallback_height: u32,
}

/// Content authority -> directory mapping for `content://` locators
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default)]
    pub roots: BTreeMap<String, PathBuf>,
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

fn default_thread_name() -> String {
    DEFAULT_WORKER_THREAD_NAME.to_string()
}

fn default_heap_fraction() -> u64 {
    DEFAULT_HEAP_FRACTION
}

fn default_connect_timeout() -> Duration {
    Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS)
}

fn default_read_timeout() -> Duration {
    Duration::from_millis(DEFAULT_READ_TIMEOUT_MS)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_display_width() -> u32 {
    DEFAULT_DISPLAY_WIDTH
}

fn default_fallback_height() -> u32 {
    DEFAULT_FALLBACK_HEIGHT
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            thread_name: default_thread_name(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            heap_fraction: default_heap_fraction(),
            capacity_kib: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            display_width: default_display_width(),
            fallback_height: default_fallback_height(),
        }
    }
}

impl LoaderConfig {
    /// Load from the file named by `THUMBNAIL_LOADER_CONFIG`, or the default
    /// file name, layered with environment overrides
    pub fn load() -> LoaderResult<Self> {
        let config_file = std::env::var(format!("{ENV_PREFIX}CONFIG"))
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from_file(config_file)
    }

    /// Defaults, then the TOML file (if it exists), then `THUMBNAIL_LOADER_*`
    /// environment variables. Nested keys use `__`, e.g.
    /// `THUMBNAIL_LOADER_WORKERS__POOL_SIZE=4`.
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> LoaderResult<Self> {
        let path = config_file.as_ref();
        let config: Self = Self::figment(path)
            .extract()
            .map_err(|e| LoaderError::configuration(e.to_string()))?;
        config.validate()?;

        if path.exists() {
            info!("Configuration loaded from: {}", path.display());
        }
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
    }

    /// Parse a TOML document directly, without environment overrides
    pub fn from_toml_str(contents: &str) -> LoaderResult<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(contents))
            .extract()
            .map_err(|e| LoaderError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LoaderResult<()> {
        if self.workers.pool_size == 0 {
            return Err(LoaderError::configuration(
                "workers.pool_size must be at least 1",
            ));
        }
        if self.cache.heap_fraction == 0 {
            return Err(LoaderError::configuration(
                "cache.heap_fraction must be at least 1",
            ));
        }
        if self.cache.capacity_kib == Some(0) {
            return Err(LoaderError::configuration(
                "cache.capacity_kib must be non-zero when set",
            ));
        }
        if self.decode.display_width == 0 || self.decode.fallback_height == 0 {
            return Err(LoaderError::configuration(
                "decode.display_width and decode.fallback_height must be non-zero",
            ));
        }
        Ok(())
    }
}
