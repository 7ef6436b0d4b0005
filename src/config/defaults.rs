/// Configuration default values
///
/// All loader defaults live here so they can be changed in one place.
// Worker pool defaults
pub const DEFAULT_POOL_SIZE: usize = 3;
pub const DEFAULT_WORKER_THREAD_NAME: &str = "thumbnail-worker";

// Cache defaults
/// Cache capacity is 1/N of the runtime's maximum memory
pub const DEFAULT_HEAP_FRACTION: u64 = 8;

// Network defaults
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_USER_AGENT: &str = concat!("thumbnail-loader/", env!("CARGO_PKG_VERSION"));

// Decode defaults
pub const DEFAULT_DISPLAY_WIDTH: u32 = 1080;
pub const DEFAULT_FALLBACK_HEIGHT: u32 = 200;

// Environment
pub const ENV_PREFIX: &str = "THUMBNAIL_LOADER_";
pub const DEFAULT_CONFIG_FILE: &str = "thumbnail-loader.toml";
