// Constants module - default values for configuration

// =============================================================================
// Server defaults
// =============================================================================

/// Default bind address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

// =============================================================================
// Cache defaults
// =============================================================================

/// Default directory for rendered images
pub const DEFAULT_CACHE_DIR: &str = "/tmp/imagestamp";

/// Default time to live of a rendered image (1 hour)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log level when RUST_LOG is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";
