//! Runtime configuration for the extension manager and façades.

use crate::facade::CachePolicy;
use crate::observability::TracingConfig;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Default vendor extension library name, resolved by the dynamic loader's
/// search path.
pub const DEFAULT_VENDOR_LIBRARY: &str = "libvideoprocessingengine_ext.so";

/// Environment variable overriding the vendor library path.
pub const ENV_VENDOR_LIBRARY: &str = "VPE_EXTENSION_LIBRARY";
/// Environment variable disabling dynamic extensions when set to `1`/`true`.
pub const ENV_DISABLE_DYNAMIC: &str = "VPE_DISABLE_DYNAMIC_EXTENSIONS";
/// Environment variable bounding façade caches to an LRU of the given size.
pub const ENV_CACHE_CAPACITY: &str = "VPE_FACADE_CACHE_CAPACITY";

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct VpeConfig {
    /// Vendor library to load on the first active façade. `None` disables
    /// the vendor source entirely.
    pub vendor_library: Option<PathBuf>,
    /// Whether dynamic extension sources are consulted at all.
    pub dynamic_loading: bool,
    /// Eviction policy of per-façade implementation caches.
    pub cache_policy: CachePolicy,
    /// Consecutive creation failures the contrast enhancer tolerates. One
    /// more disables creation for the lifetime of the façade.
    pub contrast_failure_threshold: u32,
    /// Span settings for façade calls and capability queries.
    pub tracing: TracingConfig,
}

impl Default for VpeConfig {
    fn default() -> Self {
        Self {
            vendor_library: Some(PathBuf::from(DEFAULT_VENDOR_LIBRARY)),
            dynamic_loading: true,
            cache_policy: CachePolicy::Unbounded,
            contrast_failure_threshold: 3,
            tracing: TracingConfig::default(),
        }
    }
}

impl VpeConfig {
    /// Configuration with only statically registered extensions.
    pub fn static_only() -> Self {
        Self {
            vendor_library: None,
            dynamic_loading: false,
            ..Self::default()
        }
    }

    /// Build a configuration from defaults overridden by the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_VENDOR_LIBRARY).filter(|p| !p.is_empty()) {
            config.vendor_library = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup(ENV_DISABLE_DYNAMIC) {
            if matches!(value.trim(), "1" | "true" | "yes") {
                config.dynamic_loading = false;
            }
        }

        if let Some(value) = lookup(ENV_CACHE_CAPACITY) {
            match value.trim().parse::<usize>().ok().and_then(NonZeroUsize::new) {
                Some(capacity) => config.cache_policy = CachePolicy::Lru(capacity),
                None => tracing::warn!(
                    "ignoring {}={:?}: expected a positive integer",
                    ENV_CACHE_CAPACITY,
                    value
                ),
            }
        }

        config
    }

    /// Set the vendor library path.
    pub fn with_vendor_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.vendor_library = Some(path.into());
        self
    }

    /// Enable or disable dynamic extension loading.
    pub fn with_dynamic_loading(mut self, enabled: bool) -> Self {
        self.dynamic_loading = enabled;
        self
    }

    /// Set the façade cache policy.
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    /// Set the span settings.
    pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = tracing;
        self
    }

    /// Set the contrast enhancer failure threshold.
    pub fn with_contrast_failure_threshold(mut self, threshold: u32) -> Self {
        self.contrast_failure_threshold = threshold;
        self
    }
}
