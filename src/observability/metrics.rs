//! Metrics collection using metrics-rs.

use metrics::{Counter, Unit, counter, gauge};
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

// Metric names as constants for consistency
const CAPABILITY_QUERIES: &str = "vpe_capability_queries";
const EXTENSIONS_LOADED: &str = "vpe_extensions_loaded";
const EXTENSION_CREATIONS: &str = "vpe_extension_creations";
const EXTENSION_INIT_FAILURES: &str = "vpe_extension_init_failures";
const FACADE_CACHE_HITS: &str = "vpe_facade_cache_hits";
const FACADE_CACHE_MISSES: &str = "vpe_facade_cache_misses";
const FALLBACK_STEPS: &str = "vpe_fallback_steps";
const VENDOR_LIBRARY_INSTANCES: &str = "vpe_vendor_library_instances";
const INSTANCE_SLOTS_USED: &str = "vpe_instance_slots_used";

/// Initialize metrics descriptions.
///
/// Call this once at startup before using any metrics.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    metrics::describe_counter!(
        CAPABILITY_QUERIES,
        Unit::Count,
        "Capability queries answered by the extension manager"
    );
    metrics::describe_counter!(
        EXTENSIONS_LOADED,
        Unit::Count,
        "Extension descriptors collected while answering queries"
    );
    metrics::describe_counter!(
        EXTENSION_CREATIONS,
        Unit::Count,
        "Algorithm objects created and initialized"
    );
    metrics::describe_counter!(
        EXTENSION_INIT_FAILURES,
        Unit::Count,
        "Algorithm objects that failed creation or initialization"
    );
    metrics::describe_counter!(
        FACADE_CACHE_HITS,
        Unit::Count,
        "Façade calls served by a cached implementation"
    );
    metrics::describe_counter!(
        FACADE_CACHE_MISSES,
        Unit::Count,
        "Façade calls that had to resolve an implementation"
    );
    metrics::describe_counter!(
        FALLBACK_STEPS,
        Unit::Count,
        "Detail enhancer levels skipped while descending the ladder"
    );
    metrics::describe_gauge!(
        VENDOR_LIBRARY_INSTANCES,
        Unit::Count,
        "Active façades holding the vendor library open"
    );
    metrics::describe_gauge!(
        INSTANCE_SLOTS_USED,
        Unit::Count,
        "Occupied slots in the instance table"
    );
}

/// Record a capability query for `family`.
#[inline]
pub fn record_capability_query(family: &'static str) {
    counter!(CAPABILITY_QUERIES, "family" => family).increment(1);
}

/// Record descriptors collected for one query.
#[inline]
pub fn record_extensions_loaded(family: &'static str, count: usize) {
    counter!(EXTENSIONS_LOADED, "family" => family).increment(count as u64);
}

/// Record a successful algorithm creation.
#[inline]
pub fn record_extension_created(extension: &str) {
    counter!(EXTENSION_CREATIONS, "extension" => extension.to_string()).increment(1);
}

/// Record a failed algorithm creation or initialization.
#[inline]
pub fn record_extension_init_failure(extension: &str) {
    counter!(EXTENSION_INIT_FAILURES, "extension" => extension.to_string()).increment(1);
}

/// Record one skipped detail enhancer level.
#[inline]
pub fn record_fallback_step() {
    counter!(FALLBACK_STEPS).increment(1);
}

/// Record the vendor library reference count.
#[inline]
pub fn record_vendor_library_instances(count: usize) {
    gauge!(VENDOR_LIBRARY_INSTANCES).set(count as f64);
}

/// Record the number of occupied instance slots.
#[inline]
pub fn record_instance_slots_used(used: usize) {
    gauge!(INSTANCE_SLOTS_USED).set(used as f64);
}

/// Cache hit/miss counters for one façade family.
///
/// Handles are resolved once at construction so the hot path only
/// increments.
#[derive(Clone)]
pub struct FacadeMetrics {
    family: &'static str,
    hits: Counter,
    misses: Counter,
}

impl FacadeMetrics {
    /// Create counters labelled with `family`.
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            hits: counter!(FACADE_CACHE_HITS, "family" => family),
            misses: counter!(FACADE_CACHE_MISSES, "family" => family),
        }
    }

    /// Record a call served from the cache.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.increment(1);
    }

    /// Record a call that resolved a new implementation.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.increment(1);
    }

    /// The family label.
    pub fn family(&self) -> &'static str {
        self.family
    }
}

impl std::fmt::Debug for FacadeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacadeMetrics")
            .field("family", &self.family)
            .finish()
    }
}
