//! Observability features: metrics and tracing.
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `vpe_capability_queries` | Counter | Capability queries, by family |
//! | `vpe_extensions_loaded` | Counter | Descriptors collected per query |
//! | `vpe_extension_creations` | Counter | Algorithm objects created and initialized |
//! | `vpe_extension_init_failures` | Counter | Failed creations or initializations |
//! | `vpe_facade_cache_hits` | Counter | Façade calls served from cache |
//! | `vpe_facade_cache_misses` | Counter | Façade calls that resolved an implementation |
//! | `vpe_fallback_steps` | Counter | Detail enhancer levels skipped |
//! | `vpe_vendor_library_instances` | Gauge | Vendor library reference count |
//! | `vpe_instance_slots_used` | Gauge | Occupied instance table slots |
//!
//! No recorder or subscriber is installed by this crate.

mod metrics;
mod tracing_support;

pub use metrics::{
    FacadeMetrics, init_metrics, record_capability_query, record_extension_created,
    record_extension_init_failure, record_extensions_loaded, record_fallback_step,
    record_instance_slots_used, record_vendor_library_instances,
};
pub use tracing_support::{
    TracingConfig, instrument_facade, instrument_query, span_facade, span_query,
};
