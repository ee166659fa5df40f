//! Tracing integration for structured logging and spans.

use tracing::span::EnteredSpan;
use tracing::{Level, Span, span};

/// Configuration for tracing behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// Whether to create spans for façade calls.
    pub facade_spans: bool,
    /// Whether to create spans for capability queries.
    pub query_spans: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            facade_spans: true,
            query_spans: false, // One per cache miss, noisy under load
        }
    }
}

impl TracingConfig {
    /// Create a config with all spans enabled.
    pub fn all() -> Self {
        Self {
            facade_spans: true,
            query_spans: true,
        }
    }

    /// Disable all spans.
    pub fn none() -> Self {
        Self {
            facade_spans: false,
            query_spans: false,
        }
    }
}

/// Create a span for one façade operation.
///
/// # Example
///
/// ```rust,ignore
/// use vpe::observability::span_facade;
///
/// let span = span_facade("detail enhancer", "process");
/// let _guard = span.enter();
/// ```
#[inline]
pub fn span_facade(family: &'static str, operation: &'static str) -> Span {
    span!(Level::DEBUG, "facade", family = %family, operation = %operation)
}

/// Create a span for a capability query.
#[inline]
pub fn span_query(family: &'static str) -> Span {
    span!(Level::TRACE, "capability_query", family = %family)
}

/// Enter a façade span if `config` enables them, returning the guard.
pub fn instrument_facade(
    config: &TracingConfig,
    family: &'static str,
    operation: &'static str,
) -> Option<EnteredSpan> {
    config
        .facade_spans
        .then(|| span_facade(family, operation).entered())
}

/// Enter a capability query span if `config` enables them.
pub fn instrument_query(config: &TracingConfig, family: &'static str) -> Option<EnteredSpan> {
    config.query_spans.then(|| span_query(family).entered())
}
