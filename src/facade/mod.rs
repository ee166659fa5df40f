//! Client-facing façades.
//!
//! A façade is the stable object a client calls for one operation family. It
//! resolves an extension lazily on the first call for a key, caches the
//! initialized implementation, and pushes its stored parameters into that
//! implementation before every call.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──► Uninitialized ──process(key)──► Resolved(key) ──drop──► deinit all
//!                │                               ▲   │
//!                └─────── process(other key) ────┘   └─ process(key): cache hit
//! ```
//!
//! Cache keys per façade:
//!
//! - [`ColorSpaceConverter`]: a `ConversionKey`, with separate compose and
//!   decompose caches.
//! - [`MetadataGenerator`]: a `MetadataGenerationKey`.
//! - [`DetailEnhancer`]: a `DetailEnhancerLevel`, walked down the fallback
//!   ladder; the video sub-path uses one level.
//! - [`AihdrEnhancer`]: the input `PixelFormat`.
//! - [`ContrastEnhancer`]: a `ContrastEnhancerType`, with try-lock creation.
//!
//! Each façade holds an [`ExtensionLease`](crate::extension::ExtensionLease),
//! so the vendor library stays open while any façade exists. Cache locks
//! only guard map updates; creation, `init` and algorithm calls run outside
//! them.

mod aihdr_enhancer;
mod cache;
mod colorspace_converter;
mod contrast_enhancer;
mod detail_enhancer;
mod handle;
mod metadata_generator;

pub use aihdr_enhancer::AihdrEnhancer;
pub use cache::{CachePolicy, ImplementationCache};
pub use colorspace_converter::ColorSpaceConverter;
pub use contrast_enhancer::ContrastEnhancer;
pub use detail_enhancer::DetailEnhancer;
pub use handle::VpeHandle;
pub use metadata_generator::MetadataGenerator;

use crate::error::Error;

/// Behavior common to every façade.
pub trait Facade: Send + Sync {
    /// Operation family name, for logs and metrics.
    fn family(&self) -> &'static str;

    /// Number of implementations currently cached.
    fn cached_implementations(&self) -> usize;
}

/// Classify an error returned by a resolved implementation.
///
/// Rejections of a parameter or format combination keep their category;
/// anything else is reported as a processing failure of `name`.
pub(crate) fn map_process_error(name: &str, err: Error) -> Error {
    match err {
        Error::OperationNotSupported(_) | Error::InvalidValue(_) => err,
        other => {
            tracing::warn!("extension '{}' failed: {}", name, other);
            Error::process_failed(name, other)
        }
    }
}
