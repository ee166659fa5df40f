//! # VPE
//!
//! A capability-based extension dispatcher for image and video processing
//! algorithms.
//!
//! Algorithms live in extensions: statically linked modules and an optional
//! vendor library loaded at runtime. Each extension advertises capabilities
//! (a color space and format pair, a quality level, a pixel format) with a
//! rank and a version. Client-facing façades resolve the best extension for
//! the buffers they are given, cache the initialized implementation, and fall
//! back where a family allows it.
//!
//! ## Features
//!
//! - **Capability selection**: the first `HIGH` candidate, else the first registered
//! - **Lazy façades**: nothing is resolved until the first call for a key
//! - **Vendor extensions**: versioned C ABI, loaded only while façades exist
//! - **Instance table**: generation-counted ids for C callers
//! - **Observability**: `tracing` spans and `metrics` counters throughout
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vpe::prelude::*;
//!
//! let manager = ExtensionManager::builder()
//!     .config(VpeConfig::from_env())
//!     .register_static(StaticRegistration::new("builtin", register_builtin))
//!     .build();
//!
//! let converter = ColorSpaceConverter::new(&manager);
//! converter.process(&input, &mut output)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod buffer;
pub mod capability;
pub mod capi;
pub mod config;
pub mod error;
pub mod extension;
pub mod facade;
pub mod format;
pub mod instance;
pub mod observability;
pub mod service;
pub mod status;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffer::SurfaceBuffer;
    pub use crate::config::VpeConfig;
    pub use crate::error::{Error, Result};
    pub use crate::extension::{
        ExtensionDescriptor, ExtensionFamily, ExtensionList, ExtensionManager, Rank,
        StaticRegistration,
    };
    pub use crate::facade::{
        AihdrEnhancer, CachePolicy, ColorSpaceConverter, ContrastEnhancer, DetailEnhancer,
        Facade, MetadataGenerator,
    };
    pub use crate::format::{ColorSpaceDescription, ColorSpaceInfo, PixelFormat};
    pub use crate::status::VpeAlgoErrCode;
}

pub use error::{Error, Result};
