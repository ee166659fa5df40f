//! Algorithm traits implemented by extensions.
//!
//! Every algorithm object is shared between the façade cache and in-flight
//! calls, so all methods take `&self` and implementations are responsible for
//! their own interior synchronization.

use super::info::ExtensionInfo;
use super::params::{
    AihdrEnhancerParameter, ColorSpaceConverterParameter, ContrastEnhancerParameters,
    DetailEnhancerParameters, MetadataGeneratorParameter,
};
use crate::buffer::SurfaceBuffer;
use crate::error::{Error, Result};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Lifecycle shared by every algorithm family.
pub trait ExtensionAlgorithm: Send + Sync {
    /// Prepare the algorithm. Called once, right after creation.
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Release resources. Called once, when the owning façade drops it.
    fn deinit(&self) -> Result<()> {
        Ok(())
    }
}

/// Color space conversion, including HDR layer composition.
pub trait ColorSpaceConverterAlgorithm: ExtensionAlgorithm {
    /// Apply conversion parameters.
    fn set_parameter(&self, _parameter: &ColorSpaceConverterParameter) -> Result<()> {
        Ok(())
    }

    /// Parameters currently applied, if the algorithm tracks them.
    fn get_parameter(&self) -> Option<ColorSpaceConverterParameter> {
        None
    }

    /// Convert `input` into `output`.
    fn process(&self, input: &SurfaceBuffer, output: &mut SurfaceBuffer) -> Result<()>;

    /// Compose an SDR base layer and a gainmap into a single HDR image.
    fn compose_image(
        &self,
        _sdr: &SurfaceBuffer,
        _gainmap: &SurfaceBuffer,
        _hdr: &mut SurfaceBuffer,
    ) -> Result<()> {
        Err(Error::OperationNotSupported("compose_image".into()))
    }

    /// Decompose an HDR image into an SDR base layer and a gainmap.
    fn decompose_image(
        &self,
        _hdr: &SurfaceBuffer,
        _sdr: &mut SurfaceBuffer,
        _gainmap: &mut SurfaceBuffer,
    ) -> Result<()> {
        Err(Error::OperationNotSupported("decompose_image".into()))
    }
}

/// HDR metadata generation.
pub trait MetadataGeneratorAlgorithm: ExtensionAlgorithm {
    /// Apply generation parameters.
    fn set_parameter(&self, _parameter: &MetadataGeneratorParameter) -> Result<()> {
        Ok(())
    }

    /// Compute metadata and attach it to `buffer`.
    fn process(&self, buffer: &mut SurfaceBuffer) -> Result<()>;
}

/// Detail enhancement and scaling.
pub trait DetailEnhancerAlgorithm: ExtensionAlgorithm {
    /// Apply enhancement parameters.
    fn set_parameter(&self, _parameter: &DetailEnhancerParameters) -> Result<()> {
        Ok(())
    }

    /// Enhance `input` into `output`, scaling to the output geometry.
    fn process(&self, input: &SurfaceBuffer, output: &mut SurfaceBuffer) -> Result<()>;
}

/// AI HDR enhancement, in place.
pub trait AihdrEnhancerAlgorithm: ExtensionAlgorithm {
    /// Apply enhancement parameters.
    fn set_parameter(&self, _parameter: &AihdrEnhancerParameter) -> Result<()> {
        Ok(())
    }

    /// Enhance `buffer` in place.
    fn process(&self, buffer: &mut SurfaceBuffer) -> Result<()>;
}

/// Contrast enhancement.
pub trait ContrastEnhancerAlgorithm: ExtensionAlgorithm {
    /// Apply enhancement parameters.
    fn set_parameter(&self, _parameter: &ContrastEnhancerParameters) -> Result<()> {
        Ok(())
    }

    /// Enhance `input` into `output`.
    fn process(&self, input: &SurfaceBuffer, output: &mut SurfaceBuffer) -> Result<()>;
}

/// Variable refresh rate decision.
pub trait VrrAlgorithm: ExtensionAlgorithm {
    /// Inspect a frame and return the refresh rate to use for it, in Hz.
    fn process(&self, frame: &SurfaceBuffer) -> Result<u32>;
}

// ============================================================================
// Resolved implementation
// ============================================================================

/// An initialized algorithm object together with the extension it came from.
///
/// Dropping the last reference deinitializes the algorithm. Façades hold
/// these in their caches; the vendor library must stay loaded for as long as
/// any `Resolved` exists.
pub struct Resolved<A: ?Sized + ExtensionAlgorithm> {
    info: ExtensionInfo,
    algorithm: Arc<A>,
}

impl<A: ?Sized + ExtensionAlgorithm> Resolved<A> {
    /// Wrap an algorithm whose `init` already succeeded.
    pub fn new(info: ExtensionInfo, algorithm: Arc<A>) -> Self {
        Self { info, algorithm }
    }

    /// The extension that produced this algorithm.
    pub fn info(&self) -> &ExtensionInfo {
        &self.info
    }

    /// Extension name, for logging.
    pub fn name(&self) -> &str {
        &self.info.name
    }
}

impl<A: ?Sized + ExtensionAlgorithm> Deref for Resolved<A> {
    type Target = A;

    fn deref(&self) -> &A {
        &self.algorithm
    }
}

impl<A: ?Sized + ExtensionAlgorithm> Drop for Resolved<A> {
    fn drop(&mut self) {
        if let Err(e) = self.algorithm.deinit() {
            tracing::warn!("extension '{}' failed to deinitialize: {}", self.info.name, e);
        } else {
            tracing::debug!("deinitialized extension '{}'", self.info.name);
        }
    }
}

impl<A: ?Sized + ExtensionAlgorithm> fmt::Debug for Resolved<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("name", &self.info.name)
            .field("version", &self.info.version)
            .finish()
    }
}
