//! AI HDR enhancement façade.

use super::cache::ImplementationCache;
use super::{Facade, map_process_error};
use crate::buffer::SurfaceBuffer;
use crate::error::{Error, Result};
use crate::extension::{
    AihdrEnhancerAlgorithm, AihdrEnhancerParameter, ExtensionLease, ExtensionManager, Resolved,
};
use crate::format::PixelFormat;
use crate::observability::instrument_facade;
use crate::service::AlgorithmService;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const FAMILY: &str = "aihdr enhancer";

type Implementation = Arc<Resolved<dyn AihdrEnhancerAlgorithm>>;

/// Enhances SDR buffers towards HDR in place, one implementation per input
/// pixel format.
pub struct AihdrEnhancer {
    parameter: Mutex<Option<AihdrEnhancerParameter>>,
    implementations: ImplementationCache<PixelFormat, Implementation>,
    service: Arc<dyn AlgorithmService>,
    lease: ExtensionLease,
}

impl AihdrEnhancer {
    /// Create an enhancer and connect to the algorithm service.
    pub fn new(manager: &Arc<ExtensionManager>) -> Self {
        let service = manager.algorithm_service();
        service.connect();
        Self {
            parameter: Mutex::new(None),
            implementations: ImplementationCache::new(FAMILY, manager.config().cache_policy),
            service,
            lease: manager.lease(),
        }
    }

    /// Store enhancement parameters.
    pub fn set_parameter(&self, parameter: AihdrEnhancerParameter) -> Result<()> {
        if !parameter.peak_luminance.is_finite() || parameter.peak_luminance <= 0.0 {
            return Err(Error::invalid(format!(
                "peak_luminance must be positive, got {}",
                parameter.peak_luminance
            )));
        }
        *self.lock() = Some(parameter);
        Ok(())
    }

    /// The last stored parameters.
    pub fn get_parameter(&self) -> Option<AihdrEnhancerParameter> {
        *self.lock()
    }

    /// Enhance `buffer` in place.
    pub fn process(&self, buffer: &mut SurfaceBuffer) -> Result<()> {
        let _span = instrument_facade(self.lease.tracing(), FAMILY, "process");
        buffer.validate()?;

        let manager = self.lease.manager();
        let format = buffer.format;
        let implementation = self
            .implementations
            .get_or_try_insert_with(&format, || manager.create_aihdr_enhancer(format))?;

        if let Some(parameter) = self.get_parameter() {
            implementation
                .set_parameter(&parameter)
                .map_err(|e| map_process_error(implementation.name(), e))?;
        }
        implementation
            .process(buffer)
            .map_err(|e| map_process_error(implementation.name(), e))
    }

    fn lock(&self) -> MutexGuard<'_, Option<AihdrEnhancerParameter>> {
        self.parameter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Facade for AihdrEnhancer {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn cached_implementations(&self) -> usize {
        self.implementations.len()
    }
}

impl Drop for AihdrEnhancer {
    fn drop(&mut self) {
        self.implementations.clear();
        self.service.disconnect();
    }
}

impl std::fmt::Debug for AihdrEnhancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AihdrEnhancer")
            .field("cached", &self.cached_implementations())
            .finish()
    }
}
