//! HDR metadata generation façade.

use super::cache::ImplementationCache;
use super::{Facade, map_process_error};
use crate::buffer::SurfaceBuffer;
use crate::capability::MetadataGenerationKey;
use crate::error::Result;
use crate::extension::{
    ExtensionLease, ExtensionManager, MetadataGeneratorAlgorithm, MetadataGeneratorParameter,
    Resolved,
};
use crate::format::ColorSpaceDescription;
use crate::observability::instrument_facade;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const FAMILY: &str = "metadata generator";

type Implementation = Arc<Resolved<dyn MetadataGeneratorAlgorithm>>;

/// Computes HDR metadata for buffers and attaches it in place.
pub struct MetadataGenerator {
    parameter: Mutex<Option<MetadataGeneratorParameter>>,
    implementations: ImplementationCache<MetadataGenerationKey, Implementation>,
    lease: ExtensionLease,
}

impl MetadataGenerator {
    /// Create a generator. No extension is resolved until the first call.
    pub fn new(manager: &Arc<ExtensionManager>) -> Self {
        Self {
            parameter: Mutex::new(None),
            implementations: ImplementationCache::new(FAMILY, manager.config().cache_policy),
            lease: manager.lease(),
        }
    }

    /// Store generation parameters. The algorithm type selects the
    /// extension on the next call.
    pub fn set_parameter(&self, parameter: MetadataGeneratorParameter) -> Result<()> {
        *self.lock() = Some(parameter);
        Ok(())
    }

    /// The last stored parameters.
    pub fn get_parameter(&self) -> Option<MetadataGeneratorParameter> {
        *self.lock()
    }

    /// Generate metadata for `buffer`.
    pub fn process(&self, buffer: &mut SurfaceBuffer) -> Result<()> {
        let _span = instrument_facade(self.lease.tracing(), FAMILY, "process");
        buffer.validate()?;

        let manager = self.lease.manager();
        let parameter = self.get_parameter();
        let key = MetadataGenerationKey::new(
            ColorSpaceDescription::from_buffer(buffer),
            buffer.format,
            parameter.unwrap_or_default().algo,
        );
        let implementation = self
            .implementations
            .get_or_try_insert_with(&key, || manager.create_metadata_generator(&key))?;

        if let Some(parameter) = parameter {
            implementation
                .set_parameter(&parameter)
                .map_err(|e| map_process_error(implementation.name(), e))?;
        }
        implementation
            .process(buffer)
            .map_err(|e| map_process_error(implementation.name(), e))
    }

    fn lock(&self) -> MutexGuard<'_, Option<MetadataGeneratorParameter>> {
        self.parameter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Facade for MetadataGenerator {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn cached_implementations(&self) -> usize {
        self.implementations.len()
    }
}

impl std::fmt::Debug for MetadataGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataGenerator")
            .field("cached", &self.cached_implementations())
            .finish()
    }
}
