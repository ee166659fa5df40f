//! Contrast enhancement façade.
//!
//! Creating a contrast algorithm can be slow and its backend is known to fail
//! persistently on some devices. Creation is therefore attempted by at most
//! one caller at a time: a concurrent caller gets [`Error::TryLater`]
//! immediately instead of waiting. Once the consecutive failed creations
//! exceed `contrast_failure_threshold` the façade stops trying and reports
//! [`Error::CreationDisabled`].

use super::cache::ImplementationCache;
use super::{Facade, map_process_error};
use crate::buffer::SurfaceBuffer;
use crate::error::{Error, Result};
use crate::extension::{
    ContrastEnhancerAlgorithm, ContrastEnhancerParameters, ContrastEnhancerType, ExtensionLease,
    ExtensionManager, Resolved,
};
use crate::observability::instrument_facade;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

const FAMILY: &str = "contrast enhancer";

type Implementation = Arc<Resolved<dyn ContrastEnhancerAlgorithm>>;

/// Enhances contrast, one implementation per algorithm type.
pub struct ContrastEnhancer {
    parameter: Mutex<Option<ContrastEnhancerParameters>>,
    implementations: ImplementationCache<ContrastEnhancerType, Implementation>,
    /// Held for the duration of one creation attempt.
    creation: Mutex<()>,
    failures: AtomicU32,
    threshold: u32,
    lease: ExtensionLease,
}

impl ContrastEnhancer {
    /// Create an enhancer. The failure threshold comes from the manager's
    /// configuration.
    pub fn new(manager: &Arc<ExtensionManager>) -> Self {
        Self {
            parameter: Mutex::new(None),
            implementations: ImplementationCache::new(FAMILY, manager.config().cache_policy),
            creation: Mutex::new(()),
            failures: AtomicU32::new(0),
            threshold: manager.config().contrast_failure_threshold,
            lease: manager.lease(),
        }
    }

    /// Store enhancement parameters.
    pub fn set_parameter(&self, parameter: ContrastEnhancerParameters) -> Result<()> {
        *self.lock() = Some(parameter);
        Ok(())
    }

    /// The last stored parameters.
    pub fn get_parameter(&self) -> Option<ContrastEnhancerParameters> {
        self.lock().clone()
    }

    /// Consecutive failed creations so far.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::Acquire)
    }

    /// Returns true once creation has been given up on.
    pub fn is_creation_disabled(&self) -> bool {
        self.consecutive_failures() > self.threshold
    }

    /// Enhance `input` into `output` with the `algo` implementation.
    pub fn process(
        &self,
        algo: ContrastEnhancerType,
        input: &SurfaceBuffer,
        output: &mut SurfaceBuffer,
    ) -> Result<()> {
        let _span = instrument_facade(self.lease.tracing(), FAMILY, "process");
        input.validate()?;
        output.validate()?;

        let implementation = self.resolve(algo)?;
        if let Some(parameter) = self.get_parameter() {
            implementation
                .set_parameter(&parameter)
                .map_err(|e| map_process_error(implementation.name(), e))?;
        }
        implementation
            .process(input, output)
            .map_err(|e| map_process_error(implementation.name(), e))
    }

    fn resolve(&self, algo: ContrastEnhancerType) -> Result<Implementation> {
        if let Some(found) = self.implementations.get(&algo) {
            return Ok(found);
        }
        if self.is_creation_disabled() {
            return Err(Error::CreationDisabled(FAMILY));
        }

        let _creating = match self.creation.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("{} creation in progress elsewhere", FAMILY);
                return Err(Error::TryLater);
            }
        };

        // Another caller may have finished creating while we checked.
        if let Some(found) = self.implementations.get(&algo) {
            return Ok(found);
        }

        match self.lease.manager().create_contrast_enhancer(algo) {
            Ok(created) => {
                self.failures.store(0, Ordering::Release);
                self.implementations.insert(algo, Arc::clone(&created));
                Ok(created)
            }
            Err(e) => {
                let failures = self.failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures > self.threshold {
                    tracing::error!(
                        "{} creation disabled after {} consecutive failures: {}",
                        FAMILY,
                        failures,
                        e
                    );
                } else {
                    tracing::warn!("{} creation failed ({}): {}", FAMILY, failures, e);
                }
                Err(e)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ContrastEnhancerParameters>> {
        self.parameter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Facade for ContrastEnhancer {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn cached_implementations(&self) -> usize {
        self.implementations.len()
    }
}

impl std::fmt::Debug for ContrastEnhancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContrastEnhancer")
            .field("cached", &self.cached_implementations())
            .field("failures", &self.consecutive_failures())
            .field("threshold", &self.threshold)
            .finish()
    }
}
