//! Detail enhancement façade with its quality-level fallback ladder.

use super::cache::ImplementationCache;
use super::{Facade, map_process_error};
use crate::buffer::SurfaceBuffer;
use crate::error::{Error, Result};
use crate::extension::{
    DetailEnhancerAlgorithm, DetailEnhancerLevel, DetailEnhancerParameters, ExtensionLease,
    ExtensionManager, Resolved,
};
use crate::observability::{instrument_facade, record_fallback_step};
use crate::service::AlgorithmService;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const FAMILY: &str = "detail enhancer";

type Implementation = Arc<Resolved<dyn DetailEnhancerAlgorithm>>;

/// Enhances and scales images, falling back to lower quality levels when the
/// requested one is unavailable or fails.
///
/// The image path evaluates a target level per call and walks down from it
/// to [`DetailEnhancerLevel::None`], stopping at the first level that
/// processes successfully. The video path ([`DetailEnhancer::video`]) always
/// uses [`DetailEnhancerLevel::Video`] and never falls back.
pub struct DetailEnhancer {
    parameter: Mutex<Option<DetailEnhancerParameters>>,
    implementations: ImplementationCache<DetailEnhancerLevel, Implementation>,
    video: bool,
    service: Arc<dyn AlgorithmService>,
    lease: ExtensionLease,
}

impl DetailEnhancer {
    /// Create an image detail enhancer.
    pub fn new(manager: &Arc<ExtensionManager>) -> Self {
        Self::with_mode(manager, false)
    }

    /// Create a video detail enhancer.
    pub fn video(manager: &Arc<ExtensionManager>) -> Self {
        Self::with_mode(manager, true)
    }

    fn with_mode(manager: &Arc<ExtensionManager>, video: bool) -> Self {
        let service = manager.algorithm_service();
        service.connect();
        Self {
            parameter: Mutex::new(None),
            implementations: ImplementationCache::new(FAMILY, manager.config().cache_policy),
            video,
            service,
            lease: manager.lease(),
        }
    }

    /// Store enhancement parameters.
    ///
    /// The video path only accepts [`DetailEnhancerLevel::Video`]; the image
    /// path rejects it.
    pub fn set_parameter(&self, parameter: DetailEnhancerParameters) -> Result<()> {
        let is_video_level = parameter.level == DetailEnhancerLevel::Video;
        if self.video != is_video_level {
            return Err(Error::invalid(format!(
                "level {:?} not valid for the {} path",
                parameter.level,
                if self.video { "video" } else { "image" }
            )));
        }
        *self.lock() = Some(parameter);
        Ok(())
    }

    /// The last stored parameters.
    pub fn get_parameter(&self) -> Option<DetailEnhancerParameters> {
        self.lock().clone()
    }

    /// Returns true for the video path.
    pub fn is_video(&self) -> bool {
        self.video
    }

    /// Enhance `input` into `output`, scaling to the output geometry.
    pub fn process(&self, input: &SurfaceBuffer, output: &mut SurfaceBuffer) -> Result<()> {
        let _span = instrument_facade(self.lease.tracing(), FAMILY, "process");
        input.validate()?;
        output.validate()?;

        let parameter = self.get_parameter().unwrap_or_else(|| DetailEnhancerParameters {
            level: if self.video {
                DetailEnhancerLevel::Video
            } else {
                DetailEnhancerLevel::default()
            },
            ..Default::default()
        });

        if self.video {
            return self.run(DetailEnhancerLevel::Video, &parameter, input, output);
        }

        let target = target_level(parameter.level, input, output);
        if !target.is_ai() && is_identity(input, output) {
            tracing::trace!("{} 1:1 copy at {:?}", FAMILY, target);
            return output.copy_from(input);
        }

        let mut first_error: Option<Error> = None;
        for level in target.descending() {
            match self.run(level, &parameter, input, output) {
                Ok(()) => {
                    if level != target {
                        tracing::debug!("{} fell back from {:?} to {:?}", FAMILY, target, level);
                    }
                    return Ok(());
                }
                Err(e) => {
                    if level.lower().is_some() {
                        record_fallback_step();
                    }
                    tracing::debug!("{} level {:?} unavailable: {}", FAMILY, level, e);
                    if first_error.is_none() && !e.is_not_found() {
                        first_error = Some(e);
                    }
                }
            }
        }

        Err(first_error.unwrap_or_else(|| Error::CapabilityNotFound {
            family: FAMILY,
            key: format!("{:?} or lower", target),
        }))
    }

    fn run(
        &self,
        level: DetailEnhancerLevel,
        parameter: &DetailEnhancerParameters,
        input: &SurfaceBuffer,
        output: &mut SurfaceBuffer,
    ) -> Result<()> {
        let implementation = self.resolve(level)?;
        let parameter = DetailEnhancerParameters {
            level,
            ..parameter.clone()
        };
        implementation
            .set_parameter(&parameter)
            .map_err(|e| map_process_error(implementation.name(), e))?;
        implementation
            .process(input, output)
            .map_err(|e| map_process_error(implementation.name(), e))
    }

    fn resolve(&self, level: DetailEnhancerLevel) -> Result<Implementation> {
        let manager = self.lease.manager();
        self.implementations
            .get_or_try_insert_with(&level, || manager.create_detail_enhancer(level))
    }

    fn lock(&self) -> MutexGuard<'_, Option<DetailEnhancerParameters>> {
        self.parameter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Level to start the ladder from.
///
/// A high-quality request becomes [`DetailEnhancerLevel::HighAisr`] when
/// the output is smaller than the input in both dimensions, and
/// [`DetailEnhancerLevel::High`] otherwise.
fn target_level(
    requested: DetailEnhancerLevel,
    input: &SurfaceBuffer,
    output: &SurfaceBuffer,
) -> DetailEnhancerLevel {
    match requested {
        DetailEnhancerLevel::High | DetailEnhancerLevel::HighAisr => {
            if output.width < input.width && output.height < input.height {
                DetailEnhancerLevel::HighAisr
            } else {
                DetailEnhancerLevel::High
            }
        }
        other => other,
    }
}

fn is_identity(input: &SurfaceBuffer, output: &SurfaceBuffer) -> bool {
    input.width == output.width && input.height == output.height && input.format == output.format
}

impl Facade for DetailEnhancer {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn cached_implementations(&self) -> usize {
        self.implementations.len()
    }
}

impl Drop for DetailEnhancer {
    fn drop(&mut self) {
        self.implementations.clear();
        self.service.disconnect();
    }
}

impl std::fmt::Debug for DetailEnhancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailEnhancer")
            .field("video", &self.video)
            .field("cached", &self.cached_implementations())
            .finish()
    }
}
