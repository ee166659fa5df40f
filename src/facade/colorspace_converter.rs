//! Color space conversion façade, including HDR layer composition.

use super::cache::ImplementationCache;
use super::{Facade, map_process_error};
use crate::buffer::SurfaceBuffer;
use crate::capability::ConversionKey;
use crate::error::Result;
use crate::extension::{
    ColorSpaceConverterAlgorithm, ColorSpaceConverterParameter, ExtensionLease, ExtensionManager,
    Resolved,
};
use crate::format::FrameInfo;
use crate::observability::instrument_facade;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const FAMILY: &str = "color space converter";

type Implementation = Arc<Resolved<dyn ColorSpaceConverterAlgorithm>>;

/// Which manager query a cache serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operation {
    Convert,
    Compose,
    Decompose,
}

/// Converts buffers between color spaces and composes or decomposes HDR
/// images.
///
/// Each distinct (input color space, input format, output color space,
/// output format) seen by [`process`](Self::process) resolves one
/// implementation, cached for later calls. Composition and decomposition keep
/// separate caches.
pub struct ColorSpaceConverter {
    parameter: Mutex<Option<ColorSpaceConverterParameter>>,
    convert: ImplementationCache<ConversionKey, Implementation>,
    compose: ImplementationCache<ConversionKey, Implementation>,
    decompose: ImplementationCache<ConversionKey, Implementation>,
    // Declared after the caches: cached implementations drop first.
    lease: ExtensionLease,
}

impl ColorSpaceConverter {
    /// Create a converter. No extension is resolved until the first call.
    pub fn new(manager: &Arc<ExtensionManager>) -> Self {
        let policy = manager.config().cache_policy;
        Self {
            parameter: Mutex::new(None),
            convert: ImplementationCache::new(FAMILY, policy),
            compose: ImplementationCache::new(FAMILY, policy),
            decompose: ImplementationCache::new(FAMILY, policy),
            lease: manager.lease(),
        }
    }

    /// Store conversion parameters. They are pushed into whichever
    /// implementation serves the next call.
    pub fn set_parameter(&self, parameter: ColorSpaceConverterParameter) -> Result<()> {
        parameter.validate()?;
        *self.lock() = Some(parameter);
        Ok(())
    }

    /// The last stored parameters.
    pub fn get_parameter(&self) -> Option<ColorSpaceConverterParameter> {
        *self.lock()
    }

    /// Convert `input` into `output`.
    pub fn process(&self, input: &SurfaceBuffer, output: &mut SurfaceBuffer) -> Result<()> {
        let _span = instrument_facade(self.lease.tracing(), FAMILY, "process");
        input.validate()?;
        output.validate()?;
        let key = ConversionKey::from_frames(
            &FrameInfo::from_buffer(input),
            &FrameInfo::from_buffer(output),
        );
        let (implementation, parameter) = self.resolve(Operation::Convert, &key)?;
        apply(&implementation, parameter)?;
        implementation
            .process(input, output)
            .map_err(|e| map_process_error(implementation.name(), e))
    }

    /// Compose an SDR base layer and a gainmap into `hdr`.
    pub fn compose_image(
        &self,
        sdr: &SurfaceBuffer,
        gainmap: &SurfaceBuffer,
        hdr: &mut SurfaceBuffer,
    ) -> Result<()> {
        let _span = instrument_facade(self.lease.tracing(), FAMILY, "compose");
        sdr.validate()?;
        gainmap.validate()?;
        hdr.validate()?;
        let key =
            ConversionKey::from_frames(&FrameInfo::from_buffer(sdr), &FrameInfo::from_buffer(hdr));
        let (implementation, parameter) = self.resolve(Operation::Compose, &key)?;
        apply(&implementation, parameter)?;
        implementation
            .compose_image(sdr, gainmap, hdr)
            .map_err(|e| map_process_error(implementation.name(), e))
    }

    /// Decompose `hdr` into an SDR base layer and a gainmap.
    pub fn decompose_image(
        &self,
        hdr: &SurfaceBuffer,
        sdr: &mut SurfaceBuffer,
        gainmap: &mut SurfaceBuffer,
    ) -> Result<()> {
        let _span = instrument_facade(self.lease.tracing(), FAMILY, "decompose");
        hdr.validate()?;
        sdr.validate()?;
        gainmap.validate()?;
        let key =
            ConversionKey::from_frames(&FrameInfo::from_buffer(hdr), &FrameInfo::from_buffer(sdr));
        let (implementation, parameter) = self.resolve(Operation::Decompose, &key)?;
        apply(&implementation, parameter)?;
        implementation
            .decompose_image(hdr, sdr, gainmap)
            .map_err(|e| map_process_error(implementation.name(), e))
    }

    /// Number of cached conversion implementations.
    pub fn conversion_cache_len(&self) -> usize {
        self.convert.len()
    }

    fn resolve(
        &self,
        operation: Operation,
        key: &ConversionKey,
    ) -> Result<(Implementation, Option<ColorSpaceConverterParameter>)> {
        let manager = self.lease.manager();
        let cache = match operation {
            Operation::Convert => &self.convert,
            Operation::Compose => &self.compose,
            Operation::Decompose => &self.decompose,
        };
        let implementation = cache.get_or_try_insert_with(key, || {
            tracing::debug!("{} resolving {:?} for {}", FAMILY, operation, key);
            match operation {
                Operation::Convert => manager.create_color_space_converter(key),
                Operation::Compose => manager.create_composer(key),
                Operation::Decompose => manager.create_decomposer(key),
            }
        })?;
        Ok((implementation, self.get_parameter()))
    }

    fn lock(&self) -> MutexGuard<'_, Option<ColorSpaceConverterParameter>> {
        self.parameter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn apply(
    implementation: &Implementation,
    parameter: Option<ColorSpaceConverterParameter>,
) -> Result<()> {
    match parameter {
        Some(parameter) => implementation
            .set_parameter(&parameter)
            .map_err(|e| map_process_error(implementation.name(), e)),
        None => Ok(()),
    }
}

impl Facade for ColorSpaceConverter {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn cached_implementations(&self) -> usize {
        self.convert.len() + self.compose.len() + self.decompose.len()
    }
}

impl std::fmt::Debug for ColorSpaceConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorSpaceConverter")
            .field("cached", &self.cached_implementations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ColorSpaceConverterCapability;
    use crate::error::Error;
    use crate::extension::{
        ColorSpaceConverterExtension, ExtensionAlgorithm, ExtensionDescriptor, ExtensionFamily,
        Rank, RenderIntent, StaticRegistration,
    };
    use crate::format::{ColorSpaceDescription, ColorSpaceInfo, PixelFormat};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recorder {
        parameters: Mutex<Vec<ColorSpaceConverterParameter>>,
        deinits: Arc<AtomicUsize>,
    }

    impl ExtensionAlgorithm for Recorder {
        fn deinit(&self) -> Result<()> {
            self.deinits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl ColorSpaceConverterAlgorithm for Recorder {
        fn set_parameter(&self, parameter: &ColorSpaceConverterParameter) -> Result<()> {
            self.parameters.lock().unwrap().push(*parameter);
            Ok(())
        }

        fn process(&self, input: &SurfaceBuffer, output: &mut SurfaceBuffer) -> Result<()> {
            output.data.copy_from_slice(&input.data);
            Ok(())
        }

        fn compose_image(
            &self,
            _sdr: &SurfaceBuffer,
            _gainmap: &SurfaceBuffer,
            hdr: &mut SurfaceBuffer,
        ) -> Result<()> {
            hdr.data.fill(0xff);
            Ok(())
        }
    }

    fn registration(family: ExtensionFamily, deinits: Arc<AtomicUsize>) -> StaticRegistration {
        StaticRegistration::for_family("recorder", family, move |list| {
            let deinits = deinits.clone();
            let ext = ColorSpaceConverterExtension::new(
                move || {
                    Some(Arc::new(Recorder {
                        parameters: Mutex::new(Vec::new()),
                        deinits: deinits.clone(),
                    }) as Arc<dyn ColorSpaceConverterAlgorithm>)
                },
                || {
                    vec![ColorSpaceConverterCapability {
                        input_color_space: ColorSpaceDescription::srgb(),
                        output_color_space: ColorSpaceDescription::display_p3(),
                        pixel_formats: BTreeMap::from([(
                            PixelFormat::Rgba8888,
                            vec![PixelFormat::Rgba8888, PixelFormat::Bgra8888],
                        )]),
                        rank: Rank::Default,
                        version: 1,
                    }]
                },
            );
            list.push(ExtensionDescriptor::color_space_converter("recorder", "1", ext));
        })
    }

    fn buffers(output_format: PixelFormat) -> (SurfaceBuffer, SurfaceBuffer) {
        let input = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
        let output =
            SurfaceBuffer::new(4, 4, output_format).with_color_space(ColorSpaceInfo::DISPLAY_P3);
        (input, output)
    }

    #[test]
    fn test_cache_per_format_pair() {
        let deinits = Arc::new(AtomicUsize::new(0));
        let manager = ExtensionManager::with_static([registration(
            ExtensionFamily::General,
            deinits.clone(),
        )]);
        let converter = ColorSpaceConverter::new(&manager);

        let (input, mut rgba) = buffers(PixelFormat::Rgba8888);
        let (_, mut bgra) = buffers(PixelFormat::Bgra8888);
        converter.process(&input, &mut rgba).unwrap();
        converter.process(&input, &mut bgra).unwrap();
        assert_eq!(manager.query_count(), 2);

        converter.process(&input, &mut rgba).unwrap();
        assert_eq!(manager.query_count(), 2);
        assert_eq!(converter.conversion_cache_len(), 2);

        drop(converter);
        assert_eq!(deinits.load(Ordering::SeqCst), 2);
        assert_eq!(manager.instance_count(), 0);
    }

    #[test]
    fn test_unsupported_pair_is_not_cached() {
        let manager = ExtensionManager::with_static([registration(
            ExtensionFamily::General,
            Arc::new(AtomicUsize::new(0)),
        )]);
        let converter = ColorSpaceConverter::new(&manager);
        let input = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
        let mut output = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
        let err = converter.process(&input, &mut output).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(converter.cached_implementations(), 0);
    }

    #[test]
    fn test_parameter_validated_and_stored() {
        let manager = ExtensionManager::with_static([]);
        let converter = ColorSpaceConverter::new(&manager);
        assert!(converter.get_parameter().is_none());
        let bad = ColorSpaceConverterParameter {
            sdr_ui_brightness: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            converter.set_parameter(bad),
            Err(Error::InvalidValue(_))
        ));
        let good = ColorSpaceConverterParameter {
            render_intent: RenderIntent::Saturation,
            ..Default::default()
        };
        converter.set_parameter(good).unwrap();
        assert_eq!(converter.get_parameter(), Some(good));
    }

    #[test]
    fn test_compose_uses_compose_family() {
        let manager = ExtensionManager::with_static([registration(
            ExtensionFamily::Compose,
            Arc::new(AtomicUsize::new(0)),
        )]);
        let converter = ColorSpaceConverter::new(&manager);
        let (sdr, mut hdr) = buffers(PixelFormat::Rgba8888);
        let gainmap = SurfaceBuffer::new(2, 2, PixelFormat::Rgba8888);

        converter.compose_image(&sdr, &gainmap, &mut hdr).unwrap();
        assert!(hdr.data.iter().all(|&b| b == 0xff));

        // The general converter list is empty.
        let (input, mut output) = buffers(PixelFormat::Rgba8888);
        assert!(converter.process(&input, &mut output).is_err());
    }

    #[test]
    fn test_decompose_not_implemented_by_extension() {
        let manager = ExtensionManager::with_static([registration(
            ExtensionFamily::Decompose,
            Arc::new(AtomicUsize::new(0)),
        )]);
        let converter = ColorSpaceConverter::new(&manager);
        let hdr = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
        let mut sdr = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888)
            .with_color_space(ColorSpaceInfo::DISPLAY_P3);
        let mut gainmap = SurfaceBuffer::new(2, 2, PixelFormat::Rgba8888);
        let err = converter
            .decompose_image(&hdr, &mut sdr, &mut gainmap)
            .unwrap_err();
        assert!(matches!(err, Error::OperationNotSupported(_)));
    }
}
