//! Integration tests for façade caching, parameter handling and fallback.
//!
//! Mock extensions record what the façades push into them so the tests can
//! observe resolution, parameter re-application and the order of fallback
//! attempts.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use vpe::buffer::SurfaceBuffer;
use vpe::capability::{
    ColorSpaceConverterCapability, ContrastEnhancerCapability, DetailEnhancerCapability,
};
use vpe::config::VpeConfig;
use vpe::error::{Error, Result};
use vpe::extension::{
    ColorSpaceConverterAlgorithm, ColorSpaceConverterExtension, ColorSpaceConverterParameter,
    ContrastEnhancerAlgorithm, ContrastEnhancerExtension, ContrastEnhancerType,
    DetailEnhancerAlgorithm, DetailEnhancerExtension, DetailEnhancerLevel,
    DetailEnhancerParameters, ExtensionAlgorithm, ExtensionDescriptor, ExtensionManager, Rank,
    RenderIntent, StaticRegistration,
};
use vpe::facade::{CachePolicy, ColorSpaceConverter, ContrastEnhancer, DetailEnhancer, Facade};
use vpe::format::{ColorSpaceDescription, ColorSpaceInfo, PixelFormat};
use vpe::observability::TracingConfig;

/// Route façade and query spans to the test output; `RUST_LOG` selects levels.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Color space converter
// ============================================================================

/// Parameters received by each created converter, by creation order.
type ParameterLog = Arc<Mutex<Vec<(usize, ColorSpaceConverterParameter)>>>;

struct RecordingConverter {
    id: usize,
    log: ParameterLog,
    deinits: Arc<AtomicUsize>,
}

impl ExtensionAlgorithm for RecordingConverter {
    fn deinit(&self) -> Result<()> {
        self.deinits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl ColorSpaceConverterAlgorithm for RecordingConverter {
    fn set_parameter(&self, parameter: &ColorSpaceConverterParameter) -> Result<()> {
        self.log.lock().unwrap().push((self.id, *parameter));
        Ok(())
    }

    fn process(&self, _input: &SurfaceBuffer, output: &mut SurfaceBuffer) -> Result<()> {
        output.data.fill(self.id as u8);
        Ok(())
    }
}

struct ConverterFixture {
    manager: Arc<ExtensionManager>,
    log: ParameterLog,
    deinits: Arc<AtomicUsize>,
}

fn converter_fixture(policy: CachePolicy) -> ConverterFixture {
    init_tracing();
    let log = ParameterLog::default();
    let deinits = Arc::new(AtomicUsize::new(0));
    let created = Arc::new(AtomicUsize::new(0));

    let (l, d) = (log.clone(), deinits.clone());
    let registration = StaticRegistration::new("recording", move |list| {
        let (log, deinits, created) = (l.clone(), d.clone(), created.clone());
        let ext = ColorSpaceConverterExtension::new(
            move || {
                Some(Arc::new(RecordingConverter {
                    id: created.fetch_add(1, Ordering::SeqCst) + 1,
                    log: log.clone(),
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
        list.push(ExtensionDescriptor::color_space_converter("recording", "1", ext));
    });

    let manager = ExtensionManager::builder()
        .config(VpeConfig::static_only().with_cache_policy(policy))
        .register_static(registration)
        .build();
    ConverterFixture {
        manager,
        log,
        deinits,
    }
}

fn srgb_input() -> SurfaceBuffer {
    SurfaceBuffer::new(8, 8, PixelFormat::Rgba8888)
}

fn p3_output(format: PixelFormat) -> SurfaceBuffer {
    SurfaceBuffer::new(8, 8, format).with_color_space(ColorSpaceInfo::DISPLAY_P3)
}

/// Test that two pairs give two cache entries; a seen pair triggers no new query.
#[test]
fn test_converter_caches_per_pair() {
    let fixture = converter_fixture(CachePolicy::Unbounded);
    let converter = ColorSpaceConverter::new(&fixture.manager);
    let input = srgb_input();

    let mut rgba = p3_output(PixelFormat::Rgba8888);
    let mut bgra = p3_output(PixelFormat::Bgra8888);
    converter.process(&input, &mut rgba).unwrap();
    converter.process(&input, &mut bgra).unwrap();
    assert_eq!(converter.conversion_cache_len(), 2);
    assert_eq!(fixture.manager.query_count(), 2);

    for _ in 0..5 {
        converter.process(&input, &mut rgba).unwrap();
    }
    assert_eq!(fixture.manager.query_count(), 2);
    assert!(rgba.data.iter().all(|&b| b == 1));
    assert!(bgra.data.iter().all(|&b| b == 2));
}

/// Test that the stored parameter is pushed before every call, into whichever
/// implementation serves it.
#[test]
fn test_parameter_reapplied_on_every_call() {
    let fixture = converter_fixture(CachePolicy::Unbounded);
    let converter = ColorSpaceConverter::new(&fixture.manager);
    let input = srgb_input();
    let mut rgba = p3_output(PixelFormat::Rgba8888);
    let mut bgra = p3_output(PixelFormat::Bgra8888);

    // Without a stored parameter nothing is pushed.
    converter.process(&input, &mut rgba).unwrap();
    assert!(fixture.log.lock().unwrap().is_empty());

    let saturation = ColorSpaceConverterParameter {
        render_intent: RenderIntent::Saturation,
        ..Default::default()
    };
    converter.set_parameter(saturation).unwrap();
    converter.process(&input, &mut rgba).unwrap();
    converter.process(&input, &mut bgra).unwrap();

    let perceptual = ColorSpaceConverterParameter::default();
    converter.set_parameter(perceptual).unwrap();
    converter.process(&input, &mut rgba).unwrap();

    let log = fixture.log.lock().unwrap().clone();
    assert_eq!(log, vec![(1, saturation), (2, saturation), (1, perceptual)]);
}

/// Test that dropping the façade deinitializes every cached implementation.
#[test]
fn test_drop_deinitializes_all() {
    let fixture = converter_fixture(CachePolicy::Unbounded);
    let converter = ColorSpaceConverter::new(&fixture.manager);
    let input = srgb_input();
    converter.process(&input, &mut p3_output(PixelFormat::Rgba8888)).unwrap();
    converter.process(&input, &mut p3_output(PixelFormat::Bgra8888)).unwrap();
    assert_eq!(fixture.deinits.load(Ordering::SeqCst), 0);

    drop(converter);
    assert_eq!(fixture.deinits.load(Ordering::SeqCst), 2);
    assert_eq!(fixture.manager.instance_count(), 0);
}

/// Test that a bounded cache evicts and deinitializes the least recently used entry.
#[test]
fn test_lru_policy_evicts() {
    let capacity = NonZeroUsize::new(1).unwrap();
    let fixture = converter_fixture(CachePolicy::Lru(capacity));
    let converter = ColorSpaceConverter::new(&fixture.manager);
    let input = srgb_input();

    converter.process(&input, &mut p3_output(PixelFormat::Rgba8888)).unwrap();
    converter.process(&input, &mut p3_output(PixelFormat::Bgra8888)).unwrap();
    assert_eq!(converter.conversion_cache_len(), 1);
    assert_eq!(fixture.deinits.load(Ordering::SeqCst), 1);

    converter.process(&input, &mut p3_output(PixelFormat::Rgba8888)).unwrap();
    assert_eq!(fixture.manager.query_count(), 3);
}

/// Test that concurrent first calls for one pair resolve it once.
#[test]
fn test_concurrent_first_calls_resolve_once() {
    let fixture = converter_fixture(CachePolicy::Unbounded);
    let converter = Arc::new(ColorSpaceConverter::new(&fixture.manager));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let converter = Arc::clone(&converter);
            thread::spawn(move || {
                let mut output = p3_output(PixelFormat::Rgba8888);
                converter.process(&srgb_input(), &mut output).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(fixture.manager.query_count(), 1);
    assert_eq!(converter.cached_implementations(), 1);
}

/// Converter whose `init` parks until the test lets it finish.
struct GatedConverter {
    started: Option<Arc<Barrier>>,
    release: Option<Arc<Barrier>>,
}

impl ExtensionAlgorithm for GatedConverter {
    fn init(&self) -> Result<()> {
        if let (Some(started), Some(release)) = (&self.started, &self.release) {
            started.wait();
            release.wait();
        }
        Ok(())
    }
}

impl ColorSpaceConverterAlgorithm for GatedConverter {
    fn process(&self, _input: &SurfaceBuffer, output: &mut SurfaceBuffer) -> Result<()> {
        output.data.fill(if self.started.is_some() { 0xBB } else { 0xAA });
        Ok(())
    }
}

fn gated_converter(
    name: &'static str,
    output_format: PixelFormat,
    gate: Option<(Arc<Barrier>, Arc<Barrier>)>,
) -> ExtensionDescriptor {
    let ext = ColorSpaceConverterExtension::new(
        move || {
            let (started, release) = gate.clone().unzip();
            let converter = GatedConverter { started, release };
            Some(Arc::new(converter) as Arc<dyn ColorSpaceConverterAlgorithm>)
        },
        move || {
            vec![ColorSpaceConverterCapability {
                input_color_space: ColorSpaceDescription::srgb(),
                output_color_space: ColorSpaceDescription::display_p3(),
                pixel_formats: BTreeMap::from([(PixelFormat::Rgba8888, vec![output_format])]),
                rank: Rank::Default,
                version: 1,
            }]
        },
    );
    ExtensionDescriptor::color_space_converter(name, "1", ext)
}

/// Test that a slow creation for a new pair does not stall calls on a cached pair.
#[test]
fn test_cached_pair_not_blocked_by_slow_init() {
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let gate = (Arc::clone(&started), Arc::clone(&release));
    let manager = ExtensionManager::with_static([StaticRegistration::new("gated", move |list| {
        list.push(gated_converter("fast", PixelFormat::Rgba8888, None));
        list.push(gated_converter("slow", PixelFormat::Bgra8888, Some(gate.clone())));
    })]);
    let converter = Arc::new(ColorSpaceConverter::new(&manager));
    let input = srgb_input();

    let mut cached = p3_output(PixelFormat::Rgba8888);
    converter.process(&input, &mut cached).unwrap();

    let slow = {
        let converter = Arc::clone(&converter);
        thread::spawn(move || {
            let mut output = p3_output(PixelFormat::Bgra8888);
            converter.process(&srgb_input(), &mut output).map(|()| output)
        })
    };

    // The slow pair is now inside `init`.
    started.wait();
    cached.data.fill(0);
    converter.process(&input, &mut cached).unwrap();
    assert!(cached.data.iter().all(|&b| b == 0xAA));
    assert_eq!(converter.conversion_cache_len(), 1);

    release.wait();
    let output = slow.join().unwrap().unwrap();
    assert!(output.data.iter().all(|&b| b == 0xBB));
    assert_eq!(converter.conversion_cache_len(), 2);
}

// ============================================================================
// Detail enhancer
// ============================================================================

type LevelLog = Arc<Mutex<Vec<DetailEnhancerLevel>>>;

struct LevelEnhancer {
    level: DetailEnhancerLevel,
    succeeds: bool,
    log: LevelLog,
}

impl ExtensionAlgorithm for LevelEnhancer {}

impl DetailEnhancerAlgorithm for LevelEnhancer {
    fn set_parameter(&self, parameter: &DetailEnhancerParameters) -> Result<()> {
        assert_eq!(parameter.level, self.level);
        Ok(())
    }

    fn process(&self, _input: &SurfaceBuffer, output: &mut SurfaceBuffer) -> Result<()> {
        self.log.lock().unwrap().push(self.level);
        if self.succeeds {
            output.data.fill(self.level as u8);
            Ok(())
        } else {
            Err(Error::process_failed("level", "backend failure"))
        }
    }
}

/// One extension per level in `levels`; only `working` succeeds.
fn detail_manager(
    levels: &[DetailEnhancerLevel],
    working: DetailEnhancerLevel,
    log: &LevelLog,
) -> Arc<ExtensionManager> {
    init_tracing();
    let levels = levels.to_vec();
    let log = log.clone();
    let registration = StaticRegistration::new("levels", move |list| {
        for &level in &levels {
            let log = log.clone();
            let ext = DetailEnhancerExtension::new(
                move || {
                    Some(Arc::new(LevelEnhancer {
                        level,
                        succeeds: level == working,
                        log: log.clone(),
                    }) as Arc<dyn DetailEnhancerAlgorithm>)
                },
                move || {
                    vec![DetailEnhancerCapability {
                        levels: vec![level],
                        rank: Rank::Default,
                        version: 1,
                    }]
                },
            );
            list.push(ExtensionDescriptor::detail_enhancer(
                format!("{:?}", level),
                "1",
                ext,
            ));
        }
    });
    ExtensionManager::builder()
        .config(VpeConfig::static_only().with_tracing(TracingConfig::all()))
        .register_static(registration)
        .build()
}

const ALL_LEVELS: [DetailEnhancerLevel; 5] = [
    DetailEnhancerLevel::None,
    DetailEnhancerLevel::Low,
    DetailEnhancerLevel::Medium,
    DetailEnhancerLevel::High,
    DetailEnhancerLevel::HighAisr,
];

fn level_params(level: DetailEnhancerLevel) -> DetailEnhancerParameters {
    DetailEnhancerParameters {
        level,
        ..Default::default()
    }
}

/// Test that failing levels are walked from the nominal level down to the one that
/// succeeds, in order.
#[test]
fn test_ladder_walks_down_in_order() {
    let log = LevelLog::default();
    let manager = detail_manager(&ALL_LEVELS, DetailEnhancerLevel::None, &log);
    let enhancer = DetailEnhancer::new(&manager);
    enhancer.set_parameter(level_params(DetailEnhancerLevel::Medium)).unwrap();

    let input = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
    let mut output = SurfaceBuffer::new(8, 8, PixelFormat::Rgba8888);
    enhancer.process(&input, &mut output).unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            DetailEnhancerLevel::Medium,
            DetailEnhancerLevel::Low,
            DetailEnhancerLevel::None,
        ]
    );
    assert!(output.data.iter().all(|&b| b == 0));
    assert_eq!(enhancer.cached_implementations(), 3);
}

/// Test that a high request on a pure downscale starts at the AISR level.
#[test]
fn test_downscale_starts_at_aisr() {
    let log = LevelLog::default();
    let manager = detail_manager(&ALL_LEVELS, DetailEnhancerLevel::High, &log);
    let enhancer = DetailEnhancer::new(&manager);
    enhancer.set_parameter(level_params(DetailEnhancerLevel::High)).unwrap();

    let input = SurfaceBuffer::new(16, 16, PixelFormat::Rgba8888);
    let mut output = SurfaceBuffer::new(8, 8, PixelFormat::Rgba8888);
    enhancer.process(&input, &mut output).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec![DetailEnhancerLevel::HighAisr, DetailEnhancerLevel::High]
    );
}

/// Test that unregistered levels are skipped; when every level fails the first real
/// failure is reported.
#[test]
fn test_ladder_reports_first_failure() {
    let log = LevelLog::default();
    let manager = detail_manager(
        &[DetailEnhancerLevel::Low, DetailEnhancerLevel::High],
        DetailEnhancerLevel::Video,
        &log,
    );
    let enhancer = DetailEnhancer::new(&manager);
    enhancer.set_parameter(level_params(DetailEnhancerLevel::High)).unwrap();

    let input = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
    let mut output = SurfaceBuffer::new(8, 8, PixelFormat::Rgba8888);
    let err = enhancer.process(&input, &mut output).unwrap_err();
    assert!(matches!(err, Error::ProcessFailed { ref name, .. } if name == "High"));
    assert_eq!(
        *log.lock().unwrap(),
        vec![DetailEnhancerLevel::High, DetailEnhancerLevel::Low]
    );
}

/// Test that a same-size, same-format request is a plain copy.
#[test]
fn test_identity_is_copied() {
    let log = LevelLog::default();
    let manager = detail_manager(&ALL_LEVELS, DetailEnhancerLevel::None, &log);
    let enhancer = DetailEnhancer::new(&manager);
    enhancer.set_parameter(level_params(DetailEnhancerLevel::Medium)).unwrap();

    let mut input = SurfaceBuffer::new(8, 8, PixelFormat::Rgba8888);
    input.data.fill(0x42);
    let mut output = SurfaceBuffer::new(8, 8, PixelFormat::Rgba8888);
    enhancer.process(&input, &mut output).unwrap();
    assert!(output.data.iter().all(|&b| b == 0x42));
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(manager.query_count(), 0);
}

/// Test that the video path targets only the video level and never falls back.
#[test]
fn test_video_path_has_no_ladder() {
    let log = LevelLog::default();
    let manager = detail_manager(&ALL_LEVELS, DetailEnhancerLevel::None, &log);
    let enhancer = DetailEnhancer::video(&manager);

    let input = SurfaceBuffer::new(8, 8, PixelFormat::Nv12);
    let mut output = SurfaceBuffer::new(8, 8, PixelFormat::Nv12);
    let err = enhancer.process(&input, &mut output).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(manager.query_count(), 1);

    let video = detail_manager(&[DetailEnhancerLevel::Video], DetailEnhancerLevel::Video, &log);
    let enhancer = DetailEnhancer::video(&video);
    enhancer.process(&input, &mut output).unwrap();
    assert_eq!(*log.lock().unwrap(), vec![DetailEnhancerLevel::Video]);
}

// ============================================================================
// Contrast enhancer
// ============================================================================

struct Passthrough;

impl ExtensionAlgorithm for Passthrough {}

impl ContrastEnhancerAlgorithm for Passthrough {
    fn process(&self, input: &SurfaceBuffer, output: &mut SurfaceBuffer) -> Result<()> {
        output.copy_from(input)
    }
}

/// Test that a caller racing an in-progress creation gets `TryLater`.
#[test]
fn test_contrast_creation_is_try_lock() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let (e, r) = (entered.clone(), release.clone());
    let manager = ExtensionManager::with_static([StaticRegistration::new("slow", move |list| {
        let (entered, release) = (e.clone(), r.clone());
        let ext = ContrastEnhancerExtension::new(
            move || {
                entered.wait();
                release.wait();
                Some(Arc::new(Passthrough) as Arc<dyn ContrastEnhancerAlgorithm>)
            },
            || {
                vec![ContrastEnhancerCapability {
                    algo_types: vec![ContrastEnhancerType::Lut],
                    rank: Rank::Default,
                    version: 1,
                }]
            },
        );
        list.push(ExtensionDescriptor::contrast_enhancer("slow", "1", ext));
    })]);
    let enhancer = Arc::new(ContrastEnhancer::new(&manager));

    let creator = {
        let enhancer = Arc::clone(&enhancer);
        thread::spawn(move || {
            let input = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
            let mut output = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
            enhancer.process(ContrastEnhancerType::Lut, &input, &mut output)
        })
    };

    entered.wait();
    let input = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
    let mut output = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
    let busy = enhancer.process(ContrastEnhancerType::Lut, &input, &mut output);
    assert!(matches!(busy, Err(Error::TryLater)));
    release.wait();

    creator.join().unwrap().unwrap();
    assert_eq!(enhancer.consecutive_failures(), 0);

    // Created by the other caller; served from the cache now.
    enhancer
        .process(ContrastEnhancerType::Lut, &input, &mut output)
        .unwrap();
    assert_eq!(manager.query_count(), 1);
}
