//! Integration tests for capability selection across registered extensions.
//!
//! These tests drive the extension manager through its public query API with
//! mock extensions registered from static tables.

use std::collections::BTreeMap;
use std::sync::Arc;
use vpe::buffer::SurfaceBuffer;
use vpe::capability::{
    ColorSpaceConverterCapability, ConversionKey, DetailEnhancerCapability,
    build_color_space_converter_map,
};
use vpe::extension::{
    ColorSpaceConverterAlgorithm, ColorSpaceConverterExtension, DetailEnhancerAlgorithm,
    DetailEnhancerExtension, DetailEnhancerLevel, ExtensionAlgorithm, ExtensionDescriptor,
    ExtensionFamily, ExtensionList, ExtensionManager, ExtensionType, Rank, StaticRegistration,
};
use vpe::format::{ColorSpaceDescription, PixelFormat};
use vpe::prelude::Result;

// ============================================================================
// Mock extensions
// ============================================================================

struct Noop;

impl ExtensionAlgorithm for Noop {}

impl ColorSpaceConverterAlgorithm for Noop {
    fn process(&self, input: &SurfaceBuffer, output: &mut SurfaceBuffer) -> Result<()> {
        output.copy_from(input)
    }
}

impl DetailEnhancerAlgorithm for Noop {
    fn process(&self, _input: &SurfaceBuffer, _output: &mut SurfaceBuffer) -> Result<()> {
        Ok(())
    }
}

fn converter(name: &'static str, rank: Rank, version: i32) -> ExtensionDescriptor {
    let ext = ColorSpaceConverterExtension::new(
        || Some(Arc::new(Noop) as Arc<dyn ColorSpaceConverterAlgorithm>),
        move || {
            vec![ColorSpaceConverterCapability {
                input_color_space: ColorSpaceDescription::srgb(),
                output_color_space: ColorSpaceDescription::display_p3(),
                pixel_formats: BTreeMap::from([(
                    PixelFormat::Rgba8888,
                    vec![PixelFormat::Rgba8888],
                )]),
                rank,
                version,
            }]
        },
    );
    ExtensionDescriptor::color_space_converter(name, "1.0", ext)
}

fn detail(
    name: &'static str,
    levels: Vec<DetailEnhancerLevel>,
    rank: Rank,
) -> ExtensionDescriptor {
    let ext = DetailEnhancerExtension::new(
        || Some(Arc::new(Noop) as Arc<dyn DetailEnhancerAlgorithm>),
        move || {
            vec![DetailEnhancerCapability {
                levels: levels.clone(),
                rank,
                version: 1,
            }]
        },
    );
    ExtensionDescriptor::detail_enhancer(name, "1.0", ext)
}

fn srgb_to_p3() -> ConversionKey {
    ConversionKey::new(
        ColorSpaceDescription::srgb(),
        PixelFormat::Rgba8888,
        ColorSpaceDescription::display_p3(),
        PixelFormat::Rgba8888,
    )
}

fn manager_with(
    descriptors: impl Fn() -> Vec<ExtensionDescriptor> + Send + Sync + 'static,
) -> Arc<ExtensionManager> {
    ExtensionManager::with_static([StaticRegistration::new("mock", move |list| {
        list.extend(descriptors());
    })])
}

// ============================================================================
// Rank selection
// ============================================================================

/// Test that a HIGH candidate registered after a DEFAULT one for the same key wins.
#[test]
fn test_high_rank_at_index_one_is_selected() {
    let manager = manager_with(|| {
        vec![
            converter("default", Rank::Default, 1),
            converter("high", Rank::High, 1),
        ]
    });
    let selected = manager.find_color_space_converter(&srgb_to_p3()).unwrap();
    assert_eq!(selected.info.name, "high");
    assert_eq!(selected.rank, Rank::High);

    let list = manager.load_extensions(ExtensionFamily::General);
    let map = build_color_space_converter_map(&list, ExtensionType::ColorSpaceConverter);
    assert_eq!(map.select(&srgb_to_p3()).map(|c| c.index), Some(1));
}

/// Test that HIGH wins regardless of registration order.
#[test]
fn test_high_rank_wins_in_either_order() {
    let manager = manager_with(|| {
        vec![
            converter("high", Rank::High, 1),
            converter("default", Rank::Default, 9),
        ]
    });
    let selected = manager.find_color_space_converter(&srgb_to_p3()).unwrap();
    assert_eq!(selected.info.name, "high");
}

/// Test that the earliest of several HIGH candidates wins.
#[test]
fn test_first_high_candidate_wins() {
    let manager = manager_with(|| {
        vec![
            converter("default", Rank::Default, 5),
            converter("high-a", Rank::High, 1),
            converter("high-b", Rank::High, 2),
        ]
    });
    let selected = manager.find_color_space_converter(&srgb_to_p3()).unwrap();
    assert_eq!(selected.info.name, "high-a");
    assert_eq!(selected.version, 1);
}

// ============================================================================
// Supported / unsupported keys
// ============================================================================

/// Test that registered keys are supported; anything else is not.
#[test]
fn test_registered_keys_only() {
    let manager = manager_with(|| vec![converter("only", Rank::Default, 1)]);
    assert!(manager.is_color_space_conversion_supported(&srgb_to_p3()));

    let reversed = ConversionKey::new(
        ColorSpaceDescription::display_p3(),
        PixelFormat::Rgba8888,
        ColorSpaceDescription::srgb(),
        PixelFormat::Rgba8888,
    );
    assert!(!manager.is_color_space_conversion_supported(&reversed));
    assert!(!manager.is_color_space_conversion_display_supported(&srgb_to_p3()));
    assert!(manager.create_color_space_converter(&reversed).is_err());
}

/// Test that display converters are a separate type within the general family.
#[test]
fn test_display_converters_are_separate() {
    let manager = ExtensionManager::with_static([StaticRegistration::new("display", |list| {
        let ext = ColorSpaceConverterExtension::new(
            || Some(Arc::new(Noop) as Arc<dyn ColorSpaceConverterAlgorithm>),
            || {
                vec![ColorSpaceConverterCapability {
                    input_color_space: ColorSpaceDescription::srgb(),
                    output_color_space: ColorSpaceDescription::display_p3(),
                    pixel_formats: BTreeMap::from([(
                        PixelFormat::Rgba8888,
                        vec![PixelFormat::Rgba8888],
                    )]),
                    rank: Rank::Default,
                    version: 1,
                }]
            },
        );
        list.push(ExtensionDescriptor::color_space_converter_display("display", "1", ext));
    })]);
    assert!(manager.is_color_space_conversion_display_supported(&srgb_to_p3()));
    assert!(!manager.is_color_space_conversion_supported(&srgb_to_p3()));
    assert!(manager.create_color_space_converter_display(&srgb_to_p3()).is_ok());
}

// ============================================================================
// Levels
// ============================================================================

/// Test that each level resolves to the extension holding it.
#[test]
fn test_detail_levels() {
    let manager = manager_with(|| {
        vec![
            detail(
                "basic",
                vec![DetailEnhancerLevel::None, DetailEnhancerLevel::Low],
                Rank::Default,
            ),
            detail("premium", vec![DetailEnhancerLevel::High], Rank::Default),
            detail("premium+", vec![DetailEnhancerLevel::High], Rank::High),
        ]
    });
    let name = |level| manager.find_detail_enhancer(level).map(|s| s.info.name);
    assert_eq!(name(DetailEnhancerLevel::Low).as_deref(), Some("basic"));
    assert_eq!(name(DetailEnhancerLevel::High).as_deref(), Some("premium+"));
    assert_eq!(name(DetailEnhancerLevel::Medium), None);
    assert!(!manager.is_detail_enhancement_supported(DetailEnhancerLevel::Video));
}

// ============================================================================
// Sources
// ============================================================================

/// Test that static registrations contribute in table order and skip missing entries.
#[test]
fn test_static_table_order() {
    let manager = ExtensionManager::builder()
        .config(vpe::config::VpeConfig::static_only())
        .register_static(StaticRegistration::new("first", |list: &mut ExtensionList| {
            list.push(converter("a", Rank::Default, 1));
        }))
        .register_static(StaticRegistration::missing("compiled out"))
        .register_static(StaticRegistration::new("second", |list: &mut ExtensionList| {
            list.push(converter("b", Rank::Default, 1));
        }))
        .build();

    let names: Vec<_> = manager
        .extension_infos(ExtensionFamily::General)
        .into_iter()
        .map(|info| info.name)
        .collect();
    assert_eq!(names, ["a", "b"]);

    // Equal rank: the earliest registration wins.
    let selected = manager.find_color_space_converter(&srgb_to_p3()).unwrap();
    assert_eq!(selected.info.name, "a");
}

/// Test that every query rebuilds the list from the sources.
#[test]
fn test_queries_are_counted() {
    let manager = manager_with(|| vec![converter("only", Rank::Default, 1)]);
    assert_eq!(manager.query_count(), 0);
    for _ in 0..3 {
        assert!(manager.find_color_space_converter(&srgb_to_p3()).is_some());
    }
    assert_eq!(manager.query_count(), 3);
}
