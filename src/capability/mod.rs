//! Capability declarations, capability maps and selection.
//!
//! # Architecture
//!
//! ```text
//! ExtensionList ──► build_*_map ──► CapabilityMap<K> / LevelMap<K> ──► select(K)
//!   (ordered)        (per family)     key -> [(rank, version, index)]    one winner
//! ```
//!
//! Every family uses the same build algorithm: for each descriptor of the
//! family's type, run its capability builder and insert one
//! [`Candidate`] per advertised key. Families differ only in key shape.

mod builder;
mod key;
mod map;

pub use builder::{
    build_aihdr_enhancer_map, build_color_space_converter_map, build_contrast_enhancer_map,
    build_detail_enhancer_map, build_metadata_generator_map, build_vrr_map,
};
pub use key::{ConversionKey, MetadataGenerationKey};
pub use map::{CapabilityMap, Candidate, LevelMap};

use crate::extension::{
    ContrastEnhancerType, DetailEnhancerLevel, MetadataGeneratorAlgoType, Rank,
};
use crate::format::{ColorSpaceDescription, PixelFormat};
use std::collections::BTreeMap;

/// A declared capability: the keys it covers plus rank and version.
pub trait Capability {
    /// Key shape of the family.
    type Key: Ord;

    /// Every key this declaration covers.
    fn keys(&self) -> Vec<Self::Key>;

    /// Priority tier.
    fn rank(&self) -> Rank;

    /// Capability version.
    fn version(&self) -> i32;
}

/// Conversion capability: one color space pair and a map from each supported
/// input pixel format to the output pixel formats reachable from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorSpaceConverterCapability {
    /// Input color space.
    pub input_color_space: ColorSpaceDescription,
    /// Output color space.
    pub output_color_space: ColorSpaceDescription,
    /// Input format -> output formats.
    pub pixel_formats: BTreeMap<PixelFormat, Vec<PixelFormat>>,
    /// Priority tier.
    pub rank: Rank,
    /// Capability version.
    pub version: i32,
}

impl Capability for ColorSpaceConverterCapability {
    type Key = ConversionKey;

    fn keys(&self) -> Vec<ConversionKey> {
        self.pixel_formats
            .iter()
            .flat_map(|(input, outputs)| {
                outputs.iter().map(move |output| {
                    ConversionKey::new(
                        self.input_color_space,
                        *input,
                        self.output_color_space,
                        *output,
                    )
                })
            })
            .collect()
    }

    fn rank(&self) -> Rank {
        self.rank
    }

    fn version(&self) -> i32 {
        self.version
    }
}

/// Metadata generation capability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataGeneratorCapability {
    /// Supported color space.
    pub color_space: ColorSpaceDescription,
    /// Supported pixel formats.
    pub pixel_formats: Vec<PixelFormat>,
    /// Generation algorithm.
    pub algo: MetadataGeneratorAlgoType,
    /// Priority tier.
    pub rank: Rank,
    /// Capability version.
    pub version: i32,
}

impl Capability for MetadataGeneratorCapability {
    type Key = MetadataGenerationKey;

    fn keys(&self) -> Vec<MetadataGenerationKey> {
        self.pixel_formats
            .iter()
            .map(|format| MetadataGenerationKey::new(self.color_space, *format, self.algo))
            .collect()
    }

    fn rank(&self) -> Rank {
        self.rank
    }

    fn version(&self) -> i32 {
        self.version
    }
}

/// Detail enhancement capability: the quality levels an extension serves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailEnhancerCapability {
    /// Supported levels.
    pub levels: Vec<DetailEnhancerLevel>,
    /// Priority tier.
    pub rank: Rank,
    /// Capability version.
    pub version: i32,
}

impl Capability for DetailEnhancerCapability {
    type Key = DetailEnhancerLevel;

    fn keys(&self) -> Vec<DetailEnhancerLevel> {
        self.levels.clone()
    }

    fn rank(&self) -> Rank {
        self.rank
    }

    fn version(&self) -> i32 {
        self.version
    }
}

/// AI HDR enhancement capability: the input pixel formats served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AihdrEnhancerCapability {
    /// Supported pixel formats.
    pub pixel_formats: Vec<PixelFormat>,
    /// Priority tier.
    pub rank: Rank,
    /// Capability version.
    pub version: i32,
}

impl Capability for AihdrEnhancerCapability {
    type Key = PixelFormat;

    fn keys(&self) -> Vec<PixelFormat> {
        self.pixel_formats.clone()
    }

    fn rank(&self) -> Rank {
        self.rank
    }

    fn version(&self) -> i32 {
        self.version
    }
}

/// Contrast enhancement capability: the algorithm types served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContrastEnhancerCapability {
    /// Supported algorithm types.
    pub algo_types: Vec<ContrastEnhancerType>,
    /// Priority tier.
    pub rank: Rank,
    /// Capability version.
    pub version: i32,
}

impl Capability for ContrastEnhancerCapability {
    type Key = ContrastEnhancerType;

    fn keys(&self) -> Vec<ContrastEnhancerType> {
        self.algo_types.clone()
    }

    fn rank(&self) -> Rank {
        self.rank
    }

    fn version(&self) -> i32 {
        self.version
    }
}

/// VRR capability. VRR has a single, unit key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VrrCapability {
    /// Priority tier.
    pub rank: Rank,
    /// Capability version.
    pub version: i32,
}

impl Capability for VrrCapability {
    type Key = ();

    fn keys(&self) -> Vec<()> {
        vec![()]
    }

    fn rank(&self) -> Rank {
        self.rank
    }

    fn version(&self) -> i32 {
        self.version
    }
}
