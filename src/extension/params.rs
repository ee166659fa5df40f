//! Parameter types pushed into algorithm objects.

use crate::error::{Error, Result};

// ============================================================================
// Color space converter
// ============================================================================

/// Gamut mapping strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum RenderIntent {
    /// Compress the whole gamut.
    #[default]
    Perceptual = 0,
    /// Clip out-of-gamut colors, map white points.
    RelativeColorimetric,
    /// Clip out-of-gamut colors, keep white points.
    AbsoluteColorimetric,
    /// Preserve saturation.
    Saturation,
}

/// Color space converter parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorSpaceConverterParameter {
    /// Gamut mapping strategy.
    pub render_intent: RenderIntent,
    /// Brightness of SDR UI elements in nits, used by HDR tone mapping.
    pub sdr_ui_brightness: f32,
}

impl Default for ColorSpaceConverterParameter {
    fn default() -> Self {
        Self {
            render_intent: RenderIntent::default(),
            sdr_ui_brightness: 500.0,
        }
    }
}

impl ColorSpaceConverterParameter {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.sdr_ui_brightness.is_finite() || self.sdr_ui_brightness <= 0.0 {
            return Err(Error::invalid(format!(
                "sdr_ui_brightness must be positive, got {}",
                self.sdr_ui_brightness
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Metadata generator
// ============================================================================

/// Metadata generation algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum MetadataGeneratorAlgoType {
    /// Still image statistics.
    #[default]
    Image = 0,
    /// Video frame statistics.
    Video,
}

/// Metadata generator parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MetadataGeneratorParameter {
    /// Algorithm to run.
    pub algo: MetadataGeneratorAlgoType,
}

// ============================================================================
// Detail enhancer
// ============================================================================

/// Detail enhancement quality level.
///
/// Levels are ordered by quality. [`DetailEnhancerLevel::Video`] is outside
/// the quality ladder and is only used by the video sub-path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(i32)]
pub enum DetailEnhancerLevel {
    /// Plain scaling.
    #[default]
    None = 0,
    /// Low quality.
    Low = 1,
    /// Medium quality.
    Medium = 2,
    /// High quality.
    High = 3,
    /// High quality with AI super resolution.
    HighAisr = 4,
    /// Dedicated high-throughput video level.
    Video = 5,
}

impl DetailEnhancerLevel {
    /// Convert from the raw value used across the C ABI.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            4 => Some(Self::HighAisr),
            5 => Some(Self::Video),
            _ => None,
        }
    }

    /// The next lower quality level, or `None` at the bottom of the ladder.
    pub const fn lower(&self) -> Option<Self> {
        match self {
            Self::HighAisr => Some(Self::High),
            Self::High => Some(Self::Medium),
            Self::Medium => Some(Self::Low),
            Self::Low => Some(Self::None),
            Self::None | Self::Video => None,
        }
    }

    /// Iterate from this level down to [`DetailEnhancerLevel::None`].
    pub fn descending(self) -> impl Iterator<Item = DetailEnhancerLevel> {
        std::iter::successors(Some(self), |level| level.lower())
    }

    /// Returns true for levels backed by an AI model.
    pub const fn is_ai(&self) -> bool {
        matches!(self, Self::HighAisr)
    }
}

/// Detail enhancer parameters.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct DetailEnhancerParameters {
    /// Model or resource locator, forwarded to the extension unchanged.
    pub uri: String,
    /// Requested quality level.
    pub level: DetailEnhancerLevel,
}

// ============================================================================
// AI HDR enhancer
// ============================================================================

/// AI HDR enhancer parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AihdrEnhancerParameter {
    /// Target peak luminance in nits.
    pub peak_luminance: f32,
}

impl Default for AihdrEnhancerParameter {
    fn default() -> Self {
        Self {
            peak_luminance: 1000.0,
        }
    }
}

// ============================================================================
// Contrast enhancer
// ============================================================================

/// Contrast enhancement algorithm type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum ContrastEnhancerType {
    /// Global LUT-based enhancement.
    #[default]
    Lut = 0,
    /// Region-adaptive enhancement.
    Region,
}

/// Contrast enhancer parameters.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ContrastEnhancerParameters {
    /// Model or resource locator.
    pub uri: String,
}
