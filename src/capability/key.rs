//! Capability keys.
//!
//! Each operation family discriminates extensions by a different key shape,
//! but all of them are plain ordered values so one map type serves every
//! family.

use crate::extension::MetadataGeneratorAlgoType;
use crate::format::{ColorSpaceDescription, FrameInfo, PixelFormat};
use std::fmt;

/// Input/output color space and pixel format of a conversion.
///
/// Keys the color space converter, display converter, composer and
/// decomposer maps, and the per-format-pair façade caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversionKey {
    /// Input color space.
    pub input_color_space: ColorSpaceDescription,
    /// Input pixel format.
    pub input_format: PixelFormat,
    /// Output color space.
    pub output_color_space: ColorSpaceDescription,
    /// Output pixel format.
    pub output_format: PixelFormat,
}

impl ConversionKey {
    /// Create a key from its parts.
    pub const fn new(
        input_color_space: ColorSpaceDescription,
        input_format: PixelFormat,
        output_color_space: ColorSpaceDescription,
        output_format: PixelFormat,
    ) -> Self {
        Self {
            input_color_space,
            input_format,
            output_color_space,
            output_format,
        }
    }

    /// Key for converting the frame described by `input` into `output`.
    pub fn from_frames(input: &FrameInfo, output: &FrameInfo) -> Self {
        Self::new(
            input.color_space,
            input.pixel_format,
            output.color_space,
            output.pixel_format,
        )
    }
}

impl fmt::Display for ConversionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} {}) -> ({} {})",
            self.input_color_space, self.input_format, self.output_color_space, self.output_format
        )
    }
}

/// Color space, pixel format and algorithm of a metadata generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetadataGenerationKey {
    /// Buffer color space.
    pub color_space: ColorSpaceDescription,
    /// Buffer pixel format.
    pub pixel_format: PixelFormat,
    /// Generation algorithm.
    pub algo: MetadataGeneratorAlgoType,
}

impl MetadataGenerationKey {
    /// Create a key from its parts.
    pub const fn new(
        color_space: ColorSpaceDescription,
        pixel_format: PixelFormat,
        algo: MetadataGeneratorAlgoType,
    ) -> Self {
        Self {
            color_space,
            pixel_format,
            algo,
        }
    }
}

impl fmt::Display for MetadataGenerationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {}) {:?}", self.color_space, self.pixel_format, self.algo)
    }
}
