//! Pixel format and color space descriptors.
//!
//! These are small `Copy` value types used as capability-map keys, so all of
//! them are `Eq + Ord + Hash`. Nothing here performs pixel math; the types only
//! describe buffers well enough to pick an extension for them.

use crate::buffer::SurfaceBuffer;
use std::fmt;

// ============================================================================
// Pixel Formats
// ============================================================================

/// Pixel formats (memory layout and bit depth).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum PixelFormat {
    // ========================================================================
    // Packed RGB
    // ========================================================================
    /// RGBA 8-bit per channel (32 bits/pixel).
    #[default]
    Rgba8888 = 0,
    /// BGRA 8-bit per channel (32 bits/pixel).
    Bgra8888,
    /// RGB 8-bit per channel (24 bits/pixel).
    Rgb888,
    /// RGBA 10-bit per color channel, 2-bit alpha (32 bits/pixel).
    Rgba1010102,
    /// RGBA half-float per channel (64 bits/pixel).
    RgbaF16,

    // ========================================================================
    // YUV 4:2:0 semi-planar
    // ========================================================================
    /// Y plane, then interleaved UV plane, 8-bit.
    Nv12,
    /// Y plane, then interleaved VU plane, 8-bit.
    Nv21,
    /// Y plane, then interleaved UV plane, 10-bit in 16-bit words.
    YcbcrP010,
    /// Y plane, then interleaved VU plane, 10-bit in 16-bit words.
    YcrcbP010,
}

impl PixelFormat {
    /// All known pixel formats in declaration order.
    pub const ALL: [PixelFormat; 9] = [
        Self::Rgba8888,
        Self::Bgra8888,
        Self::Rgb888,
        Self::Rgba1010102,
        Self::RgbaF16,
        Self::Nv12,
        Self::Nv21,
        Self::YcbcrP010,
        Self::YcrcbP010,
    ];

    /// Convert from the raw value used across the C ABI.
    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Bits per color sample.
    pub const fn bit_depth(&self) -> u32 {
        match self {
            Self::Rgba8888 | Self::Bgra8888 | Self::Rgb888 | Self::Nv12 | Self::Nv21 => 8,
            Self::Rgba1010102 | Self::YcbcrP010 | Self::YcrcbP010 => 10,
            Self::RgbaF16 => 16,
        }
    }

    /// Returns true if this is a YUV format.
    pub const fn is_yuv(&self) -> bool {
        matches!(
            self,
            Self::Nv12 | Self::Nv21 | Self::YcbcrP010 | Self::YcrcbP010
        )
    }

    /// Returns true if this format carries more than 8 bits per sample.
    pub const fn is_high_bit_depth(&self) -> bool {
        self.bit_depth() > 8
    }

    /// Minimum row stride in bytes for a frame `width` pixels wide, or
    /// `None` if it does not fit in a `u32`.
    pub const fn min_stride(&self, width: u32) -> Option<u32> {
        match self {
            Self::Rgba8888 | Self::Bgra8888 | Self::Rgba1010102 => width.checked_mul(4),
            Self::Rgb888 => width.checked_mul(3),
            Self::RgbaF16 => width.checked_mul(8),
            Self::Nv12 | Self::Nv21 => Some(width),
            Self::YcbcrP010 | Self::YcrcbP010 => width.checked_mul(2),
        }
    }

    /// Number of stride-sized rows a frame of `height` lines occupies.
    ///
    /// Semi-planar 4:2:0 formats store a half-height chroma plane after luma.
    pub const fn row_count(&self, height: u32) -> usize {
        let h = height as usize;
        if self.is_yuv() { h + h.div_ceil(2) } else { h }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// Color Space
// ============================================================================

/// Color primaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum ColorPrimaries {
    /// BT.709 / sRGB primaries.
    #[default]
    Bt709 = 1,
    /// BT.601 (625-line).
    Bt601,
    /// BT.2020 wide gamut.
    Bt2020,
    /// DCI-P3 with D65 white point (Display P3).
    P3D65,
    /// Adobe RGB (1998).
    AdobeRgb,
}

/// Transfer characteristics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum TransferFunc {
    /// sRGB piecewise gamma.
    #[default]
    Srgb = 1,
    /// BT.709 gamma.
    Bt709,
    /// Linear light.
    Linear,
    /// SMPTE ST 2084 perceptual quantizer.
    Pq,
    /// ARIB STD-B67 hybrid log-gamma.
    Hlg,
    /// Pure gamma 2.2.
    Gamma2_2,
}

/// YUV matrix coefficients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum MatrixCoefficients {
    /// BT.601.
    #[default]
    Bt601 = 1,
    /// BT.709.
    Bt709,
    /// BT.2020 non-constant luminance.
    Bt2020Ncl,
}

/// Quantization range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum ColorRange {
    /// Full range (0-255 for 8-bit).
    #[default]
    Full = 1,
    /// Limited/studio range (16-235 for 8-bit luma).
    Limited,
}

impl ColorPrimaries {
    /// Convert from the raw value used across the C ABI.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Self::Bt709),
            2 => Some(Self::Bt601),
            3 => Some(Self::Bt2020),
            4 => Some(Self::P3D65),
            5 => Some(Self::AdobeRgb),
            _ => None,
        }
    }
}

impl TransferFunc {
    /// Convert from the raw value used across the C ABI.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Self::Srgb),
            2 => Some(Self::Bt709),
            3 => Some(Self::Linear),
            4 => Some(Self::Pq),
            5 => Some(Self::Hlg),
            6 => Some(Self::Gamma2_2),
            _ => None,
        }
    }
}

impl MatrixCoefficients {
    /// Convert from the raw value used across the C ABI.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Self::Bt601),
            2 => Some(Self::Bt709),
            3 => Some(Self::Bt2020Ncl),
            _ => None,
        }
    }
}

impl ColorRange {
    /// Convert from the raw value used across the C ABI.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Self::Full),
            2 => Some(Self::Limited),
            _ => None,
        }
    }
}

/// Complete color space of a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ColorSpaceInfo {
    /// Color primaries.
    pub primaries: ColorPrimaries,
    /// Transfer function.
    pub transfer: TransferFunc,
    /// Matrix coefficients (only meaningful for YUV layouts).
    pub matrix: MatrixCoefficients,
    /// Quantization range.
    pub range: ColorRange,
}

impl ColorSpaceInfo {
    /// Create a color space from its components.
    pub const fn new(
        primaries: ColorPrimaries,
        transfer: TransferFunc,
        matrix: MatrixCoefficients,
        range: ColorRange,
    ) -> Self {
        Self {
            primaries,
            transfer,
            matrix,
            range,
        }
    }

    /// sRGB, full range.
    pub const SRGB: Self = Self::new(
        ColorPrimaries::Bt709,
        TransferFunc::Srgb,
        MatrixCoefficients::Bt601,
        ColorRange::Full,
    );

    /// Display P3, full range.
    pub const DISPLAY_P3: Self = Self::new(
        ColorPrimaries::P3D65,
        TransferFunc::Srgb,
        MatrixCoefficients::Bt601,
        ColorRange::Full,
    );

    /// BT.709 limited range (SDR video).
    pub const BT709_LIMITED: Self = Self::new(
        ColorPrimaries::Bt709,
        TransferFunc::Bt709,
        MatrixCoefficients::Bt709,
        ColorRange::Limited,
    );

    /// BT.2020 HLG limited range.
    pub const BT2020_HLG_LIMITED: Self = Self::new(
        ColorPrimaries::Bt2020,
        TransferFunc::Hlg,
        MatrixCoefficients::Bt2020Ncl,
        ColorRange::Limited,
    );

    /// BT.2020 PQ limited range.
    pub const BT2020_PQ_LIMITED: Self = Self::new(
        ColorPrimaries::Bt2020,
        TransferFunc::Pq,
        MatrixCoefficients::Bt2020Ncl,
        ColorRange::Limited,
    );

    /// Returns true for HDR transfer functions.
    pub const fn is_hdr(&self) -> bool {
        matches!(self.transfer, TransferFunc::Pq | TransferFunc::Hlg)
    }
}

/// HDR metadata layout attached to a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum HdrMetadataType {
    /// No HDR metadata (SDR content or plain base layer).
    #[default]
    None = 0,
    /// HLG video.
    VideoHlg,
    /// HDR10 video with static metadata.
    VideoHdr10,
    /// HDR Vivid video with dynamic metadata.
    VideoHdrVivid,
    /// HDR Vivid image, base + gainmap layers.
    ImageHdrVividDual,
    /// HDR Vivid image, single layer.
    ImageHdrVividSingle,
    /// ISO 21496-1 image, base + gainmap layers.
    ImageHdrIsoDual,
    /// ISO 21496-1 image, single layer.
    ImageHdrIsoSingle,
}

impl HdrMetadataType {
    /// Convert from the raw value used across the C ABI.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::VideoHlg),
            2 => Some(Self::VideoHdr10),
            3 => Some(Self::VideoHdrVivid),
            4 => Some(Self::ImageHdrVividDual),
            5 => Some(Self::ImageHdrVividSingle),
            6 => Some(Self::ImageHdrIsoDual),
            7 => Some(Self::ImageHdrIsoSingle),
            _ => None,
        }
    }
}

/// A color space together with the HDR metadata layout.
///
/// Used as the color half of every format capability key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ColorSpaceDescription {
    /// The buffer color space.
    pub color_space_info: ColorSpaceInfo,
    /// Metadata layout.
    pub metadata_type: HdrMetadataType,
}

impl ColorSpaceDescription {
    /// Create a description.
    pub const fn new(color_space_info: ColorSpaceInfo, metadata_type: HdrMetadataType) -> Self {
        Self {
            color_space_info,
            metadata_type,
        }
    }

    /// sRGB with no HDR metadata.
    pub const fn srgb() -> Self {
        Self::new(ColorSpaceInfo::SRGB, HdrMetadataType::None)
    }

    /// Display P3 with no HDR metadata.
    pub const fn display_p3() -> Self {
        Self::new(ColorSpaceInfo::DISPLAY_P3, HdrMetadataType::None)
    }

    /// Describe the color space carried by a buffer.
    pub fn from_buffer(buffer: &SurfaceBuffer) -> Self {
        Self::new(buffer.color_space, buffer.metadata_type)
    }
}

impl fmt::Display for ColorSpaceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.color_space_info;
        write!(
            f,
            "{:?}/{:?}/{:?}/{:?}+{:?}",
            c.primaries, c.transfer, c.matrix, c.range, self.metadata_type
        )
    }
}

// ============================================================================
// Frame Info
// ============================================================================

/// Read-only geometry, format and color description of one buffer.
///
/// Computed once per call from a [`SurfaceBuffer`] and used only to build
/// capability keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row stride in bytes.
    pub width_stride: u32,
    /// Allocated height in rows.
    pub height_stride: u32,
    /// Bits per sample.
    pub bit_depth: u32,
    /// Pixel format.
    pub pixel_format: PixelFormat,
    /// Color space and metadata layout.
    pub color_space: ColorSpaceDescription,
}

impl FrameInfo {
    /// Describe a buffer.
    pub fn from_buffer(buffer: &SurfaceBuffer) -> Self {
        Self {
            width: buffer.width,
            height: buffer.height,
            width_stride: buffer.stride,
            height_stride: buffer.height_stride,
            bit_depth: buffer.format.bit_depth(),
            pixel_format: buffer.format,
            color_space: ColorSpaceDescription::from_buffer(buffer),
        }
    }

    /// Returns true if both frames have identical geometry and layout.
    pub fn same_geometry(&self, other: &FrameInfo) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.pixel_format == other.pixel_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_from_raw() {
        assert_eq!(PixelFormat::from_raw(0), Some(PixelFormat::Rgba8888));
        assert_eq!(PixelFormat::from_raw(5), Some(PixelFormat::Nv12));
        assert_eq!(PixelFormat::from_raw(-1), None);
        assert_eq!(PixelFormat::from_raw(99), None);
    }

    #[test]
    fn test_bit_depth() {
        assert_eq!(PixelFormat::Rgba8888.bit_depth(), 8);
        assert_eq!(PixelFormat::Rgba1010102.bit_depth(), 10);
        assert_eq!(PixelFormat::YcbcrP010.bit_depth(), 10);
        assert!(PixelFormat::YcrcbP010.is_high_bit_depth());
        assert!(!PixelFormat::Nv21.is_high_bit_depth());
    }

    #[test]
    fn test_row_count() {
        assert_eq!(PixelFormat::Rgba8888.row_count(100), 100);
        assert_eq!(PixelFormat::Nv12.row_count(100), 150);
        assert_eq!(PixelFormat::Nv12.row_count(101), 152);
    }

    #[test]
    fn test_color_space_description_ordering() {
        let srgb = ColorSpaceDescription::srgb();
        let p3 = ColorSpaceDescription::display_p3();
        assert_ne!(srgb, p3);
        // Ord must be total so the type can key a BTreeMap.
        assert!(srgb < p3 || p3 < srgb);
    }

    #[test]
    fn test_hdr_detection() {
        assert!(ColorSpaceInfo::BT2020_PQ_LIMITED.is_hdr());
        assert!(ColorSpaceInfo::BT2020_HLG_LIMITED.is_hdr());
        assert!(!ColorSpaceInfo::SRGB.is_hdr());
    }

    #[test]
    fn test_frame_info_from_buffer() {
        let buffer = SurfaceBuffer::new(64, 32, PixelFormat::YcbcrP010)
            .with_color_space(ColorSpaceInfo::BT2020_HLG_LIMITED)
            .with_metadata_type(HdrMetadataType::VideoHlg);
        let info = FrameInfo::from_buffer(&buffer);
        assert_eq!(info.width, 64);
        assert_eq!(info.height, 32);
        assert_eq!(info.bit_depth, 10);
        assert_eq!(info.width_stride, buffer.stride);
        assert_eq!(
            info.color_space.metadata_type,
            HdrMetadataType::VideoHlg
        );
    }
}
