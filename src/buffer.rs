//! Native surface buffer shape consumed by the façades.
//!
//! Platform buffer handles are converted into [`SurfaceBuffer`] by the
//! marshalling layer before they reach the dispatcher. The dispatcher itself
//! only reads geometry and color fields; extensions read and write `data`.

use crate::error::{Error, Result};
use crate::format::{ColorSpaceInfo, HdrMetadataType, PixelFormat};

/// HDR metadata blobs attached to a buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HdrMetadata {
    /// Static metadata (mastering display, content light level).
    pub static_metadata: Vec<u8>,
    /// Per-frame dynamic metadata.
    pub dynamic_metadata: Vec<u8>,
}

impl HdrMetadata {
    /// Returns true if neither blob is present.
    pub fn is_empty(&self) -> bool {
        self.static_metadata.is_empty() && self.dynamic_metadata.is_empty()
    }
}

/// A CPU-visible image buffer with its format description.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row stride in bytes.
    pub stride: u32,
    /// Allocated height in rows (>= `height`).
    pub height_stride: u32,
    /// Pixel format.
    pub format: PixelFormat,
    /// Color space.
    pub color_space: ColorSpaceInfo,
    /// HDR metadata layout.
    pub metadata_type: HdrMetadataType,
    /// HDR metadata blobs.
    pub metadata: HdrMetadata,
    /// Pixel data, `stride * format.row_count(height_stride)` bytes.
    pub data: Vec<u8>,
}

impl SurfaceBuffer {
    /// Allocate a zeroed, tightly packed buffer.
    ///
    /// A width whose row stride overflows gets a zero stride and no data, so
    /// the buffer fails [`validate`](Self::validate).
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let stride = format.min_stride(width).unwrap_or(0);
        let len = (stride as usize)
            .checked_mul(format.row_count(height))
            .unwrap_or(0);
        Self {
            width,
            height,
            stride,
            height_stride: height,
            format,
            color_space: ColorSpaceInfo::SRGB,
            metadata_type: HdrMetadataType::None,
            metadata: HdrMetadata::default(),
            data: vec![0; len],
        }
    }

    /// Set the color space.
    pub fn with_color_space(mut self, color_space: ColorSpaceInfo) -> Self {
        self.color_space = color_space;
        self
    }

    /// Set the HDR metadata layout.
    pub fn with_metadata_type(mut self, metadata_type: HdrMetadataType) -> Self {
        self.metadata_type = metadata_type;
        self
    }

    /// Bytes of pixel data in one row.
    pub fn row_bytes(&self) -> Result<usize> {
        self.format
            .min_stride(self.width)
            .map(|bytes| bytes as usize)
            .ok_or_else(|| {
                Error::invalid(format!(
                    "width {} of {} overflows the row size",
                    self.width, self.format
                ))
            })
    }

    /// Number of bytes `data` must hold for the declared geometry.
    pub fn required_len(&self) -> Result<usize> {
        (self.stride as usize)
            .checked_mul(self.format.row_count(self.height_stride))
            .ok_or_else(|| {
                Error::invalid(format!(
                    "stride {} over {} rows overflows the buffer size",
                    self.stride, self.height_stride
                ))
            })
    }

    /// Check that the declared geometry is consistent with the data.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid(format!(
                "buffer has empty geometry {}x{}",
                self.width, self.height
            )));
        }
        if (self.stride as usize) < self.row_bytes()? {
            return Err(Error::invalid(format!(
                "stride {} too small for {} pixels of {}",
                self.stride, self.width, self.format
            )));
        }
        if self.height_stride < self.height {
            return Err(Error::invalid(format!(
                "height stride {} below height {}",
                self.height_stride, self.height
            )));
        }
        let required = self.required_len()?;
        if self.data.len() < required {
            return Err(Error::invalid(format!(
                "buffer data too small: {} < {}",
                self.data.len(),
                required
            )));
        }
        Ok(())
    }

    /// Copy pixels row by row from a buffer of identical size and format.
    ///
    /// Strides may differ. Color space, metadata type and metadata blobs are
    /// carried over as well.
    pub fn copy_from(&mut self, src: &SurfaceBuffer) -> Result<()> {
        if self.width != src.width || self.height != src.height || self.format != src.format {
            return Err(Error::invalid(format!(
                "cannot copy {}x{} {} into {}x{} {}",
                src.width, src.height, src.format, self.width, self.height, self.format
            )));
        }
        src.validate()?;
        self.validate()?;

        let row_bytes = self.row_bytes()?;
        let src_stride = src.stride as usize;
        let dst_stride = self.stride as usize;

        if src_stride == dst_stride && src.height_stride == self.height_stride {
            let len = self.required_len()?;
            self.data[..len].copy_from_slice(&src.data[..len]);
        } else {
            // Luma rows first, then the chroma plane starting after height_stride rows.
            let luma_rows = self.height as usize;
            for row in 0..luma_rows {
                let s = row * src_stride;
                let d = row * dst_stride;
                self.data[d..d + row_bytes].copy_from_slice(&src.data[s..s + row_bytes]);
            }
            if self.format.is_yuv() {
                let chroma_rows = self.format.row_count(self.height) - luma_rows;
                let src_base = src.height_stride as usize * src_stride;
                let dst_base = self.height_stride as usize * dst_stride;
                for row in 0..chroma_rows {
                    let s = src_base + row * src_stride;
                    let d = dst_base + row * dst_stride;
                    self.data[d..d + row_bytes].copy_from_slice(&src.data[s..s + row_bytes]);
                }
            }
        }

        self.color_space = src.color_space;
        self.metadata_type = src.metadata_type;
        self.metadata = src.metadata.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_valid() {
        let buf = SurfaceBuffer::new(16, 8, PixelFormat::Rgba8888);
        assert_eq!(buf.stride, 64);
        assert_eq!(buf.data.len(), 64 * 8);
        assert!(buf.validate().is_ok());
    }

    #[test]
    fn test_yuv_buffer_size() {
        let buf = SurfaceBuffer::new(16, 8, PixelFormat::Nv12);
        assert_eq!(buf.data.len(), 16 * 12);
    }

    #[test]
    fn test_validate_rejects_empty_geometry() {
        let buf = SurfaceBuffer::new(0, 8, PixelFormat::Rgba8888);
        assert!(matches!(buf.validate(), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_validate_rejects_short_data() {
        let mut buf = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
        buf.data.truncate(10);
        assert!(buf.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overflowing_width() {
        let buf = SurfaceBuffer {
            width: 0x2000_0001,
            height: 1,
            stride: 8,
            height_stride: 1,
            format: PixelFormat::RgbaF16,
            color_space: ColorSpaceInfo::SRGB,
            metadata_type: HdrMetadataType::None,
            metadata: HdrMetadata::default(),
            data: vec![0; 8],
        };
        assert!(matches!(buf.validate(), Err(Error::InvalidValue(_))));
        assert!(buf.row_bytes().is_err());
    }

    #[test]
    fn test_overflowing_width_allocates_nothing() {
        let buf = SurfaceBuffer::new(u32::MAX, 4, PixelFormat::Rgba8888);
        assert_eq!(buf.stride, 0);
        assert!(buf.data.is_empty());
        assert!(matches!(buf.validate(), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_copy_from_same_stride() {
        let mut src = SurfaceBuffer::new(4, 2, PixelFormat::Rgba8888);
        src.data.iter_mut().enumerate().for_each(|(i, b)| *b = i as u8);
        let mut dst = SurfaceBuffer::new(4, 2, PixelFormat::Rgba8888);
        dst.copy_from(&src).unwrap();
        assert_eq!(dst.data, src.data);
    }

    #[test]
    fn test_copy_from_different_stride() {
        let mut src = SurfaceBuffer::new(2, 2, PixelFormat::Nv12);
        src.data.iter_mut().enumerate().for_each(|(i, b)| *b = i as u8 + 1);

        let mut dst = SurfaceBuffer::new(2, 2, PixelFormat::Nv12);
        dst.stride = 4;
        dst.data = vec![0; 4 * 3];
        dst.copy_from(&src).unwrap();

        // Row 0 and 1 luma, row 2 chroma; padding bytes stay zero.
        assert_eq!(&dst.data[0..2], &src.data[0..2]);
        assert_eq!(&dst.data[4..6], &src.data[2..4]);
        assert_eq!(&dst.data[8..10], &src.data[4..6]);
        assert_eq!(dst.data[2], 0);
    }

    #[test]
    fn test_copy_from_mismatched_format() {
        let src = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
        let mut dst = SurfaceBuffer::new(4, 4, PixelFormat::Bgra8888);
        assert!(dst.copy_from(&src).is_err());
    }
}
