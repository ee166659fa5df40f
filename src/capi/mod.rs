//! C entry points.
//!
//! Every façade family exposes `create`, `process_image` and `destroy`
//! functions over integer instance ids. Ids come from the process-wide
//! [`VpeRuntime`], built on first use from [`VpeConfig::from_env`] unless a
//! runtime was installed earlier with [`VpeRuntime::install`].
//!
//! # Status codes
//!
//! Every function returns a [`VpeAlgoErrCode`] as `i32`. Null pointers and
//! ids of the wrong family are `InvalidVal`; a full instance table is
//! `NoMemory`.
//!
//! # Buffers
//!
//! Buffers cross the boundary as [`VpeImageBuffer`] descriptors. Input
//! pixels are copied in before the façade runs and output pixels are copied
//! back after it succeeds, so a failed call leaves the caller's output
//! untouched.

use crate::buffer::{HdrMetadata, SurfaceBuffer};
use crate::config::VpeConfig;
use crate::error::{Error, Result};
use crate::extension::{DetailEnhancerLevel, DetailEnhancerParameters, ExtensionManager};
use crate::facade::{
    AihdrEnhancer, ColorSpaceConverter, DetailEnhancer, Facade, MetadataGenerator, VpeHandle,
};
use crate::format::{
    ColorPrimaries, ColorRange, ColorSpaceInfo, HdrMetadataType, MatrixCoefficients, PixelFormat,
    TransferFunc,
};
use crate::instance::{InstanceId, InstanceTable};
use crate::observability::init_metrics;
use crate::status::VpeAlgoErrCode;
use std::sync::{Arc, OnceLock};

// ============================================================================
// Runtime
// ============================================================================

static RUNTIME: OnceLock<VpeRuntime> = OnceLock::new();

/// Extension manager and instance table shared by every C entry point.
pub struct VpeRuntime {
    manager: Arc<ExtensionManager>,
    instances: InstanceTable<VpeHandle>,
}

impl VpeRuntime {
    /// Runtime over `manager` with an empty instance table.
    ///
    /// Also describes the crate's metrics to the installed recorder.
    pub fn new(manager: Arc<ExtensionManager>) -> Self {
        init_metrics();
        Self {
            manager,
            instances: InstanceTable::new(),
        }
    }

    /// Runtime built from `config`, with no static registrations.
    pub fn from_config(config: VpeConfig) -> Self {
        Self::new(ExtensionManager::builder().config(config).build())
    }

    /// Make `runtime` the process-wide runtime.
    ///
    /// Fails, returning `runtime`, if one is already in place.
    pub fn install(runtime: VpeRuntime) -> std::result::Result<&'static VpeRuntime, VpeRuntime> {
        RUNTIME.set(runtime)?;
        Ok(Self::global())
    }

    /// The process-wide runtime, built from the environment on first use.
    pub fn global() -> &'static VpeRuntime {
        RUNTIME.get_or_init(|| {
            tracing::info!("initializing vpe runtime from environment");
            Self::from_config(VpeConfig::from_env())
        })
    }

    /// The runtime's extension manager.
    pub fn manager(&self) -> &Arc<ExtensionManager> {
        &self.manager
    }

    /// The runtime's instance table.
    pub fn instances(&self) -> &InstanceTable<VpeHandle> {
        &self.instances
    }

    /// Store `handle` and return its id.
    pub fn create(&self, handle: VpeHandle) -> Result<InstanceId> {
        let family = handle.family();
        let id = self.instances.new_instance_id(handle)?;
        tracing::debug!("created {} instance {:?}", family, id);
        Ok(id)
    }

    /// The handle behind `id`.
    pub fn handle(&self, id: InstanceId) -> Result<VpeHandle> {
        self.instances
            .get_instance(id)
            .ok_or(Error::InvalidInstance(id.as_raw()))
    }

    /// Remove `id` if it refers to a `family` façade, then reset it.
    ///
    /// The façade itself drops once in-flight calls holding it return.
    pub fn destroy(&self, id: &mut InstanceId, family: &'static str) -> Result<()> {
        let handle = self.handle(*id)?;
        if handle.family() != family {
            tracing::warn!(
                "instance {:?} is a {}, not a {}",
                id,
                handle.family(),
                family
            );
            return Err(Error::InvalidInstance(id.as_raw()));
        }
        drop(handle);
        let removed = self.instances.remove_instance_reference(id)?;
        tracing::debug!("destroyed {} instance", removed.family());
        Ok(())
    }
}

impl std::fmt::Debug for VpeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VpeRuntime")
            .field("manager", &self.manager)
            .field("instances", &self.instances)
            .finish()
    }
}

// ============================================================================
// Buffer descriptor
// ============================================================================

/// Image buffer as seen by C callers.
///
/// Enum fields carry the raw values of [`PixelFormat`], [`ColorPrimaries`],
/// [`TransferFunc`], [`MatrixCoefficients`], [`ColorRange`] and
/// [`HdrMetadataType`]. `static_metadata` may be null; when present, up to
/// `static_metadata_capacity` bytes of generated metadata are written to it
/// and `static_metadata_len` is set.
#[repr(C)]
#[derive(Debug)]
pub struct VpeImageBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row stride in bytes.
    pub stride: u32,
    /// Allocated height in rows.
    pub height_stride: u32,
    /// Raw [`PixelFormat`].
    pub pixel_format: i32,
    /// Raw [`ColorPrimaries`].
    pub primaries: i32,
    /// Raw [`TransferFunc`].
    pub transfer: i32,
    /// Raw [`MatrixCoefficients`].
    pub matrix: i32,
    /// Raw [`ColorRange`].
    pub range: i32,
    /// Raw [`HdrMetadataType`].
    pub metadata_type: i32,
    /// Pixel data.
    pub data: *mut u8,
    /// Length of `data` in bytes.
    pub len: usize,
    /// Output buffer for static HDR metadata, or null.
    pub static_metadata: *mut u8,
    /// Capacity of `static_metadata` in bytes.
    pub static_metadata_capacity: usize,
    /// Bytes written to `static_metadata`.
    pub static_metadata_len: usize,
}

impl VpeImageBuffer {
    /// Describe `buffer`, pointing at its pixel data.
    ///
    /// The descriptor borrows `buffer.data` without a lifetime; it must not
    /// outlive `buffer` or be used after `buffer.data` reallocates.
    pub fn describe(buffer: &mut SurfaceBuffer) -> Self {
        let c = buffer.color_space;
        Self {
            width: buffer.width,
            height: buffer.height,
            stride: buffer.stride,
            height_stride: buffer.height_stride,
            pixel_format: buffer.format as i32,
            primaries: c.primaries as i32,
            transfer: c.transfer as i32,
            matrix: c.matrix as i32,
            range: c.range as i32,
            metadata_type: buffer.metadata_type as i32,
            data: buffer.data.as_mut_ptr(),
            len: buffer.data.len(),
            static_metadata: std::ptr::null_mut(),
            static_metadata_capacity: 0,
            static_metadata_len: 0,
        }
    }

    /// Copy the described buffer into an owned [`SurfaceBuffer`].
    ///
    /// # Safety
    ///
    /// `data` must be valid for reads of `len` bytes.
    pub unsafe fn to_surface(&self) -> Result<SurfaceBuffer> {
        let format = PixelFormat::from_raw(self.pixel_format)
            .ok_or_else(|| Error::invalid(format!("unknown pixel format {}", self.pixel_format)))?;
        let color_space = ColorSpaceInfo::new(
            raw_field(self.primaries, "primaries", ColorPrimaries::from_raw)?,
            raw_field(self.transfer, "transfer", TransferFunc::from_raw)?,
            raw_field(self.matrix, "matrix", MatrixCoefficients::from_raw)?,
            raw_field(self.range, "range", ColorRange::from_raw)?,
        );
        let metadata_type =
            raw_field(self.metadata_type, "metadata type", HdrMetadataType::from_raw)?;
        if self.data.is_null() {
            return Err(Error::invalid("null pixel data"));
        }
        // SAFETY: caller guarantees `data` is readable for `len` bytes.
        let data = unsafe { std::slice::from_raw_parts(self.data, self.len) }.to_vec();

        let surface = SurfaceBuffer {
            width: self.width,
            height: self.height,
            stride: self.stride,
            height_stride: self.height_stride,
            format,
            color_space,
            metadata_type,
            metadata: HdrMetadata::default(),
            data,
        };
        surface.validate()?;
        Ok(surface)
    }

    /// Copy pixels, metadata type and static metadata of `surface` back.
    ///
    /// Nothing is written if `surface.data` no longer has the described
    /// length.
    ///
    /// # Safety
    ///
    /// `data` must be valid for writes of `len` bytes, and `static_metadata`
    /// must be null or valid for writes of `static_metadata_capacity` bytes.
    pub unsafe fn write_back(&mut self, surface: &SurfaceBuffer) -> Result<()> {
        if surface.data.len() != self.len {
            return Err(Error::invalid(format!(
                "processed buffer holds {} bytes, caller buffer {}",
                surface.data.len(),
                self.len
            )));
        }
        // SAFETY: lengths match, and the caller guarantees `data` is writable.
        unsafe { std::ptr::copy_nonoverlapping(surface.data.as_ptr(), self.data, self.len) };
        self.metadata_type = surface.metadata_type as i32;

        if !self.static_metadata.is_null() {
            let blob = &surface.metadata.static_metadata;
            let n = self.static_metadata_capacity.min(blob.len());
            // SAFETY: `n <= static_metadata_capacity`, pointer is non-null.
            unsafe { std::ptr::copy_nonoverlapping(blob.as_ptr(), self.static_metadata, n) };
            self.static_metadata_len = n;
        }
        Ok(())
    }
}

fn raw_field<T>(raw: i32, what: &str, from_raw: impl Fn(i32) -> Option<T>) -> Result<T> {
    from_raw(raw).ok_or_else(|| Error::invalid(format!("unknown {} {}", what, raw)))
}

// ============================================================================
// Shared plumbing
// ============================================================================

fn status(result: Result<()>) -> i32 {
    match result {
        Ok(()) => VpeAlgoErrCode::Ok.as_raw(),
        Err(e) => {
            tracing::debug!("c entry point failed: {}", e);
            VpeAlgoErrCode::from(&e).as_raw()
        }
    }
}

/// # Safety
///
/// `instance` must be null or valid for writes.
unsafe fn create_with(
    instance: *mut i32,
    make: impl FnOnce(&Arc<ExtensionManager>) -> Result<VpeHandle>,
) -> i32 {
    // SAFETY: forwarded from the caller.
    let Some(slot) = (unsafe { instance.as_mut() }) else {
        return VpeAlgoErrCode::InvalidVal.as_raw();
    };
    *slot = InstanceId::INVALID.as_raw();
    let runtime = VpeRuntime::global();
    status(
        make(runtime.manager())
            .and_then(|handle| runtime.create(handle))
            .map(|id| *slot = id.as_raw()),
    )
}

/// # Safety
///
/// `instance` must be null or valid for reads and writes.
unsafe fn destroy_with(instance: *mut i32, family: &'static str) -> i32 {
    // SAFETY: forwarded from the caller.
    let Some(slot) = (unsafe { instance.as_mut() }) else {
        return VpeAlgoErrCode::InvalidVal.as_raw();
    };
    let mut id = InstanceId::from_raw(*slot);
    let result = VpeRuntime::global().destroy(&mut id, family);
    *slot = id.as_raw();
    status(result)
}

fn lookup<T>(instance: i32, select: impl FnOnce(&VpeHandle) -> Option<&Arc<T>>) -> Result<Arc<T>> {
    let handle = VpeRuntime::global().handle(InstanceId::from_raw(instance))?;
    select(&handle)
        .cloned()
        .ok_or(Error::InvalidInstance(instance))
}

/// # Safety
///
/// Non-null pointers must reference valid descriptors whose data pointers
/// satisfy [`VpeImageBuffer::to_surface`].
unsafe fn input_surface(buffer: *const VpeImageBuffer) -> Result<SurfaceBuffer> {
    // SAFETY: forwarded from the caller.
    let buffer = unsafe { buffer.as_ref() }.ok_or_else(|| Error::invalid("null input buffer"))?;
    // SAFETY: forwarded from the caller.
    unsafe { buffer.to_surface() }
}

/// # Safety
///
/// As [`input_surface`], and the descriptor's pointers must be writable.
unsafe fn in_out<'a>(
    buffer: *mut VpeImageBuffer,
) -> Result<(&'a mut VpeImageBuffer, SurfaceBuffer)> {
    // SAFETY: forwarded from the caller.
    let buffer = unsafe { buffer.as_mut() }.ok_or_else(|| Error::invalid("null buffer"))?;
    // SAFETY: forwarded from the caller.
    let surface = unsafe { buffer.to_surface() }?;
    Ok((buffer, surface))
}

// ============================================================================
// Entry points
// ============================================================================

/// Build the process-wide runtime now instead of on the first call.
#[unsafe(no_mangle)]
pub extern "C" fn vpe_runtime_init() -> i32 {
    let _ = VpeRuntime::global();
    VpeAlgoErrCode::Ok.as_raw()
}

/// Create a color space converter and store its id in `*instance`.
///
/// # Safety
///
/// `instance` must be null or valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_color_space_converter_create(instance: *mut i32) -> i32 {
    // SAFETY: forwarded from the caller.
    unsafe { create_with(instance, |manager| Ok(ColorSpaceConverter::new(manager).into())) }
}

/// Convert `input` into `output`.
///
/// # Safety
///
/// Both descriptors must be null or valid, with readable and writable data.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_color_space_converter_process_image(
    instance: i32,
    input: *const VpeImageBuffer,
    output: *mut VpeImageBuffer,
) -> i32 {
    status((|| {
        let converter = lookup(instance, VpeHandle::as_color_space_converter)?;
        // SAFETY: forwarded from the caller.
        let source = unsafe { input_surface(input) }?;
        // SAFETY: forwarded from the caller.
        let (output, mut target) = unsafe { in_out(output) }?;
        converter.process(&source, &mut target)?;
        // SAFETY: `output` was validated by `in_out`.
        unsafe { output.write_back(&target) }
    })())
}

/// Destroy a color space converter and reset `*instance` to -1.
///
/// # Safety
///
/// `instance` must be null or valid for reads and writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_color_space_converter_destroy(instance: *mut i32) -> i32 {
    // SAFETY: forwarded from the caller.
    unsafe { destroy_with(instance, "color space converter") }
}

/// Create a metadata generator and store its id in `*instance`.
///
/// # Safety
///
/// `instance` must be null or valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_metadata_generator_create(instance: *mut i32) -> i32 {
    // SAFETY: forwarded from the caller.
    unsafe { create_with(instance, |manager| Ok(MetadataGenerator::new(manager).into())) }
}

/// Generate metadata for `buffer` in place.
///
/// # Safety
///
/// `buffer` must be null or valid, with readable and writable pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_metadata_generator_process_image(
    instance: i32,
    buffer: *mut VpeImageBuffer,
) -> i32 {
    status((|| {
        let generator = lookup(instance, VpeHandle::as_metadata_generator)?;
        // SAFETY: forwarded from the caller.
        let (buffer, mut surface) = unsafe { in_out(buffer) }?;
        generator.process(&mut surface)?;
        // SAFETY: `buffer` was validated by `in_out`.
        unsafe { buffer.write_back(&surface) }
    })())
}

/// Destroy a metadata generator and reset `*instance` to -1.
///
/// # Safety
///
/// `instance` must be null or valid for reads and writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_metadata_generator_destroy(instance: *mut i32) -> i32 {
    // SAFETY: forwarded from the caller.
    unsafe { destroy_with(instance, "metadata generator") }
}

/// Create an image detail enhancer at `level`, or a video detail enhancer
/// when `level` is the raw video level.
///
/// # Safety
///
/// `instance` must be null or valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_detail_enhancer_create(instance: *mut i32, level: i32) -> i32 {
    // SAFETY: forwarded from the caller.
    unsafe {
        create_with(instance, |manager| {
            let level = DetailEnhancerLevel::from_raw(level)
                .ok_or_else(|| Error::invalid(format!("unknown detail level {}", level)))?;
            let enhancer = if level == DetailEnhancerLevel::Video {
                DetailEnhancer::video(manager)
            } else {
                DetailEnhancer::new(manager)
            };
            enhancer.set_parameter(DetailEnhancerParameters {
                level,
                ..Default::default()
            })?;
            Ok(enhancer.into())
        })
    }
}

/// Enhance `input` into `output`.
///
/// # Safety
///
/// Both descriptors must be null or valid, with readable and writable data.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_detail_enhancer_process_image(
    instance: i32,
    input: *const VpeImageBuffer,
    output: *mut VpeImageBuffer,
) -> i32 {
    status((|| {
        let enhancer = lookup(instance, VpeHandle::as_detail_enhancer)?;
        // SAFETY: forwarded from the caller.
        let source = unsafe { input_surface(input) }?;
        // SAFETY: forwarded from the caller.
        let (output, mut target) = unsafe { in_out(output) }?;
        enhancer.process(&source, &mut target)?;
        // SAFETY: `output` was validated by `in_out`.
        unsafe { output.write_back(&target) }
    })())
}

/// Destroy a detail enhancer and reset `*instance` to -1.
///
/// # Safety
///
/// `instance` must be null or valid for reads and writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_detail_enhancer_destroy(instance: *mut i32) -> i32 {
    // SAFETY: forwarded from the caller.
    unsafe { destroy_with(instance, "detail enhancer") }
}

/// Create an AI HDR enhancer and store its id in `*instance`.
///
/// # Safety
///
/// `instance` must be null or valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_aihdr_enhancer_create(instance: *mut i32) -> i32 {
    // SAFETY: forwarded from the caller.
    unsafe { create_with(instance, |manager| Ok(AihdrEnhancer::new(manager).into())) }
}

/// Enhance `buffer` in place.
///
/// # Safety
///
/// `buffer` must be null or valid, with readable and writable data.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_aihdr_enhancer_process_image(
    instance: i32,
    buffer: *mut VpeImageBuffer,
) -> i32 {
    status((|| {
        let enhancer = lookup(instance, VpeHandle::as_aihdr_enhancer)?;
        // SAFETY: forwarded from the caller.
        let (buffer, mut surface) = unsafe { in_out(buffer) }?;
        enhancer.process(&mut surface)?;
        // SAFETY: `buffer` was validated by `in_out`.
        unsafe { buffer.write_back(&surface) }
    })())
}

/// Destroy an AI HDR enhancer and reset `*instance` to -1.
///
/// # Safety
///
/// `instance` must be null or valid for reads and writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vpe_aihdr_enhancer_destroy(instance: *mut i32) -> i32 {
    // SAFETY: forwarded from the caller.
    unsafe { destroy_with(instance, "aihdr enhancer") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_round_trips_surface() {
        let mut surface = SurfaceBuffer::new(4, 2, PixelFormat::Nv12)
            .with_color_space(ColorSpaceInfo::BT709_LIMITED);
        surface.data.fill(9);
        let descriptor = VpeImageBuffer::describe(&mut surface);
        let copy = unsafe { descriptor.to_surface() }.unwrap();
        assert_eq!(copy.format, PixelFormat::Nv12);
        assert_eq!(copy.color_space, ColorSpaceInfo::BT709_LIMITED);
        assert_eq!(copy.data, surface.data);
    }

    #[test]
    fn test_descriptor_rejects_bad_fields() {
        let mut surface = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
        let mut descriptor = VpeImageBuffer::describe(&mut surface);
        descriptor.pixel_format = 42;
        assert!(matches!(
            unsafe { descriptor.to_surface() },
            Err(Error::InvalidValue(_))
        ));

        let mut descriptor = VpeImageBuffer::describe(&mut surface);
        descriptor.data = std::ptr::null_mut();
        assert!(unsafe { descriptor.to_surface() }.is_err());

        let mut descriptor = VpeImageBuffer::describe(&mut surface);
        descriptor.len = 3;
        assert!(unsafe { descriptor.to_surface() }.is_err());
    }

    #[test]
    fn test_write_back_copies_static_metadata() {
        let mut surface = SurfaceBuffer::new(2, 2, PixelFormat::Rgba8888);
        let mut blob = [0u8; 2];
        let mut descriptor = VpeImageBuffer::describe(&mut surface);
        descriptor.static_metadata = blob.as_mut_ptr();
        descriptor.static_metadata_capacity = blob.len();

        let mut produced = SurfaceBuffer::new(2, 2, PixelFormat::Rgba8888)
            .with_metadata_type(HdrMetadataType::VideoHdr10);
        produced.metadata.static_metadata = vec![1, 2, 3];
        produced.data.fill(5);
        unsafe { descriptor.write_back(&produced) }.unwrap();

        assert_eq!(descriptor.static_metadata_len, 2);
        assert_eq!(descriptor.metadata_type, HdrMetadataType::VideoHdr10 as i32);
        assert_eq!(blob, [1, 2]);
        assert!(surface.data.iter().all(|&b| b == 5));
    }

    #[test]
    fn test_write_back_rejects_resized_data() {
        let mut surface = SurfaceBuffer::new(2, 2, PixelFormat::Rgba8888);
        surface.data.fill(7);
        let mut descriptor = VpeImageBuffer::describe(&mut surface);

        let mut produced = SurfaceBuffer::new(2, 2, PixelFormat::Rgba8888)
            .with_metadata_type(HdrMetadataType::VideoHdr10);
        produced.data.fill(1);
        produced.data.truncate(6);
        let result = unsafe { descriptor.write_back(&produced) };

        assert!(matches!(result, Err(Error::InvalidValue(_))));
        assert_eq!(descriptor.metadata_type, HdrMetadataType::None as i32);
        assert!(surface.data.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_descriptor_rejects_overflowing_width() {
        let mut surface = SurfaceBuffer::new(4, 4, PixelFormat::Rgba8888);
        let mut descriptor = VpeImageBuffer::describe(&mut surface);
        descriptor.width = 0x4000_0001;
        assert!(matches!(
            unsafe { descriptor.to_surface() },
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn test_null_instance_pointer() {
        let code = unsafe { vpe_color_space_converter_create(std::ptr::null_mut()) };
        assert_eq!(code, VpeAlgoErrCode::InvalidVal.as_raw());
        let code = unsafe { vpe_aihdr_enhancer_destroy(std::ptr::null_mut()) };
        assert_eq!(code, VpeAlgoErrCode::InvalidVal.as_raw());
    }
}
