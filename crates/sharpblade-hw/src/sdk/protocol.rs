//! Native ABI definitions shared with the SwitchBlade SDK.
//!
//! Everything in here mirrors a type from `SwitchBladeSDK_types.h` and
//! `SwitchBladeSDK_errors.h`. Field order and sizes are part of the contract
//! with the vendor DLL.

use crate::events::DynamicKey;
use crate::{Error, Result, DYNAMIC_KEY_HEIGHT, DYNAMIC_KEY_WIDTH, TOUCHPAD_HEIGHT, TOUCHPAD_WIDTH};
use std::marker::PhantomData;

/// Status code returned by every SDK entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub u32);

/// Vendor error codes start here. Anything below is a plain HRESULT success
/// code (S_OK, S_FALSE).
const RZSB_ERROR_BASE: u32 = 0x2000_0000;

impl HResult {
    pub const OK: HResult = HResult(0x0000_0000);
    pub const UNSUCCESSFUL: HResult = HResult(0x8007_001F);
    pub const INVALID_PARAMETER: HResult = HResult(0x8007_0057);
    pub const INVALID_POINTER: HResult = HResult(0x8000_4003);
    pub const FILE_ZERO_SIZE: HResult = HResult(0x2000_0001);
    pub const FILE_INVALID_NAME: HResult = HResult(0x2000_0002);
    pub const FILE_INVALID_TYPE: HResult = HResult(0x2000_0003);
    pub const FILE_READ_ERROR: HResult = HResult(0x2000_0004);
    pub const IMAGE_INVALID_SIZE: HResult = HResult(0x2000_0008);
    pub const IMAGE_INVALID_DATA: HResult = HResult(0x2000_0009);
    pub const CALLBACK_NOT_SET: HResult = HResult(0x2001_0001);
    pub const CALLBACK_ALREADY_SET: HResult = HResult(0x2001_0002);
    pub const ALREADY_STARTED: HResult = HResult(0x2010_0001);
    pub const NOT_STARTED: HResult = HResult(0x2010_0002);
    pub const CONNECTION_ERROR: HResult = HResult(0x2010_0003);
    pub const INTERNAL_ERROR: HResult = HResult(0x2010_0004);

    /// Returns true if the call succeeded.
    pub fn is_success(&self) -> bool {
        self.0 < RZSB_ERROR_BASE
    }

    /// Human-readable description of known codes.
    pub fn describe(&self) -> &'static str {
        match *self {
            HResult::OK => "success",
            HResult::UNSUCCESSFUL => "unsuccessful",
            HResult::INVALID_PARAMETER => "invalid parameter",
            HResult::INVALID_POINTER => "invalid pointer",
            HResult::FILE_ZERO_SIZE => "file has zero size",
            HResult::FILE_INVALID_NAME => "invalid file name",
            HResult::FILE_INVALID_TYPE => "invalid file type",
            HResult::FILE_READ_ERROR => "file read error",
            HResult::IMAGE_INVALID_SIZE => "invalid image size",
            HResult::IMAGE_INVALID_DATA => "invalid image data",
            HResult::CALLBACK_NOT_SET => "callback not set",
            HResult::CALLBACK_ALREADY_SET => "callback already set",
            HResult::ALREADY_STARTED => "SDK already started",
            HResult::NOT_STARTED => "SDK not started",
            HResult::CONNECTION_ERROR => "connection error",
            HResult::INTERNAL_ERROR => "internal SDK error",
            _ if self.is_success() => "success",
            _ => "unknown error",
        }
    }
}

impl std::fmt::Display for HResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HRESULT 0x{:08X}", self.0)
    }
}

/// Pixel format of image data sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum PixelType {
    #[default]
    Rgb565 = 0,
}

impl PixelType {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelType::Rgb565 => 2,
        }
    }
}

/// `RZSBSDK_BUFFERPARAMS`: image data handed to `RzSBRenderBuffer`.
///
/// Layout: `pixel_type` (u32), `data_size` (u32), `data` (pointer). The
/// lifetime ties the pointer to the [`PixelBuffer`] it was built from.
#[repr(C)]
#[derive(Debug)]
pub struct BufferParams<'a> {
    pixel_type: PixelType,
    data_size: u32,
    data: *const u8,
    _buffer: PhantomData<&'a [u8]>,
}

impl BufferParams<'_> {
    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    pub fn data_ptr(&self) -> *const u8 {
        self.data
    }
}

/// Display surfaces on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// The 800x480 touchpad display.
    Touchpad,
    /// One of the 115x115 dynamic key displays.
    DynamicKey(DynamicKey),
}

/// `RZSBSDK_DISPLAY_WIDGET`; dynamic keys follow it.
const DISPLAY_BASE: u32 = 1 << 16;

impl RenderTarget {
    /// Returns the `RZSBSDK_DISPLAY` id for this target.
    pub fn display_id(&self) -> u32 {
        match self {
            RenderTarget::Touchpad => DISPLAY_BASE,
            RenderTarget::DynamicKey(key) => DISPLAY_BASE + key.index() as u32,
        }
    }

    /// Returns the display dimensions for this target.
    pub fn dimensions(&self) -> (u16, u16) {
        match self {
            RenderTarget::Touchpad => (TOUCHPAD_WIDTH, TOUCHPAD_HEIGHT),
            RenderTarget::DynamicKey(_) => (DYNAMIC_KEY_WIDTH, DYNAMIC_KEY_HEIGHT),
        }
    }
}

impl std::fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderTarget::Touchpad => write!(f, "touchpad"),
            RenderTarget::DynamicKey(key) => write!(f, "{}", key),
        }
    }
}

/// One frame of pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixel_type: PixelType,
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps little-endian RGB565 bytes, checking the length against the dimensions.
    pub fn rgb565(width: u16, height: u16, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * PixelType::Rgb565.bytes_per_pixel();
        if data.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            pixel_type: PixelType::Rgb565,
            width,
            height,
            data,
        })
    }

    /// Builds a buffer from RGB565 pixel values.
    pub fn from_rgb565_pixels(width: u16, height: u16, pixels: &[u16]) -> Result<Self> {
        let data = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
        Self::rgb565(width, height, data)
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Checks that this buffer exactly fills the given target.
    pub fn check_target(&self, target: RenderTarget) -> Result<()> {
        let (width, height) = target.dimensions();
        let expected = width as usize * height as usize * self.pixel_type.bytes_per_pixel();
        if self.width != width || self.height != height || self.data.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Builds the native parameter block pointing into this buffer.
    pub fn params(&self) -> Result<BufferParams<'_>> {
        let data_size = u32::try_from(self.data.len()).map_err(|_| Error::BufferSize {
            expected: u32::MAX as usize,
            actual: self.data.len(),
        })?;
        Ok(BufferParams {
            pixel_type: self.pixel_type,
            data_size,
            data: self.data.as_ptr(),
            _buffer: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_buffer_params_layout() {
        assert_eq!(offset_of!(BufferParams<'static>, pixel_type), 0);
        assert_eq!(offset_of!(BufferParams<'static>, data_size), 4);
        assert_eq!(offset_of!(BufferParams<'static>, data), 8);
        assert_eq!(size_of::<PixelType>(), 4);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(size_of::<BufferParams<'static>>(), 16);
    }

    #[test]
    fn test_params_match_buffer() {
        let pixels = [0xF800, 0x07E0, 0x001F, 0xFFFF];
        let buffer = PixelBuffer::from_rgb565_pixels(2, 2, &pixels).unwrap();
        let params = buffer.params().unwrap();
        assert_eq!(params.data_size(), 8);
        assert_eq!(params.data_ptr(), buffer.data().as_ptr());
        assert_eq!(params.pixel_type(), PixelType::Rgb565);
        // Little-endian on the wire
        assert_eq!(&buffer.data()[..2], &[0x00, 0xF8]);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let err = PixelBuffer::rgb565(4, 4, vec![0; 31]).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferSize {
                expected: 32,
                actual: 31
            }
        ));
    }

    #[test]
    fn test_target_check() {
        let key = DynamicKey::new(1).unwrap();
        let buffer = PixelBuffer::rgb565(115, 115, vec![0; 115 * 115 * 2]).unwrap();
        assert!(buffer.check_target(RenderTarget::DynamicKey(key)).is_ok());
        assert!(buffer.check_target(RenderTarget::Touchpad).is_err());
    }

    #[test]
    fn test_display_ids() {
        assert_eq!(RenderTarget::Touchpad.display_id(), 0x10000);
        let key = DynamicKey::new(10).unwrap();
        assert_eq!(RenderTarget::DynamicKey(key).display_id(), 0x1000A);
    }

    #[test]
    fn test_hresult_success() {
        assert!(HResult::OK.is_success());
        assert!(HResult(1).is_success());
        assert!(!HResult::NOT_STARTED.is_success());
        assert!(!HResult::INVALID_PARAMETER.is_success());
        assert_eq!(HResult::NOT_STARTED.to_string(), "HRESULT 0x20100002");
    }
}
