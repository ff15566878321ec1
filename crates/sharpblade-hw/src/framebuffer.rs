//! RGB565 framebuffer for the SwitchBlade displays.

use crate::sdk::{PixelBuffer, RenderTarget};
use crate::{Error, Result};

/// RGB565 framebuffer sized for one render target.
#[derive(Clone)]
pub struct Framebuffer {
    /// Pixel data in RGB565 format.
    data: Vec<u16>,
    width: u16,
    height: u16,
}

impl Framebuffer {
    /// Creates a black framebuffer matching a render target.
    pub fn for_target(target: RenderTarget) -> Self {
        let (width, height) = target.dimensions();
        Self::with_dimensions(width, height)
    }

    /// Creates a framebuffer with custom dimensions.
    pub fn with_dimensions(width: u16, height: u16) -> Self {
        let size = width as usize * height as usize;
        Self {
            data: vec![0; size],
            width,
            height,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Returns a reference to the raw pixel data.
    pub fn data(&self) -> &[u16] {
        &self.data
    }

    /// Returns a mutable reference to the raw pixel data.
    pub fn data_mut(&mut self) -> &mut [u16] {
        &mut self.data
    }

    /// Clears the framebuffer to a solid color.
    pub fn clear(&mut self, color: u16) {
        self.data.fill(color);
    }

    /// Sets a pixel, ignoring coordinates outside the buffer.
    pub fn set_pixel(&mut self, x: u16, y: u16, color: u16) {
        if x < self.width && y < self.height {
            let idx = y as usize * self.width as usize + x as usize;
            self.data[idx] = color;
        }
    }

    pub fn get_pixel(&self, x: u16, y: u16) -> Option<u16> {
        if x < self.width && y < self.height {
            Some(self.data[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }

    /// Copies pixel data from an RGBA8 slice, converting to RGB565.
    pub fn copy_from_rgba8(&mut self, data: &[u8]) -> Result<()> {
        let expected = self.data.len() * 4;
        if data.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: data.len(),
            });
        }

        for (pixel, chunk) in self.data.iter_mut().zip(data.chunks_exact(4)) {
            *pixel = rgb888_to_rgb565(chunk[0], chunk[1], chunk[2]);
        }
        Ok(())
    }

    /// Packs the framebuffer into a buffer ready for upload.
    pub fn to_pixel_buffer(&self) -> Result<PixelBuffer> {
        PixelBuffer::from_rgb565_pixels(self.width, self.height, &self.data)
    }
}

/// Converts RGB888 to RGB565.
#[inline]
pub fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    let r5 = (r >> 3) as u16;
    let g6 = (g >> 2) as u16;
    let b5 = (b >> 3) as u16;
    (r5 << 11) | (g6 << 5) | b5
}

/// Parses a `#RRGGBB` hex color into a 0xRRGGBB value.
pub fn parse_hex_color(hex: &str) -> Option<u32> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}
