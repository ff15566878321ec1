//! Canvas for drawing the dashboard before it is packed into a framebuffer.

use anyhow::{Context, Result};
use sharpblade_hw::Framebuffer;
use tiny_skia::{Color, Paint, Pixmap, Rect, Transform};

/// Canvas for rendering.
pub struct Canvas {
    width: u32,
    height: u32,
    pixmap: Pixmap,
    background_color: u32,
}

fn color(rgb: u32) -> Color {
    Color::from_rgba8(
        ((rgb >> 16) & 0xFF) as u8,
        ((rgb >> 8) & 0xFF) as u8,
        (rgb & 0xFF) as u8,
        255,
    )
}

impl Canvas {
    /// Creates a new canvas.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height)
            .with_context(|| format!("Failed to create {}x{} pixmap", width, height))?;

        Ok(Self {
            width,
            height,
            pixmap,
            background_color: 0x000000, // Black
        })
    }

    /// Returns the canvas dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Sets the background color.
    pub fn set_background(&mut self, color: u32) {
        self.background_color = color;
    }

    /// Clears the canvas.
    pub fn clear(&mut self) {
        self.pixmap.fill(color(self.background_color));
    }

    /// Draws a filled rectangle.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, rgb: u32) {
        let mut paint = Paint::default();
        paint.set_color(color(rgb));

        if let Some(rect) = Rect::from_xywh(x as f32, y as f32, width as f32, height as f32) {
            self.pixmap
                .fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    /// Draws a one pixel rectangle outline.
    pub fn draw_rect_outline(&mut self, x: i32, y: i32, width: u32, height: u32, rgb: u32) {
        let right = x + width as i32 - 1;
        let bottom = y + height as i32 - 1;

        self.fill_rect(x, y, width, 1, rgb); // Top
        self.fill_rect(x, bottom, width, 1, rgb); // Bottom
        self.fill_rect(x, y, 1, height, rgb); // Left
        self.fill_rect(right, y, 1, height, rgb); // Right
    }

    /// Renders the canvas to a framebuffer of the same size.
    pub fn render_to_framebuffer(&self, fb: &mut Framebuffer) -> sharpblade_hw::Result<()> {
        // Everything drawn is opaque, so premultiplied and straight RGBA agree
        fb.copy_from_rgba8(self.pixmap.data())
    }
}
