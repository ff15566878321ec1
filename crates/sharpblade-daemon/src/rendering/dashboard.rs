//! Touchpad dashboard reflecting recent input.

use anyhow::Result;
use sharpblade_hw::{
    Direction, Framebuffer, GestureEvent, KeyState, PaintableSurface, PixelBuffer, RenderTarget,
    SwitchbladeEvent, DYNAMIC_KEY_COUNT,
};

use super::Canvas;

const EDGE: u32 = 24;
const TOUCH_SIZE: u32 = 24;
const KEY_WIDTH: u32 = 120;
const KEY_HEIGHT: u32 = 40;
const KEYS_PER_ROW: u32 = 5;
const FRAME_STRIP_HEIGHT: u32 = 4;

/// Dashboard drawn on the touchpad.
///
/// Shows the direction of the last flick or scroll as a bar along that
/// edge, the current touch point, which dynamic keys are held, and a strip
/// that advances every frame.
pub struct Dashboard {
    canvas: Canvas,
    framebuffer: Framebuffer,
    accent: u32,
    direction: Direction,
    touch: Option<(u16, u16)>,
    keys_down: [bool; DYNAMIC_KEY_COUNT as usize],
    frames: u64,
}

impl Dashboard {
    pub fn new(background: u32, accent: u32) -> Result<Self> {
        let framebuffer = Framebuffer::for_target(RenderTarget::Touchpad);
        let mut canvas = Canvas::new(framebuffer.width() as u32, framebuffer.height() as u32)?;
        canvas.set_background(background);

        Ok(Self {
            canvas,
            framebuffer,
            accent,
            direction: Direction::None,
            touch: None,
            keys_down: [false; DYNAMIC_KEY_COUNT as usize],
            frames: 0,
        })
    }

    /// Updates the dashboard state from a device event.
    pub fn handle_event(&mut self, event: &SwitchbladeEvent) {
        match event {
            SwitchbladeEvent::Gesture(gesture) => match gesture {
                GestureEvent::Flick(flick) => self.direction = flick.direction(),
                GestureEvent::Scroll { direction, .. } => self.direction = *direction,
                GestureEvent::Press { x, y, .. }
                | GestureEvent::Tap { x, y }
                | GestureEvent::Move { x, y }
                | GestureEvent::Hold { x, y, .. } => self.touch = Some((*x, *y)),
                GestureEvent::Release { .. } => self.touch = None,
                GestureEvent::Zoom { .. } | GestureEvent::Rotate { .. } => {}
            },
            SwitchbladeEvent::DynamicKey(key) => {
                let idx = key.key().index() as usize - 1;
                self.keys_down[idx] = matches!(key.state(), KeyState::Down | KeyState::Hold);
            }
        }
    }

    fn draw_direction(&mut self) {
        let (width, height) = self.canvas.dimensions();
        let accent = self.accent;
        match self.direction {
            Direction::Left => self.canvas.fill_rect(0, 0, EDGE, height, accent),
            Direction::Right => {
                self.canvas
                    .fill_rect((width - EDGE) as i32, 0, EDGE, height, accent)
            }
            Direction::Up => self.canvas.fill_rect(0, 0, width, EDGE, accent),
            Direction::Down => {
                self.canvas
                    .fill_rect(0, (height - EDGE) as i32, width, EDGE, accent)
            }
            Direction::None => {}
        }
    }

    fn draw_keys(&mut self) {
        let (width, _) = self.canvas.dimensions();
        let spacing = width / KEYS_PER_ROW;
        for (i, down) in self.keys_down.iter().enumerate() {
            let i = i as u32;
            let x = ((i % KEYS_PER_ROW) * spacing + (spacing - KEY_WIDTH) / 2) as i32;
            let y = (EDGE * 2 + (i / KEYS_PER_ROW) * (KEY_HEIGHT + EDGE)) as i32;
            if *down {
                self.canvas.fill_rect(x, y, KEY_WIDTH, KEY_HEIGHT, self.accent);
            } else {
                self.canvas
                    .draw_rect_outline(x, y, KEY_WIDTH, KEY_HEIGHT, self.accent);
            }
        }
    }

    fn draw_touch(&mut self) {
        if let Some((x, y)) = self.touch {
            let half = (TOUCH_SIZE / 2) as i32;
            self.canvas.fill_rect(
                x as i32 - half,
                y as i32 - half,
                TOUCH_SIZE,
                TOUCH_SIZE,
                self.accent,
            );
        }
    }

    fn draw_frame_strip(&mut self) {
        let (width, height) = self.canvas.dimensions();
        let progress = ((self.frames * 8) % width as u64) as u32;
        if progress > 0 {
            self.canvas.fill_rect(
                0,
                (height - FRAME_STRIP_HEIGHT) as i32,
                progress,
                FRAME_STRIP_HEIGHT,
                self.accent,
            );
        }
    }
}

impl PaintableSurface for Dashboard {
    fn paint(&mut self) -> sharpblade_hw::Result<()> {
        self.canvas.clear();
        self.draw_direction();
        self.draw_keys();
        self.draw_touch();
        self.draw_frame_strip();

        self.canvas.render_to_framebuffer(&mut self.framebuffer)?;
        self.frames += 1;
        Ok(())
    }

    fn capture(&self) -> sharpblade_hw::Result<PixelBuffer> {
        self.framebuffer.to_pixel_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharpblade_hw::framebuffer::rgb888_to_rgb565;

    const BACKGROUND: u32 = 0x000080;
    const ACCENT: u32 = 0x44D62C;

    fn accent() -> u16 {
        rgb888_to_rgb565(0x44, 0xD6, 0x2C)
    }

    fn background() -> u16 {
        rgb888_to_rgb565(0, 0, 0x80)
    }

    fn gesture(event: GestureEvent) -> SwitchbladeEvent {
        SwitchbladeEvent::Gesture(event)
    }

    #[test]
    fn test_initial_frame() {
        let mut dashboard = Dashboard::new(BACKGROUND, ACCENT).unwrap();
        dashboard.paint().unwrap();

        let buffer = dashboard.capture().unwrap();
        assert!(buffer.check_target(RenderTarget::Touchpad).is_ok());
        assert_eq!(dashboard.framebuffer.get_pixel(400, 240), Some(background()));
        assert_eq!(dashboard.frames, 1);
    }

    #[test]
    fn test_scroll_draws_edge_bar() {
        let mut dashboard = Dashboard::new(BACKGROUND, ACCENT).unwrap();
        dashboard.handle_event(&gesture(GestureEvent::Scroll {
            direction: Direction::Left,
            x: 0,
            y: 0,
        }));
        dashboard.paint().unwrap();
        assert_eq!(dashboard.framebuffer.get_pixel(0, 240), Some(accent()));
        assert_eq!(dashboard.framebuffer.get_pixel(799, 240), Some(background()));

        dashboard.handle_event(&gesture(GestureEvent::Scroll {
            direction: Direction::Right,
            x: 0,
            y: 0,
        }));
        dashboard.paint().unwrap();
        assert_eq!(dashboard.framebuffer.get_pixel(0, 240), Some(background()));
        assert_eq!(dashboard.framebuffer.get_pixel(799, 240), Some(accent()));
    }

    #[test]
    fn test_touch_marker_follows_touch() {
        let mut dashboard = Dashboard::new(BACKGROUND, ACCENT).unwrap();
        dashboard.handle_event(&gesture(GestureEvent::Tap { x: 400, y: 300 }));
        dashboard.paint().unwrap();
        assert_eq!(dashboard.framebuffer.get_pixel(400, 300), Some(accent()));

        dashboard.handle_event(&gesture(GestureEvent::Release {
            touchpoints: 1,
            x: 400,
            y: 300,
        }));
        dashboard.paint().unwrap();
        assert_eq!(dashboard.framebuffer.get_pixel(400, 300), Some(background()));
    }

    #[test]
    fn test_frame_strip_advances() {
        let mut dashboard = Dashboard::new(BACKGROUND, ACCENT).unwrap();
        dashboard.paint().unwrap();
        dashboard.paint().unwrap();
        // Strip covers frames * 8 pixels, counted before the frame
        assert_eq!(dashboard.framebuffer.get_pixel(0, 479), Some(accent()));
        assert_eq!(dashboard.framebuffer.get_pixel(8, 479), Some(background()));
    }
}
