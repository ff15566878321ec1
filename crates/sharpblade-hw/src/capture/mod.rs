//! Screen and window capture.
//!
//! Captures go through [`GraphicsSubsystem`], which mirrors the handful of
//! GDI calls involved (window DC, compatible DC and bitmap, BitBlt). Every
//! handle acquired during a capture is held in a guard and released exactly
//! once, whether the capture succeeds or not.

#[cfg(windows)]
mod gdi;

#[cfg(windows)]
pub use gdi::Gdi;

use crate::{Error, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::Path;
use tracing::debug;

/// Native window handle (`HWND`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Device context handle (`HDC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DcHandle(pub isize);

/// Bitmap handle (`HBITMAP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitmapHandle(pub isize);

/// Object previously selected into a device context (`HGDIOBJ`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub isize);

/// Window bounds in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// The OS graphics calls a capture needs.
///
/// Acquire/release pairs: `window_dc`/`release_dc`,
/// `create_compatible_dc`/`delete_dc`,
/// `create_compatible_bitmap`/`delete_object`,
/// `select_object`/`restore_object`.
pub trait GraphicsSubsystem {
    /// The desktop's root window.
    fn desktop_window(&self) -> WindowHandle;

    fn window_rect(&self, window: WindowHandle) -> Result<Rect>;

    fn window_dc(&self, window: WindowHandle) -> Result<DcHandle>;

    fn release_dc(&self, window: WindowHandle, dc: DcHandle);

    fn create_compatible_dc(&self, dc: DcHandle) -> Result<DcHandle>;

    fn delete_dc(&self, dc: DcHandle);

    fn create_compatible_bitmap(&self, dc: DcHandle, width: i32, height: i32)
        -> Result<BitmapHandle>;

    fn delete_object(&self, bitmap: BitmapHandle);

    /// Selects `bitmap` into `dc`, returning what was selected before.
    fn select_object(&self, dc: DcHandle, bitmap: BitmapHandle) -> Result<ObjectHandle>;

    fn restore_object(&self, dc: DcHandle, previous: ObjectHandle);

    /// Copies `width` x `height` pixels from `src` to `dest` at the origin.
    fn bit_blt(&self, dest: DcHandle, width: i32, height: i32, src: DcHandle) -> Result<()>;

    /// Reads a bitmap back as top-down BGRA rows.
    fn read_pixels(
        &self,
        dc: DcHandle,
        bitmap: BitmapHandle,
        width: i32,
        height: i32,
    ) -> Result<Vec<u8>>;
}

/// Returns the graphics subsystem for this platform.
pub fn system() -> Result<Box<dyn GraphicsSubsystem>> {
    #[cfg(windows)]
    {
        Ok(Box::new(Gdi))
    }
    #[cfg(not(windows))]
    {
        Err(Error::Unsupported("Screen capture"))
    }
}

struct WindowDc<'a, G: GraphicsSubsystem + ?Sized> {
    gfx: &'a G,
    window: WindowHandle,
    dc: DcHandle,
}

impl<G: GraphicsSubsystem + ?Sized> Drop for WindowDc<'_, G> {
    fn drop(&mut self) {
        self.gfx.release_dc(self.window, self.dc);
    }
}

struct MemoryDc<'a, G: GraphicsSubsystem + ?Sized> {
    gfx: &'a G,
    dc: DcHandle,
}

impl<G: GraphicsSubsystem + ?Sized> Drop for MemoryDc<'_, G> {
    fn drop(&mut self) {
        self.gfx.delete_dc(self.dc);
    }
}

struct Bitmap<'a, G: GraphicsSubsystem + ?Sized> {
    gfx: &'a G,
    bitmap: BitmapHandle,
}

impl<G: GraphicsSubsystem + ?Sized> Drop for Bitmap<'_, G> {
    fn drop(&mut self) {
        self.gfx.delete_object(self.bitmap);
    }
}

struct Selection<'a, G: GraphicsSubsystem + ?Sized> {
    gfx: &'a G,
    dc: DcHandle,
    previous: ObjectHandle,
}

impl<G: GraphicsSubsystem + ?Sized> Drop for Selection<'_, G> {
    fn drop(&mut self) {
        self.gfx.restore_object(self.dc, self.previous);
    }
}

/// Captures the whole desktop.
pub fn capture_screen<G: GraphicsSubsystem + ?Sized>(gfx: &G) -> Result<RgbaImage> {
    capture_window(gfx, gfx.desktop_window())
}

/// Captures a window, including its frame.
pub fn capture_window<G: GraphicsSubsystem + ?Sized>(
    gfx: &G,
    window: WindowHandle,
) -> Result<RgbaImage> {
    let rect = gfx.window_rect(window)?;
    let (width, height) = (rect.width(), rect.height());
    if width <= 0 || height <= 0 {
        return Err(Error::Capture(format!(
            "window {:?} has empty bounds {}x{}",
            window, width, height
        )));
    }

    let source = WindowDc {
        gfx,
        window,
        dc: gfx.window_dc(window)?,
    };
    let memory = MemoryDc {
        gfx,
        dc: gfx.create_compatible_dc(source.dc)?,
    };
    let bitmap = Bitmap {
        gfx,
        bitmap: gfx.create_compatible_bitmap(source.dc, width, height)?,
    };

    {
        let _selection = Selection {
            gfx,
            dc: memory.dc,
            previous: gfx.select_object(memory.dc, bitmap.bitmap)?,
        };
        gfx.bit_blt(memory.dc, width, height, source.dc)?;
    }

    // The bitmap must be deselected before it can be read back
    let bgra = gfx.read_pixels(memory.dc, bitmap.bitmap, width, height)?;
    debug!("Captured window {:?} ({}x{})", window, width, height);

    bgra_to_image(width as u32, height as u32, bgra)
}

fn bgra_to_image(width: u32, height: u32, mut data: Vec<u8>) -> Result<RgbaImage> {
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(Error::Capture(format!(
            "expected {} bytes of pixel data, got {}",
            expected,
            data.len()
        )));
    }

    for pixel in data.chunks_exact_mut(4) {
        pixel.swap(0, 2);
        pixel[3] = 255;
    }

    RgbaImage::from_raw(width, height, data)
        .ok_or_else(|| Error::Capture("pixel data does not fit image".to_string()))
}

/// Captures a window and saves it to `path` in the given format.
pub fn capture_window_to_file<G: GraphicsSubsystem + ?Sized>(
    gfx: &G,
    window: WindowHandle,
    path: &Path,
    format: ImageFormat,
) -> Result<()> {
    let image = capture_window(gfx, window)?;
    save_image(image, path, format)
}

/// Captures the desktop and saves it to `path` in the given format.
pub fn capture_screen_to_file<G: GraphicsSubsystem + ?Sized>(
    gfx: &G,
    path: &Path,
    format: ImageFormat,
) -> Result<()> {
    capture_window_to_file(gfx, gfx.desktop_window(), path, format)
}

fn save_image(image: RgbaImage, path: &Path, format: ImageFormat) -> Result<()> {
    let image = DynamicImage::ImageRgba8(image);
    // JPEG has no alpha channel
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    };
    image.save_with_format(path, format)?;
    debug!("Saved capture to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// Fake GDI counting acquisitions and releases per resource kind.
    struct CountingGdi {
        rect: Rect,
        fail_at: Option<&'static str>,
        next_handle: Cell<isize>,
        acquired: RefCell<HashMap<&'static str, usize>>,
        released: RefCell<HashMap<&'static str, usize>>,
    }

    impl CountingGdi {
        fn new(width: i32, height: i32) -> Self {
            Self {
                rect: Rect {
                    left: 10,
                    top: 20,
                    right: 10 + width,
                    bottom: 20 + height,
                },
                fail_at: None,
                next_handle: Cell::new(1),
                acquired: RefCell::default(),
                released: RefCell::default(),
            }
        }

        fn failing_at(mut self, call: &'static str) -> Self {
            self.fail_at = Some(call);
            self
        }

        fn check(&self, call: &'static str) -> Result<()> {
            if self.fail_at == Some(call) {
                Err(Error::Capture(format!("{} failed", call)))
            } else {
                Ok(())
            }
        }

        fn acquire(&self, kind: &'static str) -> Result<isize> {
            self.check(kind)?;
            *self.acquired.borrow_mut().entry(kind).or_default() += 1;
            let handle = self.next_handle.get();
            self.next_handle.set(handle + 1);
            Ok(handle)
        }

        fn release(&self, kind: &'static str) {
            *self.released.borrow_mut().entry(kind).or_default() += 1;
        }

        fn assert_balanced(&self) {
            let acquired = self.acquired.borrow();
            let released = self.released.borrow();
            assert_eq!(*acquired, *released);
        }

        fn acquired(&self, kind: &'static str) -> usize {
            self.acquired.borrow().get(kind).copied().unwrap_or(0)
        }
    }

    impl GraphicsSubsystem for CountingGdi {
        fn desktop_window(&self) -> WindowHandle {
            WindowHandle(0x10010)
        }

        fn window_rect(&self, _window: WindowHandle) -> Result<Rect> {
            self.check("window_rect")?;
            Ok(self.rect)
        }

        fn window_dc(&self, _window: WindowHandle) -> Result<DcHandle> {
            self.acquire("window_dc").map(DcHandle)
        }

        fn release_dc(&self, _window: WindowHandle, _dc: DcHandle) {
            self.release("window_dc");
        }

        fn create_compatible_dc(&self, _dc: DcHandle) -> Result<DcHandle> {
            self.acquire("memory_dc").map(DcHandle)
        }

        fn delete_dc(&self, _dc: DcHandle) {
            self.release("memory_dc");
        }

        fn create_compatible_bitmap(
            &self,
            _dc: DcHandle,
            _width: i32,
            _height: i32,
        ) -> Result<BitmapHandle> {
            self.acquire("bitmap").map(BitmapHandle)
        }

        fn delete_object(&self, _bitmap: BitmapHandle) {
            self.release("bitmap");
        }

        fn select_object(&self, _dc: DcHandle, _bitmap: BitmapHandle) -> Result<ObjectHandle> {
            self.acquire("selection").map(ObjectHandle)
        }

        fn restore_object(&self, _dc: DcHandle, _previous: ObjectHandle) {
            self.release("selection");
        }

        fn bit_blt(&self, _dest: DcHandle, _width: i32, _height: i32, _src: DcHandle) -> Result<()> {
            self.check("bit_blt")
        }

        fn read_pixels(
            &self,
            _dc: DcHandle,
            _bitmap: BitmapHandle,
            width: i32,
            height: i32,
        ) -> Result<Vec<u8>> {
            self.check("read_pixels")?;
            // Selection must already be undone
            assert_eq!(
                self.acquired("selection"),
                self.released.borrow().get("selection").copied().unwrap_or(0)
            );
            // Blue in BGRA
            Ok([255u8, 0, 0, 0].repeat(width as usize * height as usize))
        }
    }

    #[test]
    fn test_capture_dimensions_and_pixels() {
        let gdi = CountingGdi::new(64, 48);
        let image = capture_window(&gdi, WindowHandle(0x1234)).unwrap();

        assert_eq!(image.dimensions(), (64, 48));
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 255, 255]);
        gdi.assert_balanced();
        for kind in ["window_dc", "memory_dc", "bitmap", "selection"] {
            assert_eq!(gdi.acquired(kind), 1, "{} acquired once", kind);
        }
    }

    #[test]
    fn test_capture_screen_uses_desktop() {
        let gdi = CountingGdi::new(800, 480);
        let image = capture_screen(&gdi).unwrap();
        assert_eq!(image.dimensions(), (800, 480));
        gdi.assert_balanced();
    }

    #[test]
    fn test_resources_released_on_failure() {
        for call in [
            "window_dc",
            "memory_dc",
            "bitmap",
            "selection",
            "bit_blt",
            "read_pixels",
        ] {
            let gdi = CountingGdi::new(32, 32).failing_at(call);
            let result = capture_window(&gdi, WindowHandle(1));
            assert!(result.is_err(), "capture should fail at {}", call);
            gdi.assert_balanced();
        }
    }

    #[test]
    fn test_empty_window_rejected() {
        let gdi = CountingGdi::new(0, 10);
        assert!(matches!(
            capture_window(&gdi, WindowHandle(1)),
            Err(Error::Capture(_))
        ));
        assert_eq!(gdi.acquired("window_dc"), 0);
    }

    #[test]
    fn test_capture_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let gdi = CountingGdi::new(115, 115);

        let png = dir.path().join("thumb.png");
        capture_window_to_file(&gdi, WindowHandle(7), &png, ImageFormat::Png).unwrap();
        let jpeg = dir.path().join("thumb.jpg");
        capture_screen_to_file(&gdi, &jpeg, ImageFormat::Jpeg).unwrap();

        let saved = image::open(&png).unwrap();
        assert_eq!((saved.width(), saved.height()), (115, 115));
        assert!(jpeg.exists());
        gdi.assert_balanced();
    }

    #[cfg(not(windows))]
    #[test]
    fn test_system_unsupported() {
        assert!(matches!(system(), Err(Error::Unsupported(_))));
    }
}
