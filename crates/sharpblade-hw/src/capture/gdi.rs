//! GDI-backed [`GraphicsSubsystem`].

use super::{BitmapHandle, DcHandle, GraphicsSubsystem, ObjectHandle, Rect, WindowHandle};
use crate::{Error, Result};
use std::ffi::c_void;
use std::mem;
use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDIBits,
    GetWindowDC, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS,
    HBITMAP, HDC, HGDIOBJ, SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::{GetDesktopWindow, GetWindowRect};

/// The Windows GDI.
pub struct Gdi;

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut c_void)
}

fn hdc(dc: DcHandle) -> HDC {
    HDC(dc.0 as *mut c_void)
}

fn failed(call: &str) -> Error {
    Error::Capture(format!("{} failed", call))
}

impl GraphicsSubsystem for Gdi {
    fn desktop_window(&self) -> WindowHandle {
        WindowHandle(unsafe { GetDesktopWindow() }.0 as isize)
    }

    fn window_rect(&self, window: WindowHandle) -> Result<Rect> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd(window), &mut rect) }
            .map_err(|e| Error::Capture(format!("GetWindowRect: {}", e)))?;
        Ok(Rect {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        })
    }

    fn window_dc(&self, window: WindowHandle) -> Result<DcHandle> {
        let dc = unsafe { GetWindowDC(Some(hwnd(window))) };
        if dc.0.is_null() {
            return Err(failed("GetWindowDC"));
        }
        Ok(DcHandle(dc.0 as isize))
    }

    fn release_dc(&self, window: WindowHandle, dc: DcHandle) {
        unsafe {
            ReleaseDC(Some(hwnd(window)), hdc(dc));
        }
    }

    fn create_compatible_dc(&self, dc: DcHandle) -> Result<DcHandle> {
        let memory = unsafe { CreateCompatibleDC(Some(hdc(dc))) };
        if memory.0.is_null() {
            return Err(failed("CreateCompatibleDC"));
        }
        Ok(DcHandle(memory.0 as isize))
    }

    fn delete_dc(&self, dc: DcHandle) {
        unsafe {
            let _ = DeleteDC(hdc(dc));
        }
    }

    fn create_compatible_bitmap(
        &self,
        dc: DcHandle,
        width: i32,
        height: i32,
    ) -> Result<BitmapHandle> {
        let bitmap = unsafe { CreateCompatibleBitmap(hdc(dc), width, height) };
        if bitmap.0.is_null() {
            return Err(failed("CreateCompatibleBitmap"));
        }
        Ok(BitmapHandle(bitmap.0 as isize))
    }

    fn delete_object(&self, bitmap: BitmapHandle) {
        unsafe {
            let _ = DeleteObject(HGDIOBJ(bitmap.0 as *mut c_void));
        }
    }

    fn select_object(&self, dc: DcHandle, bitmap: BitmapHandle) -> Result<ObjectHandle> {
        let previous = unsafe { SelectObject(hdc(dc), HGDIOBJ(bitmap.0 as *mut c_void)) };
        if previous.0.is_null() {
            return Err(failed("SelectObject"));
        }
        Ok(ObjectHandle(previous.0 as isize))
    }

    fn restore_object(&self, dc: DcHandle, previous: ObjectHandle) {
        unsafe {
            let _ = SelectObject(hdc(dc), HGDIOBJ(previous.0 as *mut c_void));
        }
    }

    fn bit_blt(&self, dest: DcHandle, width: i32, height: i32, src: DcHandle) -> Result<()> {
        unsafe { BitBlt(hdc(dest), 0, 0, width, height, Some(hdc(src)), 0, 0, SRCCOPY) }
            .map_err(|e| Error::Capture(format!("BitBlt: {}", e)))
    }

    fn read_pixels(
        &self,
        dc: DcHandle,
        bitmap: BitmapHandle,
        width: i32,
        height: i32,
    ) -> Result<Vec<u8>> {
        let mut info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // Negative height requests top-down rows
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut data = vec![0u8; width as usize * height as usize * 4];
        let lines = unsafe {
            GetDIBits(
                hdc(dc),
                HBITMAP(bitmap.0 as *mut c_void),
                0,
                height as u32,
                Some(data.as_mut_ptr() as *mut c_void),
                &mut info,
                DIB_RGB_COLORS,
            )
        };
        if lines == 0 {
            return Err(failed("GetDIBits"));
        }
        Ok(data)
    }
}
