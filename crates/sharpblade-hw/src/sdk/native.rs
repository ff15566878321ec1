//! Binding to the vendor's `RzSwitchbladeSDK2` library.
//!
//! The SDK only ships for Windows. On other platforms [`load`] fails with
//! [`Error::Unsupported`].

use super::NativeSdk;
use crate::Result;
use std::sync::Arc;

/// Returns the native SDK binding for this platform.
pub fn load() -> Result<Arc<dyn NativeSdk>> {
    #[cfg(windows)]
    {
        Ok(Arc::new(razer::RazerSdk))
    }
    #[cfg(not(windows))]
    {
        Err(crate::Error::Unsupported("The SwitchBlade SDK"))
    }
}

#[cfg(windows)]
mod razer {
    use super::super::{BufferParams, DynamicKeySink, GestureSink, HResult, NativeSdk};
    use crate::events::RawGesture;
    use std::ffi::c_void;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use std::sync::{Mutex, PoisonError};

    type GestureCallback = unsafe extern "system" fn(u32, u32, u16, u16, u16) -> u32;
    type DynamicKeyCallback = unsafe extern "system" fn(u32, u32) -> u32;

    #[link(name = "RzSwitchbladeSDK2")]
    extern "system" {
        fn RzSBStart() -> u32;
        fn RzSBStop();
        fn RzSBRenderBuffer(display: u32, params: *const c_void) -> u32;
        fn RzSBSetImageDynamicKey(key: u32, state: u32, filename: *const u16) -> u32;
        fn RzSBSetImageTouchpad(filename: *const u16) -> u32;
        fn RzSBEnableGesture(gesture: u32, enable: bool) -> u32;
        fn RzSBEnableOSGesture(gesture: u32, enable: bool) -> u32;
        fn RzSBGestureSetCallback(callback: Option<GestureCallback>) -> u32;
        fn RzSBDynamicKeySetCallback(callback: Option<DynamicKeyCallback>) -> u32;
    }

    // The SDK's callbacks carry no context pointer, so sinks live in globals.
    static GESTURE_SINK: Mutex<Option<GestureSink>> = Mutex::new(None);
    static DYNAMIC_KEY_SINK: Mutex<Option<DynamicKeySink>> = Mutex::new(None);

    unsafe extern "system" fn on_gesture(
        gesture: u32,
        parameters: u32,
        x: u16,
        y: u16,
        z: u16,
    ) -> u32 {
        let sink = GESTURE_SINK
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            sink(RawGesture {
                gesture,
                parameters,
                x,
                y,
                z,
            });
        }
        HResult::OK.0
    }

    unsafe extern "system" fn on_dynamic_key(key: u32, state: u32) -> u32 {
        let sink = DYNAMIC_KEY_SINK
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            sink(key, state);
        }
        HResult::OK.0
    }

    fn wide_path(path: &Path) -> Vec<u16> {
        path.as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    /// `RzSwitchbladeSDK2.dll`
    pub(super) struct RazerSdk;

    impl NativeSdk for RazerSdk {
        fn start(&self) -> HResult {
            HResult(unsafe { RzSBStart() })
        }

        fn stop(&self) {
            unsafe { RzSBStop() }
        }

        fn render_buffer(&self, display: u32, params: &BufferParams<'_>) -> HResult {
            let ptr = params as *const BufferParams<'_> as *const c_void;
            HResult(unsafe { RzSBRenderBuffer(display, ptr) })
        }

        fn set_dynamic_key_image(&self, key: u32, state: u32, path: &Path) -> HResult {
            let filename = wide_path(path);
            HResult(unsafe { RzSBSetImageDynamicKey(key, state, filename.as_ptr()) })
        }

        fn set_touchpad_image(&self, path: &Path) -> HResult {
            let filename = wide_path(path);
            HResult(unsafe { RzSBSetImageTouchpad(filename.as_ptr()) })
        }

        fn enable_gesture(&self, gestures: u32, enable: bool) -> HResult {
            HResult(unsafe { RzSBEnableGesture(gestures, enable) })
        }

        fn enable_os_gesture(&self, gestures: u32, enable: bool) -> HResult {
            HResult(unsafe { RzSBEnableOSGesture(gestures, enable) })
        }

        fn set_gesture_callback(&self, sink: Option<GestureSink>) -> HResult {
            let callback: Option<GestureCallback> =
                sink.as_ref().map(|_| on_gesture as GestureCallback);
            *GESTURE_SINK.lock().unwrap_or_else(PoisonError::into_inner) = sink;
            HResult(unsafe { RzSBGestureSetCallback(callback) })
        }

        fn set_dynamic_key_callback(&self, sink: Option<DynamicKeySink>) -> HResult {
            let callback: Option<DynamicKeyCallback> =
                sink.as_ref().map(|_| on_dynamic_key as DynamicKeyCallback);
            *DYNAMIC_KEY_SINK.lock().unwrap_or_else(PoisonError::into_inner) = sink;
            HResult(unsafe { RzSBDynamicKeySetCallback(callback) })
        }
    }
}
