//! In-memory SDK that records calls, for tests.

use super::{BufferParams, DynamicKeySink, GestureSink, HResult, NativeSdk};
use crate::events::RawGesture;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub(crate) struct Upload {
    pub display: u32,
    pub data_size: u32,
    pub first_byte: Option<u8>,
}

#[derive(Default)]
struct Calls {
    start_result: Option<HResult>,
    render_result: Option<HResult>,
    key_image_result: Option<HResult>,
    stops: usize,
    uploads: Vec<Upload>,
    key_images: Vec<(u32, u32, PathBuf)>,
    gestures: Vec<(bool, u32, bool)>,
    gesture_sink: Option<GestureSink>,
    key_sink: Option<DynamicKeySink>,
}

#[derive(Default)]
pub(crate) struct RecordingSdk {
    calls: Mutex<Calls>,
}

impl RecordingSdk {
    pub fn failing_start(code: HResult) -> Self {
        let sdk = Self::default();
        sdk.calls.lock().unwrap().start_result = Some(code);
        sdk
    }

    pub fn fail_renders(&self, code: HResult) {
        self.calls.lock().unwrap().render_result = Some(code);
    }

    pub fn fail_key_images(&self, code: HResult) {
        self.calls.lock().unwrap().key_image_result = Some(code);
    }

    pub fn stop_calls(&self) -> usize {
        self.calls.lock().unwrap().stops
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.calls.lock().unwrap().uploads.clone()
    }

    pub fn key_images(&self) -> Vec<(u32, u32, PathBuf)> {
        self.calls.lock().unwrap().key_images.clone()
    }

    pub fn gesture_settings(&self) -> Vec<(bool, u32, bool)> {
        self.calls.lock().unwrap().gestures.clone()
    }

    pub fn has_gesture_callback(&self) -> bool {
        self.calls.lock().unwrap().gesture_sink.is_some()
    }

    pub fn has_dynamic_key_callback(&self) -> bool {
        self.calls.lock().unwrap().key_sink.is_some()
    }

    pub fn fire_gesture(&self, gesture: u32, parameters: u32, x: u16, y: u16, z: u16) {
        let sink = self.calls.lock().unwrap().gesture_sink.clone();
        if let Some(sink) = sink {
            sink(RawGesture {
                gesture,
                parameters,
                x,
                y,
                z,
            });
        }
    }

    pub fn fire_dynamic_key(&self, key: u32, state: u32) {
        let sink = self.calls.lock().unwrap().key_sink.clone();
        if let Some(sink) = sink {
            sink(key, state);
        }
    }
}

impl NativeSdk for RecordingSdk {
    fn start(&self) -> HResult {
        self.calls.lock().unwrap().start_result.unwrap_or(HResult::OK)
    }

    fn stop(&self) {
        self.calls.lock().unwrap().stops += 1;
    }

    fn render_buffer(&self, display: u32, params: &BufferParams<'_>) -> HResult {
        let mut calls = self.calls.lock().unwrap();
        if let Some(code) = calls.render_result {
            return code;
        }
        // SAFETY: params borrows a live PixelBuffer of data_size bytes
        let first_byte = (params.data_size() > 0).then(|| unsafe { *params.data_ptr() });
        calls.uploads.push(Upload {
            display,
            data_size: params.data_size(),
            first_byte,
        });
        HResult::OK
    }

    fn set_dynamic_key_image(&self, key: u32, state: u32, path: &Path) -> HResult {
        let mut calls = self.calls.lock().unwrap();
        if let Some(code) = calls.key_image_result {
            return code;
        }
        calls.key_images.push((key, state, path.to_path_buf()));
        HResult::OK
    }

    fn set_touchpad_image(&self, _path: &Path) -> HResult {
        HResult::OK
    }

    fn enable_gesture(&self, gestures: u32, enable: bool) -> HResult {
        self.calls
            .lock()
            .unwrap()
            .gestures
            .push((false, gestures, enable));
        HResult::OK
    }

    fn enable_os_gesture(&self, gestures: u32, enable: bool) -> HResult {
        self.calls
            .lock()
            .unwrap()
            .gestures
            .push((true, gestures, enable));
        HResult::OK
    }

    fn set_gesture_callback(&self, sink: Option<GestureSink>) -> HResult {
        self.calls.lock().unwrap().gesture_sink = sink;
        HResult::OK
    }

    fn set_dynamic_key_callback(&self, sink: Option<DynamicKeySink>) -> HResult {
        self.calls.lock().unwrap().key_sink = sink;
        HResult::OK
    }
}
