//! SwitchBlade UI SDK access.
//!
//! [`NativeSdk`] is the raw call surface of `RzSwitchbladeSDK2`, one method per
//! vendor entry point returning the vendor status code. [`Switchblade`] is the
//! safe façade applications use on top of it.

mod device;
mod protocol;

pub mod native;

#[cfg(test)]
pub(crate) mod mock;

pub use device::Switchblade;
pub use protocol::{BufferParams, HResult, PixelBuffer, PixelType, RenderTarget};

use crate::events::RawGesture;
use std::path::Path;
use std::sync::Arc;

/// Receives gesture callbacks from the native layer.
pub type GestureSink = Arc<dyn Fn(RawGesture) + Send + Sync>;

/// Receives dynamic key callbacks (key index, key state) from the native layer.
pub type DynamicKeySink = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// Raw SwitchBlade SDK entry points.
///
/// Implementations forward each call to the vendor library unchanged. Callers
/// must serialize access; [`Switchblade`] does.
pub trait NativeSdk: Send + Sync {
    /// `RzSBStart`
    fn start(&self) -> HResult;

    /// `RzSBStop`
    fn stop(&self);

    /// `RzSBRenderBuffer`
    fn render_buffer(&self, display: u32, params: &BufferParams<'_>) -> HResult;

    /// `RzSBSetImageDynamicKey`
    fn set_dynamic_key_image(&self, key: u32, state: u32, path: &Path) -> HResult;

    /// `RzSBSetImageTouchpad`
    fn set_touchpad_image(&self, path: &Path) -> HResult;

    /// `RzSBEnableGesture`
    fn enable_gesture(&self, gestures: u32, enable: bool) -> HResult;

    /// `RzSBEnableOSGesture`
    fn enable_os_gesture(&self, gestures: u32, enable: bool) -> HResult;

    /// `RzSBGestureSetCallback`; `None` unregisters.
    fn set_gesture_callback(&self, sink: Option<GestureSink>) -> HResult;

    /// `RzSBDynamicKeySetCallback`; `None` unregisters.
    fn set_dynamic_key_callback(&self, sink: Option<DynamicKeySink>) -> HResult;
}
