//! SwitchBlade SDK session.

use crate::events::{
    DynamicKey, DynamicKeyEvent, GestureEvent, GestureType, KeyState, SwitchbladeEvent,
};
use crate::render::FrameSink;
use crate::{Error, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::protocol::{HResult, PixelBuffer, RenderTarget};
use super::{DynamicKeySink, GestureSink, NativeSdk};

/// Capacity of the event channel; slow subscribers lag instead of blocking
/// the SDK's callback thread.
const EVENT_CAPACITY: usize = 64;

/// A started SwitchBlade SDK session.
///
/// Owns the SDK from a successful [`Switchblade::start`] until
/// [`Switchblade::shutdown`] or drop. Every native call is made while holding
/// the session lock, so gesture handlers, render timers and the main thread
/// can share one instance.
pub struct Switchblade {
    sdk: Arc<dyn NativeSdk>,
    active: Mutex<bool>,
    events: broadcast::Sender<SwitchbladeEvent>,
}

fn check(code: HResult, call: &str) -> Result<()> {
    if code.is_success() {
        Ok(())
    } else {
        Err(Error::device(code, call))
    }
}

/// Undoes a partially completed start. Safe to run whatever state the SDK is in.
fn unwind(sdk: &dyn NativeSdk) {
    let _ = sdk.set_gesture_callback(None);
    let _ = sdk.set_dynamic_key_callback(None);
    sdk.stop();
}

impl Switchblade {
    /// Starts the SDK and registers the gesture and dynamic key callbacks.
    pub fn start(sdk: Arc<dyn NativeSdk>) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        if let Err(e) = check(sdk.start(), "RzSBStart") {
            unwind(sdk.as_ref());
            return Err(e);
        }

        let gesture_tx = events.clone();
        let on_gesture: GestureSink = Arc::new(move |raw| match GestureEvent::from_raw(raw) {
            Some(event) => {
                // No subscribers is fine
                let _ = gesture_tx.send(SwitchbladeEvent::Gesture(event));
            }
            None => debug!("Ignoring unknown gesture type 0x{:04X}", raw.gesture),
        });

        let key_tx = events.clone();
        let on_key: DynamicKeySink = Arc::new(move |key, state| {
            match DynamicKeyEvent::from_raw(key, state) {
                Some(event) => {
                    let _ = key_tx.send(SwitchbladeEvent::DynamicKey(event));
                }
                None => debug!("Ignoring callback for unknown dynamic key {}", key),
            }
        });

        let registered = check(
            sdk.set_gesture_callback(Some(on_gesture)),
            "RzSBGestureSetCallback",
        )
        .and_then(|_| {
            check(
                sdk.set_dynamic_key_callback(Some(on_key)),
                "RzSBDynamicKeySetCallback",
            )
        });
        if let Err(e) = registered {
            unwind(sdk.as_ref());
            return Err(e);
        }

        info!("SwitchBlade SDK started");

        Ok(Self {
            sdk,
            active: Mutex::new(true),
            events,
        })
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs a native call while holding the session lock.
    fn with_sdk<T>(&self, f: impl FnOnce(&dyn NativeSdk) -> Result<T>) -> Result<T> {
        let active = self.lock();
        if !*active {
            return Err(Error::Disposed);
        }
        f(self.sdk.as_ref())
    }

    /// Returns true until the session is shut down.
    pub fn is_active(&self) -> bool {
        *self.lock()
    }

    /// Subscribes to gesture and dynamic key events.
    pub fn subscribe(&self) -> broadcast::Receiver<SwitchbladeEvent> {
        self.events.subscribe()
    }

    /// Uploads one frame to a display.
    ///
    /// The buffer must exactly match the target's dimensions; anything else
    /// is rejected before it reaches the native layer.
    pub fn render(&self, target: RenderTarget, buffer: &PixelBuffer) -> Result<()> {
        buffer.check_target(target)?;
        let params = buffer.params()?;

        self.with_sdk(|sdk| {
            check(
                sdk.render_buffer(target.display_id(), &params),
                "RzSBRenderBuffer",
            )
        })?;

        debug!("Rendered {} bytes to {}", params.data_size(), target);
        Ok(())
    }

    /// Fills a display with black.
    pub fn clear(&self, target: RenderTarget) -> Result<()> {
        let (width, height) = target.dimensions();
        let size = width as usize * height as usize * 2;
        let buffer = PixelBuffer::rgb565(width, height, vec![0; size])?;
        self.render(target, &buffer)
    }

    /// Sets the image shown on a dynamic key for the given state.
    pub fn set_dynamic_key_image(
        &self,
        key: DynamicKey,
        state: KeyState,
        image: &Path,
    ) -> Result<()> {
        self.with_sdk(|sdk| {
            let code = sdk.set_dynamic_key_image(key.index() as u32, state as u32, image);
            if code.is_success() {
                Ok(())
            } else {
                Err(Error::dynamic_key(code, "RzSBSetImageDynamicKey"))
            }
        })?;

        debug!("Set {} {:?} image to {}", key, state, image.display());
        Ok(())
    }

    /// Shows a static image on the touchpad.
    pub fn set_touchpad_image(&self, image: &Path) -> Result<()> {
        self.with_sdk(|sdk| check(sdk.set_touchpad_image(image), "RzSBSetImageTouchpad"))?;
        debug!("Set touchpad image to {}", image.display());
        Ok(())
    }

    /// Enables or disables delivery of a gesture type to this app.
    pub fn enable_gesture(&self, gesture: GestureType, enable: bool) -> Result<()> {
        self.with_sdk(|sdk| {
            check(
                sdk.enable_gesture(gesture.bits(), enable),
                "RzSBEnableGesture",
            )
        })?;
        debug!("Gesture {} enabled: {}", gesture, enable);
        Ok(())
    }

    /// Enables or disables forwarding of a gesture type to the OS.
    pub fn enable_os_gesture(&self, gesture: GestureType, enable: bool) -> Result<()> {
        self.with_sdk(|sdk| {
            check(
                sdk.enable_os_gesture(gesture.bits(), enable),
                "RzSBEnableOSGesture",
            )
        })?;
        debug!("OS gesture {} forwarding: {}", gesture, enable);
        Ok(())
    }

    /// Unregisters callbacks and stops the SDK. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let mut active = self.lock();
        if !*active {
            return;
        }

        let code = self.sdk.set_gesture_callback(None);
        if !code.is_success() {
            warn!("Failed to unregister gesture callback: {}", code);
        }
        let code = self.sdk.set_dynamic_key_callback(None);
        if !code.is_success() {
            warn!("Failed to unregister dynamic key callback: {}", code);
        }
        self.sdk.stop();

        *active = false;
        info!("SwitchBlade SDK stopped");
    }
}

impl FrameSink for Switchblade {
    fn upload(&self, target: RenderTarget, buffer: &PixelBuffer) -> Result<()> {
        self.render(target, buffer)
    }
}

impl Drop for Switchblade {
    fn drop(&mut self) {
        self.shutdown();
    }
}
