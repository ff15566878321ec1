//! SharpBlade Hardware Library
//!
//! Safe bindings for the Razer SwitchBlade UI SDK (the touchpad display and
//! dynamic keys found on Blade laptops and DeathStalker Ultimate / BlackWidow
//! Ultimate keyboards), plus the helpers an app needs around it: a render
//! bridge for pushing a surface to the touchpad, screen capture for
//! thumbnails, and the `.rzdisplaystate` naming workaround.

pub mod capture;
pub mod display_state;
pub mod error;
pub mod events;
pub mod framebuffer;
pub mod render;
pub mod sdk;
pub mod watch;

pub use capture::{GraphicsSubsystem, WindowHandle};
pub use display_state::{DisplayStateDescriptor, DisplayStateFile};
pub use error::{Error, Result, SdkErrorKind};
pub use events::{
    Direction, DynamicKey, DynamicKeyEvent, FlickEvent, GestureEvent, GestureType, KeyState,
    SwitchbladeEvent,
};
pub use framebuffer::Framebuffer;
pub use render::{FrameSink, PaintableSurface, RenderBridge};
pub use sdk::{HResult, NativeSdk, PixelBuffer, PixelType, RenderTarget, Switchblade};

/// Touchpad display dimensions
pub const TOUCHPAD_WIDTH: u16 = 800;
pub const TOUCHPAD_HEIGHT: u16 = 480;

/// Dynamic key display dimensions
pub const DYNAMIC_KEY_WIDTH: u16 = 115;
pub const DYNAMIC_KEY_HEIGHT: u16 = 115;

/// Number of dynamic keys on the device
pub const DYNAMIC_KEY_COUNT: u8 = 10;
