//! Application state management.

use anyhow::{Context, Result};
use sharpblade_hw::sdk::native;
use sharpblade_hw::{
    DisplayStateDescriptor, DisplayStateFile, KeyState, NativeSdk, RenderBridge, RenderTarget,
    Switchblade, SwitchbladeEvent,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{Config, DisplayStateMode};
use crate::rendering::Dashboard;

/// Shared application state.
pub struct AppState {
    /// SDK façade
    device: Arc<Switchblade>,

    /// Touchpad dashboard (absent when a static image is shown)
    dashboard: Option<Arc<Mutex<Dashboard>>>,

    /// Timer pushing the dashboard to the touchpad
    bridge: Option<RenderBridge<Dashboard>>,

    /// `.rzdisplaystate` workaround
    display_state: Option<DisplayStateFile>,
}

impl AppState {
    /// Starts the vendor SDK and everything that depends on it.
    pub fn new(config: &Config) -> Result<Self> {
        let sdk = native::load().context("SwitchBlade SDK not available")?;
        Self::with_sdk(config, sdk)
    }

    /// Like [`AppState::new`] with an explicit SDK binding.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_sdk(config: &Config, sdk: Arc<dyn NativeSdk>) -> Result<Self> {
        let gestures = config.gestures.gesture_types()?;
        let keys = config
            .dynamic_keys
            .iter()
            .map(|entry| entry.dynamic_key().map(|key| (key, entry)))
            .collect::<Result<Vec<_>>>()?;

        // Nothing else makes sense without the SDK
        let device = Arc::new(Switchblade::start(sdk).context("Failed to start SwitchBlade SDK")?);

        for gesture in gestures {
            if let Err(e) = device.enable_gesture(gesture, true) {
                warn!("Failed to enable {} gesture: {}", gesture, e);
            }
            if config.gestures.forward_to_os {
                if let Err(e) = device.enable_os_gesture(gesture, true) {
                    warn!("Failed to forward {} gesture to OS: {}", gesture, e);
                }
            }
        }

        for (key, entry) in keys {
            let images = [
                (KeyState::Up, entry.up.as_path()),
                (KeyState::Down, entry.down_image()),
            ];
            for (state, image) in images {
                if let Err(e) = device.set_dynamic_key_image(key, state, image) {
                    warn!("Failed to set {} image for {}: {}", state_name(state), key, e);
                }
            }
        }

        let (dashboard, bridge) = match &config.touchpad_image {
            Some(image) => {
                device
                    .set_touchpad_image(image)
                    .with_context(|| format!("Failed to show {}", image.display()))?;
                info!("Showing static touchpad image {}", image.display());
                (None, None)
            }
            None => {
                let dashboard = Arc::new(Mutex::new(Dashboard::new(
                    config.render.background_color(),
                    config.render.accent_color(),
                )?));
                let bridge = RenderBridge::start(
                    Arc::downgrade(&dashboard),
                    device.clone(),
                    RenderTarget::Touchpad,
                    config.render.interval(),
                )?;
                (Some(dashboard), Some(bridge))
            }
        };

        let display_state = Self::start_display_state(config)?;

        Ok(Self {
            device,
            dashboard,
            bridge,
            display_state,
        })
    }

    fn start_display_state(config: &Config) -> Result<Option<DisplayStateFile>> {
        let settings = &config.display_state;
        if settings.mode == DisplayStateMode::Off {
            info!("RzDisplayState monitoring disabled");
            return Ok(None);
        }

        let descriptor = match &settings.app {
            Some(app) => DisplayStateDescriptor::new(app.clone()),
            None => DisplayStateDescriptor::for_current_process()?,
        };
        let directory = match &settings.directory {
            Some(directory) => directory.clone(),
            None => std::env::current_dir().context("Failed to read working directory")?,
        };

        let file = DisplayStateFile::new(descriptor, directory, settings.poll_interval());
        let enable = match settings.mode {
            DisplayStateMode::Auto => file.workaround_required(),
            _ => true,
        };
        if enable {
            if let Err(e) = file.set_enabled(true) {
                warn!("Failed to start RzDisplayState monitoring: {}", e);
            }
        }
        Ok(Some(file))
    }

    /// Subscribes to gesture and dynamic key events.
    pub fn subscribe(&self) -> broadcast::Receiver<SwitchbladeEvent> {
        self.device.subscribe()
    }

    /// Applies an event to the dashboard.
    pub fn handle_event(&self, event: &SwitchbladeEvent) {
        debug!("Event: {:?}", event);
        if let Some(dashboard) = &self.dashboard {
            dashboard
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .handle_event(event);
        }
    }

    /// Renders a frame immediately instead of waiting for the timer.
    pub fn render_now(&self) -> Result<bool> {
        match &self.bridge {
            Some(bridge) => Ok(bridge.render_once()?),
            None => Ok(false),
        }
    }

    /// Number of frames uploaded to the touchpad.
    pub fn frames_rendered(&self) -> u64 {
        self.bridge
            .as_ref()
            .map(|bridge| bridge.frames_rendered())
            .unwrap_or(0)
    }

    /// Returns true while the display state workaround is armed.
    pub fn is_display_state_monitored(&self) -> bool {
        self.display_state
            .as_ref()
            .is_some_and(|file| file.is_enabled())
    }

    /// Stops rendering and monitoring, then the SDK. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if let Some(bridge) = &self.bridge {
            bridge.stop();
        }
        if let Some(file) = &self.display_state {
            if let Err(e) = file.set_enabled(false) {
                warn!("Failed to stop RzDisplayState monitoring: {}", e);
            }
        }
        self.device.shutdown();
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn state_name(state: KeyState) -> &'static str {
    match state {
        KeyState::Down | KeyState::Hold => "down",
        KeyState::Up | KeyState::None => "up",
    }
}
