//! Configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sharpblade_hw::framebuffer::parse_hex_color;
use sharpblade_hw::{DynamicKey, GestureType};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Static touchpad image; replaces the dashboard when set
    #[serde(default)]
    pub touchpad_image: Option<PathBuf>,

    /// Touchpad dashboard rendering
    #[serde(default)]
    pub render: RenderConfig,

    /// `.rzdisplaystate` workaround
    #[serde(default)]
    pub display_state: DisplayStateConfig,

    /// Gesture delivery
    #[serde(default)]
    pub gestures: GestureConfig,

    /// Dynamic key images
    #[serde(default)]
    pub dynamic_keys: Vec<DynamicKeyConfig>,
}

/// Dashboard rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Render interval in milliseconds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Background color (#RRGGBB)
    #[serde(default = "default_background")]
    pub background: String,

    /// Accent color (#RRGGBB)
    #[serde(default = "default_accent")]
    pub accent: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            background: default_background(),
            accent: default_accent(),
        }
    }
}

impl RenderConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }

    pub fn background_color(&self) -> u32 {
        color_or_default(&self.background, "background", 0x000000)
    }

    pub fn accent_color(&self) -> u32 {
        color_or_default(&self.accent, "accent", 0x44D62C)
    }
}

fn color_or_default(value: &str, name: &str, fallback: u32) -> u32 {
    parse_hex_color(value).unwrap_or_else(|| {
        warn!(
            "Invalid {} color '{}', using #{:06X}",
            name, value, fallback
        );
        fallback
    })
}

/// When to run the display state workaround.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStateMode {
    /// Only when the app name needs it
    #[default]
    Auto,
    On,
    Off,
}

/// Display state workaround configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayStateConfig {
    #[serde(default)]
    pub mode: DisplayStateMode,

    /// Watcher poll interval in milliseconds
    #[serde(default = "default_display_state_poll")]
    pub poll: u64,

    /// Directory holding the state files (default: working directory)
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// App name override (default: executable name)
    #[serde(default)]
    pub app: Option<String>,
}

impl Default for DisplayStateConfig {
    fn default() -> Self {
        Self {
            mode: DisplayStateMode::default(),
            poll: default_display_state_poll(),
            directory: None,
            app: None,
        }
    }
}

impl DisplayStateConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll)
    }
}

/// Gesture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Gestures delivered to the daemon
    #[serde(default = "default_gestures")]
    pub enabled: Vec<String>,

    /// Also let the OS handle the enabled gestures
    #[serde(default)]
    pub forward_to_os: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: default_gestures(),
            forward_to_os: false,
        }
    }
}

impl GestureConfig {
    /// Parses the configured gesture names.
    pub fn gesture_types(&self) -> Result<Vec<GestureType>> {
        self.enabled
            .iter()
            .map(|name| {
                name.parse::<GestureType>()
                    .with_context(|| format!("Invalid gesture in configuration: {}", name))
            })
            .collect()
    }
}

/// Images for one dynamic key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicKeyConfig {
    /// Key number (1-10)
    pub key: u8,

    /// Image shown while the key is up
    pub up: PathBuf,

    /// Image shown while the key is held down (default: same as up)
    #[serde(default)]
    pub down: Option<PathBuf>,
}

impl DynamicKeyConfig {
    pub fn dynamic_key(&self) -> Result<DynamicKey> {
        DynamicKey::new(self.key).context("Invalid dynamic key in configuration")
    }

    pub fn down_image(&self) -> &Path {
        self.down.as_deref().unwrap_or(&self.up)
    }
}

// Default value functions
fn default_interval() -> u64 {
    55
}

fn default_background() -> String {
    "#000000".to_string()
}

fn default_accent() -> String {
    "#44D62C".to_string() // Razer green
}

fn default_display_state_poll() -> u64 {
    500
}

fn default_gestures() -> Vec<String> {
    vec![
        "press".to_string(),
        "tap".to_string(),
        "flick".to_string(),
        "scroll".to_string(),
        "release".to_string(),
    ]
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
        Ok(())
    }
}
