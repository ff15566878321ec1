//! Touchpad gesture and dynamic key events.
//!
//! Events are produced by the SDK callback dispatch in [`crate::sdk`] and
//! delivered to subscribers through a broadcast channel. Consumers cannot
//! construct them.

use crate::{Error, Result, DYNAMIC_KEY_COUNT};
use std::str::FromStr;

/// Direction reported by flick and scroll gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum Direction {
    #[default]
    None = 0,
    Left = 1,
    Right = 2,
    Up = 3,
    Down = 4,
}

impl Direction {
    /// Converts the vendor's direction ordinal. Out-of-range values map to `None`.
    pub fn from_raw(value: u32) -> Self {
        match value {
            1 => Direction::Left,
            2 => Direction::Right,
            3 => Direction::Up,
            4 => Direction::Down,
            _ => Direction::None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::None => write!(f, "none"),
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Gesture types understood by the touchpad, as bit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum GestureType {
    Press = 0x0001,
    Tap = 0x0002,
    Flick = 0x0004,
    Zoom = 0x0008,
    Rotate = 0x0010,
    Move = 0x0020,
    Hold = 0x0040,
    Release = 0x0080,
    Scroll = 0x0100,
    All = 0xFFFF,
}

impl GestureType {
    /// Returns the raw flag value passed to the SDK.
    pub fn bits(&self) -> u32 {
        *self as u32
    }

    /// Converts a single raw flag as reported by the gesture callback.
    pub fn from_bits(value: u32) -> Option<Self> {
        match value {
            0x0001 => Some(GestureType::Press),
            0x0002 => Some(GestureType::Tap),
            0x0004 => Some(GestureType::Flick),
            0x0008 => Some(GestureType::Zoom),
            0x0010 => Some(GestureType::Rotate),
            0x0020 => Some(GestureType::Move),
            0x0040 => Some(GestureType::Hold),
            0x0080 => Some(GestureType::Release),
            0x0100 => Some(GestureType::Scroll),
            0xFFFF => Some(GestureType::All),
            _ => None,
        }
    }
}

impl FromStr for GestureType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "press" => Ok(GestureType::Press),
            "tap" => Ok(GestureType::Tap),
            "flick" => Ok(GestureType::Flick),
            "zoom" => Ok(GestureType::Zoom),
            "rotate" => Ok(GestureType::Rotate),
            "move" => Ok(GestureType::Move),
            "hold" => Ok(GestureType::Hold),
            "release" => Ok(GestureType::Release),
            "scroll" => Ok(GestureType::Scroll),
            "all" => Ok(GestureType::All),
            _ => Err(Error::InvalidGesture(s.to_string())),
        }
    }
}

impl std::fmt::Display for GestureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GestureType::Press => "press",
            GestureType::Tap => "tap",
            GestureType::Flick => "flick",
            GestureType::Zoom => "zoom",
            GestureType::Rotate => "rotate",
            GestureType::Move => "move",
            GestureType::Hold => "hold",
            GestureType::Release => "release",
            GestureType::Scroll => "scroll",
            GestureType::All => "all",
        };
        write!(f, "{}", name)
    }
}

/// Gesture data exactly as the native callback hands it over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawGesture {
    pub gesture: u32,
    pub parameters: u32,
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

/// A flick on the touchpad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlickEvent {
    direction: Direction,
    touchpoint_count: u32,
}

impl FlickEvent {
    pub(crate) fn new(touchpoint_count: u32, direction: Direction) -> Self {
        Self {
            direction,
            touchpoint_count,
        }
    }

    /// Direction of the flick.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of fingers involved.
    pub fn touchpoint_count(&self) -> u32 {
        self.touchpoint_count
    }
}

/// A recognised touchpad gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    Press { touchpoints: u32, x: u16, y: u16 },
    Tap { x: u16, y: u16 },
    Flick(FlickEvent),
    Zoom { zoom_in: bool },
    Rotate { clockwise: bool },
    Move { x: u16, y: u16 },
    Hold { touchpoints: u32, x: u16, y: u16, z: u16 },
    Release { touchpoints: u32, x: u16, y: u16 },
    Scroll { direction: Direction, x: u16, y: u16 },
}

impl GestureEvent {
    /// Decodes a native gesture callback. Unknown gesture types yield `None`.
    pub(crate) fn from_raw(raw: RawGesture) -> Option<Self> {
        let event = match GestureType::from_bits(raw.gesture)? {
            GestureType::Press => GestureEvent::Press {
                touchpoints: raw.parameters,
                x: raw.x,
                y: raw.y,
            },
            GestureType::Tap => GestureEvent::Tap { x: raw.x, y: raw.y },
            // Flick carries its direction in the z word
            GestureType::Flick => GestureEvent::Flick(FlickEvent::new(
                raw.parameters,
                Direction::from_raw(raw.z as u32),
            )),
            GestureType::Zoom => GestureEvent::Zoom {
                zoom_in: raw.parameters == 1,
            },
            GestureType::Rotate => GestureEvent::Rotate {
                clockwise: raw.parameters == 1,
            },
            GestureType::Move => GestureEvent::Move { x: raw.x, y: raw.y },
            GestureType::Hold => GestureEvent::Hold {
                touchpoints: raw.parameters,
                x: raw.x,
                y: raw.y,
                z: raw.z,
            },
            GestureType::Release => GestureEvent::Release {
                touchpoints: raw.parameters,
                x: raw.x,
                y: raw.y,
            },
            GestureType::Scroll => GestureEvent::Scroll {
                direction: Direction::from_raw(raw.parameters),
                x: raw.x,
                y: raw.y,
            },
            GestureType::All => return None,
        };
        Some(event)
    }

    /// Returns the gesture type of this event.
    pub fn gesture_type(&self) -> GestureType {
        match self {
            GestureEvent::Press { .. } => GestureType::Press,
            GestureEvent::Tap { .. } => GestureType::Tap,
            GestureEvent::Flick(_) => GestureType::Flick,
            GestureEvent::Zoom { .. } => GestureType::Zoom,
            GestureEvent::Rotate { .. } => GestureType::Rotate,
            GestureEvent::Move { .. } => GestureType::Move,
            GestureEvent::Hold { .. } => GestureType::Hold,
            GestureEvent::Release { .. } => GestureType::Release,
            GestureEvent::Scroll { .. } => GestureType::Scroll,
        }
    }
}

/// One of the ten dynamic keys above the touchpad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DynamicKey(u8);

impl DynamicKey {
    /// Creates a dynamic key from its 1-based index.
    pub fn new(index: u8) -> Result<Self> {
        if (1..=DYNAMIC_KEY_COUNT).contains(&index) {
            Ok(Self(index))
        } else {
            Err(Error::InvalidDynamicKey(index))
        }
    }

    /// Returns the 1-based key index.
    pub fn index(&self) -> u8 {
        self.0
    }

    /// Iterates over all dynamic keys in order.
    pub fn all() -> impl Iterator<Item = DynamicKey> {
        (1..=DYNAMIC_KEY_COUNT).map(DynamicKey)
    }
}

impl std::fmt::Display for DynamicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DK{}", self.0)
    }
}

/// State of a dynamic key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum KeyState {
    #[default]
    None = 0,
    Up = 1,
    Down = 2,
    Hold = 3,
}

impl KeyState {
    pub fn from_raw(value: u32) -> Self {
        match value {
            1 => KeyState::Up,
            2 => KeyState::Down,
            3 => KeyState::Hold,
            _ => KeyState::None,
        }
    }
}

/// A dynamic key changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicKeyEvent {
    key: DynamicKey,
    state: KeyState,
}

impl DynamicKeyEvent {
    /// Decodes a native dynamic key callback. Unknown keys yield `None`.
    pub(crate) fn from_raw(key: u32, state: u32) -> Option<Self> {
        let index = u8::try_from(key).ok()?;
        Some(Self {
            key: DynamicKey::new(index).ok()?,
            state: KeyState::from_raw(state),
        })
    }

    pub fn key(&self) -> DynamicKey {
        self.key
    }

    pub fn state(&self) -> KeyState {
        self.state
    }
}

/// Everything the SDK reports back to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchbladeEvent {
    Gesture(GestureEvent),
    DynamicKey(DynamicKeyEvent),
}
