//! Pointer device arbitration and raw pointer events.
//!
//! The arbiter decides which input classes may currently produce ink. User
//! preferences toggle mouse and touch; a pen-proximity latch suppresses touch
//! while a stylus hovers so palm contact never turns into ink.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Physical input class of a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerDeviceKind {
    Mouse,
    Touch,
    Pen,
}

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    /// The platform aborted the contact (e.g. palm rejection by the OS).
    Cancel,
}

/// Raw pointer event from the presentation layer, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub device: PointerDeviceKind,
    pub phase: PointerPhase,
    pub position: Point,
    /// Contact id distinguishing simultaneous pointers of one device class.
    #[serde(default)]
    pub pointer_id: u32,
    /// Normalized pressure, if the device reports one.
    #[serde(default)]
    pub pressure: Option<f32>,
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl PointerEvent {
    pub fn new(device: PointerDeviceKind, phase: PointerPhase, position: Point) -> Self {
        Self {
            device,
            phase,
            position,
            pointer_id: 0,
            pressure: None,
            timestamp_ms: 0,
        }
    }

    pub fn with_pointer_id(mut self, pointer_id: u32) -> Self {
        self.pointer_id = pointer_id;
        self
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }

    pub fn at(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }
}

/// Discrete stylus proximity signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenProximity {
    Entered,
    Left,
}

/// Snapshot of device enablement.
///
/// Only [`PointerDeviceArbiter`] can build or change one, so `pen_detected`
/// is only ever set by a proximity signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointerDeviceState {
    mouse_enabled: bool,
    touch_enabled: bool,
    pen_detected: bool,
}

impl PointerDeviceState {
    pub fn mouse_enabled(&self) -> bool {
        self.mouse_enabled
    }

    pub fn touch_enabled(&self) -> bool {
        self.touch_enabled
    }

    pub fn pen_detected(&self) -> bool {
        self.pen_detected
    }

    /// Touch is suppressed while a pen is nearby.
    pub fn effective_touch_enabled(&self) -> bool {
        self.touch_enabled && !self.pen_detected
    }

    /// Mouse is never gated by the pen latch.
    pub fn effective_mouse_enabled(&self) -> bool {
        self.mouse_enabled
    }

    /// Whether `device` may currently produce ink. Pen input is always allowed.
    pub fn allows(&self, device: PointerDeviceKind) -> bool {
        match device {
            PointerDeviceKind::Mouse => self.effective_mouse_enabled(),
            PointerDeviceKind::Touch => self.effective_touch_enabled(),
            PointerDeviceKind::Pen => true,
        }
    }
}

/// Owns the device enablement state.
#[derive(Debug, Clone)]
pub struct PointerDeviceArbiter {
    state: PointerDeviceState,
}

impl Default for PointerDeviceArbiter {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl PointerDeviceArbiter {
    /// Create an arbiter with the given user preferences and no pen nearby.
    pub fn new(mouse_enabled: bool, touch_enabled: bool) -> Self {
        Self {
            state: PointerDeviceState {
                mouse_enabled,
                touch_enabled,
                pen_detected: false,
            },
        }
    }

    pub fn state(&self) -> PointerDeviceState {
        self.state
    }

    /// Set the user's mouse preference. Returns true if it changed.
    pub fn set_mouse_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.state.mouse_enabled != enabled;
        self.state.mouse_enabled = enabled;
        changed
    }

    /// Set the user's touch preference. Returns true if it changed.
    ///
    /// Does not clear the pen latch.
    pub fn set_touch_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.state.touch_enabled != enabled;
        self.state.touch_enabled = enabled;
        changed
    }

    /// A stylus came into range. Returns true if the latch flipped.
    pub fn on_pen_proximity(&mut self) -> bool {
        let changed = !self.state.pen_detected;
        self.state.pen_detected = true;
        changed
    }

    /// The stylus left range. Returns true if the latch flipped.
    pub fn on_pen_left(&mut self) -> bool {
        let changed = self.state.pen_detected;
        self.state.pen_detected = false;
        changed
    }

    /// Dispatch a proximity signal. Returns true if the latch flipped.
    pub fn handle_proximity(&mut self, signal: PenProximity) -> bool {
        match signal {
            PenProximity::Entered => self.on_pen_proximity(),
            PenProximity::Left => self.on_pen_left(),
        }
    }

    pub fn effective_touch_enabled(&self) -> bool {
        self.state.effective_touch_enabled()
    }

    pub fn effective_mouse_enabled(&self) -> bool {
        self.state.effective_mouse_enabled()
    }

    pub fn allows(&self, device: PointerDeviceKind) -> bool {
        self.state.allows(device)
    }
}
