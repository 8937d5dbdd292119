/// Platform-agnostic input handling: events, queue and the two input paths
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use glam::Vec2;

use crate::config::MovementConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stick {
    Left,
    Right,
}

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Keyboard
    KeyDown { key: String, repeat: bool },
    KeyUp(String),

    // Mouse
    MouseMove { dx: f32, dy: f32 },

    // Virtual joysticks, vectors already normalized to the unit disc
    JoystickMove { stick: Stick, vector: Vec2 },
    JoystickEnd { stick: Stick },

    // Window
    FocusLost,
    VisibilityChanged { visible: bool },
    PointerLockChanged { locked: bool },
}

/// Which input path drives the character for the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    KeyboardMouse,
    DualJoystick,
}

impl InputMode {
    /// Coarse pointers (touch screens) get the joysticks
    pub fn from_pointer(coarse: bool) -> Self {
        if coarse {
            InputMode::DualJoystick
        } else {
            InputMode::KeyboardMouse
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::KeyboardMouse => write!(f, "keyboard"),
            InputMode::DualJoystick => write!(f, "joystick"),
        }
    }
}

impl FromStr for InputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyboard" | "mouse" | "keyboard-mouse" => Ok(InputMode::KeyboardMouse),
            "joystick" | "touch" | "dual-joystick" => Ok(InputMode::DualJoystick),
            other => Err(ConfigError::UnknownInputMode(other.to_string())),
        }
    }
}

/// What the player asked for during one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Intent {
    /// x strafes right, y walks forward. Not normalized.
    pub movement: Vec2,
    /// Yaw change already in radians (mouse look)
    pub look_delta: f32,
    /// Yaw rate in [-1, 1], scaled by elapsed time in the frame loop
    pub turn_rate: f32,
    /// Edge-triggered interact press
    pub interact_pressed: bool,
}

/// Events queued by platform callbacks, drained once per frame
#[derive(Debug, Default)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// One of the two input capabilities, chosen once at startup
pub trait InputSource {
    fn mode(&self) -> InputMode;

    /// Fold one event into the source's state
    fn handle_event(&mut self, event: &InputEvent);

    /// Snapshot for this frame. Accumulated deltas and edges are consumed.
    fn take_intent(&mut self) -> Intent;
}

pub fn create_source(mode: InputMode, config: &MovementConfig) -> Box<dyn InputSource> {
    match mode {
        InputMode::KeyboardMouse => Box::new(KeyboardMouseSource::new(
            KeyBindings::default(),
            config.mouse_sensitivity,
        )),
        InputMode::DualJoystick => Box::new(DualJoystickSource::new(config.snap_cardinal)),
    }
}

/// Single printable keys are compared lowercase, named keys verbatim
pub fn normalize_key(key: &str) -> String {
    if key.chars().count() == 1 {
        key.to_lowercase()
    } else {
        key.to_string()
    }
}

/// Key mapping configuration
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub interact: String,
    pub escape: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            interact: "f".to_string(),
            escape: "Escape".to_string(),
        }
    }
}

impl KeyBindings {
    pub fn is_interact(&self, key: &str) -> bool {
        key.eq_ignore_ascii_case(&self.interact)
    }

    pub fn is_escape(&self, key: &str) -> bool {
        key == self.escape
    }

    /// Keys whose browser default (scrolling) should be suppressed
    pub fn is_navigation(&self, key: &str) -> bool {
        let key = normalize_key(key);
        [&self.forward, &self.backward, &self.left, &self.right]
            .iter()
            .any(|b| key == **b)
            || matches!(key.as_str(), "ArrowUp" | "ArrowDown" | "ArrowLeft" | "ArrowRight" | " ")
    }
}

/// Keyboard for walking, pointer-locked mouse for turning
pub struct KeyboardMouseSource {
    bindings: KeyBindings,
    mouse_sensitivity: f32,
    pressed_keys: HashSet<String>,
    look_delta: f32,
    pointer_locked: bool,
    interact_pending: bool,
}

impl KeyboardMouseSource {
    pub fn new(bindings: KeyBindings, mouse_sensitivity: f32) -> Self {
        Self {
            bindings,
            mouse_sensitivity,
            pressed_keys: HashSet::new(),
            look_delta: 0.0,
            pointer_locked: false,
            interact_pending: false,
        }
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(&normalize_key(key))
    }

    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
    }

    fn is_moving_forward(&self) -> bool {
        self.is_key_pressed(&self.bindings.forward) || self.is_key_pressed("ArrowUp")
    }

    fn is_moving_backward(&self) -> bool {
        self.is_key_pressed(&self.bindings.backward) || self.is_key_pressed("ArrowDown")
    }

    fn is_moving_left(&self) -> bool {
        self.is_key_pressed(&self.bindings.left) || self.is_key_pressed("ArrowLeft")
    }

    fn is_moving_right(&self) -> bool {
        self.is_key_pressed(&self.bindings.right) || self.is_key_pressed("ArrowRight")
    }

    fn movement_axis(&self) -> Vec2 {
        let mut axis = Vec2::ZERO;
        if self.is_moving_forward() {
            axis.y += 1.0;
        }
        if self.is_moving_backward() {
            axis.y -= 1.0;
        }
        if self.is_moving_left() {
            axis.x -= 1.0;
        }
        if self.is_moving_right() {
            axis.x += 1.0;
        }
        axis
    }
}

impl InputSource for KeyboardMouseSource {
    fn mode(&self) -> InputMode {
        InputMode::KeyboardMouse
    }

    fn handle_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown { key, repeat } => {
                let key = normalize_key(key);
                let newly_pressed = self.pressed_keys.insert(key.clone());
                if self.bindings.is_interact(&key) && newly_pressed && !repeat {
                    self.interact_pending = true;
                }
            }
            InputEvent::KeyUp(key) => {
                self.pressed_keys.remove(&normalize_key(key));
            }
            InputEvent::MouseMove { dx, .. } => {
                if self.pointer_locked && dx.is_finite() {
                    self.look_delta -= dx * self.mouse_sensitivity;
                }
            }
            InputEvent::FocusLost | InputEvent::VisibilityChanged { visible: false } => {
                self.clear_keys();
            }
            InputEvent::PointerLockChanged { locked } => {
                self.pointer_locked = *locked;
            }
            _ => {}
        }
    }

    fn take_intent(&mut self) -> Intent {
        let intent = Intent {
            movement: self.movement_axis(),
            look_delta: self.look_delta,
            turn_rate: 0.0,
            interact_pressed: self.interact_pending,
        };
        self.look_delta = 0.0;
        self.interact_pending = false;
        intent
    }
}

/// Left stick walks, right stick's horizontal axis turns
pub struct DualJoystickSource {
    left: Vec2,
    right: f32,
    snap_cardinal: bool,
}

impl DualJoystickSource {
    pub fn new(snap_cardinal: bool) -> Self {
        Self {
            left: Vec2::ZERO,
            right: 0.0,
            snap_cardinal,
        }
    }
}

impl InputSource for DualJoystickSource {
    fn mode(&self) -> InputMode {
        InputMode::DualJoystick
    }

    fn handle_event(&mut self, event: &InputEvent) {
        match event {
            // a stick reading that is not a number is dropped, keeping the last good one
            InputEvent::JoystickMove { vector, .. } if !vector.is_finite() => {}
            InputEvent::JoystickMove { stick: Stick::Left, vector } => {
                let v = vector.clamp_length_max(1.0);
                self.left = if self.snap_cardinal { snap_to_cardinal(v) } else { v };
            }
            InputEvent::JoystickMove { stick: Stick::Right, vector } => {
                self.right = vector.x.clamp(-1.0, 1.0);
            }
            InputEvent::JoystickEnd { stick: Stick::Left } => self.left = Vec2::ZERO,
            InputEvent::JoystickEnd { stick: Stick::Right } => self.right = 0.0,
            InputEvent::FocusLost | InputEvent::VisibilityChanged { visible: false } => {
                self.left = Vec2::ZERO;
                self.right = 0.0;
            }
            _ => {}
        }
    }

    fn take_intent(&mut self) -> Intent {
        Intent {
            movement: self.left,
            look_delta: 0.0,
            turn_rate: self.right,
            interact_pressed: false,
        }
    }
}

/// Collapse a stick vector to the unit cardinal direction it leans towards
pub fn snap_to_cardinal(v: Vec2) -> Vec2 {
    if v == Vec2::ZERO || !v.is_finite() {
        return Vec2::ZERO;
    }
    if v.y.abs() >= v.x.abs() {
        Vec2::new(0.0, v.y.signum())
    } else {
        Vec2::new(v.x.signum(), 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_down(key: &str) -> InputEvent {
        InputEvent::KeyDown { key: key.to_string(), repeat: false }
    }

    fn keyboard() -> KeyboardMouseSource {
        KeyboardMouseSource::new(KeyBindings::default(), 0.002)
    }

    #[test]
    fn test_keys_combine_additively() {
        let mut src = keyboard();
        src.handle_event(&key_down("W"));
        src.handle_event(&key_down("d"));
        assert_eq!(src.take_intent().movement, Vec2::new(1.0, 1.0));

        src.handle_event(&key_down("s"));
        assert_eq!(src.take_intent().movement, Vec2::new(1.0, 0.0));

        src.handle_event(&InputEvent::KeyUp("D".to_string()));
        assert_eq!(src.take_intent().movement, Vec2::ZERO);
    }

    #[test]
    fn test_arrow_keys_alias_wasd() {
        let mut src = keyboard();
        src.handle_event(&key_down("ArrowLeft"));
        assert_eq!(src.take_intent().movement, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_mouse_look_requires_pointer_lock() {
        let mut src = keyboard();
        src.handle_event(&InputEvent::MouseMove { dx: 100.0, dy: 0.0 });
        assert_eq!(src.take_intent().look_delta, 0.0);

        src.handle_event(&InputEvent::PointerLockChanged { locked: true });
        src.handle_event(&InputEvent::MouseMove { dx: 100.0, dy: 5.0 });
        src.handle_event(&InputEvent::MouseMove { dx: 50.0, dy: 5.0 });
        let intent = src.take_intent();
        assert!((intent.look_delta + 0.3).abs() < 1e-6);

        // consumed
        assert_eq!(src.take_intent().look_delta, 0.0);
    }

    #[test]
    fn test_interact_is_edge_triggered() {
        let mut src = keyboard();
        src.handle_event(&key_down("f"));
        src.handle_event(&InputEvent::KeyDown { key: "f".to_string(), repeat: true });
        assert!(src.take_intent().interact_pressed);
        assert!(!src.take_intent().interact_pressed);

        // still held, repeat events do not fire again
        src.handle_event(&InputEvent::KeyDown { key: "F".to_string(), repeat: true });
        assert!(!src.take_intent().interact_pressed);

        src.handle_event(&InputEvent::KeyUp("f".to_string()));
        src.handle_event(&key_down("F"));
        assert!(src.take_intent().interact_pressed);
    }

    #[test]
    fn test_focus_loss_releases_keys() {
        let mut src = keyboard();
        src.handle_event(&key_down("w"));
        src.handle_event(&InputEvent::FocusLost);
        assert_eq!(src.take_intent().movement, Vec2::ZERO);
    }

    #[test]
    fn test_joystick_release_resets() {
        let mut src = DualJoystickSource::new(false);
        src.handle_event(&InputEvent::JoystickMove { stick: Stick::Left, vector: Vec2::new(0.3, 0.4) });
        src.handle_event(&InputEvent::JoystickMove { stick: Stick::Right, vector: Vec2::new(-0.5, 0.9) });
        let intent = src.take_intent();
        assert_eq!(intent.movement, Vec2::new(0.3, 0.4));
        assert_eq!(intent.turn_rate, -0.5);

        src.handle_event(&InputEvent::JoystickEnd { stick: Stick::Left });
        src.handle_event(&InputEvent::JoystickEnd { stick: Stick::Right });
        let intent = src.take_intent();
        assert_eq!(intent.movement, Vec2::ZERO);
        assert_eq!(intent.turn_rate, 0.0);
    }

    #[test]
    fn test_non_finite_readings_are_dropped() {
        let mut src = DualJoystickSource::new(false);
        src.handle_event(&InputEvent::JoystickMove { stick: Stick::Left, vector: Vec2::new(0.3, 0.4) });
        src.handle_event(&InputEvent::JoystickMove { stick: Stick::Right, vector: Vec2::new(f32::NAN, 0.0) });
        src.handle_event(&InputEvent::JoystickMove { stick: Stick::Left, vector: Vec2::new(f32::INFINITY, 0.0) });
        let intent = src.take_intent();
        assert_eq!(intent.movement, Vec2::new(0.3, 0.4));
        assert_eq!(intent.turn_rate, 0.0);

        let mut src = KeyboardMouseSource::new(KeyBindings::default(), 0.002);
        src.handle_event(&InputEvent::PointerLockChanged { locked: true });
        src.handle_event(&InputEvent::MouseMove { dx: f32::NAN, dy: 0.0 });
        assert_eq!(src.take_intent().look_delta, 0.0);
    }

    #[test]
    fn test_joystick_ignores_keyboard() {
        let mut src = DualJoystickSource::new(false);
        src.handle_event(&key_down("w"));
        src.handle_event(&key_down("f"));
        assert_eq!(src.take_intent(), Intent::default());
    }

    #[test]
    fn test_cardinal_snapping() {
        assert_eq!(snap_to_cardinal(Vec2::new(0.2, 0.9)), Vec2::new(0.0, 1.0));
        assert_eq!(snap_to_cardinal(Vec2::new(-0.7, 0.1)), Vec2::new(-1.0, 0.0));
        assert_eq!(snap_to_cardinal(Vec2::new(0.0, -0.3)), Vec2::new(0.0, -1.0));
        assert_eq!(snap_to_cardinal(Vec2::ZERO), Vec2::ZERO);

        let mut src = DualJoystickSource::new(true);
        src.handle_event(&InputEvent::JoystickMove { stick: Stick::Left, vector: Vec2::new(0.5, 0.4) });
        assert_eq!(src.take_intent().movement, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_queue_drains_in_order() {
        let mut queue = InputQueue::new();
        queue.push(key_down("w"));
        queue.push(InputEvent::FocusLost);
        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(drained, vec![key_down("w"), InputEvent::FocusLost]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(InputMode::from_pointer(true), InputMode::DualJoystick);
        assert_eq!(InputMode::from_pointer(false), InputMode::KeyboardMouse);
        assert_eq!("Touch".parse::<InputMode>().unwrap(), InputMode::DualJoystick);
        let cfg = MovementConfig::default();
        assert_eq!(create_source(InputMode::DualJoystick, &cfg).mode(), InputMode::DualJoystick);
    }
}
