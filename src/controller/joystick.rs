//! On-screen touch joysticks.
//!
//! Each stick is "dynamic": its centre is wherever the finger first lands and
//! the output vector is the finger's offset from that centre, scaled by the
//! stick radius and clamped to the unit disc. Screen Y grows downwards, so it
//! is flipped to make "up" positive.

use glam::Vec2;

use super::input::{InputEvent, Stick};

/// Pixels of travel for full deflection
pub const DEFAULT_STICK_RADIUS: f32 = 50.0;

#[derive(Debug, Clone)]
pub struct VirtualJoystick {
    radius: f32,
    touch_id: Option<u64>,
    origin: Vec2,
    vector: Vec2,
}

impl VirtualJoystick {
    pub fn new(radius: f32) -> Self {
        Self {
            radius: radius.max(1.0),
            touch_id: None,
            origin: Vec2::ZERO,
            vector: Vec2::ZERO,
        }
    }

    pub fn is_active(&self) -> bool {
        self.touch_id.is_some()
    }

    pub fn owns(&self, id: u64) -> bool {
        self.touch_id == Some(id)
    }

    pub fn vector(&self) -> Vec2 {
        self.vector
    }

    /// Returns false when another finger already holds this stick
    pub fn start(&mut self, id: u64, pos: Vec2) -> bool {
        if self.touch_id.is_some() {
            return false;
        }
        self.touch_id = Some(id);
        self.origin = pos;
        self.vector = Vec2::ZERO;
        true
    }

    pub fn move_to(&mut self, id: u64, pos: Vec2) -> Option<Vec2> {
        if !self.owns(id) {
            return None;
        }
        let offset = (pos - self.origin) / self.radius;
        self.vector = Vec2::new(offset.x, -offset.y).clamp_length_max(1.0);
        Some(self.vector)
    }

    pub fn end(&mut self, id: u64) -> bool {
        if !self.owns(id) {
            return false;
        }
        self.touch_id = None;
        self.vector = Vec2::ZERO;
        true
    }
}

/// Left half of the surface drives the left stick, right half the right stick
#[derive(Debug, Clone)]
pub struct JoystickPad {
    left: VirtualJoystick,
    right: VirtualJoystick,
    width: f32,
}

impl JoystickPad {
    pub fn new(width: f32, radius: f32) -> Self {
        Self {
            left: VirtualJoystick::new(radius),
            right: VirtualJoystick::new(radius),
            width,
        }
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width;
    }

    pub fn stick(&self, stick: Stick) -> &VirtualJoystick {
        match stick {
            Stick::Left => &self.left,
            Stick::Right => &self.right,
        }
    }

    fn stick_mut(&mut self, stick: Stick) -> &mut VirtualJoystick {
        match stick {
            Stick::Left => &mut self.left,
            Stick::Right => &mut self.right,
        }
    }

    fn owner(&self, id: u64) -> Option<Stick> {
        if self.left.owns(id) {
            Some(Stick::Left)
        } else if self.right.owns(id) {
            Some(Stick::Right)
        } else {
            None
        }
    }

    pub fn touch_start(&mut self, id: u64, pos: Vec2) -> Option<InputEvent> {
        let stick = if pos.x < self.width / 2.0 { Stick::Left } else { Stick::Right };
        if self.stick_mut(stick).start(id, pos) {
            Some(InputEvent::JoystickMove { stick, vector: Vec2::ZERO })
        } else {
            None
        }
    }

    pub fn touch_move(&mut self, id: u64, pos: Vec2) -> Option<InputEvent> {
        let stick = self.owner(id)?;
        let vector = self.stick_mut(stick).move_to(id, pos)?;
        Some(InputEvent::JoystickMove { stick, vector })
    }

    /// Also used for cancelled touches
    pub fn touch_end(&mut self, id: u64) -> Option<InputEvent> {
        let stick = self.owner(id)?;
        self.stick_mut(stick).end(id);
        Some(InputEvent::JoystickEnd { stick })
    }
}
