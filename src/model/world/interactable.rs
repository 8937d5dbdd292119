use glam::Vec3;

/// The single object the character can interact with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interactable {
    pub position: Vec3,
    pub size: f32,
}

impl Interactable {
    pub fn new(position: Vec3, size: f32) -> Self {
        Self { position, size }
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }
}
