use glam::Vec3;

/// Static obstacle; its radius is shared by every obstacle in a set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub position: Vec3,
}

impl Obstacle {
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }

    /// Distance between centres measured on the ground plane
    pub fn planar_distance(&self, point: Vec3) -> f32 {
        let dx = self.position.x - point.x;
        let dz = self.position.z - point.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Obstacles currently taking part in collision checks.
///
/// Starts empty. Obstacles only take part once passed to [`ObstacleSet::register`].
#[derive(Debug, Clone, Default)]
pub struct ObstacleSet {
    obstacles: Vec<Obstacle>,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

impl FromIterator<Obstacle> for ObstacleSet {
    fn from_iter<I: IntoIterator<Item = Obstacle>>(iter: I) -> Self {
        Self { obstacles: iter.into_iter().collect() }
    }
}
