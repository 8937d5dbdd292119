use glam::Vec3;

use crate::config::CollisionConfig;
use crate::model::ObstacleSet;

/// Radius test of a candidate position against every registered obstacle
#[derive(Debug, Clone)]
pub struct CollisionChecker {
    pub obstacle_radius: f32,
    pub character_radius: f32,
    pub buffer: f32,
}

impl CollisionChecker {
    pub fn new(config: &CollisionConfig) -> Self {
        Self {
            obstacle_radius: config.obstacle_radius(),
            character_radius: config.character_radius,
            buffer: config.buffer,
        }
    }

    pub fn combined_radius(&self) -> f32 {
        self.obstacle_radius + self.character_radius + self.buffer
    }

    pub fn is_blocked(&self, obstacles: &ObstacleSet, candidate: Vec3) -> bool {
        let limit = self.combined_radius();
        obstacles.iter().any(|o| o.planar_distance(candidate) < limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Obstacle;

    fn checker(obstacle_radius: f32) -> CollisionChecker {
        CollisionChecker {
            obstacle_radius,
            character_radius: 0.5,
            buffer: 0.0,
        }
    }

    #[test]
    fn test_empty_set_never_blocks() {
        let set = ObstacleSet::new();
        assert!(!checker(1.0).is_blocked(&set, Vec3::ZERO));
    }

    #[test]
    fn test_blocked_near_obstacle() {
        let set: ObstacleSet = [Obstacle::new(Vec3::new(5.0, 1.0, 5.0))].into_iter().collect();
        let c = checker(1.5);
        assert_eq!(c.combined_radius(), 2.0);
        assert!(c.is_blocked(&set, Vec3::new(5.0, 1.0, 4.9)));
        assert!(!c.is_blocked(&set, Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_boundary_is_not_blocked() {
        let set: ObstacleSet = [Obstacle::new(Vec3::ZERO)].into_iter().collect();
        let c = checker(1.5);
        assert!(!c.is_blocked(&set, Vec3::new(2.0, 0.0, 0.0)));
        assert!(c.is_blocked(&set, Vec3::new(1.999, 0.0, 0.0)));
    }

    #[test]
    fn test_any_obstacle_blocks() {
        let mut set = ObstacleSet::new();
        set.register(Obstacle::new(Vec3::new(-5.0, 1.0, 5.0)));
        set.register(Obstacle::new(Vec3::new(5.0, 1.0, 5.0)));
        let c = CollisionChecker::new(&CollisionConfig::default());
        assert!(c.is_blocked(&set, Vec3::new(5.0, 1.0, 3.6)));
        assert!(c.is_blocked(&set, Vec3::new(-5.0, 1.0, 6.0)));
        assert!(!c.is_blocked(&set, Vec3::new(0.0, 1.0, 5.0)));
    }
}
