use glam::{Quat, Vec3};

use crate::config::CameraConfig;

/// Camera placement for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub look_at: Vec3,
}

impl CameraPose {
    pub fn direction(&self) -> Vec3 {
        (self.look_at - self.position).normalize_or_zero()
    }
}

/// Keeps the camera at a fixed offset that orbits the character about +Y
#[derive(Debug, Clone)]
pub struct OrbitCameraController {
    pub offset: Vec3,
    pub look_height: f32,
}

impl OrbitCameraController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            offset: config.orbit_offset,
            look_height: config.look_height,
        }
    }

    pub fn pose(&self, character: Vec3, yaw: f32) -> CameraPose {
        let rotated = Quat::from_rotation_y(yaw) * self.offset;
        CameraPose {
            position: character + rotated,
            look_at: character + Vec3::new(0.0, self.look_height, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, TAU};

    fn controller() -> OrbitCameraController {
        OrbitCameraController::new(&CameraConfig::default())
    }

    #[test]
    fn test_zero_yaw_uses_raw_offset() {
        let c = Vec3::new(1.0, 1.0, 2.0);
        let pose = controller().pose(c, 0.0);
        assert_eq!(pose.position, c + Vec3::new(0.0, 5.0, -10.0));
        assert_eq!(pose.look_at, c + Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_full_turn_is_periodic() {
        let c = Vec3::new(3.0, 1.0, -4.0);
        let a = controller().pose(c, 0.0);
        let b = controller().pose(c, TAU);
        assert!((a.position - b.position).length() < 1e-4);
    }

    #[test]
    fn test_quarter_turn_orbits_horizontally() {
        let pose = controller().pose(Vec3::ZERO, FRAC_PI_2);
        assert!((pose.position - Vec3::new(-10.0, 5.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_look_target_ignores_yaw() {
        let c = Vec3::new(0.0, 1.0, 0.0);
        for yaw in [0.0, 1.0, 2.5, -7.0] {
            assert_eq!(controller().pose(c, yaw).look_at, Vec3::new(0.0, 2.0, 0.0));
        }
    }
}
