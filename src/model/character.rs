use glam::{Mat4, Quat, Vec3};

/// The controllable box character
#[derive(Debug, Clone)]
pub struct Character {
    pub position: Vec3,
    /// Rotation about +Y; zero faces +Z
    pub yaw: f32,
}

impl Character {
    pub fn new(position: Vec3) -> Self {
        Self { position, yaw: 0.0 }
    }

    /// Turn to face along `direction`, ignoring its vertical part
    pub fn face(&mut self, direction: Vec3) {
        if direction.x == 0.0 && direction.z == 0.0 {
            return;
        }
        self.yaw = direction.x.atan2(direction.z);
    }

    pub fn facing(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos())
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(Quat::from_rotation_y(self.yaw), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_movement_direction() {
        let mut c = Character::new(Vec3::new(0.0, 1.0, 0.0));
        c.face(Vec3::new(1.0, 0.0, 0.0));
        assert!((c.facing() - Vec3::X).length() < 1e-6);
        c.face(Vec3::new(0.0, 0.0, -3.0));
        assert!((c.facing() - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_vertical_direction_keeps_yaw() {
        let mut c = Character::new(Vec3::ZERO);
        c.face(Vec3::X);
        c.face(Vec3::Y);
        assert!((c.facing() - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_transform_front_face_points_along_facing() {
        let mut c = Character::new(Vec3::new(2.0, 1.0, 3.0));
        c.face(Vec3::X);
        let front = c.transform().transform_vector3(Vec3::Z);
        assert!((front - Vec3::X).length() < 1e-5);
        assert_eq!(c.transform().transform_point3(Vec3::ZERO), c.position);
    }
}
