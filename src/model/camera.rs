use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Below this the horizontal projection of the view direction is unusable
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Perspective camera positioned by an eye point and a look target
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32, config: &CameraConfig) -> Self {
        Self {
            eye: config.orbit_offset,
            target: Vec3::new(0.0, config.look_height, 0.0),
            up: Vec3::Y,
            fov_y: config.fov_y_degrees.to_radians(),
            aspect: width as f32 / height.max(1) as f32,
            z_near: config.z_near,
            z_far: config.z_far,
        }
    }

    /// World-space view direction; zero when eye and target coincide
    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn look_at(&mut self, eye: Vec3, target: Vec3) {
        self.eye = eye;
        self.target = target;
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * view
    }
}

/// Project `dir` onto XZ and normalize, or `None` when it points straight up or down
pub fn horizontal_direction(dir: Vec3) -> Option<Vec3> {
    let flat = Vec3::new(dir.x, 0.0, dir.z);
    let len = flat.length();
    if !len.is_finite() || len < DEGENERATE_EPSILON {
        return None;
    }
    Some(flat / len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_direction_flattens_pitch() {
        let mut cam = Camera::new(800, 600, &CameraConfig::default());
        cam.look_at(Vec3::new(0.0, 5.0, -10.0), Vec3::new(0.0, 1.0, 0.0));
        let fwd = horizontal_direction(cam.forward()).unwrap();
        assert!((fwd - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_straight_down_is_degenerate() {
        let mut cam = Camera::new(800, 600, &CameraConfig::default());
        cam.look_at(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);
        assert!(horizontal_direction(cam.forward()).is_none());
        assert!(horizontal_direction(Vec3::new(f32::NAN, 0.0, 1.0)).is_none());
    }

    #[test]
    fn test_zero_height_does_not_divide_by_zero() {
        let mut cam = Camera::new(800, 0, &CameraConfig::default());
        assert!(cam.aspect.is_finite());
        cam.set_aspect(1280, 720);
        assert!((cam.aspect - 1280.0 / 720.0).abs() < 1e-6);
    }
}
