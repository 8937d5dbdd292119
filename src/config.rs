use std::env;
use std::str::FromStr;

use glam::Vec3;

use crate::controller::InputMode;
use crate::error::ConfigError;

/// Character locomotion tuning
#[derive(Debug, Clone)]
pub struct MovementConfig {
    /// Units per second
    pub speed: f32,
    /// Radians per pixel of pointer-locked mouse motion
    pub mouse_sensitivity: f32,
    /// Radians per second at full right-stick deflection
    pub joystick_turn_speed: f32,
    /// Collapse the left stick to its dominant cardinal direction
    pub snap_cardinal: bool,
    /// Longest single simulation step, in seconds; longer frames are split
    pub max_step_dt: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            mouse_sensitivity: 0.002,
            joystick_turn_speed: 2.0,
            snap_cardinal: false,
            max_step_dt: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub orbit_offset: Vec3,
    pub look_height: f32,
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            orbit_offset: Vec3::new(0.0, 5.0, -10.0),
            look_height: 1.0,
            fov_y_degrees: 75.0,
            z_near: 0.1,
            z_far: 1000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollisionConfig {
    pub obstacle_size: f32,
    pub character_radius: f32,
    pub buffer: f32,
}

impl CollisionConfig {
    pub fn obstacle_radius(&self) -> f32 {
        self.obstacle_size / 2.0
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            obstacle_size: 2.0,
            character_radius: 0.5,
            buffer: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InteractionConfig {
    pub range: f32,
    /// `None` disables the interactable entirely
    pub position: Option<Vec3>,
    pub size: f32,
    pub message: String,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            range: 2.0,
            position: Some(Vec3::new(0.0, 1.0, 5.0)),
            size: 0.5,
            message: "Interaction successful".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub background: [f32; 3],
    pub character_start: Vec3,
    pub ground_size: f32,
    pub ground_texture_repeat: f32,
    /// Image for the ground; `None` uses the generated grass tile
    pub ground_texture: Option<String>,
    /// Obstacle centres registered into the collision set at startup
    pub obstacles: Vec<Vec3>,
    pub model_path: String,
    pub model_scale: f32,
    pub model_position: Vec3,
    pub light_position: Vec3,
    pub light_intensity: f32,
    pub ambient: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            // #918ecc
            background: [0x91 as f32 / 255.0, 0x8e as f32 / 255.0, 0xcc as f32 / 255.0],
            character_start: Vec3::new(0.0, 1.0, 0.0),
            ground_size: 30.0,
            ground_texture_repeat: 2.0,
            ground_texture: None,
            obstacles: vec![
                Vec3::new(5.0, 1.0, 5.0),
                Vec3::new(-5.0, 1.0, 5.0),
                Vec3::new(7.25, 1.0, 7.25),
                Vec3::new(-7.0, 1.0, 7.0),
            ],
            model_path: "test3.obj".to_string(),
            model_scale: 0.5,
            model_position: Vec3::ZERO,
            light_position: Vec3::new(10.0, 10.0, 10.0),
            light_intensity: 1.0,
            ambient: 0.5,
        }
    }
}

/// All tunables of the demo in one place
#[derive(Debug, Clone, Default)]
pub struct DemoConfig {
    pub movement: MovementConfig,
    pub camera: CameraConfig,
    pub collision: CollisionConfig,
    pub interaction: InteractionConfig,
    pub scene: SceneConfig,
    /// Forced input path; `None` lets platform detection decide
    pub input_mode: Option<InputMode>,
}

pub const ENV_SPEED: &str = "ORBITWALK_SPEED";
pub const ENV_MOUSE_SENSITIVITY: &str = "ORBITWALK_MOUSE_SENSITIVITY";
pub const ENV_MODEL: &str = "ORBITWALK_MODEL";
pub const ENV_INPUT: &str = "ORBITWALK_INPUT";
pub const ENV_SNAP_CARDINAL: &str = "ORBITWALK_SNAP_CARDINAL";
pub const ENV_GROUND_TEXTURE: &str = "ORBITWALK_GROUND_TEXTURE";

impl DemoConfig {
    /// Defaults overridden by `ORBITWALK_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`DemoConfig::from_env`] with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_SPEED) {
            config.movement.speed = parse_positive(ENV_SPEED, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MOUSE_SENSITIVITY) {
            config.movement.mouse_sensitivity = parse_positive(ENV_MOUSE_SENSITIVITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SNAP_CARDINAL) {
            config.movement.snap_cardinal = parse_flag(ENV_SNAP_CARDINAL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_INPUT) {
            config.input_mode = Some(raw.parse()?);
        }
        if let Some(raw) = lookup(ENV_MODEL) {
            if raw.trim().is_empty() {
                return Err(ConfigError::Empty { key: ENV_MODEL });
            }
            config.scene.model_path = raw;
        }
        if let Some(raw) = lookup(ENV_GROUND_TEXTURE) {
            let path = raw.trim();
            config.scene.ground_texture = (!path.is_empty()).then(|| path.to_string());
        }

        Ok(config)
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<f32, ConfigError> {
    let value = f32::from_str(raw.trim()).map_err(|_| ConfigError::InvalidNumber {
        key,
        value: raw.to_string(),
    })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::OutOfRange { key, value });
    }
    Ok(value)
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { key, value: raw.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_demo_constants() {
        let config = DemoConfig::default();
        assert_eq!(config.movement.speed, 5.0);
        assert_eq!(config.collision.obstacle_radius(), 1.0);
        assert_eq!(config.interaction.range, 2.0);
        assert_eq!(config.camera.orbit_offset, Vec3::new(0.0, 5.0, -10.0));
        assert_eq!(config.scene.obstacles.len(), 4);
        assert!(config.input_mode.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = DemoConfig::from_lookup(lookup(&[
            (ENV_SPEED, "7.5"),
            (ENV_INPUT, "joystick"),
            (ENV_SNAP_CARDINAL, "yes"),
            (ENV_MODEL, "assets/hero.obj"),
        ]))
        .unwrap();
        assert_eq!(config.movement.speed, 7.5);
        assert_eq!(config.input_mode, Some(InputMode::DualJoystick));
        assert!(config.movement.snap_cardinal);
        assert_eq!(config.scene.model_path, "assets/hero.obj");
    }

    #[test]
    fn test_ground_texture_override() {
        assert_eq!(DemoConfig::default().scene.ground_texture, None);
        let config = DemoConfig::from_lookup(lookup(&[(ENV_GROUND_TEXTURE, " textures/grass.png ")])).unwrap();
        assert_eq!(config.scene.ground_texture.as_deref(), Some("textures/grass.png"));
        let config = DemoConfig::from_lookup(lookup(&[(ENV_GROUND_TEXTURE, "")])).unwrap();
        assert_eq!(config.scene.ground_texture, None);
    }

    #[test]
    fn test_invalid_overrides_are_errors() {
        assert!(matches!(
            DemoConfig::from_lookup(lookup(&[(ENV_SPEED, "fast")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            DemoConfig::from_lookup(lookup(&[(ENV_MOUSE_SENSITIVITY, "-1")])),
            Err(ConfigError::OutOfRange { .. })
        ));
        assert!(matches!(
            DemoConfig::from_lookup(lookup(&[(ENV_INPUT, "gamepad")])),
            Err(ConfigError::UnknownInputMode(_))
        ));
        assert!(matches!(
            DemoConfig::from_lookup(lookup(&[(ENV_SNAP_CARDINAL, "maybe")])),
            Err(ConfigError::InvalidFlag { .. })
        ));
    }
}
