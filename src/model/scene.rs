use tracing::info;

use crate::config::DemoConfig;
use crate::model::{Character, Interactable, Obstacle, ObstacleSet};

/// Everything gameplay touches: the character and the static props
#[derive(Debug, Clone)]
pub struct Scene {
    pub character: Character,
    pub obstacles: ObstacleSet,
    pub interactable: Option<Interactable>,
}

impl Scene {
    /// Character only; obstacles must be registered explicitly
    pub fn new(character: Character) -> Self {
        Self {
            character,
            obstacles: ObstacleSet::new(),
            interactable: None,
        }
    }

    pub fn from_config(config: &DemoConfig) -> Self {
        let mut scene = Self::new(Character::new(config.scene.character_start));
        for position in &config.scene.obstacles {
            scene.register_obstacle(Obstacle::new(*position));
        }
        scene.interactable = config
            .interaction
            .position
            .map(|p| Interactable::new(p, config.interaction.size));
        info!(
            obstacles = scene.obstacles.len(),
            interactable = scene.interactable.is_some(),
            "scene initialized"
        );
        scene
    }

    pub fn register_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.register(obstacle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_registers_reference_obstacles() {
        let scene = Scene::from_config(&DemoConfig::default());
        assert_eq!(scene.obstacles.len(), 4);
        assert!(scene.interactable.is_some());
        assert_eq!(scene.character.position, glam::Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_interactable_is_optional() {
        let mut config = DemoConfig::default();
        config.interaction.position = None;
        config.scene.obstacles.clear();
        let scene = Scene::from_config(&config);
        assert!(scene.interactable.is_none());
        assert!(scene.obstacles.is_empty());
    }
}
