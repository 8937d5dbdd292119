// MODEL: Game state and data
pub mod world;
pub mod camera;
pub mod character;
pub mod scene;

pub use world::{Interactable, Obstacle, ObstacleSet};
pub use camera::Camera;
pub use character::Character;
pub use scene::Scene;
