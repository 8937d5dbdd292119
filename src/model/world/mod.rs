pub mod interactable;
pub mod obstacle;

pub use interactable::Interactable;
pub use obstacle::{Obstacle, ObstacleSet};
