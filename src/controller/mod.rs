// CONTROLLER: Input, game logic, and update loop
pub mod input;
pub mod joystick;
pub mod collision;
pub mod interaction;
pub mod camera_controller;
pub mod frame_loop;

pub use input::{create_source, InputEvent, InputMode, InputQueue, InputSource, Intent, KeyBindings, Stick};
pub use joystick::{JoystickPad, VirtualJoystick};
pub use collision::CollisionChecker;
pub use interaction::{InteractionDetector, ProximityState, ProximityTransition};
pub use camera_controller::{CameraPose, OrbitCameraController};
pub use frame_loop::{FrameClock, FrameLoop, FrameOutput, Notification, SimulationContext};
