use glam::{Vec2, Vec3};
use tracing::{debug, info};

use crate::config::DemoConfig;
use crate::controller::camera_controller::{CameraPose, OrbitCameraController};
use crate::controller::collision::CollisionChecker;
use crate::controller::input::{InputQueue, InputSource, Intent};
use crate::controller::interaction::{InteractionDetector, ProximityState, ProximityTransition};
use crate::model::camera::horizontal_direction;
use crate::model::{Character, Scene};

/// Toast raised by a successful interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
}

/// State the renderer and UI need after a tick
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub character: Character,
    pub camera: CameraPose,
    /// Scaled step requested this frame, applied only when `moved`
    pub movement: Vec3,
    pub moved: bool,
    pub proximity: ProximityState,
    pub transition: Option<ProximityTransition>,
    pub notifications: Vec<Notification>,
}

impl FrameOutput {
    pub fn prompt_visible(&self) -> bool {
        self.proximity == ProximityState::InRange
    }

    /// Fold a later substep of the same frame into this one
    fn absorb(&mut self, later: FrameOutput) {
        self.movement += later.movement;
        self.moved |= later.moved;
        self.character = later.character;
        self.camera = later.camera;
        self.proximity = later.proximity;
        if later.transition.is_some() {
            self.transition = later.transition;
        }
        self.notifications.extend(later.notifications);
    }
}

/// Mutable simulation state owned by the frame loop
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub scene: Scene,
    /// Accumulated orbit angle in radians, never wrapped
    pub yaw: f32,
    pub camera: CameraPose,
    last_forward: Vec3,
}

impl SimulationContext {
    /// Horizontal forward/right basis from the current camera, falling back
    /// to the last usable forward when the camera looks straight down
    fn movement_basis(&mut self) -> (Vec3, Vec3) {
        let forward = match horizontal_direction(self.camera.direction()) {
            Some(f) => {
                self.last_forward = f;
                f
            }
            None => self.last_forward,
        };
        let right = Vec3::new(-forward.z, 0.0, forward.x);
        (forward, right)
    }
}

/// Per-frame update: input, movement, collision, facing, camera, interaction
pub struct FrameLoop {
    pub ctx: SimulationContext,
    input: Box<dyn InputSource>,
    collision: CollisionChecker,
    interaction: InteractionDetector,
    orbit: OrbitCameraController,
    speed: f32,
    joystick_turn_speed: f32,
    max_step_dt: f32,
    interaction_message: String,
}

impl FrameLoop {
    pub fn new(config: &DemoConfig, scene: Scene, input: Box<dyn InputSource>) -> Self {
        let orbit = OrbitCameraController::new(&config.camera);
        let camera = orbit.pose(scene.character.position, 0.0);
        let last_forward = horizontal_direction(camera.direction()).unwrap_or(Vec3::Z);
        info!(mode = %input.mode(), "frame loop ready");

        Self {
            ctx: SimulationContext {
                scene,
                yaw: 0.0,
                camera,
                last_forward,
            },
            input,
            collision: CollisionChecker::new(&config.collision),
            interaction: InteractionDetector::new(config.interaction.range),
            orbit,
            speed: config.movement.speed,
            joystick_turn_speed: config.movement.joystick_turn_speed,
            max_step_dt: config.movement.max_step_dt,
            interaction_message: config.interaction.message.clone(),
        }
    }

    /// Advance by a whole frame of real elapsed time. Long frames run as
    /// several steps no longer than `max_step_dt` so a hitch never jumps a
    /// collision radius.
    pub fn advance(&mut self, queue: &mut InputQueue, dt: f32) -> FrameOutput {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let steps = if self.max_step_dt > 0.0 {
            (dt / self.max_step_dt).ceil().max(1.0) as u32
        } else {
            1
        };
        let step = dt / steps as f32;

        let mut out = self.tick(queue, step);
        for _ in 1..steps {
            let next = self.tick(queue, step);
            out.absorb(next);
        }
        if steps > 1 {
            debug!(steps, dt, "frame split into substeps");
        }
        out
    }

    /// Advance the simulation by `dt` seconds
    pub fn tick(&mut self, queue: &mut InputQueue, dt: f32) -> FrameOutput {
        for event in queue.drain() {
            self.input.handle_event(&event);
        }
        let intent = self.input.take_intent();

        let movement = self.step_movement(&intent, dt);
        let candidate = self.ctx.scene.character.position + movement;
        let moved = movement != Vec3::ZERO
            && !self.collision.is_blocked(&self.ctx.scene.obstacles, candidate);
        if moved {
            self.ctx.scene.character.position = candidate;
        } else if movement != Vec3::ZERO {
            debug!(?candidate, "move blocked");
        }

        // facing follows intent even when the step was rejected
        if movement.length() > 0.0 {
            self.ctx.scene.character.face(movement);
        }

        self.ctx.yaw -= intent.turn_rate * dt * self.joystick_turn_speed;
        self.ctx.yaw += intent.look_delta;
        self.ctx.camera = self.orbit.pose(self.ctx.scene.character.position, self.ctx.yaw);

        // a press between frames sees the proximity of the previous frame
        let mut notifications = Vec::new();
        if intent.interact_pressed {
            if self.interaction.state() == ProximityState::InRange {
                info!("interacted with object");
                notifications.push(Notification {
                    message: self.interaction_message.clone(),
                });
            } else {
                debug!("interact pressed out of range");
            }
        }

        let proximity = self.interaction.update(
            self.ctx.scene.character.position,
            self.ctx.scene.interactable.as_ref(),
        );
        let transition = self.interaction.last_transition();
        if let Some(t) = transition {
            info!(transition = ?t, "proximity");
        }

        FrameOutput {
            character: self.ctx.scene.character.clone(),
            camera: self.ctx.camera,
            movement,
            moved,
            proximity,
            transition,
            notifications,
        }
    }

    /// Camera-relative step, exactly `speed * dt` long or zero
    fn step_movement(&mut self, intent: &Intent, dt: f32) -> Vec3 {
        let (forward, right) = self.ctx.movement_basis();
        let Vec2 { x: strafe, y: ahead } = intent.movement;
        let raw = forward * ahead + right * strafe;
        if raw.length_squared() > 0.0 && raw.is_finite() {
            raw.normalize() * self.speed * dt
        } else {
            Vec3::ZERO
        }
    }
}

/// Elapsed time between frames from a millisecond monotonic clock
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous call; zero on the first call and when the
    /// clock runs backwards
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => {
                let secs = (now_ms - last) / 1000.0;
                if secs.is_finite() { secs.max(0.0) as f32 } else { 0.0 }
            }
            None => 0.0,
        };
        if now_ms.is_finite() {
            self.last_ms = Some(now_ms);
        }
        dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::input::{create_source, InputEvent, InputMode, Stick};
    use crate::model::Obstacle;

    const DT: f32 = 1.0 / 60.0;

    fn open_config() -> DemoConfig {
        let mut config = DemoConfig::default();
        config.scene.obstacles.clear();
        config
    }

    fn frame_loop(config: &DemoConfig, mode: InputMode) -> FrameLoop {
        FrameLoop::new(config, Scene::from_config(config), create_source(mode, &config.movement))
    }

    fn key_down(key: &str) -> InputEvent {
        InputEvent::KeyDown { key: key.to_string(), repeat: false }
    }

    #[test]
    fn test_forward_walks_away_from_camera() {
        let config = open_config();
        let mut fl = frame_loop(&config, InputMode::KeyboardMouse);
        let mut q = InputQueue::new();
        q.push(key_down("w"));
        let out = fl.tick(&mut q, DT);
        assert!(out.moved);
        let expected = Vec3::new(0.0, 1.0, 5.0 * DT);
        assert!((out.character.position - expected).length() < 1e-6);
        assert!((out.character.facing() - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_strafe_right_is_screen_right() {
        let config = open_config();
        let mut fl = frame_loop(&config, InputMode::KeyboardMouse);
        let mut q = InputQueue::new();
        q.push(key_down("d"));
        let out = fl.tick(&mut q, DT);
        // camera behind at -Z looking +Z: screen right is -X
        assert!(out.movement.x < 0.0);
        assert!(out.movement.z.abs() < 1e-6);
    }

    #[test]
    fn test_movement_magnitude_is_speed_times_dt() {
        let config = open_config();
        let mut fl = frame_loop(&config, InputMode::KeyboardMouse);
        let mut q = InputQueue::new();
        q.push(key_down("w"));
        q.push(key_down("a"));
        let out = fl.tick(&mut q, 0.05);
        assert!((out.movement.length() - 5.0 * 0.05).abs() < 1e-6);

        let mut fl = frame_loop(&config, InputMode::DualJoystick);
        q.push(InputEvent::JoystickMove { stick: Stick::Left, vector: Vec2::new(0.1, 0.05) });
        let out = fl.tick(&mut q, 0.05);
        assert!((out.movement.length() - 5.0 * 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_no_input_no_movement() {
        let config = open_config();
        let mut fl = frame_loop(&config, InputMode::KeyboardMouse);
        let mut q = InputQueue::new();
        let out = fl.tick(&mut q, DT);
        assert_eq!(out.movement, Vec3::ZERO);
        assert!(!out.moved);
        assert_eq!(out.character.position, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_joystick_release_stops_immediately() {
        let config = open_config();
        let mut fl = frame_loop(&config, InputMode::DualJoystick);
        let mut q = InputQueue::new();
        q.push(InputEvent::JoystickMove { stick: Stick::Left, vector: Vec2::new(0.0, 1.0) });
        assert!(fl.tick(&mut q, DT).moved);

        q.push(InputEvent::JoystickEnd { stick: Stick::Left });
        let out = fl.tick(&mut q, DT);
        assert_eq!(out.movement, Vec3::ZERO);
    }

    #[test]
    fn test_blocked_move_is_discarded_but_turns() {
        let mut config = open_config();
        config.scene.obstacles = vec![Vec3::new(0.0, 1.0, 1.55)];
        let mut fl = frame_loop(&config, InputMode::KeyboardMouse);
        let mut q = InputQueue::new();
        q.push(key_down("d"));
        fl.tick(&mut q, DT);
        q.push(InputEvent::KeyUp("d".to_string()));
        q.push(key_down("w"));
        // combined radius 1.5, first step lands at z = 0.0833 -> distance 1.4667
        let out = fl.tick(&mut q, 1.0 / 60.0);
        assert!(!out.moved);
        assert!((out.character.facing() - Vec3::Z).length() < 1e-6);
        assert!(out.character.position.z.abs() < 1e-6);
    }

    #[test]
    fn test_obstacle_registration_gates_collision() {
        let config = open_config();
        let mut scene = Scene::from_config(&config);
        let mut q = InputQueue::new();

        let mut fl = FrameLoop::new(&config, scene.clone(), create_source(InputMode::KeyboardMouse, &config.movement));
        q.push(key_down("w"));
        assert!(fl.tick(&mut q, DT).moved);

        scene.register_obstacle(Obstacle::new(Vec3::new(0.0, 1.0, 1.55)));
        let mut fl = FrameLoop::new(&config, scene, create_source(InputMode::KeyboardMouse, &config.movement));
        q.push(key_down("w"));
        assert!(!fl.tick(&mut q, DT).moved);
    }

    #[test]
    fn test_walk_into_interaction_range() {
        let config = open_config();
        let mut scene = Scene::from_config(&config);
        scene.character.position = Vec3::new(0.0, 1.0, 10.0);
        let mut fl = FrameLoop::new(&config, scene, create_source(InputMode::KeyboardMouse, &config.movement));
        let mut q = InputQueue::new();

        // turn the camera around so forward is -Z
        q.push(InputEvent::PointerLockChanged { locked: true });
        q.push(InputEvent::MouseMove { dx: -std::f32::consts::PI / 0.002, dy: 0.0 });
        fl.tick(&mut q, 0.0);
        q.push(key_down("w"));

        let mut entered_at = None;
        for _ in 0..40 {
            let out = fl.tick(&mut q, 0.05);
            let distance = out.character.position.distance(Vec3::new(0.0, 1.0, 5.0));
            if out.transition == Some(ProximityTransition::Entered) {
                entered_at = Some(distance);
                break;
            }
            assert_eq!(out.proximity, ProximityState::OutOfRange);
            assert!(distance >= 2.0);
        }
        let distance = entered_at.expect("never entered range");
        assert!(distance < 2.0 && distance > 2.0 - 5.0 * 0.05 - 1e-4);
    }

    #[test]
    fn test_interact_only_fires_in_range() {
        let config = open_config();
        let mut q = InputQueue::new();

        let mut fl = frame_loop(&config, InputMode::KeyboardMouse);
        q.push(key_down("f"));
        assert!(fl.tick(&mut q, DT).notifications.is_empty());

        let mut scene = Scene::from_config(&config);
        scene.character.position = Vec3::new(0.0, 1.0, 4.0);
        let mut fl = FrameLoop::new(&config, scene, create_source(InputMode::KeyboardMouse, &config.movement));
        let out = fl.tick(&mut q, DT);
        assert!(out.prompt_visible());
        assert_eq!(out.transition, Some(ProximityTransition::Entered));

        q.push(key_down("f"));
        let out = fl.tick(&mut q, DT);
        assert_eq!(out.notifications.len(), 1);
        assert_eq!(out.notifications[0].message, config.interaction.message);

        // held key does not fire again
        let out = fl.tick(&mut q, DT);
        assert!(out.notifications.is_empty());
    }

    #[test]
    fn test_right_stick_turns_camera() {
        let config = open_config();
        let mut fl = frame_loop(&config, InputMode::DualJoystick);
        let mut q = InputQueue::new();
        q.push(InputEvent::JoystickMove { stick: Stick::Right, vector: Vec2::new(1.0, 0.0) });
        fl.tick(&mut q, 0.5);
        assert!((fl.ctx.yaw + 1.0).abs() < 1e-6);
        q.push(InputEvent::JoystickEnd { stick: Stick::Right });
        fl.tick(&mut q, 0.5);
        assert!((fl.ctx.yaw + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_camera_follows_character() {
        let config = open_config();
        let mut fl = frame_loop(&config, InputMode::KeyboardMouse);
        let mut q = InputQueue::new();
        q.push(key_down("w"));
        let out = fl.tick(&mut q, 0.1);
        assert_eq!(out.camera.position, out.character.position + config.camera.orbit_offset);
    }

    #[test]
    fn test_degenerate_camera_reuses_last_forward() {
        let config = open_config();
        let mut fl = frame_loop(&config, InputMode::KeyboardMouse);
        let mut q = InputQueue::new();
        q.push(key_down("w"));
        fl.tick(&mut q, DT);

        // look straight down
        let p = fl.ctx.scene.character.position;
        fl.ctx.camera = CameraPose { position: p + Vec3::new(0.0, 10.0, 0.0), look_at: p };
        let before = fl.ctx.scene.character.position;
        let out = fl.tick(&mut q, DT);
        assert!(out.movement.is_finite());
        assert!((out.character.position - before - Vec3::new(0.0, 0.0, 5.0 * DT)).length() < 1e-6);
    }

    #[test]
    fn test_frame_clock_reports_real_elapsed_time() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(1000.0), 0.0);
        assert!((clock.tick(1016.0) - 0.016).abs() < 1e-6);
        assert!((clock.tick(5000.0) - 3.984).abs() < 1e-4);
        assert_eq!(clock.tick(4000.0), 0.0);
        assert_eq!(clock.tick(f64::NAN), 0.0);
        assert!((clock.tick(4100.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_low_frame_rate_keeps_real_speed() {
        let config = open_config();
        let mut fl = frame_loop(&config, InputMode::KeyboardMouse);
        let mut clock = FrameClock::new();
        let mut q = InputQueue::new();
        q.push(key_down("w"));

        // 4 fps for two seconds
        let start = fl.ctx.scene.character.position;
        for frame in 0..=8 {
            let dt = clock.tick(frame as f64 * 250.0);
            fl.advance(&mut q, dt);
        }
        let travel = fl.ctx.scene.character.position.distance(start);
        assert!((travel - config.movement.speed * 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_long_frame_is_split_before_collision() {
        let mut config = open_config();
        config.scene.obstacles = vec![Vec3::new(0.0, 1.0, 2.0)];
        let mut fl = frame_loop(&config, InputMode::KeyboardMouse);
        let mut q = InputQueue::new();
        q.push(key_down("w"));

        // one unsplit 1 s step would land at z = 5, past the obstacle
        let out = fl.advance(&mut q, 1.0);
        assert!(out.character.position.z < 2.0 - 1.5 + 1e-4);
    }

    #[test]
    fn test_advance_merges_substeps() {
        let mut config = open_config();
        config.movement.max_step_dt = 0.1;
        let mut scene = Scene::from_config(&config);
        scene.character.position = Vec3::new(0.0, 1.0, 2.9);
        let mut fl = FrameLoop::new(&config, scene, create_source(InputMode::KeyboardMouse, &config.movement));
        let mut q = InputQueue::new();
        q.push(key_down("w"));

        let out = fl.advance(&mut q, 0.5);
        assert!(out.moved);
        assert!((out.movement.length() - 5.0 * 0.5).abs() < 1e-4);
        assert_eq!(out.transition, Some(ProximityTransition::Entered));
        assert_eq!(out.proximity, ProximityState::InRange);
    }

    #[test]
    fn test_nan_right_stick_leaves_yaw_finite() {
        let config = open_config();
        let mut fl = frame_loop(&config, InputMode::DualJoystick);
        let mut q = InputQueue::new();
        q.push(InputEvent::JoystickMove { stick: Stick::Right, vector: Vec2::new(f32::NAN, 0.0) });
        let out = fl.advance(&mut q, DT);
        assert!(out.camera.position.is_finite());
        q.push(InputEvent::JoystickEnd { stick: Stick::Right });
        fl.advance(&mut q, DT);
        assert_eq!(fl.ctx.yaw, 0.0);
    }
}
