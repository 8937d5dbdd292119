use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use tracing::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, Touch, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{CursorGrabMode, Window, WindowId},
};

use orbitwalk::{
    assets::{self, ModelLoader},
    config::DemoConfig,
    controller::{create_source, joystick::DEFAULT_STICK_RADIUS, FrameClock, FrameLoop, InputEvent, InputMode, InputQueue, JoystickPad},
    logging,
    model::Scene,
    ui,
    view::{gpu_init, GpuContext, RenderState, UiFrame},
};

/// Everything that exists once the window and GPU are up
struct Demo {
    window: Arc<Window>,
    gpu: GpuContext,
    render_state: RenderState,
    frame_loop: FrameLoop,
    loader: ModelLoader,
    queue: InputQueue,
    pad: JoystickPad,
    mode: InputMode,
    pointer_locked: bool,

    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    toasts: ui::Toasts,

    clock: FrameClock,
    started: Instant,
}

impl Demo {
    async fn new(window: Arc<Window>, config: &DemoConfig) -> Result<Self, orbitwalk::error::GpuError> {
        let size = window.inner_size();
        let instance = gpu_init::create_instance();
        let surface = instance.create_surface(window.clone())?;
        let gpu = GpuContext::new(&instance, surface, size.width, size.height).await?;

        let mode = config.input_mode.unwrap_or(InputMode::KeyboardMouse);
        info!(%mode, "input mode selected");

        let ground = assets::load_ground_texture(&config.scene).await;
        let scene = Scene::from_config(config);
        let render_state = RenderState::new(
            gpu.device.as_ref(),
            gpu.queue.as_ref(),
            gpu.format,
            gpu.config.width,
            gpu.config.height,
            config,
            &scene,
            ground.as_deref(),
        );
        let frame_loop = FrameLoop::new(config, scene, create_source(mode, &config.movement));

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        Ok(Self {
            window,
            render_state,
            frame_loop,
            loader: ModelLoader::start(&config.scene),
            queue: InputQueue::new(),
            pad: JoystickPad::new(gpu.config.width as f32, DEFAULT_STICK_RADIUS),
            mode,
            pointer_locked: false,
            egui_ctx,
            egui_state,
            toasts: ui::Toasts::new(),
            clock: FrameClock::new(),
            started: Instant::now(),
            gpu,
        })
    }

    fn set_pointer_lock(&mut self, lock: bool) {
        if lock == self.pointer_locked {
            return;
        }
        let grabbed = if lock {
            self.window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined))
        } else {
            self.window.set_cursor_grab(CursorGrabMode::None)
        };
        match grabbed {
            Ok(()) => {
                self.window.set_cursor_visible(!lock);
                self.pointer_locked = lock;
                info!(locked = lock, "pointer lock changed");
                self.queue.push(InputEvent::PointerLockChanged { locked: lock });
            }
            Err(e) => warn!("cursor grab failed: {e}"),
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        self.render_state.resize(self.gpu.device.as_ref(), width, height);
        self.pad.set_width(width as f32);
    }

    fn keyboard(&mut self, event: &KeyEvent) {
        let Some(key) = key_name(&event.logical_key) else { return };
        match event.state {
            ElementState::Pressed => {
                if key == "Escape" {
                    self.set_pointer_lock(false);
                }
                self.queue.push(InputEvent::KeyDown { key, repeat: event.repeat });
            }
            ElementState::Released => self.queue.push(InputEvent::KeyUp(key)),
        }
    }

    fn touch(&mut self, touch: &Touch) {
        let pos = Vec2::new(touch.location.x as f32, touch.location.y as f32);
        let event = match touch.phase {
            TouchPhase::Started => self.pad.touch_start(touch.id, pos),
            TouchPhase::Moved => self.pad.touch_move(touch.id, pos),
            TouchPhase::Ended | TouchPhase::Cancelled => self.pad.touch_end(touch.id),
        };
        if let Some(event) = event {
            self.queue.push(event);
        }
    }

    /// One simulation step plus a frame. Returns false when the loop should stop.
    fn redraw(&mut self) -> bool {
        if let Some(model) = self.loader.poll() {
            self.render_state.attach_model(self.gpu.device.as_ref(), &model);
        }

        let now_secs = self.started.elapsed().as_secs_f64();
        let dt = self.clock.tick(now_secs * 1000.0);
        let frame = self.frame_loop.advance(&mut self.queue, dt);
        self.render_state.update(self.gpu.queue.as_ref(), &frame);

        for n in &frame.notifications {
            self.toasts.push(n, now_secs);
        }
        self.toasts.expire(now_secs);

        let hud = ui::HudInfo::from_frame(&frame, self.frame_loop.ctx.yaw, dt, self.mode);
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let output = ui::build_ui(&self.egui_ctx, raw_input, &self.toasts, &hud);
        self.egui_state.handle_platform_output(&self.window, output.platform_output);
        let ui_frame = UiFrame {
            primitives: self.egui_ctx.tessellate(output.shapes, output.pixels_per_point),
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        };

        match self.render_state.draw_frame(
            self.gpu.device.as_ref(),
            self.gpu.queue.as_ref(),
            &self.gpu.surface,
            Some(ui_frame),
        ) {
            Ok(()) => true,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.window.inner_size();
                self.resize(size.width, size.height);
                true
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory");
                false
            }
            Err(e) => {
                warn!("frame skipped: {e}");
                true
            }
        }
    }
}

/// Browser-style key names so both platforms share the same bindings
fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Character(s) => Some(s.to_string()),
        Key::Named(named) => {
            let name = match named {
                NamedKey::ArrowUp => "ArrowUp",
                NamedKey::ArrowDown => "ArrowDown",
                NamedKey::ArrowLeft => "ArrowLeft",
                NamedKey::ArrowRight => "ArrowRight",
                NamedKey::Escape => "Escape",
                NamedKey::Space => " ",
                NamedKey::Shift => "Shift",
                _ => return None,
            };
            Some(name.to_string())
        }
        _ => None,
    }
}

struct App {
    config: DemoConfig,
    demo: Option<Demo>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.demo.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("orbitwalk")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(Demo::new(window, &self.config)) {
            Ok(demo) => self.demo = Some(demo),
            Err(e) => {
                error!("GPU init failed: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(demo) = self.demo.as_mut() else { return };
        if demo.window.id() != window_id {
            return;
        }

        // egui gets first look, unless the mouse is steering the camera
        let consumed = !demo.pointer_locked && demo.egui_state.on_window_event(&demo.window, &event).consumed;

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => demo.resize(size.width, size.height),
            WindowEvent::Focused(false) => {
                demo.queue.push(InputEvent::FocusLost);
                demo.set_pointer_lock(false);
            }
            WindowEvent::Occluded(occluded) => {
                demo.queue.push(InputEvent::VisibilityChanged { visible: !occluded });
            }
            WindowEvent::KeyboardInput { ref event, .. } if !consumed => demo.keyboard(event),
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. }
                if !consumed && demo.mode == InputMode::KeyboardMouse =>
            {
                demo.set_pointer_lock(true);
            }
            WindowEvent::Touch(ref touch) if demo.mode == InputMode::DualJoystick => demo.touch(touch),
            WindowEvent::RedrawRequested => {
                if !demo.redraw() {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(demo) = self.demo.as_mut() else { return };
        if let DeviceEvent::MouseMotion { delta } = event {
            if demo.pointer_locked {
                demo.queue.push(InputEvent::MouseMove { dx: delta.0 as f32, dy: delta.1 as f32 });
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(demo) = &self.demo {
            demo.window.request_redraw();
        }
    }
}

fn main() {
    logging::init();

    let config = match DemoConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(el) => el,
        Err(e) => {
            error!("failed to create event loop: {e}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App { config, demo: None };
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("event loop error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names_match_browser() {
        assert_eq!(key_name(&Key::Character("W".into())).as_deref(), Some("W"));
        assert_eq!(key_name(&Key::Named(NamedKey::ArrowLeft)).as_deref(), Some("ArrowLeft"));
        assert_eq!(key_name(&Key::Named(NamedKey::Space)).as_deref(), Some(" "));
        assert_eq!(key_name(&Key::Named(NamedKey::F1)), None);
    }
}
