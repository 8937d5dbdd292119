use egui::Context;
use glam::Vec3;

use crate::controller::{FrameOutput, InputMode, Notification, ProximityState};

/// How long a toast stays on screen, in seconds
pub const TOAST_SECONDS: f64 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub expires_at: f64,
}

/// Fire-and-forget notifications, oldest first
#[derive(Debug, Default)]
pub struct Toasts {
    items: Vec<Toast>,
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: &Notification, now: f64) {
        self.items.push(Toast {
            message: notification.message.clone(),
            expires_at: now + TOAST_SECONDS,
        });
    }

    /// Drop toasts whose time is up
    pub fn expire(&mut self, now: f64) {
        self.items.retain(|t| t.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Numbers shown in the debug window and prompt
#[derive(Debug, Clone, Copy)]
pub struct HudInfo {
    pub fps: f32,
    pub position: Vec3,
    pub yaw: f32,
    pub proximity: ProximityState,
    pub mode: InputMode,
}

impl HudInfo {
    pub fn from_frame(frame: &FrameOutput, yaw: f32, dt: f32, mode: InputMode) -> Self {
        Self {
            fps: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            position: frame.character.position,
            yaw,
            proximity: frame.proximity,
            mode,
        }
    }
}

pub fn prompt_text(mode: InputMode) -> &'static str {
    match mode {
        InputMode::KeyboardMouse => "Press F to interact",
        InputMode::DualJoystick => "Object nearby",
    }
}

/// Build the overlay and return egui output
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, toasts: &Toasts, hud: &HudInfo) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        draw_debug_window(ctx, hud);
        if hud.proximity == ProximityState::InRange {
            draw_prompt(ctx, hud.mode);
        }
        draw_toasts(ctx, toasts);
    })
}

/// Raw input for a canvas without a windowing backend
pub fn canvas_input(width: u32, height: u32, now_secs: f64, events: Vec<egui::Event>) -> egui::RawInput {
    egui::RawInput {
        time: Some(now_secs),
        screen_rect: Some(egui::Rect::from_min_size(
            egui::Pos2::new(0.0, 0.0),
            egui::vec2(width as f32, height as f32),
        )),
        events,
        ..Default::default()
    }
}

fn draw_debug_window(ctx: &Context, hud: &HudInfo) {
    let p = hud.position;
    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .default_size([160.0, 100.0])
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {:.0}", hud.fps)).small());
            ui.label(egui::RichText::new(format!("Pos: x: {:.1} y: {:.1} z: {:.1}", p.x, p.y, p.z)).small());
            ui.label(egui::RichText::new(format!("Yaw: {:.1}", hud.yaw.to_degrees())).small());
            ui.label(egui::RichText::new(format!("Proximity: {:?}", hud.proximity)).small());
            ui.label(egui::RichText::new(format!("Input: {}", hud.mode)).small());
            ui.separator();
            ui.label(egui::RichText::new("Controls:").small());
            match hud.mode {
                InputMode::KeyboardMouse => {
                    ui.label(egui::RichText::new("WASD / Arrows - Move").small());
                    ui.label(egui::RichText::new("Click - Lock mouse").small());
                    ui.label(egui::RichText::new("Mouse - Orbit camera").small());
                    ui.label(egui::RichText::new("F - Interact").small());
                }
                InputMode::DualJoystick => {
                    ui.label(egui::RichText::new("Left stick - Move").small());
                    ui.label(egui::RichText::new("Right stick - Orbit camera").small());
                }
            }
        });
}

fn draw_prompt(ctx: &Context, mode: InputMode) {
    egui::Area::new(egui::Id::new("interaction_prompt"))
        .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -48.0])
        .show(ctx, |ui| {
            egui::Frame::NONE
                .fill(egui::Color32::from_black_alpha(160))
                .inner_margin(8.0)
                .corner_radius(4.0)
                .show(ui, |ui| {
                    ui.label(egui::RichText::new(prompt_text(mode)).color(egui::Color32::WHITE));
                });
        });
}

fn draw_toasts(ctx: &Context, toasts: &Toasts) {
    if toasts.is_empty() {
        return;
    }
    egui::Area::new(egui::Id::new("toasts"))
        .anchor(egui::Align2::RIGHT_TOP, [-8.0, 8.0])
        .show(ctx, |ui| {
            for toast in toasts.iter() {
                egui::Frame::NONE
                    .fill(egui::Color32::from_rgb(0x33, 0x33, 0x33))
                    .inner_margin(10.0)
                    .corner_radius(4.0)
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(&toast.message).color(egui::Color32::WHITE));
                    });
                ui.add_space(4.0);
            }
        });
}
