// Re-export all public modules so they can be used from main.rs
pub mod logging;
pub mod config;
pub mod error;
pub mod utils;
pub mod ui;
pub mod assets;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
use std::cell::{Cell, RefCell};
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
use glam::Vec2;
#[cfg(target_arch = "wasm32")]
use tracing::{error, info, warn};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, HtmlElement, KeyboardEvent, MouseEvent, TouchEvent, Window};

#[cfg(target_arch = "wasm32")]
use assets::ModelLoader;
#[cfg(target_arch = "wasm32")]
use config::DemoConfig;
#[cfg(target_arch = "wasm32")]
use controller::{create_source, FrameClock, FrameLoop, InputEvent, InputMode, InputQueue, JoystickPad, KeyBindings};
#[cfg(target_arch = "wasm32")]
use controller::joystick::DEFAULT_STICK_RADIUS;
#[cfg(target_arch = "wasm32")]
use model::Scene;
#[cfg(target_arch = "wasm32")]
use view::{GpuContext, RenderState, UiFrame};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    logging::init();

    let window = web_sys::window().ok_or(js_error("no global `window`"))?;
    let (width, height) = window_size(&window);
    let (document, canvas) = init_canvas(&window, width, height)?;
    setup_app(&window, &document, &canvas).await
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(
    window: &Window,
    document: &Document,
    canvas: &HtmlCanvasElement,
) -> Result<(), JsValue> {
    let config = DemoConfig::default();

    let coarse = window
        .match_media("(pointer: coarse)")?
        .map(|mq| mq.matches())
        .unwrap_or(false);
    let mode = config.input_mode.unwrap_or(InputMode::from_pointer(coarse));
    info!(%mode, coarse, "input mode selected");

    let mut gpu = GpuContext::for_canvas(canvas)
        .await
        .map_err(|e| js_error(format!("GPU init failed: {e}")))?;
    let width = gpu.config.width;
    let height = gpu.config.height;

    let ground = assets::load_ground_texture(&config.scene).await;
    let scene = Scene::from_config(&config);
    let mut render_state = RenderState::new(
        gpu.device.as_ref(),
        gpu.queue.as_ref(),
        gpu.format,
        width,
        height,
        &config,
        &scene,
        ground.as_deref(),
    );
    let mut frame_loop = FrameLoop::new(&config, scene, create_source(mode, &config.movement));
    let mut loader = ModelLoader::start(&config.scene);

    let queue = Rc::new(RefCell::new(InputQueue::new()));
    let pad = Rc::new(RefCell::new(JoystickPad::new(width as f32, DEFAULT_STICK_RADIUS)));
    let egui_events: Rc<RefCell<Vec<egui::Event>>> = Rc::new(RefCell::new(Vec::new()));
    let pending_resize: Rc<Cell<Option<(u32, u32)>>> = Rc::new(Cell::new(None));

    match mode {
        InputMode::KeyboardMouse => setup_keyboard_mouse(document, window, canvas, queue.clone(), egui_events.clone())?,
        InputMode::DualJoystick => setup_touch(canvas, queue.clone(), pad.clone())?,
    }
    setup_window_listeners(document, window, canvas, queue.clone(), pending_resize.clone())?;

    let egui_ctx = egui::Context::default();
    let mut toasts = ui::Toasts::new();
    let performance = window.performance();
    let now_ms = move || performance.as_ref().map(|p| p.now()).unwrap_or(0.0);
    let mut clock = FrameClock::new();

    // Continuous redraw using requestAnimationFrame
    let f = RcCellCallback::new(window.clone(), move || {
        if let Some((w, h)) = pending_resize.take() {
            gpu.resize(w, h);
            render_state.resize(gpu.device.as_ref(), w, h);
            pad.borrow_mut().set_width(w as f32);
        }

        if let Some(model) = loader.poll() {
            render_state.attach_model(gpu.device.as_ref(), &model);
        }

        let now = now_ms();
        let dt = clock.tick(now);
        let frame = frame_loop.advance(&mut queue.borrow_mut(), dt);
        render_state.update(gpu.queue.as_ref(), &frame);

        let now_secs = now / 1000.0;
        for n in &frame.notifications {
            toasts.push(n, now_secs);
        }
        toasts.expire(now_secs);

        let hud = ui::HudInfo::from_frame(&frame, frame_loop.ctx.yaw, dt, mode);
        let raw_input = ui::canvas_input(
            render_state.width,
            render_state.height,
            now_secs,
            egui_events.borrow_mut().drain(..).collect(),
        );
        let output = ui::build_ui(&egui_ctx, raw_input, &toasts, &hud);
        let ui_frame = UiFrame {
            primitives: egui_ctx.tessellate(output.shapes, output.pixels_per_point),
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        };

        match render_state.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface, Some(ui_frame)) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.resize(gpu.config.width, gpu.config.height);
            }
            Err(e) => warn!("frame skipped: {e}"),
        }
    });
    f.start()
}

/// Keyboard, pointer lock and mouse look
#[cfg(target_arch = "wasm32")]
fn setup_keyboard_mouse(
    document: &Document,
    window: &Window,
    canvas: &HtmlCanvasElement,
    queue: Rc<RefCell<InputQueue>>,
    egui_events: Rc<RefCell<Vec<egui::Event>>>,
) -> Result<(), JsValue> {
    let bindings = KeyBindings::default();

    // Keyboard down
    {
        let queue = queue.clone();
        let document_for_exit = document.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            let key = e.key();
            if bindings.is_escape(&key) {
                document_for_exit.exit_pointer_lock();
            }
            if bindings.is_navigation(&key) {
                e.prevent_default();
            }
            queue.borrow_mut().push(InputEvent::KeyDown { key, repeat: e.repeat() });
        }) as Box<dyn FnMut(KeyboardEvent)>);
        window.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let queue = queue.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            queue.borrow_mut().push(InputEvent::KeyUp(e.key()));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        window.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Pointer lock change
    {
        let queue = queue.clone();
        let doc_pl = document.clone();
        let plc = Closure::wrap(Box::new(move |_e: Event| {
            let locked = doc_pl.pointer_lock_element().is_some();
            info!(locked, "pointer lock changed");
            queue.borrow_mut().push(InputEvent::PointerLockChanged { locked });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("pointerlockchange", plc.as_ref().unchecked_ref())?;
        plc.forget();
    }

    // Canvas click to enter pointer lock
    {
        let canvas_click = canvas.clone();
        let click = Closure::wrap(Box::new(move |_e: MouseEvent| {
            if let Ok(html_el) = canvas_click.clone().dyn_into::<HtmlElement>() {
                html_el.request_pointer_lock();
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();
    }

    // Mouse move: look while locked, otherwise drive the overlay
    {
        let queue = queue.clone();
        let doc_mm = document.clone();
        let egui_events = egui_events.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            if doc_mm.pointer_lock_element().is_some() {
                queue.borrow_mut().push(InputEvent::MouseMove {
                    dx: e.movement_x() as f32,
                    dy: e.movement_y() as f32,
                });
            } else {
                let pos = egui::pos2(e.client_x() as f32, e.client_y() as f32);
                egui_events.borrow_mut().push(egui::Event::PointerMoved(pos));
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
        mm.forget();
    }

    // Mouse buttons for the overlay windows
    for (name, pressed) in [("mousedown", true), ("mouseup", false)] {
        let egui_events = egui_events.clone();
        let doc_mb = document.clone();
        let cb = Closure::wrap(Box::new(move |e: MouseEvent| {
            if e.button() != 0 || doc_mb.pointer_lock_element().is_some() {
                return;
            }
            egui_events.borrow_mut().push(egui::Event::PointerButton {
                pos: egui::pos2(e.client_x() as f32, e.client_y() as f32),
                button: egui::PointerButton::Primary,
                pressed,
                modifiers: egui::Modifiers::default(),
            });
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback(name, cb.as_ref().unchecked_ref())?;
        cb.forget();
    }

    Ok(())
}

/// Touch to virtual joysticks, left half walks, right half turns
#[cfg(target_arch = "wasm32")]
fn setup_touch(
    canvas: &HtmlCanvasElement,
    queue: Rc<RefCell<InputQueue>>,
    pad: Rc<RefCell<JoystickPad>>,
) -> Result<(), JsValue> {
    type Handler = fn(&mut JoystickPad, u64, Vec2) -> Option<InputEvent>;
    let handlers: [(&str, Handler); 4] = [
        ("touchstart", |p, id, pos| p.touch_start(id, pos)),
        ("touchmove", |p, id, pos| p.touch_move(id, pos)),
        ("touchend", |p, id, _| p.touch_end(id)),
        ("touchcancel", |p, id, _| p.touch_end(id)),
    ];

    for (name, handler) in handlers {
        let queue = queue.clone();
        let pad = pad.clone();
        let cb = Closure::wrap(Box::new(move |e: TouchEvent| {
            e.prevent_default();
            let touches = e.changed_touches();
            for i in 0..touches.length() {
                let Some(touch) = touches.item(i) else { continue };
                let pos = Vec2::new(touch.client_x() as f32, touch.client_y() as f32);
                if let Some(event) = handler(&mut pad.borrow_mut(), touch.identifier() as u64, pos) {
                    queue.borrow_mut().push(event);
                }
            }
        }) as Box<dyn FnMut(TouchEvent)>);
        canvas.add_event_listener_with_callback(name, cb.as_ref().unchecked_ref())?;
        cb.forget();
    }

    Ok(())
}

/// Focus, visibility and resize
#[cfg(target_arch = "wasm32")]
fn setup_window_listeners(
    document: &Document,
    window: &Window,
    canvas: &HtmlCanvasElement,
    queue: Rc<RefCell<InputQueue>>,
    pending_resize: Rc<Cell<Option<(u32, u32)>>>,
) -> Result<(), JsValue> {
    // Focus loss - clear all keys
    {
        let queue = queue.clone();
        let blur = Closure::wrap(Box::new(move |_e: Event| {
            queue.borrow_mut().push(InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    // Visibility change - clear all keys when hidden
    {
        let queue = queue.clone();
        let doc_vis = document.clone();
        let visibility = Closure::wrap(Box::new(move |_e: Event| {
            queue.borrow_mut().push(InputEvent::VisibilityChanged { visible: !doc_vis.hidden() });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
        visibility.forget();
    }

    // Resize - canvas follows the window, GPU side catches up next frame
    {
        let win = window.clone();
        let canvas = canvas.clone();
        let resize = Closure::wrap(Box::new(move |_e: Event| {
            let (w, h) = window_size(&win);
            canvas.set_width(w);
            canvas.set_height(h);
            pending_resize.set(Some((w, h)));
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())?;
        resize.forget();
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn window_size(window: &Window) -> (u32, u32) {
    let dim = |v: Result<JsValue, JsValue>, fallback: f64| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
    let w = dim(window.inner_width(), 800.0);
    let h = dim(window.inner_height(), 600.0);
    (w.max(1.0) as u32, h.max(1.0) as u32)
}

#[cfg(target_arch = "wasm32")]
fn init_canvas(window: &Window, width: u32, height: u32) -> Result<(Document, HtmlCanvasElement), JsValue> {
    let document = window.document().ok_or(js_error("no document on window"))?;
    let body = document.body().ok_or(js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;
    canvas_el.set_width(width);
    canvas_el.set_height(height);
    body.append_child(&canvas_el)?;
    Ok((document, canvas_el))
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut()>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn start(self) -> Result<(), JsValue> {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            inner.borrow_mut().as_mut()();

            // Recursively schedule next frame
            if let Some(cb) = callback_clone.borrow().as_ref() {
                if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    error!("requestAnimationFrame failed: {e:?}");
                }
            }
        }) as Box<dyn FnMut()>));

        if let Some(cb) = callback.borrow().as_ref() {
            self.window.request_animation_frame(cb.as_ref().unchecked_ref())?;
        }

        // Leak the closure to keep it alive
        std::mem::forget(callback);
        Ok(())
    }
}
