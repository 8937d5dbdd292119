//! One-shot asynchronous model loading.
//!
//! The model is fetched off the frame loop (a worker thread natively, `fetch`
//! in the browser) and its events are polled once per frame. Failures are
//! logged and the scene simply carries on without the model.

use std::io::Cursor;

use glam::{Mat4, Vec3};
use tracing::{error, info, warn};

use crate::config::SceneConfig;
use crate::error::AssetError;
use crate::utils::{Mesh, Vertex};

const MODEL_COLOR: [f32; 4] = [0.8, 0.8, 0.8, 1.0];

/// Parsed model ready to be attached to the scene
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub name: String,
    pub mesh: Mesh,
    pub scale: f32,
    pub position: Vec3,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl LoadedModel {
    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), glam::Quat::IDENTITY, self.position)
    }
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress { loaded: u64, total: u64 },
    Loaded(LoadedModel),
    Failed(AssetError),
}

impl LoadEvent {
    pub fn percent(loaded: u64, total: u64) -> f32 {
        if total == 0 {
            100.0
        } else {
            loaded as f32 / total as f32 * 100.0
        }
    }
}

/// Parse Wavefront OBJ text into a single mesh. Materials are not loaded.
pub fn parse_obj(path: &str, bytes: &[u8]) -> Result<Mesh, AssetError> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, _materials) = tobj::load_obj_buf(&mut Cursor::new(bytes), &options, |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })
    .map_err(|source| AssetError::Parse { path: path.to_string(), source })?;

    let mut mesh = Mesh::empty();
    for model in &models {
        mesh.extend(&convert_model(&model.mesh));
    }

    if mesh.is_empty() {
        return Err(AssetError::Empty { path: path.to_string() });
    }
    Ok(mesh)
}

fn convert_model(src: &tobj::Mesh) -> Mesh {
    let vertex_count = src.positions.len() / 3;
    let has_normals = src.normals.len() >= vertex_count * 3;
    let has_uvs = src.texcoords.len() >= vertex_count * 2;

    let vertices = (0..vertex_count)
        .map(|i| Vertex {
            pos: [src.positions[i * 3], src.positions[i * 3 + 1], src.positions[i * 3 + 2]],
            normal: if has_normals {
                [src.normals[i * 3], src.normals[i * 3 + 1], src.normals[i * 3 + 2]]
            } else {
                [0.0; 3]
            },
            color: MODEL_COLOR,
            uv: if has_uvs {
                [src.texcoords[i * 2], 1.0 - src.texcoords[i * 2 + 1]]
            } else {
                [0.0; 2]
            },
        })
        .collect();

    let mut mesh = Mesh { vertices, indices: whole_triangles(&src.indices, vertex_count) };
    if !has_normals {
        compute_normals(&mut mesh);
    }
    mesh
}

/// Keep only triangles whose three corners all exist
fn whole_triangles(indices: &[u32], vertex_count: usize) -> Vec<u32> {
    indices
        .chunks_exact(3)
        .filter(|tri| tri.iter().all(|&i| (i as usize) < vertex_count))
        .flatten()
        .copied()
        .collect()
}

/// Area-weighted vertex normals
fn compute_normals(mesh: &mut Mesh) {
    let mut acc = vec![Vec3::ZERO; mesh.vertices.len()];
    for tri in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(mesh.vertices[i as usize].pos));
        let n = (b - a).cross(c - a);
        for &i in tri {
            acc[i as usize] += n;
        }
    }
    for (v, n) in mesh.vertices.iter_mut().zip(acc) {
        v.normal = n.normalize_or_zero().to_array();
    }
}

fn finish(path: &str, bytes: &[u8], config: &SceneConfig) -> LoadEvent {
    match parse_obj(path, bytes) {
        Ok(mesh) => LoadEvent::Loaded(LoadedModel {
            name: path.to_string(),
            mesh,
            scale: config.model_scale,
            position: config.model_position,
            cast_shadow: true,
            receive_shadow: true,
        }),
        Err(e) => LoadEvent::Failed(e),
    }
}

/// Raw bytes of the configured ground texture, if any. A missing or unreadable
/// file falls back to the generated tile.
pub async fn load_ground_texture(config: &SceneConfig) -> Option<Vec<u8>> {
    let path = config.ground_texture.as_deref()?;
    match read_bytes(path).await {
        Ok(bytes) => {
            info!(path, bytes = bytes.len(), "ground texture loaded");
            Some(bytes)
        }
        Err(e) => {
            warn!("{e}, using generated ground");
            None
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        use std::cell::RefCell;
        use std::collections::VecDeque;
        use std::rc::Rc;
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;

        /// In-flight model download
        pub struct ModelLoader {
            events: Rc<RefCell<VecDeque<LoadEvent>>>,
            done: bool,
        }

        impl ModelLoader {
            pub fn start(config: &SceneConfig) -> Self {
                let events = Rc::new(RefCell::new(VecDeque::new()));
                let path = config.model_path.clone();
                let config = config.clone();
                let sink = events.clone();
                info!(path = %path, "loading model");
                wasm_bindgen_futures::spawn_local(async move {
                    let event = match read_bytes(&path).await {
                        Ok(bytes) => {
                            let total = bytes.len() as u64;
                            sink.borrow_mut().push_back(LoadEvent::Progress { loaded: total, total });
                            finish(&path, &bytes, &config)
                        }
                        Err(e) => LoadEvent::Failed(e),
                    };
                    sink.borrow_mut().push_back(event);
                });
                Self { events, done: false }
            }

            fn next_event(&mut self) -> Option<LoadEvent> {
                self.events.borrow_mut().pop_front()
            }
        }

        pub async fn read_bytes(path: &str) -> Result<Vec<u8>, AssetError> {
            let fetch_err = |reason: String| AssetError::Fetch { path: path.to_string(), reason };
            let window = web_sys::window().ok_or_else(|| fetch_err("no window".into()))?;
            let resp = JsFuture::from(window.fetch_with_str(path))
                .await
                .map_err(|e| fetch_err(format!("{e:?}")))?;
            let resp: web_sys::Response = resp
                .dyn_into()
                .map_err(|_| fetch_err("not a Response".into()))?;
            if !resp.ok() {
                return Err(fetch_err(format!("HTTP {}", resp.status())));
            }
            let promise = resp.array_buffer().map_err(|e| fetch_err(format!("{e:?}")))?;
            let buffer = JsFuture::from(promise).await.map_err(|e| fetch_err(format!("{e:?}")))?;
            Ok(js_sys::Uint8Array::new(&buffer).to_vec())
        }
    } else {
        use std::fs::File;
        use std::io::Read;
        use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
        use std::thread;

        const READ_CHUNK: usize = 64 * 1024;

        pub async fn read_bytes(path: &str) -> Result<Vec<u8>, AssetError> {
            std::fs::read(path).map_err(|source| AssetError::Io { path: path.to_string(), source })
        }

        /// In-flight model read on a worker thread
        pub struct ModelLoader {
            rx: Receiver<LoadEvent>,
            done: bool,
        }

        impl ModelLoader {
            pub fn start(config: &SceneConfig) -> Self {
                let (tx, rx) = mpsc::channel();
                let config = config.clone();
                info!(path = %config.model_path, "loading model");
                let spawned = thread::Builder::new()
                    .name("model-loader".into())
                    .spawn(move || {
                        let path = config.model_path.clone();
                        let event = match read_with_progress(&path, &tx) {
                            Ok(bytes) => finish(&path, &bytes, &config),
                            Err(e) => LoadEvent::Failed(e),
                        };
                        let _ = tx.send(event);
                    });
                let done = match spawned {
                    Ok(_) => false,
                    Err(e) => {
                        error!("failed to spawn model loader: {e}");
                        true
                    }
                };
                Self { rx, done }
            }

            fn next_event(&mut self) -> Option<LoadEvent> {
                match self.rx.try_recv() {
                    Ok(event) => Some(event),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => Some(LoadEvent::Failed(AssetError::Interrupted)),
                }
            }
        }

        fn read_with_progress(path: &str, tx: &Sender<LoadEvent>) -> Result<Vec<u8>, AssetError> {
            let io_err = |source| AssetError::Io { path: path.to_string(), source };
            let mut file = File::open(path).map_err(io_err)?;
            let total = file.metadata().map(|m| m.len()).unwrap_or(0);
            let mut bytes = Vec::with_capacity(total as usize);
            let mut chunk = vec![0u8; READ_CHUNK];
            loop {
                let n = file.read(&mut chunk).map_err(io_err)?;
                if n == 0 {
                    break;
                }
                bytes.extend_from_slice(&chunk[..n]);
                let _ = tx.send(LoadEvent::Progress { loaded: bytes.len() as u64, total });
            }
            Ok(bytes)
        }
    }
}

impl ModelLoader {
    /// Drain pending events, logging progress and failures. Yields the model
    /// once, when it arrives.
    pub fn poll(&mut self) -> Option<LoadedModel> {
        if self.done {
            return None;
        }
        while let Some(event) = self.next_event() {
            match event {
                LoadEvent::Progress { loaded, total } => {
                    info!("model loading: {:.0}%", LoadEvent::percent(loaded, total));
                }
                LoadEvent::Loaded(model) => {
                    info!(name = %model.name, vertices = model.mesh.vertices.len(), "model loaded");
                    self.done = true;
                    return Some(model);
                }
                LoadEvent::Failed(e) => {
                    error!("error loading model: {e}");
                    self.done = true;
                    return None;
                }
            }
        }
        None
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}
