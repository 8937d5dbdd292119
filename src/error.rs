use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}: `{value}` is not a number")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key}: {value} must be finite and positive")]
    OutOfRange { key: &'static str, value: f32 },
    #[error("{key}: `{value}` is not a boolean flag")]
    InvalidFlag { key: &'static str, value: String },
    #[error("{key} must not be empty")]
    Empty { key: &'static str },
    #[error("unknown input mode `{0}` (expected `keyboard` or `joystick`)")]
    UnknownInputMode(String),
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: tobj::LoadError,
    },
    #[error("{path} contains no geometry")]
    Empty { path: String },
    #[error("model loader stopped without a result")]
    Interrupted,
    #[error("failed to decode texture: {0}")]
    Texture(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to acquire device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}
