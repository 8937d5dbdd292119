use image::{Rgba, RgbaImage};

use crate::error::AssetError;

/// GPU texture with the view and sampler the scene shader binds
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    pub fn from_image(device: &wgpu::Device, queue: &wgpu::Queue, image: &RgbaImage, label: &str) -> Self {
        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        // repeat wrapping so ground UVs above 1.0 tile
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self { texture, view, sampler }
    }

    /// 1x1 white, for meshes coloured by vertex colour only
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let image = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        Self::from_image(device, queue, &image, "white_texture")
    }
}

/// Decode an encoded image (png, jpeg, webp) into RGBA8
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, AssetError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Mottled grass tile generated from a hash noise, seamless when repeated
pub fn generate_grass(size: u32) -> RgbaImage {
    let size = size.max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        let n = hash_noise(x % size, y % size);
        let blade = hash_noise(x.wrapping_mul(3) % size, y / 2) * 0.35;
        let g = 110.0 + 80.0 * n + 40.0 * blade;
        let r = 45.0 + 40.0 * n;
        let b = 30.0 + 25.0 * blade;
        Rgba([r as u8, g.min(255.0) as u8, b as u8, 255])
    })
}

/// Deterministic value in [0, 1) per lattice point
fn hash_noise(x: u32, y: u32) -> f32 {
    let mut h = x.wrapping_mul(374_761_393) ^ y.wrapping_mul(668_265_263);
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^= h >> 16;
    (h & 0xffff) as f32 / 65_536.0
}
