use glam::{Mat4, Vec3};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::assets::LoadedModel;
use crate::config::DemoConfig;
use crate::controller::FrameOutput;
use crate::model::{Camera, Scene};
use crate::utils::{create_box_mesh, create_ground_mesh, hex_color, uniform_faces, FaceColors, Mesh, MeshBuffer, Vertex};
use crate::view::texture::{self, Texture};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub light_dir: [f32; 3],
    pub light_intensity: f32,
    pub ambient: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ItemUniform {
    pub model: [[f32; 4]; 4],
    pub tint: [f32; 4],
    pub params: [f32; 4],
}

impl ItemUniform {
    fn new(transform: Mat4, lit: bool) -> Self {
        Self {
            model: transform.to_cols_array_2d(),
            tint: [1.0; 4],
            params: [if lit { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

/// Character faces: +X/-X cyan, +Z red (front), the rest blue
pub fn character_faces() -> FaceColors {
    let cyan = hex_color(0x00ffff);
    let blue = hex_color(0x0000ff);
    let red = hex_color(0xff0000);
    [cyan, cyan, blue, blue, red, blue]
}

// Shared graphics setup used by native and web
pub struct CameraResources {
    pub camera_buffer: wgpu::Buffer,
    pub lighting_buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub camera_bind_group: wgpu::BindGroup,
}

pub fn create_camera_resources(device: &wgpu::Device) -> CameraResources {
    let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lighting_buffer"),
        size: std::mem::size_of::<LightingUniform>() as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX), uniform_entry(1, wgpu::ShaderStages::FRAGMENT)],
    });

    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("camera_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    CameraResources { camera_buffer, lighting_buffer, bind_group_layout, camera_bind_group }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn create_item_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("item_bind_group_layout"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub fn create_scene_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_layout: &wgpu::BindGroupLayout,
    item_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scene_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("scene_pipeline_layout"),
        bind_group_layouts: &[camera_layout, item_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 24, shader_location: 2, format: wgpu::VertexFormat::Float32x4 },
                    wgpu::VertexAttribute { offset: 40, shader_location: 3, format: wgpu::VertexFormat::Float32x2 },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // loaded models may be open or inconsistently wound
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

/// One mesh with its own transform uniform and texture binding
pub struct Drawable {
    pub mesh: MeshBuffer,
    uniform: ItemUniform,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl Drawable {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        mesh: &Mesh,
        texture: &Texture,
        transform: Mat4,
        lit: bool,
        label: &str,
    ) -> Self {
        let uniform = ItemUniform::new(transform, lit);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: uniform_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&texture.view) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&texture.sampler) },
            ],
        });

        Self { mesh: mesh.upload(device), uniform, uniform_buffer, bind_group }
    }

    pub fn set_transform(&mut self, queue: &wgpu::Queue, transform: Mat4) {
        self.uniform.model = transform.to_cols_array_2d();
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniform));
    }
}

/// egui output tessellated for this frame
pub struct UiFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// Consolidated render state to avoid parameter explosion
pub struct RenderState {
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
    pub camera: Camera,
    background: wgpu::Color,

    pipeline: wgpu::RenderPipeline,
    camera_resources: CameraResources,
    item_layout: wgpu::BindGroupLayout,
    depth_view: wgpu::TextureView,
    white: Texture,

    ground: Drawable,
    character: Drawable,
    obstacles: Vec<Drawable>,
    interactable: Option<Drawable>,
    model: Option<Drawable>,

    pub egui_renderer: egui_wgpu::Renderer,
}

impl RenderState {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        config: &DemoConfig,
        scene: &Scene,
        ground_image: Option<&[u8]>,
    ) -> Self {
        let camera_resources = create_camera_resources(device);
        let item_layout = create_item_layout(device);
        let pipeline = create_scene_pipeline(device, format, &camera_resources.bind_group_layout, &item_layout);
        let (_, depth_view) = create_depth_texture(device, width, height);
        let white = Texture::white(device, queue);

        let light_dir = config.scene.light_position.normalize_or_zero();
        let lighting = LightingUniform {
            light_dir: light_dir.to_array(),
            light_intensity: config.scene.light_intensity,
            ambient: config.scene.ambient,
            _pad1: 0.0,
            _pad2: 0.0,
            _pad3: 0.0,
        };
        queue.write_buffer(&camera_resources.lighting_buffer, 0, bytemuck::bytes_of(&lighting));

        let grass = match ground_image.map(texture::decode_image) {
            Some(Ok(image)) => image,
            Some(Err(e)) => {
                warn!("ground texture unusable, using generated grass: {e}");
                texture::generate_grass(128)
            }
            None => texture::generate_grass(128),
        };
        let ground_texture = Texture::from_image(device, queue, &grass, "ground_texture");
        let ground = Drawable::new(
            device,
            &item_layout,
            &create_ground_mesh(config.scene.ground_size, config.scene.ground_texture_repeat),
            &ground_texture,
            Mat4::IDENTITY,
            false,
            "ground",
        );

        let character = Drawable::new(
            device,
            &item_layout,
            &create_box_mesh(1.0, 2.0, 1.0, character_faces()),
            &white,
            scene.character.transform(),
            false,
            "character",
        );

        let size = config.collision.obstacle_size;
        let obstacle_mesh = create_box_mesh(size, size, size, uniform_faces(hex_color(0x888888)));
        let obstacles = scene
            .obstacles
            .iter()
            .map(|o| {
                Drawable::new(device, &item_layout, &obstacle_mesh, &white, Mat4::from_translation(o.position), false, "obstacle")
            })
            .collect();

        let interactable = scene.interactable.map(|i| {
            let mesh = create_box_mesh(i.size, i.size, i.size, uniform_faces(hex_color(0x00ff00)));
            Drawable::new(device, &item_layout, &mesh, &white, Mat4::from_translation(i.position), false, "interactable")
        });

        let mut camera = Camera::new(width, height, &config.camera);
        camera.look_at(
            scene.character.position + config.camera.orbit_offset,
            scene.character.position + Vec3::new(0.0, config.camera.look_height, 0.0),
        );

        let [r, g, b] = config.scene.background;
        let egui_renderer = egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());

        Self {
            format,
            width,
            height,
            camera,
            background: wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: 1.0 },
            pipeline,
            camera_resources,
            item_layout,
            depth_view,
            white,
            ground,
            character,
            obstacles,
            interactable,
            model: None,
            egui_renderer,
        }
    }

    /// Attach a loaded model to the scene
    pub fn attach_model(&mut self, device: &wgpu::Device, model: &LoadedModel) {
        debug!(name = %model.name, cast_shadow = model.cast_shadow, receive_shadow = model.receive_shadow, "attaching model");
        self.model = Some(Drawable::new(
            device,
            &self.item_layout,
            &model.mesh,
            &self.white,
            model.transform(),
            true,
            "model",
        ));
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        self.camera.set_aspect(width, height);
        let (_, depth_view) = create_depth_texture(device, width, height);
        self.depth_view = depth_view;
    }

    /// Push this frame's character and camera into GPU buffers
    pub fn update(&mut self, queue: &wgpu::Queue, frame: &FrameOutput) {
        self.camera.look_at(frame.camera.position, frame.camera.look_at);
        let uniform = CameraUniform { view_proj: self.camera.view_proj().to_cols_array_2d() };
        queue.write_buffer(&self.camera_resources.camera_buffer, 0, bytemuck::bytes_of(&uniform));
        self.character.set_transform(queue, frame.character.transform());
    }

    pub fn draw_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface: &wgpu::Surface,
        ui: Option<UiFrame>,
    ) -> Result<(), wgpu::SurfaceError> {
        let frame = surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_pipeline(&self.pipeline);
            rp.set_bind_group(0, &self.camera_resources.camera_bind_group, &[]);

            let drawables = std::iter::once(&self.ground)
                .chain(std::iter::once(&self.character))
                .chain(self.obstacles.iter())
                .chain(self.interactable.iter())
                .chain(self.model.iter());
            for d in drawables {
                if d.mesh.index_count == 0 {
                    continue;
                }
                rp.set_bind_group(1, &d.bind_group, &[]);
                rp.set_vertex_buffer(0, d.mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(d.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                rp.draw_indexed(0..d.mesh.index_count, 0, 0..1);
            }
        }

        if let Some(ui) = ui {
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.width, self.height],
                pixels_per_point: ui.pixels_per_point,
            };

            for (id, image_delta) in &ui.textures_delta.set {
                self.egui_renderer.update_texture(device, queue, *id, image_delta);
            }
            self.egui_renderer
                .update_buffers(device, queue, &mut encoder, &ui.primitives, &screen_descriptor);

            {
                let egui_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_render_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                self.egui_renderer
                    .render(&mut egui_pass.forget_lifetime(), &ui.primitives, &screen_descriptor);
            }

            for id in &ui.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
