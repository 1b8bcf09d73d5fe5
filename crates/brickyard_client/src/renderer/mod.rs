pub mod atlas;
pub mod chunk_renderer;
pub mod particles;
pub mod pipeline;

use std::path::Path;
use std::sync::Arc;

use brickyard_shared::block::BlockRegistry;
use brickyard_shared::world::World;
use bytemuck::{Pod, Zeroable};
use thiserror::Error;
use tracing::info;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::Camera;
use crate::renderer::atlas::{create_atlas_texture, prepare_atlas_image};
use crate::renderer::chunk_renderer::{ChunkPassStats, ChunkRenderer, MeshUploadStats};
use crate::renderer::particles::{ParticleRenderer, ParticleSystem};
use crate::renderer::pipeline::ChunkPipeline;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.4,
    g: 0.5,
    b: 0.6,
    a: 1.0,
};

#[derive(Debug, Error)]
pub enum RendererInitError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("failed to request adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("adapter does not support this surface")]
    UnsupportedSurface,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

struct DepthTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTexture {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Brickyard Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    depth_texture: DepthTexture,
    chunk_pipeline: ChunkPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    _atlas_texture: wgpu::Texture,
    atlas_bind_group: wgpu::BindGroup,
    chunk_renderer: ChunkRenderer,
    particle_renderer: ParticleRenderer,
}

impl Renderer {
    pub fn new(
        window: Arc<Window>,
        registry: &BlockRegistry,
        atlas_path: Option<&Path>,
    ) -> Result<Self, RendererInitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Brickyard Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))?;

        let initial_size = window.inner_size();
        let surface_config = surface
            .get_default_config(&adapter, initial_size.width.max(1), initial_size.height.max(1))
            .ok_or(RendererInitError::UnsupportedSurface)?;
        surface.configure(&device, &surface_config);

        let chunk_pipeline = ChunkPipeline::new(&device, surface_config.format, DEPTH_FORMAT);

        let atlas_image = prepare_atlas_image(atlas_path, registry);
        let (atlas_texture, atlas_view, atlas_sampler) =
            create_atlas_texture(&device, &queue, &atlas_image);
        let atlas_bind_group = create_texture_bind_group(
            &device,
            &chunk_pipeline.texture_bind_group_layout,
            &atlas_view,
            &atlas_sampler,
            "Block Atlas Bind Group",
        );

        let camera_uniform = CameraUniform {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
        };
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::bytes_of(&camera_uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &chunk_pipeline.camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let particle_renderer = ParticleRenderer::new(
            &device,
            surface_config.format,
            DEPTH_FORMAT,
            &chunk_pipeline.camera_bind_group_layout,
        );

        let depth_texture = DepthTexture::new(&device, surface_config.width, surface_config.height);

        info!(
            "Renderer ready: {} ({:?}), surface {:?} {}x{}",
            adapter.get_info().name,
            adapter.get_info().backend,
            surface_config.format,
            surface_config.width,
            surface_config.height
        );

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            depth_texture,
            chunk_pipeline,
            camera_buffer,
            camera_bind_group,
            _atlas_texture: atlas_texture,
            atlas_bind_group,
            chunk_renderer: ChunkRenderer::default(),
            particle_renderer,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_texture = DepthTexture::new(&self.device, width, height);
    }

    pub fn update_camera(&self, camera: &Camera) {
        let uniform = CameraUniform {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn sync_world(&mut self, world: &World) -> MeshUploadStats {
        self.chunk_renderer.sync(&self.device, &self.queue, world)
    }

    pub fn prepare_particles(&mut self, particles: &ParticleSystem, camera: &Camera) {
        let basis = camera.basis();
        self.particle_renderer
            .prepare(&self.queue, particles, basis.right, basis.up);
    }

    pub fn render_frame(&mut self) -> Result<ChunkPassStats, wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Brickyard Command Encoder"),
            });

        let stats = {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Brickyard World Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(self.chunk_pipeline.pipeline());
            let stats = self.chunk_renderer.render(
                &mut render_pass,
                &self.camera_bind_group,
                &self.atlas_bind_group,
            );
            self.particle_renderer
                .render(&mut render_pass, &self.camera_bind_group);
            stats
        };

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(stats)
    }

    pub fn chunk_buffer_count(&self) -> usize {
        self.chunk_renderer.len()
    }

    /// Destroys every chunk vertex buffer; called before the world is torn down.
    pub fn release_chunks(&mut self) {
        self.chunk_renderer.release_all();
    }
}

fn create_texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    label: &'static str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(texture_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
