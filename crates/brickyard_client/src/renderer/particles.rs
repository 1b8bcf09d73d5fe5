use std::mem;

use brickyard_shared::coords::BLOCK_SCALE;
use brickyard_shared::edit::ParticleEmitter;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

const MAX_PARTICLES: usize = 4096;
const BURST_PARTICLES: usize = 20;
const BURST_SPEED: f32 = 1.8;
const GRAVITY: f32 = 0.8;
const SHRINK_PER_SECOND: f32 = 0.05;
const MIN_SIZE: f32 = 0.01;
const PARTICLE_COLOR: [f32; 3] = [0.35, 0.35, 0.35];

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seconds left to live.
    pub lifetime: f32,
    pub size: f32,
}

impl Particle {
    fn step(&mut self, dt: f32) {
        self.velocity.y -= GRAVITY * dt;
        self.position += self.velocity * dt;
        self.lifetime -= dt;
        self.size = (self.size - SHRINK_PER_SECOND * dt).max(MIN_SIZE);
    }

    fn is_expired(&self) -> bool {
        self.lifetime <= 0.0 || self.size <= MIN_SIZE
    }
}

/// CPU side of block-break debris.
#[derive(Debug)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    rng_state: u64,
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::with_seed(0xA4B3_C2D1_E0F9_8765)
    }
}

impl ParticleSystem {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            rng_state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn update(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        if dt == 0.0 {
            return;
        }
        self.particles.retain_mut(|particle| {
            particle.step(dt);
            !particle.is_expired()
        });
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    fn next_rand_u32(&mut self) -> u32 {
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        ((x.wrapping_mul(0x2545_F491_4F6C_DD1D)) >> 32) as u32
    }

    fn rand_f32(&mut self) -> f32 {
        self.next_rand_u32() as f32 / u32::MAX as f32
    }

    fn rand_range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.rand_f32()
    }

    fn push_particle(&mut self, particle: Particle) {
        if self.particles.len() >= MAX_PARTICLES {
            self.particles.swap_remove(0);
        }
        self.particles.push(particle);
    }
}

impl ParticleEmitter for ParticleSystem {
    /// Sprays upward-biased debris from anywhere inside the voxel centred on
    /// `origin`.
    fn emit_burst(&mut self, origin: Vec3) {
        let half = BLOCK_SCALE * 0.5;
        for _ in 0..BURST_PARTICLES {
            let offset = Vec3::new(
                self.rand_range(-half, half),
                self.rand_range(-half, half),
                self.rand_range(-half, half),
            );
            let direction = Vec3::new(
                self.rand_range(-0.5, 0.5),
                self.rand_range(0.5, 1.0),
                self.rand_range(-0.5, 0.5),
            )
            .normalize_or(Vec3::Y);
            let size = BLOCK_SCALE / 10.0 + self.rand_f32();
            let lifetime = self.rand_range(8.5, 9.5);

            self.push_particle(Particle {
                position: origin + offset,
                velocity: direction * BURST_SPEED,
                lifetime,
                size,
            });
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ParticleVertex {
    quad_pos: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ParticleInstance {
    position: [f32; 3],
    size: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ParticleParams {
    camera_right: [f32; 4],
    camera_up: [f32; 4],
    color: [f32; 4],
}

impl ParticleParams {
    fn new(camera_right: Vec3, camera_up: Vec3) -> Self {
        Self {
            camera_right: camera_right.extend(0.0).to_array(),
            camera_up: camera_up.extend(0.0).to_array(),
            color: [PARTICLE_COLOR[0], PARTICLE_COLOR[1], PARTICLE_COLOR[2], 1.0],
        }
    }
}

/// Draws a [`ParticleSystem`] as camera-facing instanced quads.
pub struct ParticleRenderer {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    params_buffer: wgpu::Buffer,
    instances: Vec<ParticleInstance>,
    instance_count: u32,
}

impl ParticleRenderer {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/../../assets/shaders/particles.wgsl"
                ))
                .into(),
            ),
        });

        let particle_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Particle Params Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[camera_bind_group_layout, &particle_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: mem::size_of::<ParticleVertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x2,
                        }],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: mem::size_of::<ParticleInstance>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &[
                            wgpu::VertexAttribute {
                                offset: 0,
                                shader_location: 1,
                                format: wgpu::VertexFormat::Float32x3,
                            },
                            wgpu::VertexAttribute {
                                offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                                shader_location: 2,
                                format: wgpu::VertexFormat::Float32,
                            },
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let quad_vertices = [
            ParticleVertex {
                quad_pos: [-0.5, -0.5],
            },
            ParticleVertex {
                quad_pos: [0.5, -0.5],
            },
            ParticleVertex {
                quad_pos: [-0.5, 0.5],
            },
            ParticleVertex {
                quad_pos: [0.5, 0.5],
            },
        ];
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Vertex Buffer"),
            contents: bytemuck::cast_slice(&quad_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Instance Buffer"),
            size: (MAX_PARTICLES * mem::size_of::<ParticleInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params = ParticleParams::new(Vec3::X, Vec3::Y);
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Params Buffer"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Params Bind Group"),
            layout: &particle_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            vertex_buffer,
            instance_buffer,
            bind_group,
            params_buffer,
            instances: Vec::with_capacity(MAX_PARTICLES),
            instance_count: 0,
        }
    }

    /// Copies the live particles and billboard axes to the GPU.
    pub fn prepare(
        &mut self,
        queue: &wgpu::Queue,
        system: &ParticleSystem,
        camera_right: Vec3,
        camera_up: Vec3,
    ) {
        let params = ParticleParams::new(camera_right, camera_up);
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        self.instances.clear();
        self.instances
            .extend(system.particles().iter().take(MAX_PARTICLES).map(|particle| {
                ParticleInstance {
                    position: particle.position.to_array(),
                    size: particle.size,
                }
            }));
        if !self.instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&self.instances));
        }
        self.instance_count = self.instances.len() as u32;
    }

    pub fn render(&self, render_pass: &mut wgpu::RenderPass<'_>, camera_bind_group: &wgpu::BindGroup) {
        if self.instance_count == 0 {
            return;
        }

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, camera_bind_group, &[]);
        render_pass.set_bind_group(1, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.draw(0..4, 0..self.instance_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_spawns_debris_inside_the_voxel_moving_up() {
        let mut system = ParticleSystem::default();
        let origin = Vec3::new(85.0, 75.0, 85.0);
        system.emit_burst(origin);

        assert_eq!(system.len(), BURST_PARTICLES);
        for particle in system.particles() {
            assert!((particle.position - origin).abs().max_element() <= BLOCK_SCALE * 0.5);
            assert!(particle.velocity.y > 0.0);
            assert!((particle.velocity.length() - BURST_SPEED).abs() < 1e-4);
            assert!((8.5..=9.5).contains(&particle.lifetime));
            assert!((1.0..=2.0).contains(&particle.size));
        }
    }

    #[test]
    fn gravity_pulls_particles_down_over_time() {
        let mut system = ParticleSystem::default();
        system.emit_burst(Vec3::ZERO);
        let start: Vec<f32> = system.particles().iter().map(|p| p.velocity.y).collect();

        system.update(1.0);
        for (particle, before) in system.particles().iter().zip(start) {
            assert!((particle.velocity.y - (before - GRAVITY)).abs() < 1e-5);
        }
    }

    #[test]
    fn particles_expire_after_their_lifetime() {
        let mut system = ParticleSystem::with_seed(7);
        system.emit_burst(Vec3::ZERO);
        system.update(8.0);
        assert_eq!(system.len(), BURST_PARTICLES);
        for _ in 0..20 {
            system.update(0.1);
        }
        assert_eq!(system.len(), 0);
    }

    #[test]
    fn shrunk_particles_expire_early() {
        let mut particle = Particle {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            lifetime: 100.0,
            size: 0.02,
        };
        particle.step(1.0);
        assert_eq!(particle.size, MIN_SIZE);
        assert!(particle.is_expired());
    }

    #[test]
    fn bursts_are_capped() {
        let mut system = ParticleSystem::default();
        for _ in 0..(MAX_PARTICLES / BURST_PARTICLES + 5) {
            system.emit_burst(Vec3::ZERO);
        }
        assert_eq!(system.len(), MAX_PARTICLES);
    }
}
