use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use brickyard_shared::block::{register_default_blocks, BlockRegistry};
use brickyard_shared::edit::EditController;
use brickyard_shared::world::World;
use glam::Vec2;
use tracing::{debug, error, info, trace};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::camera::Camera;
use crate::input::InputState;
use crate::renderer::particles::ParticleSystem;
use crate::renderer::Renderer;
use crate::settings::{load_or_create_config, AppConfig, DEFAULT_CONFIG_PATH};

const WINDOW_TITLE: &str = "Brickyard";
const MAX_FRAME_DT: f32 = 0.05;

const CONTROLS: &str = "WASD move, Space/LShift up/down, middle-drag look, \
     left click break, right click place, T cycle block";

struct ClientApp {
    config: AppConfig,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    registry: BlockRegistry,
    world: World,
    camera: Camera,
    input: InputState,
    edit: EditController,
    particles: ParticleSystem,
    last_frame: Option<Instant>,
}

impl ClientApp {
    fn new(config: AppConfig) -> Self {
        let registry = register_default_blocks();
        let mut world = World::from_config(&config.world);
        world.generate(&registry);

        let camera = Camera {
            position: config.client.spawn_position(),
            pitch: config.client.spawn_pitch.to_radians(),
            yaw: config.client.spawn_yaw.to_radians(),
            fov: config.client.fov.to_radians(),
            aspect: config.client.window_width as f32 / config.client.window_height as f32,
            ..Camera::default()
        };

        Self {
            edit: EditController::new(config.edit.clone()),
            config,
            window: None,
            renderer: None,
            registry,
            world,
            camera,
            input: InputState::default(),
            particles: ParticleSystem::default(),
            last_frame: None,
        }
    }

    fn update_and_render(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.as_ref().cloned() else {
            return;
        };
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.camera.aspect = size.width as f32 / size.height as f32;

        let now = Instant::now();
        let dt = self
            .last_frame
            .map(|last| (now - last).as_secs_f32())
            .unwrap_or(1.0 / 60.0)
            .min(MAX_FRAME_DT);
        self.last_frame = Some(now);

        self.camera
            .update_look(&self.input, self.config.client.look_sensitivity);
        self.camera
            .update_movement(&self.input, self.config.client.move_speed, dt);

        let viewport = Vec2::new(size.width as f32, size.height as f32);
        let selected_before = self.edit.placing_block();
        let outcome = self.edit.update(
            now,
            &mut self.world,
            &self.registry,
            &self.camera.basis(),
            &self.input.edit_input(viewport),
            &mut self.particles,
        );
        if self.edit.placing_block() != selected_before {
            info!("Placing block: {}", self.edit.placing_block());
        }
        if let Some(outcome) = outcome {
            debug!(
                "Edit applied: broken {:?}, placed {:?}",
                outcome.broken, outcome.placed
            );
        }

        self.particles.update(dt);

        let Some(renderer) = self.renderer.as_mut() else {
            self.input.clear_frame();
            return;
        };
        renderer.update_camera(&self.camera);
        let uploads = renderer.sync_world(&self.world);
        if uploads.uploaded_chunks > 0 {
            debug!(
                "Uploaded {} chunk meshes ({} bytes, {} reallocations), {} resident",
                uploads.uploaded_chunks,
                uploads.uploaded_bytes,
                uploads.buffer_reallocations,
                renderer.chunk_buffer_count()
            );
        }
        renderer.prepare_particles(&self.particles, &self.camera);

        match renderer.render_frame() {
            Ok(pass) => {
                trace!(
                    "Drew {} chunks, {} vertices",
                    pass.draw_calls,
                    pass.rendered_vertices
                );
            }
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                renderer.resize(size.width, size.height);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("Out of GPU memory; shutting down");
                event_loop.exit();
            }
            Err(_) => {}
        }

        self.input.clear_frame();
    }

    fn shutdown(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.release_chunks();
        }
        self.world.clear();
        self.particles.clear();
    }
}

impl ApplicationHandler for ClientApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(
                self.config.client.window_width,
                self.config.client.window_height,
            ));
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                let atlas_path = self.config.client.atlas_path.as_deref();
                match Renderer::new(window.clone(), &self.registry, atlas_path) {
                    Ok(renderer) => {
                        let size = window.inner_size();
                        if size.width > 0 && size.height > 0 {
                            self.camera.aspect = size.width as f32 / size.height as f32;
                        }
                        renderer.update_camera(&self.camera);

                        info!("Window and renderer initialized");
                        info!("Controls: {CONTROLS}");
                        self.window = Some(window);
                        self.renderer = Some(renderer);
                    }
                    Err(err) => {
                        error!("Failed to initialize renderer: {err}");
                        event_loop.exit();
                    }
                }
            }
            Err(err) => {
                error!("Failed to create window: {err}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window.as_ref().map(|window| window.id()) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested; shutting down");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .set_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => self.input.press_key(code),
                    ElementState::Released => self.input.release_key(code),
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.input
                    .set_button(button, state == ElementState::Pressed);
            }
            WindowEvent::Focused(false) => {
                self.input = InputState::default();
            }
            WindowEvent::Resized(size) => {
                info!("Window resized to {}x{}", size.width, size.height);
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
                if size.width > 0 && size.height > 0 {
                    self.camera.aspect = size.width as f32 / size.height as f32;
                }
            }
            WindowEvent::RedrawRequested => self.update_and_render(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn run() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let path = config_path();
    let config = load_or_create_config(&path);
    info!("Loaded config from {}", path.display());

    let event_loop = match EventLoop::new() {
        Ok(loop_handle) => loop_handle,
        Err(err) => {
            eprintln!("Failed to create event loop: {err}");
            return;
        }
    };

    let mut app = ClientApp::new(config);
    if let Err(err) = event_loop.run_app(&mut app) {
        eprintln!("Event loop exited with error: {err}");
    }
}
