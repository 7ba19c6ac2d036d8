//! Application shell: window lifecycle, event routing, and the render loop
//!
//! Owns the winit event loop and drives the viewer through its lifecycle:
//! window creation, GPU setup, the asynchronous model load, the continuous
//! redraw loop, input routing to the orbit camera, and click picking.

use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

use crate::{
    config::ViewerConfig,
    gfx::{
        camera::{
            camera_controller::CameraController, camera_utils::CameraManager,
            orbit_camera::OrbitCamera,
        },
        loader::{self, ModelLoadHandle},
        picking,
        render_engine::RenderEngine,
        scene::Scene,
    },
};

/// The viewer application
///
/// Construct with a [`ViewerConfig`], then call [`run`](ViewerApp::run) to
/// enter the event loop. GPU resources are created once the window exists.
pub struct ViewerApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    scene: Scene,
    /// In-flight model load; dropping it detaches the worker
    model_load: Option<ModelLoadHandle>,
    cursor_position: (f32, f32),
    running: bool,
}

impl ViewerApp {
    /// Creates the viewer with its scene and camera set up from `config`
    pub fn new(config: ViewerConfig) -> Self {
        let event_loop = EventLoop::new().expect("Failed to create event loop");

        // Aspect is a placeholder until the window reports its real size
        let camera = OrbitCamera::new(
            config.camera_distance,
            config.camera_pitch,
            config.camera_yaw,
            cgmath::Vector3::new(0.0, 0.0, 0.0),
            1.0,
            config.fovy(),
            config.near_clip,
            config.far_clip,
        );
        let controller = CameraController::new(0.005, 0.1);
        let camera_manager = CameraManager::new(camera, controller);

        let mut scene = Scene::new(camera_manager);
        if config.axes_length > 0.0 {
            scene.add_axes_helper(config.axes_length);
        }

        Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                config,
                window: None,
                render_engine: None,
                scene,
                model_load: None,
                cursor_position: (0.0, 0.0),
                running: false,
            },
        }
    }

    /// Direct access to the scene before the loop starts (lighting, extra
    /// nodes)
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.app_state.scene
    }

    /// Runs the event loop; consumes self and blocks until exit
    pub fn run(mut self) {
        let event_loop = self.event_loop.take().expect("Event loop already consumed");
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop
            .run_app(&mut self.app_state)
            .expect("Failed to run event loop");
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Ok(window) = event_loop.create_window(
            WindowAttributes::default()
                .with_title("vantage")
                .with_inner_size(winit::dpi::LogicalSize::new(1200, 800)),
        ) {
            let window_handle = Arc::new(window);
            self.window = Some(window_handle.clone());

            let (width, height) = window_handle.inner_size().into();
            self.scene
                .camera_manager
                .camera
                .resize_projection(width, height);

            let window_clone = window_handle.clone();
            let renderer = pollster::block_on(async move {
                RenderEngine::new(window_clone, width, height).await
            });

            self.scene
                .init_gpu_resources(renderer.device(), renderer.queue());
            self.render_engine = Some(renderer);

            // Kick off the model load; the result is polled in about_to_wait
            self.model_load = Some(loader::load_model_async(
                self.config.model_path.clone(),
                self.config.texture_path.clone(),
            ));

            self.running = true;
            log::info!("viewer initialized at {}x{}", width, height);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        // Events before GPU setup completes are dropped
        let Some(render_engine) = self.render_engine.as_mut() else {
            log::debug!(
                "{}",
                crate::error::ViewerError::PreconditionViolation(
                    "window event before GPU initialization"
                )
            );
            return;
        };

        let Some(window) = self.window.as_ref() else {
            return;
        };

        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let winit::keyboard::PhysicalKey::Code(key_code) = event.physical_key {
                    if event.state == ElementState::Pressed {
                        log::info!("key pressed: {:?}", key_code);
                    }
                    if matches!(key_code, winit::keyboard::KeyCode::Escape) {
                        self.running = false;
                        self.model_load = None;
                        event_loop.exit();
                        return;
                    }
                }
                self.scene.camera_manager.process_keyboard_event(&event);
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                log::info!("surface resized to {}x{}", width, height);
                self.scene
                    .camera_manager
                    .camera
                    .resize_projection(width, height);
                render_engine.resize(width, height);
                window.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_position = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                let (width, height) = render_engine.get_surface_size();
                if let Some(path) = picking::pick_and_tint(
                    &mut self.scene,
                    self.cursor_position,
                    (width as f32, height as f32),
                    &self.config.model_node_name,
                    self.config.pick_tint,
                ) {
                    log::info!("picked node at path {:?}", path);
                    self.scene
                        .update_materials(render_engine.device(), render_engine.queue());
                    window.request_redraw();
                }
            }
            WindowEvent::CloseRequested => {
                self.running = false;
                // Dropping the handle detaches any load still in flight
                self.model_load = None;
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                self.scene.update();
                self.scene.update_all_transforms(render_engine.queue());
                render_engine.update(self.scene.camera_manager.camera.uniform, self.scene.light);
                render_engine.render_frame(&self.scene);
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        self.scene.camera_manager.process_event(&event, window);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Poll the model load; install on success, report and continue on
        // failure (the scene stays up either way)
        if let Some(handle) = &self.model_load {
            if let Some(result) = handle.try_recv() {
                self.model_load = None;
                match result {
                    Ok(model) => {
                        if let (Some(engine), Some(window)) =
                            (self.render_engine.as_ref(), self.window.as_ref())
                        {
                            let surface_size = engine.get_surface_size();
                            let redraw_window = window.clone();
                            self.scene.install_model(model, &self.config, surface_size, || {
                                redraw_window.request_redraw()
                            });
                            self.scene
                                .init_gpu_resources(engine.device(), engine.queue());
                            log::info!("model installed, {} nodes in scene", self.scene.node_count());
                        }
                    }
                    Err(e) => {
                        log::warn!("model load failed: {}", e);
                    }
                }
            }
        }

        // Continuous render loop
        if self.running {
            if let Some(ref window) = self.window {
                window.request_redraw();
            }
        }
    }
}
