//! Global uniform bindings for camera and lighting
//!
//! Manages the GPU uniform buffer and bind group for per-frame global state
//! shared by every scene node: camera matrices plus the ambient + directional
//! lighting rig, including the light's view-projection matrix for shadow
//! mapping.

use crate::{
    gfx::camera::{camera_utils::CameraUniform, orbit_camera::OPENGL_TO_WGPU_MATRIX},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Global uniform buffer content structure
///
/// MUST match the Globals struct in the shaders exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct GlobalUBOContent {
    // Camera data (matches CameraUniform)
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],

    // Lighting rig
    light_direction: [f32; 3],
    _padding1: f32,
    light_color: [f32; 3],
    light_intensity: f32,
    ambient_color: [f32; 3],
    _padding2: f32,
    light_view_proj: [[f32; 4]; 4],
}

unsafe impl bytemuck::Pod for GlobalUBOContent {}
unsafe impl bytemuck::Zeroable for GlobalUBOContent {}

/// Ambient + directional light configuration
///
/// The directional light sits at `position` looking at the origin; its
/// direction and shadow matrix are derived from that placement.
#[derive(Copy, Clone, Debug)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    pub ambient: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [100.0, 100.0, 1.0],
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            ambient: [0.25, 0.25, 0.25],
        }
    }
}

/// Type alias for the global uniform buffer
pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;

/// Updates the global uniform buffer with camera and light data
///
/// Called each frame before rendering so camera motion and light changes are
/// visible to both the shadow pass and the main pass.
pub fn update_global_ubo(
    ubo: &mut GlobalUBO,
    queue: &wgpu::Queue,
    camera: CameraUniform,
    light: LightConfig,
) {
    use cgmath::InnerSpace;

    let light_pos = cgmath::Point3::new(light.position[0], light.position[1], light.position[2]);
    let light_view = cgmath::Matrix4::look_at_rh(
        light_pos,
        cgmath::Point3::new(0.0, 0.0, 0.0),
        cgmath::Vector3::unit_y(),
    );

    // Ortho bounds sized to cover the model and its floor plane
    let light_proj = cgmath::ortho(-600.0, 600.0, -600.0, 600.0, 1.0, 500.0);
    let light_view_proj = OPENGL_TO_WGPU_MATRIX * light_proj * light_view;

    let direction = (cgmath::Vector3::new(0.0, 0.0, 0.0)
        - cgmath::Vector3::new(light.position[0], light.position[1], light.position[2]))
    .normalize();

    let content = GlobalUBOContent {
        view_position: camera.view_position,
        view_proj: camera.view_proj,
        light_direction: direction.into(),
        _padding1: 0.0,
        light_color: light.color,
        light_intensity: light.intensity,
        ambient_color: light.ambient,
        _padding2: 0.0,
        light_view_proj: light_view_proj.into(),
    };

    ubo.update_content(queue, content);
}

/// Manages the bind group layout and bind group for global uniforms
///
/// Bound to slot 0 in both render pipelines.
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: Option<wgpu::BindGroup>,
}

impl GlobalBindings {
    /// Creates a new global bindings manager
    ///
    /// Sets up the layout; the bind group itself is created once the uniform
    /// buffer exists.
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group Layout");

        GlobalBindings {
            bind_group_layout,
            bind_group: None,
        }
    }

    /// Creates the bind group with the provided uniform buffer
    pub fn create_bind_group(&mut self, device: &wgpu::Device, ubo: &GlobalUBO) {
        self.bind_group = Some(
            BindGroupBuilder::new(&self.bind_group_layout)
                .resource(ubo.binding_resource())
                .create(device, "Global Bind Group"),
        );
    }

    /// Returns the bind group layout for pipeline creation
    pub fn bind_group_layouts(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    /// Returns the bind group for rendering
    ///
    /// # Panics
    /// Panics if `create_bind_group()` hasn't been called yet
    pub fn bind_groups(&self) -> &wgpu::BindGroup {
        self.bind_group
            .as_ref()
            .expect("Bind group has not been created yet!")
    }
}
