//! Material system for the viewer
//!
//! Provides material definitions and centralized management with GPU resource
//! handling. Materials are stored in MaterialManager and scene nodes reference
//! them by ID. A material carries a base color, an optional texture map, and a
//! UV tiling factor; untextured materials bind a shared-layout white pixel so
//! one bind group layout covers everything.

use std::collections::HashMap;
use std::sync::Arc;
use wgpu::Device;

use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

use super::texture_resource::TextureResource;

/// Material ID for referencing materials
pub type MaterialId = String;

/// GPU uniform data for materials
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    pub tiling: [f32; 2],
    _padding: [f32; 2],
}

type MaterialUBO = UniformBuffer<MaterialUniform>;

/// A decoded texture image plus its sampler addressing behavior
///
/// Kept CPU-side until `update_gpu_resources` uploads it; the image is shared
/// (`Arc`) because the loader hands one decoded texture to every mesh node's
/// material.
#[derive(Clone)]
pub struct TextureSource {
    pub image: Arc<image::DynamicImage>,
    pub address_mode: wgpu::AddressMode,
}

impl TextureSource {
    pub fn new(image: Arc<image::DynamicImage>) -> Self {
        Self {
            image,
            address_mode: wgpu::AddressMode::ClampToEdge,
        }
    }

    /// Repeat-wrapped variant for tiled surfaces (the floor plane)
    pub fn tiled(image: Arc<image::DynamicImage>) -> Self {
        Self {
            image,
            address_mode: wgpu::AddressMode::Repeat,
        }
    }
}

/// Material bind group management
pub struct MaterialBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: Option<wgpu::BindGroup>,
}

impl MaterialBindings {
    pub fn new(device: &Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Material Bind Group Layout");

        MaterialBindings {
            bind_group_layout,
            bind_group: None,
        }
    }

    pub fn create_bind_group(
        &mut self,
        device: &Device,
        ubo: &MaterialUBO,
        texture: &TextureResource,
    ) {
        self.bind_group = Some(
            BindGroupBuilder::new(&self.bind_group_layout)
                .resource(ubo.binding_resource())
                .texture(&texture.view)
                .sampler(&texture.sampler)
                .create(device, "Material Bind Group"),
        );
    }

    pub fn bind_group_layouts(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_groups(&self) -> &wgpu::BindGroup {
        self.bind_group
            .as_ref()
            .expect("Bind group has not been created yet!")
    }
}

/// Material definition with color, texture map, and tiling
///
/// CPU-side properties live here; GPU resources are created lazily by
/// `update_gpu_resources` once a device is available. Mutating a property
/// (a pick tinting `base_color`, say) requires another `update_gpu_resources`
/// call to sync the change.
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub tiling: [f32; 2],
    pub texture: Option<TextureSource>,

    material_ubo: Option<MaterialUBO>,
    material_bindings: Option<MaterialBindings>,
    texture_resource: Option<TextureResource>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            tiling: [1.0, 1.0],
            texture: None,
            material_ubo: None,
            material_bindings: None,
            texture_resource: None,
        }
    }
}

impl Material {
    /// Creates a new material with a base color
    pub fn new(name: &str, base_color: [f32; 4]) -> Self {
        Self {
            name: name.to_string(),
            base_color,
            ..Default::default()
        }
    }

    /// Builder pattern: set the texture map
    pub fn with_texture(mut self, texture: TextureSource) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Builder pattern: set UV tiling (repeats per surface)
    pub fn with_tiling(mut self, u: f32, v: f32) -> Self {
        self.tiling = [u, v];
        self
    }

    /// Builder pattern: set base color from RGB values
    pub fn with_color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.base_color = [r, g, b, self.base_color[3]];
        self
    }

    /// Tints the base color, discarding the previous color
    ///
    /// Used by the pick handler; the mutation is permanent, not a selection
    /// overlay.
    pub fn set_tint(&mut self, r: f32, g: f32, b: f32) {
        self.base_color = [r, g, b, self.base_color[3]];
    }

    /// Updates GPU resources for this material
    ///
    /// Must be called after material properties change to sync with GPU.
    pub fn update_gpu_resources(&mut self, device: &Device, queue: &wgpu::Queue) {
        if self.material_ubo.is_none() {
            self.material_ubo = Some(MaterialUBO::new(device));
        }

        if self.texture_resource.is_none() {
            self.texture_resource = Some(match &self.texture {
                Some(source) => TextureResource::create_from_image(
                    device,
                    queue,
                    &source.image,
                    &self.name,
                    source.address_mode,
                ),
                None => TextureResource::create_white_pixel(device, queue),
            });
        }

        if self.material_bindings.is_none() {
            let mut bindings = MaterialBindings::new(device);
            bindings.create_bind_group(
                device,
                self.material_ubo.as_ref().unwrap(),
                self.texture_resource.as_ref().unwrap(),
            );
            self.material_bindings = Some(bindings);
        }

        let uniform_data = MaterialUniform {
            base_color: self.base_color,
            tiling: self.tiling,
            _padding: [0.0; 2],
        };

        if let Some(ubo) = &mut self.material_ubo {
            ubo.update_content(queue, uniform_data);
        }
    }

    /// Gets the bind group for rendering
    pub fn get_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.material_bindings.as_ref().map(|b| b.bind_groups())
    }

    /// Gets the bind group layout for pipeline creation
    pub fn get_bind_group_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.material_bindings
            .as_ref()
            .map(|b| b.bind_group_layouts())
    }
}

/// Manages all materials in the viewer
///
/// Centralized storage for all materials. Scene nodes reference materials by
/// ID rather than storing material data directly.
pub struct MaterialManager {
    materials: HashMap<MaterialId, Material>,
    default_material_id: MaterialId,
}

impl MaterialManager {
    /// Creates a new material manager with a default material
    pub fn new() -> Self {
        let mut manager = Self {
            materials: HashMap::new(),
            default_material_id: "default".to_string(),
        };

        manager
            .materials
            .insert("default".to_string(), Material::default());

        manager
    }

    /// Adds a material, keyed by its name
    pub fn add_material(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    /// Gets a material by ID
    pub fn get_material(&self, id: &str) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Gets a mutable material by ID
    pub fn get_material_mut(&mut self, id: &str) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Gets the default material
    pub fn get_default_material(&self) -> &Material {
        self.materials.get(&self.default_material_id).unwrap()
    }

    /// Gets material for a node with fallback to default
    ///
    /// Handles nodes with no material assigned or a dangling material id.
    pub fn get_material_for_node(&self, material_id: Option<&MaterialId>) -> &Material {
        match material_id {
            Some(id) => self
                .get_material(id)
                .unwrap_or_else(|| self.get_default_material()),
            None => self.get_default_material(),
        }
    }

    /// Lists all material IDs
    pub fn list_materials(&self) -> Vec<&MaterialId> {
        self.materials.keys().collect()
    }

    /// Updates GPU resources for all materials
    ///
    /// Should be called when the GPU context becomes available or after
    /// materials have been modified.
    pub fn update_all_gpu_resources(&mut self, device: &Device, queue: &wgpu::Queue) {
        for material in self.materials.values_mut() {
            material.update_gpu_resources(device, queue);
        }
    }
}

impl Default for MaterialManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_falls_back_to_default_material() {
        let manager = MaterialManager::new();
        let missing = "no_such_material".to_string();
        assert_eq!(
            manager.get_material_for_node(Some(&missing)).name,
            "Default"
        );
        assert_eq!(manager.get_material_for_node(None).name, "Default");
    }

    #[test]
    fn tint_replaces_color_but_keeps_alpha() {
        let mut material = Material::new("m", [0.2, 0.4, 0.6, 0.5]);
        material.set_tint(1.0, 0.0, 0.0);
        assert_eq!(material.base_color, [1.0, 0.0, 0.0, 0.5]);
    }
}
