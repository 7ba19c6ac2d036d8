use cgmath::{Matrix4, SquareMatrix, Vector3};
use wgpu::Device;

use crate::{
    config::ViewerConfig,
    gfx::{
        camera::camera_utils::CameraManager,
        loader::LoadedModel,
        resources::{
            global_bindings::LightConfig,
            material::{Material, MaterialManager, TextureSource},
        },
    },
};

use super::node::{Mesh, SceneNode};

/// Main scene: node tree, materials, lighting rig, and camera
pub struct Scene {
    pub camera_manager: CameraManager,
    pub root: SceneNode,
    pub material_manager: MaterialManager,
    pub light: LightConfig,
}

impl Scene {
    /// Creates an empty scene with the given camera manager
    pub fn new(camera_manager: CameraManager) -> Self {
        Self {
            camera_manager,
            root: SceneNode::new("root"),
            material_manager: MaterialManager::new(),
            light: LightConfig::default(),
        }
    }

    /// Adds the axes debug helper: three colored bars along +X/+Y/+Z
    pub fn add_axes_helper(&mut self, length: f32) {
        let girth = length / 200.0;

        let axes = [
            ("axis_x", [1.0, 0.2, 0.2, 1.0], Vector3::new(length, girth, girth)),
            ("axis_y", [0.2, 1.0, 0.2, 1.0], Vector3::new(girth, length, girth)),
            ("axis_z", [0.2, 0.2, 1.0, 1.0], Vector3::new(girth, girth, length)),
        ];

        let mut helper = SceneNode::new("axes");
        for (name, color, extent) in axes {
            self.material_manager
                .add_material(Material::new(name, color));
            let bar = SceneNode::new(name)
                .with_meshes(vec![Mesh::cuboid(Vector3::new(0.0, 0.0, 0.0), extent)])
                .with_material(name);
            helper.add_child(bar);
        }
        self.root.add_child(helper);
    }

    /// Sets the ambient + directional lighting rig
    pub fn set_lighting(&mut self, light: LightConfig) {
        self.light = light;
    }

    /// Completion handler for an asynchronous model load
    ///
    /// Installs the loaded subtree (shared textured material on every mesh
    /// node, configured scale/position, shadow-casting) plus a ground plane
    /// sized from the current surface dimensions with a tiled,
    /// shadow-receiving material, then signals exactly one immediate redraw
    /// so the model appears without waiting for the next loop tick.
    pub fn install_model(
        &mut self,
        model: LoadedModel,
        config: &ViewerConfig,
        surface_size: (u32, u32),
        mut request_redraw: impl FnMut(),
    ) {
        let mut model_root = SceneNode::new(&config.model_node_name);
        model_root.set_translation_scale(config.model_position, config.model_scale);

        for (i, mesh) in model.meshes.into_iter().enumerate() {
            // One material per mesh node: a pick tints exactly one node
            let material_name = format!("{}_mesh_{}", config.model_node_name, i);
            let material = Material::new(&material_name, [1.0, 1.0, 1.0, 1.0])
                .with_texture(TextureSource::new(model.texture.clone()));
            self.material_manager.add_material(material);

            let mut child = SceneNode::new(&format!("{}_{}", config.model_node_name, i))
                .with_meshes(vec![mesh])
                .with_material(&material_name);
            child.casts_shadow = true;
            model_root.add_child(child);
        }
        self.root.add_child(model_root);

        // Ground plane sized from the viewport, tiled and shadow-receiving
        let floor_material = Material::new("floor", [1.0, 1.0, 1.0, 1.0])
            .with_texture(TextureSource::tiled(model.texture.clone()))
            .with_tiling(config.floor_tiling, config.floor_tiling);
        self.material_manager.add_material(floor_material);

        let mut floor = SceneNode::new("floor")
            .with_meshes(vec![Mesh::plane(
                surface_size.0 as f32,
                surface_size.1 as f32,
            )])
            .with_material("floor");
        floor.receives_shadow = true;
        self.root.add_child(floor);

        self.root
            .update_world_transforms(Matrix4::identity(), None);

        request_redraw();
    }

    /// Updates per-frame scene state (camera matrices)
    pub fn update(&mut self) {
        self.camera_manager.camera.update_view_proj();
    }

    /// Recomputes world transforms and syncs them to the GPU
    pub fn update_all_transforms(&mut self, queue: &wgpu::Queue) {
        self.root
            .update_world_transforms(Matrix4::identity(), Some(queue));
    }

    /// Initializes GPU resources for all nodes and materials
    ///
    /// Must be called after the GPU context is available and before
    /// rendering; safe to call again after nodes or materials are added.
    pub fn init_gpu_resources(&mut self, device: &Device, queue: &wgpu::Queue) {
        self.root
            .update_world_transforms(Matrix4::identity(), None);
        self.root.init_gpu_resources(device);
        self.material_manager.update_all_gpu_resources(device, queue);
    }

    /// Syncs material changes (a pick tint, say) to the GPU
    pub fn update_materials(&mut self, device: &Device, queue: &wgpu::Queue) {
        self.material_manager.update_all_gpu_resources(device, queue);
    }

    /// Flattens the tree into the drawable nodes (visible, with meshes)
    pub fn drawable_nodes(&self) -> Vec<&SceneNode> {
        self.root
            .collect_descendants()
            .into_iter()
            .map(|(_, node)| node)
            .filter(|node| node.visible && !node.meshes.is_empty())
            .collect()
    }

    /// Total node count, excluding the root
    pub fn node_count(&self) -> usize {
        self.root.collect_descendants().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::{CameraController, CameraManager, OrbitCamera};
    use cgmath::Rad;
    use std::sync::Arc;

    fn test_scene() -> Scene {
        let camera = OrbitCamera::new(
            400.0,
            0.25,
            0.0,
            Vector3::new(0.0, 0.0, 0.0),
            1.0,
            Rad(1.0),
            1.0,
            1100.0,
        );
        let controller = CameraController::new(0.005, 0.1);
        Scene::new(CameraManager::new(camera, controller))
    }

    fn test_model(mesh_count: usize) -> LoadedModel {
        let meshes = (0..mesh_count)
            .map(|_| {
                Mesh::cuboid(
                    Vector3::new(-1.0, -1.0, -1.0),
                    Vector3::new(1.0, 1.0, 1.0),
                )
            })
            .collect();
        LoadedModel {
            meshes,
            texture: Arc::new(image::DynamicImage::new_rgba8(1, 1)),
        }
    }

    #[test]
    fn install_model_inserts_one_subtree_and_one_floor() {
        let mut scene = test_scene();
        let config = ViewerConfig::default();
        let before = scene.root.children.len();

        let mut redraws = 0;
        scene.install_model(test_model(2), &config, (800, 600), || redraws += 1);

        assert_eq!(scene.root.children.len(), before + 2);
        assert_eq!(redraws, 1, "exactly one immediate redraw");

        let model_root = scene
            .root
            .children
            .iter()
            .find(|n| n.name == config.model_node_name)
            .expect("model subtree installed");
        assert_eq!(model_root.children.len(), 2);
        assert!(model_root.children.iter().all(|n| n.casts_shadow));
        assert!(model_root
            .children
            .iter()
            .all(|n| n.material_id.is_some()));

        let floor = scene
            .root
            .children
            .iter()
            .find(|n| n.name == "floor")
            .expect("floor installed");
        assert!(floor.receives_shadow);
    }

    #[test]
    fn every_mesh_node_gets_its_own_textured_material() {
        let mut scene = test_scene();
        let config = ViewerConfig::default();
        scene.install_model(test_model(3), &config, (800, 600), || {});

        let model_root = scene
            .root
            .children
            .iter()
            .find(|n| n.name == config.model_node_name)
            .unwrap();

        let ids: Vec<_> = model_root
            .children
            .iter()
            .map(|n| n.material_id.clone().unwrap())
            .collect();
        // distinct materials, all carrying the shared texture
        for id in &ids {
            let material = scene.material_manager.get_material(id).unwrap();
            assert!(material.texture.is_some());
        }
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn floor_plane_matches_surface_dimensions() {
        let mut scene = test_scene();
        let config = ViewerConfig::default();
        scene.install_model(test_model(1), &config, (640, 480), || {});

        let floor = scene
            .root
            .children
            .iter()
            .find(|n| n.name == "floor")
            .unwrap();
        let max_x = floor.meshes[0]
            .vertices()
            .iter()
            .map(|v| v.position[0])
            .fold(f32::MIN, f32::max);
        assert_eq!(max_x, 320.0);
    }

    #[test]
    fn axes_helper_adds_three_bars() {
        let mut scene = test_scene();
        scene.add_axes_helper(200.0);
        let axes = scene
            .root
            .children
            .iter()
            .find(|n| n.name == "axes")
            .unwrap();
        assert_eq!(axes.children.len(), 3);
    }
}
