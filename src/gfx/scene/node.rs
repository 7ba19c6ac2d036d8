//! Scene graph nodes and mesh data
//!
//! A [`SceneNode`] is one element of the scene tree: a name, a local
//! transform, zero or more meshes, an optional material reference, and
//! children. World transforms are the product of ancestor locals, recomputed
//! by [`SceneNode::update_world_transforms`] each frame.

use cgmath::{Matrix4, SquareMatrix, Vector3};
use std::ops::Range;
use wgpu::Device;

use crate::gfx::resources::material::MaterialId;

use super::vertex::Vertex3D;

/// Triangle mesh with lazily created GPU buffers
#[derive(Debug)]
pub struct Mesh {
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    index_count: u32,
}

impl Mesh {
    /// Builds a mesh from flat position/normal/texcoord arrays as produced by
    /// the OBJ loader (3 floats per position/normal, 2 per texcoord).
    ///
    /// Missing texcoords fall back to `[0, 0]`.
    pub fn new(
        positions: Vec<f32>,
        normals: Vec<f32>,
        texcoords: Vec<f32>,
        indices: Vec<u32>,
    ) -> Self {
        let index_count = indices.len() as u32;

        let vertex_count = positions.len() / 3;
        let mut vertices = Vec::with_capacity(vertex_count);
        for i in 0..vertex_count {
            let uv = if texcoords.len() >= (i + 1) * 2 {
                // OBJ texcoords are bottom-up; flip V for top-down sampling
                [texcoords[i * 2], 1.0 - texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            };
            vertices.push(Vertex3D {
                position: [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]],
                normal: [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]],
                uv,
            });
        }

        Self {
            vertices,
            indices,
            vertex_buffer: None,
            index_buffer: None,
            index_count,
        }
    }

    /// Flat plane in the XZ plane, centered at the origin, normal +Y
    ///
    /// UVs span [0, 1]; tiling comes from the material's tiling factor.
    pub fn plane(width: f32, depth: f32) -> Self {
        let hw = width / 2.0;
        let hd = depth / 2.0;
        let positions = vec![
            -hw, 0.0, -hd, //
            hw, 0.0, -hd, //
            hw, 0.0, hd, //
            -hw, 0.0, hd,
        ];
        let normals = vec![
            0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ];
        let texcoords = vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        // Both windings so the floor is visible from below as well
        let indices = vec![0, 2, 1, 0, 3, 2, 0, 1, 2, 0, 2, 3];
        Self::new(positions, normals, texcoords, indices)
    }

    /// Axis-aligned box between `min` and `max`
    pub fn cuboid(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        let (x0, y0, z0) = (min.x, min.y, min.z);
        let (x1, y1, z1) = (max.x, max.y, max.z);

        // 8 corners, normals averaged per-vertex; good enough for helper
        // geometry and pick volumes
        let positions = vec![
            x0, y0, z0, x1, y0, z0, x1, y1, z0, x0, y1, z0, //
            x0, y0, z1, x1, y0, z1, x1, y1, z1, x0, y1, z1,
        ];
        let indices: Vec<u32> = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 6, 2, 3, 7, 6, // top
            0, 7, 3, 0, 4, 7, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        let normals = Self::calculate_face_normals(&positions, &indices);
        Self::new(positions, normals, Vec::new(), indices)
    }

    /// Averaged face normals for meshes that ship without them
    pub fn calculate_face_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
        let vertex_count = positions.len() / 3;
        let mut normals = vec![0.0; positions.len()];
        let mut counts = vec![0u32; vertex_count];

        for triangle in indices.chunks(3) {
            let i0 = triangle[0] as usize;
            let i1 = triangle[1] as usize;
            let i2 = triangle[2] as usize;

            let v0 = [
                positions[i0 * 3],
                positions[i0 * 3 + 1],
                positions[i0 * 3 + 2],
            ];
            let v1 = [
                positions[i1 * 3],
                positions[i1 * 3 + 1],
                positions[i1 * 3 + 2],
            ];
            let v2 = [
                positions[i2 * 3],
                positions[i2 * 3 + 1],
                positions[i2 * 3 + 2],
            ];

            let edge1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
            let edge2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

            let face_normal = [
                edge1[1] * edge2[2] - edge1[2] * edge2[1],
                edge1[2] * edge2[0] - edge1[0] * edge2[2],
                edge1[0] * edge2[1] - edge1[1] * edge2[0],
            ];

            for &vertex_idx in &[i0, i1, i2] {
                normals[vertex_idx * 3] += face_normal[0];
                normals[vertex_idx * 3 + 1] += face_normal[1];
                normals[vertex_idx * 3 + 2] += face_normal[2];
                counts[vertex_idx] += 1;
            }
        }

        for i in 0..vertex_count {
            if counts[i] > 0 {
                let mut n = [
                    normals[i * 3] / counts[i] as f32,
                    normals[i * 3 + 1] / counts[i] as f32,
                    normals[i * 3 + 2] / counts[i] as f32,
                ];
                let length = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
                if length > 0.0 {
                    n = [n[0] / length, n[1] / length, n[2] / length];
                }
                normals[i * 3] = n[0];
                normals[i * 3 + 1] = n[1];
                normals[i * 3 + 2] = n[2];
            }
        }

        normals
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    fn init_gpu_resources(&mut self, device: &Device) {
        let vertex_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            },
        );

        let index_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&self.indices),
                usage: wgpu::BufferUsages::INDEX,
            },
        );

        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
    }
}

/// GPU resources for one node's world transform
pub struct NodeGpuResources {
    pub transform_buffer: wgpu::Buffer,
    pub transform_bind_group: wgpu::BindGroup,
}

/// One element of the scene tree
pub struct SceneNode {
    pub name: String,
    pub transform: Matrix4<f32>,
    pub meshes: Vec<Mesh>,
    pub material_id: Option<MaterialId>,
    pub casts_shadow: bool,
    pub receives_shadow: bool,
    pub visible: bool,
    pub children: Vec<SceneNode>,
    /// Product of ancestor local transforms; refreshed by
    /// `update_world_transforms` before rendering and used by picking.
    pub world_transform: Matrix4<f32>,
    pub gpu_resources: Option<NodeGpuResources>,
}

impl SceneNode {
    /// Creates an empty node with identity transform
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transform: Matrix4::identity(),
            meshes: Vec::new(),
            material_id: None,
            casts_shadow: false,
            receives_shadow: false,
            visible: true,
            children: Vec::new(),
            world_transform: Matrix4::identity(),
            gpu_resources: None,
        }
    }

    pub fn with_meshes(mut self, meshes: Vec<Mesh>) -> Self {
        self.meshes = meshes;
        self
    }

    pub fn with_material(mut self, material_id: &str) -> Self {
        self.material_id = Some(material_id.to_string());
        self
    }

    pub fn with_transform(mut self, transform: Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }

    /// Attaches a child, returning its index under this node
    pub fn add_child(&mut self, child: SceneNode) -> usize {
        self.children.push(child);
        self.children.len() - 1
    }

    /// Set translation, replacing the current transform
    pub fn set_translation(&mut self, translation: Vector3<f32>) {
        self.transform = Matrix4::from_translation(translation);
    }

    /// Translation combined with uniform scale (T * S)
    pub fn set_translation_scale(&mut self, translation: Vector3<f32>, scale: f32) {
        self.transform = Matrix4::from_translation(translation) * Matrix4::from_scale(scale);
    }

    /// Walks the subtree recomputing world transforms and syncing any GPU
    /// transform buffers
    pub fn update_world_transforms(&mut self, parent: Matrix4<f32>, queue: Option<&wgpu::Queue>) {
        self.world_transform = parent * self.transform;

        if let (Some(gpu), Some(queue)) = (&self.gpu_resources, queue) {
            let data: &[f32; 16] = self.world_transform.as_ref();
            queue.write_buffer(&gpu.transform_buffer, 0, bytemuck::cast_slice(data));
        }

        let world = self.world_transform;
        for child in &mut self.children {
            child.update_world_transforms(world, queue);
        }
    }

    /// Creates mesh buffers and the transform bind group for this subtree
    pub fn init_gpu_resources(&mut self, device: &Device) {
        if !self.meshes.is_empty() && self.gpu_resources.is_none() {
            for mesh in &mut self.meshes {
                mesh.init_gpu_resources(device);
            }

            let transform_data: &[f32; 16] = self.world_transform.as_ref();

            let transform_buffer = wgpu::util::DeviceExt::create_buffer_init(
                device,
                &wgpu::util::BufferInitDescriptor {
                    label: Some("Transform Uniform Buffer"),
                    contents: bytemuck::cast_slice(transform_data),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                },
            );

            let transform_bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Transform Bind Group Layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });

            let transform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Transform Bind Group"),
                layout: &transform_bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: transform_buffer.as_entire_binding(),
                }],
            });

            self.gpu_resources = Some(NodeGpuResources {
                transform_buffer,
                transform_bind_group,
            });
        }

        for child in &mut self.children {
            child.init_gpu_resources(device);
        }
    }

    /// Flattens every descendant (not only leaves) depth-first
    ///
    /// Each entry is the path of child indices from this node. Recomputed on
    /// every pick so results always reflect the latest tree.
    pub fn collect_descendants(&self) -> Vec<(Vec<usize>, &SceneNode)> {
        let mut out = Vec::new();
        for (i, child) in self.children.iter().enumerate() {
            collect_into(child, vec![i], &mut out);
        }
        out
    }

    /// Node lookup by child-index path; an empty path is this node
    pub fn node_at_path(&self, path: &[usize]) -> Option<&SceneNode> {
        let mut node = self;
        for &i in path {
            node = node.children.get(i)?;
        }
        Some(node)
    }

    /// Mutable node lookup by child-index path
    pub fn node_at_path_mut(&mut self, path: &[usize]) -> Option<&mut SceneNode> {
        let mut node = self;
        for &i in path {
            node = node.children.get_mut(i)?;
        }
        Some(node)
    }

    /// Get the transform bind group for rendering
    pub fn get_transform_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu_resources
            .as_ref()
            .map(|res| &res.transform_bind_group)
    }
}

fn collect_into<'a>(
    node: &'a SceneNode,
    path: Vec<usize>,
    out: &mut Vec<(Vec<usize>, &'a SceneNode)>,
) {
    out.push((path.clone(), node));
    for (i, child) in node.children.iter().enumerate() {
        let mut child_path = path.clone();
        child_path.push(i);
        collect_into(child, child_path, out);
    }
}

pub trait DrawNode<'a> {
    fn draw_mesh(&mut self, mesh: &'a Mesh);
    fn draw_mesh_instanced(&mut self, mesh: &'a Mesh, instances: Range<u32>);
    fn draw_node(&mut self, node: &'a SceneNode);
}

impl<'a, 'b> DrawNode<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(&mut self, mesh: &'b Mesh) {
        self.draw_mesh_instanced(mesh, 0..1);
    }

    fn draw_mesh_instanced(&mut self, mesh: &'b Mesh, instances: Range<u32>) {
        let vertex_buffer = match &mesh.vertex_buffer {
            Some(buffer) => buffer,
            None => return, // Skip drawing if not uploaded
        };
        let index_buffer = match &mesh.index_buffer {
            Some(buffer) => buffer,
            None => return,
        };

        self.set_vertex_buffer(0, vertex_buffer.slice(..));
        self.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.index_count, 0, instances);
    }

    fn draw_node(&mut self, node: &'b SceneNode) {
        if let Some(bind_group) = node.get_transform_bind_group() {
            self.set_bind_group(1, bind_group, &[]);
            for mesh in &node.meshes {
                self.draw_mesh(mesh);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> SceneNode {
        SceneNode::new(name)
    }

    #[test]
    fn collect_descendants_counts_every_node() {
        // depth 3, 6 descendants total
        let mut root = SceneNode::new("root");
        let mut a = leaf("a");
        let mut b = leaf("b");
        a.add_child(leaf("a0"));
        a.add_child(leaf("a1"));
        b.add_child({
            let mut b0 = leaf("b0");
            b0.add_child(leaf("b00"));
            b0
        });
        root.add_child(a);
        root.add_child(b);

        let flat = root.collect_descendants();
        assert_eq!(flat.len(), 6);

        // every entry resolvable by its path
        for (path, node) in &flat {
            assert_eq!(root.node_at_path(path).unwrap().name, node.name);
        }
    }

    #[test]
    fn world_transform_accumulates_along_ancestry() {
        let mut root = SceneNode::new("root");
        let mut parent = leaf("parent");
        parent.set_translation(Vector3::new(10.0, 0.0, 0.0));
        let mut child = leaf("child");
        child.set_translation(Vector3::new(0.0, 5.0, 0.0));
        parent.add_child(child);
        root.add_child(parent);

        root.update_world_transforms(Matrix4::identity(), None);

        let child_ref = root.node_at_path(&[0, 0]).unwrap();
        let w = child_ref.world_transform;
        assert_eq!(w.w.x, 10.0);
        assert_eq!(w.w.y, 5.0);
    }

    #[test]
    fn plane_mesh_has_expected_extents() {
        let plane = Mesh::plane(800.0, 600.0);
        let xs: Vec<f32> = plane.vertices().iter().map(|v| v.position[0]).collect();
        let zs: Vec<f32> = plane.vertices().iter().map(|v| v.position[2]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 400.0);
        assert_eq!(zs.iter().cloned().fold(f32::MIN, f32::max), 300.0);
        assert!(plane.vertices().iter().all(|v| v.position[1] == 0.0));
    }
}
