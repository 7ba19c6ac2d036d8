//! # Object Picking
//!
//! Mouse ray-cast selection against the scene graph.
//!
//! 1. **Mouse to NDC**: convert pointer pixels to normalized device
//!    coordinates using the surface dimensions
//! 2. **NDC to ray**: unproject through the camera into world space
//! 3. **Flatten**: walk the whole tree depth-first (every descendant, not
//!    just leaves) — recomputed on each pick so results always reflect the
//!    latest tree
//! 4. **Intersect**: test the ray against each node's world-space bounding
//!    box and keep the nearest hit
//! 5. **Accept**: only hits whose immediate parent carries the expected
//!    marker name; accepted hits get their material tinted in place
//!
//! Misses and non-matching parents are silent no-ops.

use cgmath::{
    EuclideanSpace, ElementWise, InnerSpace, Matrix4, SquareMatrix, Vector3, Vector4, Zero,
};

use crate::gfx::{camera::orbit_camera::OrbitCamera, scene::scene::Scene, scene::SceneNode};

/// A 3D ray for intersection testing
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Ray origin point in world space
    pub origin: Vector3<f32>,
    /// Ray direction (normalized)
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }
}

/// Axis-aligned bounding box for intersection testing
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Create an AABB from a set of vertices
    pub fn from_vertices(vertices: &[[f32; 3]]) -> Self {
        if vertices.is_empty() {
            return Self::new(Vector3::zero(), Vector3::zero());
        }

        let mut min = Vector3::new(vertices[0][0], vertices[0][1], vertices[0][2]);
        let mut max = min;

        for vertex in vertices.iter().skip(1) {
            let v = Vector3::new(vertex[0], vertex[1], vertex[2]);
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }

        Self::new(min, max)
    }

    /// Ray-AABB intersection distance, or None on a miss
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv_dir = Vector3::new(
            1.0 / ray.direction.x,
            1.0 / ray.direction.y,
            1.0 / ray.direction.z,
        );

        let t_min = (self.min - ray.origin).mul_element_wise(inv_dir);
        let t_max = (self.max - ray.origin).mul_element_wise(inv_dir);

        let t1 = Vector3::new(
            t_min.x.min(t_max.x),
            t_min.y.min(t_max.y),
            t_min.z.min(t_max.z),
        );
        let t2 = Vector3::new(
            t_min.x.max(t_max.x),
            t_min.y.max(t_max.y),
            t_min.z.max(t_max.z),
        );

        let t_near = t1.x.max(t1.y.max(t1.z));
        let t_far = t2.x.min(t2.y.min(t2.z));

        if t_near <= t_far && t_far >= 0.0 {
            Some(if t_near >= 0.0 { t_near } else { t_far })
        } else {
            None
        }
    }

    /// Apply a transformation matrix to the AABB
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        // Transform all 8 corners and recompute bounds
        let corners = [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ];

        let mut transformed_corners = Vec::with_capacity(8);
        for corner in &corners {
            let homogeneous = Vector4::new(corner.x, corner.y, corner.z, 1.0);
            let transformed = matrix * homogeneous;
            transformed_corners.push([
                transformed.x / transformed.w,
                transformed.y / transformed.w,
                transformed.z / transformed.w,
            ]);
        }

        Self::from_vertices(&transformed_corners)
    }
}

/// Result of a picking operation
#[derive(Debug, Clone)]
pub struct PickResult {
    /// Child-index path of the picked node from the scene root
    pub path: Vec<usize>,
    /// Distance from the ray origin to the intersection point
    pub distance: f32,
    /// World space intersection point
    pub intersection_point: Vector3<f32>,
}

/// Pointer pixels to normalized device coordinates
///
/// For coordinates inside the surface the result lies in `[-1, 1] x [-1, 1]`,
/// with +y up.
pub fn ndc_from_screen(screen_pos: (f32, f32), screen_size: (f32, f32)) -> (f32, f32) {
    let (px, py) = screen_pos;
    let (width, height) = screen_size;
    ((px / width) * 2.0 - 1.0, -(py / height) * 2.0 + 1.0)
}

/// Convert screen coordinates to a world-space ray through the camera
pub fn screen_to_ray(
    screen_pos: (f32, f32),
    screen_size: (f32, f32),
    camera: &OrbitCamera,
) -> Ray {
    let (ndc_x, ndc_y) = ndc_from_screen(screen_pos, screen_size);

    let eye = cgmath::Point3::from_vec(camera.eye);
    let target = cgmath::Point3::from_vec(camera.target);
    let view_matrix = Matrix4::look_at_rh(eye, target, camera.up);
    let proj_matrix = cgmath::perspective(camera.fovy, camera.aspect, camera.znear, camera.zfar);

    let view_proj_matrix = proj_matrix * view_matrix;
    let inv_view_proj = view_proj_matrix.invert().unwrap_or(Matrix4::from_scale(1.0));

    // Unproject near and far plane points
    let near_point = Vector4::new(ndc_x, ndc_y, -1.0, 1.0);
    let far_point = Vector4::new(ndc_x, ndc_y, 1.0, 1.0);

    let world_near = inv_view_proj * near_point;
    let world_far = inv_view_proj * far_point;

    let near_3d = Vector3::new(
        world_near.x / world_near.w,
        world_near.y / world_near.w,
        world_near.z / world_near.w,
    );
    let far_3d = Vector3::new(
        world_far.x / world_far.w,
        world_far.y / world_far.w,
        world_far.z / world_far.w,
    );

    Ray::new(near_3d, far_3d - near_3d)
}

fn node_aabb(node: &SceneNode) -> Option<Aabb> {
    if node.meshes.is_empty() {
        return None;
    }
    let mut all_vertices = Vec::new();
    for mesh in &node.meshes {
        for vertex in mesh.vertices() {
            all_vertices.push(vertex.position);
        }
    }
    Some(Aabb::from_vertices(&all_vertices))
}

/// Cast a ray from the pointer into the scene and return the nearest hit
///
/// Flattens the whole tree on every call; world transforms must be current
/// (the render loop refreshes them each frame).
pub fn pick(
    screen_pos: (f32, f32),
    screen_size: (f32, f32),
    camera: &OrbitCamera,
    root: &SceneNode,
) -> Option<PickResult> {
    if screen_size.0 <= 0.0 || screen_size.1 <= 0.0 {
        return None;
    }

    let ray = screen_to_ray(screen_pos, screen_size, camera);

    let mut closest: Option<PickResult> = None;
    for (path, node) in root.collect_descendants() {
        if !node.visible {
            continue;
        }
        let Some(aabb) = node_aabb(node) else {
            continue;
        };
        let world_aabb = aabb.transform(&node.world_transform);

        if let Some(distance) = world_aabb.intersect_ray(&ray) {
            if closest
                .as_ref()
                .map_or(true, |result| distance < result.distance)
            {
                closest = Some(PickResult {
                    path,
                    distance,
                    intersection_point: ray.point_at(distance),
                });
            }
        }
    }

    closest
}

/// Full pick handler: nearest hit, parent-marker acceptance, material tint
///
/// Returns the path of the mutated node, or None when the pick was a no-op
/// (no hit, parent mismatch, or the node has no material of its own).
pub fn pick_and_tint(
    scene: &mut Scene,
    screen_pos: (f32, f32),
    screen_size: (f32, f32),
    marker: &str,
    tint: [f32; 3],
) -> Option<Vec<usize>> {
    let result = pick(
        screen_pos,
        screen_size,
        &scene.camera_manager.camera,
        &scene.root,
    )?;

    // Accept only when the immediate parent carries the marker name
    if result.path.len() < 2 {
        return None;
    }
    let parent = scene.root.node_at_path(&result.path[..result.path.len() - 1])?;
    if parent.name != marker {
        return None;
    }

    let material_id = scene
        .root
        .node_at_path(&result.path)?
        .material_id
        .clone()?;
    let material = scene.material_manager.get_material_mut(&material_id)?;
    material.set_tint(tint[0], tint[1], tint[2]);

    Some(result.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::{CameraController, CameraManager, OrbitCamera};
    use crate::gfx::scene::node::Mesh;
    use cgmath::Rad;

    fn test_camera() -> OrbitCamera {
        // eye at (0, 0, 10) looking at the origin
        OrbitCamera::new(
            10.0,
            0.0,
            0.0,
            Vector3::zero(),
            800.0 / 600.0,
            Rad(std::f32::consts::PI / 3.0),
            0.1,
            100.0,
        )
    }

    fn unit_cube() -> Mesh {
        Mesh::cuboid(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0))
    }

    fn test_scene() -> Scene {
        let camera = test_camera();
        let controller = CameraController::new(0.005, 0.1);
        let mut scene = Scene::new(CameraManager::new(camera, controller));

        scene
            .material_manager
            .add_material(crate::gfx::resources::material::Material::new(
                "cube_a",
                [0.5, 0.5, 0.5, 1.0],
            ));
        scene
            .material_manager
            .add_material(crate::gfx::resources::material::Material::new(
                "cube_b",
                [0.5, 0.5, 0.5, 1.0],
            ));

        // group matching the pick marker, cube at the origin
        let mut model_group = SceneNode::new("model");
        model_group.add_child(
            SceneNode::new("model_0")
                .with_meshes(vec![unit_cube()])
                .with_material("cube_a"),
        );
        scene.root.add_child(model_group);

        // non-matching group, cube off to the side
        let mut props = SceneNode::new("props");
        props.add_child(
            SceneNode::new("crate")
                .with_meshes(vec![unit_cube()])
                .with_transform(Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0)))
                .with_material("cube_b"),
        );
        scene.root.add_child(props);

        scene
            .root
            .update_world_transforms(Matrix4::identity(), None);
        scene
    }

    /// Project a world point back to screen pixels with the test camera
    fn screen_of(world: Vector3<f32>, camera: &OrbitCamera, size: (f32, f32)) -> (f32, f32) {
        let eye = cgmath::Point3::from_vec(camera.eye);
        let target = cgmath::Point3::from_vec(camera.target);
        let view = Matrix4::look_at_rh(eye, target, camera.up);
        let proj = cgmath::perspective(camera.fovy, camera.aspect, camera.znear, camera.zfar);
        let clip = proj * view * Vector4::new(world.x, world.y, world.z, 1.0);
        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        ((ndc_x + 1.0) / 2.0 * size.0, (1.0 - ndc_y) / 2.0 * size.1)
    }

    #[test]
    fn ndc_stays_in_unit_square_for_interior_points() {
        let size = (800.0, 600.0);
        for &(px, py) in &[(1.0, 1.0), (400.0, 300.0), (799.0, 599.0), (12.5, 480.0)] {
            let (x, y) = ndc_from_screen((px, py), size);
            assert!((-1.0..=1.0).contains(&x), "x out of range: {}", x);
            assert!((-1.0..=1.0).contains(&y), "y out of range: {}", y);
        }
        // center maps to the origin
        let (cx, cy) = ndc_from_screen((400.0, 300.0), size);
        assert!(cx.abs() < 1e-6 && cy.abs() < 1e-6);
    }

    #[test]
    fn aabb_creation() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [-1.0, -1.0, -1.0]];
        let aabb = Aabb::from_vertices(&vertices);

        assert_eq!(aabb.min, Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn ray_aabb_intersection() {
        let aabb = Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));

        // Ray hitting the box
        let ray = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray).is_some());

        // Ray missing the box
        let ray_miss = Ray::new(Vector3::new(5.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray_miss).is_none());

        // Origin inside the box still reports a hit
        let ray_inside = Ray::new(Vector3::zero(), Vector3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&ray_inside).is_some());
    }

    #[test]
    fn ray_through_screen_center_points_at_target() {
        let camera = test_camera();
        let ray = screen_to_ray((400.0, 300.0), (800.0, 600.0), &camera);
        // camera on +z looking toward origin
        assert!(ray.direction.z < -0.99);
    }

    #[test]
    fn pick_through_marked_node_tints_only_that_node() {
        let mut scene = test_scene();
        let size = (800.0, 600.0);

        let path = pick_and_tint(&mut scene, (400.0, 300.0), size, "model", [1.0, 0.0, 0.0])
            .expect("center pick hits the model cube");

        let node = scene.root.node_at_path(&path).unwrap();
        assert_eq!(node.name, "model_0");

        let tinted = scene.material_manager.get_material("cube_a").unwrap();
        assert_eq!(tinted.base_color, [1.0, 0.0, 0.0, 1.0]);

        let untouched = scene.material_manager.get_material("cube_b").unwrap();
        assert_eq!(untouched.base_color, [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn pick_through_unmarked_node_is_a_silent_noop() {
        let mut scene = test_scene();
        let size = (800.0, 600.0);

        let camera = scene.camera_manager.camera;
        let screen = screen_of(Vector3::new(5.0, 0.0, 0.0), &camera, size);

        let result = pick_and_tint(&mut scene, screen, size, "model", [1.0, 0.0, 0.0]);
        assert!(result.is_none());

        let untouched = scene.material_manager.get_material("cube_b").unwrap();
        assert_eq!(untouched.base_color, [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn pick_outside_everything_is_none() {
        let mut scene = test_scene();
        let result = pick_and_tint(&mut scene, (1.0, 1.0), (800.0, 600.0), "model", [1.0, 0.0, 0.0]);
        assert!(result.is_none());
    }

    #[test]
    fn pick_with_zero_surface_is_none() {
        let scene = test_scene();
        let result = pick(
            (0.0, 0.0),
            (0.0, 0.0),
            &scene.camera_manager.camera,
            &scene.root,
        );
        assert!(result.is_none());
    }
}
