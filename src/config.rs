//! Viewer configuration
//!
//! Plain data with defaults; the binary overrides asset paths and the rest is
//! tuned here in one place.

use cgmath::{Deg, Rad, Vector3};

/// Everything the viewer needs to set itself up: camera projection, initial
/// orbit placement, asset paths, model placement, and picking policy.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Vertical field of view
    pub field_of_view: Deg<f32>,
    /// Near clipping distance
    pub near_clip: f32,
    /// Far clipping distance
    pub far_clip: f32,

    /// Initial orbit distance from the target
    pub camera_distance: f32,
    /// Initial orbit pitch in radians
    pub camera_pitch: f32,
    /// Initial orbit yaw in radians
    pub camera_yaw: f32,

    /// OBJ model asset path
    pub model_path: String,
    /// Texture image path, applied to the model and tiled over the floor
    pub texture_path: String,

    /// Uniform scale applied to the loaded model subtree
    pub model_scale: f32,
    /// World position of the loaded model subtree
    pub model_position: Vector3<f32>,

    /// Name given to the model subtree root; picking accepts a hit only when
    /// the hit node's immediate parent carries this exact name
    pub model_node_name: String,
    /// Tint applied to a picked node's material
    pub pick_tint: [f32; 3],

    /// Texture repeats across the floor plane in each direction
    pub floor_tiling: f32,
    /// Axes helper bar length; zero disables the helper
    pub axes_length: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            field_of_view: Deg(60.0),
            near_clip: 1.0,
            far_clip: 1100.0,
            camera_distance: 420.0,
            camera_pitch: 0.24,
            camera_yaw: 0.0,
            model_path: "assets/model/c01.obj".to_string(),
            texture_path: "assets/pic/wood-floor.jpg".to_string(),
            model_scale: 10.0,
            model_position: Vector3::new(30.0, 0.0, 30.0),
            model_node_name: "model".to_string(),
            pick_tint: [1.0, 0.0, 0.0],
            floor_tiling: 8.0,
            axes_length: 200.0,
        }
    }
}

impl ViewerConfig {
    pub fn fovy(&self) -> Rad<f32> {
        self.field_of_view.into()
    }
}
