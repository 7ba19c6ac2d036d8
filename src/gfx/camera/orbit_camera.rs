use super::camera_utils::{convert_matrix4_to_array, Camera, CameraUniform};
use cgmath::*;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Orbit camera circling a target point
///
/// Eye position is derived from distance/pitch/yaw; aspect is pushed in on
/// every surface resize and is `0.0` while the surface has zero height.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub uniform: CameraUniform,
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.eye);
        let target = Point3::from_vec(self.target);
        let view = Matrix4::look_at_rh(eye, target, self.up);
        let proj =
            OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
        proj * view
    }
}

/// Aspect ratio for a surface, `0.0` when the height is zero
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        return 0.0;
    }
    width as f32 / height as f32
}

impl OrbitCamera {
    pub fn new(
        distance: f32,
        pitch: f32,
        yaw: f32,
        target: Vector3<f32>,
        aspect: f32,
        fovy: Rad<f32>,
        znear: f32,
        zfar: f32,
    ) -> Self {
        let mut camera = Self {
            distance,
            pitch,
            yaw,
            eye: Vector3::zero(), // recalculated by `update()`
            target,
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            aspect,
            fovy,
            znear,
            zfar,
            uniform: CameraUniform::default(),
        };
        camera.update();
        camera
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(
            self.bounds.min_distance.unwrap_or(f32::EPSILON),
            self.bounds.max_distance.unwrap_or(f32::MAX),
        );
        self.update();
    }

    pub fn add_distance(&mut self, delta: f32) {
        let corrected_zoom = f32::log10(self.distance.max(1.0 + f32::EPSILON)) * delta;
        self.set_distance(self.distance + corrected_zoom);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update();
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.set_pitch(self.pitch + delta);
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        let mut bounded_yaw = yaw;
        if let Some(min_yaw) = self.bounds.min_yaw {
            bounded_yaw = bounded_yaw.max(min_yaw);
        }
        if let Some(max_yaw) = self.bounds.max_yaw {
            bounded_yaw = bounded_yaw.min(max_yaw);
        }
        self.yaw = bounded_yaw;
        self.update();
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.set_yaw(self.yaw + delta);
    }

    /// Pans the camera relative to the current view direction
    ///
    /// `delta.0` is horizontal pan, `delta.1` vertical, both in view space.
    pub fn pan(&mut self, delta: (f32, f32)) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();

        // Scale pan by distance so the feel is consistent at all zoom levels
        let pan_scale = self.distance * 0.1;

        let movement = right * delta.0 * pan_scale + up * delta.1 * pan_scale;

        // Move both eye and target to keep the view direction
        self.eye += movement;
        self.target += movement;
    }

    /// Updates the eye after changing `distance`, `pitch`, or `yaw`
    fn update(&mut self) {
        self.eye =
            calculate_cartesian_eye_position(self.pitch, self.yaw, self.distance, self.target);
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn update_view_proj(&mut self) {
        self.uniform.view_position = [self.eye.x, self.eye.y, self.eye.z, 1.0];
        self.uniform.view_proj = convert_matrix4_to_array(self.build_view_projection_matrix());
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_yaw: Option<f32>,
    pub max_yaw: Option<f32>,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: None,
            max_distance: None,
            min_pitch: -std::f32::consts::PI / 2.0 + f32::EPSILON,
            max_pitch: std::f32::consts::PI / 2.0 - f32::EPSILON,
            min_yaw: None,
            max_yaw: None,
        }
    }
}

fn calculate_cartesian_eye_position(
    pitch: f32,
    yaw: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera(aspect: f32) -> OrbitCamera {
        OrbitCamera::new(
            10.0,
            0.3,
            0.1,
            Vector3::zero(),
            aspect,
            Rad(std::f32::consts::PI / 3.0),
            1.0,
            1100.0,
        )
    }

    #[test]
    fn aspect_follows_surface_dimensions() {
        let mut camera = test_camera(1.0);
        camera.resize_projection(800, 600);
        assert_eq!(camera.aspect, 800.0 / 600.0);
    }

    #[test]
    fn zero_height_yields_zero_aspect() {
        let mut camera = test_camera(1.0);
        camera.resize_projection(800, 0);
        assert_eq!(camera.aspect, 0.0);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut once = test_camera(1.0);
        once.resize_projection(1024, 768);
        once.update_view_proj();

        let mut twice = test_camera(1.0);
        twice.resize_projection(1024, 768);
        twice.resize_projection(1024, 768);
        twice.update_view_proj();

        assert_eq!(once.aspect, twice.aspect);
        assert_eq!(once.uniform.view_proj, twice.uniform.view_proj);
    }

    #[test]
    fn eye_stays_at_configured_distance() {
        let camera = test_camera(1.0);
        let len = (camera.eye - camera.target).magnitude();
        assert!((len - camera.distance).abs() < 1e-4);
    }
}
