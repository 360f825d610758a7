//! Camera entity: clip planes, projection and look-at view.
//!
//! Matrices use the OpenGL clip-space convention (`z` in `-1..1`). The
//! renderer converts to wgpu's `0..1` depth range with
//! [`OPENGL_TO_WGPU_MATRIX`] when it builds the frame uniform.

use cgmath::{Matrix4, Point3, Vector3};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Parameters for [`crate::scene::Scene::add_camera`].
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Distance to the near plane. Default `0.1`.
    pub near: f32,
    /// Distance to the far plane. Default `5000.0`.
    pub far: f32,
    /// Orthographic left plane. Default `0.0`.
    pub left: f32,
    /// Orthographic right plane. Default `1280.0`.
    pub right: f32,
    /// Orthographic top plane. Default `720.0`.
    pub top: f32,
    /// Orthographic bottom plane. Default `0.0`.
    pub bottom: f32,
    /// Vertical field of view in degrees. Default `70.0`.
    pub fov: f32,
    /// `false` switches to an orthographic projection. Default `true`.
    pub perspective: bool,
    /// Default `true`.
    pub active: bool,
    /// Point the camera looks at, in world space. Default `(0, 0, -1)`.
    pub target: Vector3<f32>,
    /// Default `(0, 1, 0)`.
    pub up: Vector3<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 5000.0,
            left: 0.0,
            right: 1280.0,
            top: 720.0,
            bottom: 0.0,
            fov: 70.0,
            perspective: true,
            active: true,
            target: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::new(0.0, 1.0, 0.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    near: f32,
    far: f32,
    right: f32,
    left: f32,
    top: f32,
    bottom: f32,
    aspect: f32,
    fov: f32,
    perspective: bool,
    active: bool,
    target: Vector3<f32>,
    up: Vector3<f32>,
}

impl Camera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            near: config.near,
            far: config.far,
            right: config.right,
            left: config.left,
            top: config.top,
            bottom: config.bottom,
            aspect: 1280.0 / 720.0,
            fov: config.fov,
            perspective: config.perspective,
            active: config.active,
            target: config.target,
            up: config.up,
        }
    }

    /// Set all six clip planes at once.
    pub fn set_camera_config(
        &mut self,
        near: f32,
        far: f32,
        right: f32,
        left: f32,
        top: f32,
        bottom: f32,
    ) {
        self.near = near;
        self.far = far;
        self.right = right;
        self.left = left;
        self.top = top;
        self.bottom = bottom;
    }

    pub fn set_perspective(&mut self, perspective: bool) {
        self.perspective = perspective;
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn set_camera_target(&mut self, target: Vector3<f32>) {
        self.target = target;
    }

    pub fn set_camera_up(&mut self, up: Vector3<f32>) {
        self.up = up;
    }

    pub fn is_perspective(&self) -> bool {
        self.perspective
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn camera_target(&self) -> Vector3<f32> {
        self.target
    }

    pub fn camera_up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// Build the projection from the current parameters. Nothing is cached.
    pub fn calculate_projection_matrix(&self) -> Matrix4<f32> {
        if self.perspective {
            cgmath::perspective(cgmath::Deg(self.fov), self.aspect, self.near, self.far)
        } else {
            cgmath::ortho(
                self.left,
                self.right,
                self.bottom,
                self.top,
                self.near,
                self.far,
            )
        }
    }

    /// Look-at view from `eye` (the owning node's world position) to the target.
    pub fn view_matrix(&self, eye: Vector3<f32>) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::new(eye.x, eye.y, eye.z),
            Point3::new(self.target.x, self.target.y, self.target.z),
            self.up,
        )
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
