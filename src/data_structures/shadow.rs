//! Directional-style shadow mapping from one point light.

use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3};

use crate::data_structures::camera::OPENGL_TO_WGPU_MATRIX;

/// Binds the shadow map to one point-light node.
///
/// The depth texture itself lives in the renderer, sized by [`ShadowMapping::size`].
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowMapping {
    light_id: u32,
    size: u32,
    extent: f32,
}

impl ShadowMapping {
    /// `extent` is the half size of the square orthographic volume the light sees.
    pub fn new(light_id: u32, size: u32, extent: f32) -> Self {
        Self {
            light_id,
            size: size.max(1),
            extent,
        }
    }

    pub fn light_id(&self) -> u32 {
        self.light_id
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn extent(&self) -> f32 {
        self.extent
    }

    /// Projection times view as seen from `light_position` towards `focus`,
    /// already in wgpu clip space.
    pub fn light_space_matrix(
        &self,
        light_position: Vector3<f32>,
        focus: Vector3<f32>,
    ) -> Matrix4<f32> {
        let direction = focus - light_position;
        if direction.magnitude2() < 1e-8 {
            return Matrix4::identity();
        }
        let up = if direction.normalize().y.abs() > 0.99 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let far = direction.magnitude() + self.extent * 2.0;
        let projection = cgmath::ortho(
            -self.extent,
            self.extent,
            -self.extent,
            self.extent,
            0.1,
            far,
        );
        let view = Matrix4::look_at_rh(
            Point3::new(light_position.x, light_position.y, light_position.z),
            Point3::new(focus.x, focus.y, focus.z),
            up,
        );
        OPENGL_TO_WGPU_MATRIX * projection * view
    }
}
