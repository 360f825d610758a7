//! Node transforms and their GPU representation.
//!
//! Every scene node carries a local [`Instance`]. Its [`WorldTransform`] is
//! the matrix product of all ancestors' locals, composed with `parent * child`.

use std::ops::Mul;

use cgmath::{InnerSpace, Matrix, One, SquareMatrix};

/// Local transformation of a node: position, rotation (as quaternion) and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_position(mut self, position: cgmath::Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_scale(mut self, scale: cgmath::Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

/// A node's transform in world space: the matrix product of every local
/// transform from the root down, `parent * child`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldTransform(pub cgmath::Matrix4<f32>);

impl WorldTransform {
    pub fn identity() -> Self {
        Self(cgmath::Matrix4::identity())
    }

    pub fn matrix(&self) -> &cgmath::Matrix4<f32> {
        &self.0
    }

    /// Translation column.
    pub fn position(&self) -> cgmath::Vector3<f32> {
        self.0.w.truncate()
    }

    /// Length of each basis column, the per-axis scale a unit vector picks up.
    pub fn scale(&self) -> cgmath::Vector3<f32> {
        cgmath::Vector3::new(
            self.0.x.truncate().magnitude(),
            self.0.y.truncate().magnitude(),
            self.0.z.truncate().magnitude(),
        )
    }

    /// Largest axis scale, used to grow local bounds into world bounds.
    pub fn max_scale(&self) -> f32 {
        let scale = self.scale();
        scale.x.max(scale.y).max(scale.z)
    }

    /// Transform a point given in the node's local space.
    pub fn transform_point(&self, point: cgmath::Point3<f32>) -> cgmath::Point3<f32> {
        cgmath::Transform::transform_point(&self.0, point)
    }

    pub fn to_raw(&self) -> ModelUniform {
        // inverse-transpose keeps normals perpendicular under non-uniform scale
        let normal = self
            .0
            .invert()
            .map(|inv| inv.transpose())
            .unwrap_or_else(cgmath::Matrix4::identity);
        ModelUniform {
            model: self.0.into(),
            normal: normal.into(),
        }
    }
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<&Instance> for WorldTransform {
    fn from(local: &Instance) -> Self {
        Self(local.to_matrix())
    }
}

impl Mul<&Instance> for WorldTransform {
    type Output = WorldTransform;

    fn mul(self, child: &Instance) -> Self::Output {
        WorldTransform(self.0 * child.to_matrix())
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The per-node uniform stored on the GPU: the world matrix and the matrix
 * used to bring normals into world space.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}
