//! Point lights and their per-frame aggregation into a fixed-size uniform array.

use cgmath::Vector3;

/// Size of the light array in the lit shader. Must match `MAX_POINT_LIGHTS` in `lit.wgsl`.
pub const MAX_POINT_LIGHTS: usize = 16;

/// Parameters for [`crate::scene::Scene::add_point_light`].
///
/// The defaults give a white light with a range of roughly 50 units.
#[derive(Clone, Debug, PartialEq)]
pub struct PointLightConfig {
    pub intensity: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for PointLightConfig {
    fn default() -> Self {
        Self {
            intensity: Vector3::new(1.0, 1.0, 1.0),
            ambient: Vector3::new(0.05, 0.05, 0.05),
            diffuse: Vector3::new(0.8, 0.8, 0.8),
            specular: Vector3::new(1.0, 1.0, 1.0),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

/// A point light. Its position is the owning node's world position.
#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    pub intensity: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl PointLight {
    pub fn new(config: PointLightConfig) -> Self {
        let PointLightConfig {
            intensity,
            ambient,
            diffuse,
            specular,
            constant,
            linear,
            quadratic,
        } = config;
        Self {
            intensity,
            ambient,
            diffuse,
            specular,
            constant,
            linear,
            quadratic,
        }
    }

    pub fn to_raw(&self, position: Vector3<f32>) -> PointLightRaw {
        PointLightRaw {
            position: position.into(),
            constant: self.constant,
            intensity: self.intensity.into(),
            linear: self.linear,
            ambient: self.ambient.into(),
            quadratic: self.quadratic,
            diffuse: self.diffuse.into(),
            _padding: 0,
            specular: self.specular.into(),
            _padding2: 0,
        }
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self::new(PointLightConfig::default())
    }
}

/// GPU layout of one light. Scalars are packed into the fourth lane of each
/// `vec3` so every member stays on a 16 byte boundary.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightRaw {
    pub position: [f32; 3],
    pub constant: f32,
    pub intensity: [f32; 3],
    pub linear: f32,
    pub ambient: [f32; 3],
    pub quadratic: f32,
    pub diffuse: [f32; 3],
    _padding: u32,
    pub specular: [f32; 3],
    _padding2: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    pub lights: [PointLightRaw; MAX_POINT_LIGHTS],
}

impl LightsUniform {
    /// Pack `lights` into the uniform array. Returns the uniform and the number
    /// of lights actually stored; anything past the array is dropped.
    pub fn pack(lights: &[PointLightRaw]) -> (Self, u32) {
        let mut uniform: Self = bytemuck::Zeroable::zeroed();
        let count = lights.len().min(MAX_POINT_LIGHTS);
        uniform.lights[..count].copy_from_slice(&lights[..count]);
        (uniform, count as u32)
    }
}
