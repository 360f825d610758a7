//! The payload a scene node may carry.
//!
//! [`Entity`] is a closed set of variants. Everything that ends up on screen
//! implements [`Drawable`]; cameras and lights only feed the frame context.

use crate::{
    data_structures::{
        billboard::Billboard, camera::Camera, instance::WorldTransform, light::PointLight, mesh::Mesh,
        particles::ParticleSystem,
    },
    render::{DrawContext, PrepareContext},
};

pub trait Drawable {
    /// Create or refresh GPU state for this frame using the node's world transform.
    fn prepare(&mut self, world: &WorldTransform, gpu: &mut PrepareContext<'_>) -> anyhow::Result<()>;

    /// Record the draw into the main pass.
    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, ctx: &DrawContext<'_>);

    /// Record position-only geometry into the shadow pass.
    fn draw_depth_map(&self, _pass: &mut wgpu::RenderPass<'_>, _ctx: &DrawContext<'_>) {}

    /// Side length of the local bounding cube, `None` if the entity has no geometry.
    fn bounding_extent(&self) -> Option<f32> {
        None
    }
}

#[derive(Debug)]
pub enum Entity {
    Camera(Camera),
    PointLight(PointLight),
    Mesh(Mesh),
    Billboard(Billboard),
    ParticleSystem(ParticleSystem),
}

impl Entity {
    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Camera(_) => "camera",
            Entity::PointLight(_) => "point light",
            Entity::Mesh(_) => "mesh",
            Entity::Billboard(_) => "billboard",
            Entity::ParticleSystem(_) => "particle system",
        }
    }

    pub fn as_camera(&self) -> Option<&Camera> {
        match self {
            Entity::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn as_camera_mut(&mut self) -> Option<&mut Camera> {
        match self {
            Entity::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn as_point_light(&self) -> Option<&PointLight> {
        match self {
            Entity::PointLight(light) => Some(light),
            _ => None,
        }
    }

    pub fn as_point_light_mut(&mut self) -> Option<&mut PointLight> {
        match self {
            Entity::PointLight(light) => Some(light),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match self {
            Entity::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match self {
            Entity::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_particle_system(&self) -> Option<&ParticleSystem> {
        match self {
            Entity::ParticleSystem(system) => Some(system),
            _ => None,
        }
    }

    pub fn as_particle_system_mut(&mut self) -> Option<&mut ParticleSystem> {
        match self {
            Entity::ParticleSystem(system) => Some(system),
            _ => None,
        }
    }

    pub fn as_billboard(&self) -> Option<&Billboard> {
        match self {
            Entity::Billboard(billboard) => Some(billboard),
            _ => None,
        }
    }

    /// The drawable view of this entity, `None` for cameras and lights.
    pub fn drawable(&self) -> Option<&dyn Drawable> {
        match self {
            Entity::Mesh(mesh) => Some(mesh),
            Entity::Billboard(billboard) => Some(billboard),
            Entity::ParticleSystem(system) => Some(system),
            Entity::Camera(_) | Entity::PointLight(_) => None,
        }
    }

    pub fn drawable_mut(&mut self) -> Option<&mut dyn Drawable> {
        match self {
            Entity::Mesh(mesh) => Some(mesh),
            Entity::Billboard(billboard) => Some(billboard),
            Entity::ParticleSystem(system) => Some(system),
            Entity::Camera(_) | Entity::PointLight(_) => None,
        }
    }

    pub fn bounding_extent(&self) -> Option<f32> {
        self.drawable().and_then(Drawable::bounding_extent)
    }

    /// Alpha blended entities test depth without writing it and are drawn
    /// after the skybox.
    pub fn is_blended(&self) -> bool {
        matches!(self, Entity::Billboard(_) | Entity::ParticleSystem(_))
    }
}

impl From<Camera> for Entity {
    fn from(camera: Camera) -> Self {
        Entity::Camera(camera)
    }
}

impl From<PointLight> for Entity {
    fn from(light: PointLight) -> Self {
        Entity::PointLight(light)
    }
}

impl From<Mesh> for Entity {
    fn from(mesh: Mesh) -> Self {
        Entity::Mesh(mesh)
    }
}

impl From<Billboard> for Entity {
    fn from(billboard: Billboard) -> Self {
        Entity::Billboard(billboard)
    }
}

impl From<ParticleSystem> for Entity {
    fn from(system: ParticleSystem) -> Self {
        Entity::ParticleSystem(system)
    }
}
