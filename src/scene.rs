//! The headless half of the engine: the node tree, its resources and the
//! per-frame state derived from it.
//!
//! Everything here runs without a GPU. The [`crate::engine::Engine`] owns one
//! [`Scene`] and hands it to the [`crate::render::Renderer`] each frame together
//! with the [`FrameContext`] computed by [`Scene::frame_context`].

use std::time::Duration;

use cgmath::{Matrix4, SquareMatrix, Vector3, Vector4, Zero};
use log::{debug, warn};

use crate::{
    config::EngineConfig,
    data_structures::{
        billboard::{Billboard, BillboardConfig},
        camera::{Camera, CameraConfig, OPENGL_TO_WGPU_MATRIX},
        entity::Entity,
        light::{LightsUniform, MAX_POINT_LIGHTS, PointLight, PointLightConfig, PointLightRaw},
        mesh::{Mesh, MeshConfig},
        particles::{ParticleSystem, ParticleSystemConfig},
        scene_graph::{Node, NodeKey, SceneGraph},
        shadow::ShadowMapping,
        skybox::{Skybox, SkyboxFaces},
    },
    error::{Result, SceneError},
    pipelines::{FrameUniform, lines::Line},
    resources::ResourceManager,
};

/// View, projection and lighting for one frame, computed once and passed by
/// reference through the render sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameContext {
    /// Camera view matrix.
    pub view: Matrix4<f32>,
    /// Camera projection in OpenGL clip space.
    pub projection: Matrix4<f32>,
    pub eye: Vector3<f32>,
    /// At most [`MAX_POINT_LIGHTS`] lights, in tree order.
    pub lights: Vec<PointLightRaw>,
    /// Light-space matrix of the shadow light, if one is bound and alive.
    pub light_space: Option<Matrix4<f32>>,
}

impl FrameContext {
    /// Projection times view in wgpu clip space.
    pub fn view_projection(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.projection * self.view
    }

    pub fn uniforms(&self, shadows_enabled: bool) -> (FrameUniform, LightsUniform) {
        let mut rotation_only = self.view;
        rotation_only.w = Vector4::new(0.0, 0.0, 0.0, 1.0);
        let sky_inv = (OPENGL_TO_WGPU_MATRIX * self.projection * rotation_only)
            .invert()
            .unwrap_or_else(Matrix4::identity);
        let (lights, light_count) = LightsUniform::pack(&self.lights);
        let frame = FrameUniform {
            view_proj: self.view_projection().into(),
            view: self.view.into(),
            sky_inv: sky_inv.into(),
            light_space: self.light_space.unwrap_or_else(Matrix4::identity).into(),
            eye: self.eye.into(),
            light_count,
            shadows_enabled: shadows_enabled as u32,
            _padding: [0; 3],
        };
        (frame, lights)
    }
}

#[derive(Debug)]
pub struct Scene {
    graph: SceneGraph,
    resources: ResourceManager,
    skybox: Option<Skybox>,
    shadow_mapping: Option<ShadowMapping>,
    lines: Vec<Line>,
    last_view: Matrix4<f32>,
    last_projection: Matrix4<f32>,
    last_eye: Vector3<f32>,
    max_point_lights: usize,
    shadow_map_size: u32,
    shadow_extent: f32,
    particle_seed: u64,
    reported_dropped_lights: bool,
}

impl Scene {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            graph: SceneGraph::new(),
            resources: ResourceManager::new(config.asset_dir.clone()),
            skybox: None,
            shadow_mapping: None,
            lines: Vec::new(),
            last_view: Matrix4::identity(),
            last_projection: Matrix4::identity(),
            last_eye: Vector3::zero(),
            max_point_lights: config.max_point_lights.min(MAX_POINT_LIGHTS),
            shadow_map_size: config.shadow_map_size,
            shadow_extent: config.shadow_extent,
            particle_seed: config.particle_seed,
            reported_dropped_lights: false,
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    pub fn root(&self) -> NodeKey {
        self.graph.root()
    }

    /// Fail early, before any resource is loaded, if the node could not be inserted.
    fn check_insertable(&self, parent: Option<NodeKey>, id: u32) -> Result<()> {
        if let Some(parent) = parent {
            if self.graph.get(parent).is_none() {
                return Err(SceneError::ParentNotFound);
            }
        }
        if self.graph.find_by_id(id).is_some() {
            return Err(SceneError::DuplicateId(id));
        }
        Ok(())
    }

    /// An empty node used to group and transform its children.
    pub fn add_group(&mut self, parent: Option<NodeKey>, id: u32) -> Result<NodeKey> {
        self.graph.add_child(parent, id, None)
    }

    pub fn add_mesh(
        &mut self,
        parent: Option<NodeKey>,
        id: u32,
        config: MeshConfig,
    ) -> Result<NodeKey> {
        self.check_insertable(parent, id)?;
        let data = match &config.mesh {
            Some(path) => Some(
                self.resources
                    .get_mesh(path)
                    .map_err(|e| SceneError::resource(path, e))?,
            ),
            None => None,
        };
        let texture = match &config.texture {
            Some(path) => Some(
                self.resources
                    .get_texture(path)
                    .map_err(|e| SceneError::resource(path, e))?,
            ),
            None => None,
        };
        let mesh = Mesh::new(data, texture, config.casts_shadows);
        self.graph.add_child(parent, id, Some(mesh.into()))
    }

    pub fn add_point_light(
        &mut self,
        parent: Option<NodeKey>,
        id: u32,
        config: PointLightConfig,
    ) -> Result<NodeKey> {
        self.graph
            .add_child(parent, id, Some(PointLight::new(config).into()))
    }

    pub fn add_camera(
        &mut self,
        parent: Option<NodeKey>,
        id: u32,
        config: CameraConfig,
    ) -> Result<NodeKey> {
        self.graph
            .add_child(parent, id, Some(Camera::new(config).into()))
    }

    /// Every emitter shape goes through this one factory; see [`ParticleSystemConfig::shape`].
    pub fn add_particle_system(
        &mut self,
        parent: Option<NodeKey>,
        id: u32,
        config: ParticleSystemConfig,
    ) -> Result<NodeKey> {
        self.check_insertable(parent, id)?;
        let textures = config
            .textures
            .iter()
            .map(|path| {
                self.resources
                    .get_texture(path)
                    .map_err(|e| SceneError::resource(path, e))
            })
            .collect::<Result<Vec<_>>>()?;
        // distinct systems must not spawn in lockstep
        let seed = self.particle_seed ^ u64::from(id).rotate_left(32);
        let system = ParticleSystem::new(&config, textures, seed);
        self.graph.add_child(parent, id, Some(system.into()))
    }

    pub fn add_billboard(
        &mut self,
        parent: Option<NodeKey>,
        id: u32,
        config: BillboardConfig,
    ) -> Result<NodeKey> {
        self.check_insertable(parent, id)?;
        let texture = self
            .resources
            .get_texture(&config.texture)
            .map_err(|e| SceneError::resource(&config.texture, e))?;
        let billboard = Billboard::new(texture, config.vertical, config.width, config.height);
        self.graph.add_child(parent, id, Some(billboard.into()))
    }

    /// Replace the scene's skybox. The previous one stays if loading fails.
    pub fn add_skybox(&mut self, faces: SkyboxFaces) -> Result<()> {
        let paths = faces.paths();
        let mut loaded = Vec::with_capacity(6);
        for path in paths {
            let texture = self
                .resources
                .get_texture(path)
                .map_err(|e| SceneError::resource(path, e))?;
            loaded.push(texture);
        }
        let faces: [_; 6] = loaded
            .try_into()
            .map_err(|_| SceneError::resource("skybox", anyhow::anyhow!("expected six faces")))?;
        let skybox = Skybox::new(faces).map_err(|e| SceneError::resource(paths[0], e))?;
        self.skybox = Some(skybox);
        debug!("skybox set");
        Ok(())
    }

    /// Cast shadows from the point light with `light_id`.
    pub fn add_shadow_mapping(&mut self, light_id: u32) -> Result<()> {
        let node = self
            .get_node_by_id(light_id)
            .ok_or(SceneError::NodeNotFound(light_id))?;
        if node.entity().and_then(Entity::as_point_light).is_none() {
            return Err(SceneError::NotAPointLight(light_id));
        }
        self.shadow_mapping = Some(ShadowMapping::new(
            light_id,
            self.shadow_map_size,
            self.shadow_extent,
        ));
        debug!("shadow mapping bound to light {light_id}");
        Ok(())
    }

    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    pub fn skybox_mut(&mut self) -> Option<&mut Skybox> {
        self.skybox.as_mut()
    }

    pub fn shadow_mapping(&self) -> Option<&ShadowMapping> {
        self.shadow_mapping.as_ref()
    }

    pub fn node_key(&self, id: u32) -> Option<NodeKey> {
        self.graph.find_by_id(id)
    }

    pub fn get_node_by_id(&self, id: u32) -> Option<&Node> {
        self.graph.find_by_id(id).and_then(|key| self.graph.get(key))
    }

    pub fn get_node_by_id_mut(&mut self, id: u32) -> Option<&mut Node> {
        let key = self.graph.find_by_id(id)?;
        self.graph.get_mut(key)
    }

    pub fn delete_node(&mut self, id: u32) -> bool {
        self.graph.delete_node(id)
    }

    pub fn get_bounding_size_by_id(&self, id: u32) -> Option<f32> {
        self.graph.bounding_size(id)
    }

    /// First active camera in pre-order.
    pub fn get_active_camera_node(&self) -> Option<NodeKey> {
        self.graph.iter().find_map(|(key, node, _)| {
            node.entity()
                .and_then(Entity::as_camera)
                .filter(|camera| camera.is_active())
                .map(|_| key)
        })
    }

    pub fn get_active_camera(&self) -> Option<&Camera> {
        let key = self.get_active_camera_node()?;
        self.graph.get(key)?.entity()?.as_camera()
    }

    pub fn get_active_camera_mut(&mut self) -> Option<&mut Camera> {
        let key = self.get_active_camera_node()?;
        self.graph.get_mut(key)?.entity_mut()?.as_camera_mut()
    }

    pub fn fov_active_camera(&self) -> Option<f32> {
        self.get_active_camera().map(Camera::fov)
    }

    pub fn target_active_camera(&self) -> Option<Vector3<f32>> {
        self.get_active_camera().map(Camera::camera_target)
    }

    /// World position of the active camera's node.
    pub fn position_active_camera(&self) -> Option<Vector3<f32>> {
        let key = self.get_active_camera_node()?;
        self.graph.world_transform(key).map(|world| world.position())
    }

    fn keys_with(&self, filter: impl Fn(&Entity) -> bool) -> Vec<NodeKey> {
        self.graph
            .iter()
            .filter(|(_, node, _)| node.entity().is_some_and(&filter))
            .map(|(key, _, _)| key)
            .collect()
    }

    pub fn cameras(&self) -> Vec<NodeKey> {
        self.keys_with(|entity| matches!(entity, Entity::Camera(_)))
    }

    pub fn point_lights(&self) -> Vec<NodeKey> {
        self.keys_with(|entity| matches!(entity, Entity::PointLight(_)))
    }

    /// Delete every camera and light node together with their subtrees.
    pub fn remove_lights_and_cameras(&mut self) {
        let keys = self.keys_with(|entity| {
            matches!(entity, Entity::Camera(_) | Entity::PointLight(_))
        });
        let removed = keys
            .into_iter()
            .filter(|key| self.graph.delete_node_by_key(*key))
            .count();
        debug!("removed {removed} light/camera node(s)");
    }

    /// Show or hide every particle system node.
    pub fn set_particles_visibility(&mut self, visible: bool) {
        for key in self.keys_with(|entity| matches!(entity, Entity::ParticleSystem(_))) {
            if let Some(node) = self.graph.get_mut(key) {
                node.set_visible(visible);
            }
        }
    }

    /// Queue a world-space line for this frame.
    pub fn draw_3d_line(&mut self, from: Vector3<f32>, to: Vector3<f32>, colour: [f32; 4]) {
        self.lines.push(Line { from, to, colour });
    }

    /// Queue a line whose endpoints are given in the local space of node `id`.
    /// Returns `false` if no such node exists.
    pub fn draw_3d_line_local(
        &mut self,
        id: u32,
        from: Vector3<f32>,
        to: Vector3<f32>,
        colour: [f32; 4],
    ) -> bool {
        let Some(world) = self
            .graph
            .find_by_id(id)
            .and_then(|key| self.graph.world_transform(key))
        else {
            return false;
        };
        let from = world.transform_point(cgmath::Point3::new(from.x, from.y, from.z));
        let to = world.transform_point(cgmath::Point3::new(to.x, to.y, to.z));
        self.draw_3d_line(
            Vector3::new(from.x, from.y, from.z),
            Vector3::new(to.x, to.y, to.z),
            colour,
        );
        true
    }

    pub fn debug_lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn clear_debug_lines(&mut self) {
        self.lines.clear();
    }

    /// Advance every particle system, visible or not.
    pub fn update(&mut self, elapsed: Duration) {
        let elapsed_ms = elapsed.as_secs_f32() * 1000.0;
        for key in self.keys_with(|entity| matches!(entity, Entity::ParticleSystem(_))) {
            if let Some(system) = self
                .graph
                .get_mut(key)
                .and_then(Node::entity_mut)
                .and_then(Entity::as_particle_system_mut)
            {
                system.update(elapsed_ms);
            }
        }
    }

    /// Compute this frame's view, projection and lights. Without an active
    /// camera the previous frame's matrices are reused.
    pub fn frame_context(&mut self, aspect: f32) -> FrameContext {
        if let Some(key) = self.get_active_camera_node() {
            let eye = self
                .graph
                .world_transform(key)
                .unwrap_or_default()
                .position();
            if let Some(camera) = self
                .graph
                .get_mut(key)
                .and_then(Node::entity_mut)
                .and_then(Entity::as_camera_mut)
            {
                camera.set_aspect(aspect);
                self.last_view = camera.view_matrix(eye);
                self.last_projection = camera.calculate_projection_matrix();
                self.last_eye = eye;
            }
        }

        let mut lights: Vec<PointLightRaw> = self
            .graph
            .iter()
            .filter_map(|(_, node, world)| {
                node.entity()
                    .and_then(Entity::as_point_light)
                    .map(|light| light.to_raw(world.position()))
            })
            .collect();
        if lights.len() > self.max_point_lights {
            if !self.reported_dropped_lights {
                warn!(
                    "{} point lights in the scene, only the first {} are used",
                    lights.len(),
                    self.max_point_lights
                );
                self.reported_dropped_lights = true;
            }
            lights.truncate(self.max_point_lights);
        }

        let light_space = self.shadow_mapping.as_ref().and_then(|shadow| {
            let key = self.graph.find_by_id(shadow.light_id())?;
            self.graph.get(key)?.entity()?.as_point_light()?;
            let light_position = self.graph.world_transform(key)?.position();
            let focus = self
                .target_active_camera()
                .unwrap_or_else(Vector3::zero);
            Some(shadow.light_space_matrix(light_position, focus))
        });

        FrameContext {
            view: self.last_view,
            projection: self.last_projection,
            eye: self.last_eye,
            lights,
            light_space,
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
