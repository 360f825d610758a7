//! Particle systems: a fixed pool of textured quads spawned in batches from an
//! emitter shape and recycled when their lifespan runs out.

use std::ops::Range;
use std::sync::Arc;

use bitflags::bitflags;
use cgmath::{Deg, Euler, InnerSpace, Quaternion, Vector3, Zero};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::{
    data_structures::{entity::Drawable, instance::WorldTransform, mesh::Vertex},
    render::{DrawContext, PrepareContext, UniformBinding},
    resources::texture::TextureData,
};

bitflags! {
    /// Optional per-particle behaviour.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ParticleEffects: u8 {
        /// Each particle flies in a random direction at the configured speed.
        const RANDOM_DIRECTION = 1 << 0;
        /// Opacity falls linearly to zero over the lifespan.
        const FADE_OUT = 1 << 1;
        /// Size falls linearly to zero over the lifespan.
        const SHRINK = 1 << 2;
        /// Spawn the whole pool once, then stop emitting.
        const ONE_SHOT = 1 << 3;
    }
}

/// Where new particles appear, in the emitter node's local space.
///
/// Orientations are Euler angles in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EmitterShape {
    Point,
    /// Line, square or cube depending on how many `offset` components are
    /// non-zero. `offset` holds the half extents along each axis.
    Box {
        offset: Vector3<f32>,
        orientation: Vector3<f32>,
    },
    Sphere {
        radius: f32,
    },
    /// Disc in the local XZ plane, turned by `orientation`.
    Circle {
        radius: f32,
        orientation: Vector3<f32>,
    },
}

/// Parameters for [`crate::scene::Scene::add_particle_system`].
#[derive(Clone, Debug)]
pub struct ParticleSystemConfig {
    pub shape: EmitterShape,
    /// Size of the particle pool.
    pub count: u32,
    /// Units per second.
    pub velocity: Vector3<f32>,
    /// Each particle picks one of these at random. Empty means plain white quads.
    pub textures: Vec<String>,
    pub width: f32,
    pub height: f32,
    /// Milliseconds between two batches.
    pub spawn_delay_ms: u32,
    /// Particles spawned per batch.
    pub batch_size: u32,
    pub lifespan_ms: u32,
    pub effects: ParticleEffects,
}

impl Default for ParticleSystemConfig {
    fn default() -> Self {
        Self {
            shape: EmitterShape::Point,
            count: 100,
            velocity: Vector3::new(0.0, 1.0, 0.0),
            textures: Vec::new(),
            width: 1.0,
            height: 1.0,
            spawn_delay_ms: 100,
            batch_size: 10,
            lifespan_ms: 2000,
            effects: ParticleEffects::empty(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub age_ms: f32,
    pub texture: usize,
    pub alive: bool,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            velocity: Vector3::zero(),
            age_ms: 0.0,
            texture: 0,
            alive: false,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub alpha: f32,
    pub size: [f32; 2],
    _padding: [f32; 2],
}

impl Vertex for ParticleInstance {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ParticleInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

#[derive(Debug)]
struct ParticlesGpu {
    instances: wgpu::Buffer,
    model: UniformBinding,
    materials: Vec<wgpu::BindGroup>,
    batches: Vec<(usize, Range<u32>)>,
}

#[derive(Debug)]
pub struct ParticleSystem {
    shape: EmitterShape,
    velocity: Vector3<f32>,
    width: f32,
    height: f32,
    spawn_delay_ms: f32,
    batch_size: u32,
    lifespan_ms: f32,
    effects: ParticleEffects,
    textures: Vec<Arc<TextureData>>,
    pool: Vec<Particle>,
    since_spawn_ms: f32,
    emitting: bool,
    rng: StdRng,
    gpu: Option<ParticlesGpu>,
}

impl ParticleSystem {
    /// `textures` must already be loaded. `seed` makes spawning reproducible.
    pub fn new(config: &ParticleSystemConfig, textures: Vec<Arc<TextureData>>, seed: u64) -> Self {
        Self {
            shape: config.shape,
            velocity: config.velocity,
            width: config.width,
            height: config.height,
            spawn_delay_ms: config.spawn_delay_ms as f32,
            batch_size: config.batch_size,
            lifespan_ms: config.lifespan_ms as f32,
            effects: config.effects,
            textures,
            pool: vec![Particle::default(); config.count as usize],
            // the first update spawns a batch right away
            since_spawn_ms: config.spawn_delay_ms as f32,
            emitting: true,
            rng: StdRng::seed_from_u64(seed),
            gpu: None,
        }
    }

    pub fn shape(&self) -> EmitterShape {
        self.shape
    }

    pub fn effects(&self) -> ParticleEffects {
        self.effects
    }

    pub fn capacity(&self) -> usize {
        self.pool.len()
    }

    pub fn alive_count(&self) -> usize {
        self.pool.iter().filter(|particle| particle.alive).count()
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.pool.iter().filter(|particle| particle.alive)
    }

    pub fn is_emitting(&self) -> bool {
        self.emitting
    }

    /// Pause or resume spawning. Live particles keep ageing either way.
    pub fn set_emitting(&mut self, emitting: bool) {
        self.emitting = emitting;
    }

    /// Advance the simulation by `elapsed_ms`: age and move live particles,
    /// return expired ones to the pool, then spawn due batches.
    pub fn update(&mut self, elapsed_ms: f32) {
        let seconds = elapsed_ms / 1000.0;
        let lifespan = self.lifespan_ms;
        for particle in self.pool.iter_mut().filter(|particle| particle.alive) {
            particle.age_ms += elapsed_ms;
            particle.position += particle.velocity * seconds;
            if particle.age_ms >= lifespan {
                particle.alive = false;
            }
        }

        if !self.emitting {
            return;
        }
        if self.effects.contains(ParticleEffects::ONE_SHOT) {
            let capacity = self.pool.len();
            self.spawn(capacity);
            self.emitting = false;
            return;
        }

        self.since_spawn_ms += elapsed_ms;
        while self.since_spawn_ms >= self.spawn_delay_ms {
            self.since_spawn_ms -= self.spawn_delay_ms;
            let spawned = self.spawn(self.batch_size as usize);
            if spawned == 0 || self.spawn_delay_ms <= 0.0 {
                self.since_spawn_ms = 0.0;
                break;
            }
        }
    }

    /// Revive up to `amount` pooled particles. Returns how many were spawned.
    fn spawn(&mut self, amount: usize) -> usize {
        let mut spawned = 0;
        for index in 0..self.pool.len() {
            if spawned == amount {
                break;
            }
            if self.pool[index].alive {
                continue;
            }
            let particle = Particle {
                position: self.spawn_position(),
                velocity: self.spawn_velocity(),
                age_ms: 0.0,
                texture: self.rng.random_range(0..self.textures.len().max(1)),
                alive: true,
            };
            self.pool[index] = particle;
            spawned += 1;
        }
        spawned
    }

    fn spawn_velocity(&mut self) -> Vector3<f32> {
        if !self.effects.contains(ParticleEffects::RANDOM_DIRECTION) {
            return self.velocity;
        }
        self.random_direction() * self.velocity.magnitude()
    }

    fn random_direction(&mut self) -> Vector3<f32> {
        loop {
            let candidate = Vector3::new(
                self.rng.random_range(-1.0..=1.0f32),
                self.rng.random_range(-1.0..=1.0f32),
                self.rng.random_range(-1.0..=1.0f32),
            );
            let length2 = candidate.magnitude2();
            if length2 > 1e-6 && length2 <= 1.0 {
                return candidate / length2.sqrt();
            }
        }
    }

    fn spawn_position(&mut self) -> Vector3<f32> {
        match self.shape {
            EmitterShape::Point => Vector3::zero(),
            EmitterShape::Box {
                offset,
                orientation,
            } => {
                let local = Vector3::new(
                    self.rng.random_range(-1.0..=1.0f32) * offset.x,
                    self.rng.random_range(-1.0..=1.0f32) * offset.y,
                    self.rng.random_range(-1.0..=1.0f32) * offset.z,
                );
                orientation_quaternion(orientation) * local
            }
            EmitterShape::Sphere { radius } => {
                let distance = radius * self.rng.random_range(0.0..=1.0f32).cbrt();
                self.random_direction() * distance
            }
            EmitterShape::Circle {
                radius,
                orientation,
            } => {
                let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
                let distance = radius * self.rng.random_range(0.0..=1.0f32).sqrt();
                let local = Vector3::new(distance * angle.cos(), 0.0, distance * angle.sin());
                orientation_quaternion(orientation) * local
            }
        }
    }

    fn instance(&self, particle: &Particle) -> ParticleInstance {
        let remaining = if self.lifespan_ms > 0.0 {
            (1.0 - particle.age_ms / self.lifespan_ms).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let alpha = if self.effects.contains(ParticleEffects::FADE_OUT) {
            remaining
        } else {
            1.0
        };
        let scale = if self.effects.contains(ParticleEffects::SHRINK) {
            remaining
        } else {
            1.0
        };
        ParticleInstance {
            position: particle.position.into(),
            alpha,
            size: [self.width * scale, self.height * scale],
            _padding: [0.0; 2],
        }
    }

    /// Live particles ordered by texture, plus the instance range of each texture.
    fn batched_instances(&self) -> (Vec<ParticleInstance>, Vec<(usize, Range<u32>)>) {
        let mut live: Vec<&Particle> = self.particles().collect();
        live.sort_by_key(|particle| particle.texture);

        let instances = live.iter().map(|particle| self.instance(particle)).collect();
        let mut batches: Vec<(usize, Range<u32>)> = Vec::new();
        for (index, particle) in live.iter().enumerate() {
            let index = index as u32;
            match batches.last_mut() {
                Some((texture, range)) if *texture == particle.texture => range.end = index + 1,
                _ => batches.push((particle.texture, index..index + 1)),
            }
        }
        (instances, batches)
    }
}

fn orientation_quaternion(orientation: Vector3<f32>) -> Quaternion<f32> {
    Quaternion::from(Euler::new(
        Deg(orientation.x),
        Deg(orientation.y),
        Deg(orientation.z),
    ))
}

impl Drawable for ParticleSystem {
    fn prepare(&mut self, world: &WorldTransform, gpu: &mut PrepareContext<'_>) -> anyhow::Result<()> {
        let (instances, batches) = self.batched_instances();
        let uniform = world.to_raw();

        if self.gpu.is_none() {
            let capacity = self.pool.len().max(1);
            let instance_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("particle instances"),
                size: (capacity * std::mem::size_of::<ParticleInstance>()) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let materials = if self.textures.is_empty() {
                let white = gpu.cache.texture_or_white(gpu.device, gpu.queue, None);
                vec![white.bind_group(gpu.device, &gpu.layouts.texture, "particle material")]
            } else {
                self.textures
                    .iter()
                    .map(|data| {
                        gpu.cache
                            .texture(gpu.device, gpu.queue, data)
                            .bind_group(gpu.device, &gpu.layouts.texture, "particle material")
                    })
                    .collect()
            };
            let model = UniformBinding::new(gpu.device, &gpu.layouts.model, &uniform, "emitter");
            self.gpu = Some(ParticlesGpu {
                instances: instance_buffer,
                model,
                materials,
                batches: Vec::new(),
            });
        }

        if let Some(particles_gpu) = &mut self.gpu {
            particles_gpu.model.write(gpu.queue, &uniform);
            if !instances.is_empty() {
                gpu.queue.write_buffer(
                    &particles_gpu.instances,
                    0,
                    bytemuck::cast_slice(&instances),
                );
            }
            particles_gpu.batches = batches;
        }
        Ok(())
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, ctx: &DrawContext<'_>) {
        let Some(particles_gpu) = &self.gpu else {
            return;
        };
        if particles_gpu.batches.is_empty() {
            return;
        }
        pass.set_pipeline(&ctx.pipelines.particles);
        pass.set_bind_group(0, ctx.frame, &[]);
        pass.set_bind_group(1, &particles_gpu.model.bind_group, &[]);
        pass.set_vertex_buffer(0, particles_gpu.instances.slice(..));
        for (texture, range) in &particles_gpu.batches {
            let Some(material) = particles_gpu.materials.get(*texture) else {
                continue;
            };
            pass.set_bind_group(2, material, &[]);
            pass.draw(0..6, range.clone());
        }
    }

    fn bounding_extent(&self) -> Option<f32> {
        let quad = self.width.max(self.height);
        let emitter = match self.shape {
            EmitterShape::Point => 0.0,
            EmitterShape::Box { offset, .. } => {
                2.0 * offset.x.abs().max(offset.y.abs()).max(offset.z.abs())
            }
            EmitterShape::Sphere { radius } | EmitterShape::Circle { radius, .. } => 2.0 * radius,
        };
        Some(emitter + quad)
    }
}
