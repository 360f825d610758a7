//! spark-ngin
//!
//! The scene-graph and rendering core of a small real-time 3D engine. A
//! hierarchical node tree holds meshes, point lights, cameras, particle
//! systems and billboards; a skybox and one shadow-casting light can be
//! attached to the scene. Every frame is rendered by a fixed forward pipeline
//! built on `wgpu`.
//!
//! High-level modules
//! - `config`: engine start-up configuration
//! - `context`: window surface, device and queue
//! - `data_structures`: node tree and the entity payloads nodes carry
//! - `engine`: window, event pumping and the per-frame call sequence
//! - `error`: typed errors of scene mutations
//! - `pipelines`: render pipelines, bind group layouts and the built-in shaders
//! - `render`: per-frame pass sequence
//! - `resources`: cached loading of meshes, textures and shaders
//! - `scene`: the headless scene with its factories, queries and frame state
//!

pub mod config;
pub mod context;
pub mod data_structures;
pub mod engine;
pub mod error;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

pub use config::EngineConfig;
pub use data_structures::scene_graph::{NodeKey, ROOT_ID};
pub use engine::{Engine, Overlay};
pub use error::SceneError;
pub use scene::{FrameContext, Scene};

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit::event::WindowEvent;
