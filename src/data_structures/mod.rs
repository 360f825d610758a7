//! Engine data structures: the scene tree and the entities its nodes carry.
//!
//! - `scene_graph` is the arena tree of nodes, addressed by [`scene_graph::NodeKey`]
//! - `entity` is the closed set of node payloads and the `Drawable` trait
//! - `instance` holds a node's local transformation
//! - `camera`, `light`, `mesh`, `billboard` and `particles` are the payloads
//! - `skybox` and `shadow` are the scene-wide singletons
//! - `texture` contains GPU texture wrappers and the upload cache

pub mod billboard;
pub mod camera;
pub mod entity;
pub mod instance;
pub mod light;
pub mod mesh;
pub mod particles;
pub mod scene_graph;
pub mod shadow;
pub mod skybox;
pub mod texture;
