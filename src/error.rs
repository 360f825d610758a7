//! Error types for scene-tree operations.
//!
//! Lookups that simply find nothing return `None`/`false`; the variants below
//! cover mutations that were rejected and left the tree untouched.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    /// A node with this id already exists somewhere in the tree.
    #[error("a node with id {0} already exists in the scene")]
    DuplicateId(u32),

    /// The parent key handed to a factory no longer refers to a live node.
    #[error("parent node does not exist (it may have been deleted)")]
    ParentNotFound,

    #[error("no node with id {0}")]
    NodeNotFound(u32),

    /// Shadow mapping must be bound to a point-light node.
    #[error("node {0} does not carry a point light")]
    NotAPointLight(u32),

    /// A mesh, texture or shader referenced by a factory failed to load.
    #[error("failed to load resource {path}: {source}")]
    Resource {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

impl SceneError {
    pub(crate) fn resource(path: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Resource {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SceneError>;
