//! Scene graph and hierarchical scene organization.
//!
//! Nodes live in a [`SlotMap`] arena and refer to each other by [`NodeKey`].
//! Every node owns its children (an ordered list of keys) and knows its parent;
//! removing a node frees its whole subtree, after which old keys resolve to `None`.
//!
//! Callers address nodes by their own `u32` ids. Ids are unique in the tree and
//! looked up with a depth-first pre-order walk, children in insertion order.

use log::{debug, warn};
use slotmap::{SlotMap, new_key_type};

use crate::{
    data_structures::{
        entity::Entity,
        instance::{Instance, WorldTransform},
    },
    error::SceneError,
};

new_key_type! {
    /// Stable handle to a node. Becomes stale once the node is deleted.
    pub struct NodeKey;
}

/// Id of the root node created with every graph.
pub const ROOT_ID: u32 = 0;

#[derive(Debug)]
pub struct Node {
    id: u32,
    local: Instance,
    entity: Option<Entity>,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    visible: bool,
}

impl Node {
    fn new(id: u32, parent: Option<NodeKey>, entity: Option<Entity>) -> Self {
        Self {
            id,
            local: Instance::default(),
            entity,
            parent,
            children: Vec::new(),
            visible: true,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn local_transform(&self) -> &Instance {
        &self.local
    }

    pub fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    pub fn set_translation(&mut self, position: cgmath::Vector3<f32>) {
        self.local.position = position;
    }

    pub fn set_rotation(&mut self, rotation: cgmath::Quaternion<f32>) {
        self.local.rotation = rotation;
    }

    pub fn set_scale(&mut self, scale: cgmath::Vector3<f32>) {
        self.local.scale = scale;
    }

    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    pub fn entity_mut(&mut self) -> Option<&mut Entity> {
        self.entity.as_mut()
    }

    pub fn set_entity(&mut self, entity: Option<Entity>) -> Option<Entity> {
        std::mem::replace(&mut self.entity, entity)
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Hidden nodes are skipped together with their subtree when drawing.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, Node>,
    root: NodeKey,
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(ROOT_ID, None, None));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Insert a new node with `id` under `parent` (the root when `None`).
    ///
    /// Nothing changes when the id is taken or the parent key is stale.
    pub fn add_child(
        &mut self,
        parent: Option<NodeKey>,
        id: u32,
        entity: Option<Entity>,
    ) -> Result<NodeKey, SceneError> {
        let parent = parent.unwrap_or(self.root);
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::ParentNotFound);
        }
        if self.find_by_id(id).is_some() {
            return Err(SceneError::DuplicateId(id));
        }
        let kind = entity.as_ref().map_or("group", Entity::kind);
        let key = self.nodes.insert(Node::new(id, Some(parent), entity));
        self.nodes[parent].children.push(key);
        debug!("added {kind} node {id}");
        Ok(key)
    }

    pub fn find_by_id(&self, id: u32) -> Option<NodeKey> {
        self.find_by_id_from(self.root, id)
    }

    /// Pre-order search for `id` in the subtree rooted at `start`.
    pub fn find_by_id_from(&self, start: NodeKey, id: u32) -> Option<NodeKey> {
        if !self.nodes.contains_key(start) {
            return None;
        }
        let mut stack = vec![start];
        while let Some(key) = stack.pop() {
            let node = &self.nodes[key];
            if node.id == id {
                return Some(key);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    pub fn has_child(&self, parent: NodeKey, child: NodeKey) -> bool {
        self.nodes
            .get(parent)
            .is_some_and(|node| node.children.contains(&child))
    }

    /// Detach `child` from `parent` and free its subtree. Only direct children
    /// are removed; anything else returns `false` and leaves the tree untouched.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        if !self.has_child(parent, child) {
            return false;
        }
        self.nodes[parent].children.retain(|key| *key != child);
        self.free_subtree(child);
        true
    }

    pub fn delete_node(&mut self, id: u32) -> bool {
        match self.find_by_id(id) {
            Some(key) => self.delete_node_by_key(key),
            None => false,
        }
    }

    /// Remove a node and everything below it. The root cannot be deleted.
    pub fn delete_node_by_key(&mut self, key: NodeKey) -> bool {
        if key == self.root {
            warn!("the root node cannot be deleted");
            return false;
        }
        match self.nodes.get(key).and_then(|node| node.parent) {
            Some(parent) => self.remove_child(parent, key),
            None => false,
        }
    }

    fn free_subtree(&mut self, key: NodeKey) {
        let mut stack = vec![key];
        let mut freed = 0;
        while let Some(key) = stack.pop() {
            if let Some(node) = self.nodes.remove(key) {
                stack.extend(node.children);
                freed += 1;
            }
        }
        debug!("freed {freed} node(s)");
    }

    /// Product of all local transforms from the root down to `key`.
    pub fn world_transform(&self, key: NodeKey) -> Option<WorldTransform> {
        let mut node = self.nodes.get(key)?;
        let mut world = node.local.to_matrix();
        while let Some(parent) = node.parent {
            node = &self.nodes[parent];
            world = node.local.to_matrix() * world;
        }
        Some(WorldTransform(world))
    }

    /// Side length of the cube around the node's geometry in world scale.
    /// `None` for unknown ids and nodes without geometry.
    pub fn bounding_size(&self, id: u32) -> Option<f32> {
        let key = self.find_by_id(id)?;
        let extent = self.nodes[key].entity.as_ref()?.bounding_extent()?;
        let world = self.world_transform(key)?;
        Some(extent * world.max_scale())
    }

    /// Pre-order walk over every node with its world transform.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self, false)
    }

    /// Like [`iter`](Self::iter) but skips hidden nodes and their subtrees.
    pub fn iter_visible(&self) -> Iter<'_> {
        Iter::new(self, true)
    }

    /// Keys and world transforms in pre-order, for passes that need `get_mut`.
    pub fn collect_visible(&self) -> Vec<(NodeKey, WorldTransform)> {
        self.iter_visible()
            .map(|(key, _, world)| (key, world))
            .collect()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a> {
    graph: &'a SceneGraph,
    stack: Vec<(NodeKey, WorldTransform)>,
    visible_only: bool,
}

impl<'a> Iter<'a> {
    fn new(graph: &'a SceneGraph, visible_only: bool) -> Self {
        let root = &graph.nodes[graph.root];
        let stack = if visible_only && !root.visible {
            Vec::new()
        } else {
            vec![(graph.root, WorldTransform::from(&root.local))]
        };
        Self {
            graph,
            stack,
            visible_only,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (NodeKey, &'a Node, WorldTransform);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, world) = self.stack.pop()?;
        let node = &self.graph.nodes[key];
        for child_key in node.children.iter().rev() {
            let child = &self.graph.nodes[*child_key];
            if self.visible_only && !child.visible {
                continue;
            }
            self.stack.push((*child_key, world * &child.local));
        }
        Some((key, node, world))
    }
}
