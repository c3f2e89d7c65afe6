//! Arena-backed component tree
//!
//! Nodes are owned by the arena and addressed by [`NodeId`]. Each node keeps the
//! ordered ids of its children and the id of its parent, so upward queries never
//! alias the owning collection. Detached nodes stay in the arena but are no
//! longer reachable from any root.

use super::component::{ComponentModel, NodeId};
use serde::Serialize;
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ComponentTree {
    nodes: Vec<ComponentModel>,
}

impl ComponentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a node into the arena; any children/parent it carried are dropped
    pub fn insert(&mut self, mut model: ComponentModel) -> NodeId {
        let id = NodeId(self.nodes.len());
        model.id = id;
        model.inner_components.clear();
        model.parent = None;
        self.nodes.push(model);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&ComponentModel> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ComponentModel> {
        self.nodes.get_mut(id.0)
    }

    /// Attach `child` as the last child of `parent`, detaching it first if needed
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self[parent].inner_components.len();
        self.insert_child(parent, len, child);
    }

    /// Attach `child` at `index` under `parent`; an index past the end appends
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        debug_assert!(parent != child, "a node cannot be its own child");
        self.detach(child);
        let children = &mut self[parent].inner_components;
        let index = index.min(children.len());
        children.insert(index, child);
        self[child].parent = Some(parent);
    }

    /// Remove `child` from `parent`'s children; returns false if it was not there
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let children = &mut self[parent].inner_components;
        match children.iter().position(|c| *c == child) {
            Some(position) => {
                children.remove(position);
                self[child].parent = None;
                true
            }
            None => false,
        }
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(old_parent) = self[child].parent {
            self.remove_child(old_parent, child);
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].inner_components
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Pre-order walk of `root` and everything below it, children in order
    pub fn descendants(&self, root: NodeId) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: vec![root],
        }
    }
}

impl Index<NodeId> for ComponentTree {
    type Output = ComponentModel;

    fn index(&self, id: NodeId) -> &ComponentModel {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for ComponentTree {
    fn index_mut(&mut self, id: NodeId) -> &mut ComponentModel {
        &mut self.nodes[id.0]
    }
}

pub struct Ancestors<'a> {
    tree: &'a ComponentTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Lazy depth-first traversal; restarting yields the same order
pub struct PreOrder<'a> {
    tree: &'a ComponentTree,
    stack: Vec<NodeId>,
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(current).iter().rev().copied());
        Some(current)
    }
}
