//! Name lookup over the component tree

use crate::models::{ComponentTree, NodeId};
use std::collections::HashMap;
use tracing::debug;

/// Name to node maps, rebuilt from scratch whenever the tree shape changes
///
/// Collisions are last-write-wins here; reporting them is left to validation.
#[derive(Debug, Clone, Default)]
pub struct ComponentIndex {
    named: HashMap<String, NodeId>,
    named_top_level: HashMap<String, NodeId>,
}

impl ComponentIndex {
    pub fn build(tree: &ComponentTree, root: Option<NodeId>) -> Self {
        let mut index = Self::default();
        let Some(root) = root else {
            return index;
        };

        for id in tree.descendants(root) {
            if let Some(name) = tree[id].name_attribute() {
                index.named.insert(name.to_string(), id);
            }
        }
        for &id in tree.children(root) {
            if let Some(name) = tree[id].name_attribute() {
                index.named_top_level.insert(name.to_string(), id);
            }
        }

        debug!(
            named = index.named.len(),
            top_level = index.named_top_level.len(),
            "Indexed component names"
        );
        index
    }

    /// Named node anywhere in the tree, preferring top-level declarations
    pub fn find_named_element(&self, name: &str) -> Option<NodeId> {
        self.named_top_level
            .get(name)
            .or_else(|| self.named.get(name))
            .copied()
    }

    pub fn find_top_level_named_component(&self, name: &str) -> Option<NodeId> {
        self.named_top_level.get(name).copied()
    }

    pub fn named_count(&self) -> usize {
        self.named.len()
    }

    pub fn top_level_count(&self) -> usize {
        self.named_top_level.len()
    }
}
