//! Rewrites applied to the tree once it is built
//!
//! Passes relocate or rename, they never drop information, and running any of
//! them twice leaves the tree as after the first run.

use crate::models::{well_known, BuildingDefinitionRegistry, ComponentTree, NodeId, NAME_ATTRIBUTE};
use tracing::debug;

/// Give singletons the name they are registered under
///
/// Top-level components whose building definition carries a registration name
/// get that name as their `name` parameter, so later lookups and the singleton
/// uniqueness check see the process-wide name.
pub fn apply_registration_names(
    tree: &mut ComponentTree,
    root: NodeId,
    definitions: &dyn BuildingDefinitionRegistry,
) -> usize {
    let top_level = tree.children(root).to_vec();
    let mut renamed = 0;

    for id in top_level {
        let Some(registration_name) = definitions
            .building_definition(tree[id].identifier())
            .and_then(|definition| definition.registration_name)
        else {
            continue;
        };

        if tree[id].name_attribute() != Some(registration_name.as_str()) {
            tree[id].set_parameter(NAME_ATTRIBUTE, registration_name);
            renamed += 1;
        }
    }

    if renamed > 0 {
        debug!(renamed, "Applied registration names");
    }
    renamed
}

/// Run the fixed sequence of structural rewrites
pub fn create_effective_model(tree: &mut ComponentTree, root: NodeId) {
    let moved = relocate_source_redelivery_policies(tree, root);
    if moved > 0 {
        debug!(moved, "Relocated source redelivery policies");
    }
}

/// Lift a flow source's `redelivery-policy` elements to the flow, right after
/// the source and in their original order
pub fn relocate_source_redelivery_policies(tree: &mut ComponentTree, root: NodeId) -> usize {
    let flow = well_known::flow();
    let redelivery_policy = well_known::redelivery_policy();

    let flows: Vec<NodeId> = tree
        .children(root)
        .iter()
        .copied()
        .filter(|id| tree[*id].identifier() == &flow)
        .collect();

    let mut moved = 0;
    for flow_id in flows {
        let Some(&source) = tree.children(flow_id).first() else {
            continue;
        };
        let policies: Vec<NodeId> = tree
            .children(source)
            .iter()
            .copied()
            .filter(|id| tree[*id].identifier() == &redelivery_policy)
            .collect();

        for (offset, policy) in policies.into_iter().enumerate() {
            tree.insert_child(flow_id, 1 + offset, policy);
            moved += 1;
        }
    }
    moved
}
