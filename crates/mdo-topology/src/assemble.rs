//! Topology assembly from a validated coupling layout.

use mdo_core::{DisciplineKey, MdoError};

use crate::coupling::place_coupling;
use crate::node::GroupNode;
use crate::registry::SubsystemRegistry;
use crate::spec::{CouplingLayout, CouplingSpec, SchurPostPlacement};
use crate::strategy::{select_strategy, NodeRole, BALANCE_PARTITION, COUPLING_PARTITION};

/// Validates `spec` and assembles the scenario tree rooted at a node named `scenario`.
///
/// Configuration errors are raised before any builder is consulted. Builder
/// failures are returned as produced.
pub fn assemble_topology(
    spec: &CouplingSpec,
    registry: &mut SubsystemRegistry,
    scenario: &str,
) -> Result<GroupNode, MdoError> {
    let layout = spec.validate()?;
    assemble_layout(&layout, registry, scenario)
}

/// Assembles the tree for an already validated layout.
pub fn assemble_layout(
    layout: &CouplingLayout,
    registry: &mut SubsystemRegistry,
    scenario: &str,
) -> Result<GroupNode, MdoError> {
    let mut root = GroupNode::new(scenario);
    assemble_into(&mut root, layout, registry, scenario)?;
    Ok(root)
}

/// Appends the coupling topology to `root`, after whatever it already holds.
pub(crate) fn assemble_into(
    root: &mut GroupNode,
    layout: &CouplingLayout,
    registry: &mut SubsystemRegistry,
    scenario: &str,
) -> Result<(), MdoError> {
    if layout.balance_group {
        assemble_partitioned(root, layout, registry, scenario)?;
        root.set_strategy(select_strategy(NodeRole::PassThrough, &layout.solver));
    } else {
        push_pre_coupling(root, layout, registry, scenario)?;
        place_coupling(root, layout, registry, scenario)?;
        push_post_coupling(root, layout, registry, scenario)?;
        let role = if root.has_strategy_below() {
            NodeRole::PassThrough
        } else {
            NodeRole::Sequence
        };
        root.set_strategy(select_strategy(role, &layout.solver));
    }
    Ok(())
}

fn assemble_partitioned(
    root: &mut GroupNode,
    layout: &CouplingLayout,
    registry: &mut SubsystemRegistry,
    scenario: &str,
) -> Result<(), MdoError> {
    let designated = layout.schur_aware_discipline();
    let mut partition = GroupNode::new(COUPLING_PARTITION);
    push_pre_coupling(&mut partition, layout, registry, scenario)?;
    place_coupling(&mut partition, layout, registry, scenario)?;

    let placement = layout.kind.schur_post_placement();
    let mut placed_schur_post = None;
    match placement {
        SchurPostPlacement::Partition => {
            for key in &layout.post_coupling_order {
                let mut handle = None;
                if designated == Some(*key) {
                    handle = registry.post_coupling_for_schur(*key, scenario)?;
                }
                if handle.is_none() {
                    handle = registry.post_coupling(*key, scenario)?;
                }
                if let Some(handle) = handle {
                    partition.push_leaf(post_name(*key), handle)?;
                }
            }
        }
        SchurPostPlacement::Designated { .. } => {
            if let Some(key) = designated {
                match registry.post_coupling_for_schur(key, scenario)? {
                    Some(handle) => {
                        partition.push_leaf(post_name(key), handle)?;
                        placed_schur_post = Some(key);
                    }
                    None => tracing::warn!(
                        scenario,
                        discipline = %key,
                        "no Schur-aware post-coupling subsystem; coupling partition ends at the coupling node"
                    ),
                }
            }
        }
    }
    partition.set_strategy(select_strategy(NodeRole::Sequence, &layout.solver));

    let mut schur = GroupNode::new(layout.kind.schur_node_name());
    schur.push_group(partition)?;
    schur.push_leaf(BALANCE_PARTITION, registry.balance_group()?)?;
    schur.set_strategy(select_strategy(NodeRole::PartitionedCoupling, &layout.solver));
    root.push_group(schur)?;

    if let SchurPostPlacement::Designated { repeat_outside } = placement {
        for key in &layout.post_coupling_order {
            if placed_schur_post == Some(*key) && !repeat_outside {
                continue;
            }
            if let Some(handle) = registry.post_coupling(*key, scenario)? {
                root.push_leaf(post_name(*key), handle)?;
            }
        }
    }
    Ok(())
}

fn push_pre_coupling(
    parent: &mut GroupNode,
    layout: &CouplingLayout,
    registry: &mut SubsystemRegistry,
    scenario: &str,
) -> Result<(), MdoError> {
    for key in &layout.pre_coupling_order {
        if let Some(handle) = registry.pre_coupling(*key, scenario)? {
            parent.push_leaf(format!("{key}_pre"), handle)?;
        }
    }
    Ok(())
}

fn push_post_coupling(
    parent: &mut GroupNode,
    layout: &CouplingLayout,
    registry: &mut SubsystemRegistry,
    scenario: &str,
) -> Result<(), MdoError> {
    for key in &layout.post_coupling_order {
        if let Some(handle) = registry.post_coupling(*key, scenario)? {
            parent.push_leaf(post_name(*key), handle)?;
        }
    }
    Ok(())
}

fn post_name(key: DisciplineKey) -> String {
    format!("{key}_post")
}
