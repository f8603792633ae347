//! Content of the coupling slot for each scenario kind.

use mdo_core::{CouplingSubsystem, DisciplineKey, ErrorInfo, MdoError, SubsystemHandle};

use crate::node::GroupNode;
use crate::registry::SubsystemRegistry;
use crate::spec::{CouplingGroupType, CouplingLayout, ScenarioKind};
use crate::strategy::{select_strategy, NodeRole};
use crate::COUPLING_NODE;

fn expect_single(key: DisciplineKey, coupling: CouplingSubsystem) -> Result<SubsystemHandle, MdoError> {
    match coupling {
        CouplingSubsystem::Single(handle) => Ok(handle),
        CouplingSubsystem::Transfer { .. } => Err(MdoError::Builder(
            ErrorInfo::new("unexpected-transfer-pair", "builder returned a transfer pair")
                .with_context("discipline", key.as_str()),
        )),
    }
}

fn expect_transfer(
    key: DisciplineKey,
    coupling: CouplingSubsystem,
) -> Result<(SubsystemHandle, SubsystemHandle), MdoError> {
    match coupling {
        CouplingSubsystem::Transfer { displacement, load } => Ok((displacement, load)),
        CouplingSubsystem::Single(_) => Err(MdoError::Builder(
            ErrorInfo::new(
                "expected-transfer-pair",
                "transfer builder must return displacement and load subsystems",
            )
            .with_context("discipline", key.as_str()),
        )),
    }
}

/// Places the coupling slot selected by the layout into `parent`.
pub(crate) fn place_coupling(
    parent: &mut GroupNode,
    layout: &CouplingLayout,
    registry: &mut SubsystemRegistry,
    scenario: &str,
) -> Result<(), MdoError> {
    match layout.coupling_group_type {
        CouplingGroupType::FullCoupling => {
            let group = full_coupling_group(layout, registry, scenario)?;
            parent.push_group(group)
        }
        CouplingGroupType::SingleDisciplineOnly(key) => {
            let handle = expect_single(key, registry.coupling(key, scenario)?)?;
            parent.push_leaf(layout.kind.single_discipline_node_name(key), handle)
        }
        CouplingGroupType::NoCoupling => Ok(()),
    }
}

fn full_coupling_group(
    layout: &CouplingLayout,
    registry: &mut SubsystemRegistry,
    scenario: &str,
) -> Result<GroupNode, MdoError> {
    let mut group = GroupNode::new(COUPLING_NODE);
    match layout.kind {
        ScenarioKind::Aerodynamic => {
            let aero = registry.coupling(DisciplineKey::Aero, scenario)?;
            group.push_leaf("aero", expect_single(DisciplineKey::Aero, aero)?)?;
        }
        ScenarioKind::AeroStructural => {
            let transfer = registry.coupling(DisciplineKey::Ldxfer, scenario)?;
            let (disp_xfer, load_xfer) = expect_transfer(DisciplineKey::Ldxfer, transfer)?;
            let geo_disp = registry.geo_disp(scenario)?;
            let aero = registry.coupling(DisciplineKey::Aero, scenario)?;
            let structure = registry.coupling(DisciplineKey::Struct, scenario)?;

            group.push_leaf("disp_xfer", disp_xfer)?;
            group.push_leaf("geo_disp", geo_disp)?;
            group.push_leaf("aero", expect_single(DisciplineKey::Aero, aero)?)?;
            group.push_leaf("load_xfer", load_xfer)?;
            group.push_leaf("struct", expect_single(DisciplineKey::Struct, structure)?)?;
        }
        ScenarioKind::AeroPropulsive => {
            let aero = registry.coupling(DisciplineKey::Aero, scenario)?;
            group.push_leaf("aero", expect_single(DisciplineKey::Aero, aero)?)?;
            let prop = registry.coupling(DisciplineKey::Prop, scenario)?;
            group.push_leaf("prop", expect_single(DisciplineKey::Prop, prop)?)?;
            if let Some(balance) = registry.balance_coupling(scenario)? {
                group.push_leaf("balance", balance)?;
            }
        }
    }
    group.set_strategy(select_strategy(NodeRole::TightCoupling, &layout.solver));
    Ok(group)
}
