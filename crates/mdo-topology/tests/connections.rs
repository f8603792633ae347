mod common;

use mdo_core::{DisciplineKey, MdoError};
use mdo_topology::{build_scenario, Connection, CouplingGroupType, CouplingSpec};

fn sources(connections: &[Connection]) -> Vec<(&str, &str)> {
    connections
        .iter()
        .map(|c| (c.source.as_str(), c.target.as_str()))
        .collect()
}

#[test]
fn direct_coupling_paths_without_balance() {
    let mut registry = common::aeropropulsive_registry();
    let mut scenario =
        build_scenario(&CouplingSpec::aeropropulsive(), "cruise", &mut registry, None).unwrap();
    scenario
        .connect_cross_discipline(DisciplineKey::Aero, DisciplineKey::Prop, &[("fpr", "fan_pr")])
        .unwrap();
    scenario
        .connect_cross_discipline(DisciplineKey::Prop, DisciplineKey::Aero, &[("area", "area_in")])
        .unwrap();

    assert_eq!(
        sources(scenario.connections()),
        [
            ("coupling.aero.fpr", "coupling.prop.fan_pr"),
            ("coupling.prop.area", "coupling.aero.area_in"),
        ]
    );
}

#[test]
fn both_endpoints_route_through_the_schur_partition() {
    let mut registry = common::aeropropulsive_registry().with_balance_group(common::balance("cruise"));
    let spec = CouplingSpec::aeropropulsive().with_balance_group(true);
    let mut scenario = build_scenario(&spec, "cruise", &mut registry, None).unwrap();
    assert_eq!(
        scenario.layout().coupling_group_path(),
        "coupling_schur.coupling_group.coupling"
    );

    scenario
        .connect_cross_discipline(DisciplineKey::Aero, DisciplineKey::Prop, &[("fpr", "fan_pr")])
        .unwrap();
    assert_eq!(
        sources(scenario.connections()),
        [(
            "coupling_schur.coupling_group.coupling.aero.fpr",
            "coupling_schur.coupling_group.coupling.prop.fan_pr"
        )]
    );
}

#[test]
fn aerostructural_connections_use_the_aerostruct_wrapper() {
    let mut registry =
        common::aerostructural_registry().with_balance_group(common::balance("cruise"));
    let spec = CouplingSpec::aerostructural().with_balance_group(true);
    let mut scenario = build_scenario(&spec, "cruise", &mut registry, None).unwrap();
    scenario
        .connect_cross_discipline(DisciplineKey::Struct, DisciplineKey::Aero, &[("u", "u_in")])
        .unwrap();
    assert_eq!(
        scenario.connections()[0].source,
        "coupling_aerostruct.coupling_group.coupling.struct.u"
    );

    let err = scenario
        .connect_cross_discipline(DisciplineKey::Ldxfer, DisciplineKey::Aero, &[("f", "f")])
        .unwrap_err();
    assert_eq!(err.info().code, "unknown-connection-endpoint");
    assert_eq!(scenario.connections().len(), 1);
}

#[test]
fn endpoints_must_exist_in_the_coupling_group() {
    let mut registry = common::aeropropulsive_registry();
    let spec = CouplingSpec::aeropropulsive()
        .with_coupling_group_type(CouplingGroupType::SingleDisciplineOnly(DisciplineKey::Aero));
    let mut scenario = build_scenario(&spec, "cruise", &mut registry, None).unwrap();
    let err = scenario
        .connect_cross_discipline(DisciplineKey::Aero, DisciplineKey::Prop, &[("fpr", "fan_pr")])
        .unwrap_err();

    match err {
        MdoError::Topology(info) => {
            assert_eq!(info.context["path"], "coupling.aero");
            assert_eq!(info.context["scenario"], "cruise");
        }
        other => panic!("expected topology error, found {other:?}"),
    }
    assert!(scenario.connections().is_empty());
}
