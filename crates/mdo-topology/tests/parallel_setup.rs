mod common;

use common::child_names;
use mdo_core::{Communicator, DisciplineKey};
use mdo_topology::{
    build_scenario, BuilderManifest, Connection, CouplingSpec, ManifestBuilder, PlaceholderSubsystem,
};

fn connection(source: &str, target: &str) -> Connection {
    Connection {
        source: source.to_string(),
        target: target.to_string(),
    }
}

#[test]
fn parallel_aerostructural_adds_meshes_and_geometry() {
    let mut registry = common::aerostructural_registry()
        .with_geometry_builder(ManifestBuilder::new("geometry", BuilderManifest::default()));
    let spec = CouplingSpec::aerostructural()
        .with_geometry(true)
        .with_multipoint_parallel(true);
    let comm = Communicator::new("world", 8_usize);
    let scenario = build_scenario(&spec, "cruise", &mut registry, Some(&comm)).unwrap();
    let root = scenario.root();

    assert_eq!(&child_names(root)[..4], ["aero_mesh", "struct_mesh", "geometry", "aero_pre"]);
    assert_eq!(
        scenario.connections(),
        [
            connection("aero_mesh.x_aero0", "geometry.x_aero_in"),
            connection("struct_mesh.x_struct0", "geometry.x_struct_in"),
        ]
    );
    for key in [DisciplineKey::Aero, DisciplineKey::Struct, DisciplineKey::Ldxfer] {
        assert!(registry.is_initialized(key));
    }
    assert_eq!(root.leaf_count(), registry.issued().len());
}

#[test]
fn communicator_reaches_every_builder_subsystem() {
    let mut registry = common::aerostructural_registry()
        .with_geometry_builder(ManifestBuilder::new("geometry", BuilderManifest::default()));
    let spec = CouplingSpec::aerostructural()
        .with_geometry(true)
        .with_multipoint_parallel(true);
    let comm = Communicator::new("world", ());
    let scenario = build_scenario(&spec, "cruise", &mut registry, Some(&comm)).unwrap();

    for (path, leaf) in scenario.root().leaves() {
        if path == "coupling.geo_disp" {
            continue;
        }
        let payload = leaf
            .handle()
            .downcast_ref::<PlaceholderSubsystem>()
            .unwrap_or_else(|| panic!("{path} is not a placeholder"));
        assert_eq!(payload.comm.as_deref(), Some("world"), "{path}");
    }
}

#[test]
fn parallel_aerodynamic_without_geometry_connects_mesh_coordinates() {
    let mut registry = common::aerodynamic_registry();
    let spec = CouplingSpec::aerodynamic().with_multipoint_parallel(true);
    let scenario = build_scenario(&spec, "cruise", &mut registry, None).unwrap();

    assert_eq!(child_names(scenario.root()), ["mesh", "aero_pre", "coupling", "aero_post"]);
    assert_eq!(scenario.connections(), [connection("x_aero0", "x_aero")]);

    let mesh = scenario.root().child("mesh").and_then(|child| child.as_leaf()).unwrap();
    let payload = mesh.handle().downcast_ref::<PlaceholderSubsystem>().unwrap();
    assert_eq!(payload.comm.as_deref(), Some("serial"));
}

#[test]
fn parallel_aerodynamic_with_balance_keeps_meshes_outside_schur() {
    let mut registry = common::aerodynamic_registry()
        .with_geometry_builder(ManifestBuilder::new("geometry", BuilderManifest::default()))
        .with_balance_group(common::balance("cruise"));
    let spec = CouplingSpec::aerodynamic()
        .with_balance_group(true)
        .with_geometry(true)
        .with_multipoint_parallel(true);
    let scenario = build_scenario(&spec, "cruise", &mut registry, None).unwrap();

    assert_eq!(
        child_names(scenario.root()),
        ["mesh", "geometry", "coupling_schur", "aero_post"]
    );
    assert_eq!(
        scenario.connections(),
        [
            connection("mesh.x_aero0", "geometry.x_aero_in"),
            connection("x_aero0", "x_aero"),
        ]
    );
    assert!(scenario.root().strategy().is_none());
}

#[test]
fn aeropropulsive_meshes_only_the_aero_surface() {
    let mut registry = common::aeropropulsive_registry();
    let spec = CouplingSpec::aeropropulsive().with_multipoint_parallel(true);
    let scenario = build_scenario(&spec, "takeoff", &mut registry, None).unwrap();

    assert_eq!(child_names(scenario.root())[0], "aero_mesh");
    assert!(scenario.root().child("prop_mesh").is_none());
    assert!(scenario.connections().is_empty());
    assert!(registry.is_initialized(DisciplineKey::Prop));
}

#[test]
fn geometry_requires_a_geometry_builder() {
    let mut registry = common::aerodynamic_registry();
    let spec = CouplingSpec::aerodynamic()
        .with_geometry(true)
        .with_multipoint_parallel(true);
    let err = build_scenario(&spec, "cruise", &mut registry, None).unwrap_err();
    assert_eq!(err.info().code, "missing-geometry-builder");
}

#[test]
fn serial_setup_leaves_meshes_upstream() {
    let mut registry = common::aerostructural_registry();
    let spec = CouplingSpec::aerostructural().with_geometry(true);
    let scenario = build_scenario(&spec, "cruise", &mut registry, None).unwrap();

    assert_eq!(child_names(scenario.root())[0], "aero_pre");
    assert!(scenario.connections().is_empty());
    assert!(!registry.is_initialized(DisciplineKey::Aero));
    let payload = scenario
        .root()
        .find("aero_pre")
        .and_then(|child| child.as_leaf())
        .and_then(|leaf| leaf.handle().downcast_ref::<PlaceholderSubsystem>())
        .unwrap();
    assert_eq!(payload.comm, None);
}

#[test]
fn provenance_carries_spec_and_topology_hashes() {
    let spec = CouplingSpec::aerostructural();
    let mut registry = common::aerostructural_registry();
    let scenario = build_scenario(&spec, "cruise", &mut registry, None).unwrap();
    let provenance = scenario.provenance();

    assert_eq!(provenance.scenario, "cruise");
    assert_eq!(provenance.spec_hash, mdo_topology::spec_hash(&spec).unwrap());
    assert_eq!(
        provenance.topology_hash,
        mdo_topology::topology_hash(scenario.root()).unwrap()
    );
    assert_eq!(provenance.topology_hash.len(), 64);
    assert!(provenance.tool_versions.contains_key("mdo-topology"));
}

#[test]
fn scenario_hands_over_its_tree() {
    let mut registry = common::aerodynamic_registry();
    let comm = Communicator::new("world", 2_usize);
    let spec = CouplingSpec::aerodynamic().with_multipoint_parallel(true);
    let scenario = build_scenario(&spec, "cruise", &mut registry, Some(&comm)).unwrap();
    let outline = scenario.root().outline();

    let root = scenario.into_root();
    assert_eq!(root.name(), "cruise");
    assert_eq!(root.outline(), outline);
    assert_eq!(comm.downcast_ref::<usize>(), Some(&2));
    assert!(comm.downcast_ref::<String>().is_none());
}
