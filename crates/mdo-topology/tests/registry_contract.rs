mod common;

use mdo_core::{DisciplineKey, ErrorInfo, MdoError};
use mdo_topology::{
    assemble_topology, BuilderManifest, CouplingSpec, IssuedHandle, ManifestBuilder, Phase,
    SubsystemRegistry,
};

#[test]
fn missing_builder_is_reported() {
    let mut registry = SubsystemRegistry::new().with_builder(
        DisciplineKey::Aero,
        ManifestBuilder::new("aero", common::aero_manifest()),
    );
    let err = assemble_topology(&CouplingSpec::aeropropulsive(), &mut registry, "cruise").unwrap_err();
    assert!(matches!(err, MdoError::Builder(ref info) if info.code == "missing-builder"));
    assert_eq!(err.info().context["discipline"], "prop");
}

#[test]
fn builder_failures_pass_through_unchanged() {
    let mut registry = SubsystemRegistry::new().with_builder(
        DisciplineKey::Aero,
        ManifestBuilder::new("aero", common::aero_manifest().failing_on(Phase::PostCoupling)),
    );
    let err = assemble_topology(&CouplingSpec::aerodynamic(), &mut registry, "cruise").unwrap_err();
    assert_eq!(
        err,
        MdoError::Builder(
            ErrorInfo::new("builder-failure", "subsystem construction failed")
                .with_context("builder", "aero")
                .with_context("phase", "post_coupling")
        )
    );
}

#[test]
fn configuration_errors_precede_builder_calls() {
    let mut registry = common::aerodynamic_registry();
    let spec = CouplingSpec::aerodynamic().with_pre_coupling_order([DisciplineKey::Struct]);
    let err = assemble_topology(&spec, &mut registry, "cruise").unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().context["entry"], "struct");
    assert_eq!(err.info().context["valid"], "aero");
    assert!(registry.issued().is_empty());
}

#[test]
fn unsupported_discipline_sets_are_configuration_errors() {
    let spec = CouplingSpec::new([DisciplineKey::Struct, DisciplineKey::Prop]);
    let err = spec.validate().unwrap_err();
    assert_eq!(err.info().code, "unsupported-discipline-set");

    let err = CouplingSpec::new(Vec::<DisciplineKey>::new()).validate().unwrap_err();
    assert_eq!(err.info().code, "empty-discipline-set");

    let spec = CouplingSpec::aerostructural()
        .with_coupling_group_type(mdo_topology::CouplingGroupType::SingleDisciplineOnly(
            DisciplineKey::Prop,
        ));
    assert_eq!(spec.validate().unwrap_err().info().code, "single-discipline-inactive");
}

#[test]
fn geometric_displacement_needs_a_node_count() {
    let mut registry = common::aerostructural_registry().with_builder(
        DisciplineKey::Aero,
        ManifestBuilder::new("aero", BuilderManifest::default()),
    );
    let err = assemble_topology(&CouplingSpec::aerostructural(), &mut registry, "cruise").unwrap_err();
    assert_eq!(err.info().code, "missing-node-count");
}

#[test]
fn transfer_builder_must_return_a_pair() {
    let mut registry = common::aerostructural_registry().with_builder(
        DisciplineKey::Ldxfer,
        ManifestBuilder::new("ldxfer", BuilderManifest::default()),
    );
    let err = assemble_topology(&CouplingSpec::aerostructural(), &mut registry, "cruise").unwrap_err();
    assert_eq!(err.info().code, "expected-transfer-pair");
    assert_eq!(err.info().context["discipline"], "ldxfer");
}

#[test]
fn balance_form_requires_a_balance_subsystem() {
    let mut registry = common::aerodynamic_registry();
    let spec = CouplingSpec::aerodynamic().with_balance_group(true);
    let err = assemble_topology(&spec, &mut registry, "cruise").unwrap_err();
    assert_eq!(err.info().code, "missing-balance-group");
}

#[test]
fn uninitialized_builders_are_refused_when_required() {
    let mut registry = common::aerodynamic_registry();
    registry.require_initialization(true);
    let err = registry.pre_coupling(DisciplineKey::Aero, "cruise").unwrap_err();
    assert_eq!(err.info().code, "builder-uninitialized");

    registry
        .initialize(&[DisciplineKey::Aero], &mdo_core::Communicator::serial())
        .unwrap();
    assert!(registry.is_initialized(DisciplineKey::Aero));
    assert!(registry.pre_coupling(DisciplineKey::Aero, "cruise").unwrap().is_some());
}

#[test]
fn absent_phases_are_not_errors() {
    let mut registry = SubsystemRegistry::new().with_builder(
        DisciplineKey::Prop,
        ManifestBuilder::new("prop", BuilderManifest::default()),
    );
    assert!(registry.pre_coupling(DisciplineKey::Prop, "cruise").unwrap().is_none());
    assert!(registry.post_coupling(DisciplineKey::Prop, "cruise").unwrap().is_none());
    assert!(registry
        .post_coupling_for_schur(DisciplineKey::Prop, "cruise")
        .unwrap()
        .is_none());
    assert!(registry.issued().is_empty());
}

#[test]
fn issue_log_records_requests_in_order() {
    let mut registry = common::aerodynamic_registry();
    assemble_topology(&CouplingSpec::aerodynamic(), &mut registry, "cruise").unwrap();
    let phases: Vec<_> = registry.issued().iter().map(|record| record.phase).collect();
    assert_eq!(phases, [Phase::PreCoupling, Phase::Coupling, Phase::PostCoupling]);
    assert_eq!(
        registry.issued()[1],
        IssuedHandle {
            discipline: Some(DisciplineKey::Aero),
            phase: Phase::Coupling,
            label: "cruise.aero.coupling".to_string(),
        }
    );
    registry.clear_issued();
    assert!(registry.issued().is_empty());
}

#[test]
fn registration_is_queryable() {
    let registry = common::aeropropulsive_registry();
    assert!(registry.has_builder(DisciplineKey::Aero));
    assert!(registry.has_builder(DisciplineKey::Prop));
    assert!(!registry.has_builder(DisciplineKey::Struct));
    assert!(!registry.has_balance_builder());

    let registry = registry.with_balance_builder(ManifestBuilder::new("balance", BuilderManifest::default()));
    assert!(registry.has_balance_builder());
}
