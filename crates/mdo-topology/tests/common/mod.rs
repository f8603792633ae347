#![allow(dead_code)]

use mdo_core::{DisciplineKey, SubsystemHandle};
use mdo_topology::{BuilderManifest, Child, GroupNode, ManifestBuilder, SubsystemRegistry};

pub const AERO_NODES: usize = 64;

pub fn aero_manifest() -> BuilderManifest {
    BuilderManifest::default()
        .with_pre_coupling(true)
        .with_post_coupling(true)
        .with_number_of_nodes(AERO_NODES)
}

pub fn pre_post_manifest() -> BuilderManifest {
    BuilderManifest::default()
        .with_pre_coupling(true)
        .with_post_coupling(true)
}

pub fn aerodynamic_registry() -> SubsystemRegistry {
    SubsystemRegistry::new().with_builder(
        DisciplineKey::Aero,
        ManifestBuilder::new("aero", aero_manifest()),
    )
}

pub fn aerostructural_registry() -> SubsystemRegistry {
    SubsystemRegistry::new()
        .with_builder(DisciplineKey::Aero, ManifestBuilder::new("aero", aero_manifest()))
        .with_builder(
            DisciplineKey::Struct,
            ManifestBuilder::new("struct", pre_post_manifest()),
        )
        .with_builder(
            DisciplineKey::Ldxfer,
            ManifestBuilder::new(
                "ldxfer",
                BuilderManifest::transfer()
                    .with_pre_coupling(true)
                    .with_post_coupling(true),
            ),
        )
}

pub fn aeropropulsive_registry() -> SubsystemRegistry {
    SubsystemRegistry::new()
        .with_builder(DisciplineKey::Aero, ManifestBuilder::new("aero", aero_manifest()))
        .with_builder(
            DisciplineKey::Prop,
            ManifestBuilder::new("prop", pre_post_manifest()),
        )
}

pub fn balance(scenario: &str) -> SubsystemHandle {
    SubsystemHandle::new(format!("{scenario}.trim"), ())
}

pub fn child_names(group: &GroupNode) -> Vec<&str> {
    group.children().iter().map(Child::name).collect()
}

pub fn group<'a>(root: &'a GroupNode, path: &str) -> &'a GroupNode {
    root.find_group(path)
        .unwrap_or_else(|| panic!("missing group {path}"))
}
