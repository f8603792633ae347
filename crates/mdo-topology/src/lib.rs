#![deny(missing_docs)]
#![doc = "Assembles nested solver-group trees for coupled multidisciplinary scenarios."]

/// Topology assembly from validated layouts.
pub mod assemble;
mod coupling;
/// Canonical hashing of specs and assembled trees.
pub mod hash;
/// Declarative builders and scenario files.
pub mod manifest;
/// Group tree, leaves and structural outlines.
pub mod node;
/// Builder registry and handle issue log.
pub mod registry;
/// Scenario façade and connection bookkeeping.
pub mod scenario;
/// Canonical JSON and YAML helpers.
pub mod serde;
/// Typed coupling specification and its validation.
pub mod spec;
/// Solver strategies and the role based selector.
pub mod strategy;

/// Name of the node holding the coupled disciplines.
pub const COUPLING_NODE: &str = "coupling";

pub use crate::assemble::{assemble_layout, assemble_topology};
pub use crate::hash::{spec_hash, stable_hash_string, topology_hash};
pub use crate::manifest::{
    BuilderManifest, CouplingShape, CrossConnection, ManifestBuilder, PlaceholderSubsystem,
    ScenarioFile,
};
pub use crate::node::{Child, GroupNode, Leaf, NodeOutline};
pub use crate::registry::{GeoDisp, IssuedHandle, Phase, SubsystemRegistry};
pub use crate::scenario::{build_scenario, Connection, Scenario, GEOMETRY_NODE};
pub use crate::serde::{from_json_slice, to_canonical_json_bytes};
pub use crate::spec::{
    CouplingGroupType, CouplingLayout, CouplingSpec, SchurAwareRule, SchurPostPlacement, ScenarioKind,
};
pub use crate::strategy::{
    select_strategy, BlockGaussSeidelOptions, Linearization, NodeRole, SchurOptions,
    SolverOptions, SolverOverrides, SolverStrategy, BALANCE_PARTITION, COUPLING_PARTITION,
};
