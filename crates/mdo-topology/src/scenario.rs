//! Scenario façade: parallel setup, assembly and connection bookkeeping.

use std::collections::BTreeMap;

use mdo_core::{
    Communicator, DisciplineKey, ErrorInfo, MdoError, SchemaVersion, TopologyProvenance,
};
use serde::{Deserialize, Serialize};

use crate::assemble::assemble_into;
use crate::hash::{spec_hash, topology_hash};
use crate::node::GroupNode;
use crate::registry::SubsystemRegistry;
use crate::spec::{CouplingLayout, CouplingSpec, ScenarioKind};

/// Name of the geometry leaf added in parallel mode.
pub const GEOMETRY_NODE: &str = "geometry";

/// Point-to-point variable connection between two promoted paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Output path.
    pub source: String,
    /// Input path.
    pub target: String,
}

impl Connection {
    fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Assembled scenario: the group tree plus the connections it requested.
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    layout: CouplingLayout,
    root: GroupNode,
    connections: Vec<Connection>,
    provenance: TopologyProvenance,
}

impl Scenario {
    /// Scenario name, also the name of the root node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validated layout the tree was assembled from.
    pub fn layout(&self) -> &CouplingLayout {
        &self.layout
    }

    /// Root of the assembled tree.
    pub fn root(&self) -> &GroupNode {
        &self.root
    }

    /// Connections in registration order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Hashes and schema of the assembly.
    pub fn provenance(&self) -> &TopologyProvenance {
        &self.provenance
    }

    /// Consumes the scenario, returning its tree.
    pub fn into_root(self) -> GroupNode {
        self.root
    }

    /// Connects coupling variables of `source` to coupling variables of `target`.
    ///
    /// Each pair maps an output name of the source discipline to an input
    /// name of the target. Both endpoints route through the coupling group,
    /// which sits inside the Schur partition when a balance group is present.
    pub fn connect_cross_discipline<S: AsRef<str>, T: AsRef<str>>(
        &mut self,
        source: DisciplineKey,
        target: DisciplineKey,
        pairs: &[(S, T)],
    ) -> Result<(), MdoError> {
        let path = self.layout.coupling_group_path();
        let source_node = format!("{path}.{source}");
        let target_node = format!("{path}.{target}");
        for node in [&source_node, &target_node] {
            let relative = node.as_str();
            if self.root.find(relative).and_then(|child| child.as_leaf()).is_none() {
                return Err(MdoError::Topology(
                    ErrorInfo::new(
                        "unknown-connection-endpoint",
                        "connection endpoint is not a discipline of the coupling group",
                    )
                    .with_context("scenario", self.name.clone())
                    .with_context("path", relative)
                    .with_hint("cross-discipline connections need full coupling"),
                ));
            }
        }
        for (output, input) in pairs {
            let connection = Connection::new(
                format!("{source_node}.{}", output.as_ref()),
                format!("{target_node}.{}", input.as_ref()),
            );
            tracing::debug!(source = %connection.source, target = %connection.target, "connected");
            self.connections.push(connection);
        }
        Ok(())
    }
}

/// Builds a scenario tree named `name` from `spec`.
///
/// In parallel multipoint mode the builders are first initialized with
/// `comm` (the serial communicator when none is given) and the mesh and
/// geometry leaves are added ahead of the coupling topology. Otherwise the
/// meshes are assumed to exist upstream and assembly starts directly.
pub fn build_scenario(
    spec: &CouplingSpec,
    name: &str,
    registry: &mut SubsystemRegistry,
    comm: Option<&Communicator>,
) -> Result<Scenario, MdoError> {
    let layout = spec.validate()?;
    let mut root = GroupNode::new(name);
    let mut connections = Vec::new();

    if layout.in_multipoint_parallel {
        let comm = comm.cloned().unwrap_or_else(Communicator::serial);
        registry.require_initialization(true);
        registry.initialize(layout.kind.disciplines(), &comm)?;
        if layout.geometry {
            registry.initialize_geometry(&comm)?;
        }
        add_mesh_and_geometry(&mut root, &mut connections, &layout, registry, name)?;
    }

    assemble_into(&mut root, &layout, registry, name)?;

    let provenance = TopologyProvenance {
        schema_version: SchemaVersion::default(),
        scenario: name.to_string(),
        spec_hash: spec_hash(spec)?,
        topology_hash: topology_hash(&root)?,
        tool_versions: BTreeMap::from([(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        )]),
    };
    tracing::info!(
        scenario = name,
        kind = ?layout.kind,
        leaves = root.leaf_count(),
        topology_hash = %provenance.topology_hash,
        "assembled scenario"
    );

    Ok(Scenario {
        name: name.to_string(),
        layout,
        root,
        connections,
        provenance,
    })
}

fn add_mesh_and_geometry(
    root: &mut GroupNode,
    connections: &mut Vec<Connection>,
    layout: &CouplingLayout,
    registry: &mut SubsystemRegistry,
    scenario: &str,
) -> Result<(), MdoError> {
    let kind = layout.kind;
    for key in kind.meshed_disciplines() {
        let handle = registry.mesh(*key, scenario)?;
        root.push_leaf(kind.mesh_node_name(*key), handle)?;
    }
    if layout.geometry {
        let handle = registry.geometry_mesh(scenario)?;
        root.push_leaf(GEOMETRY_NODE, handle)?;
        for key in kind.meshed_disciplines() {
            connections.push(Connection::new(
                format!("{}.x_{key}0", kind.mesh_node_name(*key)),
                format!("{GEOMETRY_NODE}.x_{key}_in"),
            ));
        }
    }
    if kind == ScenarioKind::Aerodynamic {
        connections.push(Connection::new("x_aero0", "x_aero"));
    }
    Ok(())
}
