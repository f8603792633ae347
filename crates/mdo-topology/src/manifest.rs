//! Declarative builders and scenario files.
//!
//! A [`ManifestBuilder`] answers every builder request from a small serde
//! manifest and returns [`PlaceholderSubsystem`] payloads, so a topology can
//! be planned and inspected without any physics attached.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use mdo_core::{
    Communicator, CouplingSubsystem, DisciplineBuilder, DisciplineKey, ErrorInfo, MdoError,
    SubsystemHandle,
};
use serde::{Deserialize, Serialize};

use crate::registry::{Phase, SubsystemRegistry};
use crate::scenario::{build_scenario, Scenario};
use crate::serde::{from_json_slice, from_yaml_slice};
use crate::spec::CouplingSpec;

/// Shape of the coupling contribution declared by a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouplingShape {
    /// One coupling subsystem.
    #[default]
    Single,
    /// Displacement and load transfer pair.
    Transfer,
}

/// Phases a declarative builder provides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuilderManifest {
    /// Provides a pre-coupling subsystem.
    #[serde(default)]
    pub pre_coupling: bool,
    /// Shape of the coupling contribution.
    #[serde(default)]
    pub coupling: CouplingShape,
    /// Provides a post-coupling subsystem.
    #[serde(default)]
    pub post_coupling: bool,
    /// Provides a Schur-aware post-coupling subsystem.
    #[serde(default)]
    pub post_coupling_for_schur: bool,
    /// Reported surface node count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_nodes: Option<usize>,
    /// Phase whose request fails, for exercising error propagation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on: Option<Phase>,
}

impl BuilderManifest {
    /// Manifest providing every optional phase.
    pub fn full() -> Self {
        Self {
            pre_coupling: true,
            coupling: CouplingShape::Single,
            post_coupling: true,
            post_coupling_for_schur: true,
            number_of_nodes: None,
            fail_on: None,
        }
    }

    /// Manifest for a load/displacement transfer builder.
    pub fn transfer() -> Self {
        Self {
            coupling: CouplingShape::Transfer,
            ..Self::default()
        }
    }

    /// Sets the pre-coupling flag.
    pub fn with_pre_coupling(mut self, present: bool) -> Self {
        self.pre_coupling = present;
        self
    }

    /// Sets the post-coupling flag.
    pub fn with_post_coupling(mut self, present: bool) -> Self {
        self.post_coupling = present;
        self
    }

    /// Sets the Schur-aware post-coupling flag.
    pub fn with_post_coupling_for_schur(mut self, present: bool) -> Self {
        self.post_coupling_for_schur = present;
        self
    }

    /// Sets the reported node count.
    pub fn with_number_of_nodes(mut self, nodes: usize) -> Self {
        self.number_of_nodes = Some(nodes);
        self
    }

    /// Makes requests for `phase` fail.
    pub fn failing_on(mut self, phase: Phase) -> Self {
        self.fail_on = Some(phase);
        self
    }
}

/// Payload carried by every handle a [`ManifestBuilder`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSubsystem {
    /// Name of the builder that produced it.
    pub builder: String,
    /// Scenario it was requested for.
    pub scenario: String,
    /// Requested phase.
    pub phase: Phase,
    /// Label of the communicator the builder was initialized with.
    pub comm: Option<String>,
}

/// [`DisciplineBuilder`] driven by a [`BuilderManifest`].
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    name: String,
    manifest: BuilderManifest,
    comm: Option<Communicator>,
}

impl ManifestBuilder {
    /// Creates a builder labelling its handles with `name`.
    pub fn new(name: impl Into<String>, manifest: BuilderManifest) -> Self {
        Self {
            name: name.into(),
            manifest,
            comm: None,
        }
    }

    /// Manifest the builder answers from.
    pub fn manifest(&self) -> &BuilderManifest {
        &self.manifest
    }

    /// Communicator received through initialization, if any.
    pub fn communicator(&self) -> Option<&Communicator> {
        self.comm.as_ref()
    }

    fn handle(&self, scenario: &str, phase: Phase, suffix: &str) -> Result<SubsystemHandle, MdoError> {
        if self.manifest.fail_on == Some(phase) {
            return Err(MdoError::Builder(
                ErrorInfo::new("builder-failure", "subsystem construction failed")
                    .with_context("builder", self.name.clone())
                    .with_context("phase", phase_name(phase)),
            ));
        }
        let payload = PlaceholderSubsystem {
            builder: self.name.clone(),
            scenario: scenario.to_string(),
            phase,
            comm: self.comm.as_ref().map(|comm| comm.label().to_string()),
        };
        Ok(SubsystemHandle::new(
            format!("{scenario}.{}.{suffix}", self.name),
            payload,
        ))
    }

    fn optional(
        &self,
        present: bool,
        scenario: &str,
        phase: Phase,
    ) -> Result<Option<SubsystemHandle>, MdoError> {
        if present {
            self.handle(scenario, phase, phase_name(phase)).map(Some)
        } else {
            Ok(None)
        }
    }
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Mesh => "mesh",
        Phase::Geometry => "geometry",
        Phase::PreCoupling => "pre_coupling",
        Phase::Coupling => "coupling",
        Phase::GeoDisp => "geo_disp",
        Phase::PostCoupling => "post_coupling",
        Phase::PostCouplingForSchur => "post_coupling_for_schur",
        Phase::Balance => "balance",
    }
}

impl DisciplineBuilder for ManifestBuilder {
    fn initialize(&mut self, comm: &Communicator) -> Result<(), MdoError> {
        self.comm = Some(comm.clone());
        Ok(())
    }

    fn mesh_coordinate_subsystem(&self, scenario: &str) -> Result<SubsystemHandle, MdoError> {
        self.handle(scenario, Phase::Mesh, "mesh")
    }

    fn pre_coupling_subsystem(&self, scenario: &str) -> Result<Option<SubsystemHandle>, MdoError> {
        self.optional(self.manifest.pre_coupling, scenario, Phase::PreCoupling)
    }

    fn coupling_group_subsystem(&self, scenario: &str) -> Result<CouplingSubsystem, MdoError> {
        match self.manifest.coupling {
            CouplingShape::Single => Ok(CouplingSubsystem::Single(self.handle(
                scenario,
                Phase::Coupling,
                "coupling",
            )?)),
            CouplingShape::Transfer => Ok(CouplingSubsystem::Transfer {
                displacement: self.handle(scenario, Phase::Coupling, "coupling.displacement")?,
                load: self.handle(scenario, Phase::Coupling, "coupling.load")?,
            }),
        }
    }

    fn post_coupling_subsystem(&self, scenario: &str) -> Result<Option<SubsystemHandle>, MdoError> {
        self.optional(self.manifest.post_coupling, scenario, Phase::PostCoupling)
    }

    fn post_coupling_subsystem_for_schur(
        &self,
        scenario: &str,
    ) -> Result<Option<SubsystemHandle>, MdoError> {
        self.optional(
            self.manifest.post_coupling_for_schur,
            scenario,
            Phase::PostCouplingForSchur,
        )
    }

    fn number_of_nodes(&self) -> Option<usize> {
        self.manifest.number_of_nodes
    }
}

/// Cross-discipline connections declared in a scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossConnection {
    /// Discipline providing the outputs.
    pub source: DisciplineKey,
    /// Discipline receiving the inputs.
    pub target: DisciplineKey,
    /// Output name to input name.
    pub variables: BTreeMap<String, String>,
}

/// Scenario description loaded from YAML or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// Scenario name.
    pub name: String,
    /// Coupling specification.
    pub spec: CouplingSpec,
    /// Declarative builder per discipline.
    #[serde(default)]
    pub builders: BTreeMap<DisciplineKey, BuilderManifest>,
    /// Declarative geometry builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_builder: Option<BuilderManifest>,
    /// Declarative balance builder joining the coupling group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_builder: Option<BuilderManifest>,
    /// Connections registered after assembly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<CrossConnection>,
}

impl ScenarioFile {
    /// Loads a scenario file, choosing the format from the extension.
    pub fn load(path: &Path) -> Result<Self, MdoError> {
        let bytes = fs::read(path).map_err(|err| {
            MdoError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => from_yaml_slice(&bytes),
            Some("json") => from_json_slice(&bytes),
            other => Err(MdoError::Config(
                ErrorInfo::new("unsupported-config-format", "unknown scenario file format")
                    .with_context("path", path.display().to_string())
                    .with_context("extension", other.unwrap_or(""))
                    .with_hint("use a .yaml, .yml or .json file"),
            )),
        }
    }

    /// Registry of manifest builders described by the file.
    pub fn registry(&self) -> SubsystemRegistry {
        let mut registry = SubsystemRegistry::new();
        for (key, manifest) in &self.builders {
            registry.register(*key, Box::new(ManifestBuilder::new(key.as_str(), manifest.clone())));
        }
        if let Some(manifest) = &self.geometry_builder {
            registry = registry.with_geometry_builder(ManifestBuilder::new("geometry", manifest.clone()));
        }
        if let Some(manifest) = &self.balance_builder {
            registry = registry.with_balance_builder(ManifestBuilder::new("balance", manifest.clone()));
        }
        if self.spec.balance_group {
            let payload = PlaceholderSubsystem {
                builder: "balance_group".to_string(),
                scenario: self.name.clone(),
                phase: Phase::Balance,
                comm: None,
            };
            registry = registry
                .with_balance_group(SubsystemHandle::new(format!("{}.balance_group", self.name), payload));
        }
        registry
    }

    /// Assembles the scenario and registers the declared connections.
    pub fn build(&self, comm: Option<&Communicator>) -> Result<Scenario, MdoError> {
        let mut registry = self.registry();
        let mut scenario = build_scenario(&self.spec, &self.name, &mut registry, comm)?;
        for connection in &self.connections {
            let pairs: Vec<(&String, &String)> = connection.variables.iter().collect();
            scenario.connect_cross_discipline(connection.source, connection.target, &pairs)?;
        }
        Ok(scenario)
    }
}
