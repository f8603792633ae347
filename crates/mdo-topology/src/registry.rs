//! Discipline builder registry and the log of handles it hands out.

use std::collections::{BTreeMap, BTreeSet};

use mdo_core::{
    Communicator, CouplingSubsystem, DisciplineBuilder, DisciplineKey, ErrorInfo, MdoError,
    SubsystemHandle,
};
use serde::{Deserialize, Serialize};

fn builder_error(code: &str, message: impl Into<String>) -> MdoError {
    MdoError::Builder(ErrorInfo::new(code, message.into()))
}

/// Phase a handle was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Initial mesh coordinates.
    Mesh,
    /// Geometry parameterization of the meshes.
    Geometry,
    /// Run-once work before the coupling solve.
    PreCoupling,
    /// Work iterated inside the coupling group.
    Coupling,
    /// Geometric displacement of the aero surface.
    GeoDisp,
    /// Run-once work after the coupling solve.
    PostCoupling,
    /// Post-coupling variant evaluated inside the Schur partition.
    PostCouplingForSchur,
    /// Balance (trim) subsystem.
    Balance,
}

/// Record of a handle handed out by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedHandle {
    /// Discipline the handle belongs to, if any.
    pub discipline: Option<DisciplineKey>,
    /// Phase it was requested for.
    pub phase: Phase,
    /// Label of the subsystem.
    pub label: String,
}

/// Payload of the geometric displacement subsystem owned by the coupling group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoDisp {
    /// Number of aero surface nodes displaced.
    pub number_of_nodes: usize,
}

/// Maps discipline keys to their builders.
///
/// Every getter delegates to the registered builder. Builder failures are
/// returned unmodified. When initialization is required, getters refuse to
/// touch a builder that has not received its communicator.
#[derive(Default)]
pub struct SubsystemRegistry {
    builders: BTreeMap<DisciplineKey, Box<dyn DisciplineBuilder>>,
    geometry: Option<Box<dyn DisciplineBuilder>>,
    balance_builder: Option<Box<dyn DisciplineBuilder>>,
    balance_group: Option<SubsystemHandle>,
    initialized: BTreeSet<DisciplineKey>,
    geometry_initialized: bool,
    require_initialization: bool,
    issued: Vec<IssuedHandle>,
}

impl std::fmt::Debug for SubsystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsystemRegistry")
            .field("builders", &self.builders.keys().collect::<Vec<_>>())
            .field("geometry", &self.geometry.is_some())
            .field("balance_builder", &self.balance_builder.is_some())
            .field("balance_group", &self.balance_group)
            .field("issued", &self.issued.len())
            .finish()
    }
}

impl SubsystemRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the builder for a discipline, returning the previous one.
    pub fn register(
        &mut self,
        key: DisciplineKey,
        builder: Box<dyn DisciplineBuilder>,
    ) -> Option<Box<dyn DisciplineBuilder>> {
        self.initialized.remove(&key);
        self.builders.insert(key, builder)
    }

    /// Chaining form of [`SubsystemRegistry::register`].
    pub fn with_builder(mut self, key: DisciplineKey, builder: impl DisciplineBuilder + 'static) -> Self {
        self.register(key, Box::new(builder));
        self
    }

    /// Registers the geometry builder.
    pub fn with_geometry_builder(mut self, builder: impl DisciplineBuilder + 'static) -> Self {
        self.geometry = Some(Box::new(builder));
        self.geometry_initialized = false;
        self
    }

    /// Registers a balance builder whose coupling subsystem joins the coupling group.
    pub fn with_balance_builder(mut self, builder: impl DisciplineBuilder + 'static) -> Self {
        self.balance_builder = Some(Box::new(builder));
        self
    }

    /// Supplies the balance (trim) subsystem solved by partitioned elimination.
    pub fn with_balance_group(mut self, balance: SubsystemHandle) -> Self {
        self.balance_group = Some(balance);
        self
    }

    /// Requires builders to be initialized before any subsystem is requested.
    pub fn require_initialization(&mut self, required: bool) {
        self.require_initialization = required;
    }

    /// Whether a builder is registered for the discipline.
    pub fn has_builder(&self, key: DisciplineKey) -> bool {
        self.builders.contains_key(&key)
    }

    /// Whether a balance builder is registered.
    pub fn has_balance_builder(&self) -> bool {
        self.balance_builder.is_some()
    }

    /// Whether the discipline's builder has been initialized.
    pub fn is_initialized(&self, key: DisciplineKey) -> bool {
        self.initialized.contains(&key)
    }

    /// Initializes the listed discipline builders with the communicator.
    pub fn initialize(
        &mut self,
        disciplines: &[DisciplineKey],
        comm: &Communicator,
    ) -> Result<(), MdoError> {
        for key in disciplines {
            let builder = self
                .builders
                .get_mut(key)
                .ok_or_else(|| missing_builder(*key))?;
            builder.initialize(comm)?;
            self.initialized.insert(*key);
            tracing::debug!(discipline = %key, comm = comm.label(), "initialized builder");
        }
        Ok(())
    }

    /// Initializes the geometry builder with the communicator.
    pub fn initialize_geometry(&mut self, comm: &Communicator) -> Result<(), MdoError> {
        let builder = self.geometry.as_mut().ok_or_else(missing_geometry)?;
        builder.initialize(comm)?;
        self.geometry_initialized = true;
        Ok(())
    }

    fn builder(&self, key: DisciplineKey) -> Result<&dyn DisciplineBuilder, MdoError> {
        let builder = self.builders.get(&key).ok_or_else(|| missing_builder(key))?;
        if self.require_initialization && !self.initialized.contains(&key) {
            return Err(MdoError::Builder(
                ErrorInfo::new("builder-uninitialized", "builder used before initialization")
                    .with_context("discipline", key.as_str())
                    .with_hint("initialize builders with the scenario communicator first"),
            ));
        }
        Ok(builder.as_ref())
    }

    fn record(&mut self, discipline: Option<DisciplineKey>, phase: Phase, handle: &SubsystemHandle) {
        self.issued.push(IssuedHandle {
            discipline,
            phase,
            label: handle.label().to_string(),
        });
    }

    fn record_optional(
        &mut self,
        discipline: DisciplineKey,
        phase: Phase,
        handle: Option<SubsystemHandle>,
    ) -> Option<SubsystemHandle> {
        if let Some(handle) = &handle {
            self.record(Some(discipline), phase, handle);
        }
        handle
    }

    /// Pre-coupling subsystem of a discipline, if it declares one.
    pub fn pre_coupling(
        &mut self,
        key: DisciplineKey,
        scenario: &str,
    ) -> Result<Option<SubsystemHandle>, MdoError> {
        let handle = self.builder(key)?.pre_coupling_subsystem(scenario)?;
        Ok(self.record_optional(key, Phase::PreCoupling, handle))
    }

    /// Coupling contribution of a discipline.
    pub fn coupling(
        &mut self,
        key: DisciplineKey,
        scenario: &str,
    ) -> Result<CouplingSubsystem, MdoError> {
        let coupling = self.builder(key)?.coupling_group_subsystem(scenario)?;
        match &coupling {
            CouplingSubsystem::Single(handle) => self.record(Some(key), Phase::Coupling, handle),
            CouplingSubsystem::Transfer { displacement, load } => {
                self.record(Some(key), Phase::Coupling, displacement);
                self.record(Some(key), Phase::Coupling, load);
            }
        }
        Ok(coupling)
    }

    /// Post-coupling subsystem of a discipline, if it declares one.
    pub fn post_coupling(
        &mut self,
        key: DisciplineKey,
        scenario: &str,
    ) -> Result<Option<SubsystemHandle>, MdoError> {
        let handle = self.builder(key)?.post_coupling_subsystem(scenario)?;
        Ok(self.record_optional(key, Phase::PostCoupling, handle))
    }

    /// Schur-aware post-coupling subsystem of a discipline, if it declares one.
    pub fn post_coupling_for_schur(
        &mut self,
        key: DisciplineKey,
        scenario: &str,
    ) -> Result<Option<SubsystemHandle>, MdoError> {
        let handle = self
            .builder(key)?
            .post_coupling_subsystem_for_schur(scenario)?;
        Ok(self.record_optional(key, Phase::PostCouplingForSchur, handle))
    }

    /// Mesh coordinate subsystem of a discipline.
    pub fn mesh(&mut self, key: DisciplineKey, scenario: &str) -> Result<SubsystemHandle, MdoError> {
        let handle = self.builder(key)?.mesh_coordinate_subsystem(scenario)?;
        self.record(Some(key), Phase::Mesh, &handle);
        Ok(handle)
    }

    /// Geometry subsystem fed by the discipline meshes.
    pub fn geometry_mesh(&mut self, scenario: &str) -> Result<SubsystemHandle, MdoError> {
        let builder = self.geometry.as_ref().ok_or_else(missing_geometry)?;
        if self.require_initialization && !self.geometry_initialized {
            return Err(builder_error(
                "builder-uninitialized",
                "geometry builder used before initialization",
            ));
        }
        let handle = builder.mesh_coordinate_subsystem(scenario)?;
        self.record(None, Phase::Geometry, &handle);
        Ok(handle)
    }

    /// The balance subsystem supplied for partitioned coupling.
    pub fn balance_group(&mut self) -> Result<SubsystemHandle, MdoError> {
        let handle = self.balance_group.clone().ok_or_else(|| {
            MdoError::Builder(
                ErrorInfo::new("missing-balance-group", "no balance subsystem supplied")
                    .with_hint("register one with SubsystemRegistry::with_balance_group"),
            )
        })?;
        self.record(None, Phase::Balance, &handle);
        Ok(handle)
    }

    /// Coupling subsystem of the balance builder, if one is registered.
    pub fn balance_coupling(&mut self, scenario: &str) -> Result<Option<SubsystemHandle>, MdoError> {
        let Some(builder) = self.balance_builder.as_ref() else {
            return Ok(None);
        };
        match builder.coupling_group_subsystem(scenario)? {
            CouplingSubsystem::Single(handle) => {
                self.record(None, Phase::Coupling, &handle);
                Ok(Some(handle))
            }
            CouplingSubsystem::Transfer { .. } => Err(builder_error(
                "unexpected-transfer-pair",
                "balance builder returned a transfer pair",
            )),
        }
    }

    /// Geometric displacement subsystem sized by the aero builder's node count.
    pub fn geo_disp(&mut self, scenario: &str) -> Result<SubsystemHandle, MdoError> {
        let nodes = self.builder(DisciplineKey::Aero)?.number_of_nodes().ok_or_else(|| {
            MdoError::Builder(
                ErrorInfo::new("missing-node-count", "aero builder does not report a node count")
                    .with_context("discipline", DisciplineKey::Aero.as_str()),
            )
        })?;
        let handle = SubsystemHandle::new(
            format!("{scenario}.geo_disp"),
            GeoDisp {
                number_of_nodes: nodes,
            },
        );
        self.record(Some(DisciplineKey::Aero), Phase::GeoDisp, &handle);
        Ok(handle)
    }

    /// Every handle handed out so far, in request order.
    pub fn issued(&self) -> &[IssuedHandle] {
        &self.issued
    }

    /// Forgets the issued handles.
    pub fn clear_issued(&mut self) {
        self.issued.clear();
    }
}

fn missing_builder(key: DisciplineKey) -> MdoError {
    MdoError::Builder(
        ErrorInfo::new("missing-builder", "no builder registered for discipline")
            .with_context("discipline", key.as_str()),
    )
}

fn missing_geometry() -> MdoError {
    builder_error("missing-geometry-builder", "no geometry builder registered")
}
