#![deny(missing_docs)]
#![doc = "Core traits and data types shared by the coupling topology crates."]

pub mod errors;
pub mod handle;
pub mod provenance;
mod discipline;

pub use discipline::DisciplineKey;
pub use errors::{ErrorInfo, MdoError};
pub use handle::{Communicator, CouplingSubsystem, SubsystemHandle};
pub use provenance::{SchemaVersion, TopologyProvenance};

/// Contract implemented by every discipline builder.
///
/// Phases a builder does not provide default to absent, which is not an
/// error. Builders used inside a parallel multipoint group receive their
/// communicator through [`DisciplineBuilder::initialize`] before any
/// subsystem is requested.
pub trait DisciplineBuilder: Send + Sync {
    /// Prepares the builder for the supplied communicator.
    fn initialize(&mut self, _comm: &Communicator) -> Result<(), MdoError> {
        Ok(())
    }

    /// Returns the subsystem producing the initial mesh coordinates.
    fn mesh_coordinate_subsystem(&self, scenario: &str) -> Result<SubsystemHandle, MdoError>;

    /// Returns the subsystem run once before the coupling solve.
    fn pre_coupling_subsystem(&self, _scenario: &str) -> Result<Option<SubsystemHandle>, MdoError> {
        Ok(None)
    }

    /// Returns the subsystem(s) iterated inside the coupling group.
    fn coupling_group_subsystem(&self, scenario: &str) -> Result<CouplingSubsystem, MdoError>;

    /// Returns the subsystem run once after the coupling solve.
    fn post_coupling_subsystem(
        &self,
        _scenario: &str,
    ) -> Result<Option<SubsystemHandle>, MdoError> {
        Ok(None)
    }

    /// Returns the post-coupling variant evaluated inside a Schur partition.
    fn post_coupling_subsystem_for_schur(
        &self,
        _scenario: &str,
    ) -> Result<Option<SubsystemHandle>, MdoError> {
        Ok(None)
    }

    /// Number of surface nodes, used to size the geometric displacement step.
    fn number_of_nodes(&self) -> Option<usize> {
        None
    }
}
