//! Opaque handles forwarded between builders and the execution driver.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque reference to a pre-built subsystem.
///
/// Topology assembly only decides where a handle is placed; the payload is
/// never inspected here. The external driver that walks the finished tree can
/// recover the concrete type with [`SubsystemHandle::downcast_ref`].
#[derive(Clone)]
pub struct SubsystemHandle {
    label: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl SubsystemHandle {
    /// Wraps a subsystem value together with a diagnostic label.
    pub fn new<T: Any + Send + Sync>(label: impl Into<String>, subsystem: T) -> Self {
        Self {
            label: label.into(),
            inner: Arc::new(subsystem),
        }
    }

    /// Diagnostic label supplied by the builder.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Attempts to view the payload as a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Whether both handles point at the same subsystem instance.
    pub fn same_instance(&self, other: &SubsystemHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SubsystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsystemHandle")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Parallel-execution communicator forwarded unchanged to builders.
#[derive(Clone)]
pub struct Communicator {
    label: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Communicator {
    /// Wraps a host communicator object.
    pub fn new<T: Any + Send + Sync>(label: impl Into<String>, comm: T) -> Self {
        Self {
            label: label.into(),
            inner: Arc::new(comm),
        }
    }

    /// Single-process communicator used when no parallel runtime is present.
    pub fn serial() -> Self {
        Self::new("serial", ())
    }

    /// Diagnostic label of the communicator.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Attempts to view the underlying communicator as a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Whether both handles wrap the same communicator object.
    pub fn same_comm(&self, other: &Communicator) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Communicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Subsystems a builder contributes to the coupling phase.
#[derive(Debug, Clone)]
pub enum CouplingSubsystem {
    /// One subsystem iterated inside the coupling group.
    Single(SubsystemHandle),
    /// Displacement and load transfer, placed on either side of the aero solver.
    Transfer {
        /// Transfers structural displacements onto the aero surface.
        displacement: SubsystemHandle,
        /// Transfers aerodynamic loads back to the structure.
        load: SubsystemHandle,
    },
}

impl CouplingSubsystem {
    /// Number of handles carried by the contribution.
    pub fn handle_count(&self) -> usize {
        match self {
            CouplingSubsystem::Single(_) => 1,
            CouplingSubsystem::Transfer { .. } => 2,
        }
    }
}
