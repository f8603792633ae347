//! Solver strategies attached to group nodes and the role based selector.

use mdo_core::{ErrorInfo, MdoError};
use serde::{Deserialize, Serialize};

use crate::spec::ScenarioKind;

/// Name of the partition holding the coupled disciplines.
pub const COUPLING_PARTITION: &str = "coupling_group";
/// Name of the partition holding the balance subsystem.
pub const BALANCE_PARTITION: &str = "balance_group";

/// Role a group node plays in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Disciplines iterated together to a fixed point.
    TightCoupling,
    /// Coupling partition solved jointly with a balance partition.
    PartitionedCoupling,
    /// Static ordered sequence executed once.
    Sequence,
    /// Plain container whose children carry their own solvers.
    PassThrough,
}

/// Direction in which the Schur solve linearizes the partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linearization {
    /// Forward mode.
    Forward,
    /// Reverse mode.
    Reverse,
}

/// Solver print settings forwarded to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverPrint {
    /// Verbosity level.
    pub level: u8,
    /// Depth of nested solvers that inherit the level.
    pub depth: u8,
}

/// Nonlinear and linear solver pair attached to a group node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SolverStrategy {
    /// Block Gauss-Seidel iteration over all children.
    BlockGaussSeidel {
        /// Maximum number of iterations.
        max_iter: usize,
        /// Absolute residual tolerance.
        atol: f64,
        /// Relative residual tolerance.
        rtol: f64,
        /// Aitken relaxation of successive updates.
        use_aitken: bool,
        /// Iteration print level.
        iprint: u8,
    },
    /// Schur complement elimination between two named partitions.
    SchurElimination {
        /// Absolute residual tolerance.
        atol: f64,
        /// Relative residual tolerance.
        rtol: f64,
        /// Maximum number of outer iterations.
        max_iter: usize,
        /// Maximum number of partition sub-solves.
        max_sub_solves: usize,
        /// Abort the analysis when the solve does not converge.
        fail_on_non_convergence: bool,
        /// Converge each partition before the outer update.
        solve_subsystems: bool,
        /// Linearization direction for both the nonlinear and linear solve.
        linearization: Linearization,
        /// Coupling partition followed by the balance partition.
        partition_names: [String; 2],
        /// Print settings.
        print: SolverPrint,
    },
    /// Children execute exactly once in declared order.
    RunOnce,
}

impl SolverStrategy {
    /// Name of the host framework's nonlinear solver.
    pub fn nonlinear_solver_name(&self) -> &'static str {
        match self {
            SolverStrategy::BlockGaussSeidel { .. } => "NonlinearBlockGS",
            SolverStrategy::SchurElimination { .. } => "NonlinearSchurSolver",
            SolverStrategy::RunOnce => "NonlinearRunOnce",
        }
    }

    /// Name of the host framework's linear solver.
    pub fn linear_solver_name(&self) -> &'static str {
        match self {
            SolverStrategy::BlockGaussSeidel { .. } => "LinearBlockGS",
            SolverStrategy::SchurElimination { .. } => "LinearSchur",
            SolverStrategy::RunOnce => "LinearRunOnce",
        }
    }

    /// Short tag used in renders and counts.
    pub fn tag(&self) -> &'static str {
        match self {
            SolverStrategy::BlockGaussSeidel { .. } => "block_gauss_seidel",
            SolverStrategy::SchurElimination { .. } => "schur_elimination",
            SolverStrategy::RunOnce => "run_once",
        }
    }

    /// Whether the strategy iterates its children to convergence.
    pub fn is_iterative(&self) -> bool {
        !matches!(self, SolverStrategy::RunOnce)
    }
}

/// Parameters of the tight-coupling Gauss-Seidel solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockGaussSeidelOptions {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Absolute residual tolerance.
    pub atol: f64,
    /// Relative residual tolerance.
    pub rtol: f64,
    /// Aitken relaxation.
    pub use_aitken: bool,
    /// Iteration print level.
    pub iprint: u8,
}

impl Default for BlockGaussSeidelOptions {
    fn default() -> Self {
        Self {
            max_iter: 25,
            atol: 1e-8,
            rtol: 1e-8,
            use_aitken: true,
            iprint: 2,
        }
    }
}

/// Parameters of the partitioned Schur solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchurOptions {
    /// Absolute residual tolerance.
    pub atol: f64,
    /// Relative residual tolerance.
    pub rtol: f64,
    /// Maximum number of outer iterations.
    pub max_iter: usize,
    /// Maximum number of partition sub-solves.
    pub max_sub_solves: usize,
    /// Abort on non-convergence.
    pub fail_on_non_convergence: bool,
    /// Converge partitions before the outer update.
    pub solve_subsystems: bool,
    /// Linearization direction.
    pub linearization: Linearization,
    /// Print settings.
    pub print: SolverPrint,
}

impl SchurOptions {
    /// Defaults for a scenario kind.
    ///
    /// Aerodynamic scenarios pair a loose absolute tolerance with a vanishing
    /// relative one.
    pub fn for_kind(kind: ScenarioKind) -> Self {
        let (atol, rtol) = match kind {
            ScenarioKind::Aerodynamic => (1e-2, 1e-20),
            ScenarioKind::AeroStructural | ScenarioKind::AeroPropulsive => (1e-8, 1e-8),
        };
        Self {
            atol,
            rtol,
            max_iter: 10,
            max_sub_solves: 60,
            fail_on_non_convergence: true,
            solve_subsystems: true,
            linearization: Linearization::Reverse,
            print: SolverPrint { level: 2, depth: 4 },
        }
    }
}

/// Solver parameters for every strategy-bearing node of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Tight coupling parameters.
    pub block_gauss_seidel: BlockGaussSeidelOptions,
    /// Partitioned coupling parameters.
    pub schur: SchurOptions,
}

impl SolverOptions {
    /// Defaults for a scenario kind.
    pub fn for_kind(kind: ScenarioKind) -> Self {
        Self {
            block_gauss_seidel: BlockGaussSeidelOptions::default(),
            schur: SchurOptions::for_kind(kind),
        }
    }

    /// Applies user overrides, rejecting non-finite tolerances and empty budgets.
    pub fn with_overrides(mut self, overrides: &SolverOverrides) -> Result<Self, MdoError> {
        let bgs = &overrides.block_gauss_seidel;
        if let Some(max_iter) = bgs.max_iter {
            self.block_gauss_seidel.max_iter = positive("block_gauss_seidel.max_iter", max_iter)?;
        }
        if let Some(atol) = bgs.atol {
            self.block_gauss_seidel.atol = tolerance("block_gauss_seidel.atol", atol)?;
        }
        if let Some(rtol) = bgs.rtol {
            self.block_gauss_seidel.rtol = tolerance("block_gauss_seidel.rtol", rtol)?;
        }
        if let Some(use_aitken) = bgs.use_aitken {
            self.block_gauss_seidel.use_aitken = use_aitken;
        }

        let schur = &overrides.schur;
        if let Some(atol) = schur.atol {
            self.schur.atol = tolerance("schur.atol", atol)?;
        }
        if let Some(rtol) = schur.rtol {
            self.schur.rtol = tolerance("schur.rtol", rtol)?;
        }
        if let Some(max_iter) = schur.max_iter {
            self.schur.max_iter = positive("schur.max_iter", max_iter)?;
        }
        if let Some(max_sub_solves) = schur.max_sub_solves {
            self.schur.max_sub_solves = positive("schur.max_sub_solves", max_sub_solves)?;
        }
        if let Some(fail) = schur.fail_on_non_convergence {
            self.schur.fail_on_non_convergence = fail;
        }
        if let Some(linearization) = schur.linearization {
            self.schur.linearization = linearization;
        }
        Ok(self)
    }
}

fn tolerance(field: &str, value: f64) -> Result<f64, MdoError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(MdoError::Config(
            ErrorInfo::new("invalid-tolerance", "tolerance must be finite and non-negative")
                .with_context("field", field)
                .with_context("entry", value.to_string()),
        ))
    }
}

fn positive(field: &str, value: usize) -> Result<usize, MdoError> {
    if value == 0 {
        return Err(MdoError::Config(
            ErrorInfo::new("invalid-iteration-budget", "iteration budget must be at least one")
                .with_context("field", field),
        ));
    }
    Ok(value)
}

/// Optional Gauss-Seidel overrides.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockGaussSeidelOverrides {
    /// Replaces the iteration budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iter: Option<usize>,
    /// Replaces the absolute tolerance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atol: Option<f64>,
    /// Replaces the relative tolerance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtol: Option<f64>,
    /// Enables or disables Aitken relaxation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_aitken: Option<bool>,
}

/// Optional Schur overrides.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SchurOverrides {
    /// Replaces the absolute tolerance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atol: Option<f64>,
    /// Replaces the relative tolerance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtol: Option<f64>,
    /// Replaces the outer iteration budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iter: Option<usize>,
    /// Replaces the sub-solve budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sub_solves: Option<usize>,
    /// Makes non-convergence fatal or tolerated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on_non_convergence: Option<bool>,
    /// Replaces the linearization direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linearization: Option<Linearization>,
}

/// Solver overrides carried by a coupling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SolverOverrides {
    /// Tight coupling overrides.
    #[serde(default)]
    pub block_gauss_seidel: BlockGaussSeidelOverrides,
    /// Partitioned coupling overrides.
    #[serde(default)]
    pub schur: SchurOverrides,
}

/// Returns the solver strategy to attach to a node playing `role`.
///
/// Tolerances do not vary with the discipline pairing; every tight coupling
/// group of a scenario receives the same Gauss-Seidel parameters.
pub fn select_strategy(role: NodeRole, options: &SolverOptions) -> Option<SolverStrategy> {
    match role {
        NodeRole::TightCoupling => {
            let bgs = &options.block_gauss_seidel;
            Some(SolverStrategy::BlockGaussSeidel {
                max_iter: bgs.max_iter,
                atol: bgs.atol,
                rtol: bgs.rtol,
                use_aitken: bgs.use_aitken,
                iprint: bgs.iprint,
            })
        }
        NodeRole::PartitionedCoupling => {
            let schur = &options.schur;
            Some(SolverStrategy::SchurElimination {
                atol: schur.atol,
                rtol: schur.rtol,
                max_iter: schur.max_iter,
                max_sub_solves: schur.max_sub_solves,
                fail_on_non_convergence: schur.fail_on_non_convergence,
                solve_subsystems: schur.solve_subsystems,
                linearization: schur.linearization,
                partition_names: [
                    COUPLING_PARTITION.to_string(),
                    BALANCE_PARTITION.to_string(),
                ],
                print: schur.print,
            })
        }
        NodeRole::Sequence => Some(SolverStrategy::RunOnce),
        NodeRole::PassThrough => None,
    }
}
