use std::collections::BTreeSet;

use mdo_core::{DisciplineKey, ErrorInfo, MdoError};
use serde::{Deserialize, Serialize};

use crate::strategy::{SolverOptions, SolverOverrides};

fn config_error(code: &str, message: impl Into<String>) -> MdoError {
    MdoError::Config(ErrorInfo::new(code, message.into()))
}

fn render_set<'a>(keys: impl IntoIterator<Item = &'a DisciplineKey>) -> String {
    keys.into_iter()
        .map(DisciplineKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Selects what sits in the coupling slot of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "CouplingGroupTypeRepr", into = "CouplingGroupTypeRepr")]
pub enum CouplingGroupType {
    /// Every discipline iterated together inside a nested coupling group.
    #[default]
    FullCoupling,
    /// Only the named discipline's coupling subsystem, without extra nesting.
    SingleDisciplineOnly(DisciplineKey),
    /// The coupling slot is left empty.
    NoCoupling,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CouplingGroupTypeRepr {
    FullCoupling,
    AerodynamicsOnly,
    SingleDisciplineOnly(DisciplineKey),
    #[serde(rename = "none")]
    NoCoupling,
}

impl From<CouplingGroupTypeRepr> for CouplingGroupType {
    fn from(repr: CouplingGroupTypeRepr) -> Self {
        match repr {
            CouplingGroupTypeRepr::FullCoupling => CouplingGroupType::FullCoupling,
            CouplingGroupTypeRepr::AerodynamicsOnly => {
                CouplingGroupType::SingleDisciplineOnly(DisciplineKey::Aero)
            }
            CouplingGroupTypeRepr::SingleDisciplineOnly(key) => {
                CouplingGroupType::SingleDisciplineOnly(key)
            }
            CouplingGroupTypeRepr::NoCoupling => CouplingGroupType::NoCoupling,
        }
    }
}

impl From<CouplingGroupType> for CouplingGroupTypeRepr {
    fn from(value: CouplingGroupType) -> Self {
        match value {
            CouplingGroupType::FullCoupling => CouplingGroupTypeRepr::FullCoupling,
            CouplingGroupType::SingleDisciplineOnly(key) => {
                CouplingGroupTypeRepr::SingleDisciplineOnly(key)
            }
            CouplingGroupType::NoCoupling => CouplingGroupTypeRepr::NoCoupling,
        }
    }
}

/// Rule naming the discipline whose Schur-aware post-coupling subsystem is
/// evaluated inside the coupling partition.
///
/// Aerodynamic scenarios take the first entry of the post-coupling order.
/// Multi-discipline scenarios always pair the rule with one fixed discipline.
/// The two rules disagree whenever the aero discipline is not listed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchurAwareRule {
    /// Position based: the first discipline of the post-coupling order.
    FirstInPostOrder,
    /// Fixed pairing with the given discipline.
    Paired(DisciplineKey),
}

impl SchurAwareRule {
    /// Resolves the designated discipline for a validated post-coupling order.
    pub fn designate(&self, post_coupling_order: &[DisciplineKey]) -> Option<DisciplineKey> {
        match self {
            SchurAwareRule::FirstInPostOrder => post_coupling_order.first().copied(),
            SchurAwareRule::Paired(key) => post_coupling_order
                .iter()
                .find(|entry| *entry == key)
                .copied(),
        }
    }
}

/// Rule placing post-coupling subsystems around the Schur node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchurPostPlacement {
    /// Every post-coupling subsystem runs inside the coupling partition in
    /// post-coupling order and nothing follows the Schur node. The designated
    /// discipline contributes its Schur-aware subsystem when it declares one.
    Partition,
    /// Only the designated discipline's Schur-aware subsystem joins the
    /// partition. Ordinary post-coupling subsystems follow the Schur node.
    Designated {
        /// Whether the designated discipline's ordinary subsystem still runs
        /// after the Schur node once its Schur-aware variant was placed.
        repeat_outside: bool,
    },
}

/// Supported discipline combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Aerodynamics alone.
    Aerodynamic,
    /// Aerodynamics, structures and the load/displacement transfer.
    AeroStructural,
    /// Aerodynamics and propulsion.
    AeroPropulsive,
}

impl ScenarioKind {
    /// Every supported scenario kind.
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::Aerodynamic,
        ScenarioKind::AeroStructural,
        ScenarioKind::AeroPropulsive,
    ];

    /// Active disciplines of the kind.
    pub fn disciplines(&self) -> &'static [DisciplineKey] {
        match self {
            ScenarioKind::Aerodynamic => &[DisciplineKey::Aero],
            ScenarioKind::AeroStructural => &[
                DisciplineKey::Aero,
                DisciplineKey::Struct,
                DisciplineKey::Ldxfer,
            ],
            ScenarioKind::AeroPropulsive => &[DisciplineKey::Aero, DisciplineKey::Prop],
        }
    }

    /// Identifies the kind from an active discipline set.
    pub fn from_disciplines(disciplines: &[DisciplineKey]) -> Result<Self, MdoError> {
        if disciplines.is_empty() {
            return Err(config_error(
                "empty-discipline-set",
                "a scenario needs at least one active discipline",
            ));
        }
        let mut seen = BTreeSet::new();
        for key in disciplines {
            if !seen.insert(*key) {
                return Err(MdoError::Config(
                    ErrorInfo::new("duplicate-discipline", "discipline listed more than once")
                        .with_context("entry", key.as_str()),
                ));
            }
        }
        ScenarioKind::ALL
            .into_iter()
            .find(|kind| kind.disciplines().iter().copied().collect::<BTreeSet<_>>() == seen)
            .ok_or_else(|| {
                MdoError::Config(
                    ErrorInfo::new("unsupported-discipline-set", "no scenario couples these disciplines")
                        .with_context("disciplines", render_set(disciplines))
                        .with_hint("supported sets: {aero}, {aero, struct, ldxfer}, {aero, prop}"),
                )
            })
    }

    /// Default order of the pre-coupling subsystems.
    pub fn default_pre_coupling_order(&self) -> &'static [DisciplineKey] {
        self.disciplines()
    }

    /// Default order of the post-coupling subsystems.
    pub fn default_post_coupling_order(&self) -> &'static [DisciplineKey] {
        match self {
            ScenarioKind::AeroStructural => &[
                DisciplineKey::Ldxfer,
                DisciplineKey::Aero,
                DisciplineKey::Struct,
            ],
            other => other.disciplines(),
        }
    }

    /// Disciplines that contribute a mesh coordinate subsystem.
    pub fn meshed_disciplines(&self) -> &'static [DisciplineKey] {
        match self {
            ScenarioKind::AeroStructural => &[DisciplineKey::Aero, DisciplineKey::Struct],
            // the propulsion model carries no mesh
            ScenarioKind::Aerodynamic | ScenarioKind::AeroPropulsive => &[DisciplineKey::Aero],
        }
    }

    /// Name of the mesh node created for a discipline in parallel mode.
    pub fn mesh_node_name(&self, discipline: DisciplineKey) -> String {
        match self {
            ScenarioKind::Aerodynamic => "mesh".to_string(),
            _ => format!("{discipline}_mesh"),
        }
    }

    /// Name of the Schur-partitioned node when a balance group is present.
    pub fn schur_node_name(&self) -> &'static str {
        match self {
            ScenarioKind::AeroStructural => "coupling_aerostruct",
            ScenarioKind::Aerodynamic | ScenarioKind::AeroPropulsive => "coupling_schur",
        }
    }

    /// Which discipline gets the Schur-aware post-coupling subsystem.
    pub fn schur_aware_rule(&self) -> SchurAwareRule {
        match self {
            ScenarioKind::Aerodynamic => SchurAwareRule::FirstInPostOrder,
            ScenarioKind::AeroStructural | ScenarioKind::AeroPropulsive => {
                SchurAwareRule::Paired(DisciplineKey::Aero)
            }
        }
    }

    /// Where post-coupling subsystems go when a balance group is present.
    pub fn schur_post_placement(&self) -> SchurPostPlacement {
        match self {
            ScenarioKind::AeroStructural => SchurPostPlacement::Partition,
            ScenarioKind::Aerodynamic => SchurPostPlacement::Designated { repeat_outside: false },
            // aero post-processing runs both inside and after the Schur solve
            ScenarioKind::AeroPropulsive => SchurPostPlacement::Designated { repeat_outside: true },
        }
    }

    /// Name of the coupling slot when only one discipline is coupled.
    pub fn single_discipline_node_name(&self, discipline: DisciplineKey) -> String {
        match self {
            ScenarioKind::Aerodynamic => crate::COUPLING_NODE.to_string(),
            _ => discipline.as_str().to_string(),
        }
    }
}

/// Typed scenario configuration consumed by the topology assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingSpec {
    /// Active disciplines.
    pub disciplines: Vec<DisciplineKey>,
    /// Order of the pre-coupling subsystems; defaults per scenario kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_coupling_order: Option<Vec<DisciplineKey>>,
    /// Order of the post-coupling subsystems; defaults per scenario kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_coupling_order: Option<Vec<DisciplineKey>>,
    /// Content of the coupling slot.
    #[serde(default)]
    pub coupling_group_type: CouplingGroupType,
    /// Whether a balance (trim) subsystem is solved jointly with the coupling.
    #[serde(default)]
    pub balance_group: bool,
    /// Whether mesh outputs are routed through a geometry builder.
    #[serde(default)]
    pub geometry: bool,
    /// Whether builder initialization and mesh wiring happen inside the scenario.
    #[serde(default, alias = "in_MultipointParallel")]
    pub in_multipoint_parallel: bool,
    /// Solver tolerance overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverOverrides>,
}

impl CouplingSpec {
    /// Creates a configuration for the given active disciplines with default options.
    pub fn new(disciplines: impl IntoIterator<Item = DisciplineKey>) -> Self {
        Self {
            disciplines: disciplines.into_iter().collect(),
            pre_coupling_order: None,
            post_coupling_order: None,
            coupling_group_type: CouplingGroupType::FullCoupling,
            balance_group: false,
            geometry: false,
            in_multipoint_parallel: false,
            solver: None,
        }
    }

    /// Configuration for an aerodynamic-only scenario.
    pub fn aerodynamic() -> Self {
        Self::new(ScenarioKind::Aerodynamic.disciplines().iter().copied())
            .with_coupling_group_type(CouplingGroupType::SingleDisciplineOnly(DisciplineKey::Aero))
    }

    /// Configuration for an aerostructural scenario.
    pub fn aerostructural() -> Self {
        Self::new(ScenarioKind::AeroStructural.disciplines().iter().copied())
    }

    /// Configuration for an aeropropulsive scenario.
    pub fn aeropropulsive() -> Self {
        Self::new(ScenarioKind::AeroPropulsive.disciplines().iter().copied())
    }

    /// Overrides the pre-coupling order.
    pub fn with_pre_coupling_order(mut self, order: impl IntoIterator<Item = DisciplineKey>) -> Self {
        self.pre_coupling_order = Some(order.into_iter().collect());
        self
    }

    /// Overrides the post-coupling order.
    pub fn with_post_coupling_order(
        mut self,
        order: impl IntoIterator<Item = DisciplineKey>,
    ) -> Self {
        self.post_coupling_order = Some(order.into_iter().collect());
        self
    }

    /// Sets the coupling group type.
    pub fn with_coupling_group_type(mut self, coupling_group_type: CouplingGroupType) -> Self {
        self.coupling_group_type = coupling_group_type;
        self
    }

    /// Toggles the balance group.
    pub fn with_balance_group(mut self, present: bool) -> Self {
        self.balance_group = present;
        self
    }

    /// Toggles the geometry builder.
    pub fn with_geometry(mut self, present: bool) -> Self {
        self.geometry = present;
        self
    }

    /// Toggles parallel multipoint instantiation.
    pub fn with_multipoint_parallel(mut self, enabled: bool) -> Self {
        self.in_multipoint_parallel = enabled;
        self
    }

    /// Sets solver overrides.
    pub fn with_solver(mut self, overrides: SolverOverrides) -> Self {
        self.solver = Some(overrides);
        self
    }

    /// Validates the configuration and resolves defaults into a [`CouplingLayout`].
    pub fn validate(&self) -> Result<CouplingLayout, MdoError> {
        let kind = ScenarioKind::from_disciplines(&self.disciplines)?;
        let active: BTreeSet<DisciplineKey> = self.disciplines.iter().copied().collect();

        let pre_coupling_order = match &self.pre_coupling_order {
            Some(order) => {
                validate_order("pre_coupling_order", order, &active)?;
                order.clone()
            }
            None => kind.default_pre_coupling_order().to_vec(),
        };
        let post_coupling_order = match &self.post_coupling_order {
            Some(order) => {
                validate_order("post_coupling_order", order, &active)?;
                order.clone()
            }
            None => kind.default_post_coupling_order().to_vec(),
        };

        if let CouplingGroupType::SingleDisciplineOnly(key) = self.coupling_group_type {
            if !active.contains(&key) {
                return Err(MdoError::Config(
                    ErrorInfo::new(
                        "single-discipline-inactive",
                        "single-discipline coupling names an inactive discipline",
                    )
                    .with_context("entry", key.as_str())
                    .with_context("valid", render_set(&active)),
                ));
            }
            if key == DisciplineKey::Ldxfer {
                return Err(MdoError::Config(
                    ErrorInfo::new(
                        "single-discipline-transfer",
                        "the load/displacement transfer cannot be coupled on its own",
                    )
                    .with_context("entry", key.as_str()),
                ));
            }
        }

        let mut solver = SolverOptions::for_kind(kind);
        if let Some(overrides) = &self.solver {
            solver = solver.with_overrides(overrides)?;
        }

        Ok(CouplingLayout {
            kind,
            pre_coupling_order,
            post_coupling_order,
            coupling_group_type: self.coupling_group_type,
            balance_group: self.balance_group,
            geometry: self.geometry,
            in_multipoint_parallel: self.in_multipoint_parallel,
            solver,
        })
    }
}

fn validate_order(
    field: &str,
    order: &[DisciplineKey],
    active: &BTreeSet<DisciplineKey>,
) -> Result<(), MdoError> {
    let valid = render_set(active);
    if let Some(entry) = order.iter().find(|entry| !active.contains(entry)) {
        return Err(MdoError::Config(
            ErrorInfo::new("order-foreign-entry", "ordering names an inactive discipline")
                .with_context("field", field)
                .with_context("entry", entry.as_str())
                .with_context("valid", valid),
        ));
    }
    let mut seen = BTreeSet::new();
    for entry in order {
        if !seen.insert(*entry) {
            return Err(MdoError::Config(
                ErrorInfo::new("order-duplicate-entry", "ordering lists a discipline twice")
                    .with_context("field", field)
                    .with_context("entry", entry.as_str())
                    .with_context("valid", valid),
            ));
        }
    }
    if seen.len() != active.len() {
        let missing: Vec<_> = active.difference(&seen).collect();
        return Err(MdoError::Config(
            ErrorInfo::new("order-wrong-length", "ordering is not a permutation of the disciplines")
                .with_context("field", field)
                .with_context("expected", active.len().to_string())
                .with_context("found", order.len().to_string())
                .with_context("missing", render_set(missing))
                .with_context("valid", valid),
        ));
    }
    Ok(())
}

/// Validated, default-resolved form of a [`CouplingSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingLayout {
    /// Scenario kind derived from the active disciplines.
    pub kind: ScenarioKind,
    /// Resolved pre-coupling order.
    pub pre_coupling_order: Vec<DisciplineKey>,
    /// Resolved post-coupling order.
    pub post_coupling_order: Vec<DisciplineKey>,
    /// Content of the coupling slot.
    pub coupling_group_type: CouplingGroupType,
    /// Whether the two-level Schur form is used.
    pub balance_group: bool,
    /// Whether a geometry builder participates.
    pub geometry: bool,
    /// Whether builders are initialized inside the scenario.
    pub in_multipoint_parallel: bool,
    /// Solver parameters for every strategy-bearing node.
    pub solver: SolverOptions,
}

impl CouplingLayout {
    /// Discipline whose Schur-aware post-coupling subsystem joins the coupling partition.
    pub fn schur_aware_discipline(&self) -> Option<DisciplineKey> {
        if !self.balance_group {
            return None;
        }
        self.kind
            .schur_aware_rule()
            .designate(&self.post_coupling_order)
    }

    /// Dotted path of the node holding the coupling slot, relative to the scenario root.
    pub fn coupling_slot_parent(&self) -> Option<String> {
        if self.balance_group {
            Some(format!(
                "{}.{}",
                self.kind.schur_node_name(),
                crate::strategy::COUPLING_PARTITION
            ))
        } else {
            None
        }
    }

    /// Dotted path of the full coupling group, shaped by the presence of a balance group.
    pub fn coupling_group_path(&self) -> String {
        match self.coupling_slot_parent() {
            Some(parent) => format!("{parent}.{}", crate::COUPLING_NODE),
            None => crate::COUPLING_NODE.to_string(),
        }
    }
}
