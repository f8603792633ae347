use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, MdoError};

/// Identifies a participating discipline slot within a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisciplineKey {
    /// Aerodynamic solver.
    Aero,
    /// Structural solver.
    Struct,
    /// Propulsion model.
    Prop,
    /// Load and displacement transfer between aero and struct meshes.
    Ldxfer,
}

impl DisciplineKey {
    /// Every discipline key in declaration order.
    pub const ALL: [DisciplineKey; 4] = [
        DisciplineKey::Aero,
        DisciplineKey::Struct,
        DisciplineKey::Prop,
        DisciplineKey::Ldxfer,
    ];

    /// Returns the short name used in subsystem and variable names.
    pub fn as_str(&self) -> &'static str {
        match self {
            DisciplineKey::Aero => "aero",
            DisciplineKey::Struct => "struct",
            DisciplineKey::Prop => "prop",
            DisciplineKey::Ldxfer => "ldxfer",
        }
    }
}

impl fmt::Display for DisciplineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisciplineKey {
    type Err = MdoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DisciplineKey::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| {
                MdoError::Config(
                    ErrorInfo::new("unknown-discipline", "unrecognised discipline key")
                        .with_context("entry", value)
                        .with_context("valid", "aero, struct, prop, ldxfer"),
                )
            })
    }
}
