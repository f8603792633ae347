//! Provenance and schema descriptors attached to assembled topologies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic version describing the schema of serialized payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version incremented for breaking changes.
    pub major: u32,
    /// Minor version incremented for additive changes.
    pub minor: u32,
    /// Patch version incremented for bug fixes and documentation updates.
    pub patch: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

/// Provenance information attached to every assembled scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TopologyProvenance {
    /// Schema of the serialized outline.
    pub schema_version: SchemaVersion,
    /// Name of the scenario the tree was assembled for.
    pub scenario: String,
    /// Hash of the coupling specification used as input.
    pub spec_hash: String,
    /// Canonical hash of the assembled tree outline.
    pub topology_hash: String,
    /// Version map for all tools involved in the assembly.
    pub tool_versions: BTreeMap<String, String>,
}
