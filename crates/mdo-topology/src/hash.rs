use mdo_core::MdoError;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::node::GroupNode;
use crate::serde::to_canonical_json_bytes;
use crate::spec::CouplingSpec;

/// Hex SHA-256 of the canonical JSON form of `value`.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, MdoError> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(format!("{:x}", Sha256::digest(bytes)))
}

/// Structural hash of an assembled tree: names, child order, strategies and leaf labels.
pub fn topology_hash(root: &GroupNode) -> Result<String, MdoError> {
    stable_hash_string(&root.outline())
}

/// Hash of the coupling specification a tree was assembled from.
pub fn spec_hash(spec: &CouplingSpec) -> Result<String, MdoError> {
    stable_hash_string(spec)
}
