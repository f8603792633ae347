use std::collections::BTreeMap;

use mdo_core::{ErrorInfo, MdoError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

fn serde_error(code: &str, err: impl ToString) -> MdoError {
    MdoError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<_, _> = map
                .into_iter()
                .map(|(key, value)| (key, sort_keys(value)))
                .collect();
            Value::Object(sorted.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Serializes a value into compact JSON with object keys in sorted order.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, MdoError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json-encode", err))?;
    serde_json::to_vec(&sort_keys(value)).map_err(|err| serde_error("json-write", err))
}

/// Pretty JSON rendering used by reports.
pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, MdoError> {
    serde_json::to_string_pretty(value).map_err(|err| serde_error("json-encode", err))
}

/// Restores a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, MdoError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json-read", err))
}

/// Restores a value from a YAML document.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, MdoError> {
    serde_yaml::from_slice(data).map_err(|err| serde_error("yaml-read", err))
}
