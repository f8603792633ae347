//! Errors raised while configuring and assembling coupling topologies.
//!
//! Every failure carries an [`ErrorInfo`] whose `code` is a kebab-case slug
//! such as `order-foreign-entry` or `missing-builder`. Offending values go in
//! `context` under fixed keys (`entry`, `valid`, `discipline`, `path`, `phase`).

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Diagnostic payload of an [`MdoError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Kebab-case slug identifying the failure, e.g. `missing-node-count`.
    pub code: String,
    /// One-line description of what went wrong.
    pub message: String,
    /// Offending disciplines, ordering entries, tree paths or builder phases.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Suggested fix, typically the accepted values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with a code and message and no context.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records an offending value, e.g. `("entry", "struct")`.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Context value stored under `key`, if any.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }
}

/// Canonical error type for topology assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum MdoError {
    /// Invalid scenario configuration (orderings, discipline sets, targets).
    #[error("configuration error: {0}")]
    Config(ErrorInfo),
    /// Failures raised by, or on behalf of, discipline builders.
    #[error("builder error: {0}")]
    Builder(ErrorInfo),
    /// Structural tree errors (duplicate names, unknown paths).
    #[error("topology error: {0}")]
    Topology(ErrorInfo),
    /// Serialization and config-file errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    /// Renders as `[code] message {key=value, ..} (hint: ..)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.context.is_empty() {
            let pairs: Vec<String> = self
                .context
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            write!(f, " {{{}}}", pairs.join(", "))?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

impl MdoError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            MdoError::Config(info)
            | MdoError::Builder(info)
            | MdoError::Topology(info)
            | MdoError::Serde(info) => info,
        }
    }

    /// Whether this is a configuration error raised during validation.
    pub fn is_config(&self) -> bool {
        matches!(self, MdoError::Config(_))
    }
}
