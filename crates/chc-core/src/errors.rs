//! Structured error types shared across the solver crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Diagnostic payload carried by every [`ChcError`] variant.
///
/// The payload keeps a stable machine-readable code next to the prose so
/// drivers can match on failures without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (symbols, edge ids, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a payload from a code and a message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Attaches one context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        for (key, value) in &self.context {
            write!(f, "; {key}={value}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

/// Canonical error type for the solver workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum ChcError {
    /// Ill-typed or ill-structured clause input; fatal to the clause system.
    #[error("malformed clause: {0}")]
    Clause(ErrorInfo),
    /// Logic selection incompatible with a term in the system.
    #[error("unsupported logic: {0}")]
    Logic(ErrorInfo),
    /// The theory solver gave up; engines surface this as UNKNOWN.
    #[error("solver failure: {0}")]
    Solver(ErrorInfo),
    /// Structural hypergraph errors.
    #[error("graph error: {0}")]
    Graph(ErrorInfo),
    /// Witness construction or translation errors.
    #[error("witness error: {0}")]
    Witness(ErrorInfo),
    /// The caller-provided cancellation token fired.
    #[error("cancelled: {0}")]
    Cancelled(ErrorInfo),
}

impl ChcError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            ChcError::Clause(info)
            | ChcError::Logic(info)
            | ChcError::Solver(info)
            | ChcError::Graph(info)
            | ChcError::Witness(info)
            | ChcError::Cancelled(info) => info,
        }
    }

    /// Shorthand for a cancellation error raised at a polling point.
    pub fn cancelled(at: impl Into<String>) -> Self {
        ChcError::Cancelled(ErrorInfo::new("cancelled", "solve was cancelled").with_context("at", at))
    }
}
