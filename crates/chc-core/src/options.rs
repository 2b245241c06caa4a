//! Solver configuration carried as a flat key value store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Option key selecting the background theory.
pub const LOGIC: &str = "logic";
/// Option key selecting the verification engine.
pub const ENGINE: &str = "engine";
/// Option key enabling witness production.
pub const COMPUTE_WITNESS: &str = "compute-witness";

/// Flat option store passed to engines and the driver.
///
/// Unknown keys are preserved so that callers can thread experiment flags
/// through without this crate learning about them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Options {
    entries: BTreeMap<String, String>,
}

impl Options {
    /// Creates an empty option store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Returns the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the configured logic, defaulting to `QF_LIA`.
    pub fn logic(&self) -> &str {
        self.get(LOGIC).unwrap_or("QF_LIA")
    }

    /// Returns the configured engine, defaulting to `tpa`.
    pub fn engine(&self) -> &str {
        self.get(ENGINE).unwrap_or("tpa")
    }

    /// Whether witness production is enabled. Defaults to false.
    pub fn compute_witness(&self) -> bool {
        matches!(self.get(COMPUTE_WITNESS), Some("true") | Some("1"))
    }
}
