#![deny(missing_docs)]
#![doc = "Shared identifiers, errors, and configuration for the CHC solver workspace."]

use serde::{Deserialize, Serialize};

pub mod cancel;
pub mod errors;
pub mod options;
pub mod rng;

pub use cancel::CancellationToken;
pub use errors::{ChcError, ErrorInfo};
pub use options::Options;
pub use rng::{derive_substream_seed, RngHandle};

/// Identifier for a node within a hypergraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Identifier for a hyperedge within a hypergraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(u64);

impl EdgeId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Final verdict of one solve invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationAnswer {
    /// An inductive interpretation for every predicate exists.
    Safe,
    /// A derivation of `false` exists.
    Unsafe,
    /// The engine gave up (resource exhaustion, cancellation, solver failure).
    Unknown,
}
