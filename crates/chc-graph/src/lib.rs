#![deny(missing_docs)]
#![doc = "Clause model, normalization, and hypergraph representation for CHC systems."]

mod builder;
mod clauses;
mod generators;
mod hypergraph;
mod normalizer;
mod versions;
mod witness;

pub use builder::GraphBuilder;
pub use clauses::{
    Clause, ClauseSystem, PredicateInstance, PredicateSignature, SymRef, SymbolTable,
};
pub use generators::gen_linear_system;
pub use hypergraph::{HyperEdge, HyperGraph, NormalGraph};
pub use normalizer::{NormalizedClause, NormalizedSystem, Normalizer};
pub use versions::{Version, VersionManager};
pub use witness::{DerivationStep, InvalidityWitness, ValidityWitness, VerificationResult};
