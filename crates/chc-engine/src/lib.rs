#![deny(missing_docs)]
#![doc = "Verification engines for chain-structured CHC systems."]

mod chain;
mod engine;
mod tpa;
mod values;

pub use engine::{engine_is_supported, solve_trivial, Engine};
pub use tpa::TpaEngine;
