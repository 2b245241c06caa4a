#![deny(missing_docs)]
#![doc = "Term DAG and Z3-backed decision procedures for the CHC solver."]

mod smt;
mod term;

pub use smt::{get_model, interpolate, interval_hull, is_sat, project, simplify};
pub use term::{AtomOp, Sort, TermContext, TermRef, Value};
