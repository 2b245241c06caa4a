#![deny(missing_docs)]
#![doc = "Independent witness validation for CHC verification results."]

mod validator;

pub use validator::{Validation, Validator};
