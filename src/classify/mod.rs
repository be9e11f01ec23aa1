//! Deterministic classification stage
//!
//! - **conventional**: `type(scope)!: description` header parsing
//! - **rules**: the rule engine deciding include/exclude without external calls

pub mod conventional;
pub mod rules;

pub use rules::{Classification, RuleClassifier};
