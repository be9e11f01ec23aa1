//! relnotes: draft release notes from version-control history
//!
//! Changes pass through deterministic rules first; only the ones the rules
//! cannot decide are escalated to a classification oracle. Every decision
//! lands in a review manifest that a person edits before Markdown is rendered.

pub mod classify;
pub mod commands;
pub mod core;
pub mod harvest;
pub mod manifest;
pub mod model;
pub mod oracle;
pub mod pipeline;
pub mod render;
pub mod ui;
pub mod utils;
