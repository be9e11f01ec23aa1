//! Core building blocks shared by every relnotes command
//!
//! - **config**: relnotes.toml parsing and validation
//! - **context**: per-run correlation data threaded through the pipeline
//! - **error**: error types with contextual help messages and exit codes
//! - **vcs**: git operations (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
