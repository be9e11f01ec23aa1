//! Per-run context - build once, pass everywhere
//!
//! # Design
//!
//! A `RunContext` is created at the start of every pipeline run and threaded by
//! reference through the escalation gateway down to each oracle call. It carries
//! the run correlation id used to tie log events and usage metrics together.
//!
//! It is never stored in a global: two runs in the same process (tests, or a
//! future batch mode) each get their own id and cannot mix their telemetry.
//!
//! ```text
//! commands/run.rs:
//!   RunContext::new() -> &RunContext
//!   |
//!   v
//! Pipeline::run(&ctx, ..) -> EscalationGateway::resolve_ambiguous(&ctx, ..)
//!   -> ClassificationOracle::classify_ambiguous(&OracleRequest { run: &ctx, .. })
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Correlation data for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
  run_id: Uuid,
  started_at: DateTime<Utc>,
}

impl RunContext {
  /// Start a new run with a fresh random correlation id
  pub fn new() -> Self {
    Self::with_id(Uuid::new_v4())
  }

  /// Start a run with a known correlation id (replays, tests)
  pub fn with_id(run_id: Uuid) -> Self {
    Self {
      run_id,
      started_at: Utc::now(),
    }
  }

  pub fn run_id(&self) -> Uuid {
    self.run_id
  }

  pub fn started_at(&self) -> DateTime<Utc> {
    self.started_at
  }
}

impl Default for RunContext {
  fn default() -> Self {
    Self::new()
  }
}
