//! Escalation gateway
//!
//! Wraps a `ClassificationOracle` behind a strict contract:
//! - called only for a non-empty ambiguous subset
//! - transient transport failures are retried with exponential backoff
//! - every answer is validated; a malformed one aborts the run (never retried, never guessed)
//! - calls run on a bounded rayon pool and are re-joined in input order

use super::schema::OracleDecision;
use super::{ChangeContext, ClassificationOracle, FILTER_OPERATION, OracleFailure, OracleRequest};
use crate::core::context::RunContext;
use crate::core::error::{NotesResult, OracleError};
use crate::model::{ChangeRecord, Decision};
use crate::ui::progress::OracleProgress;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Retry policy for transient oracle failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Attempts after the first one
  pub max_retries: u32,
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
}

impl RetryPolicy {
  /// Single attempt, no waiting
  pub fn no_retry() -> Self {
    Self {
      max_retries: 0,
      initial_backoff: Duration::ZERO,
      max_backoff: Duration::ZERO,
    }
  }

  /// Delay before retry number `retry` (1-based): doubles each time, capped
  pub fn backoff(&self, retry: u32) -> Duration {
    let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
    self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_retries: 2,
      initial_backoff: Duration::from_millis(500),
      max_backoff: Duration::from_secs(30),
    }
  }
}

/// Resolves ambiguous changes through the oracle
pub struct EscalationGateway<'a> {
  oracle: &'a dyn ClassificationOracle,
  retry: RetryPolicy,
  concurrency: usize,
  show_progress: bool,
}

impl<'a> EscalationGateway<'a> {
  pub fn new(oracle: &'a dyn ClassificationOracle) -> Self {
    Self {
      oracle,
      retry: RetryPolicy::default(),
      concurrency: 1,
      show_progress: false,
    }
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// Maximum calls in flight (at least 1)
  pub fn with_concurrency(mut self, concurrency: usize) -> Self {
    self.concurrency = concurrency.max(1);
    self
  }

  pub fn with_progress(mut self, show_progress: bool) -> Self {
    self.show_progress = show_progress;
    self
  }

  /// One oracle decision per record, in the same order as `records`
  ///
  /// Returns without touching the oracle when `records` is empty. The first
  /// failure aborts the whole batch.
  pub fn resolve_ambiguous(&self, run: &RunContext, records: &[Arc<ChangeRecord>]) -> NotesResult<Vec<Decision>> {
    if records.is_empty() {
      return Ok(Vec::new());
    }

    tracing::debug!(
      run_id = %run.run_id(),
      backend = self.oracle.name(),
      count = records.len(),
      concurrency = self.concurrency,
      "escalating ambiguous changes"
    );

    let progress = self
      .show_progress
      .then(|| OracleProgress::new(records.len(), "Classifying ambiguous changes"));

    let pool = rayon::ThreadPoolBuilder::new().num_threads(self.concurrency).build()?;

    pool.install(|| {
      records
        .par_iter()
        .map(|record| {
          let decision = self.resolve_one(run, record);
          if let Some(progress) = &progress {
            progress.inc();
          }
          decision
        })
        .collect::<NotesResult<Vec<_>>>()
    })
  }

  fn resolve_one(&self, run: &RunContext, record: &ChangeRecord) -> NotesResult<Decision> {
    let request = OracleRequest {
      run,
      operation: FILTER_OPERATION,
      context: ChangeContext::from_record(record),
    };

    let mut attempt: u32 = 0;
    loop {
      attempt += 1;
      let started = Instant::now();
      let result = self.oracle.classify_ambiguous(&request);
      let latency_ms = started.elapsed().as_millis() as u64;

      match result {
        Ok(response) => {
          tracing::info!(
            operation = request.operation,
            model = %response.model,
            run_id = %run.run_id(),
            record_id = %record.id,
            latency_ms,
            attempt,
            prompt_tokens = response.usage.map(|u| u.prompt_tokens),
            completion_tokens = response.usage.map(|u| u.completion_tokens),
            total_tokens = response.usage.map(|u| u.total_tokens),
            "oracle call"
          );

          let decision = OracleDecision::from_payload(&response.payload).map_err(|detail| OracleError::Malformed {
            record_id: record.id.clone(),
            subject: record.subject.clone(),
            detail,
          })?;
          return Ok(decision.into_decision());
        }
        Err(failure) => {
          tracing::warn!(
            operation = request.operation,
            model = self.oracle.model(),
            run_id = %run.run_id(),
            record_id = %record.id,
            latency_ms,
            attempt,
            error = %failure,
            "oracle call failed"
          );

          if failure.is_transient() && attempt <= self.retry.max_retries {
            std::thread::sleep(self.retry.backoff(attempt));
            continue;
          }
          return Err(failure_to_error(failure, record, attempt).into());
        }
      }
    }
  }
}

fn failure_to_error(failure: OracleFailure, record: &ChangeRecord, attempts: u32) -> OracleError {
  match failure {
    OracleFailure::NotConfigured(detail) => OracleError::NotConfigured { detail },
    OracleFailure::Timeout => OracleError::Timeout {
      record_id: record.id.clone(),
      attempts,
    },
    OracleFailure::Transport { detail, .. } => OracleError::Transport {
      record_id: record.id.clone(),
      attempts,
      detail,
    },
    OracleFailure::InvalidResponse(detail) => OracleError::Malformed {
      record_id: record.id.clone(),
      subject: record.subject.clone(),
      detail,
    },
  }
}
