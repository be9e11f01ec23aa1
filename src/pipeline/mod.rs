//! Pipeline orchestration
//!
//! ```text
//! harvest -> classify all (rules) -> escalate ambiguous (oracle, only if any)
//!         -> normalize -> decided ++ oracle-resolved
//! ```
//!
//! Any harvesting or oracle failure aborts the run before a manifest exists.

pub mod normalize;

use crate::classify::RuleClassifier;
use crate::core::context::RunContext;
use crate::core::error::NotesResult;
use crate::harvest::{ChangeSource, RevisionRange};
use crate::model::{ChangeRecord, Decision, ReviewStatus, Signals};
use crate::oracle::EscalationGateway;
use normalize::{Reviewable, normalize, resolve_status};
use std::sync::Arc;

/// Where an item's classification stands
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
  /// Decided by the rules or the oracle (see `Decision::stage`)
  Decided(Decision),
  /// No stage decided yet
  Unresolved,
}

impl Verdict {
  pub fn decision(&self) -> Option<&Decision> {
    match self {
      Verdict::Decided(decision) => Some(decision),
      Verdict::Unresolved => None,
    }
  }

  /// Canonical status for this verdict
  pub fn canonical_status(&self) -> ReviewStatus {
    match self {
      Verdict::Decided(decision) => resolve_status(decision.include, decision.needs_clarification),
      Verdict::Unresolved => resolve_status(None, false),
    }
  }
}

/// One change as it moves through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineItem {
  pub record: Arc<ChangeRecord>,
  pub signals: Signals,
  pub verdict: Verdict,
  pub review_status: Option<ReviewStatus>,
}

impl Reviewable for PipelineItem {
  fn review_status(&self) -> Option<ReviewStatus> {
    self.review_status
  }

  fn set_review_status(&mut self, status: ReviewStatus) {
    self.review_status = Some(status);
  }

  fn derived_status(&self) -> ReviewStatus {
    self.verdict.canonical_status()
  }
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
  /// Decided by the rules stage, in input order
  pub decided: Vec<PipelineItem>,
  /// Escalated items as the rules stage left them, in input order
  pub ambiguous: Vec<PipelineItem>,
  /// `decided` followed by the oracle-resolved items, every one with a status
  pub all_items: Vec<PipelineItem>,
}

/// Run the rules stage over every record; returns `(decided, ambiguous)`
pub fn classify_all(classifier: &RuleClassifier, records: Vec<ChangeRecord>) -> (Vec<PipelineItem>, Vec<PipelineItem>) {
  let mut decided = Vec::new();
  let mut ambiguous = Vec::new();

  for record in records {
    let classification = classifier.classify(&record);
    let escalate = classification.is_ambiguous();
    let item = PipelineItem {
      record: Arc::new(record),
      signals: classification.signals,
      verdict: classification.decision.map_or(Verdict::Unresolved, Verdict::Decided),
      review_status: None,
    };
    if escalate {
      ambiguous.push(item);
    } else {
      decided.push(item);
    }
  }

  (decided, ambiguous)
}

/// Sequences harvesting, classification, escalation and normalization
pub struct Pipeline<'a> {
  source: &'a dyn ChangeSource,
  classifier: &'a RuleClassifier,
  gateway: &'a EscalationGateway<'a>,
}

impl<'a> Pipeline<'a> {
  pub fn new(source: &'a dyn ChangeSource, classifier: &'a RuleClassifier, gateway: &'a EscalationGateway<'a>) -> Self {
    Self {
      source,
      classifier,
      gateway,
    }
  }

  pub fn run(&self, ctx: &RunContext, source_id: &str, range: &RevisionRange) -> NotesResult<PipelineOutcome> {
    let records = self.source.harvest(source_id, range)?;
    self.run_records(ctx, records)
  }

  /// Everything after harvesting, for records already in hand
  pub fn run_records(&self, ctx: &RunContext, records: Vec<ChangeRecord>) -> NotesResult<PipelineOutcome> {
    let total = records.len();
    let (mut decided, ambiguous) = classify_all(self.classifier, records);

    tracing::info!(
      run_id = %ctx.run_id(),
      total,
      decided = decided.len(),
      ambiguous = ambiguous.len(),
      "rules stage finished"
    );

    let resolved = if ambiguous.is_empty() {
      Vec::new()
    } else {
      let pending: Vec<Arc<ChangeRecord>> = ambiguous.iter().map(|item| Arc::clone(&item.record)).collect();
      let decisions = self.gateway.resolve_ambiguous(ctx, &pending)?;

      ambiguous
        .iter()
        .zip(decisions)
        .map(|(item, decision)| {
          let verdict = Verdict::Decided(decision);
          PipelineItem {
            record: Arc::clone(&item.record),
            signals: item.signals.clone(),
            review_status: Some(verdict.canonical_status()),
            verdict,
          }
        })
        .collect()
    };

    normalize(&mut decided);
    let decided_snapshot = decided.clone();

    let mut all_items = decided;
    all_items.extend(resolved);
    normalize(&mut all_items);

    Ok(PipelineOutcome {
      decided: decided_snapshot,
      ambiguous,
      all_items,
    })
  }
}
