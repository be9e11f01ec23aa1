//! Decision normalizer
//!
//! Gives every item exactly one `ReviewStatus` without touching a status that
//! is already set. Works on anything `Reviewable`: pipeline items before the
//! manifest is built, manifest entries after a human edited them.

use crate::model::ReviewStatus;

/// Canonical status for a decision shape
///
/// Clarification wins over inclusion; an unknown `include` is never guessed
/// into `included` or `excluded`.
pub fn resolve_status(include: Option<bool>, needs_clarification: bool) -> ReviewStatus {
  if needs_clarification {
    return ReviewStatus::NeedsClarification;
  }
  match include {
    Some(true) => ReviewStatus::Included,
    Some(false) => ReviewStatus::Excluded,
    None => ReviewStatus::NeedsClarification,
  }
}

/// An item that carries (or should carry) a review status
pub trait Reviewable {
  fn review_status(&self) -> Option<ReviewStatus>;

  fn set_review_status(&mut self, status: ReviewStatus);

  /// Status implied by the item's own decision fields
  fn derived_status(&self) -> ReviewStatus;
}

/// Fill in missing statuses; returns how many were assigned
///
/// Idempotent: a second pass finds nothing to do.
pub fn normalize<T: Reviewable>(items: &mut [T]) -> usize {
  let mut assigned = 0;
  for item in items.iter_mut() {
    if item.review_status().is_none() {
      let status = item.derived_status();
      item.set_review_status(status);
      assigned += 1;
    }
  }
  assigned
}
