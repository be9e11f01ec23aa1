//! Change sources: where `ChangeRecord`s come from
//!
//! The pipeline only needs a fully materialized list of records; it never
//! parses version-control data itself.

pub mod git;
pub mod records;

use crate::core::error::NotesResult;
use crate::model::ChangeRecord;
use std::fmt;

pub use git::GitHarvester;
pub use records::RecordsFile;

/// Revision boundaries: changes after `start`, up to and including `end`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRange {
  pub start: String,
  pub end: String,
}

impl RevisionRange {
  pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
    Self {
      start: start.into(),
      end: end.into(),
    }
  }
}

impl fmt::Display for RevisionRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.start, self.end)
  }
}

/// A provider of change records
pub trait ChangeSource {
  /// All records in `range` of `source_id`, in source order
  fn harvest(&self, source_id: &str, range: &RevisionRange) -> NotesResult<Vec<ChangeRecord>>;
}
