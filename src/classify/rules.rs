//! Deterministic rule engine
//!
//! Precedence (first match wins):
//! 1. merge of a pull/merge request      -> excluded (0.95)
//! 2. conventional type detected          -> annotation only
//! 3. subject matches a hard exclude      -> excluded (0.90)
//! 4. body matches an exclude, type is
//!    not feature/fix-like                -> excluded (0.85)
//! 5. type is `feat` / `fix`              -> included with category (0.90)
//! 6. otherwise                           -> ambiguous, internal-files score annotated
//!
//! No I/O and no randomness: the same record always yields the same result.

use super::conventional::{ConventionalHeader, looks_user_facing};
use crate::core::config::RulesConfig;
use crate::core::error::NotesResult;
use crate::model::{ChangeRecord, Decision, Signals};
use regex::{Regex, RegexBuilder};

pub const MERGE_CONFIDENCE: f64 = 0.95;
pub const SUBJECT_EXCLUDE_CONFIDENCE: f64 = 0.9;
pub const BODY_EXCLUDE_CONFIDENCE: f64 = 0.85;
pub const CONVENTIONAL_INCLUDE_CONFIDENCE: f64 = 0.9;

const MERGE_PATTERN: &str = r"^Merge (?:pull|merge) request\s+[#!]\d+\s+";

/// Maintenance and process vocabulary in subjects
pub const DEFAULT_SUBJECT_EXCLUDES: &[&str] = &[
  r"\bbump\b",
  r"\bversion\b",
  r"\brelease\b",
  r"^chore\b",
  r"^refactor\b",
  r"^ci\b",
  r"^test\b",
  r"^build\b",
];

pub const DEFAULT_BODY_EXCLUDES: &[&str] = &[r"\bbump\b", r"\bversion\b"];

/// Paths that look internal: CI config, docs, tests
pub const DEFAULT_INTERNAL_PATHS: &[&str] = &[r"^\.github/", r"^docs?/", r"^tests?/", r".*_test\.go$"];

/// A compiled pattern that remembers its source text for reasons
#[derive(Debug, Clone)]
struct Pattern {
  source: String,
  regex: Regex,
}

impl Pattern {
  fn compile(source: &str) -> NotesResult<Self> {
    Ok(Self {
      source: source.to_string(),
      regex: RegexBuilder::new(source).case_insensitive(true).build()?,
    })
  }
}

fn compile_all<'a>(defaults: &[&'a str], extra: impl IntoIterator<Item = &'a String>) -> NotesResult<Vec<Pattern>> {
  defaults
    .iter()
    .copied()
    .chain(extra.into_iter().map(String::as_str))
    .map(Pattern::compile)
    .collect()
}

fn first_match<'p>(patterns: &'p [Pattern], text: &str) -> Option<&'p Pattern> {
  patterns.iter().find(|p| p.regex.is_match(text))
}

/// Outcome of the rules stage for one record
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
  /// `None` means ambiguous: escalate
  pub decision: Option<Decision>,
  pub signals: Signals,
}

impl Classification {
  pub fn is_ambiguous(&self) -> bool {
    self.decision.is_none()
  }
}

/// Compiled rule set
#[derive(Debug, Clone)]
pub struct RuleClassifier {
  merge: Regex,
  subject_excludes: Vec<Pattern>,
  body_excludes: Vec<Pattern>,
  internal_paths: Vec<Pattern>,
}

impl RuleClassifier {
  /// Built-in patterns only
  pub fn builtin() -> NotesResult<Self> {
    Self::from_config(&RulesConfig::default())
  }

  /// Built-in patterns followed by the configured extras
  pub fn from_config(rules: &RulesConfig) -> NotesResult<Self> {
    Ok(Self {
      merge: RegexBuilder::new(MERGE_PATTERN).case_insensitive(true).build()?,
      subject_excludes: compile_all(DEFAULT_SUBJECT_EXCLUDES, &rules.extra_subject_excludes)?,
      body_excludes: compile_all(DEFAULT_BODY_EXCLUDES, &rules.extra_body_excludes)?,
      internal_paths: compile_all(DEFAULT_INTERNAL_PATHS, &rules.extra_internal_paths)?,
    })
  }

  /// Classify one record
  pub fn classify(&self, record: &ChangeRecord) -> Classification {
    let subject = record.subject.trim();
    let body = record.body.trim();
    let mut signals = Signals::default();

    if self.merge.is_match(subject) {
      return Classification {
        decision: Some(Decision::excluded_by_rule(
          "Excluded merge commit (not user-facing entry).",
          MERGE_CONFIDENCE,
        )),
        signals,
      };
    }

    let header = ConventionalHeader::parse(subject);
    signals.conventional_type = header.as_ref().map(|h| h.kind.clone());

    if let Some(pattern) = first_match(&self.subject_excludes, subject) {
      return Classification {
        decision: Some(Decision::excluded_by_rule(
          format!("Excluded by subject pattern: {}", pattern.source),
          SUBJECT_EXCLUDE_CONFIDENCE,
        )),
        signals,
      };
    }

    if !looks_user_facing(signals.conventional_type.as_deref())
      && let Some(pattern) = first_match(&self.body_excludes, body)
    {
      return Classification {
        decision: Some(Decision::excluded_by_rule(
          format!("Excluded by body pattern: {}", pattern.source),
          BODY_EXCLUDE_CONFIDENCE,
        )),
        signals,
      };
    }

    if let Some(category) = header.as_ref().and_then(|h| h.category()) {
      return Classification {
        decision: Some(Decision::included_by_rule(
          category,
          format!("Included as {} (conventional commit).", category),
          CONVENTIONAL_INCLUDE_CONFIDENCE,
        )),
        signals,
      };
    }

    signals.internal_files_score = Some(self.internal_files_score(&record.files));
    Classification { decision: None, signals }
  }

  /// Fraction of `files` under internal-looking paths, 0.0 for no files
  pub fn internal_files_score(&self, files: &[String]) -> f64 {
    if files.is_empty() {
      return 0.0;
    }
    let internal = files
      .iter()
      .filter(|f| first_match(&self.internal_paths, f).is_some())
      .count();
    internal as f64 / files.len() as f64
  }
}
