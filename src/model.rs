//! Data model flowing through the decision pipeline
//!
//! `ChangeRecord` is produced once by a change source and never mutated.
//! Every stage derives new values (`Decision`, `Signals`, pipeline items)
//! from it instead.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One change harvested from version control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
  /// Content hash of the change (commit SHA for git sources)
  pub id: String,
  pub author_name: String,
  pub author_email: String,
  pub timestamp: DateTime<FixedOffset>,
  /// One-line subject
  pub subject: String,
  #[serde(default)]
  pub body: String,
  /// Affected paths, in source order
  #[serde(default)]
  pub files: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
}

/// Which stage produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  Rules,
  #[serde(alias = "llm")]
  Oracle,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Stage::Rules => write!(f, "rules"),
      Stage::Oracle => write!(f, "oracle"),
    }
  }
}

impl FromStr for Stage {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "rules" => Ok(Stage::Rules),
      "oracle" | "llm" => Ok(Stage::Oracle),
      other => Err(format!("unknown stage '{}'", other)),
    }
  }
}

/// Publication category of an included change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Feature,
  Bugfix,
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Category::Feature => write!(f, "feature"),
      Category::Bugfix => write!(f, "bugfix"),
    }
  }
}

impl FromStr for Category {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "feature" => Ok(Category::Feature),
      "bugfix" => Ok(Category::Bugfix),
      other => Err(format!("unknown category '{}'", other)),
    }
  }
}

/// Canonical status every reviewable item ends up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
  Included,
  Excluded,
  NeedsClarification,
}

impl ReviewStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      ReviewStatus::Included => "included",
      ReviewStatus::Excluded => "excluded",
      ReviewStatus::NeedsClarification => "needs_clarification",
    }
  }
}

impl fmt::Display for ReviewStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ReviewStatus {
  type Err = String;

  /// Accepts the canonical spelling plus the variants people type by hand
  /// (`Included`, `needs-clarification`, ` excluded `)
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
      "included" => Ok(ReviewStatus::Included),
      "excluded" => Ok(ReviewStatus::Excluded),
      "needs_clarification" => Ok(ReviewStatus::NeedsClarification),
      other => Err(format!("unknown review status '{}'", other)),
    }
  }
}

/// Classification outcome for one change record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
  /// `None` when the deciding stage could not tell
  pub include: Option<bool>,
  pub reason: String,
  pub stage: Stage,
  /// Only meaningful for the rules stage
  pub confidence: Option<f64>,
  pub category: Option<Category>,
  pub title: Option<String>,
  pub description: Option<String>,
  pub needs_clarification: bool,
  pub clarification_question: Option<String>,
}

impl Decision {
  /// Rules-stage exclusion
  pub fn excluded_by_rule(reason: impl Into<String>, confidence: f64) -> Self {
    Self {
      include: Some(false),
      reason: reason.into(),
      stage: Stage::Rules,
      confidence: Some(confidence),
      category: None,
      title: None,
      description: None,
      needs_clarification: false,
      clarification_question: None,
    }
  }

  /// Rules-stage inclusion; the category is always set
  pub fn included_by_rule(category: Category, reason: impl Into<String>, confidence: f64) -> Self {
    Self {
      include: Some(true),
      reason: reason.into(),
      stage: Stage::Rules,
      confidence: Some(confidence),
      category: Some(category),
      title: None,
      description: None,
      needs_clarification: false,
      clarification_question: None,
    }
  }

  /// Check the structural invariants of a decision
  pub fn check_invariants(&self) -> Result<(), String> {
    if self.reason.trim().is_empty() {
      return Err("reason must not be empty".to_string());
    }
    if self.category.is_some() && self.include != Some(true) {
      return Err("category is only allowed when include is true".to_string());
    }
    if self.needs_clarification && self.clarification_question.as_deref().is_none_or(|q| q.trim().is_empty()) {
      return Err("needs_clarification requires a clarification_question".to_string());
    }
    if let Some(confidence) = self.confidence
      && !(0.0..=1.0).contains(&confidence)
    {
      return Err(format!("confidence {} is outside 0.0..=1.0", confidence));
    }
    Ok(())
  }
}

/// Annotations the rules stage attaches whether or not it decides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signals {
  /// Lower-cased conventional-commit type, if the subject has one
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub conventional_type: Option<String>,

  /// Fraction of changed files under internal-looking paths (CI, docs, tests).
  /// Annotation only: never used to decide.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub internal_files_score: Option<f64>,
}

impl Signals {
  pub fn is_empty(&self) -> bool {
    self.conventional_type.is_none() && self.internal_files_score.is_none()
  }
}
