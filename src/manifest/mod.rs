//! Review manifest: the human-in-the-loop contract
//!
//! The manifest is the only thing the renderer reads. It is written once per
//! run, may be edited by hand, and is always re-read from disk afterwards
//! (see `store`).
//!
//! Field order in the structs below is the serialization order; keep it stable
//! so hand edits produce small diffs. New fields must be optional on read.

pub mod store;

use crate::core::context::RunContext;
use crate::model::{Category, ReviewStatus, Signals, Stage};
use crate::pipeline::PipelineItem;
use crate::pipeline::normalize::{Reviewable, normalize, resolve_status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

pub use store::{ManifestStore, WrittenManifest};

/// Current manifest layout; manifests without the field are version 0
pub const SCHEMA_VERSION: u32 = 1;

/// Run metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
  #[serde(default)]
  pub schema_version: u32,
  #[serde(alias = "repo")]
  pub source_id: String,
  #[serde(alias = "from_ref")]
  pub range_start: String,
  #[serde(alias = "to_ref")]
  pub range_end: String,
  pub generated_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub run_id: Option<Uuid>,
}

/// One change as a reviewer sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
  #[serde(alias = "sha")]
  pub id: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub subject: String,
  #[serde(default, deserialize_with = "lenient_text")]
  pub author: String,
  #[serde(default, deserialize_with = "lenient_optional_text")]
  pub url: Option<String>,

  /// The only field that controls publication
  #[serde(default, deserialize_with = "lenient")]
  pub review_status: Option<ReviewStatus>,
  #[serde(default, deserialize_with = "lenient")]
  pub category: Option<Category>,

  // Human-editable text
  #[serde(default, deserialize_with = "lenient_optional_text")]
  pub title: Option<String>,
  #[serde(default, deserialize_with = "lenient_optional_text")]
  pub description: Option<String>,

  // Provenance, never consulted for publication
  #[serde(default, alias = "filter_stage", deserialize_with = "lenient")]
  pub stage: Option<Stage>,
  #[serde(default, alias = "filter_reason", deserialize_with = "lenient_optional_text")]
  pub reason: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub confidence: Option<f64>,

  #[serde(default, deserialize_with = "lenient_flag")]
  pub needs_clarification: bool,
  #[serde(default, deserialize_with = "lenient_optional_text")]
  pub clarification_question: Option<String>,

  #[serde(default, skip_serializing_if = "Signals::is_empty")]
  pub signals: Signals,
}

impl ReviewEntry {
  /// Flatten a pipeline item
  pub fn from_item(item: &PipelineItem) -> Self {
    let record = &item.record;
    let decision = item.verdict.decision();

    Self {
      id: record.id.clone(),
      subject: record.subject.clone(),
      author: record.author_name.clone(),
      url: record.url.clone(),
      review_status: Some(item.review_status.unwrap_or_else(|| item.verdict.canonical_status())),
      category: decision.and_then(|d| d.category),
      title: decision.and_then(|d| d.title.clone()),
      description: decision.and_then(|d| d.description.clone()),
      stage: decision.map(|d| d.stage),
      reason: decision.map(|d| d.reason.clone()),
      confidence: decision.and_then(|d| d.confidence),
      needs_clarification: decision.is_some_and(|d| d.needs_clarification),
      clarification_question: decision.and_then(|d| d.clarification_question.clone()),
      signals: item.signals.clone(),
    }
  }
}

impl Reviewable for ReviewEntry {
  fn review_status(&self) -> Option<ReviewStatus> {
    self.review_status
  }

  fn set_review_status(&mut self, status: ReviewStatus) {
    self.review_status = Some(status);
  }

  /// An entry does not record `include`, so without a status it can only be
  /// sent back for clarification
  fn derived_status(&self) -> ReviewStatus {
    resolve_status(None, self.needs_clarification)
  }
}

/// Per-status entry counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
  pub included: usize,
  pub excluded: usize,
  pub needs_clarification: usize,
}

/// Ordered entries plus run metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewManifest {
  pub metadata: ManifestMetadata,
  #[serde(default)]
  pub entries: Vec<ReviewEntry>,
}

impl ReviewManifest {
  /// Build a manifest from pipeline items, preserving their order
  pub fn build(source_id: &str, range_start: &str, range_end: &str, items: &[PipelineItem]) -> Self {
    Self {
      metadata: ManifestMetadata {
        schema_version: SCHEMA_VERSION,
        source_id: source_id.to_string(),
        range_start: range_start.to_string(),
        range_end: range_end.to_string(),
        generated_at: Utc::now(),
        run_id: None,
      },
      entries: items.iter().map(ReviewEntry::from_item).collect(),
    }
  }

  /// Tag the manifest with the run that produced it
  pub fn with_run(mut self, run: &RunContext) -> Self {
    self.metadata.run_id = Some(run.run_id());
    self
  }

  /// Fill in missing statuses; returns how many entries were defaulted
  pub fn normalize(&mut self) -> usize {
    normalize(&mut self.entries)
  }

  pub fn counts(&self) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for entry in &self.entries {
      match entry.review_status.unwrap_or(ReviewStatus::NeedsClarification) {
        ReviewStatus::Included => counts.included += 1,
        ReviewStatus::Excluded => counts.excluded += 1,
        ReviewStatus::NeedsClarification => counts.needs_clarification += 1,
      }
    }
    counts
  }

  /// Pretty-printed JSON with a trailing newline
  pub fn to_json_pretty(&self) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(self)?;
    json.push('\n');
    Ok(json)
  }
}

/// Accept any value; unrecognised or non-string values become `None`
///
/// Hand edits like `"Included"` still parse; `"maybe"` is dropped with a
/// warning so the normalizer can apply the conservative default.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: FromStr,
  T::Err: Display,
{
  let value = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(match value {
    None | Some(serde_json::Value::Null) => None,
    Some(serde_json::Value::String(raw)) if raw.trim().is_empty() => None,
    Some(serde_json::Value::String(raw)) => match raw.parse::<T>() {
      Ok(parsed) => Some(parsed),
      Err(e) => {
        tracing::warn!("ignoring manifest value: {}", e);
        None
      }
    },
    Some(other) => {
      tracing::warn!("ignoring non-string manifest value: {}", other);
      None
    }
  })
}

/// Free text: `null` reads as empty, numbers and booleans as their JSON text
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(lenient_optional_text(deserializer)?.unwrap_or_default())
}

fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(match value {
    None | Some(serde_json::Value::Null) => None,
    Some(serde_json::Value::String(text)) => Some(text),
    Some(scalar @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => Some(scalar.to_string()),
    Some(other) => {
      tracing::warn!("ignoring non-text manifest value: {}", other);
      None
    }
  })
}

/// `true`/`false`, also as strings; anything else reads as `false`
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(serde_json::Value::Bool(flag)) => flag,
    Some(serde_json::Value::String(raw)) => match raw.trim().to_ascii_lowercase().as_str() {
      "true" | "yes" => true,
      "false" | "no" | "" => false,
      _ => {
        tracing::warn!("ignoring manifest flag: {}", raw);
        false
      }
    },
    None | Some(serde_json::Value::Null) => false,
    Some(other) => {
      tracing::warn!("ignoring non-boolean manifest flag: {}", other);
      false
    }
  })
}
