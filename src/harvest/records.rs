//! Pre-harvested change records from a JSON file
//!
//! Accepts the field names git harvesting produces (`sha`, `author_date`) as
//! well as the record's own (`id`, `timestamp`). Records without an id get a
//! SHA-256 hash of their contents, so the same change always gets the same id.

use super::{ChangeSource, RevisionRange};
use crate::core::error::{HarvestError, NotesError, NotesResult};
use crate::model::ChangeRecord;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct RawRecord {
  #[serde(default, alias = "sha")]
  id: Option<String>,
  #[serde(default)]
  author_name: String,
  #[serde(default)]
  author_email: String,
  #[serde(alias = "author_date", alias = "date")]
  timestamp: DateTime<FixedOffset>,
  subject: String,
  #[serde(default)]
  body: String,
  #[serde(default)]
  files: Vec<String>,
  #[serde(default)]
  url: Option<String>,
}

impl RawRecord {
  fn into_record(self) -> ChangeRecord {
    let id = match self.id.as_deref().map(str::trim) {
      Some(id) if !id.is_empty() => id.to_string(),
      _ => content_id(&self),
    };

    ChangeRecord {
      id,
      author_name: self.author_name,
      author_email: self.author_email,
      timestamp: self.timestamp,
      subject: self.subject,
      body: self.body,
      files: self.files,
      url: self.url.filter(|u| !u.trim().is_empty()),
    }
  }
}

/// SHA-256 over the identifying fields, NUL-separated
fn content_id(raw: &RawRecord) -> String {
  let mut hasher = Sha256::new();
  let timestamp = raw.timestamp.to_rfc3339();
  for part in [
    raw.author_name.as_str(),
    raw.author_email.as_str(),
    timestamp.as_str(),
    raw.subject.as_str(),
    raw.body.as_str(),
  ] {
    hasher.update(part.as_bytes());
    hasher.update([0u8]);
  }
  for file in &raw.files {
    hasher.update(file.as_bytes());
    hasher.update([0u8]);
  }
  format!("{:x}", hasher.finalize())
}

/// A JSON array of change records on disk
#[derive(Debug, Clone)]
pub struct RecordsFile {
  path: PathBuf,
}

impl RecordsFile {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load every record, in file order
  pub fn load(&self) -> NotesResult<Vec<ChangeRecord>> {
    let content = fs::read_to_string(&self.path).map_err(|e| {
      NotesError::Harvest(HarvestError::MalformedRecord {
        source: self.path.display().to_string(),
        detail: e.to_string(),
      })
    })?;
    parse_records(&content, &self.path.display().to_string())
  }
}

impl ChangeSource for RecordsFile {
  /// The file already holds one range; `source_id` and `range` only label the run
  fn harvest(&self, source_id: &str, range: &RevisionRange) -> NotesResult<Vec<ChangeRecord>> {
    let records = self.load()?;
    tracing::info!(
      source = source_id,
      range = %range,
      file = %self.path.display(),
      count = records.len(),
      "loaded change records"
    );
    Ok(records)
  }
}

fn parse_records(content: &str, source: &str) -> NotesResult<Vec<ChangeRecord>> {
  let raw: Vec<RawRecord> = serde_json::from_str(content).map_err(|e| HarvestError::MalformedRecord {
    source: source.to_string(),
    detail: e.to_string(),
  })?;
  Ok(raw.into_iter().map(RawRecord::into_record).collect())
}
