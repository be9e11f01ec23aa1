//! Manifest persistence across the human edit window
//!
//! Two phases, no in-memory shortcut between them:
//!
//! ```text
//! ManifestStore::write(manifest) -> WrittenManifest   (manifest consumed)
//!                  ... a person edits the file ...
//! WrittenManifest::read() / ManifestStore::read()      (always from disk)
//! ```
//!
//! Writes are atomic (temp file in the same directory, then rename), so a
//! reader never sees a half-written manifest.

use super::{ReviewManifest, SCHEMA_VERSION};
use crate::core::error::{ManifestError, NotesResult, ResultExt};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Location of a review manifest on disk
#[derive(Debug, Clone)]
pub struct ManifestStore {
  path: PathBuf,
}

/// Handle to a manifest that has been written and may since have been edited
#[derive(Debug)]
#[must_use = "a written manifest is only useful once it is read back"]
pub struct WrittenManifest {
  store: ManifestStore,
}

impl ManifestStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Persist `manifest`, giving up the in-memory copy
  pub fn write(&self, manifest: ReviewManifest) -> NotesResult<WrittenManifest> {
    let json = manifest.to_json_pretty()?;

    let parent = match self.path.parent() {
      Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
      _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).with_context(|| format!("Failed to create {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(&parent)
      .with_context(|| format!("Failed to create a temporary file in {}", parent.display()))?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(&self.path)?;

    tracing::debug!(path = %self.path.display(), entries = manifest.entries.len(), "wrote review manifest");
    Ok(WrittenManifest { store: self.clone() })
  }

  /// Read and re-normalize the manifest currently on disk
  ///
  /// Entries with a missing or unrecognised `review_status` come back as
  /// `needs_clarification`, never as `included`.
  pub fn read(&self) -> NotesResult<ReviewManifest> {
    if !self.path.exists() {
      return Err(
        ManifestError::NotFound {
          path: self.path.clone(),
        }
        .into(),
      );
    }

    let content = fs::read_to_string(&self.path).with_context(|| format!("Failed to read {}", self.path.display()))?;
    let mut manifest: ReviewManifest = serde_json::from_str(&content).map_err(|e| ManifestError::Parse {
      path: self.path.clone(),
      detail: e.to_string(),
    })?;

    if manifest.metadata.schema_version > SCHEMA_VERSION {
      tracing::warn!(
        found = manifest.metadata.schema_version,
        supported = SCHEMA_VERSION,
        "manifest was written by a newer relnotes; unknown fields are ignored"
      );
    }

    let defaulted = manifest.normalize();
    if defaulted > 0 {
      tracing::warn!(
        path = %self.path.display(),
        count = defaulted,
        "entries without a valid review_status were set to needs_clarification"
      );
    }

    Ok(manifest)
  }
}

impl WrittenManifest {
  pub fn path(&self) -> &Path {
    self.store.path()
  }

  /// Re-read the file, picking up any edits made since it was written
  pub fn read(self) -> NotesResult<ReviewManifest> {
    self.store.read()
  }
}
