//! Git change source
//!
//! Local checkouts are read in place. Remote URLs are cloned once into the
//! cache directory and fetched on every later run.

use super::{ChangeSource, RevisionRange};
use crate::core::config::SourceConfig;
use crate::core::error::{HarvestError, NotesResult, ResultExt};
use crate::core::vcs::{CommitInfo, SystemGit};
use crate::model::ChangeRecord;
use crate::utils::{cache_dir_name, github_commit_url, is_local_source};
use chrono::DateTime;
use std::fs;
use std::path::{Path, PathBuf};

/// Harvests commits between two revisions with system git
#[derive(Debug, Clone)]
pub struct GitHarvester {
  cache_dir: PathBuf,
  include_files: bool,
  max_commits: Option<usize>,
}

impl GitHarvester {
  pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
    Self {
      cache_dir: cache_dir.into(),
      include_files: true,
      max_commits: None,
    }
  }

  pub fn from_config(source: &SourceConfig) -> Self {
    Self::new(source.cache_dir.clone())
      .with_files(source.include_files)
      .with_max_commits(source.max_commits)
  }

  pub fn with_files(mut self, include_files: bool) -> Self {
    self.include_files = include_files;
    self
  }

  pub fn with_max_commits(mut self, max_commits: Option<usize>) -> Self {
    self.max_commits = max_commits;
    self
  }

  /// Open the repository behind `source_id`, cloning or refreshing the cache for URLs
  fn open(&self, source_id: &str) -> NotesResult<SystemGit> {
    if is_local_source(source_id) {
      return SystemGit::open(Path::new(source_id));
    }

    let repo_dir = self.cache_dir.join(cache_dir_name(source_id));
    if repo_dir.join(".git").is_dir() {
      tracing::debug!(source = source_id, path = %repo_dir.display(), "refreshing cached clone");
      let git = SystemGit::open(&repo_dir)?;
      git.fetch_all()?;
      return Ok(git);
    }

    if repo_dir.exists() {
      // occupied by something that is not a clone
      return Err(HarvestError::RepoNotFound { path: repo_dir }.into());
    }

    fs::create_dir_all(&self.cache_dir)
      .with_context(|| format!("Failed to create cache directory {}", self.cache_dir.display()))?;
    tracing::info!(source = source_id, path = %repo_dir.display(), "cloning source");
    SystemGit::clone_into(source_id, &repo_dir)
  }
}

impl ChangeSource for GitHarvester {
  fn harvest(&self, source_id: &str, range: &RevisionRange) -> NotesResult<Vec<ChangeRecord>> {
    let git = self.open(source_id)?;
    let start = git.resolve_commit(&range.start)?;
    let end = git.resolve_commit(&range.end)?;

    let commits = git.log_range(&start, &end, self.max_commits)?;
    let files = if self.include_files {
      let shas: Vec<String> = commits.iter().map(|c| c.sha.clone()).collect();
      git.changed_files_many(&shas)?
    } else {
      vec![Vec::new(); commits.len()]
    };

    let records = commits
      .into_iter()
      .zip(files)
      .map(|(commit, files)| to_record(source_id, commit, files))
      .collect::<NotesResult<Vec<_>>>()?;

    tracing::info!(
      source = source_id,
      range = %range,
      work_tree = %git.work_tree().display(),
      count = records.len(),
      "harvested change records"
    );
    Ok(records)
  }
}

fn to_record(source_id: &str, commit: CommitInfo, files: Vec<String>) -> NotesResult<ChangeRecord> {
  let timestamp = DateTime::parse_from_rfc3339(&commit.author_date).map_err(|e| HarvestError::MalformedRecord {
    source: format!("commit {}", commit.sha),
    detail: format!("author date '{}': {}", commit.author_date, e),
  })?;

  Ok(ChangeRecord {
    url: github_commit_url(source_id, &commit.sha),
    id: commit.sha,
    author_name: commit.author,
    author_email: commit.author_email,
    timestamp,
    subject: commit.subject,
    body: commit.body,
    files,
  })
}
