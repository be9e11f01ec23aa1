//! Range walking for SystemGit (commit log, changed files)

use super::CommitInfo;
use super::system_git::SystemGit;
use crate::core::error::{HarvestError, NotesError, NotesResult, ResultExt};
use rayon::prelude::*;

/// Field separator inside one log record (ASCII unit separator)
const FIELD_SEP: char = '\x1f';
/// Record separator between commits (ASCII record separator)
const RECORD_SEP: char = '\x1e';

impl SystemGit {
  /// Commits reachable from `end` but not from `start`, newest first
  ///
  /// Both boundaries must already be resolved SHAs.
  pub fn log_range(&self, start: &str, end: &str, max_commits: Option<usize>) -> NotesResult<Vec<CommitInfo>> {
    // %H hash, %an author name, %ae author email, %aI strict ISO author date,
    // %s subject, %b body
    let format = "%H%x1f%an%x1f%ae%x1f%aI%x1f%s%x1f%b%x1e";

    let mut cmd = self.git_cmd();
    cmd.args(["log", &format!("--pretty=format:{}", format)]);
    if let Some(max) = max_commits {
      cmd.arg(format!("--max-count={}", max));
    }
    cmd.arg(format!("{}..{}", start, end));

    let output = cmd.output().context("Failed to run git log")?;

    if !output.status.success() {
      return Err(NotesError::Harvest(HarvestError::CommandFailed {
        command: format!("git log {}..{}", start, end),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    parse_log_output(&output.stdout)
  }

  /// Paths touched by a single commit, in the order git reports them
  pub fn changed_files(&self, sha: &str) -> NotesResult<Vec<String>> {
    let output = self
      .git_cmd()
      .args(["show", "--name-only", "--format=", sha])
      .output()
      .with_context(|| format!("Failed to list files of {}", sha))?;

    if !output.status.success() {
      return Err(NotesError::Harvest(HarvestError::CommandFailed {
        command: format!("git show --name-only {}", sha),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect(),
    )
  }

  /// Changed files for many commits, fetched in parallel; output order matches `shas`
  pub fn changed_files_many(&self, shas: &[String]) -> NotesResult<Vec<Vec<String>>> {
    shas.par_iter().map(|sha| self.changed_files(sha)).collect()
  }
}

/// Parse `git log` output produced with the separator format above
fn parse_log_output(data: &[u8]) -> NotesResult<Vec<CommitInfo>> {
  let output = String::from_utf8_lossy(data);
  let mut commits = Vec::new();

  for record in output.split(RECORD_SEP) {
    // git puts a newline between records
    let record = record.trim_start_matches(['\n', '\r']);
    if record.trim().is_empty() {
      continue;
    }

    let fields: Vec<&str> = record.splitn(6, FIELD_SEP).collect();
    if fields.len() != 6 {
      return Err(NotesError::Harvest(HarvestError::MalformedRecord {
        source: "git log".to_string(),
        detail: format!("expected 6 fields, found {}", fields.len()),
      }));
    }

    commits.push(CommitInfo {
      sha: fields[0].trim().to_string(),
      author: fields[1].to_string(),
      author_email: fields[2].to_string(),
      author_date: fields[3].trim().to_string(),
      subject: fields[4].trim().to_string(),
      body: fields[5].trim().to_string(),
    });
  }

  Ok(commits)
}
