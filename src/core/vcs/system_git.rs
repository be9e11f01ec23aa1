//! System git backend - zero dependencies
//!
//! Uses git plumbing commands for all operations:
//! - Revision resolution (rev-parse --verify)
//! - Range walking (log with separator-delimited formats)
//! - Safe subprocess execution (isolated environment)

use crate::core::error::{HarvestError, NotesError, NotesResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variables passed through to git besides PATH and HOME.
/// Remote clones need proxy and certificate settings.
const PASSTHROUGH_ENV: &[&str] = &[
  "HTTP_PROXY",
  "HTTPS_PROXY",
  "NO_PROXY",
  "http_proxy",
  "https_proxy",
  "no_proxy",
  "SSL_CERT_FILE",
  "SSL_CERT_DIR",
  "SSH_AUTH_SOCK",
];

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path) -> NotesResult<Self> {
    let output = isolated_git()
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") || stderr.contains("cannot change to") || !path.exists() {
        return Err(NotesError::Harvest(HarvestError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(NotesError::Harvest(HarvestError::CommandFailed {
        command: "git rev-parse --show-toplevel".to_string(),
        stderr: stderr.to_string(),
      }));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
    })
  }

  /// Clone `url` into `dest` (full history, so any two tags can be compared)
  pub fn clone_into(url: &str, dest: &Path) -> NotesResult<Self> {
    let output = isolated_git()
      .arg("clone")
      .arg(url)
      .arg(dest)
      .output()
      .context("Failed to execute git clone")?;

    if !output.status.success() {
      return Err(NotesError::Harvest(HarvestError::CloneFailed {
        url: url.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Self::open(dest)
  }

  /// Bring a cached clone up to date, tags included
  pub fn fetch_all(&self) -> NotesResult<()> {
    let output = self
      .git_cmd()
      .args(["fetch", "--all", "--tags", "--prune"])
      .output()
      .context("Failed to execute git fetch")?;

    if !output.status.success() {
      return Err(NotesError::Harvest(HarvestError::CommandFailed {
        command: "git fetch --all --tags --prune".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(())
  }

  /// Resolve a tag, branch or SHA to a full commit SHA
  ///
  /// A bare branch name that only exists on the remote resolves through
  /// `origin/<name>`.
  pub fn resolve_commit(&self, reference: &str) -> NotesResult<String> {
    let reference = reference.trim();
    let candidates = [reference.to_string(), format!("origin/{}", reference)];

    for candidate in &candidates {
      let output = self
        .git_cmd()
        .args(["rev-parse", "--verify", "--quiet", &format!("{}^{{commit}}", candidate)])
        .output()
        .context("Failed to execute git rev-parse")?;

      if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
      }
    }

    Err(NotesError::Harvest(HarvestError::UnresolvedRef {
      reference: reference.to_string(),
    }))
  }

  /// Working tree root of the opened repository
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists PATH, HOME and network settings
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = isolated_git();
    cmd.arg("-C").arg(&self.repo_path);
    cmd
  }
}

fn isolated_git() -> Command {
  let mut cmd = Command::new("git");

  // Isolated environment (don't trust global config)
  cmd.env_clear();
  for var in ["PATH", "HOME"].iter().chain(PASSTHROUGH_ENV) {
    if let Ok(value) = std::env::var(var) {
      cmd.env(var, value);
    }
  }

  // Force safe behavior (override user config)
  cmd.arg("-c").arg("protocol.version=2");
  cmd.arg("-c").arg("advice.detachedHead=false");
  cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII
  cmd.arg("-c").arg("log.showSignature=false");

  cmd
}
