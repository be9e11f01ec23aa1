//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway git repository with a tagged starting point
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  /// Create a repo with one commit tagged `v0.1.0`
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;

    std::fs::write(path.join("README.md"), "# demo\n")?;
    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial commit"])?;
    git(&path, &["tag", "v0.1.0"])?;

    Ok(Self { _root: root, path })
  }

  /// Write `file` and commit it with `message` (subject, blank line, body)
  pub fn commit_file(&self, file: &str, content: &str, message: &str) -> Result<String> {
    let file_path = self.path.join(file);
    if let Some(parent) = file_path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&file_path, content)?;

    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;
    self.head()
  }

  pub fn head(&self) -> Result<String> {
    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  pub fn tag(&self, name: &str) -> Result<()> {
    git(&self.path, &["tag", name])?;
    Ok(())
  }

  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    Ok(std::fs::write(self.path.join(path), content)?)
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the relnotes binary without any oracle endpoint in its environment
pub fn run_relnotes_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  let relnotes_bin = env!("CARGO_BIN_EXE_relnotes");

  Command::new(relnotes_bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("BASE_URL")
    .env_remove("API_KEY")
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run relnotes")
}

/// Run the relnotes binary, failing on a non-zero exit
pub fn run_relnotes(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_relnotes_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "relnotes command failed: relnotes {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}
