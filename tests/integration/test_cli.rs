//! End-to-end tests of the relnotes binary (no oracle endpoint available)

use crate::helpers::*;
use anyhow::Result;
use serde_json::Value;
use tempfile::TempDir;

/// A repo whose changes the rules decide on their own
fn rules_only_repo() -> Result<TestRepo> {
  let repo = TestRepo::new()?;
  repo.commit_file("api/coupons.rb", "class Coupon; end\n", "feat(api): add coupons endpoint")?;
  repo.commit_file("api/taxes.rb", "class Tax; end\n", "fix: wrong tax rounding")?;
  repo.commit_file("Gemfile.lock", "rubocop 1.60\n", "chore: bump rubocop")?;
  Ok(repo)
}

#[test]
fn test_classify_json_reports_every_change() -> Result<()> {
  let repo = rules_only_repo()?;
  repo.commit_file("web/onboarding.tsx", "export {}\n", "tweak onboarding")?;

  let output = run_relnotes(&repo.path, &["classify", "--from", "v0.1.0", "--to", "HEAD", "--json"])?;
  let rows: Vec<Value> = serde_json::from_slice(&output.stdout)?;
  assert_eq!(rows.len(), 4);

  let outcome_of = |subject: &str| {
    rows
      .iter()
      .find(|r| r["subject"] == subject)
      .map(|r| r["outcome"].as_str().unwrap_or_default().to_string())
  };
  assert_eq!(outcome_of("feat(api): add coupons endpoint").as_deref(), Some("included"));
  assert_eq!(outcome_of("fix: wrong tax rounding").as_deref(), Some("included"));
  assert_eq!(outcome_of("chore: bump rubocop").as_deref(), Some("excluded"));
  assert_eq!(outcome_of("tweak onboarding").as_deref(), Some("ambiguous"));

  // classify never writes a manifest
  assert!(!repo.file_exists("outputs/review.json"));
  Ok(())
}

#[test]
fn test_run_then_render() -> Result<()> {
  let repo = rules_only_repo()?;

  let output = run_relnotes(&repo.path, &["run", "--from", "v0.1.0", "--to", "HEAD", "--json"])?;
  let summary: Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(summary["total"], 3);
  assert_eq!(summary["escalated"], 0);
  assert_eq!(summary["counts"]["included"], 2);
  assert_eq!(summary["counts"]["excluded"], 1);

  let manifest: Value = serde_json::from_str(&repo.read_file("outputs/review.json")?)?;
  assert_eq!(manifest["metadata"]["range_start"], "v0.1.0");
  assert_eq!(manifest["entries"].as_array().map(Vec::len), Some(3));
  assert!(!repo.file_exists("outputs/draft_release_notes.md"));

  run_relnotes(&repo.path, &["render", "--quiet"])?;
  let notes = repo.read_file("outputs/draft_release_notes.md")?;
  assert!(notes.starts_with("# Release Notes\n"));
  assert!(notes.contains("- **add coupons endpoint**"));
  assert!(notes.contains("- **wrong tax rounding**"));
  assert!(!notes.contains("rubocop"));
  Ok(())
}

#[test]
fn test_review_pause_keeps_json_stdout_clean() -> Result<()> {
  let repo = rules_only_repo()?;

  // stdin is closed, so the pause ends at once
  let output = run_relnotes(
    &repo.path,
    &["run", "--from", "v0.1.0", "--to", "HEAD", "--json", "--review", "--render"],
  )?;

  let summary: Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(summary["total"], 3);
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("press ENTER"), "stderr: {}", stderr);
  assert!(repo.file_exists("outputs/draft_release_notes.md"));
  Ok(())
}

#[test]
fn test_run_with_render_flag_uses_edited_path() -> Result<()> {
  let repo = rules_only_repo()?;

  run_relnotes(
    &repo.path,
    &[
      "run",
      "--from",
      "v0.1.0",
      "--to",
      "HEAD",
      "--manifest",
      "review/manifest.json",
      "--render",
      "review/NOTES.md",
      "--quiet",
    ],
  )?;

  assert!(repo.file_exists("review/manifest.json"));
  let notes = repo.read_file("review/NOTES.md")?;
  assert!(notes.contains("## Features"));
  assert!(notes.contains("## Bug Fixes"));
  Ok(())
}

#[test]
fn test_ambiguous_change_without_oracle_fails_before_writing() -> Result<()> {
  let repo = rules_only_repo()?;
  repo.commit_file("web/onboarding.tsx", "export {}\n", "tweak onboarding")?;

  let output = run_relnotes_raw(&repo.path, &["run", "--from", "v0.1.0", "--to", "HEAD", "--quiet"])?;

  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("❌"), "stderr: {}", stderr);
  assert!(!repo.file_exists("outputs/review.json"));
  Ok(())
}

#[test]
fn test_unknown_ref_exits_with_system_error() -> Result<()> {
  let repo = rules_only_repo()?;
  let output = run_relnotes_raw(&repo.path, &["classify", "--from", "v9.9.9", "--to", "HEAD"])?;
  assert_eq!(output.status.code(), Some(2));
  Ok(())
}

#[test]
fn test_render_without_manifest_is_a_user_error() -> Result<()> {
  let dir = TempDir::new()?;
  let output = run_relnotes_raw(dir.path(), &["render"])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}

#[test]
fn test_config_file_rules_and_paths() -> Result<()> {
  let repo = rules_only_repo()?;
  repo.commit_file("web/draft.tsx", "export {}\n", "wip: new pricing page")?;
  repo.write_file(
    "relnotes.toml",
    r#"[rules]
extra_subject_excludes = ['^wip\b']

[output]
manifest = "custom/review.json"
notes = "custom/notes.md"
"#,
  )?;

  run_relnotes(&repo.path, &["run", "--from", "v0.1.0", "--to", "HEAD", "--render", "--quiet"])?;

  let manifest: Value = serde_json::from_str(&repo.read_file("custom/review.json")?)?;
  let wip = manifest["entries"]
    .as_array()
    .and_then(|entries| entries.iter().find(|e| e["subject"] == "wip: new pricing page"))
    .cloned()
    .unwrap_or(Value::Null);
  assert_eq!(wip["review_status"], "excluded");
  assert!(repo.file_exists("custom/notes.md"));
  Ok(())
}

#[test]
fn test_run_from_records_file() -> Result<()> {
  let dir = TempDir::new()?;
  std::fs::write(
    dir.path().join("records.json"),
    r#"[
  {"sha": "a1", "author_name": "Ada", "author_date": "2024-05-01T10:00:00+00:00", "subject": "feat: usage alerts"},
  {"sha": "b2", "author_name": "Lin", "author_date": "2024-05-02T10:00:00+00:00", "subject": "release v1.2.0"}
]"#,
  )?;

  run_relnotes(
    dir.path(),
    &[
      "run",
      "--from",
      "v1.1.0",
      "--to",
      "v1.2.0",
      "--records",
      "records.json",
      "--render",
      "--quiet",
    ],
  )?;

  let notes = std::fs::read_to_string(dir.path().join("outputs/draft_release_notes.md"))?;
  assert!(notes.contains("_Changes: v1.1.0 → v1.2.0_"));
  assert!(notes.contains("- **usage alerts**"));
  assert!(notes.contains("  - Author: Ada\n"));
  assert!(!notes.contains("release v1.2.0"));
  Ok(())
}
