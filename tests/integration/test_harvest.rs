//! Git harvesting against real repositories

use crate::helpers::*;
use anyhow::Result;
use relnotes::core::error::{HarvestError, NotesError};
use relnotes::harvest::{ChangeSource, GitHarvester, RevisionRange};
use tempfile::TempDir;

#[test]
fn test_harvest_local_range_newest_first() -> Result<()> {
  let repo = TestRepo::new()?;
  let first = repo.commit_file("api/coupons.rb", "class Coupon; end\n", "feat: add coupons")?;
  let second = repo.commit_file(
    "docs/coupons.md",
    "# Coupons\n",
    "tweak coupon docs\n\nExplains stacking rules.",
  )?;

  let cache = TempDir::new()?;
  let source = repo.path.display().to_string();
  let records = GitHarvester::new(cache.path()).harvest(&source, &RevisionRange::new("v0.1.0", "HEAD"))?;

  assert_eq!(records.len(), 2);
  assert_eq!(records[0].id, second);
  assert_eq!(records[1].id, first);

  assert_eq!(records[0].subject, "tweak coupon docs");
  assert_eq!(records[0].body.trim(), "Explains stacking rules.");
  assert_eq!(records[0].files, vec!["docs/coupons.md".to_string()]);
  assert_eq!(records[1].author_name, "Test User");
  assert_eq!(records[1].author_email, "test@example.com");
  assert!(records[0].url.is_none(), "local sources have no commit links");

  // nothing was cloned for a local source
  assert_eq!(std::fs::read_dir(cache.path())?.count(), 0);
  Ok(())
}

#[test]
fn test_harvest_without_files() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.commit_file("api/coupons.rb", "class Coupon; end\n", "feat: add coupons")?;

  let cache = TempDir::new()?;
  let records = GitHarvester::new(cache.path())
    .with_files(false)
    .harvest(&repo.path.display().to_string(), &RevisionRange::new("v0.1.0", "HEAD"))?;

  assert_eq!(records.len(), 1);
  assert!(records[0].files.is_empty());
  Ok(())
}

#[test]
fn test_max_commits_caps_the_range() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.commit_file("a.txt", "a\n", "feat: a")?;
  repo.commit_file("b.txt", "b\n", "feat: b")?;
  let newest = repo.commit_file("c.txt", "c\n", "feat: c")?;

  let cache = TempDir::new()?;
  let records = GitHarvester::new(cache.path())
    .with_max_commits(Some(1))
    .harvest(&repo.path.display().to_string(), &RevisionRange::new("v0.1.0", "HEAD"))?;

  assert_eq!(records.len(), 1);
  assert_eq!(records[0].id, newest);
  Ok(())
}

#[test]
fn test_unknown_ref_is_reported() -> Result<()> {
  let repo = TestRepo::new()?;
  let cache = TempDir::new()?;

  let err = GitHarvester::new(cache.path())
    .harvest(&repo.path.display().to_string(), &RevisionRange::new("v9.9.9", "HEAD"))
    .unwrap_err();

  match err {
    NotesError::Harvest(HarvestError::UnresolvedRef { reference, .. }) => assert_eq!(reference, "v9.9.9"),
    other => panic!("expected UnresolvedRef, got {:?}", other),
  }
  Ok(())
}

#[test]
fn test_remote_source_is_cloned_then_refreshed() -> Result<()> {
  let upstream = TestRepo::new()?;
  upstream.commit_file("api/coupons.rb", "class Coupon; end\n", "feat: add coupons")?;
  upstream.tag("v0.2.0")?;

  let cache = TempDir::new()?;
  let url = format!("file://{}", upstream.path.display());
  let harvester = GitHarvester::new(cache.path());

  let records = harvester.harvest(&url, &RevisionRange::new("v0.1.0", "v0.2.0"))?;
  assert_eq!(records.len(), 1);
  assert_eq!(std::fs::read_dir(cache.path())?.count(), 1, "one cached clone");

  // new upstream work shows up after the cached clone is fetched
  upstream.commit_file("api/taxes.rb", "class Tax; end\n", "fix: tax rounding")?;
  upstream.tag("v0.3.0")?;

  let records = harvester.harvest(&url, &RevisionRange::new("v0.2.0", "v0.3.0"))?;
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].subject, "fix: tax rounding");
  assert_eq!(std::fs::read_dir(cache.path())?.count(), 1, "clone was reused");
  Ok(())
}
