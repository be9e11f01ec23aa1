//! CLI commands for relnotes
//!
//! - **run**: full pipeline, writes the review manifest, optionally renders it
//! - **classify**: deterministic stage only, never calls the oracle
//! - **render**: render a (possibly hand-edited) manifest to Markdown
//!
//! Every command takes the loaded `Config`; flags override config values.

pub mod classify;
pub mod render;
pub mod run;

pub use classify::run_classify;
pub use render::run_render;
pub use run::{RunOptions, run_pipeline};

use crate::core::config::Config;
use crate::harvest::{ChangeSource, GitHarvester, RecordsFile, RevisionRange};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Which changes a command works on
#[derive(Debug, Clone)]
pub struct SourceOptions {
  pub from: String,
  pub to: String,
  /// Overrides `[source] repo`
  pub repo: Option<String>,
  /// Read pre-harvested records instead of git
  pub records: Option<PathBuf>,
}

impl SourceOptions {
  pub fn range(&self) -> RevisionRange {
    RevisionRange::new(&self.from, &self.to)
  }

  /// Source identifier recorded in the manifest
  pub fn source_id(&self, config: &Config) -> String {
    self.repo.clone().unwrap_or_else(|| config.source.repo.clone())
  }

  pub fn build_source(&self, config: &Config) -> Box<dyn ChangeSource> {
    match &self.records {
      Some(path) => Box::new(RecordsFile::new(path.clone())),
      None => Box::new(GitHarvester::from_config(&config.source)),
    }
  }
}

/// Progress bars only make sense on an interactive stderr
pub(crate) fn progress_enabled(quiet: bool, json: bool) -> bool {
  !quiet && !json && std::io::stderr().is_terminal()
}

/// First 12 characters of an id, for display
pub(crate) fn short(id: &str) -> &str {
  match id.char_indices().nth(12) {
    Some((idx, _)) => &id[..idx],
    None => id,
  }
}
