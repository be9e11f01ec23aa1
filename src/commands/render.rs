//! `relnotes render`: reviewed manifest to Markdown

use crate::core::config::Config;
use crate::core::error::NotesResult;
use crate::manifest::ManifestStore;
use crate::render::{render_markdown, write_markdown};
use std::path::PathBuf;

/// Render the manifest at `manifest` (or `[output] manifest`)
pub fn run_render(config: &Config, manifest: Option<PathBuf>, output: Option<PathBuf>, quiet: bool) -> NotesResult<()> {
  let store = ManifestStore::new(manifest.unwrap_or_else(|| config.output.manifest.clone()));
  let reviewed = store.read()?;
  let notes_path = output.unwrap_or_else(|| config.output.notes.clone());

  write_markdown(&render_markdown(&reviewed), &notes_path)?;

  if !quiet {
    let counts = reviewed.counts();
    println!(
      "📝 Rendered {} included change(s) from {} to {}",
      counts.included,
      store.path().display(),
      notes_path.display()
    );
    if counts.needs_clarification > 0 {
      println!("   {} change(s) still need clarification", counts.needs_clarification);
    }
  }

  Ok(())
}
