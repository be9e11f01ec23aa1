//! `relnotes run`: harvest, classify, escalate, write the review manifest

use super::{SourceOptions, progress_enabled};
use crate::classify::RuleClassifier;
use crate::core::config::Config;
use crate::core::context::RunContext;
use crate::core::error::NotesResult;
use crate::manifest::{ManifestStore, ReviewManifest};
use crate::oracle::{EscalationGateway, HttpOracle};
use crate::pipeline::Pipeline;
use crate::render::{render_markdown, write_markdown};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Flags of `relnotes run`
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  /// Overrides `[output] manifest`
  pub manifest: Option<PathBuf>,
  /// `Some(None)`: render to `[output] notes`; `Some(Some(p))`: render to `p`
  pub render: Option<Option<PathBuf>>,
  /// Pause after writing the manifest so it can be edited
  pub review: bool,
  pub json: bool,
  pub quiet: bool,
}

/// Run the full pipeline
pub fn run_pipeline(config: &Config, source: &SourceOptions, options: &RunOptions) -> NotesResult<()> {
  let ctx = RunContext::new();
  let source_id = source.source_id(config);
  let range = source.range();
  let chatty = !options.quiet && !options.json;

  if chatty {
    println!("🔍 Collecting changes {} in {}", range, source_id);
  }

  let classifier = RuleClassifier::from_config(&config.rules)?;
  let oracle = HttpOracle::from_config(&config.oracle)?;
  let gateway = EscalationGateway::new(&oracle)
    .with_retry(config.oracle.retry_policy())
    .with_concurrency(config.oracle.concurrency)
    .with_progress(progress_enabled(options.quiet, options.json));
  let change_source = source.build_source(config);

  let outcome = Pipeline::new(change_source.as_ref(), &classifier, &gateway)
    .run(&ctx, &source_id, &range)
    .inspect_err(|_| tracing::error!(run_id = %ctx.run_id(), "run aborted; no manifest was written"))?;

  let manifest = ReviewManifest::build(&source_id, &range.start, &range.end, &outcome.all_items).with_run(&ctx);
  let counts = manifest.counts();
  let store = ManifestStore::new(options.manifest.clone().unwrap_or_else(|| config.output.manifest.clone()));
  let written = store.write(manifest)?;

  if options.json {
    let summary = serde_json::json!({
      "run_id": ctx.run_id(),
      "manifest": written.path(),
      "total": outcome.all_items.len(),
      "decided_by_rules": outcome.decided.len(),
      "escalated": outcome.ambiguous.len(),
      "counts": counts,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
  } else if chatty {
    println!(
      "📋 {} changes: {} decided by rules, {} escalated",
      outcome.all_items.len(),
      outcome.decided.len(),
      outcome.ambiguous.len()
    );
    println!(
      "   included: {}  excluded: {}  needs clarification: {}",
      counts.included, counts.excluded, counts.needs_clarification
    );
    println!("✅ Review manifest written to {}", written.path().display());
  }

  // stderr keeps a `--json` summary on stdout parseable
  if options.review {
    eprintln!(
      "✏️  Edit {} now (review_status, category, title, description), then press ENTER to continue.",
      written.path().display()
    );
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
  }

  let Some(render_target) = &options.render else {
    return Ok(());
  };

  // Always from disk: the file may have been edited since it was written
  let reviewed = written.read()?;
  let notes_path = render_target.clone().unwrap_or_else(|| config.output.notes.clone());
  write_markdown(&render_markdown(&reviewed), &notes_path)?;

  if chatty {
    println!("📝 Release notes written to {}", notes_path.display());
  }

  Ok(())
}
