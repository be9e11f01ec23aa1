//! `relnotes classify`: rules stage only
//!
//! Shows what the deterministic rules decide and what would be escalated.
//! Never contacts the oracle and writes nothing.

use super::{SourceOptions, short};
use crate::classify::RuleClassifier;
use crate::core::config::Config;
use crate::core::error::NotesResult;
use crate::model::Signals;
use crate::pipeline::{PipelineItem, Verdict, classify_all};
use serde::Serialize;

#[derive(Serialize)]
struct ClassifiedRow<'a> {
  id: &'a str,
  subject: &'a str,
  /// `included`, `excluded` or `ambiguous`
  outcome: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  reason: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  confidence: Option<f64>,
  #[serde(skip_serializing_if = "Signals::is_empty")]
  signals: &'a Signals,
}

impl<'a> ClassifiedRow<'a> {
  fn from_item(item: &'a PipelineItem) -> Self {
    let decision = item.verdict.decision();
    let outcome = match &item.verdict {
      Verdict::Decided(d) if d.include == Some(true) => "included",
      Verdict::Decided(_) => "excluded",
      Verdict::Unresolved => "ambiguous",
    };
    Self {
      id: &item.record.id,
      subject: &item.record.subject,
      outcome,
      category: decision.and_then(|d| d.category).map(|c| c.to_string()),
      reason: decision.map(|d| d.reason.as_str()),
      confidence: decision.and_then(|d| d.confidence),
      signals: &item.signals,
    }
  }
}

/// Classify a range with the rules stage and report the split
pub fn run_classify(config: &Config, source: &SourceOptions, json: bool) -> NotesResult<()> {
  let classifier = RuleClassifier::from_config(&config.rules)?;
  let records = source.build_source(config).harvest(&source.source_id(config), &source.range())?;
  let total = records.len();
  let (decided, ambiguous) = classify_all(&classifier, records);

  if json {
    let rows: Vec<ClassifiedRow<'_>> = decided
      .iter()
      .chain(ambiguous.iter())
      .map(ClassifiedRow::from_item)
      .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    return Ok(());
  }

  println!(
    "📋 {} changes in {}: {} decided by rules, {} ambiguous",
    total,
    source.range(),
    decided.len(),
    ambiguous.len()
  );

  if !decided.is_empty() {
    println!();
    println!("Decided:");
    for row in decided.iter().map(ClassifiedRow::from_item) {
      let icon = if row.outcome == "included" { "✅" } else { "⏭️ " };
      let label = row.category.as_deref().unwrap_or(row.outcome);
      println!("  {} {:<8} {}  {}", icon, label, short(row.id), row.subject);
      if let Some(reason) = row.reason {
        println!("               {}", reason);
      }
    }
  }

  if !ambiguous.is_empty() {
    println!();
    println!("Ambiguous (would be escalated):");
    for item in &ambiguous {
      println!("  ❓ {}  {}", short(&item.record.id), item.record.subject);
    }
  }

  Ok(())
}
