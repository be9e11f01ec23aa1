//! Markdown renderer for a reviewed manifest
//!
//! Trusts only `review_status`, `category`, `title`, `description` and the
//! clarification fields. Stage, reason, confidence and signals never affect
//! the output. No network, no clock: the same manifest renders the same text.

use crate::classify::conventional::strip_type_prefix;
use crate::core::error::{NotesResult, ResultExt};
use crate::manifest::{ReviewEntry, ReviewManifest};
use crate::model::{Category, ReviewStatus};
use std::fs;
use std::path::Path;

fn is_published(entry: &ReviewEntry, category: Category) -> bool {
  entry.review_status == Some(ReviewStatus::Included) && entry.category == Some(category)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn format_entry(entry: &ReviewEntry) -> String {
  let title = match non_blank(&entry.title) {
    Some(title) => title.to_string(),
    None if entry.subject.trim().is_empty() => "Untitled change".to_string(),
    None => strip_type_prefix(&entry.subject).to_string(),
  };
  let description = match non_blank(&entry.description) {
    Some(description) => description.to_string(),
    None => format!("Includes change: {}", entry.subject.trim()),
  };
  let author = if entry.author.trim().is_empty() {
    "Unknown"
  } else {
    entry.author.trim()
  };
  let link = match non_blank(&entry.url) {
    Some(url) => format!(" ([details]({}))", url),
    None => String::new(),
  };

  format!("- **{}**{}\n  - {}\n  - Author: {}\n", title, link, description, author)
}

fn push_section(lines: &mut Vec<String>, heading: &str, empty_note: &str, entries: &[&ReviewEntry]) {
  lines.push(format!("## {}\n", heading));
  if entries.is_empty() {
    lines.push(format!("_{}_\n", empty_note));
  } else {
    lines.extend(entries.iter().map(|e| format_entry(e)));
  }
}

/// Render public release notes plus the internal clarification section
pub fn render_markdown(manifest: &ReviewManifest) -> String {
  let meta = &manifest.metadata;
  let mut lines: Vec<String> = vec!["# Release Notes\n".to_string()];

  if !meta.source_id.is_empty() || !meta.range_start.is_empty() || !meta.range_end.is_empty() {
    lines.push(format!("_Repository: {}_\n", meta.source_id));
    lines.push(format!("_Changes: {} → {}_\n", meta.range_start, meta.range_end));
  }
  lines.push(format!("_Generated at: {}_\n", meta.generated_at.to_rfc3339()));

  let features: Vec<&ReviewEntry> = manifest
    .entries
    .iter()
    .filter(|e| is_published(e, Category::Feature))
    .collect();
  let bugfixes: Vec<&ReviewEntry> = manifest
    .entries
    .iter()
    .filter(|e| is_published(e, Category::Bugfix))
    .collect();

  push_section(&mut lines, "Features", "No user-facing features detected.", &features);
  push_section(&mut lines, "Bug Fixes", "No user-facing bug fixes detected.", &bugfixes);

  let unclear: Vec<&ReviewEntry> = manifest
    .entries
    .iter()
    .filter(|e| e.review_status == Some(ReviewStatus::NeedsClarification))
    .collect();
  if !unclear.is_empty() {
    lines.push("\n---\n".to_string());
    lines.push("## Needs clarification (internal)\n".to_string());
    for entry in unclear {
      let question = non_blank(&entry.clarification_question).unwrap_or("Clarification needed.");
      lines.push(format!(
        "- {}\n  - Question: {}\n  - Author: {}\n",
        entry.subject.trim(),
        question,
        entry.author
      ));
    }
  }

  lines.join("\n")
}

/// Write rendered Markdown, creating parent directories
pub fn write_markdown(text: &str, path: &Path) -> NotesResult<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
  }
  fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}
