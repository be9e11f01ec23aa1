//! Prompts sent with every escalation

use super::ChangeContext;
use super::schema::{MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS};

/// Publication policy shared by all calls
pub const SYSTEM_PROMPT: &str = "You are assisting with publishing user-facing release notes.
Rules:
- Exclude internal-only changes (refactors, chores, CI, tests, dependency bumps) unless clearly user-impacting.
- If included, classify strictly as: feature OR bugfix.
- Write for end users: clear, concise, minimal jargon.
- If information is insufficient, set needs_clarification=true and provide a single concrete question to ask the author.
Return ONLY valid JSON matching the requested schema. No extra text.";

const RESPONSE_SCHEMA: &str = r#"{
  "include": true/false,
  "category": "feature"|"bugfix"|null,
  "title": string|null,
  "description": string|null,
  "needs_clarification": true/false,
  "clarification_question": string|null,
  "reason": string
}"#;

/// Per-change prompt embedding the response schema
pub fn user_prompt(context: &ChangeContext) -> String {
  let files = if context.files.is_empty() {
    "(none)".to_string()
  } else {
    context.files.join(", ")
  };

  format!(
    "Decide if the following change should appear in public release notes.

SCHEMA:
{schema}

CHANGE:
- author: {author}
- subject: {subject}
- body: {body}
- files: {files}

Constraints for included entries:
- title <= {title_max} chars
- description <= {description_max} chars
",
    schema = RESPONSE_SCHEMA,
    author = context.author,
    subject = context.subject,
    body = context.body,
    files = files,
    title_max = MAX_TITLE_CHARS,
    description_max = MAX_DESCRIPTION_CHARS,
  )
}
