//! Pipeline tests against a scripted oracle

use chrono::DateTime;
use relnotes::classify::RuleClassifier;
use relnotes::core::context::RunContext;
use relnotes::core::error::{ExitCode, NotesError, NotesResult, OracleError};
use relnotes::harvest::{ChangeSource, RevisionRange};
use relnotes::manifest::{ManifestStore, ReviewManifest};
use relnotes::model::{Category, ChangeRecord, ReviewStatus, Stage};
use relnotes::oracle::prompt::user_prompt;
use relnotes::oracle::{
  ClassificationOracle, EscalationGateway, OracleFailure, OracleRequest, OracleResponse, RetryPolicy,
};
use relnotes::pipeline::Pipeline;
use relnotes::render::render_markdown;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Answers by subject; unknown subjects get a needs-clarification answer
struct ScriptedOracle {
  answers: HashMap<String, Value>,
  calls: AtomicUsize,
  seen: Mutex<Vec<String>>,
  prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
  fn new(answers: &[(&str, Value)]) -> Self {
    Self {
      answers: answers.iter().map(|(s, v)| (s.to_string(), v.clone())).collect(),
      calls: AtomicUsize::new(0),
      seen: Mutex::new(Vec::new()),
      prompts: Mutex::new(Vec::new()),
    }
  }

  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl ClassificationOracle for ScriptedOracle {
  fn name(&self) -> &str {
    "scripted"
  }

  fn model(&self) -> &str {
    "scripted-1"
  }

  fn classify_ambiguous(&self, request: &OracleRequest<'_>) -> Result<OracleResponse, OracleFailure> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.seen.lock().unwrap().push(request.context.subject.clone());
    self.prompts.lock().unwrap().push(user_prompt(&request.context));

    let payload = self.answers.get(&request.context.subject).cloned().unwrap_or_else(|| {
      json!({
        "include": false,
        "needs_clarification": true,
        "clarification_question": "Is this visible to customers?",
        "reason": "Not enough context."
      })
    });
    Ok(OracleResponse {
      payload,
      model: "scripted-1".to_string(),
      usage: None,
    })
  }
}

struct VecSource(Vec<ChangeRecord>);

impl ChangeSource for VecSource {
  fn harvest(&self, _source_id: &str, _range: &RevisionRange) -> NotesResult<Vec<ChangeRecord>> {
    Ok(self.0.clone())
  }
}

fn record(id: &str, subject: &str) -> ChangeRecord {
  ChangeRecord {
    id: id.to_string(),
    author_name: "Ada".to_string(),
    author_email: "ada@example.com".to_string(),
    timestamp: DateTime::parse_from_rfc3339("2024-05-01T10:00:00+00:00").unwrap(),
    subject: subject.to_string(),
    body: String::new(),
    files: vec!["api/app/models/invoice.rb".to_string()],
    url: None,
  }
}

fn run_with(oracle: &ScriptedOracle, records: Vec<ChangeRecord>) -> NotesResult<relnotes::pipeline::PipelineOutcome> {
  let classifier = RuleClassifier::builtin()?;
  let gateway = EscalationGateway::new(oracle)
    .with_retry(RetryPolicy::no_retry())
    .with_concurrency(3);
  let source = VecSource(records);
  Pipeline::new(&source, &classifier, &gateway).run(
    &RunContext::new(),
    "getlago/lago",
    &RevisionRange::new("v1.0.0", "v1.1.0"),
  )
}

fn ids(manifest: &ReviewManifest) -> Vec<&str> {
  manifest.entries.iter().map(|e| e.id.as_str()).collect()
}

#[test]
fn test_rules_decided_come_first_then_escalated_in_order() {
  let oracle = ScriptedOracle::new(&[(
    "polish invoice pdf layout",
    json!({
      "include": true,
      "category": "feature",
      "title": "Cleaner invoice PDFs",
      "description": "Invoice PDFs have a clearer layout.",
      "reason": "Visible change to invoices."
    }),
  )]);

  let outcome = run_with(
    &oracle,
    vec![
      record("a", "polish invoice pdf layout"),
      record("b", "feat: add coupons api"),
      record("c", "tweak onboarding"),
      record("d", "chore: bump rubocop"),
      record("e", "improve webhook retries"),
    ],
  )
  .unwrap();

  assert_eq!(oracle.calls(), 3);
  let manifest = ReviewManifest::build("getlago/lago", "v1.0.0", "v1.1.0", &outcome.all_items);
  assert_eq!(ids(&manifest), vec!["b", "d", "a", "c", "e"]);

  let polish = &manifest.entries[2];
  assert_eq!(polish.stage, Some(Stage::Oracle));
  assert_eq!(polish.review_status, Some(ReviewStatus::Included));
  assert_eq!(polish.category, Some(Category::Feature));
  assert_eq!(polish.title.as_deref(), Some("Cleaner invoice PDFs"));

  let tweak = &manifest.entries[3];
  assert_eq!(tweak.review_status, Some(ReviewStatus::NeedsClarification));
  assert_eq!(tweak.clarification_question.as_deref(), Some("Is this visible to customers?"));

  assert!(manifest.entries.iter().all(|e| e.review_status.is_some()));
}

#[test]
fn test_oracle_not_called_when_rules_decide_everything() {
  let oracle = ScriptedOracle::new(&[]);
  let outcome = run_with(
    &oracle,
    vec![
      record("a", "feat: add coupons api"),
      record("b", "fix: wrong tax rounding"),
      record("c", "Merge pull request #12 from getlago/feat-x"),
    ],
  )
  .unwrap();

  assert_eq!(oracle.calls(), 0);
  assert!(outcome.ambiguous.is_empty());
  assert_eq!(outcome.all_items.len(), 3);
}

#[test]
fn test_malformed_answer_aborts_the_run() {
  let oracle = ScriptedOracle::new(&[("tweak onboarding", json!({ "include": true, "category": "feature" }))]);

  let err = run_with(
    &oracle,
    vec![record("a", "feat: add coupons api"), record("b", "tweak onboarding")],
  )
  .unwrap_err();

  assert!(matches!(err, NotesError::Oracle(OracleError::Malformed { .. })));
  assert_eq!(err.exit_code(), ExitCode::Validation);
}

#[test]
fn test_escalated_context_has_no_rule_signals() {
  let oracle = ScriptedOracle::new(&[]);
  let mut docs_only = record("a", "update internal docs for api");
  docs_only.files = vec!["docs/api.md".to_string()];

  let outcome = run_with(&oracle, vec![docs_only]).unwrap();

  // the rules stage did annotate the item
  assert_eq!(outcome.all_items[0].signals.internal_files_score, Some(1.0));

  assert_eq!(*oracle.seen.lock().unwrap(), vec!["update internal docs for api".to_string()]);
  let prompts = oracle.prompts.lock().unwrap();
  assert_eq!(prompts.len(), 1);
  assert!(prompts[0].contains("- files: docs/api.md"));
  assert!(!prompts[0].contains("internal_files_score"));
  assert!(!prompts[0].contains("conventional_type"));
  assert!(!prompts[0].contains("1.0"));
}

#[test]
fn test_hand_edits_reach_the_rendered_notes() {
  let oracle = ScriptedOracle::new(&[]);
  let outcome = run_with(
    &oracle,
    vec![record("a", "feat: add coupons api"), record("b", "tweak onboarding")],
  )
  .unwrap();

  let dir = TempDir::new().unwrap();
  let path = dir.path().join("review.json");
  let manifest = ReviewManifest::build("getlago/lago", "v1.0.0", "v1.1.0", &outcome.all_items);
  let written = ManifestStore::new(&path).write(manifest).unwrap();

  // reviewer publishes the unclear change as a bug fix
  let mut doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
  let entry = &mut doc["entries"][1];
  entry["review_status"] = json!("included");
  entry["category"] = json!("bugfix");
  entry["title"] = json!("Smoother onboarding");
  std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

  let reviewed = written.read().unwrap();
  let notes = render_markdown(&reviewed);

  assert!(notes.contains("- **add coupons api**"));
  assert!(notes.contains("- **Smoother onboarding**"));
  assert!(!notes.contains("Needs clarification"));
}
