//! Strict contract for oracle answers
//!
//! Missing required fields, wrong types and unknown categories fail
//! deserialization; the remaining rules are checked by `validate`. Unknown
//! extra fields are ignored.

use crate::model::{Category, Decision, Stage};
use serde::Deserialize;

pub const MAX_TITLE_CHARS: usize = 70;
pub const MAX_DESCRIPTION_CHARS: usize = 240;

/// Decision shape the oracle must return
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OracleDecision {
  pub include: bool,
  #[serde(default)]
  pub category: Option<Category>,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub needs_clarification: bool,
  #[serde(default)]
  pub clarification_question: Option<String>,
  pub reason: String,
}

impl OracleDecision {
  /// Deserialize and validate a raw payload
  pub fn from_payload(payload: &serde_json::Value) -> Result<Self, String> {
    let decision: OracleDecision = serde_json::from_value(payload.clone()).map_err(|e| e.to_string())?;
    decision.validate()?;
    Ok(decision)
  }

  pub fn validate(&self) -> Result<(), String> {
    if self.reason.trim().is_empty() {
      return Err("`reason` must not be empty".to_string());
    }
    if self.category.is_some() && !self.include {
      return Err("`category` is only allowed when `include` is true".to_string());
    }
    if let Some(title) = non_blank(&self.title)
      && title.chars().count() > MAX_TITLE_CHARS
    {
      return Err(format!("`title` exceeds {} characters", MAX_TITLE_CHARS));
    }
    if let Some(description) = non_blank(&self.description)
      && description.chars().count() > MAX_DESCRIPTION_CHARS
    {
      return Err(format!("`description` exceeds {} characters", MAX_DESCRIPTION_CHARS));
    }
    if self.needs_clarification && non_blank(&self.clarification_question).is_none() {
      return Err("`needs_clarification` is true but `clarification_question` is empty".to_string());
    }
    Ok(())
  }

  /// Convert into a pipeline decision tagged `stage=oracle`
  ///
  /// User-facing text is kept only for included changes, and the question
  /// only when clarification was requested.
  pub fn into_decision(self) -> Decision {
    let (title, description) = if self.include {
      (
        non_blank(&self.title).map(str::to_string),
        non_blank(&self.description).map(str::to_string),
      )
    } else {
      (None, None)
    };
    let clarification_question = if self.needs_clarification {
      non_blank(&self.clarification_question).map(str::to_string)
    } else {
      None
    };

    Decision {
      include: Some(self.include),
      reason: self.reason.trim().to_string(),
      stage: Stage::Oracle,
      confidence: None,
      category: self.category,
      title,
      description,
      needs_clarification: self.needs_clarification,
      clarification_question,
    }
  }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_valid_inclusion() {
    let payload = json!({
      "include": true,
      "category": "feature",
      "title": "Proration for plan upgrades",
      "description": "Upgrading mid-cycle now charges only the difference.",
      "needs_clarification": false,
      "clarification_question": null,
      "reason": "Changes customer-visible billing behaviour.",
      "extra_field": "ignored"
    });
    let decision = OracleDecision::from_payload(&payload).unwrap().into_decision();
    assert_eq!(decision.stage, Stage::Oracle);
    assert_eq!(decision.include, Some(true));
    assert_eq!(decision.category, Some(Category::Feature));
    assert_eq!(decision.confidence, None);
    assert!(decision.check_invariants().is_ok());
  }

  #[test]
  fn test_missing_reason_is_rejected() {
    let err = OracleDecision::from_payload(&json!({"include": false})).unwrap_err();
    assert!(err.contains("reason"), "{}", err);
  }

  #[test]
  fn test_missing_include_is_rejected() {
    assert!(OracleDecision::from_payload(&json!({"reason": "x"})).is_err());
  }

  #[test]
  fn test_unknown_category_is_rejected() {
    let payload = json!({"include": true, "category": "improvement", "reason": "x"});
    assert!(OracleDecision::from_payload(&payload).is_err());
  }

  #[test]
  fn test_category_on_exclusion_is_rejected() {
    let payload = json!({"include": false, "category": "bugfix", "reason": "x"});
    assert!(OracleDecision::from_payload(&payload).is_err());
  }

  #[test]
  fn test_long_title_is_rejected() {
    let payload = json!({"include": true, "category": "feature", "title": "t".repeat(71), "reason": "x"});
    let err = OracleDecision::from_payload(&payload).unwrap_err();
    assert!(err.contains("70"));
  }

  #[test]
  fn test_length_limits_are_inclusive() {
    let payload = json!({
      "include": true,
      "category": "bugfix",
      "title": "é".repeat(MAX_TITLE_CHARS),
      "description": "d".repeat(MAX_DESCRIPTION_CHARS),
      "reason": "x"
    });
    let decision = OracleDecision::from_payload(&payload).unwrap();
    assert_eq!(decision.title.map(|t| t.chars().count()), Some(70));
    assert_eq!(decision.description.map(|d| d.len()), Some(240));
  }

  #[test]
  fn test_long_description_is_rejected() {
    let payload = json!({
      "include": true,
      "category": "feature",
      "description": "d".repeat(MAX_DESCRIPTION_CHARS + 1),
      "reason": "x"
    });
    let err = OracleDecision::from_payload(&payload).unwrap_err();
    assert!(err.contains("240"));
  }

  #[test]
  fn test_clarification_requires_question() {
    let payload = json!({"include": false, "needs_clarification": true, "reason": "unclear"});
    assert!(OracleDecision::from_payload(&payload).is_err());
  }

  #[test]
  fn test_exclusion_drops_user_facing_text() {
    let payload = json!({
      "include": false,
      "title": "Internal docs",
      "description": "Docs only",
      "clarification_question": "Stray question?",
      "reason": "Documentation only."
    });
    let decision = OracleDecision::from_payload(&payload).unwrap().into_decision();
    assert_eq!(decision.title, None);
    assert_eq!(decision.description, None);
    assert_eq!(decision.clarification_question, None);
  }

  #[test]
  fn test_clarification_is_kept() {
    let payload = json!({
      "include": true,
      "category": "bugfix",
      "needs_clarification": true,
      "clarification_question": "Which plans are affected?",
      "reason": "Unclear scope."
    });
    let decision = OracleDecision::from_payload(&payload).unwrap().into_decision();
    assert!(decision.needs_clarification);
    assert_eq!(decision.clarification_question.as_deref(), Some("Which plans are affected?"));
  }
}
