//! Classification oracle: the external capability ambiguous changes escalate to
//!
//! The pipeline only sees the `ClassificationOracle` trait. `HttpOracle` talks to
//! an OpenAI-compatible endpoint; tests inject deterministic stubs.
//!
//! - **gateway**: retry policy, bounded parallelism, schema enforcement
//! - **schema**: the strict response contract
//! - **prompt**: system policy and per-change prompt
//! - **http**: reqwest-based backend

pub mod gateway;
pub mod http;
pub mod prompt;
pub mod schema;

use crate::core::context::RunContext;
use crate::model::ChangeRecord;
use serde::Deserialize;
use std::fmt;

pub use gateway::{EscalationGateway, RetryPolicy};
pub use http::HttpOracle;

/// Operation label attached to every escalation call
pub const FILTER_OPERATION: &str = "filter_ambiguous";

/// Minimal context sent for one change
///
/// Deliberately excludes rules-stage signals: the oracle decides from the change itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeContext {
  pub record_id: String,
  pub author: String,
  pub subject: String,
  pub body: String,
  pub files: Vec<String>,
}

impl ChangeContext {
  pub fn from_record(record: &ChangeRecord) -> Self {
    let author = record.author_name.trim();
    Self {
      record_id: record.id.clone(),
      author: if author.is_empty() { "Unknown".to_string() } else { author.to_string() },
      subject: record.subject.trim().to_string(),
      body: record.body.trim().to_string(),
      files: record.files.clone(),
    }
  }
}

/// One oracle call
#[derive(Debug, Clone)]
pub struct OracleRequest<'a> {
  pub run: &'a RunContext,
  pub operation: &'static str,
  pub context: ChangeContext,
}

/// Token accounting reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
  #[serde(default)]
  pub prompt_tokens: u64,
  #[serde(default)]
  pub completion_tokens: u64,
  #[serde(default)]
  pub total_tokens: u64,
}

/// Raw, not yet validated oracle answer
#[derive(Debug, Clone)]
pub struct OracleResponse {
  /// Parsed JSON payload, checked against the schema by the gateway
  pub payload: serde_json::Value,
  pub model: String,
  pub usage: Option<TokenUsage>,
}

/// Why a single oracle call failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleFailure {
  /// No endpoint to talk to
  NotConfigured(String),
  /// The call did not finish within the timeout
  Timeout,
  /// Network or HTTP-level failure
  Transport { detail: String, transient: bool },
  /// The backend answered, but not with a JSON document
  InvalidResponse(String),
}

impl OracleFailure {
  /// Worth another attempt after backing off
  pub fn is_transient(&self) -> bool {
    match self {
      OracleFailure::Timeout => true,
      OracleFailure::Transport { transient, .. } => *transient,
      OracleFailure::NotConfigured(_) | OracleFailure::InvalidResponse(_) => false,
    }
  }
}

impl fmt::Display for OracleFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OracleFailure::NotConfigured(detail) => write!(f, "not configured: {}", detail),
      OracleFailure::Timeout => write!(f, "timed out"),
      OracleFailure::Transport { detail, .. } => write!(f, "{}", detail),
      OracleFailure::InvalidResponse(detail) => write!(f, "invalid response: {}", detail),
    }
  }
}

/// A capability that classifies one ambiguous change
///
/// Implementations must be callable from several worker threads at once.
pub trait ClassificationOracle: Send + Sync {
  /// Short backend name for logs
  fn name(&self) -> &str;

  /// Model identifier reported in logs
  fn model(&self) -> &str;

  fn classify_ambiguous(&self, request: &OracleRequest<'_>) -> Result<OracleResponse, OracleFailure>;
}
