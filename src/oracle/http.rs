//! OpenAI-compatible chat-completions backend
//!
//! One blocking request per call; the gateway owns retries and parallelism.

use super::prompt::{SYSTEM_PROMPT, user_prompt};
use super::{ClassificationOracle, OracleFailure, OracleRequest, OracleResponse, TokenUsage};
use crate::core::config::OracleConfig;
use crate::core::error::{NotesError, NotesResult};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage<'a>>,
  temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)]
  model: Option<String>,
  #[serde(default)]
  choices: Vec<ChatChoice>,
  #[serde(default)]
  usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  #[serde(default)]
  content: Option<String>,
}

/// HTTP oracle backend
pub struct HttpOracle {
  client: Client,
  /// `None` when no endpoint is configured; calls then fail with `NotConfigured`
  base_url: Option<String>,
  api_key: Option<String>,
  model: String,
  temperature: f64,
  base_url_env: String,
}

impl HttpOracle {
  /// Build the backend from config
  ///
  /// A missing endpoint is not an error here: runs without ambiguous changes
  /// never call the oracle.
  pub fn from_config(config: &OracleConfig) -> NotesResult<Self> {
    let client = Client::builder()
      .timeout(config.timeout())
      .user_agent(concat!("relnotes/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| {
        NotesError::with_help(
          format!("Failed to build HTTP client: {}", e),
          "Check the system TLS configuration and proxy environment variables.",
        )
      })?;

    Ok(Self {
      client,
      base_url: config.resolved_base_url(),
      api_key: config.api_key(),
      model: config.model.clone(),
      temperature: config.temperature,
      base_url_env: config.base_url_env.clone(),
    })
  }

  fn endpoint(&self) -> Result<String, OracleFailure> {
    match &self.base_url {
      Some(base) => Ok(format!("{}/chat/completions", base)),
      None => Err(OracleFailure::NotConfigured(format!(
        "no [oracle] base_url and ${} is unset",
        self.base_url_env
      ))),
    }
  }
}

impl ClassificationOracle for HttpOracle {
  fn name(&self) -> &str {
    "http"
  }

  fn model(&self) -> &str {
    &self.model
  }

  fn classify_ambiguous(&self, request: &OracleRequest<'_>) -> Result<OracleResponse, OracleFailure> {
    let endpoint = self.endpoint()?;
    let user = user_prompt(&request.context);
    let body = ChatCompletionRequest {
      model: &self.model,
      messages: vec![
        ChatMessage {
          role: "system",
          content: SYSTEM_PROMPT,
        },
        ChatMessage {
          role: "user",
          content: &user,
        },
      ],
      temperature: self.temperature,
    };

    let mut builder = self.client.post(&endpoint).json(&body);
    if let Some(key) = &self.api_key {
      builder = builder.bearer_auth(key);
    }

    let response = builder.send().map_err(|e| {
      if e.is_timeout() {
        OracleFailure::Timeout
      } else {
        OracleFailure::Transport {
          detail: e.to_string(),
          transient: e.is_connect() || e.is_request(),
        }
      }
    })?;

    let status = response.status();
    if !status.is_success() {
      let text = response.text().unwrap_or_default();
      return Err(OracleFailure::Transport {
        detail: format!("HTTP {}: {}", status.as_u16(), truncate(&text, 200)),
        transient: is_transient_status(status),
      });
    }

    let completion: ChatCompletionResponse = response.json().map_err(|e| {
      if e.is_timeout() {
        OracleFailure::Timeout
      } else {
        OracleFailure::InvalidResponse(format!("not a chat completion: {}", e))
      }
    })?;

    let content = completion
      .choices
      .into_iter()
      .next()
      .and_then(|choice| choice.message.content)
      .ok_or_else(|| OracleFailure::InvalidResponse("response has no message content".to_string()))?;

    let payload = serde_json::from_str(strip_code_fences(&content))
      .map_err(|e| OracleFailure::InvalidResponse(format!("content is not JSON: {}", e)))?;

    Ok(OracleResponse {
      payload,
      model: completion.model.unwrap_or_else(|| self.model.clone()),
      usage: completion.usage,
    })
  }
}

/// 429 and 5xx are worth retrying; everything else is final
fn is_transient_status(status: StatusCode) -> bool {
  status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Remove a surrounding ``` / ```json fence some models add
pub fn strip_code_fences(text: &str) -> &str {
  let trimmed = text.trim();
  let Some(inner) = trimmed.strip_prefix("```") else {
    return trimmed;
  };
  let inner = inner
    .strip_prefix("json")
    .or_else(|| inner.strip_prefix("JSON"))
    .unwrap_or(inner);
  let inner = inner.trim_end();
  inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn truncate(text: &str, max_chars: usize) -> String {
  let trimmed = text.trim();
  match trimmed.char_indices().nth(max_chars) {
    Some((idx, _)) => format!("{}...", &trimmed[..idx]),
    None => trimmed.to_string(),
  }
}
