use crate::core::error::{ConfigError, NotesResult};
use crate::oracle::gateway::RetryPolicy;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for relnotes
/// Searched in order: relnotes.toml, .relnotes.toml, .config/relnotes.toml
///
/// Every section is optional; a missing file means all defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub source: SourceConfig,
  #[serde(default)]
  pub oracle: OracleConfig,
  #[serde(default)]
  pub rules: RulesConfig,
  #[serde(default)]
  pub output: OutputConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

/// Where change records come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
  /// Local checkout path or clonable URL (default: ".")
  #[serde(default = "default_repo")]
  pub repo: String,

  /// Clone cache for remote sources (default: ".cache")
  #[serde(default = "default_cache_dir")]
  pub cache_dir: PathBuf,

  /// Collect the changed file list of every commit (default: true)
  #[serde(default = "default_true")]
  pub include_files: bool,

  /// Optional cap on the number of harvested commits
  #[serde(default)]
  pub max_commits: Option<usize>,
}

fn default_repo() -> String {
  ".".to_string()
}

fn default_cache_dir() -> PathBuf {
  PathBuf::from(".cache")
}

fn default_true() -> bool {
  true
}

impl Default for SourceConfig {
  fn default() -> Self {
    Self {
      repo: default_repo(),
      cache_dir: default_cache_dir(),
      include_files: true,
      max_commits: None,
    }
  }
}

/// Classification oracle (OpenAI-compatible chat endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
  /// Endpoint base URL; falls back to the `base_url_env` variable
  #[serde(default)]
  pub base_url: Option<String>,

  /// Environment variable holding the base URL (default: BASE_URL)
  #[serde(default = "default_base_url_env")]
  pub base_url_env: String,

  /// Environment variable holding the API key (default: API_KEY)
  #[serde(default = "default_api_key_env")]
  pub api_key_env: String,

  /// Model identifier sent with every request
  #[serde(default = "default_model")]
  pub model: String,

  /// Sampling temperature, kept low for consistent decisions
  #[serde(default = "default_temperature")]
  pub temperature: f64,

  /// Per-call timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,

  /// Retries for transient transport failures (timeouts, 429, 5xx)
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,

  /// Initial backoff between retries, doubled per attempt
  #[serde(default = "default_backoff_ms")]
  pub backoff_ms: u64,

  /// Maximum concurrent oracle calls
  #[serde(default = "default_concurrency")]
  pub concurrency: usize,
}

fn default_base_url_env() -> String {
  "BASE_URL".to_string()
}

fn default_api_key_env() -> String {
  "API_KEY".to_string()
}

fn default_model() -> String {
  "gpt-4.1".to_string()
}

fn default_temperature() -> f64 {
  0.2
}

fn default_timeout_secs() -> u64 {
  60
}

fn default_max_retries() -> u32 {
  2
}

fn default_backoff_ms() -> u64 {
  500
}

fn default_concurrency() -> usize {
  4
}

impl Default for OracleConfig {
  fn default() -> Self {
    Self {
      base_url: None,
      base_url_env: default_base_url_env(),
      api_key_env: default_api_key_env(),
      model: default_model(),
      temperature: default_temperature(),
      timeout_secs: default_timeout_secs(),
      max_retries: default_max_retries(),
      backoff_ms: default_backoff_ms(),
      concurrency: default_concurrency(),
    }
  }
}

impl OracleConfig {
  /// Resolve the endpoint: explicit config first, then the environment
  pub fn resolved_base_url(&self) -> Option<String> {
    self
      .base_url
      .clone()
      .or_else(|| std::env::var(&self.base_url_env).ok())
      .map(|url| url.trim().trim_end_matches('/').to_string())
      .filter(|url| !url.is_empty())
  }

  /// Read the API key from the configured environment variable
  pub fn api_key(&self) -> Option<String> {
    std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_retries: self.max_retries,
      initial_backoff: Duration::from_millis(self.backoff_ms),
      max_backoff: Duration::from_secs(30),
    }
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.concurrency == 0 {
      return Err(ConfigError::Invalid {
        field: "oracle.concurrency".to_string(),
        reason: "must be at least 1".to_string(),
      });
    }
    if !(0.0..=2.0).contains(&self.temperature) {
      return Err(ConfigError::Invalid {
        field: "oracle.temperature".to_string(),
        reason: format!("{} is outside 0.0..=2.0", self.temperature),
      });
    }
    if self.timeout_secs == 0 {
      return Err(ConfigError::Invalid {
        field: "oracle.timeout_secs".to_string(),
        reason: "must be at least 1".to_string(),
      });
    }
    Ok(())
  }
}

/// Extra patterns for the deterministic classifier
///
/// Appended to the built-in pattern lists, never replacing them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
  #[serde(default)]
  pub extra_subject_excludes: Vec<String>,
  #[serde(default)]
  pub extra_body_excludes: Vec<String>,
  #[serde(default)]
  pub extra_internal_paths: Vec<String>,
}

impl RulesConfig {
  fn validate(&self) -> Result<(), ConfigError> {
    let lists = [
      ("rules.extra_subject_excludes", &self.extra_subject_excludes),
      ("rules.extra_body_excludes", &self.extra_body_excludes),
      ("rules.extra_internal_paths", &self.extra_internal_paths),
    ];

    for (field, patterns) in lists {
      for pattern in patterns {
        if let Err(e) = RegexBuilder::new(pattern).case_insensitive(true).build() {
          return Err(ConfigError::Invalid {
            field: field.to_string(),
            reason: format!("'{}' is not a valid pattern: {}", pattern, e),
          });
        }
      }
    }
    Ok(())
  }
}

/// Output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
  /// Review manifest (default: outputs/review.json)
  #[serde(default = "default_manifest_path")]
  pub manifest: PathBuf,

  /// Rendered draft notes (default: outputs/draft_release_notes.md)
  #[serde(default = "default_notes_path")]
  pub notes: PathBuf,
}

fn default_manifest_path() -> PathBuf {
  PathBuf::from("outputs").join("review.json")
}

fn default_notes_path() -> PathBuf {
  PathBuf::from("outputs").join("draft_release_notes.md")
}

impl Default for OutputConfig {
  fn default() -> Self {
    Self {
      manifest: default_manifest_path(),
      notes: default_notes_path(),
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
  /// Also append diagnostics to this file
  #[serde(default)]
  pub file: Option<PathBuf>,
}

impl Config {
  /// Find config file in search order: relnotes.toml, .relnotes.toml, .config/relnotes.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("relnotes.toml"),
      path.join(".relnotes.toml"),
      path.join(".config").join("relnotes.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load the first config found under `root`, or defaults when there is none
  pub fn load_or_default(root: &Path) -> NotesResult<Self> {
    match Self::find_config_path(root) {
      Some(path) => Self::load_from(&path),
      None => Ok(Self::default()),
    }
  }

  /// Load and validate a specific config file
  pub fn load_from(config_path: &Path) -> NotesResult<Self> {
    if !config_path.exists() {
      return Err(
        ConfigError::NotFound {
          path: config_path.to_path_buf(),
        }
        .into(),
      );
    }

    let content = fs::read_to_string(config_path)?;
    let config: Config = toml_edit::de::from_str(&content).map_err(|e| ConfigError::Parse {
      path: config_path.to_path_buf(),
      detail: e.to_string(),
    })?;

    config.validate()?;
    Ok(config)
  }

  /// Validate every section
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.oracle.validate()?;
    self.rules.validate()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_defaults_without_config_file() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(dir.path()).unwrap();

    assert_eq!(config.source.repo, ".");
    assert!(config.source.include_files);
    assert_eq!(config.oracle.model, "gpt-4.1");
    assert_eq!(config.oracle.concurrency, 4);
    assert_eq!(config.output.manifest, PathBuf::from("outputs").join("review.json"));
  }

  #[test]
  fn test_partial_config_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
      dir.path().join("relnotes.toml"),
      r#"
[source]
repo = "https://github.com/getlago/lago"

[oracle]
model = "local-model"
concurrency = 2

[rules]
extra_subject_excludes = ["^wip\\b"]
"#,
    )
    .unwrap();

    let config = Config::load_or_default(dir.path()).unwrap();
    assert_eq!(config.source.repo, "https://github.com/getlago/lago");
    assert_eq!(config.source.cache_dir, PathBuf::from(".cache"));
    assert_eq!(config.oracle.model, "local-model");
    assert_eq!(config.oracle.concurrency, 2);
    assert_eq!(config.oracle.max_retries, 2);
    assert_eq!(config.rules.extra_subject_excludes, vec!["^wip\\b".to_string()]);
  }

  #[test]
  fn test_hidden_config_location_is_found() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".config")).unwrap();
    fs::write(dir.path().join(".config").join("relnotes.toml"), "[oracle]\nmodel = \"m\"\n").unwrap();

    let found = Config::find_config_path(dir.path()).unwrap();
    assert!(found.ends_with(".config/relnotes.toml"));
  }

  #[test]
  fn test_zero_concurrency_is_rejected() {
    let oracle = OracleConfig {
      concurrency: 0,
      ..Default::default()
    };
    assert!(oracle.validate().is_err());
  }

  #[test]
  fn test_out_of_range_temperature_is_rejected() {
    let oracle = OracleConfig {
      temperature: 3.5,
      ..Default::default()
    };
    assert!(oracle.validate().is_err());
  }

  #[test]
  fn test_invalid_rule_pattern_is_rejected() {
    let rules = RulesConfig {
      extra_body_excludes: vec!["(unclosed".to_string()],
      ..Default::default()
    };
    let err = rules.validate().unwrap_err();
    assert!(err.to_string().contains("rules.extra_body_excludes"));
  }

  #[test]
  fn test_explicit_missing_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(Config::load_from(&dir.path().join("nope.toml")).is_err());
  }

  #[test]
  fn test_retry_policy_from_config() {
    let oracle = OracleConfig {
      max_retries: 5,
      backoff_ms: 100,
      ..Default::default()
    };
    let policy = oracle.retry_policy();
    assert_eq!(policy.max_retries, 5);
    assert_eq!(policy.initial_backoff, Duration::from_millis(100));
  }
}
