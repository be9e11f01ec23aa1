//! Error types for relnotes with contextual messages and exit codes
//!
//! Every fatal condition in a run surfaces as exactly one `NotesError`. Errors carry
//! enough context (which record, which stage) to reproduce the failure, and most
//! carry a help line pointing at the fix.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for relnotes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, unreadable manifest)
  User = 1,
  /// System error (git, network, I/O)
  System = 2,
  /// Validation failure (oracle output rejected by the schema)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for relnotes
#[derive(Debug)]
pub enum NotesError {
  /// Configuration errors
  Config(ConfigError),

  /// Harvesting (version-control) errors
  Harvest(HarvestError),

  /// Classification oracle errors
  Oracle(OracleError),

  /// Review manifest errors
  Manifest(ManifestError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl NotesError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    NotesError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    NotesError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      NotesError::Message { message, context, help } => NotesError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      NotesError::Io(err) => NotesError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      NotesError::Config(_) => ExitCode::User,
      NotesError::Harvest(_) => ExitCode::System,
      NotesError::Oracle(OracleError::Malformed { .. }) => ExitCode::Validation,
      NotesError::Oracle(OracleError::NotConfigured { .. }) => ExitCode::User,
      NotesError::Oracle(_) => ExitCode::System,
      NotesError::Manifest(_) => ExitCode::User,
      NotesError::Io(_) => ExitCode::System,
      NotesError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      NotesError::Config(e) => e.help_message(),
      NotesError::Harvest(e) => e.help_message(),
      NotesError::Oracle(e) => e.help_message(),
      NotesError::Manifest(e) => e.help_message(),
      NotesError::Message { help, .. } => help.clone(),
      NotesError::Io(_) => None,
    }
  }
}

impl fmt::Display for NotesError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NotesError::Config(e) => write!(f, "{}", e),
      NotesError::Harvest(e) => write!(f, "{}", e),
      NotesError::Oracle(e) => write!(f, "{}", e),
      NotesError::Manifest(e) => write!(f, "{}", e),
      NotesError::Io(e) => write!(f, "I/O error: {}", e),
      NotesError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for NotesError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      NotesError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for NotesError {
  fn from(err: io::Error) -> Self {
    NotesError::Io(err)
  }
}

impl From<String> for NotesError {
  fn from(msg: String) -> Self {
    NotesError::message(msg)
  }
}

impl From<&str> for NotesError {
  fn from(msg: &str) -> Self {
    NotesError::message(msg)
  }
}

impl From<ConfigError> for NotesError {
  fn from(err: ConfigError) -> Self {
    NotesError::Config(err)
  }
}

impl From<HarvestError> for NotesError {
  fn from(err: HarvestError) -> Self {
    NotesError::Harvest(err)
  }
}

impl From<OracleError> for NotesError {
  fn from(err: OracleError) -> Self {
    NotesError::Oracle(err)
  }
}

impl From<ManifestError> for NotesError {
  fn from(err: ManifestError) -> Self {
    NotesError::Manifest(err)
  }
}

impl From<toml_edit::de::Error> for NotesError {
  fn from(err: toml_edit::de::Error) -> Self {
    NotesError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for NotesError {
  fn from(err: serde_json::Error) -> Self {
    NotesError::message(format!("JSON error: {}", err))
  }
}

impl From<regex::Error> for NotesError {
  fn from(err: regex::Error) -> Self {
    NotesError::message(format!("Invalid pattern: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for NotesError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    NotesError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<chrono::ParseError> for NotesError {
  fn from(err: chrono::ParseError) -> Self {
    NotesError::message(format!("Timestamp parse error: {}", err))
  }
}

impl From<tempfile::PersistError> for NotesError {
  fn from(err: tempfile::PersistError) -> Self {
    NotesError::Io(err.error)
  }
}

impl From<rayon::ThreadPoolBuildError> for NotesError {
  fn from(err: rayon::ThreadPoolBuildError) -> Self {
    NotesError::message(format!("Failed to start oracle worker pool: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// An explicitly requested config file does not exist
  NotFound { path: PathBuf },

  /// Config file could not be parsed
  Parse { path: PathBuf, detail: String },

  /// A field has an unusable value
  Invalid { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Omit --config to search relnotes.toml, .relnotes.toml and .config/relnotes.toml.".to_string())
      }
      ConfigError::Parse { .. } => Some("Check the TOML syntax and section names ([source], [oracle], [rules], [output], [logging]).".to_string()),
      ConfigError::Invalid { field, .. } if field.starts_with("rules.") => {
        Some("Rule patterns are Rust regex syntax and are matched case-insensitively.".to_string())
      }
      ConfigError::Invalid { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { path } => write!(f, "Config file not found: {}", path.display()),
      ConfigError::Parse { path, detail } => {
        write!(f, "Failed to parse config {}:\n{}", path.display(), detail)
      }
      ConfigError::Invalid { field, reason } => write!(f, "Invalid config value for {}: {}", field, reason),
    }
  }
}

/// Harvesting (version control / record input) errors
#[derive(Debug)]
pub enum HarvestError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// A revision boundary could not be resolved to a commit
  UnresolvedRef { reference: String },

  /// Cloning a remote source failed
  CloneFailed { url: String, stderr: String },

  /// A harvested or supplied record could not be read
  MalformedRecord { source: String, detail: String },
}

impl HarvestError {
  fn help_message(&self) -> Option<String> {
    match self {
      HarvestError::RepoNotFound { path } => Some(format!(
        "Pass --repo with a git checkout or a clonable URL (looked at {}).",
        path.display()
      )),
      HarvestError::UnresolvedRef { reference } => Some(format!(
        "Make sure '{}' exists as a tag, branch or SHA (try `git fetch --tags`).",
        reference
      )),
      HarvestError::CloneFailed { .. } => Some("Check the URL and your network access; the clone is cached under [source] cache_dir.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for HarvestError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HarvestError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      HarvestError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      HarvestError::UnresolvedRef { reference } => {
        write!(f, "Cannot resolve revision '{}' to a commit", reference)
      }
      HarvestError::CloneFailed { url, stderr } => {
        write!(f, "Failed to clone {}:\n{}", url, stderr)
      }
      HarvestError::MalformedRecord { source, detail } => {
        write!(f, "Malformed change record from {}: {}", source, detail)
      }
    }
  }
}

/// Classification oracle errors
///
/// All of these abort the run: no decision is ever guessed for a record the
/// oracle failed on.
#[derive(Debug)]
pub enum OracleError {
  /// No oracle endpoint configured but the run needs one
  NotConfigured { detail: String },

  /// Oracle output failed schema validation
  Malformed {
    record_id: String,
    subject: String,
    detail: String,
  },

  /// Transport failed after all retries
  Transport {
    record_id: String,
    attempts: u32,
    detail: String,
  },

  /// Every attempt timed out
  Timeout { record_id: String, attempts: u32 },
}

impl OracleError {
  fn help_message(&self) -> Option<String> {
    match self {
      OracleError::NotConfigured { .. } => Some(
        "Set [oracle] base_url in relnotes.toml (or the BASE_URL environment variable) and export the API key."
          .to_string(),
      ),
      OracleError::Malformed { .. } => Some(
        "The run was aborted so no unvalidated decision reaches the manifest. Re-run, or adjust the model.".to_string(),
      ),
      OracleError::Transport { .. } | OracleError::Timeout { .. } => {
        Some("Raise [oracle] timeout_secs / max_retries or lower [oracle] concurrency.".to_string())
      }
    }
  }
}

impl fmt::Display for OracleError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OracleError::NotConfigured { detail } => write!(f, "Classification oracle is not configured: {}", detail),
      OracleError::Malformed {
        record_id,
        subject,
        detail,
      } => write!(
        f,
        "Oracle stage returned a malformed decision for {} ({}): {}",
        short_id(record_id),
        subject,
        detail
      ),
      OracleError::Transport {
        record_id,
        attempts,
        detail,
      } => write!(
        f,
        "Oracle stage failed for {} after {} attempt(s): {}",
        short_id(record_id),
        attempts,
        detail
      ),
      OracleError::Timeout { record_id, attempts } => write!(
        f,
        "Oracle stage timed out for {} after {} attempt(s)",
        short_id(record_id),
        attempts
      ),
    }
  }
}

/// Review manifest errors
#[derive(Debug)]
pub enum ManifestError {
  /// Manifest file does not exist
  NotFound { path: PathBuf },

  /// Manifest file is not valid manifest JSON
  Parse { path: PathBuf, detail: String },
}

impl ManifestError {
  fn help_message(&self) -> Option<String> {
    match self {
      ManifestError::NotFound { .. } => Some("Run `relnotes run --from <ref> --to <ref>` to generate one.".to_string()),
      ManifestError::Parse { .. } => {
        Some("Fix the JSON by hand (keep `metadata` and `entries`), or regenerate it with `relnotes run`.".to_string())
      }
    }
  }
}

impl fmt::Display for ManifestError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ManifestError::NotFound { path } => write!(f, "Review manifest not found: {}", path.display()),
      ManifestError::Parse { path, detail } => {
        write!(f, "Failed to read review manifest {}: {}", path.display(), detail)
      }
    }
  }
}

fn short_id(id: &str) -> &str {
  &id[..12.min(id.len())]
}

/// Result type alias for relnotes
pub type NotesResult<T> = Result<T, NotesError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> NotesResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> NotesResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<NotesError>,
{
  fn context(self, ctx: impl Into<String>) -> NotesResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> NotesResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &NotesError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
