//! Helpers for telling local checkouts from remote sources

use std::path::Path;

/// Check if a source identifier names a local checkout rather than a clonable URL
///
/// Local:
/// - `.` and `..`, `./repo`, `../repo`
/// - Absolute paths: /srv/repo, C:\repo, C:/repo
/// - Any bare name that exists on disk
///
/// Remote:
/// - `https://github.com/owner/repo(.git)`
/// - `git@github.com:owner/repo.git`, `ssh://...`, `file://...`
pub fn is_local_source(source: &str) -> bool {
  if source.is_empty() {
    return false;
  }

  if source == "." || source == ".." || source.starts_with("./") || source.starts_with("../") {
    return true;
  }

  if source.contains("://") {
    return false;
  }

  // Windows drive letter (C:\ or C:/); checked before the scp-style test since it has ':'
  let bytes = source.as_bytes();
  if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && (bytes[2] == b'\\' || bytes[2] == b'/') {
    return true;
  }

  // scp-style ssh: user@host:path
  if source.contains('@') && source.contains(':') {
    return false;
  }

  source.starts_with('/') || Path::new(source).exists()
}

/// Directory name used for a cached clone of `url`
///
/// `https://github.com/getlago/lago` becomes `github.com_getlago_lago`. Scheme
/// and ssh user are dropped; each run of characters outside `[A-Za-z0-9._-]` becomes one `_`.
pub fn cache_dir_name(url: &str) -> String {
  let trimmed = url.trim().trim_end_matches('/');
  let without_scheme = trimmed.split_once("://").map_or(trimmed, |(_, rest)| rest);
  let without_user = without_scheme.strip_prefix("git@").unwrap_or(without_scheme);

  let mut name = String::with_capacity(without_user.len());
  for c in without_user.chars() {
    if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
      name.push(c);
    } else if !name.ends_with('_') {
      name.push('_');
    }
  }

  if name.is_empty() { "source".to_string() } else { name }
}

/// Commit page URL for GitHub-hosted sources; `None` for anything else
pub fn github_commit_url(source: &str, sha: &str) -> Option<String> {
  let rest = source
    .trim()
    .strip_prefix("https://github.com/")
    .or_else(|| source.trim().strip_prefix("http://github.com/"))
    .or_else(|| source.trim().strip_prefix("git@github.com:"))?;

  let rest = rest.trim_end_matches('/');
  let rest = rest.strip_suffix(".git").unwrap_or(rest);
  let mut parts = rest.split('/');
  let owner = parts.next().filter(|s| !s.is_empty())?;
  let repo = parts.next().filter(|s| !s.is_empty())?;

  Some(format!("https://github.com/{}/{}/commit/{}", owner, repo, sha))
}
