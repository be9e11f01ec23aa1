pub mod system_git;
mod system_git_ops;

pub use system_git::SystemGit;

/// Information about a commit as harvested from `git log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
  pub sha: String,
  pub author: String,
  pub author_email: String,
  /// Strict ISO-8601 author date (`%aI`)
  pub author_date: String,
  pub subject: String,
  pub body: String,
}
