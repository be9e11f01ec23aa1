//! Conventional commit header detection
//!
//! Only the subject line is parsed: `type(scope)!: description`.
//! Uses winnow for parsing (not regex) so the grammar stays explicit.

use crate::model::Category;

/// Parsed `type(scope)!: description` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalHeader<'a> {
  /// Lower-cased type token
  pub kind: String,
  pub scope: Option<&'a str>,
  pub breaking: bool,
  pub description: &'a str,
}

impl<'a> ConventionalHeader<'a> {
  /// Parse a subject line, `None` when it does not follow the convention
  ///
  /// The colon must be followed by whitespace, so `fix:typo` and URLs like
  /// `http://...` are not headers.
  pub fn parse(subject: &'a str) -> Option<Self> {
    use winnow::ascii::{alpha1, space1};
    use winnow::combinator::{opt, preceded, terminated};
    use winnow::prelude::*;
    use winnow::token::{rest, take_till};

    let mut parser = (
      alpha1::<_, ()>,
      opt(preceded('(', terminated(take_till(1.., ')'), ')'))),
      opt('!'),
      ':',
      space1,
      rest,
    );

    let (kind, scope, bang, _, _, description) = parser.parse(subject.trim()).ok()?;

    Some(Self {
      kind: kind.to_ascii_lowercase(),
      scope,
      breaking: bang.is_some(),
      description: description.trim(),
    })
  }

  /// Category implied by the type token, if it is a user-facing one
  pub fn category(&self) -> Option<Category> {
    category_for_type(&self.kind)
  }
}

/// Map a conventional type to a publication category
pub fn category_for_type(kind: &str) -> Option<Category> {
  match kind {
    "feat" => Some(Category::Feature),
    "fix" => Some(Category::Bugfix),
    _ => None,
  }
}

/// Whether the type token hints at a feature or a fix (`feat`, `hotfix`, `bugfix`...)
///
/// Looser than `category_for_type`: used only to keep such commits from being
/// excluded on body wording alone.
pub fn looks_user_facing(kind: Option<&str>) -> bool {
  kind.is_some_and(|k| k.contains("feat") || k.contains("fix"))
}

/// Types whose prefix is dropped when a subject stands in for a missing title
const STRIPPABLE_TYPES: &[&str] = &["feat", "fix", "chore", "refactor", "misc", "ci", "test", "build"];

/// Turn a subject into a reader-facing title by dropping a well-known type prefix
///
/// Looser than `ConventionalHeader::parse`: `fix:typo` loses its prefix too.
/// Unknown prefixes are kept, since they may be meaningful text.
pub fn strip_type_prefix(subject: &str) -> &str {
  use winnow::ascii::alpha1;
  use winnow::combinator::{opt, preceded, terminated};
  use winnow::prelude::*;
  use winnow::token::{rest, take_till};

  let trimmed = subject.trim();
  let mut prefix = (
    alpha1::<_, ()>,
    opt(preceded('(', terminated(take_till(0.., ')'), ')'))),
    opt('!'),
    ':',
    rest,
  );

  match prefix.parse(trimmed) {
    Ok((kind, _, _, _, description))
      if STRIPPABLE_TYPES.contains(&kind.to_ascii_lowercase().as_str()) && !description.trim().is_empty() =>
    {
      description.trim()
    }
    _ => trimmed,
  }
}
