//! Request identifiers shared by the submitter and the worker.

use serde::Serialize;

/// File extension carried by every request and response file
pub const REQUEST_EXTENSION: &str = "txt";

/// Identifier of a queued request.
///
/// The identifier is the request file's stem. Requests created by the
/// submitter look like `text_20240101_120000_123456`, but any `*.txt` file
/// dropped into the inbox is a valid request whose id is its stem.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  /// Derive the id from a request file name (`<id>.txt`).
  ///
  /// Returns `None` for names without the request extension, hidden files
  /// (in-progress temp files) and empty stems.
  pub fn from_file_name(name: &str) -> Option<Self> {
    if name.starts_with('.') {
      return None;
    }
    let stem = name.strip_suffix(REQUEST_EXTENSION)?.strip_suffix('.')?;
    if stem.is_empty() {
      return None;
    }
    Some(Self(stem.to_string()))
  }

  /// File name of the request carrying this id
  pub fn file_name(&self) -> String {
    format!("{}.{}", self.0, REQUEST_EXTENSION)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for RequestId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<String> for RequestId {
  fn from(s: String) -> Self {
    Self(s)
  }
}

impl From<&str> for RequestId {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_file_name() {
    let id = RequestId::from_file_name("text_20240101_120000_000001.txt").unwrap();
    assert_eq!(id.as_str(), "text_20240101_120000_000001");
    assert_eq!(id.file_name(), "text_20240101_120000_000001.txt");
  }

  #[test]
  fn test_from_file_name_rejects_non_requests() {
    assert!(RequestId::from_file_name("notes.md").is_none());
    assert!(RequestId::from_file_name(".txt").is_none());
    assert!(RequestId::from_file_name(".quill-abc.tmp").is_none());
    assert!(RequestId::from_file_name(".hidden.txt").is_none());
    assert!(RequestId::from_file_name("txt").is_none());
  }

  #[test]
  fn test_external_names_are_accepted() {
    let id = RequestId::from_file_name("my draft.txt").unwrap();
    assert_eq!(id.to_string(), "my draft");
  }
}
