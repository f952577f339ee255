use std::collections::HashSet;

use crate::domain::request::RequestId;

/// Request ids this worker has already claimed.
///
/// Lives only as long as the worker; a restarted worker starts empty.
#[derive(Debug, Default)]
pub struct ProcessedSet {
  ids: HashSet<RequestId>,
}

impl ProcessedSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Mark `id` processed. Returns false if it already was.
  pub fn insert(&mut self, id: RequestId) -> bool {
    self.ids.insert(id)
  }

  pub fn contains(&self, id: &RequestId) -> bool {
    self.ids.contains(id)
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }
}
