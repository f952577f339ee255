//! Request id generation and the request-to-response naming rule.
//!
//! Both sides of the queue derive response names from the same
//! [`Correlator`], so the rule only lives here.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use glob::Pattern;

use crate::domain::{
  config::ResponseNaming,
  request::{REQUEST_EXTENSION, RequestId},
};

/// Last timestamp (microseconds) handed out as a request id in this process
static LAST_ID_MICROS: AtomicI64 = AtomicI64::new(0);

const ID_PREFIX: &str = "text_";
const ID_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

#[derive(Debug, Clone, Copy, Default)]
pub struct Correlator {
  naming: ResponseNaming,
}

impl Correlator {
  pub fn new(naming: ResponseNaming) -> Self {
    Self { naming }
  }

  pub fn naming(&self) -> ResponseNaming {
    self.naming
  }

  /// Generate a fresh request id from the current UTC time.
  ///
  /// Ids sort lexicographically in creation order and are strictly
  /// increasing within a process, even for calls in the same microsecond.
  pub fn new_request_id(&self) -> RequestId {
    let micros = next_micros(Utc::now().timestamp_micros());
    let stamp = DateTime::<Utc>::from_timestamp_micros(micros).unwrap_or_else(Utc::now);
    RequestId::new(format!("{}{}", ID_PREFIX, stamp.format(ID_FORMAT)))
  }

  /// Name under which the worker deposits the response for `id`
  pub fn response_file_name(&self, id: &RequestId, processed_at: DateTime<Utc>) -> String {
    match self.naming {
      ResponseNaming::Exact => id.file_name(),
      ResponseNaming::Suffixed => format!("{}_{}.{}", id, processed_at.timestamp(), REQUEST_EXTENSION),
    }
  }

  /// Glob pattern the submitter polls the outbox with for `id`
  pub fn response_pattern(&self, id: &RequestId) -> String {
    match self.naming {
      ResponseNaming::Exact => Pattern::escape(&id.file_name()),
      ResponseNaming::Suffixed => format!("{}_[0-9]*.{}", Pattern::escape(id.as_str()), REQUEST_EXTENSION),
    }
  }

  /// Whether `name` is the response file for `id`.
  ///
  /// The glob cannot pin a suffixed name to digits only, so a response for
  /// an external request like `<id>_7b.txt` still matches the pattern.
  pub fn is_response_for(&self, id: &RequestId, name: &str) -> bool {
    match self.naming {
      ResponseNaming::Exact => name == id.file_name(),
      ResponseNaming::Suffixed => name
        .strip_prefix(id.as_str())
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix(&format!(".{}", REQUEST_EXTENSION)))
        .is_some_and(|secs| !secs.is_empty() && secs.bytes().all(|b| b.is_ascii_digit())),
    }
  }
}

fn next_micros(now: i64) -> i64 {
  let mut last = LAST_ID_MICROS.load(Ordering::Relaxed);
  loop {
    let next = now.max(last + 1);
    match LAST_ID_MICROS.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
      Ok(_) => return next,
      Err(actual) => last = actual,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use std::collections::HashSet;

  #[test]
  fn test_request_id_format() {
    let id = Correlator::default().new_request_id();
    let s = id.as_str();
    assert!(s.starts_with("text_"));
    // text_YYYYMMDD_HHMMSS_ffffff
    assert_eq!(s.len(), "text_".len() + 8 + 1 + 6 + 1 + 6);
    assert!(s["text_".len()..].chars().all(|c| c.is_ascii_digit() || c == '_'));
  }

  #[test]
  fn test_rapid_ids_are_unique_and_ordered() {
    let correlator = Correlator::default();
    let ids: Vec<RequestId> = (0..1000).map(|_| correlator.new_request_id()).collect();

    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());

    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(sorted, ids);
  }

  #[test]
  fn test_ids_unique_across_threads() {
    let handles: Vec<_> = (0..4)
      .map(|_| {
        std::thread::spawn(|| {
          let correlator = Correlator::default();
          (0..250).map(|_| correlator.new_request_id()).collect::<Vec<_>>()
        })
      })
      .collect();

    let mut all = HashSet::new();
    for handle in handles {
      for id in handle.join().unwrap() {
        assert!(all.insert(id));
      }
    }
    assert_eq!(all.len(), 1000);
  }

  #[test]
  fn test_exact_naming() {
    let correlator = Correlator::new(ResponseNaming::Exact);
    let id = RequestId::new("text_20240101_120000_000001");
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 5).unwrap();

    assert_eq!(correlator.response_file_name(&id, at), "text_20240101_120000_000001.txt");
    assert_eq!(correlator.response_pattern(&id), "text_20240101_120000_000001.txt");
  }

  #[test]
  fn test_suffixed_naming() {
    let correlator = Correlator::new(ResponseNaming::Suffixed);
    let id = RequestId::new("text_20240101_120000_000001");
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 5).unwrap();

    let name = correlator.response_file_name(&id, at);
    assert_eq!(name, format!("text_20240101_120000_000001_{}.txt", at.timestamp()));

    let pattern = Pattern::new(&correlator.response_pattern(&id)).unwrap();
    assert!(pattern.matches(&name));
    assert!(!pattern.matches("text_20240101_120000_000002_1704110405.txt"));
    assert!(!pattern.matches("text_20240101_120000_000001.txt"));
  }

  #[test]
  fn test_pattern_escapes_external_names() {
    let correlator = Correlator::new(ResponseNaming::Exact);
    let id = RequestId::new("draft[1]");
    let pattern = Pattern::new(&correlator.response_pattern(&id)).unwrap();
    assert!(pattern.matches("draft[1].txt"));
    assert!(!pattern.matches("draft1.txt"));
  }

  #[test]
  fn test_suffixed_ignores_external_lookalikes() {
    let correlator = Correlator::new(ResponseNaming::Suffixed);
    let id = RequestId::new("draft");

    assert!(correlator.is_response_for(&id, "draft_1704110405.txt"));
    // Response to an externally dropped `draft_foo.txt` / `draft_7b.txt`
    assert!(!correlator.is_response_for(&id, "draft_foo_1704110405.txt"));
    assert!(!correlator.is_response_for(&id, "draft_7b_1704110405.txt"));
    assert!(!correlator.is_response_for(&id, "draft_.txt"));

    let pattern = Pattern::new(&correlator.response_pattern(&id)).unwrap();
    assert!(!pattern.matches("draft_foo_1704110405.txt"));
  }
}
