//! Whitespace trimming helpers shared with the test harness.
//!
//! The end-to-end suite compares whole listings for equality after removing
//! leading and trailing whitespace from both sides, so the exact trimming
//! semantics (space, tab, CR, LF only) are part of the crate's contract.

fn is_trimmed(c: char) -> bool {
  matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Remove leading and trailing ASCII whitespace in place.
pub fn trim(s: &mut String) {
  let end = s.trim_end_matches(is_trimmed).len();
  s.truncate(end);
  let start = s.len() - s.trim_start_matches(is_trimmed).len();
  s.drain(..start);
}

/// Non-mutating variant of [`trim`].
pub fn trim_copy(s: &str) -> String {
  s.trim_matches(is_trimmed).to_string()
}
