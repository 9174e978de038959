use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, de};
use sha2::{Digest, Sha256};

/// Lookup key of a quiz question/answer pair (hex SHA-256 of both).
pub fn content_hash(question: &str, answer: &str) -> String {
  let digest =
    Sha256::new().chain_update(question).chain_update(answer).finalize();
  format!("{digest:x}")
}

pub const LIKE_ESCAPE: char = '!';

/// Builds a `%needle%` pattern matching `needle` literally.
pub fn contains_pattern(needle: &str) -> String {
  let mut pattern = String::with_capacity(needle.len() + 2);
  pattern.push('%');
  for ch in needle.chars() {
    if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
      pattern.push(LIKE_ESCAPE);
    }
    pattern.push(ch);
  }
  pattern.push('%');
  pattern
}

/// Query filter value where `?key=` counts as not given.
pub fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: FromStr,
  T::Err: fmt::Display,
{
  match Option::<String>::deserialize(deserializer)?.as_deref() {
    None | Some("") => Ok(None),
    Some(raw) => raw.parse().map(Some).map_err(de::Error::custom),
  }
}
