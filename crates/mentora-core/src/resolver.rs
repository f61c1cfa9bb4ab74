//! Answer normalization for multiple-choice questions.
//!
//! Quiz questions store their correct answer as a canonical option index,
//! decided once when the quiz is saved. Answers arriving from outside (the
//! generator's `correctAnswer`, a user's selection, quizzes saved by older
//! versions) can still be a zero- or one-based number, an `O2`-style code or
//! the option text itself. [`resolve_index`] is the single compatibility shim
//! that maps all of those onto an option index; nothing else should parse
//! raw answers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::LazyLock;

use regex::Regex;

/// Wire value for an answer that matched no option.
pub const UNRESOLVED: i64 = -1;

static OPTION_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^o([0-9]+)$").expect("valid option code pattern"));
static EMBEDDED_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid number pattern"));

/// A raw answer as submitted or generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Index(i64),
    Text(String),
    /// Anything else (null, fractional numbers, ...). Never resolves.
    Other(serde_json::Value),
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        AnswerValue::Index(value)
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

/// Option index that serializes as `-1` when unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedIndex(pub Option<usize>);

impl ResolvedIndex {
    pub fn get(self) -> Option<usize> {
        self.0
    }

    pub fn to_wire(self) -> i64 {
        self.0.map_or(UNRESOLVED, |i| i as i64)
    }
}

impl From<Option<usize>> for ResolvedIndex {
    fn from(value: Option<usize>) -> Self {
        ResolvedIndex(value)
    }
}

impl Serialize for ResolvedIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.to_wire())
    }
}

impl<'de> Deserialize<'de> for ResolvedIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(ResolvedIndex(usize::try_from(raw).ok()))
    }
}

fn one_based(number: &str, len: usize) -> Option<usize> {
    let n: usize = number.parse().ok()?;
    let idx = n.checked_sub(1)?;
    (idx < len).then_some(idx)
}

/// Map a raw answer onto a zero-based option index.
///
/// Rules, first match wins: in-range number (zero-based, then one-based),
/// `O<n>` code (one-based), exact option text, case-insensitive option text,
/// first number embedded in the text (one-based).
pub fn resolve_index(value: &AnswerValue, options: &[String]) -> Option<usize> {
    let len = options.len();
    match value {
        AnswerValue::Index(n) => {
            let n = *n;
            if let Ok(idx) = usize::try_from(n) {
                if idx < len {
                    return Some(idx);
                }
            }
            n.checked_sub(1)
                .and_then(|m| usize::try_from(m).ok())
                .filter(|&idx| idx < len)
        }
        AnswerValue::Text(text) => {
            let trimmed = text.trim();

            if let Some(caps) = OPTION_CODE.captures(trimmed) {
                if let Some(idx) = one_based(&caps[1], len) {
                    return Some(idx);
                }
            }

            if let Some(idx) = options.iter().position(|opt| opt == trimmed) {
                return Some(idx);
            }

            let lowered = trimmed.to_lowercase();
            if let Some(idx) = options
                .iter()
                .position(|opt| opt.trim().to_lowercase() == lowered)
            {
                return Some(idx);
            }

            EMBEDDED_NUMBER
                .find(trimmed)
                .and_then(|m| one_based(m.as_str(), len))
        }
        AnswerValue::Other(_) => None,
    }
}
