use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format hint shown whenever an answer string cannot be understood.
pub(crate) const ANSWER_FORMAT_EXAMPLE: &str = "1a2b3c4d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ParseFailure {
    #[error("no `<number><letter>` answer found in input")]
    NoAnswers,
    /// More digits than a question number can hold (above `u64::MAX`).
    #[error("question number {0} is too large")]
    QuestionOutOfRange(String),
}

/// Question number to answer letter, as typed by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AnswerEntry>", into = "Vec<AnswerEntry>")]
pub(crate) struct AnswerSheet(BTreeMap<u64, char>);

/// Stored form of a single answer: `{"question": 1, "answer": "a"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AnswerEntry {
    pub(crate) question: u64,
    pub(crate) answer: char,
}

/// An answer sheet that is known to contain at least one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AnswerSheet", into = "AnswerSheet")]
pub(crate) struct AnswerKey(AnswerSheet);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("answer key must contain at least one question")]
pub(crate) struct EmptyAnswerKey;

impl AnswerSheet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, question: u64, answer: char) {
        self.0.insert(question, answer);
    }

    pub(crate) fn get(&self, question: u64) -> Option<char> {
        self.0.get(&question).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u64, char)> + '_ {
        self.0.iter().map(|(question, answer)| (*question, *answer))
    }

    /// Compact `1a2b3c` rendering used in replies and exports.
    pub(crate) fn compact(&self) -> String {
        self.iter().map(|(question, answer)| format!("{question}{answer}")).collect()
    }
}

impl FromIterator<(u64, char)> for AnswerSheet {
    fn from_iter<I: IntoIterator<Item = (u64, char)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<AnswerEntry>> for AnswerSheet {
    fn from(entries: Vec<AnswerEntry>) -> Self {
        entries.into_iter().map(|entry| (entry.question, entry.answer)).collect()
    }
}

impl From<AnswerSheet> for Vec<AnswerEntry> {
    fn from(sheet: AnswerSheet) -> Self {
        sheet.iter().map(|(question, answer)| AnswerEntry { question, answer }).collect()
    }
}

impl AnswerKey {
    pub(crate) fn sheet(&self) -> &AnswerSheet {
        &self.0
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

impl TryFrom<AnswerSheet> for AnswerKey {
    type Error = EmptyAnswerKey;

    fn try_from(sheet: AnswerSheet) -> Result<Self, Self::Error> {
        if sheet.is_empty() {
            return Err(EmptyAnswerKey);
        }
        Ok(Self(sheet))
    }
}

impl From<AnswerKey> for AnswerSheet {
    fn from(key: AnswerKey) -> Self {
        key.0
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([0-9]+)([a-z])").expect("answer token pattern is valid"))
}

/// Parses free text such as `"1A 2b\n3c"` into an answer sheet.
///
/// Whitespace is dropped and letters are lower-cased before scanning for
/// `<digits><letter>` tokens left to right. Anything between tokens is
/// ignored and a repeated question keeps its last answer. Fails when no
/// token is found, or when a question number does not fit in a `u64`.
pub(crate) fn parse_answers(raw: &str) -> Result<AnswerSheet, ParseFailure> {
    let normalized: String =
        raw.chars().filter(|ch| !ch.is_whitespace()).flat_map(char::to_lowercase).collect();

    let mut sheet = AnswerSheet::new();
    for captures in token_pattern().captures_iter(&normalized) {
        let digits = &captures[1];
        let question = digits
            .parse::<u64>()
            .map_err(|_| ParseFailure::QuestionOutOfRange(digits.to_string()))?;
        let Some(answer) = captures[2].chars().next() else {
            continue;
        };
        sheet.insert(question, answer);
    }

    if sheet.is_empty() {
        return Err(ParseFailure::NoAnswers);
    }
    Ok(sheet)
}

/// Parses a teacher-supplied answer key. Never empty on success.
pub(crate) fn parse_answer_key(raw: &str) -> Result<AnswerKey, ParseFailure> {
    let sheet = parse_answers(raw)?;
    AnswerKey::try_from(sheet).map_err(|_| ParseFailure::NoAnswers)
}
