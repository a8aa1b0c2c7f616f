use std::fmt;

use crate::services::answers::{AnswerKey, AnswerSheet};

/// Five-point school grade bucket. Stored as its numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(i16)]
pub(crate) enum Grade {
    Unsatisfactory = 2,
    Satisfactory = 3,
    Good = 4,
    Excellent = 5,
}

impl Grade {
    /// Buckets a percentage; each threshold is an inclusive lower bound.
    pub(crate) fn from_percent(percent: f64) -> Self {
        if percent >= 86.0 {
            Grade::Excellent
        } else if percent >= 71.0 {
            Grade::Good
        } else if percent >= 51.0 {
            Grade::Satisfactory
        } else {
            Grade::Unsatisfactory
        }
    }

    pub(crate) fn value(self) -> i16 {
        self as i16
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Grade::Excellent => "A'lo",
            Grade::Good => "Yaxshi",
            Grade::Satisfactory => "Qoniqarli",
            Grade::Unsatisfactory => "Qoniqarsiz",
        }
    }

    pub(crate) fn as_metric_label(self) -> &'static str {
        match self {
            Grade::Excellent => "5",
            Grade::Good => "4",
            Grade::Satisfactory => "3",
            Grade::Unsatisfactory => "2",
        }
    }
}

/// `5 (A'lo)` style label used in replies and exports.
impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value(), self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoreRecord {
    pub(crate) correct: u32,
    pub(crate) wrong: u32,
    pub(crate) percent: f64,
    pub(crate) grade: Grade,
}

/// Scores a submission against a key. Questions missing from the
/// submission count as wrong; extra questions are ignored.
pub(crate) fn grade(key: &AnswerKey, submission: &AnswerSheet) -> ScoreRecord {
    let total = key.len();
    let correct = key
        .sheet()
        .iter()
        .filter(|(question, answer)| submission.get(*question) == Some(*answer))
        .count();

    let percent = round_to_cents(correct as f64 / total as f64 * 100.0);
    let correct = u32::try_from(correct).unwrap_or(u32::MAX);
    let total = u32::try_from(total).unwrap_or(u32::MAX);

    ScoreRecord {
        correct,
        wrong: total.saturating_sub(correct),
        percent,
        grade: Grade::from_percent(percent),
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `75.0`, `33.33`: whole percentages keep one decimal.
pub(crate) fn format_percent(percent: f64) -> String {
    if percent.fract() == 0.0 {
        format!("{percent:.1}")
    } else {
        format!("{percent}")
    }
}
