use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use std::fmt;
use std::str::FromStr;

use super::{decode_text_enum, UnknownVariant};

/// How much a student is told about a scored attempt. Levels are ordered,
/// each one revealing everything the previous one does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackLevel {
    Nothing,
    TotalResultOnly,
    PerQuestionResult,
    PerQuestionCorrectness,
    FullFeedback,
}

impl FeedbackLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackLevel::Nothing => "nothing",
            FeedbackLevel::TotalResultOnly => "total_result_only",
            FeedbackLevel::PerQuestionResult => "per_question_result",
            FeedbackLevel::PerQuestionCorrectness => "per_question_correctness",
            FeedbackLevel::FullFeedback => "full_feedback",
        }
    }

    pub fn shows_total(&self) -> bool {
        *self >= FeedbackLevel::TotalResultOnly
    }

    pub fn shows_question_scores(&self) -> bool {
        *self >= FeedbackLevel::PerQuestionResult
    }

    pub fn shows_correctness(&self) -> bool {
        *self >= FeedbackLevel::PerQuestionCorrectness
    }

    pub fn shows_answers(&self) -> bool {
        *self >= FeedbackLevel::FullFeedback
    }
}

impl fmt::Display for FeedbackLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nothing" => Ok(FeedbackLevel::Nothing),
            "total_result_only" => Ok(FeedbackLevel::TotalResultOnly),
            "per_question_result" => Ok(FeedbackLevel::PerQuestionResult),
            "per_question_correctness" => Ok(FeedbackLevel::PerQuestionCorrectness),
            "full_feedback" => Ok(FeedbackLevel::FullFeedback),
            other => Err(UnknownVariant::new("feedback level", other)),
        }
    }
}

/// Per-course test policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    pub course_id: i64,
    pub min_questions: i32,
    pub default_questions: i32,
    pub max_questions: i32,
    pub min_seconds_per_question: i64,
    pub feedback_level: FeedbackLevel,
}

impl TestConfig {
    pub fn accepts_question_count(&self, n: i32) -> bool {
        (self.min_questions..=self.max_questions).contains(&n)
    }
}

impl<'r> FromRow<'r, PgRow> for TestConfig {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            course_id: row.try_get("course_id")?,
            min_questions: row.try_get("min_questions")?,
            default_questions: row.try_get("default_questions")?,
            max_questions: row.try_get("max_questions")?,
            min_seconds_per_question: row.try_get("min_seconds_per_question")?,
            feedback_level: decode_text_enum(row, "feedback_level")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_levels_are_cumulative() {
        assert!(!FeedbackLevel::Nothing.shows_total());
        assert!(FeedbackLevel::TotalResultOnly.shows_total());
        assert!(!FeedbackLevel::TotalResultOnly.shows_question_scores());
        assert!(FeedbackLevel::PerQuestionCorrectness.shows_question_scores());
        assert!(!FeedbackLevel::PerQuestionCorrectness.shows_answers());
        assert!(FeedbackLevel::FullFeedback.shows_correctness());
    }

    #[test]
    fn question_count_bounds_are_inclusive() {
        let config = TestConfig {
            course_id: 1,
            min_questions: 5,
            default_questions: 10,
            max_questions: 20,
            min_seconds_per_question: 0,
            feedback_level: FeedbackLevel::Nothing,
        };
        assert!(config.accepts_question_count(5));
        assert!(config.accepts_question_count(20));
        assert!(!config.accepts_question_count(4));
        assert!(!config.accepts_question_count(21));
    }
}
