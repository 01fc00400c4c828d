use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use std::fmt;
use std::str::FromStr;

use super::{decode_text_enum, UnknownVariant};

/// How a question is answered, and therefore how it is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Int,
    Float,
    TrueFalse,
    UniqueChoice,
    MultipleChoice,
    Text,
}

impl AnswerType {
    pub const ALL: [AnswerType; 6] = [
        AnswerType::Int,
        AnswerType::Float,
        AnswerType::TrueFalse,
        AnswerType::UniqueChoice,
        AnswerType::MultipleChoice,
        AnswerType::Text,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerType::Int => "int",
            AnswerType::Float => "float",
            AnswerType::TrueFalse => "true_false",
            AnswerType::UniqueChoice => "unique_choice",
            AnswerType::MultipleChoice => "multiple_choice",
            AnswerType::Text => "text",
        }
    }

    /// Choice questions show their options to the student and may shuffle them.
    pub fn is_choice(&self) -> bool {
        matches!(self, AnswerType::UniqueChoice | AnswerType::MultipleChoice)
    }
}

impl fmt::Display for AnswerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnswerType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("answer type", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub course_id: i64,
    pub answer_type: AnswerType,
    pub stem: String,
    pub feedback: Option<String>,
    pub shuffle: bool,
    pub edited_at: DateTime<Utc>,
    pub num_hits: i64,
    pub num_hits_not_blank: i64,
    pub accumulated_score: f64,
}

impl<'r> FromRow<'r, PgRow> for Question {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            course_id: row.try_get("course_id")?,
            answer_type: decode_text_enum(row, "answer_type")?,
            stem: row.try_get("stem")?,
            feedback: row.try_get("feedback")?,
            shuffle: row.try_get("shuffle")?,
            edited_at: row.try_get("edited_at")?,
            num_hits: row.try_get("num_hits")?,
            num_hits_not_blank: row.try_get("num_hits_not_blank")?,
            accumulated_score: row.try_get("accumulated_score")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnswerOption {
    pub question_id: i64,
    /// Stable ordinal of the option, independent of the order it is displayed in.
    #[sqlx(rename = "option_index")]
    pub index: i32,
    pub text: String,
    pub feedback: Option<String>,
    pub is_correct: bool,
}

/// A question together with everything needed to present and score it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionWithAnswers {
    pub question: Question,
    pub options: Vec<AnswerOption>,
    pub tags: Vec<String>,
}

impl QuestionWithAnswers {
    pub fn option(&self, index: i32) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.index == index)
    }
}

/// Listing row returned by bank searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub id: i64,
    pub answer_type: AnswerType,
    pub stem: String,
    pub shuffle: bool,
    pub edited_at: DateTime<Utc>,
    pub num_hits: i64,
    pub num_hits_not_blank: i64,
    pub accumulated_score: f64,
    pub tags: Vec<String>,
    pub has_hidden_tag: bool,
}

impl QuestionSummary {
    /// Mean score over the answers that were not left blank.
    pub fn average_score(&self) -> Option<f64> {
        (self.num_hits_not_blank > 0)
            .then(|| self.accumulated_score / self.num_hits_not_blank as f64)
    }
}

impl<'r> FromRow<'r, PgRow> for QuestionSummary {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            answer_type: decode_text_enum(row, "answer_type")?,
            stem: row.try_get("stem")?,
            shuffle: row.try_get("shuffle")?,
            edited_at: row.try_get("edited_at")?,
            num_hits: row.try_get("num_hits")?,
            num_hits_not_blank: row.try_get("num_hits_not_blank")?,
            accumulated_score: row.try_get("accumulated_score")?,
            tags: row.try_get("tags")?,
            has_hidden_tag: row.try_get("has_hidden_tag")?,
        })
    }
}
