use crate::models::question::AnswerType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOptionPayload {
    pub text: String,
    pub feedback: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
}

/// Question content as produced by the authoring workflow.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionPayload {
    pub answer_type: AnswerType,
    #[validate(length(min = 1, message = "Question stem cannot be empty"))]
    pub stem: String,
    pub feedback: Option<String>,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(length(min = 1, message = "At least one answer is required"))]
    pub options: Vec<AnswerOptionPayload>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionOrder {
    #[default]
    EditedAt,
    Stem,
    NumHits,
    AverageScore,
}

/// Bank search. `None` selects everything; an empty list selects nothing and is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionSearchRequest {
    pub tag_ids: Option<Vec<i64>>,
    pub answer_types: Option<Vec<AnswerType>>,
    pub edited_from: Option<DateTime<Utc>>,
    pub edited_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub order: QuestionOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTagPayload {
    pub hidden: bool,
}

/// Query string of the bank listing. Each filter narrows to a single value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionListQuery {
    pub tag_id: Option<i64>,
    pub answer_type: Option<AnswerType>,
    #[serde(default)]
    pub order: QuestionOrder,
}
