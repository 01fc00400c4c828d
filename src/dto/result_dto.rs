use crate::models::question::AnswerType;
use crate::models::test_attempt::TestAttempt;
use crate::models::test_config::FeedbackLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub id: i64,
    pub user_id: Uuid,
    pub attempt_number: i32,
    pub created_at: DateTime<Utc>,
    pub num_questions: i32,
    pub num_questions_not_blank: Option<i32>,
    /// Omitted when the viewer's feedback level hides totals.
    pub score: Option<f64>,
    pub visible_to_teachers: bool,
}

impl AttemptSummary {
    pub fn from_attempt(attempt: &TestAttempt, level: FeedbackLevel) -> Self {
        Self {
            id: attempt.id,
            user_id: attempt.user_id,
            attempt_number: attempt.attempt_number,
            created_at: attempt.created_at,
            num_questions: attempt.num_questions,
            num_questions_not_blank: attempt.num_questions_not_blank,
            score: attempt.score.filter(|_| level.shows_total()),
            visible_to_teachers: attempt.visible_to_teachers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Available,
    /// Edited after the attempt; its current content is not what was answered.
    Modified,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correctness {
    Correct,
    PartiallyCorrect,
    Incorrect,
    Blank,
}

impl Correctness {
    pub fn from_score(score: f64, is_blank: bool) -> Self {
        if is_blank {
            Correctness::Blank
        } else if score >= 1.0 {
            Correctness::Correct
        } else if score > 0.0 {
            Correctness::PartiallyCorrect
        } else {
            Correctness::Incorrect
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewedOption {
    pub index: i32,
    pub text: String,
    pub is_correct: Option<bool>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewedQuestion {
    pub answer_type: AnswerType,
    pub stem: String,
    pub feedback: Option<String>,
    pub tags: Vec<String>,
    pub options: Vec<ReviewedOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_id: i64,
    pub order_index: i32,
    pub state: ReviewState,
    pub score: Option<f64>,
    pub correctness: Option<Correctness>,
    pub chosen_indexes: Vec<i32>,
    pub chosen_text: Option<String>,
    pub content: Option<ReviewedQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReview {
    pub attempt: AttemptSummary,
    pub feedback_level: FeedbackLevel,
    pub questions: Vec<QuestionReview>,
}
