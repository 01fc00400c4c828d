use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestAttempt {
    pub id: i64,
    pub course_id: i64,
    pub user_id: Uuid,
    pub attempt_number: i32,
    /// When the test was shown; question edits after this instant invalidate the review.
    pub created_at: DateTime<Utc>,
    pub num_questions: i32,
    pub num_questions_not_blank: Option<i32>,
    pub score: Option<f64>,
    pub visible_to_teachers: bool,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl TestAttempt {
    pub fn is_finalized(&self) -> bool {
        self.finalized_at.is_some()
    }
}

/// One answered question of an attempt, stored in presentation order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestAttemptQuestion {
    pub attempt_id: i64,
    pub question_id: i64,
    pub order_index: i32,
    pub chosen_indexes: Vec<i32>,
    pub chosen_text: Option<String>,
    pub is_blank: bool,
    pub score: f64,
}
