use crate::models::test_config::FeedbackLevel;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TestConfigPayload {
    #[validate(range(min = 1, message = "Minimum number of questions must be at least 1"))]
    pub min_questions: i32,
    #[validate(range(min = 1))]
    pub default_questions: i32,
    #[validate(range(min = 1))]
    pub max_questions: i32,
    #[validate(range(min = 0, message = "Pacing interval cannot be negative"))]
    pub min_seconds_per_question: i64,
    pub feedback_level: FeedbackLevel,
}
