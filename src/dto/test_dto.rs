use crate::models::question::AnswerType;
use crate::services::scoring_service::Submission;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateTestRequest {
    /// `None` draws from every tag.
    pub tag_ids: Option<Vec<i64>>,
    /// `None` draws every answer type.
    pub answer_types: Option<Vec<AnswerType>>,
    /// Falls back to the course default.
    pub num_questions: Option<i32>,
}

/// An option as displayed: `position` is where it is shown, `index` is what must be sent back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayedOption {
    pub index: i32,
    pub position: usize,
    pub text: String,
}

/// A question as handed to the student. Never carries correctness data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionForAttempt {
    pub question_id: i64,
    pub answer_type: AnswerType,
    pub stem: String,
    pub options: Vec<DisplayedOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedTestResponse {
    pub course_id: i64,
    pub attempt_number: i32,
    pub num_questions: usize,
    pub questions: Vec<QuestionForAttempt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    #[serde(flatten)]
    pub submission: Submission,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitTestRequest {
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
    #[serde(default)]
    pub visible_to_teachers: bool,
}
