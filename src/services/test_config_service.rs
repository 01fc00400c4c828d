use crate::config::TestDefaults;
use crate::dto::test_config_dto::TestConfigPayload;
use crate::error::{Error, Result};
use crate::models::test_config::TestConfig;
use sqlx::PgPool;
use validator::Validate;

#[derive(Clone)]
pub struct TestConfigService {
    pool: PgPool,
    defaults: TestDefaults,
}

impl TestConfigService {
    pub fn new(pool: PgPool, defaults: TestDefaults) -> Self {
        Self { pool, defaults }
    }

    fn default_for(&self, course_id: i64) -> TestConfig {
        TestConfig {
            course_id,
            min_questions: self.defaults.min_questions,
            default_questions: self.defaults.default_questions,
            max_questions: self.defaults.max_questions,
            min_seconds_per_question: self.defaults.min_seconds_per_question,
            feedback_level: self.defaults.feedback_level,
        }
    }

    /// The course policy, or the configured defaults when the course has none.
    pub async fn get(&self, course_id: i64) -> Result<TestConfig> {
        let stored = sqlx::query_as::<_, TestConfig>(
            r#"
            SELECT course_id, min_questions, default_questions, max_questions,
                   min_seconds_per_question, feedback_level
            FROM test_configs WHERE course_id = $1
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stored.unwrap_or_else(|| self.default_for(course_id)))
    }

    pub async fn upsert(&self, course_id: i64, payload: TestConfigPayload) -> Result<TestConfig> {
        payload.validate()?;
        validate_bounds(&payload)?;

        let config = sqlx::query_as::<_, TestConfig>(
            r#"
            INSERT INTO test_configs (
                course_id, min_questions, default_questions, max_questions,
                min_seconds_per_question, feedback_level
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (course_id) DO UPDATE SET
                min_questions = EXCLUDED.min_questions,
                default_questions = EXCLUDED.default_questions,
                max_questions = EXCLUDED.max_questions,
                min_seconds_per_question = EXCLUDED.min_seconds_per_question,
                feedback_level = EXCLUDED.feedback_level,
                updated_at = NOW()
            RETURNING course_id, min_questions, default_questions, max_questions,
                      min_seconds_per_question, feedback_level
            "#,
        )
        .bind(course_id)
        .bind(payload.min_questions)
        .bind(payload.default_questions)
        .bind(payload.max_questions)
        .bind(payload.min_seconds_per_question)
        .bind(payload.feedback_level.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            course_id,
            min = config.min_questions,
            max = config.max_questions,
            feedback = %config.feedback_level,
            "Test configuration saved"
        );
        Ok(config)
    }
}

fn validate_bounds(payload: &TestConfigPayload) -> Result<()> {
    if payload.min_questions > payload.default_questions
        || payload.default_questions > payload.max_questions
    {
        return Err(Error::InvalidRequest(format!(
            "Question counts must satisfy minimum <= default <= maximum (got {} / {} / {})",
            payload.min_questions, payload.default_questions, payload.max_questions
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_config::FeedbackLevel;

    fn payload(min: i32, default: i32, max: i32) -> TestConfigPayload {
        TestConfigPayload {
            min_questions: min,
            default_questions: default,
            max_questions: max,
            min_seconds_per_question: 30,
            feedback_level: FeedbackLevel::FullFeedback,
        }
    }

    #[test]
    fn bounds_must_be_ordered() {
        assert!(validate_bounds(&payload(1, 10, 20)).is_ok());
        assert!(validate_bounds(&payload(5, 5, 5)).is_ok());
        assert!(validate_bounds(&payload(10, 5, 20)).is_err());
        assert!(validate_bounds(&payload(1, 30, 20)).is_err());
    }

    #[test]
    fn negative_pacing_is_rejected_by_validation() {
        let mut p = payload(1, 2, 3);
        p.min_seconds_per_question = -1;
        assert!(p.validate().is_err());
    }
}
