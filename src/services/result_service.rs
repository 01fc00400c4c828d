use crate::context::RequestContext;
use crate::dto::result_dto::{
    AttemptReview, AttemptSummary, Correctness, QuestionReview, ReviewState, ReviewedOption,
    ReviewedQuestion,
};
use crate::error::{is_unique_violation, Error, Result};
use crate::models::attempt_status::{AttemptStatus, AttemptStatusRecord, StatusKey};
use crate::models::question::QuestionWithAnswers;
use crate::models::test_attempt::{TestAttempt, TestAttemptQuestion};
use crate::models::test_config::{FeedbackLevel, TestConfig};
use crate::models::user::Role;
use crate::services::question_bank_service::QuestionBankService;
use crate::services::scoring_service::{ScoredAnswer, Submission};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const ATTEMPT_COLUMNS: &str = "id, course_id, user_id, attempt_number, created_at, num_questions, \
     num_questions_not_blank, score, visible_to_teachers, finalized_at";

const STATUS_COLUMNS: &str =
    "session_id, course_id, attempt_number, user_id, question_ids, status, created_at, expires_at";

/// Students see what the course policy allows; everybody else sees everything.
pub fn effective_feedback_level(role: Role, config: &TestConfig) -> FeedbackLevel {
    if role.is_privileged() {
        FeedbackLevel::FullFeedback
    } else {
        config.feedback_level
    }
}

/// Owners always see their attempts; teachers see the ones shared with them; admins see all.
pub fn can_view(ctx: &RequestContext, attempt: &TestAttempt) -> bool {
    match ctx.role {
        Role::SysAdmin => true,
        Role::Teacher | Role::NonEditingTeacher => {
            attempt.user_id == ctx.user_id || attempt.visible_to_teachers
        }
        Role::Student => attempt.user_id == ctx.user_id,
        Role::Other => false,
    }
}

pub fn review_question(
    question: Option<&QuestionWithAnswers>,
    attempt_created_at: DateTime<Utc>,
    row: &TestAttemptQuestion,
    level: FeedbackLevel,
) -> QuestionReview {
    let state = match question {
        None => ReviewState::Deleted,
        Some(q) if q.question.edited_at > attempt_created_at => ReviewState::Modified,
        Some(_) => ReviewState::Available,
    };

    let content = question
        .filter(|_| state == ReviewState::Available && level.shows_question_scores())
        .map(|q| ReviewedQuestion {
            answer_type: q.question.answer_type,
            stem: q.question.stem.clone(),
            feedback: q.question.feedback.clone().filter(|_| level.shows_answers()),
            tags: q.tags.clone(),
            // Options of open questions are the stored answers.
            options: q
                .options
                .iter()
                .filter(|_| q.question.answer_type.is_choice() || level.shows_answers())
                .map(|o| ReviewedOption {
                    index: o.index,
                    text: o.text.clone(),
                    is_correct: level.shows_answers().then_some(o.is_correct),
                    feedback: o.feedback.clone().filter(|_| level.shows_answers()),
                })
                .collect(),
        });

    QuestionReview {
        question_id: row.question_id,
        order_index: row.order_index,
        state,
        score: level.shows_question_scores().then_some(row.score),
        correctness: level
            .shows_correctness()
            .then(|| Correctness::from_score(row.score, row.is_blank)),
        chosen_indexes: row.chosen_indexes.clone(),
        chosen_text: row.chosen_text.clone(),
        content,
    }
}

#[derive(Clone)]
pub struct ResultService {
    pool: PgPool,
}

impl ResultService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One past the highest attempt the user has in the course, counting tests
    /// still shown in this session so that two open tests never share a number.
    pub async fn next_attempt_number(
        conn: &mut PgConnection,
        course_id: i64,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<i32> {
        let highest: i32 = sqlx::query_scalar(
            r#"
            SELECT GREATEST(
                (SELECT COUNT(*)::INT FROM test_attempts
                 WHERE course_id = $1 AND user_id = $2),
                (SELECT COALESCE(MAX(attempt_number), 0) FROM test_attempts
                 WHERE course_id = $1 AND user_id = $2),
                (SELECT COALESCE(MAX(attempt_number), 0) FROM attempt_statuses
                 WHERE course_id = $1 AND user_id = $2 AND session_id = $3
                   AND status = 'shown')
            )
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(highest + 1)
    }

    /// Records a generated test as shown. Only a key left in `error` may be reused.
    pub async fn create_status(
        conn: &mut PgConnection,
        key: &StatusKey,
        user_id: Uuid,
        question_ids: &[i64],
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<AttemptStatusRecord> {
        let sql = format!(
            r#"
            INSERT INTO attempt_statuses
                (session_id, course_id, attempt_number, user_id, question_ids, status,
                 created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, 'shown', $6, $7)
            ON CONFLICT (session_id, course_id, attempt_number) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                question_ids = EXCLUDED.question_ids,
                status = 'shown',
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            WHERE attempt_statuses.status = 'error'
            RETURNING {STATUS_COLUMNS}
            "#
        );
        let record = sqlx::query_as::<_, AttemptStatusRecord>(&sql)
            .bind(&key.session_id)
            .bind(key.course_id)
            .bind(key.attempt_number)
            .bind(user_id)
            .bind(question_ids)
            .bind(created_at)
            .bind(expires_at)
            .fetch_optional(&mut *conn)
            .await?;

        record.ok_or_else(|| {
            Error::IllegalStateTransition(format!(
                "Test {} of course {} is already in progress",
                key.attempt_number, key.course_id
            ))
        })
    }

    pub async fn get_status(&self, key: &StatusKey) -> Result<Option<AttemptStatusRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_status(&mut conn, key).await
    }

    async fn fetch_status(
        conn: &mut PgConnection,
        key: &StatusKey,
    ) -> Result<Option<AttemptStatusRecord>> {
        let sql = format!(
            "SELECT {STATUS_COLUMNS} FROM attempt_statuses \
             WHERE session_id = $1 AND course_id = $2 AND attempt_number = $3"
        );
        let record = sqlx::query_as::<_, AttemptStatusRecord>(&sql)
            .bind(&key.session_id)
            .bind(key.course_id)
            .bind(key.attempt_number)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(record)
    }

    /// Moves a shown test to `assessed`. Exactly one concurrent caller can win.
    pub async fn mark_assessed(
        conn: &mut PgConnection,
        key: &StatusKey,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AttemptStatusRecord> {
        let sql = format!(
            r#"
            UPDATE attempt_statuses SET status = 'assessed'
            WHERE session_id = $1 AND course_id = $2 AND attempt_number = $3
              AND user_id = $4 AND status = 'shown' AND expires_at > $5
            RETURNING {STATUS_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, AttemptStatusRecord>(&sql)
            .bind(&key.session_id)
            .bind(key.course_id)
            .bind(key.attempt_number)
            .bind(user_id)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(record) = updated {
            return Ok(record);
        }

        match Self::fetch_status(conn, key).await? {
            Some(existing) if existing.user_id == user_id => {
                if existing.status == AttemptStatus::Shown {
                    Err(Error::IllegalStateTransition(format!(
                        "Test {} has expired",
                        key.attempt_number
                    )))
                } else {
                    Err(Error::IllegalStateTransition(format!(
                        "Test {} is already {}",
                        key.attempt_number, existing.status
                    )))
                }
            }
            _ => Err(Error::NotFound(format!(
                "No test {} was shown in this session",
                key.attempt_number
            ))),
        }
    }

    pub async fn mark_error(&self, key: &StatusKey) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE attempt_statuses SET status = 'error'
            WHERE session_id = $1 AND course_id = $2 AND attempt_number = $3
              AND status = 'shown'
            "#,
        )
        .bind(&key.session_id)
        .bind(key.course_id)
        .bind(key.attempt_number)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn prune_expired_statuses(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM attempt_statuses WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn begin_attempt(
        conn: &mut PgConnection,
        course_id: i64,
        user_id: Uuid,
        attempt_number: i32,
        num_questions: i32,
        visible_to_teachers: bool,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO test_attempts
                (course_id, user_id, attempt_number, created_at, num_questions, visible_to_teachers)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .bind(attempt_number)
        .bind(created_at)
        .bind(num_questions)
        .bind(visible_to_teachers)
        .fetch_one(&mut *conn)
        .await?;
        Ok(id)
    }

    pub async fn record_question_result(
        conn: &mut PgConnection,
        attempt_id: i64,
        question_id: i64,
        order_index: i32,
        submission: &Submission,
        scored: &ScoredAnswer,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO test_attempt_questions
                (attempt_id, question_id, order_index, chosen_indexes, chosen_text, is_blank, score)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(attempt_id)
        .bind(question_id)
        .bind(order_index)
        .bind(&submission.chosen_indexes)
        .bind(submission.text.as_deref())
        .bind(scored.is_blank)
        .bind(scored.score)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::IllegalStateTransition(format!(
                    "Question {} is already recorded for attempt {}",
                    question_id, attempt_id
                ))
            } else {
                Error::from(e)
            }
        })?;
        Ok(())
    }

    /// Stores the aggregates once. A second call changes nothing and fails.
    pub async fn finalize(
        conn: &mut PgConnection,
        attempt_id: i64,
        num_questions_not_blank: i32,
        score: f64,
        now: DateTime<Utc>,
    ) -> Result<TestAttempt> {
        let sql = format!(
            r#"
            UPDATE test_attempts
            SET num_questions_not_blank = $2, score = $3, finalized_at = $4
            WHERE id = $1 AND finalized_at IS NULL
            RETURNING {ATTEMPT_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, TestAttempt>(&sql)
            .bind(attempt_id)
            .bind(num_questions_not_blank)
            .bind(score)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(attempt) = updated {
            return Ok(attempt);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM test_attempts WHERE id = $1)")
                .bind(attempt_id)
                .fetch_one(&mut *conn)
                .await?;
        if exists {
            Err(Error::IllegalStateTransition(format!(
                "Attempt {} is already finalized",
                attempt_id
            )))
        } else {
            Err(Error::NotFound(format!("Attempt {} not found", attempt_id)))
        }
    }

    pub async fn get_attempt(&self, attempt_id: i64) -> Result<TestAttempt> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM test_attempts WHERE id = $1");
        sqlx::query_as::<_, TestAttempt>(&sql)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Attempt {} not found", attempt_id)))
    }

    pub async fn get_attempt_questions(&self, attempt_id: i64) -> Result<Vec<TestAttemptQuestion>> {
        let rows = sqlx::query_as::<_, TestAttemptQuestion>(
            r#"
            SELECT attempt_id, question_id, order_index, chosen_indexes, chosen_text, is_blank, score
            FROM test_attempt_questions
            WHERE attempt_id = $1
            ORDER BY order_index
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Finalized attempts of the course that the caller may see, newest first.
    pub async fn list_attempts(
        &self,
        ctx: &RequestContext,
        course_id: i64,
        config: &TestConfig,
    ) -> Result<Vec<AttemptSummary>> {
        if ctx.role == Role::Other {
            return Err(Error::Forbidden(
                "You are not a member of this course".to_string(),
            ));
        }

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ATTEMPT_COLUMNS} FROM test_attempts WHERE finalized_at IS NOT NULL AND course_id = "
        ));
        qb.push_bind(course_id);
        match ctx.role {
            Role::Student => {
                qb.push(" AND user_id = ").push_bind(ctx.user_id);
            }
            Role::Teacher | Role::NonEditingTeacher => {
                qb.push(" AND (visible_to_teachers OR user_id = ")
                    .push_bind(ctx.user_id)
                    .push(")");
            }
            Role::SysAdmin | Role::Other => {}
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        let attempts = qb
            .build_query_as::<TestAttempt>()
            .fetch_all(&self.pool)
            .await?;

        let level = effective_feedback_level(ctx.role, config);
        Ok(attempts
            .iter()
            .map(|a| AttemptSummary::from_attempt(a, level))
            .collect())
    }

    pub async fn review_attempt(
        &self,
        ctx: &RequestContext,
        course_id: i64,
        attempt_id: i64,
        config: &TestConfig,
    ) -> Result<AttemptReview> {
        let attempt = self.get_attempt(attempt_id).await?;
        if attempt.course_id != course_id || !attempt.is_finalized() {
            return Err(Error::NotFound(format!("Attempt {} not found", attempt_id)));
        }
        if !can_view(ctx, &attempt) {
            return Err(Error::Forbidden(
                "You are not allowed to see this attempt".to_string(),
            ));
        }

        let level = effective_feedback_level(ctx.role, config);
        let rows = self.get_attempt_questions(attempt_id).await?;
        let mut conn = self.pool.acquire().await?;
        let mut questions = Vec::with_capacity(rows.len());
        for row in &rows {
            let question =
                QuestionBankService::fetch_question_with_answers(&mut conn, row.question_id)
                    .await?;
            questions.push(review_question(
                question.as_ref(),
                attempt.created_at,
                row,
                level,
            ));
        }

        Ok(AttemptReview {
            attempt: AttemptSummary::from_attempt(&attempt, level),
            feedback_level: level,
            questions,
        })
    }

    /// Shapes a freshly finalized attempt for the submitter.
    pub fn build_review(
        attempt: &TestAttempt,
        scored: &[(QuestionWithAnswers, TestAttemptQuestion)],
        level: FeedbackLevel,
    ) -> AttemptReview {
        AttemptReview {
            attempt: AttemptSummary::from_attempt(attempt, level),
            feedback_level: level,
            questions: scored
                .iter()
                .map(|(q, row)| review_question(Some(q), attempt.created_at, row, level))
                .collect(),
        }
    }
}
