use crate::dto::question_dto::{QuestionOrder, QuestionPayload};
use crate::error::{Error, Result};
use crate::models::question::{AnswerOption, AnswerType, Question, QuestionSummary, QuestionWithAnswers};
use crate::models::tag::Tag;
use crate::services::scoring_service::{parse_float, parse_true_false};
use crate::utils::text::collapse_whitespace;
use crate::utils::time::now;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;
use validator::Validate;

/// A filter dimension: everything, or only the listed values.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<T> {
    All,
    Only(Vec<T>),
}

impl<T> Selection<T> {
    pub fn from_request(values: Option<Vec<T>>) -> Self {
        match values {
            None => Selection::All,
            Some(values) => Selection::Only(values),
        }
    }

    pub fn selects_nothing(&self) -> bool {
        matches!(self, Selection::Only(values) if values.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct QuestionFilter {
    pub tags: Selection<i64>,
    pub answer_types: Selection<AnswerType>,
    pub edited_from: Option<DateTime<Utc>>,
    pub edited_to: Option<DateTime<Utc>>,
    /// Drop every question carrying at least one hidden tag.
    pub exclude_hidden: bool,
    pub order: QuestionOrder,
}

impl Default for QuestionFilter {
    fn default() -> Self {
        Self {
            tags: Selection::All,
            answer_types: Selection::All,
            edited_from: None,
            edited_to: None,
            exclude_hidden: false,
            order: QuestionOrder::EditedAt,
        }
    }
}

impl QuestionFilter {
    pub fn validate(&self) -> Result<()> {
        if self.tags.selects_nothing() {
            return Err(Error::InvalidRequest("No tags selected".to_string()));
        }
        if self.answer_types.selects_nothing() {
            return Err(Error::InvalidRequest("No answer types selected".to_string()));
        }
        if let (Some(from), Some(to)) = (self.edited_from, self.edited_to) {
            if from > to {
                return Err(Error::InvalidRequest(
                    "Edit date range starts after it ends".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl QuestionOrder {
    fn order_by(&self) -> &'static str {
        match self {
            QuestionOrder::EditedAt => "q.edited_at DESC, q.id",
            QuestionOrder::Stem => "q.stem, q.id",
            QuestionOrder::NumHits => "q.num_hits DESC, q.id",
            QuestionOrder::AverageScore => {
                "CASE WHEN q.num_hits_not_blank > 0 \
                 THEN q.accumulated_score / q.num_hits_not_blank END DESC NULLS LAST, q.id"
            }
        }
    }
}

/// Checks the option set of a question against what its answer type requires.
pub fn validate_question(payload: &QuestionPayload, max_options: usize) -> Result<()> {
    fn invalid(msg: String) -> Result<()> {
        Err(Error::InvalidRequest(msg))
    }

    let options = &payload.options;

    match payload.answer_type {
        AnswerType::Int => {
            if options.len() != 1 {
                return invalid("An integer question stores exactly one answer".into());
            }
            if options[0].text.trim().parse::<i64>().is_err() {
                return invalid(format!("'{}' is not an integer", options[0].text.trim()));
            }
        }
        AnswerType::Float => {
            if options.len() != 2 {
                return invalid("A real-number question stores exactly two bounds".into());
            }
            if let Some(bad) = options.iter().find(|o| parse_float(&o.text).is_none()) {
                return invalid(format!("'{}' is not a real number", bad.text.trim()));
            }
        }
        AnswerType::TrueFalse => {
            if options.len() != 1 || parse_true_false(&options[0].text).is_none() {
                return invalid("A true/false question stores exactly one answer, T or F".into());
            }
        }
        AnswerType::UniqueChoice | AnswerType::MultipleChoice | AnswerType::Text => {
            if options.is_empty() || options.len() > max_options {
                return invalid(format!(
                    "A {} question needs between 1 and {} answers",
                    payload.answer_type, max_options
                ));
            }
            if options.iter().any(|o| o.text.trim().is_empty()) {
                return invalid("Answers cannot be empty".into());
            }
            if payload.answer_type == AnswerType::UniqueChoice
                && options.iter().filter(|o| o.is_correct).count() != 1
            {
                return invalid("A unique choice question needs exactly one correct answer".into());
            }
        }
    }
    Ok(())
}

/// Tag texts with whitespace collapsed, blanks dropped and duplicates removed, in order.
pub fn normalized_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| collapse_whitespace(t))
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

#[derive(Clone)]
pub struct QuestionBankService {
    pool: PgPool,
    max_answer_options: usize,
}

impl QuestionBankService {
    pub fn new(pool: PgPool, max_answer_options: usize) -> Self {
        Self {
            pool,
            max_answer_options,
        }
    }

    pub async fn find_questions_by_filter(
        &self,
        course_id: i64,
        filter: &QuestionFilter,
    ) -> Result<Vec<QuestionSummary>> {
        filter.validate()?;

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                q.id, q.answer_type, q.stem, q.shuffle, q.edited_at,
                q.num_hits, q.num_hits_not_blank, q.accumulated_score,
                COALESCE(
                    ARRAY_AGG(t.text ORDER BY qt.tag_index) FILTER (WHERE t.id IS NOT NULL),
                    ARRAY[]::TEXT[]
                ) AS tags,
                COALESCE(BOOL_OR(t.hidden), FALSE) AS has_hidden_tag
            FROM questions q
            LEFT JOIN question_tags qt ON qt.question_id = q.id
            LEFT JOIN tags t ON t.id = qt.tag_id
            WHERE q.course_id = "#,
        );
        qb.push_bind(course_id);

        if let Selection::Only(types) = &filter.answer_types {
            let types: Vec<String> = types.iter().map(|t| t.as_str().to_string()).collect();
            qb.push(" AND q.answer_type = ANY(").push_bind(types).push(")");
        }
        if let Some(from) = filter.edited_from {
            qb.push(" AND q.edited_at >= ").push_bind(from);
        }
        if let Some(to) = filter.edited_to {
            qb.push(" AND q.edited_at <= ").push_bind(to);
        }
        if let Selection::Only(tag_ids) = &filter.tags {
            qb.push(
                " AND EXISTS (SELECT 1 FROM question_tags sel \
                 WHERE sel.question_id = q.id AND sel.tag_id = ANY(",
            )
            .push_bind(tag_ids.clone())
            .push("))");
        }

        qb.push(" GROUP BY q.id");
        if filter.exclude_hidden {
            qb.push(" HAVING NOT COALESCE(BOOL_OR(t.hidden), FALSE)");
        }
        qb.push(" ORDER BY ").push(filter.order.order_by());

        let questions = qb
            .build_query_as::<QuestionSummary>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(course_id, found = questions.len(), "Question bank search");
        Ok(questions)
    }

    pub async fn get_question_with_answers(&self, question_id: i64) -> Result<QuestionWithAnswers> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_question_with_answers(&mut conn, question_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Question {} not found", question_id)))
    }

    pub async fn get_course_question(
        &self,
        course_id: i64,
        question_id: i64,
    ) -> Result<QuestionWithAnswers> {
        let question = self.get_question_with_answers(question_id).await?;
        if question.question.course_id != course_id {
            return Err(Error::NotFound(format!("Question {} not found", question_id)));
        }
        Ok(question)
    }

    pub async fn fetch_question_with_answers(
        conn: &mut PgConnection,
        question_id: i64,
    ) -> Result<Option<QuestionWithAnswers>> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, course_id, answer_type, stem, feedback, shuffle, edited_at,
                   num_hits, num_hits_not_blank, accumulated_score
            FROM questions WHERE id = $1
            "#,
        )
        .bind(question_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(question) = question else {
            return Ok(None);
        };

        let options = sqlx::query_as::<_, AnswerOption>(
            r#"
            SELECT question_id, option_index, text, feedback, is_correct
            FROM answer_options WHERE question_id = $1
            ORDER BY option_index
            "#,
        )
        .bind(question_id)
        .fetch_all(&mut *conn)
        .await?;

        let tags: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT t.text FROM question_tags qt
            JOIN tags t ON t.id = qt.tag_id
            WHERE qt.question_id = $1
            ORDER BY qt.tag_index
            "#,
        )
        .bind(question_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(QuestionWithAnswers {
            question,
            options,
            tags,
        }))
    }

    /// Counts one more answer to a question in a single statement, so concurrent
    /// submissions never lose an increment.
    pub async fn record_hit(
        &self,
        conn: &mut PgConnection,
        question_id: i64,
        score: f64,
        was_blank: bool,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE questions
            SET num_hits = num_hits + 1,
                num_hits_not_blank = num_hits_not_blank + CASE WHEN $2 THEN 0 ELSE 1 END,
                accumulated_score = accumulated_score
                    + CASE WHEN $2 THEN 0::DOUBLE PRECISION ELSE $3 END
            WHERE id = $1
            "#,
        )
        .bind(question_id)
        .bind(was_blank)
        .bind(score)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Question {} not found", question_id)));
        }
        Ok(())
    }

    pub async fn create_question(
        &self,
        course_id: i64,
        payload: QuestionPayload,
    ) -> Result<QuestionWithAnswers> {
        payload.validate()?;
        validate_question(&payload, self.max_answer_options)?;

        let mut tx = self.pool.begin().await?;
        let question_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO questions (course_id, answer_type, stem, feedback, shuffle, edited_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(course_id)
        .bind(payload.answer_type.as_str())
        .bind(&payload.stem)
        .bind(&payload.feedback)
        .bind(payload.shuffle && payload.answer_type.is_choice())
        .bind(now())
        .fetch_one(&mut *tx)
        .await?;

        Self::store_answers_and_tags(&mut tx, course_id, question_id, &payload).await?;
        Self::prune_orphan_tags(&mut tx, course_id).await?;
        let question = Self::fetch_question_with_answers(&mut tx, question_id)
            .await?
            .ok_or_else(|| Error::Internal("Created question vanished".to_string()))?;
        tx.commit().await?;

        tracing::info!(course_id, question_id, "Question created");
        Ok(question)
    }

    /// Replaces the content of a question and advances its edit time, which
    /// hides it from the review of every earlier attempt.
    pub async fn update_question(
        &self,
        course_id: i64,
        question_id: i64,
        payload: QuestionPayload,
    ) -> Result<QuestionWithAnswers> {
        payload.validate()?;
        validate_question(&payload, self.max_answer_options)?;

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE questions
            SET answer_type = $1, stem = $2, feedback = $3, shuffle = $4, edited_at = $5
            WHERE id = $6 AND course_id = $7
            "#,
        )
        .bind(payload.answer_type.as_str())
        .bind(&payload.stem)
        .bind(&payload.feedback)
        .bind(payload.shuffle && payload.answer_type.is_choice())
        .bind(now())
        .bind(question_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Question {} not found", question_id)));
        }

        sqlx::query("DELETE FROM answer_options WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM question_tags WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        Self::store_answers_and_tags(&mut tx, course_id, question_id, &payload).await?;
        Self::prune_orphan_tags(&mut tx, course_id).await?;
        let question = Self::fetch_question_with_answers(&mut tx, question_id)
            .await?
            .ok_or_else(|| Error::Internal("Updated question vanished".to_string()))?;
        tx.commit().await?;

        tracing::info!(course_id, question_id, "Question updated");
        Ok(question)
    }

    pub async fn delete_question(&self, course_id: i64, question_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM questions WHERE id = $1 AND course_id = $2")
            .bind(question_id)
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Question {} not found", question_id)));
        }

        let pruned = Self::prune_orphan_tags(&mut tx, course_id).await?;
        tx.commit().await?;

        tracing::info!(course_id, question_id, pruned_tags = pruned, "Question deleted");
        Ok(())
    }

    async fn store_answers_and_tags(
        conn: &mut PgConnection,
        course_id: i64,
        question_id: i64,
        payload: &QuestionPayload,
    ) -> Result<()> {
        let stores_value = !matches!(
            payload.answer_type,
            AnswerType::UniqueChoice | AnswerType::MultipleChoice
        );

        for (index, option) in payload.options.iter().enumerate() {
            let text = match payload.answer_type {
                AnswerType::TrueFalse => option.text.trim().to_uppercase(),
                AnswerType::Int | AnswerType::Float => option.text.trim().to_string(),
                _ => option.text.clone(),
            };
            sqlx::query(
                r#"
                INSERT INTO answer_options (question_id, option_index, text, feedback, is_correct)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(question_id)
            .bind(index as i32)
            .bind(text)
            .bind(&option.feedback)
            .bind(stores_value || option.is_correct)
            .execute(&mut *conn)
            .await?;
        }

        for (index, text) in normalized_tags(&payload.tags).into_iter().enumerate() {
            let tag_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO tags (course_id, text) VALUES ($1, $2)
                ON CONFLICT (course_id, text) DO UPDATE SET text = EXCLUDED.text
                RETURNING id
                "#,
            )
            .bind(course_id)
            .bind(&text)
            .fetch_one(&mut *conn)
            .await?;

            sqlx::query(
                "INSERT INTO question_tags (question_id, tag_id, tag_index) VALUES ($1, $2, $3)",
            )
            .bind(question_id)
            .bind(tag_id)
            .bind(index as i32)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Removes the tags of a course that no question references any more.
    pub async fn prune_orphan_tags(conn: &mut PgConnection, course_id: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM tags
            WHERE course_id = $1
              AND NOT EXISTS (SELECT 1 FROM question_tags qt WHERE qt.tag_id = tags.id)
            "#,
        )
        .bind(course_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_tags(&self, course_id: i64) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            "SELECT id, course_id, text, hidden FROM tags WHERE course_id = $1 ORDER BY text",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    pub async fn set_tag_hidden(&self, course_id: i64, tag_id: i64, hidden: bool) -> Result<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            UPDATE tags SET hidden = $3
            WHERE id = $1 AND course_id = $2
            RETURNING id, course_id, text, hidden
            "#,
        )
        .bind(tag_id)
        .bind(course_id)
        .bind(hidden)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Tag {} not found", tag_id)))?;

        tracing::info!(course_id, tag_id, hidden, "Tag visibility changed");
        Ok(tag)
    }
}
