use crate::context::RequestContext;
use crate::dto::result_dto::AttemptReview;
use crate::dto::test_dto::{SubmitTestRequest, SubmittedAnswer};
use crate::error::{Error, Result};
use crate::models::attempt_status::StatusKey;
use crate::models::question::QuestionWithAnswers;
use crate::models::test_attempt::{TestAttempt, TestAttemptQuestion};
use crate::services::question_bank_service::QuestionBankService;
use crate::services::result_service::{effective_feedback_level, ResultService};
use crate::services::scoring_service::{recorded_submission, score_answer, Submission};
use crate::services::test_config_service::TestConfigService;
use sqlx::PgPool;
use std::collections::HashMap;

/// Indexes the answers by question, rejecting any that do not belong to the shown test.
pub fn check_answers(
    shown: &[i64],
    answers: Vec<SubmittedAnswer>,
) -> Result<HashMap<i64, Submission>> {
    let mut by_question = HashMap::with_capacity(answers.len());
    for answer in answers {
        if !shown.contains(&answer.question_id) {
            return Err(Error::InvalidRequest(format!(
                "Question {} was not part of this test",
                answer.question_id
            )));
        }
        if by_question
            .insert(answer.question_id, answer.submission)
            .is_some()
        {
            return Err(Error::InvalidRequest(format!(
                "Question {} was answered more than once",
                answer.question_id
            )));
        }
    }
    Ok(by_question)
}

/// Failures the student can recover from leave the test open.
fn keeps_test_open(err: &Error) -> bool {
    matches!(
        err,
        Error::InvalidRequest(_) | Error::NotFound(_) | Error::IllegalStateTransition(_)
    )
}

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
    question_bank: QuestionBankService,
    results: ResultService,
    test_configs: TestConfigService,
}

impl AttemptService {
    pub fn new(
        pool: PgPool,
        question_bank: QuestionBankService,
        results: ResultService,
        test_configs: TestConfigService,
    ) -> Self {
        Self {
            pool,
            question_bank,
            results,
            test_configs,
        }
    }

    pub async fn submit(
        &self,
        ctx: &RequestContext,
        course_id: i64,
        attempt_number: i32,
        request: SubmitTestRequest,
    ) -> Result<AttemptReview> {
        ctx.require_test_taker()?;
        let config = self.test_configs.get(course_id).await?;
        let key = StatusKey {
            session_id: ctx.session_id.clone(),
            course_id,
            attempt_number,
        };

        let (attempt, scored) = match self.assess(ctx, &key, request).await {
            Ok(done) => done,
            Err(e) => {
                if !keeps_test_open(&e) {
                    tracing::error!(error = %e, course_id, attempt_number, "Test assessment failed");
                    if let Err(mark) = self.results.mark_error(&key).await {
                        tracing::error!(error = %mark, course_id, attempt_number, "Could not flag failed test");
                    }
                }
                return Err(e);
            }
        };

        tracing::info!(
            user_id = %ctx.user_id,
            course_id,
            attempt_number,
            attempt_id = attempt.id,
            score = attempt.score.unwrap_or_default(),
            "Test assessed"
        );

        let level = effective_feedback_level(ctx.role, &config);
        Ok(ResultService::build_review(&attempt, &scored, level))
    }

    async fn assess(
        &self,
        ctx: &RequestContext,
        key: &StatusKey,
        request: SubmitTestRequest,
    ) -> Result<(TestAttempt, Vec<(QuestionWithAnswers, TestAttemptQuestion)>)> {
        let mut tx = self.pool.begin().await?;

        let status = ResultService::mark_assessed(&mut tx, key, ctx.user_id, ctx.now).await?;
        let mut answers = check_answers(&status.question_ids, request.answers)?;

        let attempt_id = ResultService::begin_attempt(
            &mut tx,
            key.course_id,
            ctx.user_id,
            key.attempt_number,
            status.question_ids.len() as i32,
            request.visible_to_teachers,
            status.created_at,
        )
        .await?;

        let mut scored = Vec::with_capacity(status.question_ids.len());
        let mut total = 0.0;
        let mut not_blank = 0;
        for (order_index, question_id) in status.question_ids.iter().copied().enumerate() {
            let Some(question) =
                QuestionBankService::fetch_question_with_answers(&mut tx, question_id).await?
            else {
                tracing::warn!(question_id, attempt_id, "Question deleted before assessment, skipped");
                continue;
            };

            let submitted = answers.remove(&question_id).unwrap_or_default();
            let result = score_answer(&question, &submitted)?;
            let submission = recorded_submission(&question, &submitted);
            ResultService::record_question_result(
                &mut tx,
                attempt_id,
                question_id,
                order_index as i32,
                &submission,
                &result,
            )
            .await?;
            self.question_bank
                .record_hit(&mut tx, question_id, result.score, result.is_blank)
                .await?;

            total += result.score;
            if !result.is_blank {
                not_blank += 1;
            }
            scored.push((
                question,
                TestAttemptQuestion {
                    attempt_id,
                    question_id,
                    order_index: order_index as i32,
                    chosen_indexes: submission.chosen_indexes,
                    chosen_text: submission.text,
                    is_blank: result.is_blank,
                    score: result.score,
                },
            ));
        }

        let attempt = ResultService::finalize(&mut tx, attempt_id, not_blank, total, ctx.now).await?;
        tx.commit().await?;
        Ok((attempt, scored))
    }
}
