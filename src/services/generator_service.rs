use crate::context::RequestContext;
use crate::dto::test_dto::{DisplayedOption, GenerateTestRequest, GeneratedTestResponse, QuestionForAttempt};
use crate::error::{Error, Result};
use crate::models::attempt_status::StatusKey;
use crate::models::question::{AnswerOption, QuestionSummary, QuestionWithAnswers};
use crate::models::test_config::TestConfig;
use crate::services::pacing_service::PacingService;
use crate::services::question_bank_service::{QuestionBankService, QuestionFilter, Selection};
use crate::services::result_service::ResultService;
use crate::services::test_config_service::TestConfigService;
use crate::utils::time::add_seconds_per_item;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sqlx::PgPool;

/// The requested number of questions, or the course default, checked against the course bounds.
pub fn resolve_question_count(requested: Option<i32>, config: &TestConfig) -> Result<usize> {
    let n = requested.unwrap_or(config.default_questions);
    if !config.accepts_question_count(n) {
        return Err(Error::InvalidRequest(format!(
            "number of questions must be between {} and {}",
            config.min_questions, config.max_questions
        )));
    }
    Ok(n as usize)
}

/// Uniform sample of `n` distinct questions, never including one with a hidden tag.
pub fn sample_questions<R: Rng + ?Sized>(
    candidates: Vec<QuestionSummary>,
    n: usize,
    rng: &mut R,
) -> Result<Vec<i64>> {
    let mut ids: Vec<i64> = candidates
        .into_iter()
        .filter(|q| !q.has_hidden_tag)
        .map(|q| q.id)
        .collect();
    if ids.len() < n {
        return Err(Error::InsufficientQuestions {
            requested: n,
            available: ids.len(),
        });
    }
    ids.shuffle(rng);
    ids.truncate(n);
    Ok(ids)
}

/// The student-facing view of a question. Options are only listed for choice
/// questions, shuffled when the question asks for it, and never reveal correctness.
pub fn present_question<R: Rng + ?Sized>(q: &QuestionWithAnswers, rng: &mut R) -> QuestionForAttempt {
    let mut options: Vec<&AnswerOption> = if q.question.answer_type.is_choice() {
        q.options.iter().collect()
    } else {
        Vec::new()
    };
    if q.question.shuffle {
        options.shuffle(rng);
    }

    QuestionForAttempt {
        question_id: q.question.id,
        answer_type: q.question.answer_type,
        stem: q.question.stem.clone(),
        options: options
            .into_iter()
            .enumerate()
            .map(|(position, o)| DisplayedOption {
                index: o.index,
                position,
                text: o.text.clone(),
            })
            .collect(),
    }
}

#[derive(Clone)]
pub struct GeneratorService {
    pool: PgPool,
    question_bank: QuestionBankService,
    test_configs: TestConfigService,
    pacing: PacingService,
    session_ttl_minutes: i64,
}

impl GeneratorService {
    pub fn new(
        pool: PgPool,
        question_bank: QuestionBankService,
        test_configs: TestConfigService,
        pacing: PacingService,
        session_ttl_minutes: i64,
    ) -> Self {
        Self {
            pool,
            question_bank,
            test_configs,
            pacing,
            session_ttl_minutes,
        }
    }

    pub async fn generate(
        &self,
        ctx: &RequestContext,
        course_id: i64,
        request: GenerateTestRequest,
    ) -> Result<GeneratedTestResponse> {
        ctx.require_test_taker()?;

        let filter = QuestionFilter {
            tags: Selection::from_request(request.tag_ids),
            answer_types: Selection::from_request(request.answer_types),
            exclude_hidden: true,
            ..Default::default()
        };
        filter.validate()?;

        let config = self.test_configs.get(course_id).await?;
        let n = resolve_question_count(request.num_questions, &config)?;
        self.pacing.authorize(ctx, course_id, &config).await?;

        let candidates = self
            .question_bank
            .find_questions_by_filter(course_id, &filter)
            .await?;
        let available = candidates.len();
        let ids = sample_questions(candidates, n, &mut StdRng::from_entropy()).map_err(|e| {
            tracing::info!(course_id, requested = n, available, "Not enough questions for a test");
            e
        })?;

        let mut tx = self.pool.begin().await?;
        PacingService::record_generation(&mut tx, ctx, course_id, n as i32, &config).await?;

        let mut selected = Vec::with_capacity(ids.len());
        for id in &ids {
            let question = QuestionBankService::fetch_question_with_answers(&mut tx, *id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Question {} not found", id)))?;
            selected.push(question);
        }

        let attempt_number =
            ResultService::next_attempt_number(&mut tx, course_id, ctx.user_id, &ctx.session_id)
                .await?;
        let key = StatusKey {
            session_id: ctx.session_id.clone(),
            course_id,
            attempt_number,
        };
        let expires_at = add_seconds_per_item(ctx.now, self.session_ttl_minutes, 60);
        ResultService::create_status(&mut tx, &key, ctx.user_id, &ids, ctx.now, expires_at).await?;
        tx.commit().await?;

        let mut rng = StdRng::from_entropy();
        let questions: Vec<QuestionForAttempt> = selected
            .iter()
            .map(|q| present_question(q, &mut rng))
            .collect();

        tracing::info!(
            user_id = %ctx.user_id,
            course_id,
            attempt_number,
            num_questions = questions.len(),
            "Test generated"
        );

        Ok(GeneratedTestResponse {
            course_id,
            attempt_number,
            num_questions: questions.len(),
            questions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::AnswerType;
    use crate::models::test_config::FeedbackLevel;
    use crate::services::scoring_service::tests::question;
    use crate::services::scoring_service::{score_answer, Submission};
    use chrono::Utc;
    use std::collections::HashSet;

    fn config() -> TestConfig {
        TestConfig {
            course_id: 1,
            min_questions: 2,
            default_questions: 5,
            max_questions: 8,
            min_seconds_per_question: 0,
            feedback_level: FeedbackLevel::FullFeedback,
        }
    }

    fn summary(id: i64, has_hidden_tag: bool) -> QuestionSummary {
        QuestionSummary {
            id,
            answer_type: AnswerType::Int,
            stem: format!("q{}", id),
            shuffle: false,
            edited_at: Utc::now(),
            num_hits: 0,
            num_hits_not_blank: 0,
            accumulated_score: 0.0,
            tags: vec![],
            has_hidden_tag,
        }
    }

    #[test]
    fn question_count_defaults_and_is_bounded() {
        assert_eq!(resolve_question_count(None, &config()).unwrap(), 5);
        assert_eq!(resolve_question_count(Some(8), &config()).unwrap(), 8);
        match resolve_question_count(Some(9), &config()) {
            Err(Error::InvalidRequest(msg)) => {
                assert_eq!(msg, "number of questions must be between 2 and 8")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(resolve_question_count(Some(1), &config()).is_err());
    }

    #[test]
    fn sampling_is_distinct_and_skips_hidden_questions() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates: Vec<_> = (1..=10).map(|id| summary(id, id % 2 == 0)).collect();

        let ids = sample_questions(candidates, 5, &mut rng).unwrap();
        assert_eq!(ids.len(), 5);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 5);
        assert!(ids.iter().all(|id| id % 2 == 1));
    }

    #[test]
    fn too_few_candidates_is_reported() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = vec![summary(1, false), summary(2, true)];
        match sample_questions(candidates, 2, &mut rng) {
            Err(Error::InsufficientQuestions { requested, available }) => {
                assert_eq!((requested, available), (2, 1))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn open_questions_show_no_options() {
        let q = question(AnswerType::Float, &[("1.0", true), ("2.0", true)]);
        let shown = present_question(&q, &mut StdRng::seed_from_u64(1));
        assert!(shown.options.is_empty());
    }

    #[test]
    fn unshuffled_options_keep_their_order() {
        let q = question(AnswerType::MultipleChoice, &[("a", true), ("b", false), ("c", true)]);
        let shown = present_question(&q, &mut StdRng::seed_from_u64(1));
        let indexes: Vec<i32> = shown.options.iter().map(|o| o.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn shuffled_options_round_trip_through_scoring() {
        let mut q = question(
            AnswerType::UniqueChoice,
            &[("red", false), ("green", false), ("blue", true), ("cyan", false), ("pink", false)],
        );
        q.question.shuffle = true;

        for seed in 0..20 {
            let shown = present_question(&q, &mut StdRng::seed_from_u64(seed));
            let mut positions: Vec<usize> = shown.options.iter().map(|o| o.position).collect();
            positions.sort_unstable();
            assert_eq!(positions, vec![0, 1, 2, 3, 4]);

            let picked = shown.options.iter().find(|o| o.text == "blue").unwrap();
            let scored = score_answer(&q, &Submission::choices([picked.index])).unwrap();
            assert_eq!(scored.score, 1.0);
        }
    }
}
