//! Per-answer-type scoring of a single submitted answer.
//!
//! Every function here is pure: the stored question and the submitted answer
//! go in, a score and a blank flag come out.

use crate::error::{Error, Result};
use crate::models::question::{AnswerType, QuestionWithAnswers};
use crate::utils::text::{comparable_answer, comparable_submission};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What a student submitted for one question. Choice questions use
/// `chosen_indexes` (stable option indexes), every other type uses `text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub chosen_indexes: Vec<i32>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Submission {
    pub fn choices(indexes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            chosen_indexes: indexes.into_iter().collect(),
            text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            chosen_indexes: Vec::new(),
            text: Some(text.into()),
        }
    }

    fn trimmed_text(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredAnswer {
    pub score: f64,
    pub is_blank: bool,
}

impl ScoredAnswer {
    pub fn blank() -> Self {
        Self {
            score: 0.0,
            is_blank: true,
        }
    }

    pub fn answered(score: f64) -> Self {
        Self {
            score,
            is_blank: false,
        }
    }
}

pub trait Scorer: Sync {
    fn score(&self, question: &QuestionWithAnswers, submission: &Submission)
        -> Result<ScoredAnswer>;
}

pub struct IntScorer;
pub struct FloatScorer;
pub struct TrueFalseScorer;
pub struct UniqueChoiceScorer;
pub struct MultipleChoiceScorer;
pub struct TextScorer;

pub fn scorer_for(answer_type: AnswerType) -> &'static dyn Scorer {
    match answer_type {
        AnswerType::Int => &IntScorer,
        AnswerType::Float => &FloatScorer,
        AnswerType::TrueFalse => &TrueFalseScorer,
        AnswerType::UniqueChoice => &UniqueChoiceScorer,
        AnswerType::MultipleChoice => &MultipleChoiceScorer,
        AnswerType::Text => &TextScorer,
    }
}

pub fn score_answer(question: &QuestionWithAnswers, submission: &Submission) -> Result<ScoredAnswer> {
    scorer_for(question.question.answer_type).score(question, submission)
}

/// Option indexes of the submission that exist in the question, without duplicates.
pub fn valid_choices(question: &QuestionWithAnswers, submission: &Submission) -> Vec<i32> {
    submission
        .chosen_indexes
        .iter()
        .copied()
        .filter(|i| question.option(*i).is_some())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The part of a submission that scoring looked at, as it should be stored:
/// valid distinct indexes for choice questions, the text for every other type.
pub fn recorded_submission(question: &QuestionWithAnswers, submission: &Submission) -> Submission {
    if question.question.answer_type.is_choice() {
        Submission::choices(valid_choices(question, submission))
    } else {
        Submission {
            chosen_indexes: Vec::new(),
            text: submission.text.clone(),
        }
    }
}

/// Parses a decimal number, accepting a comma as the decimal separator.
pub fn parse_float(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Reads `T`/`F` in any case; anything else is not a true/false answer.
pub fn parse_true_false(raw: &str) -> Option<bool> {
    match raw.trim() {
        "T" | "t" => Some(true),
        "F" | "f" => Some(false),
        _ => None,
    }
}

fn stored_text<'a>(question: &'a QuestionWithAnswers, index: i32) -> Result<&'a str> {
    question
        .option(index)
        .map(|o| o.text.trim())
        .ok_or_else(|| {
            Error::Internal(format!(
                "question {} has no stored answer at index {}",
                question.question.id, index
            ))
        })
}

fn corrupt(question: &QuestionWithAnswers, what: &str) -> Error {
    Error::Internal(format!(
        "question {} stores an invalid {}",
        question.question.id, what
    ))
}

impl Scorer for IntScorer {
    fn score(&self, question: &QuestionWithAnswers, submission: &Submission) -> Result<ScoredAnswer> {
        let Ok(submitted) = submission.trimmed_text().parse::<i64>() else {
            return Ok(ScoredAnswer::blank());
        };
        let correct = stored_text(question, 0)?
            .parse::<i64>()
            .map_err(|_| corrupt(question, "integer answer"))?;

        Ok(ScoredAnswer::answered(if submitted == correct { 1.0 } else { 0.0 }))
    }
}

impl Scorer for FloatScorer {
    fn score(&self, question: &QuestionWithAnswers, submission: &Submission) -> Result<ScoredAnswer> {
        let Some(submitted) = parse_float(submission.trimmed_text()) else {
            return Ok(ScoredAnswer::blank());
        };
        let a = parse_float(stored_text(question, 0)?).ok_or_else(|| corrupt(question, "lower bound"))?;
        let b = parse_float(stored_text(question, 1)?).ok_or_else(|| corrupt(question, "upper bound"))?;
        let (min, max) = if a <= b { (a, b) } else { (b, a) };

        Ok(ScoredAnswer::answered(
            if (min..=max).contains(&submitted) { 1.0 } else { 0.0 },
        ))
    }
}

impl Scorer for TrueFalseScorer {
    fn score(&self, question: &QuestionWithAnswers, submission: &Submission) -> Result<ScoredAnswer> {
        let Some(submitted) = parse_true_false(submission.trimmed_text()) else {
            return Ok(ScoredAnswer::blank());
        };
        let correct = parse_true_false(stored_text(question, 0)?)
            .ok_or_else(|| corrupt(question, "true/false answer"))?;

        Ok(ScoredAnswer::answered(if submitted == correct { 1.0 } else { -1.0 }))
    }
}

impl Scorer for UniqueChoiceScorer {
    fn score(&self, question: &QuestionWithAnswers, submission: &Submission) -> Result<ScoredAnswer> {
        let chosen = valid_choices(question, submission);
        let selected = match chosen.as_slice() {
            [] => return Ok(ScoredAnswer::blank()),
            [one] => *one,
            _ => {
                return Err(Error::InvalidRequest(format!(
                    "question {} accepts a single option",
                    question.question.id
                )))
            }
        };

        let is_correct = question.option(selected).is_some_and(|o| o.is_correct);
        if is_correct {
            return Ok(ScoredAnswer::answered(1.0));
        }
        let num_options = question.options.len();
        let penalty = if num_options > 1 {
            -1.0 / (num_options - 1) as f64
        } else {
            -1.0
        };
        Ok(ScoredAnswer::answered(penalty))
    }
}

impl Scorer for MultipleChoiceScorer {
    fn score(&self, question: &QuestionWithAnswers, submission: &Submission) -> Result<ScoredAnswer> {
        let chosen = valid_choices(question, submission);
        if chosen.is_empty() {
            return Ok(ScoredAnswer::blank());
        }

        let num_total = question.options.len();
        let num_correct = question.options.iter().filter(|o| o.is_correct).count();
        let num_incorrect = num_total - num_correct;
        let (good, bad) = chosen.iter().fold((0usize, 0usize), |(good, bad), index| {
            match question.option(*index) {
                Some(o) if o.is_correct => (good + 1, bad),
                Some(_) => (good, bad + 1),
                None => (good, bad),
            }
        });

        let score = if num_total == 0 {
            0.0
        } else if num_correct == 0 {
            tracing::warn!(
                question_id = question.question.id,
                "Multiple choice question has no correct option"
            );
            -(bad as f64) / num_total as f64
        } else if num_incorrect == 0 {
            good as f64 / num_correct as f64
        } else {
            good as f64 / num_correct as f64 - bad as f64 / num_incorrect as f64
        };

        Ok(ScoredAnswer::answered(score))
    }
}

impl Scorer for TextScorer {
    fn score(&self, question: &QuestionWithAnswers, submission: &Submission) -> Result<ScoredAnswer> {
        let submitted = comparable_submission(submission.text.as_deref().unwrap_or(""));
        if submitted.is_empty() {
            return Ok(ScoredAnswer::blank());
        }

        let matches = question
            .options
            .iter()
            .any(|o| comparable_answer(&o.text) == submitted);
        Ok(ScoredAnswer::answered(if matches { 1.0 } else { 0.0 }))
    }
}
