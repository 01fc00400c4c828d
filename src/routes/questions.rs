use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};

use crate::dto::question_dto::{
    QuestionListQuery, QuestionPayload, QuestionSearchRequest, UpdateTagPayload,
};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::routes::course_context;
use crate::services::question_bank_service::{QuestionFilter, Selection};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/questions",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("tag_id" = Option<i64>, Query, description = "Only questions with this tag"),
        ("answer_type" = Option<String>, Query, description = "Only questions of this answer type"),
        ("order" = Option<String>, Query, description = "edited_at, stem, num_hits or average_score")
    ),
    responses(
        (status = 200, description = "Question bank listing", body = Json<Vec<crate::models::question::QuestionSummary>>),
        (status = 403, description = "Teacher access required"),
    )
)]
#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Query(query): Query<QuestionListQuery>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    ctx.require_privileged()?;

    let filter = QuestionFilter {
        tags: Selection::from_request(query.tag_id.map(|id| vec![id])),
        answer_types: Selection::from_request(query.answer_type.map(|t| vec![t])),
        order: query.order,
        ..Default::default()
    };
    let questions = state
        .question_bank
        .find_questions_by_filter(course_id, &filter)
        .await?;
    Ok(Json(questions))
}

#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/questions/search",
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    request_body = QuestionSearchRequest,
    responses(
        (status = 200, description = "Matching questions", body = Json<Vec<crate::models::question::QuestionSummary>>),
        (status = 422, description = "Empty selection or inverted date range"),
    )
)]
#[axum::debug_handler]
pub async fn search_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Json(payload): Json<QuestionSearchRequest>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    ctx.require_privileged()?;

    let filter = QuestionFilter {
        tags: Selection::from_request(payload.tag_ids),
        answer_types: Selection::from_request(payload.answer_types),
        edited_from: payload.edited_from,
        edited_to: payload.edited_to,
        exclude_hidden: false,
        order: payload.order,
    };
    let questions = state
        .question_bank
        .find_questions_by_filter(course_id, &filter)
        .await?;
    Ok(Json(questions))
}

#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/questions",
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    request_body = QuestionPayload,
    responses(
        (status = 201, description = "Question created", body = Json<crate::models::question::QuestionWithAnswers>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Teacher access required"),
    )
)]
#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    ctx.require_course_editor()?;
    let question = state.question_bank.create_question(course_id, payload).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/questions/{question_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("question_id" = i64, Path, description = "Question ID")
    ),
    responses(
        (status = 200, description = "Question with its answers", body = Json<crate::models::question::QuestionWithAnswers>),
        (status = 404, description = "Question not found"),
    )
)]
#[axum::debug_handler]
pub async fn get_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    ctx.require_privileged()?;
    let question = state
        .question_bank
        .get_course_question(course_id, question_id)
        .await?;
    Ok(Json(question))
}

#[utoipa::path(
    put,
    path = "/api/courses/{course_id}/questions/{question_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("question_id" = i64, Path, description = "Question ID")
    ),
    request_body = QuestionPayload,
    responses(
        (status = 200, description = "Question updated", body = Json<crate::models::question::QuestionWithAnswers>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Question not found"),
    )
)]
#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, question_id)): Path<(i64, i64)>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    ctx.require_course_editor()?;
    let question = state
        .question_bank
        .update_question(course_id, question_id, payload)
        .await?;
    Ok(Json(question))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{course_id}/questions/{question_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("question_id" = i64, Path, description = "Question ID")
    ),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 404, description = "Question not found"),
    )
)]
#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    ctx.require_course_editor()?;
    state
        .question_bank
        .delete_question(course_id, question_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/tags",
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Tags of the course; students only see visible ones", body = Json<Vec<crate::models::tag::Tag>>),
    )
)]
#[axum::debug_handler]
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    ctx.require_test_taker()?;
    let mut tags = state.question_bank.list_tags(course_id).await?;
    if !ctx.role.is_privileged() {
        tags.retain(|t| !t.hidden);
    }
    Ok(Json(tags))
}

#[utoipa::path(
    patch,
    path = "/api/courses/{course_id}/tags/{tag_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("tag_id" = i64, Path, description = "Tag ID")
    ),
    request_body = UpdateTagPayload,
    responses(
        (status = 200, description = "Tag updated", body = Json<crate::models::tag::Tag>),
        (status = 404, description = "Tag not found"),
    )
)]
#[axum::debug_handler]
pub async fn update_tag(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, tag_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateTagPayload>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    ctx.require_course_editor()?;
    let tag = state
        .question_bank
        .set_tag_hidden(course_id, tag_id, payload.hidden)
        .await?;
    Ok(Json(tag))
}
