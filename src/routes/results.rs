use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};

use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::routes::course_context;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/results",
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Attempts visible to the caller", body = Json<Vec<crate::dto::result_dto::AttemptSummary>>),
        (status = 403, description = "Not a member of the course"),
    )
)]
#[axum::debug_handler]
pub async fn list_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    let config = state.test_configs.get(course_id).await?;
    let attempts = state.results.list_attempts(&ctx, course_id, &config).await?;
    Ok(Json(attempts))
}

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/results/{attempt_id}",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("attempt_id" = i64, Path, description = "Attempt ID")
    ),
    responses(
        (status = 200, description = "Attempt review", body = Json<crate::dto::result_dto::AttemptReview>),
        (status = 403, description = "Attempt belongs to someone else"),
        (status = 404, description = "Attempt not found"),
    )
)]
#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, attempt_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    let config = state.test_configs.get(course_id).await?;
    let review = state
        .results
        .review_attempt(&ctx, course_id, attempt_id, &config)
        .await?;
    Ok(Json(review))
}
