use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};

use crate::dto::test_dto::{GenerateTestRequest, SubmitTestRequest};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::routes::course_context;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/tests",
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    request_body = GenerateTestRequest,
    responses(
        (status = 201, description = "Test generated", body = Json<crate::dto::test_dto::GeneratedTestResponse>),
        (status = 404, description = "No questions match the selected criteria"),
        (status = 422, description = "Invalid selection or question count"),
        (status = 429, description = "Too soon after the previous test"),
    )
)]
#[axum::debug_handler]
pub async fn generate_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Json(payload): Json<GenerateTestRequest>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    let test = state.generator.generate(&ctx, course_id, payload).await?;
    Ok((StatusCode::CREATED, Json(test)))
}

#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/tests/{attempt_number}/submit",
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("attempt_number" = i32, Path, description = "Attempt number returned on generation")
    ),
    request_body = SubmitTestRequest,
    responses(
        (status = 200, description = "Test assessed", body = Json<crate::dto::result_dto::AttemptReview>),
        (status = 404, description = "No such test was shown in this session"),
        (status = 409, description = "Test already assessed"),
        (status = 422, description = "Answers do not match the test"),
    )
)]
#[axum::debug_handler]
pub async fn submit_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((course_id, attempt_number)): Path<(i64, i32)>,
    Json(payload): Json<SubmitTestRequest>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    let review = state
        .attempts
        .submit(&ctx, course_id, attempt_number, payload)
        .await?;
    Ok(Json(review))
}
