use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};

use crate::dto::test_config_dto::TestConfigPayload;
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::routes::course_context;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/test-config",
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course test policy", body = Json<crate::models::test_config::TestConfig>),
    )
)]
#[axum::debug_handler]
pub async fn get_test_config(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    ctx.require_test_taker()?;
    let config = state.test_configs.get(course_id).await?;
    Ok(Json(config))
}

#[utoipa::path(
    put,
    path = "/api/courses/{course_id}/test-config",
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    request_body = TestConfigPayload,
    responses(
        (status = 200, description = "Policy saved", body = Json<crate::models::test_config::TestConfig>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Teacher access required"),
    )
)]
#[axum::debug_handler]
pub async fn update_test_config(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Json(payload): Json<TestConfigPayload>,
) -> Result<impl IntoResponse> {
    let ctx = course_context(&state, &claims, course_id).await?;
    ctx.require_course_editor()?;
    let config = state.test_configs.upsert(course_id, payload).await?;
    Ok(Json(config))
}
