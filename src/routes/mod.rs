pub mod health;
pub mod questions;
pub mod results;
pub mod test_config;
pub mod tests;

use crate::context::RequestContext;
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};

pub(crate) async fn course_context(
    state: &AppState,
    claims: &Claims,
    course_id: i64,
) -> Result<RequestContext> {
    RequestContext::for_course(claims, state.enrollments.as_ref(), course_id).await
}

/// Every authenticated course endpoint.
pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/api/courses/:course_id/tests", post(tests::generate_test))
        .route(
            "/api/courses/:course_id/tests/:attempt_number/submit",
            post(tests::submit_test),
        )
        .route("/api/courses/:course_id/results", get(results::list_results))
        .route(
            "/api/courses/:course_id/results/:attempt_id",
            get(results::get_result),
        )
        .route(
            "/api/courses/:course_id/test-config",
            get(test_config::get_test_config).put(test_config::update_test_config),
        )
        .route(
            "/api/courses/:course_id/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/api/courses/:course_id/questions/search",
            post(questions::search_questions),
        )
        .route(
            "/api/courses/:course_id/questions/:question_id",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .route("/api/courses/:course_id/tags", get(questions::list_tags))
        .route(
            "/api/courses/:course_id/tags/:tag_id",
            patch(questions::update_tag),
        )
        .layer(axum::middleware::from_fn(
            crate::middleware::auth::require_bearer_auth,
        ))
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .merge(course_routes())
        .with_state(state)
}
