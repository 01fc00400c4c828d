mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        req = req.header("authorization", auth);
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}

#[tokio::test]
async fn course_flow_end_to_end() {
    let (pool, state) = common::setup().await;
    let app = assessment_backend::routes::app(state);
    let course_id = common::fresh_course_id();

    let teacher_id = Uuid::new_v4();
    let student_id = Uuid::new_v4();
    common::enroll(&pool, course_id, teacher_id, "teacher").await;
    common::enroll(&pool, course_id, student_id, "student").await;
    let teacher = common::bearer(teacher_id, "teacher-session", None);
    let student = common::bearer(student_id, "student-session", None);
    let base = format!("/api/courses/{}", course_id);

    let (status, _) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "GET", &format!("{}/results", base), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, config) = call(
        &app,
        "PUT",
        &format!("{}/test-config", base),
        Some(&teacher),
        Some(json!({
            "min_questions": 1,
            "default_questions": 2,
            "max_questions": 3,
            "min_seconds_per_question": 30,
            "feedback_level": "per_question_correctness"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{config}");

    let (status, _) = call(
        &app,
        "PUT",
        &format!("{}/test-config", base),
        Some(&student),
        Some(json!({
            "min_questions": 1,
            "default_questions": 1,
            "max_questions": 1,
            "min_seconds_per_question": 0,
            "feedback_level": "full_feedback"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = call(
        &app,
        "POST",
        &format!("{}/questions", base),
        Some(&teacher),
        Some(json!({
            "answer_type": "float",
            "stem": "Approximate pi",
            "tags": ["constants"],
            "options": [{ "text": "3.15" }, { "text": "3.13" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let float_id = created["question"]["id"].as_i64().unwrap();

    let (status, created) = call(
        &app,
        "POST",
        &format!("{}/questions", base),
        Some(&teacher),
        Some(json!({
            "answer_type": "true_false",
            "stem": "Zero is even",
            "tags": ["parity"],
            "options": [{ "text": "t" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let tf_id = created["question"]["id"].as_i64().unwrap();

    let (status, tags) = call(&app, "GET", &format!("{}/tags", base), Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tags.as_array().unwrap().len(), 2);

    let (status, body) = call(
        &app,
        "POST",
        &format!("{}/tests", base),
        Some(&student),
        Some(json!({ "num_questions": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation_error");

    let (status, body) = call(
        &app,
        "POST",
        &format!("{}/tests", base),
        Some(&student),
        Some(json!({ "tag_ids": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, test) = call(&app, "POST", &format!("{}/tests", base), Some(&student), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED, "{test}");
    let attempt_number = test["attempt_number"].as_i64().unwrap();
    assert_eq!(test["questions"].as_array().unwrap().len(), 2);
    assert!(!test.to_string().contains("is_correct"));

    let (status, body) = call(&app, "POST", &format!("{}/tests", base), Some(&student), Some(json!({}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["until"].is_string());

    let submit_uri = format!("{}/tests/{}/submit", base, attempt_number);
    let (status, review) = call(
        &app,
        "POST",
        &submit_uri,
        Some(&student),
        Some(json!({
            "visible_to_teachers": true,
            "answers": [
                { "question_id": float_id, "text": "3,14159" },
                { "question_id": tf_id, "text": "F" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{review}");
    assert_eq!(review["attempt"]["score"].as_f64(), Some(0.0));
    assert_eq!(review["feedback_level"], "per_question_correctness");
    let attempt_id = review["attempt"]["id"].as_i64().unwrap();

    let (status, _) = call(&app, "POST", &submit_uri, Some(&student), Some(json!({ "answers": [] }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, results) = call(&app, "GET", &format!("{}/results", base), Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results.as_array().unwrap().len(), 1);

    let (status, review) = call(
        &app,
        "GET",
        &format!("{}/results/{}", base, attempt_id),
        Some(&teacher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{review}");
    assert_eq!(review["feedback_level"], "full_feedback");
    let correctness: Vec<&str> = review["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["correctness"].as_str().unwrap())
        .collect();
    assert!(correctness.contains(&"correct"));
    assert!(correctness.contains(&"incorrect"));

    let outsider = common::bearer(Uuid::new_v4(), "outsider", None);
    let (status, _) = call(
        &app,
        "GET",
        &format!("{}/results/{}", base, attempt_id),
        Some(&outsider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
