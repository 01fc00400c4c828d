#![allow(dead_code)]

use std::env;

use assessment_backend::dto::question_dto::{AnswerOptionPayload, QuestionPayload};
use assessment_backend::models::question::AnswerType;
use assessment_backend::AppState;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn setup() -> (PgPool, AppState) {
    dotenvy::dotenv().ok();
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var("SESSION_TTL_MINUTES", "60");

    // Tests in one binary share the process-wide configuration.
    let _ = assessment_backend::config::init_config();

    let pool = assessment_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    let state = AppState::new(pool.clone());
    (pool, state)
}

/// A course id no other test run uses.
pub fn fresh_course_id() -> i64 {
    (Uuid::new_v4().as_u128() % 1_000_000_000_000) as i64 + 1
}

pub async fn enroll(pool: &PgPool, course_id: i64, user_id: Uuid, role: &str) {
    sqlx::query(
        r#"INSERT INTO course_enrollments (course_id, user_id, role)
           VALUES ($1, $2, $3)
           ON CONFLICT (course_id, user_id) DO UPDATE SET role = EXCLUDED.role"#,
    )
    .bind(course_id)
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await
    .expect("enroll");
}

pub fn unique_choice(stem: &str, correct: usize, tags: &[&str]) -> QuestionPayload {
    QuestionPayload {
        answer_type: AnswerType::UniqueChoice,
        stem: stem.to_string(),
        feedback: None,
        shuffle: true,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        options: (0..4)
            .map(|i| AnswerOptionPayload {
                text: format!("{} option {}", stem, i),
                feedback: None,
                is_correct: i == correct,
            })
            .collect(),
    }
}

pub fn integer(stem: &str, answer: i64, tags: &[&str]) -> QuestionPayload {
    QuestionPayload {
        answer_type: AnswerType::Int,
        stem: stem.to_string(),
        feedback: None,
        shuffle: false,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        options: vec![AnswerOptionPayload {
            text: answer.to_string(),
            feedback: None,
            is_correct: true,
        }],
    }
}

#[derive(Serialize)]
struct Claims {
    sub: String,
    sid: String,
    exp: usize,
    role: Option<String>,
}

pub fn bearer(user_id: Uuid, session_id: &str, role: Option<&str>) -> String {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
    let token = encode(
        &Header::default(),
        &Claims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            exp,
            role: role.map(str::to_string),
        },
        &EncodingKey::from_secret(
            assessment_backend::config::get_config()
                .jwt_secret
                .as_bytes(),
        ),
    )
    .expect("sign token");
    format!("Bearer {}", token)
}
