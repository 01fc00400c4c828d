use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

use super::{decode_text_enum, user::Role};

/// The part of a course membership the test engine reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub course_id: i64,
    pub user_id: Uuid,
    pub role: Role,
    pub last_access_time: Option<DateTime<Utc>>,
    pub num_questions_of_last_test: i32,
}

impl<'r> FromRow<'r, PgRow> for Enrollment {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            course_id: row.try_get("course_id")?,
            user_id: row.try_get("user_id")?,
            role: decode_text_enum(row, "role")?,
            last_access_time: row.try_get("last_access_time")?,
            num_questions_of_last_test: row.try_get("num_questions_of_last_test")?,
        })
    }
}
