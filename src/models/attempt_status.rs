use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{decode_text_enum, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Shown,
    Assessed,
    Error,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Shown => "shown",
            AttemptStatus::Assessed => "assessed",
            AttemptStatus::Error => "error",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shown" => Ok(AttemptStatus::Shown),
            "assessed" => Ok(AttemptStatus::Assessed),
            "error" => Ok(AttemptStatus::Error),
            other => Err(UnknownVariant::new("attempt status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusKey {
    pub session_id: String,
    pub course_id: i64,
    pub attempt_number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptStatusRecord {
    pub key: StatusKey,
    pub user_id: Uuid,
    /// Question ids in the order they were presented.
    pub question_ids: Vec<i64>,
    pub status: AttemptStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for AttemptStatusRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            key: StatusKey {
                session_id: row.try_get("session_id")?,
                course_id: row.try_get("course_id")?,
                attempt_number: row.try_get("attempt_number")?,
            },
            user_id: row.try_get("user_id")?,
            question_ids: row.try_get("question_ids")?,
            status: decode_text_enum(row, "status")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}
