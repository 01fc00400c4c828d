pub mod attempt_status;
pub mod enrollment;
pub mod question;
pub mod tag;
pub mod test_attempt;
pub mod test_config;
pub mod user;

use sqlx::{postgres::PgRow, Row};
use std::str::FromStr;

/// Reads a text column and parses it into one of the string-backed enums.
pub(crate) fn decode_text_enum<T>(row: &PgRow, column: &str) -> sqlx::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
