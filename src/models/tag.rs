use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub course_id: i64,
    pub text: String,
    /// Hidden tags keep their questions out of generated tests.
    pub hidden: bool,
}
