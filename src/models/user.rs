use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownVariant;

/// Role of a user within one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Other,
    Student,
    NonEditingTeacher,
    Teacher,
    SysAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Other => "other",
            Role::Student => "student",
            Role::NonEditingTeacher => "non_editing_teacher",
            Role::Teacher => "teacher",
            Role::SysAdmin => "sys_admin",
        }
    }

    /// Teachers and administrators are never throttled and see full results.
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Role::NonEditingTeacher | Role::Teacher | Role::SysAdmin
        )
    }

    /// May change the question bank, tags and test policy of the course.
    pub fn can_edit_course(&self) -> bool {
        matches!(self, Role::Teacher | Role::SysAdmin)
    }

    /// May generate and take tests in the course.
    pub fn can_take_tests(&self) -> bool {
        !matches!(self, Role::Other)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "other" => Ok(Role::Other),
            "student" => Ok(Role::Student),
            "non_editing_teacher" => Ok(Role::NonEditingTeacher),
            "teacher" => Ok(Role::Teacher),
            "sys_admin" => Ok(Role::SysAdmin),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}
