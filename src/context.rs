use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::user::Role;
use crate::services::pacing_service::EnrollmentStore;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Who is asking, in which session, with which course role, and when.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub session_id: String,
    pub role: Role,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    /// Resolves the caller's role in `course_id`. Users with no enrollment get [`Role::Other`].
    pub async fn for_course(
        claims: &Claims,
        enrollments: &dyn EnrollmentStore,
        course_id: i64,
    ) -> Result<Self> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| Error::Unauthorized("Token subject is not a user id".to_string()))?;
        if claims.sid.trim().is_empty() {
            return Err(Error::Unauthorized("Token carries no session".to_string()));
        }

        let role = if claims.is_sys_admin() {
            Role::SysAdmin
        } else {
            enrollments
                .get_enrollment(course_id, user_id)
                .await?
                .map(|e| e.role)
                .unwrap_or(Role::Other)
        };

        Ok(Self {
            user_id,
            session_id: claims.sid.clone(),
            role,
            now: crate::utils::time::now(),
        })
    }

    pub fn require_course_editor(&self) -> Result<()> {
        if self.role.can_edit_course() {
            Ok(())
        } else {
            Err(Error::Forbidden(
                "Only course teachers may change the question bank".to_string(),
            ))
        }
    }

    pub fn require_privileged(&self) -> Result<()> {
        if self.role.is_privileged() {
            Ok(())
        } else {
            Err(Error::Forbidden("Teacher access required".to_string()))
        }
    }

    pub fn require_test_taker(&self) -> Result<()> {
        if self.role.can_take_tests() {
            Ok(())
        } else {
            Err(Error::Forbidden(
                "You are not a member of this course".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enrollment::Enrollment;
    use crate::services::pacing_service::MockEnrollmentStore;

    fn claims(sub: &str, role: Option<&str>) -> Claims {
        Claims {
            sub: sub.to_string(),
            sid: "session-1".to_string(),
            exp: 0,
            role: role.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn course_role_comes_from_the_enrollment() {
        let user = Uuid::new_v4();
        let mut store = MockEnrollmentStore::new();
        store.expect_get_enrollment().returning(move |course_id, user_id| {
            Ok(Some(Enrollment {
                course_id,
                user_id,
                role: Role::Teacher,
                last_access_time: None,
                num_questions_of_last_test: 0,
            }))
        });

        let ctx = RequestContext::for_course(&claims(&user.to_string(), None), &store, 4)
            .await
            .unwrap();
        assert_eq!(ctx.role, Role::Teacher);
        assert_eq!(ctx.session_id, "session-1");
        assert!(ctx.require_course_editor().is_ok());
    }

    #[tokio::test]
    async fn unenrolled_users_cannot_take_tests() {
        let mut store = MockEnrollmentStore::new();
        store.expect_get_enrollment().returning(|_, _| Ok(None));

        let ctx = RequestContext::for_course(&claims(&Uuid::new_v4().to_string(), None), &store, 4)
            .await
            .unwrap();
        assert_eq!(ctx.role, Role::Other);
        assert!(matches!(ctx.require_test_taker(), Err(Error::Forbidden(_))));
    }

    #[tokio::test]
    async fn sys_admin_claim_skips_the_lookup() {
        let mut store = MockEnrollmentStore::new();
        store.expect_get_enrollment().times(0);

        let ctx = RequestContext::for_course(
            &claims(&Uuid::new_v4().to_string(), Some("sys_admin")),
            &store,
            4,
        )
        .await
        .unwrap();
        assert_eq!(ctx.role, Role::SysAdmin);
    }

    #[tokio::test]
    async fn malformed_subject_is_unauthorized() {
        let store = MockEnrollmentStore::new();
        let result = RequestContext::for_course(&claims("tester", None), &store, 4).await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }
}
