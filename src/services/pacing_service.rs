use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::models::enrollment::Enrollment;
use crate::models::test_config::TestConfig;
use crate::models::user::Role;
use crate::utils::time::add_seconds_per_item;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

/// Access to the enrollment record owned by the course platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn get_enrollment(&self, course_id: i64, user_id: Uuid) -> Result<Option<Enrollment>>;
}

const ENROLLMENT_COLUMNS: &str =
    "course_id, user_id, role, last_access_time, num_questions_of_last_test";

#[derive(Clone)]
pub struct PgEnrollmentStore {
    pool: PgPool,
}

impl PgEnrollmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentStore for PgEnrollmentStore {
    async fn get_enrollment(&self, course_id: i64, user_id: Uuid) -> Result<Option<Enrollment>> {
        let sql = format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM course_enrollments WHERE course_id = $1 AND user_id = $2"
        );
        let enrollment = sqlx::query_as::<_, Enrollment>(&sql)
            .bind(course_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(enrollment)
    }
}

/// Earliest instant at which the user may generate another test, if the last test constrains it.
pub fn next_allowed_time(
    enrollment: &Enrollment,
    min_seconds_per_question: i64,
) -> Option<DateTime<Utc>> {
    enrollment.last_access_time.map(|last| {
        add_seconds_per_item(
            last,
            enrollment.num_questions_of_last_test as i64,
            min_seconds_per_question,
        )
    })
}

pub fn check(
    role: Role,
    enrollment: Option<&Enrollment>,
    config: &TestConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    if role.is_privileged() {
        return Ok(());
    }
    match enrollment.and_then(|e| next_allowed_time(e, config.min_seconds_per_question)) {
        Some(until) if now < until => Err(Error::PacingBlocked { until }),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct PacingService {
    store: Arc<dyn EnrollmentStore>,
}

impl PacingService {
    pub fn new(store: Arc<dyn EnrollmentStore>) -> Self {
        Self { store }
    }

    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        course_id: i64,
        config: &TestConfig,
    ) -> Result<()> {
        if ctx.role.is_privileged() {
            return Ok(());
        }
        let enrollment = self.store.get_enrollment(course_id, ctx.user_id).await?;
        check(ctx.role, enrollment.as_ref(), config, ctx.now).map_err(|e| {
            tracing::info!(user_id = %ctx.user_id, course_id, "Test generation blocked by pacing");
            e
        })
    }

    /// Starts a new pacing window on the caller's transaction. Only students are tracked.
    ///
    /// The update only applies while the previous window is over, so of two
    /// generations racing past [`PacingService::authorize`] one gets
    /// [`Error::PacingBlocked`].
    pub async fn record_generation(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        course_id: i64,
        num_questions: i32,
        config: &TestConfig,
    ) -> Result<()> {
        if ctx.role != Role::Student {
            return Ok(());
        }

        let result = sqlx::query(
            r#"
            UPDATE course_enrollments
            SET last_access_time = $3, num_questions_of_last_test = $4
            WHERE course_id = $1 AND user_id = $2
              AND (last_access_time IS NULL
                   OR last_access_time
                      + make_interval(secs => num_questions_of_last_test * $5::DOUBLE PRECISION)
                      <= $3)
            "#,
        )
        .bind(course_id)
        .bind(ctx.user_id)
        .bind(ctx.now)
        .bind(num_questions)
        .bind(config.min_seconds_per_question as f64)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 1 {
            return Ok(());
        }

        let sql = format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM course_enrollments WHERE course_id = $1 AND user_id = $2"
        );
        let enrollment = sqlx::query_as::<_, Enrollment>(&sql)
            .bind(course_id)
            .bind(ctx.user_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "User {} is not enrolled in course {}",
                    ctx.user_id, course_id
                ))
            })?;

        let until = next_allowed_time(&enrollment, config.min_seconds_per_question)
            .unwrap_or(ctx.now);
        tracing::info!(user_id = %ctx.user_id, course_id, %until, "Concurrent generation lost the pacing window");
        Err(Error::PacingBlocked { until })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_config::FeedbackLevel;
    use chrono::Duration;

    fn config(min_seconds_per_question: i64) -> TestConfig {
        TestConfig {
            course_id: 1,
            min_questions: 1,
            default_questions: 10,
            max_questions: 20,
            min_seconds_per_question,
            feedback_level: FeedbackLevel::TotalResultOnly,
        }
    }

    fn enrollment(last: Option<DateTime<Utc>>, n: i32) -> Enrollment {
        Enrollment {
            course_id: 1,
            user_id: Uuid::nil(),
            role: Role::Student,
            last_access_time: last,
            num_questions_of_last_test: n,
        }
    }

    fn ctx(role: Role, now: DateTime<Utc>) -> RequestContext {
        RequestContext {
            user_id: Uuid::nil(),
            session_id: "s1".into(),
            role,
            now,
        }
    }

    #[test]
    fn pacing_scenario_unblocks_exactly_on_time() {
        let t = Utc::now();
        let e = enrollment(Some(t), 10);
        let cfg = config(60);

        match check(Role::Student, Some(&e), &cfg, t + Duration::seconds(599)) {
            Err(Error::PacingBlocked { until }) => assert_eq!(until, t + Duration::seconds(600)),
            other => panic!("expected a block, got {:?}", other),
        }
        assert!(check(Role::Student, Some(&e), &cfg, t + Duration::seconds(600)).is_ok());
    }

    #[test]
    fn privileged_roles_are_never_blocked() {
        let t = Utc::now();
        let e = enrollment(Some(t), 10);
        for role in [Role::NonEditingTeacher, Role::Teacher, Role::SysAdmin] {
            assert!(check(role, Some(&e), &config(60), t).is_ok());
        }
        assert!(check(Role::Other, Some(&e), &config(60), t).is_err());
    }

    #[test]
    fn first_test_is_never_blocked() {
        let now = Utc::now();
        assert!(check(Role::Student, None, &config(60), now).is_ok());
        assert!(check(Role::Student, Some(&enrollment(None, 0)), &config(60), now).is_ok());
    }

    #[tokio::test]
    async fn authorize_reads_the_enrollment_record() {
        let t = Utc::now();
        let mut store = MockEnrollmentStore::new();
        store
            .expect_get_enrollment()
            .times(1)
            .returning(move |_, _| Ok(Some(enrollment(Some(t), 5))));
        let service = PacingService::new(Arc::new(store));

        let result = service
            .authorize(&ctx(Role::Student, t + Duration::seconds(10)), 1, &config(60))
            .await;
        assert!(matches!(result, Err(Error::PacingBlocked { .. })));
    }

    #[tokio::test]
    async fn teachers_skip_the_store_entirely() {
        let mut store = MockEnrollmentStore::new();
        store.expect_get_enrollment().times(0);
        let service = PacingService::new(Arc::new(store));
        let teacher = ctx(Role::Teacher, Utc::now());

        assert!(service.authorize(&teacher, 1, &config(60)).await.is_ok());
    }
}
