pub mod config;
pub mod context;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    attempt_service::AttemptService,
    generator_service::GeneratorService,
    pacing_service::{EnrollmentStore, PacingService, PgEnrollmentStore},
    question_bank_service::QuestionBankService,
    result_service::ResultService,
    test_config_service::TestConfigService,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub enrollments: Arc<dyn EnrollmentStore>,
    pub question_bank: QuestionBankService,
    pub test_configs: TestConfigService,
    pub results: ResultService,
    pub generator: GeneratorService,
    pub attempts: AttemptService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let enrollments: Arc<dyn EnrollmentStore> = Arc::new(PgEnrollmentStore::new(pool.clone()));
        Self::with_enrollments(pool, enrollments)
    }

    /// Builds the services around an externally provided enrollment store.
    pub fn with_enrollments(pool: PgPool, enrollments: Arc<dyn EnrollmentStore>) -> Self {
        let config = crate::config::get_config();

        let question_bank = QuestionBankService::new(pool.clone(), config.max_answer_options);
        let test_configs = TestConfigService::new(pool.clone(), config.test_defaults.clone());
        let results = ResultService::new(pool.clone());
        let pacing = PacingService::new(enrollments.clone());
        let generator = GeneratorService::new(
            pool.clone(),
            question_bank.clone(),
            test_configs.clone(),
            pacing,
            config.session_ttl_minutes,
        );
        let attempts = AttemptService::new(
            pool.clone(),
            question_bank.clone(),
            results.clone(),
            test_configs.clone(),
        );

        Self {
            pool,
            enrollments,
            question_bank,
            test_configs,
            results,
            generator,
            attempts,
        }
    }
}
