pub mod attempt_service;
pub mod generator_service;
pub mod pacing_service;
pub mod question_bank_service;
pub mod result_service;
pub mod scoring_service;
pub mod test_config_service;
