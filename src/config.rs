use crate::error::{Error, Result};
use crate::models::test_config::FeedbackLevel;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub session_ttl_minutes: i64,
    pub max_answer_options: usize,
    pub status_prune_interval_secs: u64,
    pub test_defaults: TestDefaults,
}

/// Policy applied to courses that never stored their own test configuration.
#[derive(Debug, Clone)]
pub struct TestDefaults {
    pub min_questions: i32,
    pub default_questions: i32,
    pub max_questions: i32,
    pub min_seconds_per_question: i64,
    pub feedback_level: FeedbackLevel,
}

impl Default for TestDefaults {
    fn default() -> Self {
        Self {
            min_questions: 1,
            default_questions: 20,
            max_questions: 30,
            min_seconds_per_question: 0,
            feedback_level: FeedbackLevel::TotalResultOnly,
        }
    }
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let fallback = TestDefaults::default();
        let test_defaults = TestDefaults {
            min_questions: get_env_or("DEFAULT_MIN_QUESTIONS", fallback.min_questions)?,
            default_questions: get_env_or("DEFAULT_NUM_QUESTIONS", fallback.default_questions)?,
            max_questions: get_env_or("DEFAULT_MAX_QUESTIONS", fallback.max_questions)?,
            min_seconds_per_question: get_env_or(
                "DEFAULT_MIN_SECONDS_PER_QUESTION",
                fallback.min_seconds_per_question,
            )?,
            feedback_level: get_env_or("DEFAULT_FEEDBACK_LEVEL", fallback.feedback_level)?,
        };

        if !(test_defaults.min_questions <= test_defaults.default_questions
            && test_defaults.default_questions <= test_defaults.max_questions)
        {
            return Err(Error::Config(
                "Default question counts must satisfy min <= default <= max".to_string(),
            ));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_or("DATABASE_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SECRET")?,
            session_ttl_minutes: get_env_or("SESSION_TTL_MINUTES", 120)?,
            max_answer_options: get_env_or("MAX_ANSWER_OPTIONS", 10)?,
            status_prune_interval_secs: get_env_or("STATUS_PRUNE_INTERVAL_SECS", 300)?,
            test_defaults,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
