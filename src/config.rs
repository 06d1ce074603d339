// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Inclusive bounds for the requested number of questions per quiz.
pub const MIN_QUESTION_COUNT: u8 = 1;
pub const MAX_QUESTION_COUNT: u8 = 20;

/// Number of rows returned by the leaderboard query.
pub const LEADERBOARD_LIMIT: i64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub groq_api_key: String,
    pub groq_api_base: String,
    /// Upper bound for a single call to the inference API, in seconds.
    pub generation_timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:quizgen.db".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let groq_api_key = env::var("GROQ_API_KEY")
            .expect("GROQ_API_KEY must be set");

        let groq_api_base = env::var("GROQ_API_BASE")
            .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string());

        let generation_timeout_secs = env::var("GENERATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            groq_api_key,
            groq_api_base,
            generation_timeout_secs,
            rust_log,
        }
    }
}
