use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::models::question::QuizType;
use crate::quiz::session::QuizSession;
use crate::services::ai::{ModelChoice, QuizRequester};

/// A user's most recently generated quiz.
///
/// The raw completion text is kept for raw-text display and TXT/CSV export.
/// `session` is populated only for MCQ output that parsed into at least one
/// question; other quiz types are display-only.
#[derive(Debug, Clone)]
pub struct ActiveQuiz {
    pub raw_text: String,
    pub quiz_type: QuizType,
    pub model: ModelChoice,
    pub session: Option<QuizSession>,
}

/// Per-user active quizzes, keyed by user ID. Each user's quiz is private to
/// that user; the map itself is the only shared structure.
pub type QuizStore = Arc<Mutex<HashMap<i64, ActiveQuiz>>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub requester: Arc<dyn QuizRequester>,
    pub quizzes: QuizStore,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, requester: Arc<dyn QuizRequester>) -> Self {
        Self {
            pool,
            config,
            requester,
            quizzes: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
