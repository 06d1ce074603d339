// src/models/score.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'scores' table in the database.
/// One row is appended per quiz submission; rows are never updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub id: i64,
    pub user_id: i64,
    pub score: i64,
    pub total_questions: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated struct for displaying the leaderboard.
/// One row per user, ranked by their best percentage.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    pub percentage: f64,
    pub score: i64,
    pub total_questions: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub attempts: i64,
}
