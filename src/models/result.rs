// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// A single ledger entry: the option picked for a question, `None` if unanswered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: i64,
    pub answer_id: Option<i64>,
}

impl UserAnswer {
    pub fn blank(question_id: i64) -> Self {
        Self {
            question_id,
            answer_id: None,
        }
    }
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    /// Must match the authenticated user.
    pub user_id: i64,

    pub answers: Vec<UserAnswer>,

    /// Seconds spent on the attempt.
    #[serde(default)]
    pub time_taken: Option<i32>,
}

/// Response of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub result_id: i64,
    pub score: i32,
    pub total_questions: i32,
}

/// Represents the 'quiz_results' table in the database.
/// Rows are written once per submission and never updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,
    pub score: i32,
    pub total_questions: i32,
    pub time_taken: i32,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Raw ledger as submitted.
    pub answers: Json<Vec<UserAnswer>>,
}

/// Aggregated struct for displaying a quiz leaderboard.
/// Represents a row joined from `users` and `quiz_results`.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: i32,
    pub total_questions: i32,
    pub time_taken: i32,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}
