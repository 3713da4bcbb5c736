// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::MAX_TIME_LIMIT_MINUTES;

/// Represents the 'quizzes' table in the database.
/// `question_count` is derived from the `questions` table when selected.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,

    /// Creator of the quiz. `None` once the owning account is gone.
    pub owner_id: Option<i64>,

    pub title: String,

    pub description: String,

    pub category: String,

    /// One of 'easy', 'medium' or 'hard'.
    pub difficulty: String,

    pub question_count: i64,

    /// Time limit in minutes.
    pub time_limit: i32,

    pub is_active: bool,

    /// Mean score percentage over all stored results.
    pub completion_rate: f64,

    /// Number of distinct users with at least one result.
    pub participant_count: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for listing quizzes.
#[derive(Debug, Default, Deserialize)]
pub struct QuizListParams {
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: String,
    #[validate(range(min = 1, max = MAX_TIME_LIMIT_MINUTES))]
    pub time_limit: i32,
    pub is_active: Option<bool>,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: Option<String>,
    #[validate(range(min = 1, max = MAX_TIME_LIMIT_MINUTES))]
    pub time_limit: Option<i32>,
    pub is_active: Option<bool>,
}

pub const DIFFICULTIES: [&str; 3] = ["easy", "medium", "hard"];

pub(crate) fn validate_difficulty(difficulty: &str) -> Result<(), validator::ValidationError> {
    if !DIFFICULTIES.contains(&difficulty) {
        return Err(validator::ValidationError::new("unknown_difficulty"));
    }
    Ok(())
}
