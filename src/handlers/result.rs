// src/handlers/result.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{error::AppError, models::result::QuizResult, utils::jwt::Claims};

/// Fetches one stored result.
/// Visible to the user who produced it and to admins.
pub async fn get_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query_as::<_, QuizResult>(
        r#"
        SELECT id, quiz_id, user_id, score, total_questions, time_taken, completed_at, answers
        FROM quiz_results
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Result not found".to_string()))?;

    if !claims.can_manage(Some(result.user_id))? {
        return Err(AppError::Forbidden("Result belongs to another user".to_string()));
    }

    Ok(Json(result))
}

/// Lists the caller's results, most recent first.
pub async fn list_my_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let results = sqlx::query_as::<_, QuizResult>(
        r#"
        SELECT id, quiz_id, user_id, score, total_questions, time_taken, completed_at, answers
        FROM quiz_results
        WHERE user_id = $1
        ORDER BY completed_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(results))
}
