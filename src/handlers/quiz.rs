// src/handlers/quiz.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config::LEADERBOARD_SIZE,
    error::AppError,
    models::{
        question::{CreateQuestionRequest, QuestionOptionRow, assemble_questions},
        quiz::{CreateQuizRequest, Quiz, QuizListParams, UpdateQuizRequest},
        result::{LeaderboardEntry, SubmitQuizRequest, SubmitQuizResponse, UserAnswer},
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Base projection for `Quiz`; the question count is derived.
const QUIZ_SELECT: &str = r#"
    SELECT
        q.id,
        q.owner_id,
        q.title,
        q.description,
        q.category,
        q.difficulty,
        (SELECT COUNT(*) FROM questions qs WHERE qs.quiz_id = q.id) AS question_count,
        q.time_limit,
        q.is_active,
        q.completion_rate,
        q.participant_count,
        q.created_at
    FROM quizzes q
"#;

/// Question id -> ids of the options flagged correct.
type AnswerKey = HashMap<i64, HashSet<i64>>;

async fn fetch_quiz(pool: &PgPool, quiz_id: i64) -> Result<Quiz, AppError> {
    let sql = format!("{QUIZ_SELECT} WHERE q.id = $1");

    sqlx::query_as::<_, Quiz>(&sql)
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Only the quiz owner or an admin may modify a quiz.
async fn ensure_can_edit(pool: &PgPool, quiz_id: i64, claims: &Claims) -> Result<(), AppError> {
    let (owner_id,): (Option<i64>,) = sqlx::query_as("SELECT owner_id FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if claims.can_manage(owner_id)? {
        Ok(())
    } else {
        Err(AppError::Forbidden("You do not own this quiz".to_string()))
    }
}

fn build_answer_key(rows: Vec<(i64, Option<i64>)>) -> AnswerKey {
    let mut key = AnswerKey::new();
    for (question_id, option_id) in rows {
        let correct = key.entry(question_id).or_default();
        correct.extend(option_id);
    }
    key
}

/// Counts the questions whose selected option is flagged correct.
///
/// Questions outside the key are ignored and only the first answer per question counts.
/// No single-correct-option rule is assumed: any correct option scores.
fn score_answers(answers: &[UserAnswer], key: &AnswerKey) -> i32 {
    let mut seen = HashSet::new();

    answers
        .iter()
        .filter(|answer| seen.insert(answer.question_id))
        .filter(|answer| match (key.get(&answer.question_id), answer.answer_id) {
            (Some(correct), Some(answer_id)) => correct.contains(&answer_id),
            _ => false,
        })
        .count() as i32
}

/// Lists active quizzes, newest first.
/// Supports optional `category` and `difficulty` filters.
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        "{QUIZ_SELECT}
        WHERE q.is_active
          AND ($1::TEXT IS NULL OR q.category = $1)
          AND ($2::TEXT IS NULL OR q.difficulty = $2)
        ORDER BY q.created_at DESC"
    );

    let quizzes = sqlx::query_as::<_, Quiz>(&sql)
        .bind(params.category)
        .bind(params.difficulty)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list quizzes: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(quizzes))
}

pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_quiz(&pool, id).await?))
}

/// Creates a quiz owned by the caller.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO quizzes (owner_id, title, description, category, difficulty, time_limit, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.title)
    .bind(clean_html(&payload.description))
    .bind(&payload.category)
    .bind(&payload.difficulty)
    .bind(payload.time_limit)
    .bind(payload.is_active.unwrap_or(true))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(quiz_id = id, owner_id = user_id, "quiz created");

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Updates quiz fields that are present in the payload.
/// Owner or admin only.
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_can_edit(&pool, id, &claims).await?;

    sqlx::query(
        r#"
        UPDATE quizzes SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            category = COALESCE($3, category),
            difficulty = COALESCE($4, difficulty),
            time_limit = COALESCE($5, time_limit),
            is_active = COALESCE($6, is_active)
        WHERE id = $7
        "#,
    )
    .bind(payload.title)
    .bind(payload.description.as_deref().map(clean_html))
    .bind(payload.category)
    .bind(payload.difficulty)
    .bind(payload.time_limit)
    .bind(payload.is_active)
    .bind(id)
    .execute(&pool)
    .await?;

    Ok(Json(fetch_quiz(&pool, id).await?))
}

/// Deletes a quiz and its results. Its questions stay in the bank, detached.
/// Owner or admin only.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_can_edit(&pool, id, &claims).await?;

    sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!(quiz_id = id, "quiz deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the quiz's questions in insertion order, without correctness flags.
pub async fn get_questions(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_quiz(&pool, id).await?;

    let rows = sqlx::query_as::<_, QuestionOptionRow>(
        r#"
        SELECT
            qs.id AS question_id,
            qs.quiz_id,
            qs.text,
            qs.code_snippet,
            qs.category,
            qs.difficulty,
            o.id AS option_id,
            o.text AS option_text
        FROM questions qs
        LEFT JOIN options o ON o.question_id = qs.id
        WHERE qs.quiz_id = $1
        ORDER BY qs.id, o.id
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(assemble_questions(rows)))
}

/// Adds a question with its options to a quiz.
/// Owner or admin only.
pub async fn add_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_can_edit(&pool, quiz_id, &claims).await?;

    let mut tx = pool.begin().await?;

    let (question_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO questions (quiz_id, text, code_snippet, category, difficulty)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(quiz_id)
    .bind(&payload.text)
    .bind(&payload.code_snippet)
    .bind(&payload.category)
    .bind(&payload.difficulty)
    .fetch_one(&mut *tx)
    .await?;

    for option in &payload.options {
        sqlx::query("INSERT INTO options (question_id, text, is_correct) VALUES ($1, $2, $3)")
            .bind(question_id)
            .bind(&option.text)
            .bind(option.is_correct)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": question_id })),
    ))
}

/// Scores a submitted ledger and stores the result.
///
/// * The body's `userId` must match the token subject.
/// * Score = number of questions answered with an option flagged correct.
/// * Refreshes the quiz's participant count and completion rate in the same transaction.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    if req.user_id != user_id {
        return Err(AppError::Forbidden(
            "Cannot submit on behalf of another user".to_string(),
        ));
    }

    if req.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let quiz = fetch_quiz(&pool, quiz_id).await?;
    if !quiz.is_active {
        return Err(AppError::BadRequest("Quiz is not active".to_string()));
    }

    let key_rows: Vec<(i64, Option<i64>)> = sqlx::query_as(
        r#"
        SELECT qs.id, o.id
        FROM questions qs
        LEFT JOIN options o ON o.question_id = qs.id AND o.is_correct
        WHERE qs.quiz_id = $1
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    let key = build_answer_key(key_rows);
    if key.is_empty() {
        return Err(AppError::BadRequest("Quiz has no questions".to_string()));
    }

    let score = score_answers(&req.answers, &key);
    let total_questions = key.len() as i32;
    let time_taken = req.time_taken.unwrap_or(0).max(0);

    let mut tx = pool.begin().await?;

    let (result_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO quiz_results (quiz_id, user_id, score, total_questions, time_taken, answers)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(quiz_id)
    .bind(user_id)
    .bind(score)
    .bind(total_questions)
    .bind(time_taken)
    .bind(SqlJson(req.answers.clone()))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert quiz result: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    sqlx::query(
        r#"
        UPDATE quizzes SET
            participant_count = (
                SELECT COUNT(DISTINCT user_id) FROM quiz_results WHERE quiz_id = $1
            ),
            completion_rate = COALESCE((
                SELECT AVG(score::FLOAT8 * 100 / NULLIF(total_questions, 0))
                FROM quiz_results WHERE quiz_id = $1
            ), 0)
        WHERE id = $1
        "#,
    )
    .bind(quiz_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(quiz_id, user_id, result_id, score, total_questions, "quiz submitted");

    Ok((
        StatusCode::CREATED,
        Json(SubmitQuizResponse {
            result_id,
            score,
            total_questions,
        }),
    ))
}

/// Best result per user for one quiz, highest score first, faster time breaking ties.
pub async fn get_leaderboard(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_quiz(&pool, id).await?;

    let leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT username, score, total_questions, time_taken, completed_at
        FROM (
            SELECT DISTINCT ON (r.user_id)
                u.username, r.score, r.total_questions, r.time_taken, r.completed_at
            FROM quiz_results r
            JOIN users u ON r.user_id = u.id
            WHERE r.quiz_id = $1
            ORDER BY r.user_id, r.score DESC, r.time_taken ASC
        ) best
        ORDER BY score DESC, time_taken ASC
        LIMIT $2
        "#,
    )
    .bind(id)
    .bind(LEADERBOARD_SIZE)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(leaderboard))
}
