// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RegisterRequest, TokenResponse, UserRecord},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Creates a plain user account. Returns 201 with the public profile.
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, UserRecord>(
        r#"
        INSERT INTO users (username, password)
        VALUES ($1, $2)
        RETURNING id, username, password, role, created_at
        "#,
    )
    .bind(&payload.username)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        let duplicate = e
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == UNIQUE_VIOLATION);
        if duplicate {
            AppError::Conflict(format!("Username '{}' is taken", payload.username))
        } else {
            AppError::from(e)
        }
    })?;

    tracing::info!(user_id = user.id, "account registered");

    Ok((StatusCode::CREATED, Json(user.profile())))
}

/// Exchanges credentials for a bearer token.
/// Unknown users and wrong passwords get the same answer.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let invalid = || AppError::AuthError("Invalid username or password".to_string());

    let user = sqlx::query_as::<_, UserRecord>(
        "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        tracing::debug!(user_id = user.id, "password mismatch");
        return Err(invalid());
    }

    let role = user.role();
    let token = sign_jwt(user.id, role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        user_id: user.id,
        role,
    }))
}
