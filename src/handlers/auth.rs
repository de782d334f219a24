// src/handlers/auth.rs

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{LoginRequest, SignupRequest, User},
    utils::{
        files,
        hash::{hash_password, verify_password},
        session,
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it. The profile picture
/// reference, when supplied, must carry an allowed image extension.
/// Handle uniqueness is the UNIQUE index on users.username; a violation
/// surfaces as a duplicate-handle error rather than a 500.
pub async fn signup(
    State(pool): State<SqlitePool>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if let Some(picture) = payload.profile_picture.as_deref() {
        files::ensure_allowed_image(picture)?;
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password, profile_picture, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, username, password, profile_picture, created_at
        "#,
    )
    .bind(&payload.username)
    .bind(&hashed_password)
    .bind(payload.profile_picture.as_deref())
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateHandle(
            format!("Username '{}' already exists", payload.username),
        ),
        _ => {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and opens a session.
///
/// Verifies the username and password against the stored hash. On success a
/// session row is inserted and its opaque token returned to the client.
/// Unknown users and wrong passwords are indistinguishable to the caller,
/// and neither writes a session.
pub async fn login(
    State(pool): State<SqlitePool>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, profile_picture, created_at FROM users WHERE username = ?",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user
        .ok_or_else(|| AppError::InvalidCredentials("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::InvalidCredentials(
            "Invalid username or password".to_string(),
        ));
    }

    let token = session::create_session(&pool, user.id).await?;

    Ok(Json(json!({
        "token": token,
        "user": user,
    })))
}

/// Ends the current session, if any. Always succeeds; logging out without
/// a session (or twice with the same token) is a no-op.
pub async fn logout(
    State(pool): State<SqlitePool>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session::bearer_token(&headers) {
        session::destroy_session(&pool, &token).await?;
    }

    Ok(Json(json!({ "message": "Logged out" })))
}

/// Returns the user bound to the presented session token, or 401 when the
/// request carries no live session.
pub async fn check_auth(
    State(pool): State<SqlitePool>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = session::bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.username, u.password, u.profile_picture, u.created_at
        FROM users u
        JOIN sessions s ON s.user_id = u.id
        WHERE s.token = ?
        "#,
    )
    .bind(&token)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;

    Ok(Json(json!({ "user": user })))
}
