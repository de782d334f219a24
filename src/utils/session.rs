// src/utils/session.rs

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Identity resolved from a server-held session row.
/// Injected into request extensions by `auth_middleware` for handlers to use.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionUser {
    pub token: String,
    pub user_id: i64,
}

/// Creates a session for the user and returns its opaque token.
/// The token is a random UUID; it carries no claims, it is only a key
/// into the `sessions` table.
pub async fn create_session(pool: &SqlitePool, user_id: i64) -> Result<String, AppError> {
    let token = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(chrono::Utc::now())
        .execute(pool)
        .await?;

    Ok(token)
}

/// Deletes a session row. Deleting an unknown token is a no-op, which makes
/// logout idempotent.
pub async fn destroy_session(pool: &SqlitePool, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

/// Extracts the opaque session token from the 'Authorization: Bearer' header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Resolves a token to its session, or `None` if no such session exists.
pub async fn lookup_session(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<SessionUser>, AppError> {
    let session = sqlx::query_as::<_, SessionUser>(
        "SELECT token, user_id FROM sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(session)
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, resolves the bearer token against the session store.
/// If a session exists, injects `SessionUser` into the request extensions
/// for handlers to use. Otherwise returns 401 Unauthorized.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let session = lookup_session(&state.pool, &token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
