// src/handlers/users.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        outfit::{OutfitWithRating, UserOutfitParams},
        user::{UpdateUserRequest, User},
    },
    utils::{files, hash::hash_password, session::SessionUser},
};

/// Public user lookup by id.
pub async fn get_user(
    State(pool): State<SqlitePool>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, profile_picture, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Updates the current user's profile. Only the user themselves may do so.
///
/// Partial semantics: omitted (or blank) fields keep their current value.
/// A handle change re-checks uniqueness through the same UNIQUE index that
/// guards signup; a password change is re-hashed before storage.
pub async fn update_user(
    State(pool): State<SqlitePool>,
    Extension(session): Extension<SessionUser>,
    Path(user_id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if session.user_id != user_id {
        return Err(AppError::Unauthorized(
            "You are not authorized to modify this user".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, profile_picture, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let username = payload
        .username
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .unwrap_or(user.username);

    let password = match payload.password.as_deref().filter(|v| !v.is_empty()) {
        Some(plaintext) => hash_password(plaintext)?,
        None => user.password,
    };

    let profile_picture = match payload
        .profile_picture
        .as_deref()
        .filter(|v| !v.trim().is_empty())
    {
        Some(picture) => {
            files::ensure_allowed_image(picture)?;
            Some(picture.to_string())
        }
        None => user.profile_picture,
    };

    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET username = ?, password = ?, profile_picture = ?
        WHERE id = ?
        RETURNING id, username, password, profile_picture, created_at
        "#,
    )
    .bind(&username)
    .bind(&password)
    .bind(profile_picture.as_deref())
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::DuplicateHandle(format!("Username '{}' already taken", username))
        }
        _ => {
            tracing::error!("Failed to update user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok(Json(updated))
}

/// Lists one user's outfits, optionally filtered by exact category.
/// Restricted to the user themselves.
pub async fn list_user_outfits(
    State(pool): State<SqlitePool>,
    Extension(session): Extension<SessionUser>,
    Path(user_id): Path<i64>,
    Query(params): Query<UserOutfitParams>,
) -> Result<impl IntoResponse, AppError> {
    if session.user_id != user_id {
        return Err(AppError::Unauthorized(
            "You are not authorized to view these outfits".to_string(),
        ));
    }

    let outfits = sqlx::query_as::<_, OutfitWithRating>(
        r#"
        SELECT o.id, o.title, o.description, o.category, o.image, o.user_id, o.created_at,
               AVG(r.score) AS average_rating
        FROM outfits o
        LEFT JOIN ratings r ON r.outfit_id = o.id
        WHERE o.user_id = ?1
          AND (?2 IS NULL OR o.category = ?2)
        GROUP BY o.id
        ORDER BY o.id
        "#,
    )
    .bind(user_id)
    .bind(&params.category)
    .fetch_all(&pool)
    .await?;

    Ok(Json(outfits))
}

/// Current user's profile: the user record plus everything they posted.
pub async fn get_profile(
    State(pool): State<SqlitePool>,
    Extension(session): Extension<SessionUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, profile_picture, created_at FROM users WHERE id = ?",
    )
    .bind(session.user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let outfits = sqlx::query_as::<_, OutfitWithRating>(
        r#"
        SELECT o.id, o.title, o.description, o.category, o.image, o.user_id, o.created_at,
               AVG(r.score) AS average_rating
        FROM outfits o
        LEFT JOIN ratings r ON r.outfit_id = o.id
        WHERE o.user_id = ?
        GROUP BY o.id
        ORDER BY o.id
        "#,
    )
    .bind(session.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "user": user,
        "outfits": outfits,
    })))
}
