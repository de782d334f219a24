// src/handlers/search.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{error::AppError, models::outfit::OutfitWithRating, models::user::User};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Combined directory search: users whose handle contains the query, and
/// outfits whose title, category or description contains it, all
/// case-insensitive. No match is an empty pair of arrays, not an error.
pub async fn search(
    State(pool): State<SqlitePool>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(AppError::BadRequest("Search query is required".to_string()));
    }

    let pattern = format!("%{}%", query.to_lowercase());

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, profile_picture, created_at
        FROM users
        WHERE lower(username) LIKE ?1
        ORDER BY id
        "#,
    )
    .bind(&pattern)
    .fetch_all(&pool)
    .await?;

    let outfits = sqlx::query_as::<_, OutfitWithRating>(
        r#"
        SELECT o.id, o.title, o.description, o.category, o.image, o.user_id, o.created_at,
               AVG(r.score) AS average_rating
        FROM outfits o
        LEFT JOIN ratings r ON r.outfit_id = o.id
        WHERE lower(o.title) LIKE ?1
           OR lower(o.category) LIKE ?1
           OR lower(o.description) LIKE ?1
        GROUP BY o.id
        ORDER BY o.id
        "#,
    )
    .bind(&pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "users": users,
        "outfits": outfits,
    })))
}
