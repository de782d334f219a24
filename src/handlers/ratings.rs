// src/handlers/ratings.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::rating::{Rating, SubmitRatingRequest},
    utils::session::SessionUser,
};

/// Submits a rating for an outfit.
///
/// The outfit must exist; the check happens eagerly, before the insert,
/// rather than letting the dangling reference surface at read time. A user
/// may rate the same outfit any number of times (their own included) and
/// every score counts independently in the mean.
pub async fn submit_rating(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<SubmitRatingRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    sqlx::query_scalar::<_, i64>("SELECT id FROM outfits WHERE id = ?")
        .bind(payload.outfit_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Outfit not found".to_string()))?;

    let rating = sqlx::query_as::<_, Rating>(
        r#"
        INSERT INTO ratings (score, user_id, outfit_id)
        VALUES (?, ?, ?)
        RETURNING id, score, user_id, outfit_id
        "#,
    )
    .bind(payload.score)
    .bind(user.user_id)
    .bind(payload.outfit_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to submit rating: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(rating)))
}
