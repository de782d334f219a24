// src/handlers/outfits.rs

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::outfit::{Outfit, OutfitListParams, OutfitWithRating},
    state::AppState,
    utils::{files, session::SessionUser},
};

const MAX_TITLE_LEN: usize = 100;

/// An image part lifted out of a multipart body.
struct UploadedImage {
    file_name: String,
    bytes: Bytes,
}

/// Text and image parts of an outfit form. Create requires all of them;
/// update treats each as optional.
#[derive(Default)]
struct OutfitForm {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    image: Option<UploadedImage>,
}

fn bad_part(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Malformed multipart body: {}", e))
}

async fn read_outfit_form(multipart: &mut Multipart) -> Result<OutfitForm, AppError> {
    let mut form = OutfitForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_part)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = Some(field.text().await.map_err(bad_part)?),
            "description" => form.description = Some(field.text().await.map_err(bad_part)?),
            "category" => form.category = Some(field.text().await.map_err(bad_part)?),
            "image" => {
                let file_name = field
                    .file_name()
                    .ok_or_else(|| {
                        AppError::InvalidFile("Image upload is missing a filename".to_string())
                    })?
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_part)?;
                form.image = Some(UploadedImage { file_name, bytes });
            }
            _ => {}
        }
    }

    Ok(form)
}

/// A field supplied in an update must not be blank; a missing field keeps
/// its current value.
fn merge_field(supplied: Option<String>, current: String, name: &str) -> Result<String, AppError> {
    match supplied {
        Some(value) if value.trim().is_empty() => Err(AppError::BadRequest(format!(
            "Field '{}' must not be empty",
            name
        ))),
        Some(value) => Ok(value),
        None => Ok(current),
    }
}

fn ensure_title_fits(title: &str) -> Result<(), AppError> {
    if title.len() > MAX_TITLE_LEN {
        return Err(AppError::BadRequest(format!(
            "Title length must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

const OUTFIT_WITH_RATING: &str = r#"
    SELECT o.id, o.title, o.description, o.category, o.image, o.user_id, o.created_at,
           AVG(r.score) AS average_rating
    FROM outfits o
    LEFT JOIN ratings r ON r.outfit_id = o.id
"#;

/// Lists the shared catalog, optionally filtered by a case-insensitive
/// substring over title or description. Each item carries its average
/// rating (null when unrated). Insertion order, ascending id.
pub async fn list_outfits(
    State(pool): State<SqlitePool>,
    Query(params): Query<OutfitListParams>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = params
        .search
        .as_ref()
        .map(|q| format!("%{}%", q.to_lowercase()));

    let outfits = sqlx::query_as::<_, OutfitWithRating>(&format!(
        r#"
        {OUTFIT_WITH_RATING}
        WHERE (?1 IS NULL OR lower(o.title) LIKE ?1 OR lower(o.description) LIKE ?1)
        GROUP BY o.id
        ORDER BY o.id
        "#
    ))
    .bind(&pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(outfits))
}

/// Gets a single outfit with its average rating.
pub async fn get_outfit(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let outfit = sqlx::query_as::<_, OutfitWithRating>(&format!(
        r#"
        {OUTFIT_WITH_RATING}
        WHERE o.id = ?1
        GROUP BY o.id
        "#
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Outfit not found".to_string()))?;

    Ok(Json(outfit))
}

/// Creates an outfit from a multipart form (title, description, category,
/// image). Requires a session. The image blob is stored before the metadata
/// row is inserted, so a storage fault never leaves metadata pointing at a
/// missing blob.
pub async fn create_outfit(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_outfit_form(&mut multipart).await?;

    let missing = || AppError::BadRequest("Missing required fields".to_string());
    let title = form.title.filter(|v| !v.trim().is_empty()).ok_or_else(missing)?;
    let description = form
        .description
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(missing)?;
    let category = form
        .category
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(missing)?;
    let image = form.image.ok_or_else(missing)?;

    ensure_title_fits(&title)?;
    files::ensure_allowed_image(&image.file_name)?;

    let key = files::stored_filename(user.user_id, &image.file_name);
    state.blobs.put(&key, &image.bytes).await?;

    let outfit = sqlx::query_as::<_, Outfit>(
        r#"
        INSERT INTO outfits (title, description, category, image, user_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, title, description, category, image, user_id, created_at
        "#,
    )
    .bind(&title)
    .bind(&description)
    .bind(&category)
    .bind(&key)
    .bind(user.user_id)
    .bind(Utc::now())
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create outfit: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(outfit)))
}

/// Partially updates an outfit. Owner only. Supplied fields replace, missing
/// fields retain their value. A replaced image's old blob is released
/// best-effort after the metadata commit.
pub async fn update_outfit(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let existing = sqlx::query_as::<_, Outfit>(
        "SELECT id, title, description, category, image, user_id, created_at FROM outfits WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Outfit not found".to_string()))?;

    if existing.user_id != user.user_id {
        return Err(AppError::Unauthorized(
            "You are not authorized to modify this outfit".to_string(),
        ));
    }

    let form = read_outfit_form(&mut multipart).await?;

    let title = merge_field(form.title, existing.title, "title")?;
    let description = merge_field(form.description, existing.description, "description")?;
    let category = merge_field(form.category, existing.category, "category")?;
    ensure_title_fits(&title)?;

    let mut new_key = None;
    if let Some(image) = &form.image {
        files::ensure_allowed_image(&image.file_name)?;
        let key = files::stored_filename(user.user_id, &image.file_name);
        state.blobs.put(&key, &image.bytes).await?;
        new_key = Some(key);
    }

    let image_key = new_key.clone().or_else(|| existing.image.clone());

    let outfit = sqlx::query_as::<_, Outfit>(
        r#"
        UPDATE outfits
        SET title = ?, description = ?, category = ?, image = ?
        WHERE id = ?
        RETURNING id, title, description, category, image, user_id, created_at
        "#,
    )
    .bind(&title)
    .bind(&description)
    .bind(&category)
    .bind(image_key.as_deref())
    .bind(id)
    .fetch_one(&state.pool)
    .await?;

    // The old blob is released only once the new one is durably stored and
    // the row points at it. Failure here must not roll back the update.
    if new_key.is_some() {
        if let Some(old) = existing.image.as_deref() {
            if let Err(e) = state.blobs.delete(old).await {
                tracing::warn!("Failed to release replaced image blob {}: {}", old, e);
            }
        }
    }

    Ok(Json(outfit))
}

/// Deletes an outfit. Owner only. Ratings and the outfit row are removed in
/// one transaction so no reader observes one without the other; the image
/// blob is released best-effort afterwards.
pub async fn delete_outfit(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = state.pool.begin().await?;

    let outfit = sqlx::query_as::<_, Outfit>(
        "SELECT id, title, description, category, image, user_id, created_at FROM outfits WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Outfit not found".to_string()))?;

    if outfit.user_id != user.user_id {
        return Err(AppError::Unauthorized(
            "You are not authorized to delete this outfit".to_string(),
        ));
    }

    sqlx::query("DELETE FROM ratings WHERE outfit_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM outfits WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    if let Some(image) = outfit.image.as_deref() {
        if let Err(e) = state.blobs.delete(image).await {
            tracing::warn!("Failed to release image blob {}: {}", image, e);
        }
    }

    Ok(Json(json!({ "message": "Outfit deleted" })))
}

/// Generates a shareable link for an outfit.
pub async fn share_outfit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM outfits WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Outfit not found".to_string()))?;

    let share_url = format!("{}/outfits/{}", state.config.public_base_url, id);

    Ok(Json(json!({
        "message": "Share link generated",
        "share_url": share_url,
    })))
}
