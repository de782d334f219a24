use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'outfits' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Outfit {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,

    /// Blob store key of the uploaded image.
    pub image: Option<String>,

    /// Owning user. Immutable after creation.
    pub user_id: i64,

    /// Server-assigned UTC creation time.
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// An outfit annotated with the arithmetic mean of its rating scores.
/// `average_rating` is null (absent), never zero, for an unrated outfit.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OutfitWithRating {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image: Option<String>,
    pub user_id: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub average_rating: Option<f64>,
}

/// Query parameters for listing the shared catalog.
#[derive(Debug, Deserialize)]
pub struct OutfitListParams {
    /// Case-insensitive substring match over title or description.
    pub search: Option<String>,
}

/// Query parameters for listing one user's outfits.
#[derive(Debug, Deserialize)]
pub struct UserOutfitParams {
    /// Exact category filter.
    pub category: Option<String>,
}
