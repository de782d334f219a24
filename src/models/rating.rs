use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'ratings' table in the database.
/// A rating is immutable once created and only ever removed as a cascade
/// effect of its outfit being deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Rating {
    pub id: i64,
    pub score: i64,
    pub user_id: i64,
    pub outfit_id: i64,
}

/// DTO for submitting a rating.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRatingRequest {
    #[validate(range(min = 1, max = 5, message = "Score must be an integer between 1 and 5"))]
    pub score: i64,
    pub outfit_id: i64,
}
