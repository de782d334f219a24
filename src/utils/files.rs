// src/utils/files.rs

use chrono::Utc;

use crate::error::AppError;

const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Lowercased extension of a filename, if it has one.
pub fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Rejects anything that is not a PNG or JPEG by extension.
/// Applies to uploaded outfit images and to profile picture references.
pub fn ensure_allowed_image(name: &str) -> Result<(), AppError> {
    match extension(name) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(AppError::InvalidFile(
            "Only PNG and JPEG images are allowed".to_string(),
        )),
    }
}

/// Replaces every character outside [A-Za-z0-9._-] so the result is a single
/// safe path component. Blob keys must never traverse out of the upload dir.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Collision-resistant storage key for an upload:
/// millisecond timestamp + owning user id + sanitized original name.
pub fn stored_filename(user_id: i64, original: &str) -> String {
    format!(
        "{}_{}_{}",
        Utc::now().timestamp_millis(),
        user_id,
        sanitize_filename(original)
    )
}
