//! # Utility Functions Module
//!
//! Small helpers shared by the transformer and uploader.

use std::time::{SystemTime, UNIX_EPOCH};

/// Converts any iterable of string-like items to `Vec<String>`.
///
/// Used to build argument lists for external tools without a `.to_string()`
/// on every element.
///
/// ```rust
/// use image_upload_pipeline::utils::to_string_vec;
///
/// let quality = 70.to_string();
/// let args = to_string_vec(["-quality", quality.as_str()]);
/// assert_eq!(args, vec!["-quality".to_string(), "70".to_string()]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Milliseconds since the Unix epoch, 0 if the clock is before it
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Maps a compression fraction in (0, 1] to a JPEG quality in 1..=100
pub fn jpeg_quality_percent(fraction: f32) -> u8 {
    (fraction * 100.0).round().clamp(1.0, 100.0) as u8
}
