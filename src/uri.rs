//! URI normalization for the platform file layer.
//!
//! Pure and total: the platform is an explicit argument, never detected here.

use crate::platform::Platform;

/// Scheme prefix required by file layers that do not accept bare paths
pub const FILE_SCHEME: &str = "file://";

/// Maps a platform-reported path to the form the platform's file layer expects.
///
/// Idempotent: `normalize_uri(&normalize_uri(p, x), x) == normalize_uri(p, x)`.
pub fn normalize_uri(path: &str, platform: Platform) -> String {
    if platform.requires_file_scheme() && !path.starts_with(FILE_SCHEME) {
        format!("{}{}", FILE_SCHEME, path)
    } else {
        path.to_string()
    }
}

/// Removes the `file://` scheme, if any
pub fn strip_file_scheme(location: &str) -> &str {
    location.strip_prefix(FILE_SCHEME).unwrap_or(location)
}
