//! Canonical cache locations.

use std::path::PathBuf;

/// Returns the cache directory, or None if no user cache root can be resolved.
///
/// `SKAFFOLD_CACHE_HOME` overrides the platform default.
pub fn try_cache_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("SKAFFOLD_CACHE_HOME") {
        return Some(PathBuf::from(val));
    }
    dirs::cache_dir().map(|c| c.join("skaffold-core"))
}

/// Name of the cached executable, platform qualified.
pub fn executable_name() -> &'static str {
    if cfg!(windows) {
        "skaffold.exe"
    } else {
        "skaffold"
    }
}

/// Name of the digest sidecar next to the cached executable.
pub const DIGEST_NAME: &str = "skaffold.sha256";
