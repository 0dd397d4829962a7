//! Retrieval of published skaffold release artifacts.

use std::path::Path;

use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::io::download::{self, DownloadError};
use crate::io::permissions;
use crate::platform::Platform;

/// Base URL skaffold releases are published under.
pub const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com/skaffold/releases";

/// Version token naming the most recent published release.
pub const LATEST_VERSION: &str = "latest";

#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Failed to mark executable: {0}")]
    Permissions(#[source] std::io::Error),
}

/// Resolves the artifact URL for a release binary.
///
/// The URL is fully determined by the platform/version pair:
/// `<base>/<version>/<platform artifact name>`.
pub fn artifact_url(base_url: &str, platform: Platform, version: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        version,
        platform.artifact_name()
    )
}

/// Resolves the artifact URL for a release binary's digest document.
pub fn digest_url(base_url: &str, platform: Platform, version: &str) -> String {
    format!("{}.sha256", artifact_url(base_url, platform, version))
}

/// Downloads a release binary to `destination` and marks it executable.
///
/// A release binary always has a known size, so an unknown-size response is a
/// hard failure. Missing POSIX permission support is not an error.
pub async fn fetch_release(
    client: &Client,
    base_url: &str,
    platform: Platform,
    version: &str,
    destination: &Path,
) -> Result<(), ReleaseError> {
    let url = artifact_url(base_url, platform, version);
    download::fetch(client, &url, destination).await?;

    if !permissions::make_executable(destination).map_err(ReleaseError::Permissions)? {
        debug!("Filesystem does not support POSIX permissions; skipping chmod");
    }
    Ok(())
}

/// Downloads a release binary's digest document to `destination`.
pub async fn fetch_release_digest(
    client: &Client,
    base_url: &str,
    platform: Platform,
    version: &str,
    destination: &Path,
) -> Result<(), ReleaseError> {
    let url = digest_url(base_url, platform, version);
    download::fetch(client, &url, destination).await?;
    Ok(())
}
