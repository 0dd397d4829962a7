//! Management of the cached `skaffold` executable and its digest sidecar.
//!
//! The cached pair lives under one directory: the binary itself and a sidecar
//! holding the canonical hex digest of the binary as of the last successful
//! refresh. Both are replaced through temp-file-then-rename so a crash mid
//! refresh never leaves a half-written executable at the canonical path; a
//! crash between the two renames leaves a stale sidecar, which the next
//! staleness check reports as outdated and a further refresh repairs.
//!
//! No cross-process locking is provided. Concurrent refreshes against one
//! cache directory each write a fully-fetched pair; which one wins is
//! undefined.

use std::path::{Path, PathBuf};

use reqwest::Client;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::digest::{DigestError, Sha256Digest};
use crate::platform::{Platform, PlatformError};
use crate::release::{self, LATEST_VERSION, ReleaseError};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("No user cache directory could be resolved; set SKAFFOLD_CACHE_HOME")]
    NoCacheDir,

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Release fetch failed: {0}")]
    Release(#[from] ReleaseError),

    #[error("Malformed digest document: {0}")]
    Digest(#[from] DigestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Downloaded binary does not match its published digest: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
}

/// Owns the on-disk cached copy of the `skaffold` executable.
#[derive(Debug)]
pub struct CachedSkaffold {
    client: Client,
    base_url: String,
    platform: Platform,
    cache_dir: PathBuf,
    executable_path: PathBuf,
    digest_path: PathBuf,
}

impl CachedSkaffold {
    /// Creates a manager rooted at the canonical user-scoped cache directory.
    pub fn new() -> Result<Self, CacheError> {
        let cache_dir = crate::paths::try_cache_home().ok_or(CacheError::NoCacheDir)?;
        Self::in_dir(cache_dir)
    }

    /// Creates a manager rooted at an explicit cache directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let cache_dir = dir.into();
        let executable_path = cache_dir.join(crate::paths::executable_name());
        let digest_path = cache_dir.join(crate::paths::DIGEST_NAME);
        Ok(Self {
            client: Client::new(),
            base_url: release::DEFAULT_BASE_URL.to_string(),
            platform: Platform::detect()?,
            cache_dir,
            executable_path,
            digest_path,
        })
    }

    /// Overrides the release base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Path to the cached executable. The file may not exist yet.
    pub fn cached_path(&self) -> &Path {
        &self.executable_path
    }

    /// Checks whether the cached executable matches the latest release digest.
    ///
    /// Returns false when the executable or the sidecar is missing, when the
    /// sidecar is unreadable as a digest, or when the freshly fetched digest
    /// differs from the stored one.
    pub async fn is_up_to_date(&self) -> Result<bool, CacheError> {
        if !self.executable_path.exists() {
            return Ok(false);
        }

        let stored = match std::fs::read(&self.digest_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let stored = match Sha256Digest::parse_document(&stored) {
            Ok(digest) => digest,
            Err(e) => {
                debug!("Stored digest sidecar is unreadable ({e}); treating cache as outdated");
                return Ok(false);
            }
        };

        let latest = self.fetch_latest_digest().await?;
        if stored != latest {
            debug!("Cached skaffold is outdated");
            return Ok(false);
        }
        debug!("Cached skaffold is latest version");
        Ok(true)
    }

    /// Unconditionally re-fetches the latest executable and digest sidecar.
    ///
    /// Refreshing when already up to date is safe but re-downloads the same
    /// content; callers should check [`Self::is_up_to_date`] first. The
    /// staleness decision belongs to the caller, never to this method.
    pub async fn refresh(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.cache_dir)?;

        let latest = self.fetch_latest_digest().await?;

        debug!("Downloading latest skaffold release");
        // Same directory as the final path so the rename stays on one volume.
        let staged = NamedTempFile::new_in(&self.cache_dir)?;
        release::fetch_release(
            &self.client,
            &self.base_url,
            self.platform,
            LATEST_VERSION,
            staged.path(),
        )
        .await?;

        let actual = Sha256Digest::of_file(staged.path())?;
        if actual != latest {
            return Err(CacheError::DigestMismatch {
                expected: latest.as_hex().to_string(),
                actual: actual.as_hex().to_string(),
            });
        }

        // Binary first, sidecar last: an interruption in between leaves a
        // stale sidecar, which the next staleness check repairs.
        staged
            .persist(&self.executable_path)
            .map_err(|e| CacheError::Io(e.error))?;

        let staged_digest = NamedTempFile::new_in(&self.cache_dir)?;
        std::fs::write(staged_digest.path(), latest.as_hex())?;
        staged_digest
            .persist(&self.digest_path)
            .map_err(|e| CacheError::Io(e.error))?;

        Ok(())
    }

    /// Refreshes the cache unless it is already up to date.
    ///
    /// A refresh failure aborts the workflow so a caller never proceeds to
    /// invoke a missing or corrupt executable.
    pub async fn ensure_up_to_date(&self) -> Result<(), CacheError> {
        if self.is_up_to_date().await? {
            return Ok(());
        }
        self.refresh().await
    }

    /// Fetches the latest release digest into a scratch file and parses it.
    ///
    /// The scratch file is removed on drop, best effort, whatever the outcome.
    async fn fetch_latest_digest(&self) -> Result<Sha256Digest, CacheError> {
        debug!("Downloading latest skaffold release digest");
        let scratch = NamedTempFile::new()?;
        release::fetch_release_digest(
            &self.client,
            &self.base_url,
            self.platform,
            LATEST_VERSION,
            scratch.path(),
        )
        .await?;
        let bytes = std::fs::read(scratch.path())?;
        Ok(Sha256Digest::parse_document(&bytes)?)
    }
}
