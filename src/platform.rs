//! Host platform resolution for selecting a release artifact.

use thiserror::Error;

/// Error resolving the host platform.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The host OS is not one skaffold publishes releases for.
    #[error("Unsupported operating system: {0}")]
    Unsupported(String),
}

/// Operating systems skaffold publishes release binaries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux (amd64).
    Linux,
    /// macOS (amd64).
    MacOs,
    /// Windows (amd64).
    Windows,
}

impl Platform {
    /// Resolves the platform from the host environment.
    ///
    /// Resolution happens once per call and cannot change for a running
    /// process; an unrecognized OS is a fatal configuration error.
    pub fn detect() -> Result<Self, PlatformError> {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Resolves a platform from an OS name as reported by
    /// [`std::env::consts::OS`].
    pub fn from_os_name(os: &str) -> Result<Self, PlatformError> {
        match os {
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::MacOs),
            "windows" => Ok(Self::Windows),
            other => Err(PlatformError::Unsupported(other.to_string())),
        }
    }

    /// The published release artifact filename for this platform.
    pub fn artifact_name(self) -> &'static str {
        match self {
            Self::Linux => "skaffold-linux-amd64",
            Self::MacOs => "skaffold-darwin-amd64",
            Self::Windows => "skaffold-windows-amd64.exe",
        }
    }
}
