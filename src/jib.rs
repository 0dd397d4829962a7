//! Surface for resolving a target image reference from Jib plugin
//! configuration.
//!
//! Host build-tool integrations implement [`JibAdapter`] over their own
//! configuration trees; nothing here performs I/O. Version dispatch is a
//! tagged variant: an unrecognized plugin version is an explicit case that
//! still attempts the latest known configuration layout rather than an
//! incidental fallback.

use thiserror::Error;

/// Error for an image reference string that cannot be parsed.
#[derive(Error, Debug)]
#[error("Invalid image reference: {0:?}")]
pub struct InvalidImageReference(pub String);

/// A container image reference, e.g. `gcr.io/my-project/my-image:tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference(String);

impl ImageReference {
    /// Parses an image reference.
    pub fn parse(reference: &str) -> Result<Self, InvalidImageReference> {
        let trimmed = reference.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(InvalidImageReference(reference.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The reference as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Jib plugin configuration schema versions this crate knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// The 0.9.x plugin configuration layout.
    Beta9,
    /// Unrecognized plugin version; the latest known layout is still
    /// attempted.
    Unknown,
}

impl SchemaVersion {
    /// Maps a plugin version string to its configuration schema.
    pub fn detect(version: &str) -> Self {
        if version.starts_with("0.9.") {
            Self::Beta9
        } else {
            Self::Unknown
        }
    }

    /// Whether the schema is one this crate supports directly.
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Lazily resolves the target image reference from plugin configuration.
pub trait ImageReferenceResolver {
    /// Returns the configured image reference, or `None` when the
    /// configuration holds no valid reference.
    fn image_reference(&self) -> Result<Option<ImageReference>, InvalidImageReference>;
}

/// Resolved information about a build's Jib configuration.
pub enum ResolvedJib {
    /// No Jib plugin configuration was found.
    NotFound,
    /// Jib configuration was found.
    Found {
        /// The detected configuration schema.
        version: SchemaVersion,
        /// Resolver over the configuration tree.
        resolver: Box<dyn ImageReferenceResolver>,
    },
}

impl std::fmt::Debug for ResolvedJib {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("ResolvedJib::NotFound"),
            Self::Found { version, .. } => f
                .debug_struct("ResolvedJib::Found")
                .field("version", version)
                .finish_non_exhaustive(),
        }
    }
}

impl ResolvedJib {
    /// Whether Jib configuration was found at all.
    pub fn has_configuration(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Whether the found configuration's version is supported. Resolution can
    /// still be attempted on an unsupported version.
    pub fn version_supported(&self) -> bool {
        match self {
            Self::NotFound => false,
            Self::Found { version, .. } => version.is_supported(),
        }
    }

    /// Resolves the target image reference, if any.
    pub fn image_reference(&self) -> Result<Option<ImageReference>, InvalidImageReference> {
        match self {
            Self::NotFound => Ok(None),
            Self::Found { resolver, .. } => resolver.image_reference(),
        }
    }
}

/// Resolves Jib configuration from a host build tool.
pub trait JibAdapter {
    /// Looks up the Jib plugin configuration.
    fn resolve(&self) -> ResolvedJib;
}
