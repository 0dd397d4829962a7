//! Core library for managing a locally cached `skaffold` executable and
//! invoking it as a child process.
//!
//! The crate keeps a copy of the `skaffold` binary under a user-scoped cache
//! directory next to a digest sidecar, refreshes the pair when the published
//! release digest changes, and wraps invocation of the binary with stream
//! plumbing for stdin/stdout/stderr.

pub mod cache;
pub mod command;
pub mod digest;
pub mod io;
pub mod jib;
pub mod paths;
pub mod platform;
pub mod release;
pub mod yaml;

pub use cache::CachedSkaffold;
pub use command::Skaffold;
pub use paths::*;
pub use platform::Platform;

/// User Agent string sent on all release downloads.
pub const USER_AGENT: &str = concat!("skaffold-core/", env!("CARGO_PKG_VERSION"));
