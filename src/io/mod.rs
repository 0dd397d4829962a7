//! Transfer and filesystem primitives.

pub mod download;
pub mod permissions;
