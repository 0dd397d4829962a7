//! SHA-256 digest documents.
//!
//! A published digest document starts with the 64-character lowercase hex
//! digest of the release binary; anything after those characters (whitespace,
//! the artifact filename) is ignored. The parsed hex form is canonical: the
//! cache sidecar stores exactly those 64 characters and staleness comparison
//! is parsed-digest equality, never raw response bytes.

use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

const HEX_LEN: usize = 64;

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Digest document is too short: {0} bytes")]
    TooShort(usize),

    #[error("Digest document does not start with 64 lowercase hex characters")]
    NotHex,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A SHA-256 content digest in lowercase hex form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Parses the leading 64 hex characters of a digest document.
    pub fn parse_document(document: &[u8]) -> Result<Self, DigestError> {
        if document.len() < HEX_LEN {
            return Err(DigestError::TooShort(document.len()));
        }
        let head = &document[..HEX_LEN];
        if !head
            .iter()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b))
        {
            return Err(DigestError::NotHex);
        }
        // Validated as ASCII hex above.
        let hex = String::from_utf8_lossy(head).into_owned();
        Ok(Self(hex))
    }

    /// Computes the digest of a file's contents.
    pub fn of_file(path: &Path) -> Result<Self, DigestError> {
        use std::io::Read;

        let mut hasher = Sha256::new();
        let mut file = std::fs::File::open(path)?;
        let mut buffer = [0u8; 8192];
        loop {
            let count = file.read(&mut buffer)?;
            if count == 0 {
                break;
            }
            hasher.update(&buffer[..count]);
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// The canonical 64-character lowercase hex text.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}
