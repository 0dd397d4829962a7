//! Streaming download of release files.
//!
//! Transfers must have a known size up front: a response without a definite
//! `Content-Length` is rejected rather than written out as an unverifiable
//! partial file.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Remote did not report a content length")]
    UnknownSize,

    #[error("Incomplete transfer: expected {expected} bytes, wrote {written}")]
    Incomplete { expected: u64, written: u64 },
}

/// Downloads `url` to `destination`, creating or truncating the file.
///
/// Returns the number of bytes written. Fails with
/// [`DownloadError::UnknownSize`] if the remote does not report a definite
/// content length. On any mid-transfer failure the destination is left
/// partially written and must not be treated as usable.
pub async fn fetch(client: &Client, url: &str, destination: &Path) -> Result<u64, DownloadError> {
    fetch_chunked(client, url, destination, usize::MAX).await
}

/// Downloads `url` to `destination`, writing in slices of at most
/// `chunk_size` bytes.
///
/// The bound keeps single writes from requiring unbounded buffering and lets
/// tests drive multi-chunk transfers deterministically with a small size.
pub async fn fetch_chunked(
    client: &Client,
    url: &str,
    destination: &Path,
    chunk_size: usize,
) -> Result<u64, DownloadError> {
    if chunk_size == 0 {
        return Err(DownloadError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "chunk size must be non-zero",
        )));
    }

    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let expected = response.content_length().ok_or(DownloadError::UnknownSize)?;

    let mut file = File::create(destination).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for part in chunk.chunks(chunk_size) {
            file.write_all(part).await?;
        }
        written += chunk.len() as u64;
    }

    file.flush().await?;

    if written != expected {
        return Err(DownloadError::Incomplete { expected, written });
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn fetch_writes_exact_contents() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/release")
            .with_status(200)
            .with_body(b"binary contents")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let client = Client::new();

        let written = fetch(&client, &format!("{}/release", server.url()), &dest)
            .await
            .unwrap();

        assert_eq!(written, 15);
        assert_eq!(std::fs::read(&dest).unwrap(), b"binary contents");
    }

    #[tokio::test]
    async fn fetch_in_small_chunks_writes_exact_contents() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/release")
            .with_status(200)
            .with_body(b"0123456789")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let client = Client::new();

        let written = fetch_chunked(&client, &format!("{}/release", server.url()), &dest, 3)
            .await
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(std::fs::read(&dest).unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn fetch_fails_when_size_is_unknown() {
        use std::io::Write as _;

        let mut server = Server::new_async().await;
        // Chunked transfer encoding carries no Content-Length.
        let _m = server
            .mock("GET", "/release")
            .with_status(200)
            .with_chunked_body(|w| w.write_all(b"some bytes"))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let client = Client::new();

        let err = fetch(&client, &format!("{}/release", server.url()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::UnknownSize));
    }

    #[test]
    fn incomplete_error_reports_counts_for_short_and_long_bodies() {
        // The same variant covers both under- and over-delivery, so the
        // message claims neither direction.
        let short = DownloadError::Incomplete {
            expected: 10,
            written: 7,
        };
        assert_eq!(
            short.to_string(),
            "Incomplete transfer: expected 10 bytes, wrote 7"
        );

        let long = DownloadError::Incomplete {
            expected: 10,
            written: 12,
        };
        assert_eq!(
            long.to_string(),
            "Incomplete transfer: expected 10 bytes, wrote 12"
        );
    }

    #[tokio::test]
    async fn fetch_fails_on_http_error_status() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/release")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let client = Client::new();

        let err = fetch(&client, &format!("{}/release", server.url()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Http(_)));
    }

    #[tokio::test]
    async fn fetch_overwrites_existing_destination() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/release")
            .with_status(200)
            .with_body(b"new")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        std::fs::write(&dest, b"something much longer than the replacement").unwrap();
        let client = Client::new();

        fetch(&client, &format!("{}/release", server.url()), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }
}
