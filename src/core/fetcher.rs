//! Transfer fetcher.
//!
//! Issues one GET, follows at most [`MAX_REDIRECT_HOPS`] redirect, and
//! streams a 200 body to the staging path. A zero-byte file is reported
//! separately from transport or status failures because it means the source
//! itself is degenerate.

use std::path::{Path, PathBuf};

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Response, StatusCode};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use url::Url;

/// Redirect hops followed before a redirect status counts as a failure
pub const MAX_REDIRECT_HOPS: usize = 1;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme '{scheme}' in {url}")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("failed to download {url}, status code: {status}")]
    Status { url: String, status: u16 },

    #[error("redirect from {url} (status {status}) has no usable Location header")]
    BadRedirect { url: String, status: u16 },

    #[error("error during download of {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to write staged file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// A non-empty file written to the staging path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub bytes: u64,
    /// URL the body was actually read from (after any redirect)
    pub source_url: String,
}

/// Result of one fetch; never persisted
#[derive(Debug)]
pub enum TransferOutcome {
    Staged(StagedFile),

    /// 200 with a zero-byte body; the empty file is left in place
    Empty { path: PathBuf },

    Failed(TransferError),
}

impl TransferOutcome {
    pub fn is_staged(&self) -> bool {
        matches!(self, Self::Staged(_))
    }
}

/// HTTP(S) fetcher with a bounded redirect hop count
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Create a fetcher; redirects are handled here, not by the client
    pub fn new() -> Result<Self, TransferError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(TransferError::Client)?;

        Ok(Self { client })
    }

    /// Fetch `url` into `destination`, overwriting it
    pub async fn fetch(&self, url: &str, destination: &Path) -> TransferOutcome {
        match self.download(url, destination).await {
            Ok(staged) if staged.bytes == 0 => {
                warn!(url, path = %staged.path.display(), "File size is 0");
                TransferOutcome::Empty { path: staged.path }
            }
            Ok(staged) => {
                info!(
                    url = %staged.source_url,
                    bytes = staged.bytes,
                    "Download completed: {}",
                    staged.path.display()
                );
                TransferOutcome::Staged(staged)
            }
            Err(e) => {
                error!(url, error = %e, "Failed to download file");
                TransferOutcome::Failed(e)
            }
        }
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<StagedFile, TransferError> {
        let mut current = parse_source_url(url)?;
        let mut hops = 0usize;

        loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|source| TransferError::Transport {
                    url: current.to_string(),
                    source,
                })?;

            let status = response.status();
            if status == StatusCode::OK {
                return stream_to_file(current, response, destination).await;
            }

            if is_followable_redirect(status) && hops < MAX_REDIRECT_HOPS {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok());
                let next = resolve_location(&current, status, location)?;

                info!(from = %current, to = %next, status = status.as_u16(), "Redirecting");
                hops += 1;
                current = next;
                continue;
            }

            return Err(TransferError::Status {
                url: current.to_string(),
                status: status.as_u16(),
            });
        }
    }
}

fn is_followable_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Parse a source URL and require http or https
pub fn parse_source_url(raw: &str) -> Result<Url, TransferError> {
    let url = Url::parse(raw).map_err(|e| TransferError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(TransferError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: scheme.to_string(),
        }),
    }
}

/// Resolve a `Location` header against the URL that returned it
fn resolve_location(
    current: &Url,
    status: StatusCode,
    location: Option<&str>,
) -> Result<Url, TransferError> {
    let bad_redirect = || TransferError::BadRedirect {
        url: current.to_string(),
        status: status.as_u16(),
    };

    let location = location.filter(|l| !l.trim().is_empty()).ok_or_else(bad_redirect)?;
    let next = current.join(location.trim()).map_err(|_| bad_redirect())?;
    parse_source_url(next.as_str())
}

async fn stream_to_file(
    source_url: Url,
    mut response: Response,
    destination: &Path,
) -> Result<StagedFile, TransferError> {
    let io_err = |source: std::io::Error| TransferError::Io {
        path: destination.to_path_buf(),
        source,
    };

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut file = File::create(destination).await.map_err(io_err)?;

    loop {
        let chunk = response
            .chunk()
            .await
            .map_err(|source| TransferError::Transport {
                url: source_url.to_string(),
                source,
            })?;

        let Some(chunk) = chunk else { break };
        file.write_all(&chunk).await.map_err(io_err)?;
    }

    file.flush().await.map_err(io_err)?;
    drop(file);

    // Size comes from the closed file, not the byte count in flight
    let bytes = fs::metadata(destination).await.map_err(io_err)?.len();
    debug!(path = %destination.display(), bytes, "Stream closed");

    Ok(StagedFile {
        path: destination.to_path_buf(),
        bytes,
        source_url: source_url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_url_schemes() {
        assert!(parse_source_url("https://example.com/file.zip").is_ok());
        assert!(parse_source_url("http://example.com/file.zip").is_ok());

        assert!(matches!(
            parse_source_url("ftp://example.com/file.zip"),
            Err(TransferError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            parse_source_url("not a url"),
            Err(TransferError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_resolve_absolute_and_relative_location() {
        let current = Url::parse("https://files.example/a/start").unwrap();

        let absolute =
            resolve_location(&current, StatusCode::FOUND, Some("https://cdn.example/x.zip")).unwrap();
        assert_eq!(absolute.as_str(), "https://cdn.example/x.zip");

        let relative = resolve_location(&current, StatusCode::FOUND, Some("/b/final")).unwrap();
        assert_eq!(relative.as_str(), "https://files.example/b/final");
    }

    #[test]
    fn test_resolve_rejects_missing_or_unsupported_location() {
        let current = Url::parse("https://files.example/start").unwrap();

        assert!(matches!(
            resolve_location(&current, StatusCode::FOUND, None),
            Err(TransferError::BadRedirect { status: 302, .. })
        ));
        assert!(matches!(
            resolve_location(&current, StatusCode::FOUND, Some("  ")),
            Err(TransferError::BadRedirect { .. })
        ));
        assert!(matches!(
            resolve_location(&current, StatusCode::FOUND, Some("ftp://elsewhere/file")),
            Err(TransferError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_followable_redirects() {
        assert!(is_followable_redirect(StatusCode::FOUND));
        assert!(is_followable_redirect(StatusCode::MOVED_PERMANENTLY));
        assert!(is_followable_redirect(StatusCode::TEMPORARY_REDIRECT));
        assert!(!is_followable_redirect(StatusCode::NOT_MODIFIED));
        assert!(!is_followable_redirect(StatusCode::OK));
    }
}
