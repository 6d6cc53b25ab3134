//! Chunked HTTP download of recording files.
//!
//! The size comes from a HEAD request; the body is then fetched with ranged
//! GETs that must answer 206. A server that reports no size gets a single
//! plain GET instead.

use std::fs::{self, File};
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{CONTENT_LENGTH, RANGE};
use thiserror::Error;

use crate::api::Authenticator;
use crate::transfer::Downloader;

/// Bytes requested per ranged GET.
pub const DEFAULT_CHUNK_SIZE: u64 = 1_024_000_000;

const DOWNLOAD_TIMEOUT_SECS: u64 = 60 * 30;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Expected HTTP 206 for range request, got {status}")]
    RangeIgnored { status: u16 },

    #[error("Incomplete download: expected {expected} bytes, got {actual}")]
    Incomplete { expected: u64, actual: u64 },

    #[error("Could not authorize download: {0}")]
    Auth(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub struct ChunkedDownloader {
    http: Client,
    chunk_size: u64,
    auth: Option<Authenticator>,
}

impl ChunkedDownloader {
    pub fn new(chunk_size: u64) -> Result<Self, TransferError> {
        let http = Client::builder()
            .user_agent(format!("recsync/{}", env!("RECSYNC_VERSION")))
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            chunk_size: chunk_size.max(1),
            auth: None,
        })
    }

    /// Send the source service's bearer token with every request.
    pub fn with_auth(mut self, auth: Authenticator) -> Self {
        self.auth = Some(auth);
        self
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, TransferError> {
        match &self.auth {
            Some(auth) => {
                let token = auth
                    .access_token()
                    .map_err(|e| TransferError::Auth(e.to_string()))?;
                Ok(request.bearer_auth(token))
            }
            None => Ok(request),
        }
    }

    /// Size reported by a HEAD request. `None` when the server does not say.
    fn remote_size(&self, url: &str) -> Result<Option<u64>, TransferError> {
        let response = self.authorize(self.http.head(url))?.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        // Read the header directly: the body of a HEAD response is always empty.
        Ok(response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|n| *n > 0))
    }

    fn fetch_ranges(&self, url: &str, size: u64, out: &mut impl Write, pb: &ProgressBar) -> Result<u64, TransferError> {
        let mut written = 0;
        let mut start = 0;
        while start < size {
            let end = (start + self.chunk_size - 1).min(size - 1);
            debug!("GET {} bytes={}-{}", url, start, end);

            let response = self
                .authorize(self.http.get(url))?
                .header(RANGE, format!("bytes={}-{}", start, end))
                .send()?;
            let status = response.status();
            if status != StatusCode::PARTIAL_CONTENT {
                return Err(TransferError::RangeIgnored {
                    status: status.as_u16(),
                });
            }
            written += io::copy(&mut pb.wrap_read(response), out)?;
            start = end + 1;
        }

        if written != size {
            return Err(TransferError::Incomplete {
                expected: size,
                actual: written,
            });
        }
        Ok(written)
    }

    fn fetch_whole(&self, url: &str, out: &mut impl Write, pb: &ProgressBar) -> Result<u64, TransferError> {
        debug!("GET {} (size unknown)", url);
        let response = self.authorize(self.http.get(url))?.send()?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransferError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(io::copy(&mut pb.wrap_read(response), out)?)
    }
}

impl Downloader for ChunkedDownloader {
    fn download(&self, url: &str, local_path: &Path) -> Result<u64, TransferError> {
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let size = self.remote_size(url)?;
        let pb = create_progress_bar(size);
        let mut out = BufWriter::new(File::create(local_path)?);

        let written = match size {
            Some(size) => self.fetch_ranges(url, size, &mut out, &pb),
            None => self.fetch_whole(url, &mut out, &pb),
        };
        pb.finish_and_clear();

        let written = written?;
        out.flush()?;
        debug!("Wrote {} bytes to {}", written, local_path.display());
        Ok(written)
    }
}

fn create_progress_bar(total: Option<u64>) -> ProgressBar {
    if !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[recsync] Downloading {bytes}/{total_bytes} [{bar:30}] {percent}%")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("[recsync] {spinner} Downloading {bytes}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    }
}
