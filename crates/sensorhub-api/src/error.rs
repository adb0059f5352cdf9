use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the `sensorhub-api` crate.
///
/// Covers every failure mode of the two device endpoints: connection,
/// protocol, and local disk writes while streaming. `sensorhub-core`
/// folds these into its `Unreachable` / `Malformed` / `Io` taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Device address could not be turned into a base URL.
    #[error("Invalid device address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The body stream broke off after the response started.
    #[error("Data stream from {url} interrupted after {bytes_written} bytes: {reason}")]
    StreamInterrupted {
        url: String,
        bytes_written: u64,
        reason: String,
    },

    // ── Protocol ────────────────────────────────────────────────────
    /// Device answered with a non-success HTTP status.
    #[error("Device returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Local IO ────────────────────────────────────────────────────
    /// Writing the streamed body to disk failed.
    #[error("Failed writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns `true` if the device could not be reached at all, or the
    /// connection dropped before a complete response arrived.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::StreamInterrupted { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the device answered but the answer was not usable.
    pub fn is_malformed(&self) -> bool {
        match self {
            Self::Status { .. } | Self::Deserialization { .. } => true,
            Self::Transport(e) => e.is_decode() || e.is_body(),
            _ => false,
        }
    }

    /// HTTP status code, if the device answered with one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
