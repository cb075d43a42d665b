//! Appwrite backend errors.

use thiserror::Error;

/// Appwrite backend error.
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    #[error("Appwrite returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Browser auth session failed: {0}")]
    Browser(String),
    #[error("Browser auth session ended without a callback: {0}")]
    NotCompleted(&'static str),
    #[error("OAuth callback is missing `{0}`")]
    MissingCallbackParam(&'static str),
}
