//! Library error types.

use thiserror::Error;

/// Messaging client configuration errors, raised at construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("WATI API key not found. Please set WATI_API_KEY in config.env")]
    MissingApiKey,

    #[error("WATI base URL not found. Please set WATI_BASE_URL in config.env")]
    MissingBaseUrl,

    #[error("WATI instance ID not found. Please set WATI_INSTANCE_ID in config.env")]
    MissingInstanceId,

    #[error("WATI base URL is invalid: {0}")]
    InvalidBaseUrl(String),

    #[error("WATI API key cannot be used as a header value")]
    InvalidApiKey,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}
