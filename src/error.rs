//! Error type shared by the harvester's library modules.
//!
//! Only configuration, transport and storage problems surface as errors.
//! Missing markup never does: the article extractor substitutes sentinel
//! strings instead (see [`crate::scrapers::article`]).

use thiserror::Error;

/// Everything that can go wrong while harvesting.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The HTTP client failed before a response arrived (DNS, TLS, timeout...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Opening the database or running a statement failed.
    #[error("database error: {0}")]
    Store(#[from] tokio_rusqlite::Error),

    /// A search term cannot be turned into a safe table identifier.
    #[error("invalid table name {0:?}: only letters, digits and '_' are allowed (max 64)")]
    InvalidTableName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The terms file parsed as JSON but does not have the expected shape.
    #[error("invalid terms file: {0}")]
    Catalog(String),

    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
