use thiserror::Error;

/// Failure of a single HTTP GET. Never retried; the URL is skipped for the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),
}

/// Reason an article candidate produced no record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Discard {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("article body block not found")]
    MissingBody,

    #[error("article body is empty")]
    EmptyBody,

    #[error("text contains mis-decoded marker {0:?}")]
    Corrupted(char),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("schema creation failed: {0}")]
    Schema(String),

    #[error("insert failed: {0}")]
    Insert(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("connection failed: {0}")]
    Connection(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Article extraction failed: {0}")]
    Extraction(#[from] Discard),

    #[error("Pipeline failed for: {0}")]
    SourcesFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
