use async_trait::async_trait;

use crate::error::FetchError;

/// A successfully fetched page, already decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
    /// Name of the character encoding the body was decoded with
    pub encoding: &'static str,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}
