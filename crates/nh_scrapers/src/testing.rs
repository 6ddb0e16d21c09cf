use async_trait::async_trait;
use nh_core::{
    ArticleRecord, ArticleStorage, FetchError, FetchedPage, Fetcher, Source, StorageError,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory `Fetcher`: known URLs answer with their canned page or error,
/// anything else is a 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, Result<String, FetchError>>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(html.to_string()));
        self
    }

    pub fn with_error(mut self, url: &str, error: FetchError) -> Self {
        self.pages.insert(url.to_string(), Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(Ok(body)) => Ok(FetchedPage {
                url: url.to_string(),
                status: 200,
                body: body.clone(),
                encoding: "UTF-8",
            }),
            Some(Err(e)) => Err(e.clone()),
            None => Err(FetchError::HttpStatus(404)),
        }
    }
}

/// Storage whose schema step always fails, so every persist errors out.
pub struct FailingStorage;

#[async_trait]
impl ArticleStorage for FailingStorage {
    fn name(&self) -> &str {
        "failing"
    }

    async fn ensure_schema(&self) -> Result<(), StorageError> {
        Err(StorageError::Schema("read-only".to_string()))
    }

    async fn existing_urls(&self) -> Result<HashSet<String>, StorageError> {
        Ok(HashSet::new())
    }

    async fn insert_batch(&self, _records: &[ArticleRecord]) -> Result<usize, StorageError> {
        Ok(0)
    }

    async fn get_by_source(&self, _source: Source) -> Result<Vec<ArticleRecord>, StorageError> {
        Ok(Vec::new())
    }
}
