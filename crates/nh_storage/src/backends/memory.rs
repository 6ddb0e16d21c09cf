use async_trait::async_trait;
use nh_core::{ArticleRecord, ArticleStorage, Source, StorageError};
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Process-local store for tests and dry runs. Keeps every inserted row, like
/// a table without a unique key.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    records: RwLock<Vec<ArticleRecord>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ensure_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn existing_urls(&self) -> Result<HashSet<String>, StorageError> {
        let records = self.records.read().await;
        Ok(records.iter().map(|r| r.url.clone()).collect())
    }

    async fn insert_batch(&self, batch: &[ArticleRecord]) -> Result<usize, StorageError> {
        let mut records = self.records.write().await;
        records.extend_from_slice(batch);
        Ok(batch.len())
    }

    async fn get_by_source(&self, source: Source) -> Result<Vec<ArticleRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.source == source)
            .cloned()
            .collect())
    }
}
