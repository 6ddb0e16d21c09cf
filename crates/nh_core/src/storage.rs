use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::StorageError;
use crate::types::{ArticleRecord, Source};

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Create the destination table if it does not exist yet. Must be idempotent.
    async fn ensure_schema(&self) -> Result<(), StorageError>;

    /// Every URL already stored, used for bulk deduplication
    async fn existing_urls(&self) -> Result<HashSet<String>, StorageError>;

    /// Insert a batch of records, returning how many rows were written
    async fn insert_batch(&self, records: &[ArticleRecord]) -> Result<usize, StorageError>;

    /// Get all records from a specific source
    async fn get_by_source(&self, source: Source) -> Result<Vec<ArticleRecord>, StorageError>;
}
