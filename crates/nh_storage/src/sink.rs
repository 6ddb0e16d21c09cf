//! Dedup against the store and write what is new.

use nh_core::{ArticleRecord, ArticleStorage, StorageError};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub received: usize,
    pub duplicates: usize,
    pub inserted: usize,
}

/// Drops records whose URL is already stored or was already seen earlier in
/// the batch. The first occurrence wins.
pub fn dedup_against(
    records: Vec<ArticleRecord>,
    existing: &HashSet<String>,
) -> (Vec<ArticleRecord>, usize) {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let fresh = records
        .into_iter()
        .filter(|record| {
            let keep = !existing.contains(&record.url) && seen.insert(record.url.clone());
            if !keep {
                duplicates += 1;
            }
            keep
        })
        .collect();
    (fresh, duplicates)
}

/// Makes sure the table exists, filters out known URLs with one bulk lookup
/// and inserts the rest in a single batch.
#[instrument(level = "info", skip_all, fields(storage = storage.name(), received = records.len()))]
pub async fn persist(
    storage: &dyn ArticleStorage,
    records: Vec<ArticleRecord>,
) -> Result<PersistReport, StorageError> {
    storage.ensure_schema().await?;

    let mut report = PersistReport {
        received: records.len(),
        ..Default::default()
    };
    if records.is_empty() {
        debug!("Nothing to persist");
        return Ok(report);
    }

    let existing = storage.existing_urls().await?;
    let (fresh, duplicates) = dedup_against(records, &existing);
    report.duplicates = duplicates;

    if fresh.is_empty() {
        info!(duplicates, "All records already stored");
        return Ok(report);
    }

    report.inserted = storage.insert_batch(&fresh).await?;
    info!(inserted = report.inserted, duplicates, "Persisted batch");
    Ok(report)
}
