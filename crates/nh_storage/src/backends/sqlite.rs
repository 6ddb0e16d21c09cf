use async_trait::async_trait;
use nh_core::{ArticleRecord, ArticleStorage, Source, StorageError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS news (
        url TEXT PRIMARY KEY,
        source TEXT NOT NULL,
        title TEXT NOT NULL,
        time TEXT,
        keywords TEXT NOT NULL,
        text TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS news_source ON news (source)",
];

/// Local `news` table in a single SQLite file.
pub struct SqliteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Connection(format!("Failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to open {}: {}", db_path.display(), e)))?;

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<ArticleRecord, StorageError> {
    let source: String = row.get("source");
    Ok(ArticleRecord {
        source: source
            .parse::<Source>()
            .map_err(|e: nh_core::Error| StorageError::Query(e.to_string()))?,
        url: row.get("url"),
        title: row.get("title"),
        published_date: row.get("time"),
        keywords: row.get("keywords"),
        text: row.get("text"),
    })
}

#[async_trait]
impl ArticleStorage for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn ensure_schema(&self) -> Result<(), StorageError> {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Schema(format!("Failed to run migration {}: {}", i, e)))?;
        }
        Ok(())
    }

    async fn existing_urls(&self) -> Result<HashSet<String>, StorageError> {
        let rows = sqlx::query("SELECT DISTINCT url FROM news")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(rows.iter().map(|row| row.get::<String, _>("url")).collect())
    }

    async fn insert_batch(&self, records: &[ArticleRecord]) -> Result<usize, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Insert(e.to_string()))?;

        let mut inserted = 0;
        for record in records {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO news (url, source, title, time, keywords, text)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.url)
            .bind(record.source.as_str())
            .bind(&record.title)
            .bind(record.published_date.as_deref())
            .bind(&record.keywords)
            .bind(&record.text)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Insert(format!("Failed to store {}: {}", record.url, e)))?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Insert(e.to_string()))?;
        Ok(inserted)
    }

    async fn get_by_source(&self, source: Source) -> Result<Vec<ArticleRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT url, source, title, time, keywords, text FROM news WHERE source = ? ORDER BY url",
        )
        .bind(source.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(row_to_record).collect()
    }
}
