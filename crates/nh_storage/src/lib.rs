use nh_core::{ArticleStorage, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub mod backends;
pub mod sink;

pub use backends::*;
pub use sink::{persist, PersistReport};

pub const DEFAULT_SQLITE_PATH: &str = "news.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StorageKind {
    Memory,
    #[default]
    #[value(name = "clickhouse")]
    ClickHouse,
    Sqlite,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageKind::Memory => "memory",
            StorageKind::ClickHouse => "clickhouse",
            StorageKind::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

/// Everything the backends need to connect; each backend reads its own part.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub clickhouse: ClickHouseConfig,
    pub sqlite_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            clickhouse: ClickHouseConfig::default(),
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
        }
    }
}

impl StorageSettings {
    pub fn from_env() -> Self {
        Self {
            clickhouse: ClickHouseConfig::from_env(),
            sqlite_path: std::env::var("NH_SQLITE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SQLITE_PATH)),
        }
    }
}

/// Opens the requested backend and makes sure its table exists.
pub async fn create_storage(
    kind: StorageKind,
    settings: &StorageSettings,
) -> Result<Arc<dyn ArticleStorage>> {
    let storage: Arc<dyn ArticleStorage> = match kind {
        StorageKind::Memory => Arc::new(InMemoryStorage::new()),
        StorageKind::ClickHouse => Arc::new(ClickHouseStorage::new(settings.clickhouse.clone())?),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => Arc::new(SqliteStorage::new_with_path(&settings.sqlite_path).await?),
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            return Err(nh_core::Error::Config(
                "SQLite support is not compiled in; rebuild with the `sqlite` feature".to_string(),
            ))
        }
    };

    storage.ensure_schema().await?;
    info!(storage = storage.name(), "Storage backend ready");
    Ok(storage)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::sink::{persist, PersistReport};
    pub use super::{create_storage, StorageKind, StorageSettings};
}
