pub mod clickhouse;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use clickhouse::{ClickHouseConfig, ClickHouseStorage};
pub use memory::InMemoryStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;
