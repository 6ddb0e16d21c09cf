use async_trait::async_trait;
use nh_core::{ArticleRecord, ArticleStorage, Source, StorageError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_URL: &str = "http://localhost:8123";
pub const DEFAULT_USER: &str = "default";
pub const DEFAULT_TABLE: &str = "news";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for the ClickHouse HTTP interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickHouseConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    /// PEM root certificate for servers with a private CA
    pub ca_cert: Option<PathBuf>,
    pub table: String,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            ca_cert: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl ClickHouseConfig {
    pub fn new(url: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn from_env() -> Self {
        Self {
            url: env::var("CLICKHOUSE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()),
            user: env::var("CLICKHOUSE_USER").unwrap_or_else(|_| DEFAULT_USER.to_string()),
            password: env::var("CLICKHOUSE_PASSWORD").unwrap_or_default(),
            ca_cert: env::var("CLICKHOUSE_CA_CERT").ok().map(PathBuf::from),
            table: env::var("CLICKHOUSE_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string()),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }
}

// Table names are spliced into SQL, so only plain identifiers are accepted.
fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

#[derive(Deserialize)]
struct UrlRow {
    url: String,
}

/// `news` table in ClickHouse, spoken to over HTTP with `JSONEachRow` rows.
#[derive(Debug, Clone)]
pub struct ClickHouseStorage {
    client: reqwest::Client,
    endpoint: Url,
    config: ClickHouseConfig,
}

impl ClickHouseStorage {
    pub fn new(config: ClickHouseConfig) -> Result<Self, StorageError> {
        let endpoint = Url::parse(&config.url)
            .map_err(|e| StorageError::Connection(format!("Invalid ClickHouse URL {}: {}", config.url, e)))?;
        if !is_identifier(&config.table) {
            return Err(StorageError::Connection(format!(
                "Invalid table name: {}",
                config.table
            )));
        }

        let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                StorageError::Connection(format!("Failed to read CA certificate {}: {}", path.display(), e))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| StorageError::Connection(format!("Invalid CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| StorageError::Connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    pub fn from_env() -> Result<Self, StorageError> {
        Self::new(ClickHouseConfig::from_env())
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// Sends one statement. `params` become `param_<name>` query arguments for
    /// `{name:Type}` placeholders; `data` is the request body of an INSERT.
    async fn execute(
        &self,
        sql: &str,
        params: &[(&str, &str)],
        data: Option<String>,
    ) -> Result<String, String> {
        let mut query = vec![("query".to_string(), sql.to_string())];
        query.extend(
            params
                .iter()
                .map(|(name, value)| (format!("param_{}", name), value.to_string())),
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&query)
            .header("X-ClickHouse-User", self.config.user.as_str())
            .header("X-ClickHouse-Key", self.config.password.as_str())
            .body(data.unwrap_or_default())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("HTTP {}: {}", status.as_u16(), body.trim()));
        }
        Ok(body)
    }

    fn parse_rows<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, StorageError> {
        body.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(|e| StorageError::Query(format!("Malformed row: {}", e))))
            .collect()
    }
}

#[async_trait]
impl ArticleStorage for ClickHouseStorage {
    fn name(&self) -> &str {
        "clickhouse"
    }

    async fn ensure_schema(&self) -> Result<(), StorageError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (source String, url String, title String, \
             time Nullable(String), keywords String, text String) \
             ENGINE = MergeTree() ORDER BY (source, url)",
            self.config.table
        );
        self.execute(&ddl, &[], None)
            .await
            .map(|_| ())
            .map_err(StorageError::Schema)
    }

    async fn existing_urls(&self) -> Result<HashSet<String>, StorageError> {
        let sql = format!("SELECT DISTINCT url FROM {} FORMAT JSONEachRow", self.config.table);
        let body = self
            .execute(&sql, &[], None)
            .await
            .map_err(StorageError::Query)?;
        let rows: Vec<UrlRow> = Self::parse_rows(&body)?;
        debug!(count = rows.len(), "Loaded stored URLs");
        Ok(rows.into_iter().map(|row| row.url).collect())
    }

    #[instrument(level = "debug", skip_all, fields(rows = records.len()))]
    async fn insert_batch(&self, records: &[ArticleRecord]) -> Result<usize, StorageError> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut data = String::new();
        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| StorageError::Insert(format!("Failed to encode row: {}", e)))?;
            data.push_str(&line);
            data.push('\n');
        }

        let sql = format!(
            "INSERT INTO {} (source, url, title, time, keywords, text) FORMAT JSONEachRow",
            self.config.table
        );
        self.execute(&sql, &[], Some(data))
            .await
            .map_err(StorageError::Insert)?;
        Ok(records.len())
    }

    async fn get_by_source(&self, source: Source) -> Result<Vec<ArticleRecord>, StorageError> {
        let sql = format!(
            "SELECT source, url, title, time, keywords, text FROM {} \
             WHERE source = {{source:String}} ORDER BY url FORMAT JSONEachRow",
            self.config.table
        );
        let body = self
            .execute(&sql, &[("source", source.as_str())], None)
            .await
            .map_err(StorageError::Query)?;
        Self::parse_rows(&body)
    }
}
