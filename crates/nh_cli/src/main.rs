use clap::Parser;
use nh_scrapers::{handle_command, init_logging, PipelineConfig, ScraperArgs, ScraperCommands, ScraperManager};
use nh_storage::backends::clickhouse::{DEFAULT_TABLE, DEFAULT_URL, DEFAULT_USER};
use nh_storage::{ClickHouseConfig, StorageKind, StorageSettings, DEFAULT_SQLITE_PATH};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "nh", author, version, about = "Crawl Russian tech news sites and store the articles")]
pub struct Cli {
    /// Where extracted articles are written
    #[arg(long, value_enum, env = "NH_STORAGE", default_value_t = StorageKind::ClickHouse, global = true)]
    storage: StorageKind,

    #[arg(long, env = "CLICKHOUSE_URL", default_value = DEFAULT_URL, global = true)]
    clickhouse_url: String,

    #[arg(long, env = "CLICKHOUSE_USER", default_value = DEFAULT_USER, global = true)]
    clickhouse_user: String,

    #[arg(long, env = "CLICKHOUSE_PASSWORD", default_value = "", hide_env_values = true, global = true)]
    clickhouse_password: String,

    /// PEM root certificate used to verify the ClickHouse server
    #[arg(long, env = "CLICKHOUSE_CA_CERT", global = true)]
    clickhouse_ca_cert: Option<PathBuf>,

    #[arg(long, env = "CLICKHOUSE_TABLE", default_value = DEFAULT_TABLE, global = true)]
    clickhouse_table: String,

    #[arg(long, env = "NH_SQLITE_PATH", default_value = DEFAULT_SQLITE_PATH, global = true)]
    sqlite_path: PathBuf,

    /// Article pages fetched at once
    #[arg(long, default_value_t = nh_scrapers::extractor::DEFAULT_ARTICLE_CONCURRENCY, global = true)]
    article_concurrency: usize,

    /// Listing pages fetched at once (defaults to each source's own limit)
    #[arg(long, global = true)]
    listing_concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "NH_LOG", default_value = nh_scrapers::logging::DEFAULT_FILTER, global = true)]
    log_level: String,

    #[command(flatten)]
    scraper: ScraperArgs,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            request_timeout: Duration::from_secs(self.timeout.max(1)),
            article_concurrency: self.article_concurrency.max(1),
            listing_concurrency: self.listing_concurrency,
            ..Default::default()
        }
    }

    fn storage_settings(&self) -> StorageSettings {
        let mut clickhouse = ClickHouseConfig::new(
            self.clickhouse_url.as_str(),
            self.clickhouse_user.as_str(),
            self.clickhouse_password.as_str(),
        )
        .with_table(self.clickhouse_table.as_str());
        clickhouse.ca_cert = self.clickhouse_ca_cert.clone();

        StorageSettings {
            clickhouse,
            sqlite_path: self.sqlite_path.clone(),
        }
    }

    /// Only `scrape` writes anything; the other commands never open a real backend.
    fn effective_storage(&self) -> StorageKind {
        match self.scraper.command {
            ScraperCommands::Scrape { .. } => self.storage,
            _ => StorageKind::Memory,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let kind = cli.effective_storage();
    let storage = nh_storage::create_storage(kind, &cli.storage_settings()).await?;
    info!(storage = %kind, "Storage initialized");

    let config = cli.pipeline_config();
    let fetcher = Arc::new(config.http_fetcher()?);
    let manager = ScraperManager::new(fetcher, storage, config);

    handle_command(cli.scraper, &manager).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nh_core::Source;

    #[test]
    fn test_cli_scrape_flags() {
        let cli = Cli::parse_from([
            "nh",
            "scrape",
            "habr",
            "cnews",
            "--start",
            "2",
            "--storage",
            "clickhouse",
            "--clickhouse-table",
            "news_test",
            "--article-concurrency",
            "5",
            "--timeout",
            "10",
        ]);

        assert_eq!(cli.storage, StorageKind::ClickHouse);
        assert_eq!(cli.effective_storage(), StorageKind::ClickHouse);
        assert_eq!(cli.storage_settings().clickhouse.table, "news_test");

        let config = cli.pipeline_config();
        assert_eq!(config.article_concurrency, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.listing_concurrency, None);

        match &cli.scraper.command {
            ScraperCommands::Scrape { sources, start, end, .. } => {
                assert_eq!(sources, &vec![Source::Habr, Source::Cnews]);
                assert_eq!(*start, Some(2));
                assert_eq!(*end, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_scrape_defaults_to_clickhouse() {
        let cli = Cli::parse_from(["nh", "scrape"]);
        assert_eq!(cli.storage, StorageKind::ClickHouse);
        assert_eq!(cli.effective_storage(), StorageKind::ClickHouse);
    }

    #[test]
    fn test_cli_url_never_opens_backend() {
        let cli = Cli::parse_from([
            "nh",
            "--storage",
            "sqlite",
            "url",
            "habr",
            "https://habr.com/ru/news/1/",
        ]);
        assert_eq!(cli.storage, StorageKind::Sqlite);
        assert_eq!(cli.effective_storage(), StorageKind::Memory);
    }

    #[test]
    fn test_cli_rejects_unknown_storage() {
        assert!(Cli::try_parse_from(["nh", "--storage", "qdrant", "list"]).is_err());
    }
}
