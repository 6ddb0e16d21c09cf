pub mod cli;
pub mod collector;
pub mod extractor;
pub mod fetcher;
pub mod logging;
pub mod manager;
pub mod scrapers;

#[cfg(test)]
pub(crate) mod testing;

pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use collector::{collect_links, unique_by_url, LinkCollection};
pub use extractor::{extract_article, fetch_article, fetch_articles, DiscardCounts, Extraction};
pub use fetcher::HttpFetcher;
pub use logging::init_logging;
pub use manager::{PipelineConfig, RunReport, ScraperManager, SourceJob};
pub use scrapers::Scraper;

pub mod prelude {
    pub use super::manager::{PipelineConfig, ScraperManager, SourceJob};
    pub use super::scrapers::Scraper;
    pub use nh_core::{ArticleRecord, Error, PageRange, Result, Source};
}
