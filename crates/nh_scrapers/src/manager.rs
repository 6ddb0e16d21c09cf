use nh_core::{
    ArticleCandidate, ArticleRecord, ArticleStorage, Discard, Fetcher, PageRange, Result, Source,
};
use nh_storage::sink::{persist, PersistReport};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::collector::{collect_links, unique_by_url};
use crate::extractor::{
    fetch_article, fetch_articles, DiscardCounts, DEFAULT_ARTICLE_CONCURRENCY, DEFAULT_TEXT_CAP,
};
use crate::fetcher::{HttpFetcher, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::scrapers::{self, Scraper};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
    pub article_concurrency: usize,
    /// Overrides every scraper's own listing concurrency when set
    pub listing_concurrency: Option<usize>,
    pub text_cap: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            article_concurrency: DEFAULT_ARTICLE_CONCURRENCY,
            listing_concurrency: None,
            text_cap: DEFAULT_TEXT_CAP,
        }
    }
}

impl PipelineConfig {
    pub fn http_fetcher(&self) -> Result<HttpFetcher> {
        HttpFetcher::new(self.request_timeout, &self.user_agent)
    }
}

/// One source to crawl, with the range to walk (the scraper's default when
/// `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceJob {
    pub source: Source,
    pub range: Option<PageRange>,
}

impl SourceJob {
    pub fn new(source: Source) -> Self {
        Self { source, range: None }
    }

    pub fn with_range(source: Source, range: PageRange) -> Self {
        Self {
            source,
            range: Some(range),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source: Source,
    pub listing_pages: usize,
    pub failed_pages: usize,
    pub candidates: usize,
    pub extracted: usize,
    pub discards: DiscardCounts,
    pub persist: PersistReport,
}

/// Runs the crawl-extract-store pipeline with injected fetch and storage
/// clients.
pub struct ScraperManager {
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<dyn ArticleStorage>,
    config: PipelineConfig,
}

impl ScraperManager {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        storage: Arc<dyn ArticleStorage>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            storage,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn ArticleStorage> {
        &self.storage
    }

    /// Runs each job in turn. A failing job does not stop the ones after it.
    pub async fn run(&self, jobs: &[SourceJob]) -> Vec<(Source, Result<RunReport>)> {
        let mut reports = Vec::with_capacity(jobs.len());
        for job in jobs {
            let result = self.run_source(job).await;
            if let Err(e) = &result {
                error!(source = %job.source, error = %e, "Pipeline run failed");
            }
            reports.push((job.source, result));
        }
        reports
    }

    pub async fn run_source(&self, job: &SourceJob) -> Result<RunReport> {
        let scraper: Arc<dyn Scraper> = Arc::from(scrapers::for_source(job.source));
        let range = job.range.unwrap_or_else(|| scraper.default_range());
        self.run_scraper(scraper, range).await
    }

    /// Listing stage, article stage, then dedup and insert. Only storage
    /// failures are returned as errors.
    #[instrument(level = "info", skip_all, fields(source = %scraper.source()))]
    pub async fn run_scraper(&self, scraper: Arc<dyn Scraper>, range: PageRange) -> Result<RunReport> {
        let listing_concurrency = self
            .config
            .listing_concurrency
            .unwrap_or_else(|| scraper.listing_concurrency());
        if range.is_empty() {
            warn!(?range, "Range is empty; no listing pages to fetch");
        }
        info!(?range, listing_concurrency, "Collecting article links");

        let links = collect_links(
            Arc::clone(&self.fetcher),
            Arc::clone(&scraper),
            &range,
            listing_concurrency,
        )
        .await;

        // A URL listed under several dates is still fetched once.
        let candidates = unique_by_url(links.candidates);
        let candidate_count = candidates.len();

        let extraction = fetch_articles(
            Arc::clone(&self.fetcher),
            Arc::clone(&scraper),
            candidates,
            self.config.article_concurrency,
            self.config.text_cap,
        )
        .await;
        let extracted = extraction.records.len();

        let persisted = persist(self.storage.as_ref(), extraction.records).await?;

        let report = RunReport {
            source: scraper.source(),
            listing_pages: links.pages,
            failed_pages: links.failed_pages,
            candidates: candidate_count,
            extracted,
            discards: extraction.discards,
            persist: persisted,
        };
        info!(
            candidates = report.candidates,
            extracted = report.extracted,
            discarded = report.discards.total(),
            inserted = report.persist.inserted,
            duplicates = report.persist.duplicates,
            "Pipeline run complete"
        );
        Ok(report)
    }

    /// Extracts a single article without storing it.
    pub async fn scrape_url(
        &self,
        source: Source,
        url: &str,
    ) -> std::result::Result<ArticleRecord, Discard> {
        let scraper = scrapers::for_source(source);
        let candidate = ArticleCandidate::new(url);
        fetch_article(self.fetcher.as_ref(), scraper.as_ref(), &candidate, self.config.text_cap).await
    }
}
