//! Listing stage: walk the listing pages of a source and gather article links.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use nh_core::{ArticleCandidate, Fetcher, PageRange};
use scraper::Html;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::scrapers::Scraper;

#[derive(Debug, Default)]
pub struct LinkCollection {
    pub candidates: HashSet<ArticleCandidate>,
    pub pages: usize,
    pub failed_pages: usize,
}

fn date_key(candidate: &ArticleCandidate) -> (bool, Option<NaiveDate>, Option<&str>) {
    let raw = candidate.context_date.as_deref();
    let parsed = raw.and_then(|d| NaiveDate::parse_from_str(d, "%d.%m.%Y").ok());
    (raw.is_none(), parsed, raw)
}

/// One candidate per URL, sorted by URL. When a URL was listed under several
/// dates the earliest one is kept; a dated candidate beats an undated one.
pub fn unique_by_url(candidates: impl IntoIterator<Item = ArticleCandidate>) -> Vec<ArticleCandidate> {
    let mut by_url: BTreeMap<String, ArticleCandidate> = BTreeMap::new();
    for candidate in candidates {
        match by_url.get(&candidate.url) {
            Some(kept) if date_key(kept) <= date_key(&candidate) => {}
            _ => {
                by_url.insert(candidate.url.clone(), candidate);
            }
        }
    }
    by_url.into_values().collect()
}

fn parse_listing(scraper: &dyn Scraper, listing_url: &str, html: &str) -> Vec<ArticleCandidate> {
    let document = Html::parse_document(html);
    scraper.extract_links(listing_url, &document)
}

/// Fetches every listing page in `range`, at most `concurrency` at a time, and
/// returns the union of the links they contain.
///
/// A page that cannot be fetched adds nothing to the result.
#[instrument(level = "info", skip_all, fields(source = %scraper.source(), ?range))]
pub async fn collect_links(
    fetcher: Arc<dyn Fetcher>,
    scraper: Arc<dyn Scraper>,
    range: &PageRange,
    concurrency: usize,
) -> LinkCollection {
    let listing_urls = scraper.listing_urls(range);
    let mut collection = LinkCollection {
        pages: listing_urls.len(),
        ..Default::default()
    };

    let mut pages = stream::iter(listing_urls)
        .map(|listing_url| {
            let fetcher = Arc::clone(&fetcher);
            let scraper = Arc::clone(&scraper);
            tokio::spawn(async move {
                let result = fetcher
                    .fetch(&listing_url)
                    .await
                    .map(|page| parse_listing(&*scraper, &listing_url, &page.body));
                (listing_url, result)
            })
        })
        .buffer_unordered(concurrency.max(1));

    while let Some(joined) = pages.next().await {
        match joined {
            Ok((listing_url, Ok(links))) => {
                debug!(url = %listing_url, links = links.len(), "Parsed listing page");
                collection.candidates.extend(links);
            }
            Ok((listing_url, Err(e))) => {
                warn!(url = %listing_url, error = %e, "Listing page fetch failed; skipping");
                collection.failed_pages += 1;
            }
            Err(e) => {
                error!(error = %e, "Listing task panicked");
                collection.failed_pages += 1;
            }
        }
    }

    info!(
        pages = collection.pages,
        failed = collection.failed_pages,
        candidates = collection.candidates.len(),
        "Listing stage finished"
    );
    collection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::habr::HabrScraper;
    use crate::scrapers::tadviser::TadviserScraper;
    use crate::testing::FakeFetcher;
    use nh_core::FetchError;

    #[tokio::test]
    async fn test_habr_listing_yields_single_article() {
        let fetcher = FakeFetcher::new().with_page(
            "https://habr.com/ru/news/page1/",
            r#"<a href="/ru/news/123/">a</a>
               <a href="/ru/news/123/comment/">c</a>
               <a href="/ru/news/page2/">p</a>"#,
        );

        let collection = collect_links(
            Arc::new(fetcher),
            Arc::new(HabrScraper::new()),
            &PageRange::new(1, 2, 1),
            4,
        )
        .await;

        let expected: HashSet<_> = [ArticleCandidate::new("https://habr.com/ru/news/123/")].into();
        assert_eq!(collection.candidates, expected);
        assert_eq!(collection.pages, 1);
        assert_eq!(collection.failed_pages, 0);
    }

    #[tokio::test]
    async fn test_union_across_pages_deduplicates() {
        let fetcher = FakeFetcher::new()
            .with_page(
                "https://habr.com/ru/news/page1/",
                r#"<a href="/ru/news/1/">one</a><a href="/ru/news/2/">two</a>"#,
            )
            .with_page(
                "https://habr.com/ru/news/page2/",
                r#"<a href="/ru/news/2/">two again</a><a href="/ru/news/1/">one again</a>"#,
            )
            .with_error("https://habr.com/ru/news/page3/", FetchError::Timeout);

        let collection = collect_links(
            Arc::new(fetcher),
            Arc::new(HabrScraper::new()),
            &PageRange::new(1, 4, 1),
            2,
        )
        .await;

        assert_eq!(collection.candidates.len(), 2);
        assert_eq!(collection.pages, 3);
        assert_eq!(collection.failed_pages, 1);
    }

    #[tokio::test]
    async fn test_context_dates_are_kept() {
        let listing = r#"<div class="center_part"><ul>
            <li><a href="/index.php/News_1">n</a></li>
        </ul></div>"#;
        let fetcher = FakeFetcher::new()
            .with_page("https://www.tadviser.ru/index.php/Архив_новостей?cdate=16.5.2024", listing)
            .with_page("https://www.tadviser.ru/index.php/Архив_новостей?cdate=17.5.2024", listing);

        let collection = collect_links(
            Arc::new(fetcher),
            Arc::new(TadviserScraper::default()),
            &PageRange::new(16, 18, 1),
            1,
        )
        .await;

        // Same URL on two days stays as two distinct (url, date) pairs.
        let expected: HashSet<_> = [
            ArticleCandidate::with_date("https://www.tadviser.ru/index.php/News_1", "16.05.2024"),
            ArticleCandidate::with_date("https://www.tadviser.ru/index.php/News_1", "17.05.2024"),
        ]
        .into();
        assert_eq!(collection.candidates, expected);
    }

    #[test]
    fn test_unique_by_url_keeps_earliest_date() {
        let candidates = vec![
            ArticleCandidate::with_date("https://www.tadviser.ru/index.php/B", "17.05.2024"),
            ArticleCandidate::with_date("https://www.tadviser.ru/index.php/A", "16.06.2024"),
            ArticleCandidate::with_date("https://www.tadviser.ru/index.php/A", "01.06.2024"),
            ArticleCandidate::new("https://www.tadviser.ru/index.php/B"),
            ArticleCandidate::with_date("https://www.tadviser.ru/index.php/B", "16.05.2024"),
            ArticleCandidate::new("https://habr.com/ru/news/1/"),
        ];

        assert_eq!(
            unique_by_url(candidates),
            vec![
                ArticleCandidate::new("https://habr.com/ru/news/1/"),
                ArticleCandidate::with_date("https://www.tadviser.ru/index.php/A", "01.06.2024"),
                ArticleCandidate::with_date("https://www.tadviser.ru/index.php/B", "16.05.2024"),
            ]
        );
    }
}
