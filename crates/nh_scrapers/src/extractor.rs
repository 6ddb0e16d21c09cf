//! Article stage: fetch each candidate and turn the page into a record.

use futures::stream::{self, StreamExt};
use lazy_static::lazy_static;
use nh_core::{ArticleCandidate, ArticleRecord, Discard, Fetcher};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::scrapers::utils::{attr, spaced_text, stripped_text};
use crate::scrapers::Scraper;

pub const DEFAULT_ARTICLE_CONCURRENCY: usize = 20;
/// Maximum article text length, in characters.
pub const DEFAULT_TEXT_CAP: usize = 5000;
pub const NO_TITLE: &str = "No title";

/// Characters that only show up in these sources when a page was decoded with
/// the wrong charset.
pub const CORRUPTION_MARKERS: [char; 3] = ['Å', 'æ', 'µ'];

lazy_static! {
    static ref PARAGRAPH: Selector = Selector::parse("p").unwrap();
    static ref LINK: Selector = Selector::parse("a").unwrap();
    static ref KEYWORDS: Selector = Selector::parse(r#"meta[name="keywords"]"#).unwrap();
}

/// Per-reason tally of candidates that did not become records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscardCounts {
    pub fetch: usize,
    pub missing_body: usize,
    pub empty_body: usize,
    pub corrupted: usize,
    pub panicked: usize,
}

impl DiscardCounts {
    pub fn record(&mut self, discard: &Discard) {
        match discard {
            Discard::Fetch(_) => self.fetch += 1,
            Discard::MissingBody => self.missing_body += 1,
            Discard::EmptyBody => self.empty_body += 1,
            Discard::Corrupted(_) => self.corrupted += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.fetch + self.missing_body + self.empty_body + self.corrupted + self.panicked
    }
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<ArticleRecord>,
    pub discards: DiscardCounts,
}

/// Joins the paragraphs of `body` in document order.
///
/// Paragraphs with links keep the link text, separated by spaces. Joining stops
/// once the text is longer than `cap` characters and the result is then cut
/// to exactly `cap`.
pub fn assemble_text(body: ElementRef<'_>, cap: usize) -> String {
    let mut text = String::new();
    let mut len = 0;

    for paragraph in body.select(&PARAGRAPH) {
        let piece = if paragraph.select(&LINK).next().is_some() {
            spaced_text(paragraph)
        } else {
            stripped_text(paragraph)
        };
        if piece.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
            len += 1;
        }
        len += piece.chars().count();
        text.push_str(&piece);
        if len > cap {
            break;
        }
    }

    truncate_chars(text, cap)
}

fn truncate_chars(mut text: String, cap: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(cap) {
        text.truncate(idx);
    }
    text
}

pub fn find_corruption(text: &str) -> Option<char> {
    text.chars().find(|c| CORRUPTION_MARKERS.contains(c))
}

/// Builds a record from an article page, or says why it cannot.
pub fn extract_article(
    scraper: &dyn Scraper,
    candidate: &ArticleCandidate,
    html: &str,
    text_cap: usize,
) -> Result<ArticleRecord, Discard> {
    let document = Html::parse_document(html);

    let body = scraper.body(&document).ok_or(Discard::MissingBody)?;
    let text = assemble_text(body, text_cap);
    if let Some(marker) = find_corruption(&text) {
        return Err(Discard::Corrupted(marker));
    }
    let text = scraper.clean_text(text);
    if text.trim().is_empty() {
        return Err(Discard::EmptyBody);
    }

    let title = scraper
        .title(&document)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());
    let keywords = attr(&document, &KEYWORDS, "content")
        .unwrap_or_default()
        .to_string();

    Ok(ArticleRecord {
        source: scraper.source(),
        url: scraper.canonical_url(candidate, &document),
        title,
        published_date: scraper.published_date(candidate, &document),
        keywords,
        text,
    })
}

/// Fetches and extracts one candidate.
pub async fn fetch_article(
    fetcher: &dyn Fetcher,
    scraper: &dyn Scraper,
    candidate: &ArticleCandidate,
    text_cap: usize,
) -> Result<ArticleRecord, Discard> {
    let page = fetcher.fetch(&candidate.url).await?;
    extract_article(scraper, candidate, &page.body, text_cap)
}

/// Runs the article stage over all candidates with at most `concurrency`
/// fetches in flight. Failed candidates are logged and counted, never fatal.
#[instrument(level = "info", skip_all, fields(source = %scraper.source(), candidates = candidates.len()))]
pub async fn fetch_articles(
    fetcher: Arc<dyn Fetcher>,
    scraper: Arc<dyn Scraper>,
    candidates: Vec<ArticleCandidate>,
    concurrency: usize,
    text_cap: usize,
) -> Extraction {
    let results: Vec<_> = stream::iter(candidates)
        .map(|candidate| {
            let fetcher = Arc::clone(&fetcher);
            let scraper = Arc::clone(&scraper);
            tokio::spawn(async move {
                let result = fetch_article(&*fetcher, &*scraper, &candidate, text_cap).await;
                (candidate.url, result)
            })
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut extraction = Extraction::default();
    for joined in results {
        match joined {
            Ok((_, Ok(record))) => {
                debug!(url = %record.url, chars = record.text.chars().count(), "Extracted article");
                extraction.records.push(record);
            }
            Ok((url, Err(discard))) => {
                match &discard {
                    Discard::Fetch(e) => warn!(%url, error = %e, "Article fetch failed; skipping"),
                    other => debug!(%url, reason = %other, "Article discarded"),
                }
                extraction.discards.record(&discard);
            }
            Err(e) => {
                error!(error = %e, "Article task panicked");
                extraction.discards.panicked += 1;
            }
        }
    }

    info!(
        extracted = extraction.records.len(),
        discarded = extraction.discards.total(),
        "Article stage finished"
    );
    extraction
}
