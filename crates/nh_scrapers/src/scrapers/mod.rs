use nh_core::{ArticleCandidate, PageRange, Source};
use scraper::{ElementRef, Html};

pub mod cnews;
pub mod habr;
pub mod interfax;
pub mod tadviser;

use cnews::CnewsScraper;
use habr::HabrScraper;
use interfax::InterfaxScraper;
use tadviser::TadviserScraper;

/// Listing pages fetched at once unless a source asks for less.
pub const DEFAULT_LISTING_CONCURRENCY: usize = 10;

/// Site-specific rules for one news source.
///
/// The pipeline does the fetching; a scraper only turns URLs and parsed
/// documents into candidates and fields.
pub trait Scraper: Send + Sync {
    fn source(&self) -> Source;

    /// Root of the listing pages
    fn base_url(&self) -> &str;

    /// The range walked when a run does not specify one
    fn default_range(&self) -> PageRange;

    /// How many listing pages may be in flight at once
    fn listing_concurrency(&self) -> usize {
        DEFAULT_LISTING_CONCURRENCY
    }

    /// Every listing page URL for the given range
    fn listing_urls(&self, range: &PageRange) -> Vec<String>;

    /// Article candidates found on one listing page
    fn extract_links(&self, listing_url: &str, document: &Html) -> Vec<ArticleCandidate>;

    fn title(&self, document: &Html) -> Option<String>;

    /// The block whose paragraphs make up the article text
    fn body<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>>;

    /// Publication date as `DD.MM.YYYY`
    fn published_date(&self, candidate: &ArticleCandidate, document: &Html) -> Option<String>;

    /// URL the record is stored under
    fn canonical_url(&self, candidate: &ArticleCandidate, _document: &Html) -> String {
        candidate.url.clone()
    }

    /// Source-specific cleanup of the assembled body text
    fn clean_text(&self, text: String) -> String {
        text
    }
}

pub type ScraperFactory = Box<dyn Fn() -> Box<dyn Scraper> + Send + Sync>;

/// Returns the scraper for a source with its default settings
pub fn for_source(source: Source) -> Box<dyn Scraper> {
    match source {
        Source::Cnews => Box::new(CnewsScraper::new()),
        Source::Habr => Box::new(HabrScraper::new()),
        Source::Tadviser => Box::new(TadviserScraper::default()),
        Source::Interfax => Box::new(InterfaxScraper::default()),
    }
}

pub fn get_scraper_factories() -> Vec<ScraperFactory> {
    Source::ALL
        .into_iter()
        .map(|source| Box::new(move || for_source(source)) as ScraperFactory)
        .collect()
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use chrono::NaiveDate;
    use lazy_static::lazy_static;
    use regex::Regex;
    use scraper::{ElementRef, Html, Selector};

    lazy_static! {
        static ref ISO_DATE: Regex = Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap();
        static ref ANCHOR: Selector = Selector::parse("a[href]").unwrap();
        static ref H1: Selector = Selector::parse("h1").unwrap();
        static ref OG_TITLE: Selector = Selector::parse(r#"meta[property="og:title"]"#).unwrap();
    }

    /// Text of an element with each text node trimmed and glued together.
    pub fn stripped_text(element: ElementRef<'_>) -> String {
        element.text().map(str::trim).collect::<String>()
    }

    /// Text of an element with non-empty trimmed text nodes joined by spaces.
    pub fn spaced_text(element: ElementRef<'_>) -> String {
        element
            .text()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn hrefs(document: &Html) -> impl Iterator<Item = &str> {
        document.select(&ANCHOR).filter_map(|a| a.value().attr("href"))
    }

    pub fn attr<'a>(document: &'a Html, selector: &Selector, name: &str) -> Option<&'a str> {
        document
            .select(selector)
            .next()
            .and_then(|el| el.value().attr(name))
    }

    pub fn first_h1(document: &Html) -> Option<String> {
        document.select(&H1).next().map(stripped_text)
    }

    pub fn og_title(document: &Html) -> Option<String> {
        attr(document, &OG_TITLE, "content").map(|s| s.trim().to_string())
    }

    /// Finds the first `YYYY-MM-DD` in `value` and renders it as `DD.MM.YYYY`.
    pub fn normalize_date(value: &str) -> Option<String> {
        let caps = ISO_DATE.captures(value)?;
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%d.%m.%Y").to_string())
    }
}
