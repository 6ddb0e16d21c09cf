use lazy_static::lazy_static;
use nh_core::{ArticleCandidate, PageRange, Source};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::utils;
use super::Scraper;

lazy_static! {
    static ref BODY: Selector = Selector::parse(r#"article[itemprop="articleBody"]"#).unwrap();
    static ref PUBLISHED: Selector =
        Selector::parse(r#"meta[property="article:published_time"]"#).unwrap();
    static ref CANONICAL: Selector = Selector::parse(r#"link[rel="canonical"]"#).unwrap();
    static ref DATELINE: Regex = Regex::new(r"Москва\.\s.*?INTERFAX\.RU\s-\s").unwrap();
}

const SECTIONS: [&str; 4] = ["/digital/9", "/business/9", "/russia/9", "/world/9"];
const DAYS_PER_MONTH: u32 = 31;
const PAGES_PER_DAY: u32 = 2;

/// The archive is split by month and day with a couple of pages each, so the
/// range walks months of `year`.
#[derive(Debug, Clone)]
pub struct InterfaxScraper {
    year: i32,
    base_url: String,
}

impl Default for InterfaxScraper {
    fn default() -> Self {
        Self::new(2024)
    }
}

impl InterfaxScraper {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            base_url: format!("https://www.interfax.ru/news/{}/", year),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    const HOST: &'static str = "https://www.interfax.ru";
}

impl Scraper for InterfaxScraper {
    fn source(&self) -> Source {
        Source::Interfax
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn default_range(&self) -> PageRange {
        PageRange::new(5, 7, 1)
    }

    // Dozens of archive pages per month; the site throttles aggressive clients.
    fn listing_concurrency(&self) -> usize {
        2
    }

    fn listing_urls(&self, range: &PageRange) -> Vec<String> {
        let mut urls = Vec::new();
        for month in range.iter() {
            for day in 1..=DAYS_PER_MONTH {
                for page in 1..=PAGES_PER_DAY {
                    urls.push(format!("{}{}/{}/all/page_{}", self.base_url, month, day, page));
                }
            }
        }
        urls
    }

    fn extract_links(&self, _listing_url: &str, document: &Html) -> Vec<ArticleCandidate> {
        utils::hrefs(document)
            .filter(|href| SECTIONS.iter().any(|prefix| href.starts_with(prefix)))
            .map(|href| ArticleCandidate::new(format!("{}{}", Self::HOST, href)))
            .collect()
    }

    fn title(&self, document: &Html) -> Option<String> {
        utils::og_title(document)
    }

    fn body<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        document.select(&BODY).next()
    }

    fn published_date(&self, _candidate: &ArticleCandidate, document: &Html) -> Option<String> {
        utils::attr(document, &PUBLISHED, "content").and_then(utils::normalize_date)
    }

    fn canonical_url(&self, candidate: &ArticleCandidate, document: &Html) -> String {
        utils::attr(document, &CANONICAL, "href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .and_then(|href| {
                Url::parse(&candidate.url)
                    .and_then(|base| base.join(href))
                    .ok()
            })
            .map(|url| url.to_string())
            .unwrap_or_else(|| candidate.url.clone())
    }

    fn clean_text(&self, text: String) -> String {
        DATELINE.replace_all(&text, "").into_owned()
    }
}
