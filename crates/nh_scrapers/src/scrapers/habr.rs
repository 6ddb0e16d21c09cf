use lazy_static::lazy_static;
use nh_core::{ArticleCandidate, PageRange, Source};
use scraper::{ElementRef, Html, Selector};

use super::utils;
use super::Scraper;

lazy_static! {
    static ref BODY: Selector = Selector::parse("div.tm-article-body").unwrap();
    static ref PUBLISHED: Selector =
        Selector::parse(r#"meta[property="aiturec:datetime"]"#).unwrap();
}

#[derive(Debug, Clone, Default)]
pub struct HabrScraper;

impl HabrScraper {
    pub fn new() -> Self {
        Self
    }

    const BASE_URL: &'static str = "https://habr.com/ru/news";
    const HOST: &'static str = "https://habr.com";

    fn filter_href(href: &str) -> bool {
        href.starts_with("/ru/news/")
            && !href.contains("page")
            && !href.contains("comment")
            && !href.ends_with("/ru/news/")
    }
}

impl Scraper for HabrScraper {
    fn source(&self) -> Source {
        Source::Habr
    }

    fn base_url(&self) -> &str {
        Self::BASE_URL
    }

    fn default_range(&self) -> PageRange {
        PageRange::new(1, 51, 1)
    }

    fn listing_urls(&self, range: &PageRange) -> Vec<String> {
        range
            .iter()
            .map(|page| format!("{}/page{}/", Self::BASE_URL, page))
            .collect()
    }

    fn extract_links(&self, _listing_url: &str, document: &Html) -> Vec<ArticleCandidate> {
        utils::hrefs(document)
            .filter(|href| Self::filter_href(href))
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
}
