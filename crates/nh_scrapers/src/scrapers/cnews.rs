use lazy_static::lazy_static;
use nh_core::{ArticleCandidate, PageRange, Source};
use scraper::{ElementRef, Html, Selector};

use super::utils;
use super::Scraper;

lazy_static! {
    static ref BODY: Selector = Selector::parse(".news_container").unwrap();
}

#[derive(Debug, Clone, Default)]
pub struct CnewsScraper;

impl CnewsScraper {
    pub fn new() -> Self {
        Self
    }

    const BASE_URL: &'static str = "https://www.cnews.ru/archive/type_top_lenta_articles";
    const ARTICLE_PREFIX: &'static str = "http://www.cnews.ru/news";
}

impl Scraper for CnewsScraper {
    fn source(&self) -> Source {
        Source::Cnews
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
            .map(|page| format!("{}/page_{}", Self::BASE_URL, page))
            .collect()
    }

    fn extract_links(&self, _listing_url: &str, document: &Html) -> Vec<ArticleCandidate> {
        utils::hrefs(document)
            .filter(|href| href.starts_with(Self::ARTICLE_PREFIX))
            .map(ArticleCandidate::new)
            .collect()
    }

    fn title(&self, document: &Html) -> Option<String> {
        utils::first_h1(document)
    }

    fn body<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        document.select(&BODY).next()
    }

    // Article pages carry no machine-readable date, the URL does.
    fn published_date(&self, candidate: &ArticleCandidate, _document: &Html) -> Option<String> {
        utils::normalize_date(&candidate.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_urls() {
        let scraper = CnewsScraper::new();
        let urls = scraper.listing_urls(&PageRange::new(1, 3, 1));
        assert_eq!(
            urls,
            vec![
                "https://www.cnews.ru/archive/type_top_lenta_articles/page_1",
                "https://www.cnews.ru/archive/type_top_lenta_articles/page_2",
            ]
        );
    }

    #[test]
    fn test_extract_links() {
        let html = r#"
            <a href="http://www.cnews.ru/news/top/2024-05-03_rossijskie_it">one</a>
            <a href="https://www.cnews.ru/news/top/2024-05-03_other">https is not matched</a>
            <a href="/archive/type_top_lenta_articles/page_2">next</a>
        "#;
        let document = Html::parse_document(html);
        let links = CnewsScraper::new().extract_links("", &document);
        assert_eq!(
            links,
            vec![ArticleCandidate::new("http://www.cnews.ru/news/top/2024-05-03_rossijskie_it")]
        );
    }

    #[test]
    fn test_date_from_url() {
        let document = Html::parse_document("<html></html>");
        let scraper = CnewsScraper::new();
        let candidate = ArticleCandidate::new("http://www.cnews.ru/news/top/2024-05-03_rossijskie_it");
        assert_eq!(scraper.published_date(&candidate, &document).as_deref(), Some("03.05.2024"));

        let undated = ArticleCandidate::new("http://www.cnews.ru/news/line/rossijskie_it");
        assert_eq!(scraper.published_date(&undated, &document), None);
    }
}
