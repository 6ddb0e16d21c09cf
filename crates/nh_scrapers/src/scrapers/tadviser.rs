use chrono::NaiveDate;
use lazy_static::lazy_static;
use nh_core::{ArticleCandidate, PageRange, Source};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::borrow::Cow;

use super::utils;
use super::Scraper;

lazy_static! {
    static ref CDATE: Regex = Regex::new(r"cdate=(\d{1,2})\.(\d{1,2})\.(\d{4})").unwrap();
    static ref CENTER: Selector = Selector::parse("div.center_part").unwrap();
    static ref ITEM: Selector = Selector::parse("li").unwrap();
    static ref ANCHOR: Selector = Selector::parse("a").unwrap();
    static ref BODY: Selector = Selector::parse("div.js-mediator-article").unwrap();
}

/// The news archive is one page per day, so the range walks days of
/// `month`/`year`. Article pages have no date of their own; it is taken from
/// the archive page the link was found on.
#[derive(Debug, Clone)]
pub struct TadviserScraper {
    month: u32,
    year: i32,
}

impl Default for TadviserScraper {
    fn default() -> Self {
        Self::new(5, 2024)
    }
}

impl TadviserScraper {
    pub fn new(month: u32, year: i32) -> Self {
        Self { month, year }
    }

    const BASE_URL: &'static str = "https://www.tadviser.ru/index.php/Архив_новостей?cdate=";
    const HOST: &'static str = "https://www.tadviser.ru";
    const ARTICLE_PREFIX: &'static str = "/index.php/";

    /// Date of an archive page, from its `cdate=D.M.YYYY` parameter.
    fn listing_date(listing_url: &str) -> Option<String> {
        let caps = CDATE.captures(listing_url)?;
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%d.%m.%Y").to_string())
    }
}

impl Scraper for TadviserScraper {
    fn source(&self) -> Source {
        Source::Tadviser
    }

    fn base_url(&self) -> &str {
        Self::BASE_URL
    }

    fn default_range(&self) -> PageRange {
        PageRange::new(16, 32, 1)
    }

    fn listing_urls(&self, range: &PageRange) -> Vec<String> {
        range
            .iter()
            .map(|day| format!("{}{}.{}.{}", Self::BASE_URL, day, self.month, self.year))
            .collect()
    }

    fn extract_links(&self, listing_url: &str, document: &Html) -> Vec<ArticleCandidate> {
        let (Some(date), Some(center)) = (Self::listing_date(listing_url), document.select(&CENTER).next())
        else {
            return Vec::new();
        };

        center
            .select(&ITEM)
            .filter_map(|item| item.select(&ANCHOR).next())
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| href.starts_with(Self::ARTICLE_PREFIX))
            .map(|href| {
                let path = urlencoding::decode(href).unwrap_or(Cow::Borrowed(href));
                ArticleCandidate::with_date(format!("{}{}", Self::HOST, path), date.clone())
            })
            .collect()
    }

    fn title(&self, document: &Html) -> Option<String> {
        utils::first_h1(document)
    }

    fn body<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        document.select(&BODY).next()
    }

    fn published_date(&self, candidate: &ArticleCandidate, _document: &Html) -> Option<String> {
        candidate.context_date.clone()
    }
}
