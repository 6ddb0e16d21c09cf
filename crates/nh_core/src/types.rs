use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// The news sites the pipeline knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cnews,
    Habr,
    Tadviser,
    Interfax,
}

impl Source {
    pub const ALL: [Source; 4] = [Source::Cnews, Source::Habr, Source::Tadviser, Source::Interfax];

    /// Stable identifier, stored in the `source` column and accepted by the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Cnews => "cnews",
            Source::Habr => "habr",
            Source::Tadviser => "tadviser",
            Source::Interfax => "interfax",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == wanted)
            .ok_or_else(|| Error::Config(format!("Unknown source: {}", s)))
    }
}

/// Half-open range `[start, end)` walked with `step`.
///
/// What an element means is up to the source: a listing page number, a day of
/// the month or a month of the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32, step: u32) -> Self {
        Self {
            start,
            end,
            step: step.max(1),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> {
        (self.start..self.end).step_by(self.step.max(1) as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A link found on a listing page, optionally with the date the listing
/// attributed to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArticleCandidate {
    pub url: String,
    pub context_date: Option<String>,
}

impl ArticleCandidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            context_date: None,
        }
    }

    pub fn with_date(url: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            context_date: Some(date.into()),
        }
    }
}

/// One extracted article, the unit written to storage.
///
/// Field names follow the `news` table; `published_date` is the `time` column
/// and holds `DD.MM.YYYY` when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub source: Source,
    pub url: String,
    pub title: String,
    #[serde(rename = "time")]
    pub published_date: Option<String>,
    pub keywords: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert_eq!("habr".parse::<Source>().unwrap(), Source::Habr);
        assert_eq!(" Interfax ".parse::<Source>().unwrap(), Source::Interfax);
        assert!("theverge".parse::<Source>().is_err());
        for source in Source::ALL {
            assert_eq!(source.to_string().parse::<Source>().unwrap(), source);
        }
    }

    #[test]
    fn test_page_range_iter() {
        let range = PageRange::new(1, 6, 2);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![1, 3, 5]);

        let zero_step = PageRange::new(3, 5, 0);
        assert_eq!(zero_step.iter().collect::<Vec<_>>(), vec![3, 4]);

        assert!(PageRange::new(5, 5, 1).is_empty());
        assert_eq!(PageRange::new(5, 5, 1).iter().count(), 0);
    }

    #[test]
    fn test_record_uses_table_column_names() {
        let record = ArticleRecord {
            source: Source::Habr,
            url: "https://habr.com/ru/news/1/".to_string(),
            title: "Title".to_string(),
            published_date: Some("01.05.2024".to_string()),
            keywords: String::new(),
            text: "Body".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source"], "habr");
        assert_eq!(json["time"], "01.05.2024");
        assert!(json.get("published_date").is_none());
    }
}
