//! HTTP fetching shared by the listing and article stages.

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};
use lazy_static::lazy_static;
use nh_core::{FetchError, FetchedPage, Fetcher, Result};
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                      (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// How much of the body is searched for a `<meta>` charset declaration.
const META_SNIFF_LEN: usize = 2048;

lazy_static! {
    static ref META_CHARSET: Regex =
        Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_\-:.]+)"#).unwrap();
}

/// `Fetcher` backed by a shared reqwest client. Redirects follow the client
/// default policy.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(classify)?;

        let (body, encoding) = decode_body(&bytes, content_type.as_deref());
        debug!(%url, encoding = encoding.name(), bytes = bytes.len(), "Fetched page");

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body,
            encoding: encoding.name(),
        })
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}

/// Decodes a response body, detecting the encoding when it is not declared.
///
/// Order: `Content-Type` charset, `<meta>` charset in the head of the
/// document, valid UTF-8, and finally windows-1251 since the sources are
/// Russian-language sites.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> (String, &'static Encoding) {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_meta(bytes))
        .unwrap_or_else(|| {
            if std::str::from_utf8(bytes).is_ok() {
                UTF_8
            } else {
                WINDOWS_1251
            }
        });

    let (text, used, _had_errors) = encoding.decode(bytes);
    (text.into_owned(), used)
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SNIFF_LEN)];
    let head = String::from_utf8_lossy(head);
    META_CHARSET
        .captures(&head)
        .and_then(|caps| Encoding::for_label(caps[1].as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CYRILLIC: &str = "Новости технологий";

    #[test]
    fn test_decode_header_charset() {
        let (bytes, _, _) = WINDOWS_1251.encode(CYRILLIC);
        let (text, encoding) = decode_body(&bytes, Some("text/html; charset=windows-1251"));
        assert_eq!(text, CYRILLIC);
        assert_eq!(encoding, WINDOWS_1251);
    }

    #[test]
    fn test_decode_meta_charset() {
        let html = format!(r#"<html><head><meta charset="windows-1251"></head><body>{}</body></html>"#, CYRILLIC);
        let (bytes, _, _) = WINDOWS_1251.encode(&html);
        let (text, encoding) = decode_body(&bytes, Some("text/html"));
        assert!(text.contains(CYRILLIC));
        assert_eq!(encoding, WINDOWS_1251);
    }

    #[test]
    fn test_decode_http_equiv_charset() {
        let html = format!(
            r#"<meta http-equiv="Content-Type" content="text/html; charset=windows-1251"><p>{}</p>"#,
            CYRILLIC
        );
        let (bytes, _, _) = WINDOWS_1251.encode(&html);
        let (text, _) = decode_body(&bytes, None);
        assert!(text.contains(CYRILLIC));
    }

    #[test]
    fn test_decode_undeclared() {
        let (text, encoding) = decode_body(CYRILLIC.as_bytes(), None);
        assert_eq!(text, CYRILLIC);
        assert_eq!(encoding, UTF_8);

        let (bytes, _, _) = WINDOWS_1251.encode(CYRILLIC);
        let (text, encoding) = decode_body(&bytes, None);
        assert_eq!(text, CYRILLIC);
        assert_eq!(encoding, WINDOWS_1251);
    }

    #[tokio::test]
    async fn test_fetch_ok() {
        let server = MockServer::start().await;
        let (bytes, _, _) = WINDOWS_1251.encode(CYRILLIC);
        Mock::given(method("GET"))
            .and(path("/news/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=windows-1251")
                    .set_body_bytes(bytes.into_owned()),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT).unwrap();
        let page = fetcher.fetch(&format!("{}/news/1", server.uri())).await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.body, CYRILLIC);
        assert_eq!(page.encoding, "windows-1251");
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT).unwrap();
        let err = fetcher.fetch(&format!("{}/missing", server.uri())).await.unwrap_err();
        assert_eq!(err, FetchError::HttpStatus(404));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_millis(100), DEFAULT_USER_AGENT).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert_eq!(err, FetchError::Timeout);
    }

    #[tokio::test]
    async fn test_fetch_network_error() {
        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
