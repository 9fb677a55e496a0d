use std::io::Cursor;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use tracing::{debug, info};

use crate::error::IntegrationError;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; KaizenBot/1.0; +https://telegram.org)";

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub text: String,
}

impl ScrapedPage {
    /// First `max_chars` characters of the text, cut at a word boundary.
    pub fn excerpt(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            return self.text.clone();
        }
        let cut: String = self.text.chars().take(max_chars).collect();
        let cut = match cut.rfind(char::is_whitespace) {
            Some(idx) if cut[..idx].chars().count() > max_chars / 2 => &cut[..idx],
            _ => cut.as_str(),
        };
        format!("{}…", cut.trim_end())
    }
}

pub struct Scraper {
    client: Client,
}

impl Scraper {
    pub fn new() -> Result<Self, IntegrationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IntegrationError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<ScrapedPage, IntegrationError> {
        let url = url.trim();
        let parsed = Url::parse(url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| {
                IntegrationError::InvalidInput(
                    "Please send a valid URL starting with http:// or https://".into(),
                )
            })?;

        info!(url, "Scraping page");
        let resp = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| IntegrationError::network(&e))?;
        let status = resp.status();
        let html = resp.text().await.map_err(|e| IntegrationError::network(&e))?;
        if !status.is_success() {
            return Err(IntegrationError::from_status(status.as_u16(), &html));
        }

        let (title, text) = extract(&html, &parsed);
        Ok(ScrapedPage {
            url: url.to_string(),
            title,
            text,
        })
    }
}

/// Title and readable text of an HTML document. Readability extraction
/// first; pages it can't make sense of are converted whole to markdown.
pub fn extract(html: &str, url: &Url) -> (String, String) {
    let mut cursor = Cursor::new(html.as_bytes());
    let (title, text) = match llm_readability::extractor::extract(&mut cursor, url) {
        Ok(product) if !product.text.trim().is_empty() => (product.title, product.text),
        other => {
            if let Err(e) = other {
                debug!("Readability failed for {}: {}", url, e);
            }
            let markdown = htmd::convert(html).unwrap_or_else(|_| html.to_string());
            (String::new(), markdown)
        }
    };

    let title = Some(tidy_line(&title))
        .filter(|t| !t.is_empty())
        .or_else(|| {
            TITLE_RE
                .captures(html)
                .map(|c| tidy_line(&c[1]))
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| "Untitled page".to_string());

    (title, tidy(&text))
}

fn tidy_line(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse runs of whitespace inside lines and drop blank lines.
fn tidy(text: &str) -> String {
    text.lines()
        .map(tidy_line)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
