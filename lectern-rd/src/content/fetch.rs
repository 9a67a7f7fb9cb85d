//! Web page fetching and readable-text extraction
//!
//! Fetches a page over HTTP and reduces it to narratable text. Extraction is
//! deliberately shallow (html2text rendering, not a readability heuristic):
//! good enough for article and chapter pages, cheap to reason about.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Render width handed to html2text; wide enough that most paragraphs come
/// out as single logical blocks
const TEXT_WIDTH: usize = 200;

static TITLE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid pattern"));

/// A fetched page reduced to narratable form
#[derive(Debug, Clone)]
pub struct Article {
    pub title: Option<String>,
    pub text: String,
}

/// Fetch `url` and extract its readable text
///
/// Fails on transport errors, non-success statuses and oversized bodies;
/// callers surface these as gateway errors without touching narrator state.
pub async fn fetch_article(
    client: &reqwest::Client,
    url: &str,
    max_body_bytes: usize,
) -> Result<Article> {
    debug!("Fetching content from {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Fetch(format!("request to {} failed: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Fetch(format!("{} returned HTTP {}", url, status)));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Fetch(format!("reading body from {} failed: {}", url, e)))?;

    if body.len() > max_body_bytes {
        return Err(Error::Fetch(format!(
            "{} body exceeds {} bytes",
            url, max_body_bytes
        )));
    }

    let html = String::from_utf8_lossy(&body);
    let title = extract_title(&html);
    let text = readable_text(&body);

    debug!(
        "Extracted {} chars of text from {} (title: {:?})",
        text.chars().count(),
        url,
        title
    );

    Ok(Article { title, text })
}

/// Render HTML to plain text, paragraphs separated by blank lines
fn readable_text(html: &[u8]) -> String {
    html2text::from_read(html, TEXT_WIDTH)
}

/// Pull the page title out of the raw HTML
fn extract_title(html: &str) -> Option<String> {
    TITLE_TAG
        .captures(html)
        .map(|caps| caps[1].split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|title| !title.is_empty())
}
