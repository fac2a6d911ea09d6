//! Page scraping for style references.
//!
//! `extract_main_text` picks the best-effort "main content" of a page in a fixed
//! preference order; the first non-empty candidate wins:
//! 1. social preview description (`og:description` / `twitter:description`)
//! 2. first article-like container
//! 3. first main-content-like container
//! 4. the whole document body

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Browser-like identification; many sites refuse unknown agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

const PREVIEW_META: &str =
    r#"meta[property="og:description"], meta[name="og:description"], meta[name="twitter:description"]"#;
const ARTICLE_CONTAINERS: &str =
    r#"article, [itemprop="articleBody"], .post-content, .article-body, .entry-content"#;
const MAIN_CONTAINERS: &str = r#"main, [role="main"], #content, .content"#;
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Fetches a page and returns its extracted prose, or an empty string.
/// Implementations never fail past this boundary.
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape_text(&self, url: &str) -> String;
}

#[derive(Clone)]
pub struct HttpPageScraper {
    client: Client,
}

impl HttpPageScraper {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .user_agent(BROWSER_USER_AGENT)
                .timeout(SCRAPE_TIMEOUT)
                .build()?,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl PageScraper for HttpPageScraper {
    async fn scrape_text(&self, url: &str) -> String {
        match self.fetch(url).await {
            Ok(html) => {
                let text = extract_main_text(&html);
                debug!("Scraped {} characters from {url}", text.len());
                text
            }
            Err(e) => {
                warn!("Failed to scrape style source {url}: {e}");
                String::new()
            }
        }
    }
}

/// Extracts the main prose of an HTML document, whitespace-collapsed and trimmed.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    if let Some(description) = select_all(&document, PREVIEW_META)
        .into_iter()
        .filter_map(|meta| meta.value().attr("content"))
        .map(collapse_whitespace)
        .find(|text| !text.is_empty())
    {
        return description;
    }

    for group in [ARTICLE_CONTAINERS, MAIN_CONTAINERS] {
        if let Some(first) = select_all(&document, group).into_iter().next() {
            let text = visible_text(first);
            if !text.is_empty() {
                return text;
            }
        }
    }

    select_all(&document, "body")
        .into_iter()
        .next()
        .map(visible_text)
        .unwrap_or_else(|| visible_text(document.root_element()))
}

fn select_all<'a>(document: &'a Html, selectors: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selectors) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Text content of `element`, skipping script-like subtrees.
fn visible_text(element: ElementRef<'_>) -> String {
    let raw: Vec<&str> = element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
            });
            (!hidden).then_some(&**text)
        })
        .collect();
    collapse_whitespace(&raw.join(" "))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_description_wins_over_article() {
        let html = r#"<html><head>
            <meta property="og:description" content="  Short,   punchy summary. ">
            </head><body><article>Long article body.</article></body></html>"#;
        assert_eq!(extract_main_text(html), "Short, punchy summary.");
    }

    #[test]
    fn test_article_wins_over_main() {
        let html = r#"<html><body>
            <main><p>Main wrapper text</p><article><p>Article   text</p>
            <p>second para</p></article></main></body></html>"#;
        assert_eq!(extract_main_text(html), "Article text second para");
    }

    #[test]
    fn test_main_used_when_no_article() {
        let html = r#"<html><body><nav>Menu</nav>
            <div role="main">Main content here</div></body></html>"#;
        assert_eq!(extract_main_text(html), "Main content here");
    }

    #[test]
    fn test_empty_preview_falls_through() {
        let html = r#"<html><head><meta property="og:description" content="   "></head>
            <body><article>Fallback article</article></body></html>"#;
        assert_eq!(extract_main_text(html), "Fallback article");
    }

    #[test]
    fn test_whole_body_fallback_skips_scripts() {
        let html = r#"<html><body><div>Hello
            there</div><script>var tracking = 1;</script><p>friend</p></body></html>"#;
        assert_eq!(extract_main_text(html), "Hello there friend");
    }

    #[test]
    fn test_empty_document_yields_empty_string() {
        assert_eq!(extract_main_text(""), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\n b\t c  "), "a b c");
    }
}
