//! Fetches a saved page and reduces it to readable paragraphs.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::config::AppConfig;
use crate::util::{collapse_whitespace, is_http_url};
use crate::{Error, Result};

/// Candidate content containers, most specific first
const CONTENT_ROOTS: [&str; 4] = ["article", "main", "[role=\"main\"]", "body"];

/// Elements whose text forms one paragraph of output
const BLOCK_ELEMENTS: [&str; 10] = [
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "pre", "blockquote",
];

/// Page chrome that never counts as article text
const SKIPPED_ELEMENTS: [&str; 9] = [
    "nav", "header", "footer", "aside", "form", "script", "style", "noscript", "template",
];

#[derive(Clone, Debug)]
pub struct ArticleFetcher {
    client: Client,
}

impl ArticleFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;
        Ok(Self { client })
    }

    /// Only the HTTP timeout is needed; no consumer key.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.http_timeout)
    }

    /// Download `url` and return its readable text, paragraphs separated by a
    /// blank line.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        if !is_http_url(url) {
            return Err(Error::InvalidInput(format!(
                "cannot fetch article text from '{url}'"
            )));
        }

        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::remote(
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or_default(),
            ));
        }

        let html = response.text().await?;
        extract_readable_text(&html)
            .ok_or_else(|| Error::Decode(format!("no readable text found at {url}")))
    }
}

/// Pull paragraph text out of an HTML document.
///
/// Looks inside the first content container that yields any paragraph and
/// drops navigation and other page chrome. Falls back to the loose text of
/// `<body>` for pages without block markup. Returns `None` when nothing
/// readable remains.
pub fn extract_readable_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let blocks = Selector::parse(&BLOCK_ELEMENTS.join(", ")).ok()?;

    for root in CONTENT_ROOTS {
        let Ok(root_selector) = Selector::parse(root) else {
            continue;
        };
        let Some(container) = document.select(&root_selector).next() else {
            continue;
        };

        let paragraphs: Vec<String> = container
            .select(&blocks)
            .filter(|element| !is_nested_or_chrome(element))
            .map(|element| collapse_whitespace(element.text()))
            .filter(|text| !text.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return Some(paragraphs.join("\n\n"));
        }
    }

    let body = Selector::parse("body").ok()?;
    let text = document
        .select(&body)
        .next()
        .map(|body| loose_text(&body))
        .unwrap_or_default();
    (!text.is_empty()).then_some(text)
}

/// Inner blocks are already covered by their enclosing block
fn is_nested_or_chrome(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(|node| node.value().as_element())
        .any(|ancestor| {
            let name = ancestor.name();
            BLOCK_ELEMENTS.contains(&name) || SKIPPED_ELEMENTS.contains(&name)
        })
}

fn loose_text(body: &ElementRef<'_>) -> String {
    let fragments = body
        .descendants()
        .filter(|node| {
            node.ancestors()
                .filter_map(|ancestor| ancestor.value().as_element())
                .all(|ancestor| !SKIPPED_ELEMENTS.contains(&ancestor.name()))
        })
        .filter_map(|node| node.value().as_text().map(|text| &**text));
    collapse_whitespace(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::test_server::{serve_once, unused_address, Reply};
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<!doctype html>
        <html><head><title>Ignored</title><style>p { color: red }</style></head>
        <body>
          <nav><p>Home</p><ul><li>Menu</li></ul></nav>
          <article>
            <h1>Ownership   explained</h1>
            <p>Every value has
               a single <em>owner</em>.</p>
            <ul><li><p>Moves</p></li><li>Borrows</li></ul>
            <aside><p>Related posts</p></aside>
          </article>
          <footer><p>Copyright</p></footer>
        </body></html>"#;

    #[test]
    fn article_paragraphs_are_extracted_without_chrome() {
        assert_eq!(
            extract_readable_text(PAGE).unwrap(),
            "Ownership explained\n\nEvery value has a single owner.\n\nMoves\n\nBorrows"
        );
    }

    #[test]
    fn body_is_used_when_no_article_exists() {
        let html = "<html><body><header><p>Site</p></header><p>First.</p><p>Second.</p></body></html>";
        assert_eq!(extract_readable_text(html).unwrap(), "First.\n\nSecond.");
    }

    #[test]
    fn loose_body_text_is_the_last_resort() {
        let html = "<html><body>Just  some\ntext<script>var x = 1;</script></body></html>";
        assert_eq!(extract_readable_text(html).unwrap(), "Just some text");
    }

    #[test]
    fn empty_page_has_no_text() {
        assert_eq!(extract_readable_text("<html><body>  </body></html>"), None);
    }

    fn fetcher() -> ArticleFetcher {
        ArticleFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_text_downloads_and_extracts() {
        let (base_url, request) = serve_once(Reply::ok(PAGE)).await;

        let text = fetcher()
            .fetch_text(&format!("{base_url}/posts/ownership"))
            .await
            .unwrap();
        assert!(text.starts_with("Ownership explained\n\n"));

        let request = request.await.unwrap();
        assert_eq!(request.path, "/posts/ownership");
        assert!(request.header("accept").unwrap().contains("text/html"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_page_is_remote_error() {
        let (base_url, _request) = serve_once(Reply::status("404 Not Found", "")).await;

        let error = fetcher()
            .fetch_text(&format!("{base_url}/gone"))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Remote { status: Some(404), .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn page_without_text_is_decode_error() {
        let (base_url, _request) = serve_once(Reply::ok("<html><body></body></html>")).await;

        let error = fetcher().fetch_text(&base_url).await.unwrap_err();
        assert!(matches!(error, Error::Decode(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_host_is_remote_error() {
        let address = unused_address().await;

        let error = fetcher()
            .fetch_text(&format!("http://{address}/"))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Remote { status: None, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_http_url_is_rejected_before_any_request() {
        let error = fetcher().fetch_text("mailto:someone@example.com").await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }
}
