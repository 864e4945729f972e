//! JSON-over-POST transport shared by the fetcher and the auth client.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::util::{collapse_whitespace, is_http_url, non_blank};
use crate::{Error, Result};

/// Header Pocket uses to carry a human-readable failure reason
const ERROR_HEADER: &str = "x-error";

/// Longest slice of a response body quoted in an error
const MAX_SNIPPET_CHARS: usize = 180;

#[derive(Clone)]
pub(crate) struct ApiClient {
    base_url: String,
    consumer_key: String,
    client: Client,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("consumer_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub(crate) fn new(base_url: &str, consumer_key: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let consumer_key = non_blank(consumer_key)
            .map(str::to_string)
            .ok_or_else(|| Error::Config("consumer key must not be empty".to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            base_url,
            consumer_key,
            client,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    /// POST a JSON payload and decode a JSON answer.
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("X-Accept", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::remote(
                Some(status.as_u16()),
                parse_api_error(status, &headers, &body),
            ));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|error| {
            Error::Decode(format!("{error} in response from {path}: {}", body_snippet(&body)))
        })
    }
}

fn parse_api_error(status: StatusCode, headers: &HeaderMap, body: &str) -> String {
    if let Some(reason) = headers
        .get(ERROR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return reason.to_string();
    }

    let trimmed = body_snippet(body);
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or_default()
            .to_string()
    } else {
        trimmed
    }
}

/// Single-line, length-capped excerpt of a response body.
fn body_snippet(body: &str) -> String {
    collapse_whitespace([body])
        .chars()
        .take(MAX_SNIPPET_CHARS)
        .collect()
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let url = non_blank(raw)
        .ok_or_else(|| Error::Config("API base URL must not be empty".to_string()))?;
    if is_http_url(url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(format!(
            "API base URL must include http:// or https:// (got '{url}')"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("getpocket.com").is_err());
        assert_eq!(
            normalize_base_url(" https://getpocket.com/ ").unwrap(),
            "https://getpocket.com"
        );
    }

    #[test]
    fn api_error_prefers_error_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Error", HeaderValue::from_static("Invalid consumer key."));

        assert_eq!(
            parse_api_error(StatusCode::FORBIDDEN, &headers, "<html>forbidden</html>"),
            "Invalid consumer key."
        );
    }

    #[test]
    fn api_error_falls_back_to_body_then_reason() {
        let headers = HeaderMap::new();
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, &headers, "  upstream down \n"),
            "upstream down"
        );
        assert_eq!(
            parse_api_error(StatusCode::SERVICE_UNAVAILABLE, &headers, ""),
            "Service Unavailable"
        );
    }

    #[test]
    fn body_snippet_is_one_capped_line() {
        let body = format!("  line one\n\n{}  ", "x".repeat(400));
        let snippet = body_snippet(&body);
        assert_eq!(snippet.chars().count(), MAX_SNIPPET_CHARS);
        assert!(snippet.starts_with("line one x"));
    }

    #[test]
    fn debug_redacts_consumer_key() {
        let client =
            ApiClient::new("https://getpocket.com", "secret-key", Duration::from_secs(1)).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-key"));
    }

    #[test]
    fn empty_consumer_key_is_config_error() {
        let error = ApiClient::new("https://getpocket.com", "  ", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(error, Error::Config(_)));
    }
}
