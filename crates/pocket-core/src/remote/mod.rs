//! Remote incremental-changes feed.

mod http;
mod response;
#[cfg(test)]
pub(crate) mod test_server;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::AppConfig;
use crate::models::Save;
use crate::{Error, Result};

pub(crate) use http::ApiClient;
use response::GetResponse;

/// One page of remote changes since a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Watermark to store once the changes are applied
    pub cursor: i64,
    /// Upserts and deletion markers, in no particular order
    pub changes: Vec<Save>,
}

/// Source of remote save changes.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Fetch every change after `since`; `since == 0` asks for the full dataset.
    async fn fetch_changes(&self, access_token: &str, since: i64) -> Result<ChangeSet>;
}

/// HTTP client for the Pocket `/v3/get` endpoint.
#[derive(Debug, Clone)]
pub struct PocketClient {
    api: ApiClient,
}

impl PocketClient {
    pub fn new(
        base_url: impl AsRef<str>,
        consumer_key: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(base_url.as_ref(), consumer_key.as_ref(), timeout)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.api_base_url,
            config.require_consumer_key()?,
            config.http_timeout,
        )
    }
}

#[async_trait]
impl RemoteFetcher for PocketClient {
    async fn fetch_changes(&self, access_token: &str, since: i64) -> Result<ChangeSet> {
        if access_token.trim().is_empty() {
            return Err(Error::InvalidInput("access token must not be empty".to_string()));
        }

        let mut payload = json!({
            "consumer_key": self.api.consumer_key(),
            "access_token": access_token,
            "state": "all",
            "sort": "newest",
            "detailType": "simple",
        });
        if since > 0 {
            payload["since"] = json!(since);
        }

        tracing::debug!("Fetching changes since {} from {}", since, self.api.base_url());
        let response: GetResponse = self.api.post_json("/v3/get", &payload).await?;
        let cursor = response.since;
        let changes = response.into_changes()?;
        tracing::debug!("Received {} changes, next cursor {}", changes.len(), cursor);

        Ok(ChangeSet { cursor, changes })
    }
}

#[cfg(test)]
mod tests {
    use super::test_server::{serve_once, unused_address, Reply};
    use super::*;
    use crate::models::SaveStatus;
    use pretty_assertions::assert_eq;

    fn client(base_url: &str) -> PocketClient {
        PocketClient::new(base_url, "consumer", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_normalizes_items_and_returns_cursor() {
        let (base_url, request) = serve_once(Reply::ok(
            r#"{"status": 1, "since": 42, "list": {"a1": {
                "item_id": "a1", "given_title": "Foo", "given_url": "https://foo.example",
                "time_added": "100", "time_updated": "200", "status": "0"
            }}}"#,
        ))
        .await;

        let change_set = client(&base_url).fetch_changes("token", 0).await.unwrap();

        assert_eq!(change_set.cursor, 42);
        assert_eq!(change_set.changes.len(), 1);
        let save = &change_set.changes[0];
        assert_eq!(save.id.as_str(), "a1");
        assert_eq!(save.title, "Foo");
        assert_eq!(save.time_to_read, 0);
        assert_eq!(save.added_on, 100);
        assert_eq!(save.updated_on, 200);
        assert_eq!(save.status, SaveStatus::Active);

        let request = request.await.unwrap();
        assert_eq!(request.path, "/v3/get");
        assert_eq!(request.header("x-accept").as_deref(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["consumer_key"], "consumer");
        assert_eq!(body["access_token"], "token");
        assert_eq!(body["state"], "all");
        assert_eq!(body["detailType"], "simple");
        assert!(body.get("since").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_sends_since_when_cursor_is_set() {
        let (base_url, request) = serve_once(Reply::ok(r#"{"since": 1700000100, "list": []}"#)).await;

        let change_set = client(&base_url)
            .fetch_changes("token", 1_700_000_000)
            .await
            .unwrap();
        assert_eq!(change_set.cursor, 1_700_000_100);
        assert!(change_set.changes.is_empty());

        let request = request.await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["since"], 1_700_000_000_i64);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_success_status_is_remote_error_with_code() {
        let (base_url, _request) = serve_once(
            Reply::status("401 Unauthorized", "").with_header("X-Error", "Invalid access token."),
        )
        .await;

        let error = client(&base_url).fetch_changes("token", 0).await.unwrap_err();
        match error {
            Error::Remote { status, message } => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "Invalid access token.");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_body_is_decode_error() {
        let (base_url, _request) = serve_once(Reply::ok("<html>not json</html>")).await;

        let error = client(&base_url).fetch_changes("token", 0).await.unwrap_err();
        assert!(matches!(error, Error::Decode(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_host_is_remote_error_without_status() {
        let address = unused_address().await;

        let error = client(&format!("http://{address}"))
            .fetch_changes("token", 0)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Remote { status: None, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slow_server_times_out_as_remote_error() {
        let (base_url, _request) = serve_once(Reply::hang()).await;
        let client = PocketClient::new(&base_url, "consumer", Duration::from_millis(200)).unwrap();

        let error = client.fetch_changes("token", 0).await.unwrap_err();
        assert!(matches!(error, Error::Remote { status: None, .. }));
    }

    #[test]
    fn from_config_requires_consumer_key() {
        let config = AppConfig::from_lookup(|key| {
            (key == crate::config::DB_PATH_ENV).then(|| "/tmp/cache.db".to_string())
        })
        .unwrap();

        assert!(matches!(
            PocketClient::from_config(&config),
            Err(Error::Config(_))
        ));
    }
}
