//! Pocket OAuth client: request token, browser authorization, access token.
//!
//! The flow is:
//! 1. [`PocketAuthClient::request_token`] obtains a request code bound to a
//!    fresh `state` value.
//! 2. The user approves the app at [`PocketAuthClient::authorization_url`];
//!    Pocket redirects the browser to the redirect URI.
//! 3. [`PocketAuthClient::exchange_token`] trades the approved code for an
//!    access token and the account username.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::remote::ApiClient;
use crate::{Error, Result};

/// A request code awaiting user approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    pub code: String,
    /// Value sent with the request; the server must echo it back
    pub state: String,
}

/// Credentials returned once the user approved the app.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub access_token: String,
    pub username: String,
}

impl fmt::Debug for AccessGrant {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AccessGrant")
            .field("access_token", &"[REDACTED]")
            .field("username", &self.username)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct PocketAuthClient {
    api: ApiClient,
}

impl PocketAuthClient {
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

    /// Obtain a request code for the given redirect URI.
    pub async fn request_token(&self, redirect_uri: &str) -> Result<RequestToken> {
        let state = Uuid::now_v7().to_string();
        let payload = json!({
            "consumer_key": self.api.consumer_key(),
            "redirect_uri": redirect_uri,
            "state": state,
        });

        let response: RequestTokenResponse =
            self.api.post_json("/v3/oauth/request", &payload).await?;

        if let Some(echoed) = response.state.as_deref() {
            if echoed != state {
                return Err(Error::Auth("request token state does not match".to_string()));
            }
        }
        let code = response
            .code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .ok_or_else(|| Error::Auth("request token response has no code".to_string()))?;

        tracing::debug!("Obtained request token");
        Ok(RequestToken { code, state })
    }

    /// Browser URL where the user approves the request code.
    pub fn authorization_url(&self, code: &str, redirect_uri: &str) -> String {
        format!(
            "{}/auth/authorize?request_token={}&redirect_uri={}",
            self.api.base_url(),
            urlencoding::encode(code),
            urlencoding::encode(redirect_uri)
        )
    }

    /// Trade an approved request code for an access token.
    pub async fn exchange_token(&self, request: &RequestToken) -> Result<AccessGrant> {
        let payload = json!({
            "consumer_key": self.api.consumer_key(),
            "code": request.code,
        });

        let response: AccessTokenResponse =
            match self.api.post_json("/v3/oauth/authorize", &payload).await {
                Ok(response) => response,
                // Pocket answers 403 while the code has not been approved
                Err(Error::Remote {
                    status: Some(403),
                    message,
                }) => {
                    return Err(Error::Auth(format!(
                        "authorization was not granted ({message})"
                    )));
                }
                Err(error) => return Err(error),
            };

        if let Some(echoed) = response.state.as_deref() {
            if echoed != request.state {
                return Err(Error::Auth("access token state does not match".to_string()));
            }
        }

        let access_token = response
            .access_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::Auth("access token response has no token".to_string()))?;
        let username = response
            .username
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Auth("access token response has no username".to_string()))?;

        tracing::info!("Authorized as {}", username);
        Ok(AccessGrant {
            access_token,
            username,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RequestTokenResponse {
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    username: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::test_server::{serve_once, Reply};
    use pretty_assertions::assert_eq;

    fn client(base_url: &str) -> PocketAuthClient {
        PocketAuthClient::new(base_url, "consumer", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn authorization_url_encodes_redirect() {
        let client = client("https://getpocket.com/");
        assert_eq!(
            client.authorization_url("abc-123", "http://localhost:8124/callback"),
            "https://getpocket.com/auth/authorize?request_token=abc-123&redirect_uri=http%3A%2F%2Flocalhost%3A8124%2Fcallback"
        );
    }

    #[test]
    fn access_grant_debug_redacts_token() {
        let grant = AccessGrant {
            access_token: "secret".to_string(),
            username: "reader".to_string(),
        };
        let debug = format!("{grant:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("reader"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn request_token_sends_state_and_reads_code() {
        let (base_url, request) = serve_once(Reply::ok(r#"{"code": "req-code"}"#)).await;

        let token = client(&base_url)
            .request_token("http://localhost:8124/callback")
            .await
            .unwrap();
        assert_eq!(token.code, "req-code");

        let request = request.await.unwrap();
        assert_eq!(request.path, "/v3/oauth/request");
        assert_eq!(request.header("x-accept").as_deref(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["state"], token.state.as_str());
        assert_eq!(body["redirect_uri"], "http://localhost:8124/callback");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn request_token_rejects_mismatched_state() {
        let (base_url, _request) =
            serve_once(Reply::ok(r#"{"code": "req-code", "state": "someone-else"}"#)).await;

        let error = client(&base_url)
            .request_token("http://localhost:8124/callback")
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Auth(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exchange_token_returns_grant() {
        let (base_url, request) = serve_once(Reply::ok(
            r#"{"access_token": "tok-1", "username": "reader", "state": "s-1"}"#,
        ))
        .await;

        let grant = client(&base_url)
            .exchange_token(&RequestToken {
                code: "req-code".to_string(),
                state: "s-1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            grant,
            AccessGrant {
                access_token: "tok-1".to_string(),
                username: "reader".to_string(),
            }
        );

        let request = request.await.unwrap();
        assert_eq!(request.path, "/v3/oauth/authorize");
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["code"], "req-code");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exchange_token_rejects_mismatched_state() {
        let (base_url, _request) = serve_once(Reply::ok(
            r#"{"access_token": "tok-1", "username": "reader", "state": "other"}"#,
        ))
        .await;

        let error = client(&base_url)
            .exchange_token(&RequestToken {
                code: "req-code".to_string(),
                state: "s-1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Auth(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unapproved_code_is_auth_error() {
        let (base_url, _request) = serve_once(
            Reply::status("403 Forbidden", "").with_header("X-Error", "User rejected code."),
        )
        .await;

        let error = client(&base_url)
            .exchange_token(&RequestToken {
                code: "req-code".to_string(),
                state: "s-1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(error.to_string().contains("User rejected code."));
        assert!(matches!(error, Error::Auth(_)));
    }
}
