//! OAuth token handling for Google Calendar and Spotify
//!
//! Tokens live in an in-memory [`TokenStore`] keyed by provider. An
//! [`OAuthClient`] exchanges authorization codes, refreshes expired access
//! tokens and builds consent URLs.

use chordline_common::config::AppMode;
use chordline_common::{time, Provider};
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

const GOOGLE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/calendar.events",
];

const SPOTIFY_SCOPES: [&str; 5] = [
    "user-read-private",
    "user-read-email",
    "user-library-read",
    "playlist-read-private",
    "user-top-read",
];

/// Stored OAuth credentials for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
}

impl OAuthToken {
    /// Tokens without an expiry never expire
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

/// Token endpoint response (Google and Spotify share the shape)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    fn into_token(self, issued_at: DateTime<Utc>, previous_refresh: Option<String>) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: self.expires_in.map(|secs| issued_at + Duration::seconds(secs)),
            scope: self.scope,
        }
    }
}

/// In-memory OAuth tokens, shared by every clone
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    tokens: Arc<RwLock<HashMap<Provider, OAuthToken>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, provider: Provider) -> Option<OAuthToken> {
        self.tokens.read().await.get(&provider).cloned()
    }

    pub async fn set(&self, provider: Provider, token: OAuthToken) {
        self.tokens.write().await.insert(provider, token);
    }

    /// Forget a provider's tokens (disconnect)
    pub async fn remove(&self, provider: Provider) -> Option<OAuthToken> {
        self.tokens.write().await.remove(&provider)
    }

    pub async fn access_token(&self, provider: Provider) -> Option<String> {
        self.get(provider).await.map(|t| t.access_token)
    }
}

/// Token endpoint for an OAuth provider; mocks serve it under their base URL
pub fn token_url(provider: Provider, mode: AppMode, base_url: &str) -> Option<String> {
    match (provider, mode) {
        (Provider::GoogleCalendar, AppMode::Local) => Some(format!("{}/oauth2/v4/token", base_url)),
        (Provider::GoogleCalendar, AppMode::Production) => {
            Some("https://oauth2.googleapis.com/token".to_string())
        }
        (Provider::Spotify, AppMode::Local) => Some(format!("{}/api/token", base_url)),
        (Provider::Spotify, AppMode::Production) => {
            Some("https://accounts.spotify.com/api/token".to_string())
        }
        _ => None,
    }
}

/// OAuth flows for one provider
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    provider: Provider,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    store: TokenStore,
}

impl OAuthClient {
    pub fn new(
        http: reqwest::Client,
        provider: Provider,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        store: TokenStore,
    ) -> Self {
        Self {
            http,
            provider,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            store,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Consent page URL with a random `state` for CSRF protection
    ///
    /// Returns the URL and the state value the callback must echo.
    pub fn authorization_url(&self) -> Result<(String, String)> {
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();

        let url = match self.provider {
            Provider::GoogleCalendar => {
                let scope = GOOGLE_SCOPES.join(" ");
                let params: [(&str, &str); 7] = [
                    ("client_id", self.client_id.as_str()),
                    ("redirect_uri", self.redirect_uri.as_str()),
                    ("scope", scope.as_str()),
                    ("response_type", "code"),
                    ("access_type", "offline"),
                    ("prompt", "consent"),
                    ("state", state.as_str()),
                ];
                reqwest::Url::parse_with_params("https://accounts.google.com/o/oauth2/v2/auth", &params)
            }
            Provider::Spotify => {
                let scope = SPOTIFY_SCOPES.join(" ");
                let params: [(&str, &str); 5] = [
                    ("client_id", self.client_id.as_str()),
                    ("response_type", "code"),
                    ("redirect_uri", self.redirect_uri.as_str()),
                    ("scope", scope.as_str()),
                    ("state", state.as_str()),
                ];
                reqwest::Url::parse_with_params("https://accounts.spotify.com/authorize", &params)
            }
            other => {
                return Err(ClientError::auth(other, "Provider does not use OAuth"));
            }
        }
        .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok((url.to_string(), state))
    }

    /// POST a grant to the token endpoint
    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let mut request = self.http.post(&self.token_url);
        request = match self.provider {
            // Spotify authenticates the app with HTTP Basic
            Provider::Spotify => request
                .basic_auth(&self.client_id, Some(&self.client_secret))
                .form(form),
            _ => {
                let mut fields = form.to_vec();
                fields.push(("client_id", self.client_id.as_str()));
                fields.push(("client_secret", self.client_secret.as_str()));
                request.form(&fields)
            }
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::auth(
                self.provider,
                format!("Token endpoint returned {}: {}", status.as_u16(), body),
            ));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Exchange an authorization code and store the resulting tokens
    pub async fn exchange_code(&self, code: &str) -> Result<OAuthToken> {
        let issued_at = time::now();
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await?;

        let token = response.into_token(issued_at, None);
        self.store.set(self.provider, token.clone()).await;
        info!("Stored {} OAuth tokens", self.provider);
        Ok(token)
    }

    /// Refresh the stored access token
    ///
    /// The previous refresh token is kept when the response omits one.
    pub async fn refresh(&self) -> Result<OAuthToken> {
        let refresh_token = self
            .store
            .get(self.provider)
            .await
            .and_then(|t| t.refresh_token)
            .ok_or_else(|| ClientError::auth(self.provider, "No refresh token stored"))?;

        debug!("Refreshing {} access token", self.provider);
        let issued_at = time::now();
        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .await
            .map_err(|e| {
                warn!("{} token refresh failed: {}", self.provider, e);
                e
            })?;

        let token = response.into_token(issued_at, Some(refresh_token));
        self.store.set(self.provider, token.clone()).await;
        Ok(token)
    }

    /// Stored token, refreshed first when it has expired
    pub async fn ensure_fresh(&self) -> Result<OAuthToken> {
        let token = self
            .store
            .get(self.provider)
            .await
            .ok_or_else(|| ClientError::auth(self.provider, "Not connected"))?;

        if token.is_expired(time::now()) {
            self.refresh().await
        } else {
            Ok(token)
        }
    }

    /// Whether usable tokens exist, refreshing expired ones
    pub async fn is_connected(&self) -> bool {
        self.ensure_fresh().await.is_ok()
    }

    pub async fn disconnect(&self) {
        if self.store.remove(self.provider).await.is_some() {
            info!("Disconnected {}", self.provider);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let now = time::now();
        let token = OAuthToken {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: Some(now),
            scope: None,
        };
        assert!(token.is_expired(now));
        assert!(!token.is_expired(now - Duration::seconds(1)));

        let forever = OAuthToken { expires_at: None, ..token };
        assert!(!forever.is_expired(now));
    }

    #[test]
    fn test_refresh_token_carried_over() {
        let now = time::now();
        let response = TokenResponse {
            access_token: "new".into(),
            refresh_token: None,
            expires_in: Some(3600),
            scope: None,
        };
        let token = response.into_token(now, Some("old_refresh".into()));
        assert_eq!(token.refresh_token.as_deref(), Some("old_refresh"));
        assert_eq!(token.expires_at, Some(now + Duration::seconds(3600)));
    }

    #[test]
    fn test_token_urls() {
        assert_eq!(
            token_url(Provider::GoogleCalendar, AppMode::Local, "http://localhost:8083").as_deref(),
            Some("http://localhost:8083/oauth2/v4/token")
        );
        assert_eq!(
            token_url(Provider::Spotify, AppMode::Production, "https://api.spotify.com").as_deref(),
            Some("https://accounts.spotify.com/api/token")
        );
        assert!(token_url(Provider::Mapbox, AppMode::Local, "x").is_none());
    }

    #[tokio::test]
    async fn test_store_shared_between_clones() {
        let store = TokenStore::new();
        let clone = store.clone();
        clone
            .set(
                Provider::Spotify,
                OAuthToken {
                    access_token: "tok".into(),
                    refresh_token: None,
                    expires_at: None,
                    scope: None,
                },
            )
            .await;
        assert_eq!(store.access_token(Provider::Spotify).await.as_deref(), Some("tok"));
        assert!(store.remove(Provider::Spotify).await.is_some());
        assert!(clone.get(Provider::Spotify).await.is_none());
    }

    #[test]
    fn test_authorization_url_contains_state() {
        let client = OAuthClient::new(
            reqwest::Client::new(),
            Provider::Spotify,
            "http://localhost/api/token",
            "my-client",
            "secret",
            "http://localhost/callback",
            TokenStore::new(),
        );
        let (url, state) = client.authorization_url().unwrap();
        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(url.contains("client_id=my-client"));
        assert!(url.contains(&format!("state={}", state)));
        assert_eq!(state.len(), 16);
    }
}
