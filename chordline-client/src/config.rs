//! Service configuration and authenticated request building
//!
//! `ServiceConfig` knows every provider's base URL and credential and
//! places the credential where each API expects it: `appid` or
//! `access_token` query parameters, or a bearer header. OAuth providers
//! read their bearer token from the shared [`TokenStore`]; in local mode a
//! mock token is synthesised when none is stored.

use chordline_common::config::{load_toml_config, AppMode, Endpoint, ServiceEndpoints, TomlConfig};
use chordline_common::provider::CredentialPlacement;
use chordline_common::{time, Provider};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::oauth::{token_url, OAuthClient, TokenStore};

const USER_AGENT: &str = concat!("ChordLine/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_REDIRECT_BASE: &str = "http://localhost:5173";

/// Endpoints, credentials and the HTTP client shared by every service client
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    endpoints: ServiceEndpoints,
    http: reqwest::Client,
    tokens: TokenStore,
}

impl ServiceConfig {
    pub fn new(endpoints: ServiceEndpoints) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let config = Self {
            endpoints,
            http,
            tokens: TokenStore::new(),
        };

        if config.is_local() {
            info!("ServiceConfig initialized in local mode");
            for (provider, url) in config.urls() {
                info!("  {:<16} {}", provider.display_name(), url);
            }
        } else {
            debug!("ServiceConfig initialized in {} mode", config.mode());
        }
        Ok(config)
    }

    /// Resolve from a parsed TOML config plus environment overrides
    pub fn from_toml(toml_config: &TomlConfig) -> Result<Self> {
        let mode = AppMode::resolve(toml_config);
        Self::new(ServiceEndpoints::resolve(mode, toml_config))
    }

    /// Load the TOML config (explicit path, `CHORDLINE_CONFIG`, or the
    /// platform default) and resolve endpoints from it and the environment
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let toml_config = load_toml_config(config_path)?;
        Self::from_toml(&toml_config)
    }

    pub fn mode(&self) -> AppMode {
        self.endpoints.mode
    }

    pub fn is_local(&self) -> bool {
        self.endpoints.mode.is_local()
    }

    pub fn endpoint(&self, provider: Provider) -> &Endpoint {
        self.endpoints.get(provider)
    }

    /// Provider -> base URL, for display
    pub fn urls(&self) -> BTreeMap<Provider, String> {
        self.endpoints.urls()
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Absolute URL for `path`; absolute inputs pass through
    pub fn url(&self, provider: Provider, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.endpoint(provider).base_url, path)
        }
    }

    /// Bearer token for an OAuth provider
    async fn oauth_bearer(&self, provider: Provider) -> Option<String> {
        match self.tokens.access_token(provider).await {
            Some(token) => Some(token),
            None if self.is_local() => Some(format!(
                "{}_{}",
                provider.mock_credential_prefix(),
                time::now_millis()
            )),
            None => None,
        }
    }

    /// Request with the provider's credential attached
    ///
    /// A missing credential is not an error here; the API answers 401.
    pub async fn request(&self, provider: Provider, method: Method, path: &str) -> RequestBuilder {
        let mut request = self.http.request(method, self.url(provider, path));

        match provider.credential_placement() {
            CredentialPlacement::QueryParam(name) => {
                if let Some(key) = &self.endpoint(provider).credential {
                    request = request.query(&[(name, key.as_str())]);
                }
            }
            CredentialPlacement::BearerHeader => {
                let token = if provider.uses_oauth() {
                    self.oauth_bearer(provider).await
                } else {
                    self.endpoint(provider).credential.clone()
                };
                match token {
                    Some(token) => request = request.bearer_auth(token),
                    None => debug!("No credential for {}", provider),
                }
            }
        }
        request
    }

    /// OAuth client for Google Calendar or Spotify
    pub fn oauth_client(&self, provider: Provider) -> Result<OAuthClient> {
        let endpoint = self.endpoint(provider);
        let token_url = token_url(provider, self.mode(), &endpoint.base_url)
            .ok_or_else(|| ClientError::auth(provider, "Provider does not use OAuth"))?;

        let redirect_uri = format!("{}/auth/{}/callback", DEFAULT_REDIRECT_BASE, provider.slug());
        Ok(OAuthClient::new(
            self.http.clone(),
            provider,
            token_url,
            endpoint.client_id.clone().unwrap_or_default(),
            endpoint.client_secret.clone().unwrap_or_default(),
            redirect_uri,
            self.tokens.clone(),
        ))
    }

    /// Send a request; on 401 from an OAuth provider refresh once and retry once
    ///
    /// `customize` adds query parameters or a body and runs for both attempts.
    pub async fn send_with_refresh<F>(
        &self,
        provider: Provider,
        method: Method,
        path: &str,
        customize: F,
    ) -> Result<Response>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let response = customize(self.request(provider, method.clone(), path).await)
            .send()
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        if !provider.uses_oauth() {
            return Err(ClientError::auth(provider, "Credential rejected"));
        }

        warn!("{} returned 401, refreshing access token", provider);
        self.oauth_client(provider)?.refresh().await?;

        let retry = customize(self.request(provider, method, path).await)
            .send()
            .await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::auth(provider, "Credential rejected after refresh"));
        }
        Ok(retry)
    }

    /// `send_with_refresh`, then decode a JSON success body
    pub async fn send_json<T, F>(
        &self,
        provider: Provider,
        method: Method,
        path: &str,
        customize: F,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let response = self.send_with_refresh(provider, method, path, customize).await?;
        decode_json(provider, response).await
    }
}

/// Decode a success body, mapping other statuses to `ClientError::Api`
pub async fn decode_json<T: DeserializeOwned>(provider: Provider, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            provider,
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Parse(e.to_string()))
}
