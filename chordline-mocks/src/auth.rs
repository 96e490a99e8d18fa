//! Mock credential checks
//!
//! A credential is accepted when it starts with the provider's configured
//! prefix. Bearer providers read `Authorization`, key providers read their
//! query parameter.

use axum::{
    extract::{Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use chordline_common::provider::CredentialPlacement;
use chordline_common::Provider;
use std::collections::HashMap;

use crate::error::MockError;
use crate::AppState;

const OPENWEATHER_KEY_MESSAGE: &str =
    "Invalid API key. Please see http://openweathermap.org/faq#error401 for more info.";
const MAPBOX_TOKEN_MESSAGE: &str = "Not Authorized - Invalid Token";

fn missing_message(provider: Provider) -> &'static str {
    match provider {
        Provider::GoogleCalendar => "Unauthorized",
        Provider::Spotify => "No token provided",
        Provider::OpenRouter => "No API key provided",
        Provider::OpenWeather => OPENWEATHER_KEY_MESSAGE,
        Provider::Mapbox => MAPBOX_TOKEN_MESSAGE,
    }
}

fn invalid_message(provider: Provider) -> &'static str {
    match provider {
        Provider::GoogleCalendar | Provider::Spotify => "Invalid access token",
        Provider::OpenRouter => "Invalid API key",
        Provider::OpenWeather => OPENWEATHER_KEY_MESSAGE,
        Provider::Mapbox => MAPBOX_TOKEN_MESSAGE,
    }
}

/// Second word of the `Authorization` header (`Bearer <token>`)
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .split(' ')
        .nth(1)
        .filter(|token| !token.is_empty())
}

/// Named query parameter, if present and non-empty
pub fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params.get(name).filter(|v| !v.is_empty()).cloned()
}

/// Validate the credential a request carries for `provider`
pub fn check_credential(
    provider: Provider,
    prefix: &str,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<(), MockError> {
    let credential = match provider.credential_placement() {
        CredentialPlacement::BearerHeader => bearer_token(headers).map(str::to_string),
        CredentialPlacement::QueryParam(name) => query_param(uri, name),
    };

    match credential {
        None => Err(MockError::unauthorized(provider, missing_message(provider))),
        Some(token) if !token.starts_with(prefix) => {
            Err(MockError::unauthorized(provider, invalid_message(provider)))
        }
        Some(_) => Ok(()),
    }
}

/// Middleware guarding a provider's protected routes
///
/// Installed with `from_fn_with_state((state, provider), require_credential)`.
pub async fn require_credential(
    State((state, provider)): State<(AppState, Provider)>,
    request: Request,
    next: Next,
) -> Result<Response, MockError> {
    let prefix = state.config.token_prefix(provider);
    check_credential(provider, prefix, request.headers(), request.uri())?;
    Ok(next.run(request).await)
}
