//! Third-party provider catalogue
//!
//! Every external API the app talks to is listed here once, together with the
//! local mock port, the credential prefix the mock accepts and where the
//! credential travels on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Port of the combined mock server (all providers nested under `/<slug>`)
pub const COMBINED_MOCK_PORT: u16 = 8080;

/// External API emulated by the mock servers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    OpenWeather,
    Spotify,
    GoogleCalendar,
    OpenRouter,
    Mapbox,
}

/// Where a provider expects its credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPlacement {
    /// `Authorization: Bearer <token>` header
    BearerHeader,
    /// Query string parameter with the given name
    QueryParam(&'static str),
}

impl Provider {
    /// All providers in port order
    pub const ALL: [Provider; 5] = [
        Provider::OpenWeather,
        Provider::Spotify,
        Provider::GoogleCalendar,
        Provider::OpenRouter,
        Provider::Mapbox,
    ];

    /// URL path segment / service name
    pub fn slug(self) -> &'static str {
        match self {
            Provider::OpenWeather => "openweather",
            Provider::Spotify => "spotify",
            Provider::GoogleCalendar => "google-calendar",
            Provider::OpenRouter => "openrouter",
            Provider::Mapbox => "mapbox",
        }
    }

    /// Human-readable name for logs and the health table
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OpenWeather => "OpenWeather",
            Provider::Spotify => "Spotify",
            Provider::GoogleCalendar => "Google Calendar",
            Provider::OpenRouter => "OpenRouter",
            Provider::Mapbox => "Mapbox",
        }
    }

    /// Default port of the dedicated mock listener
    pub fn default_mock_port(self) -> u16 {
        match self {
            Provider::OpenWeather => 8081,
            Provider::Spotify => 8082,
            Provider::GoogleCalendar => 8083,
            Provider::OpenRouter => 8084,
            Provider::Mapbox => 8085,
        }
    }

    /// Prefix a credential must start with to be accepted by the mock
    pub fn mock_credential_prefix(self) -> &'static str {
        match self {
            Provider::OpenWeather => "mock_openweather_key",
            Provider::Spotify => "mock_spotify_token",
            Provider::GoogleCalendar => "mock_google_token",
            Provider::OpenRouter => "mock_openrouter_key",
            Provider::Mapbox => "mock_mapbox_token",
        }
    }

    /// Static credential used in local mode when nothing is configured.
    ///
    /// Spotify and Google use OAuth access tokens instead; their local
    /// credential is synthesised per request.
    pub fn local_credential(self) -> Option<&'static str> {
        match self {
            Provider::OpenWeather => Some("mock_openweather_key_local"),
            Provider::OpenRouter => Some("mock_openrouter_key_local"),
            Provider::Mapbox => Some("mock_mapbox_token_local"),
            Provider::Spotify | Provider::GoogleCalendar => None,
        }
    }

    pub fn credential_placement(self) -> CredentialPlacement {
        match self {
            Provider::OpenWeather => CredentialPlacement::QueryParam("appid"),
            Provider::Mapbox => CredentialPlacement::QueryParam("access_token"),
            Provider::Spotify | Provider::GoogleCalendar | Provider::OpenRouter => {
                CredentialPlacement::BearerHeader
            }
        }
    }

    /// Whether the credential is an OAuth access token held per user
    pub fn uses_oauth(self) -> bool {
        matches!(self, Provider::Spotify | Provider::GoogleCalendar)
    }

    /// Base URL of the real API
    pub fn production_base_url(self) -> &'static str {
        match self {
            Provider::OpenWeather => "https://api.openweathermap.org",
            Provider::Spotify => "https://api.spotify.com",
            Provider::GoogleCalendar => "https://www.googleapis.com",
            Provider::OpenRouter => "https://openrouter.ai",
            Provider::Mapbox => "https://api.mapbox.com",
        }
    }

    /// Upper-case key used in environment variable names
    /// (`CHORDLINE_<KEY>_API_URL`, `CHORDLINE_<KEY>_API_KEY`)
    pub fn env_key(self) -> &'static str {
        match self {
            Provider::OpenWeather => "OPENWEATHER",
            Provider::Spotify => "SPOTIFY",
            Provider::GoogleCalendar => "GOOGLE_CALENDAR",
            Provider::OpenRouter => "OPENROUTER",
            Provider::Mapbox => "MAPBOX",
        }
    }

    /// Key used in TOML tables (`[mocks.ports]`, `[endpoints.<key>]`)
    pub fn config_key(self) -> &'static str {
        match self {
            Provider::OpenWeather => "openweather",
            Provider::Spotify => "spotify",
            Provider::GoogleCalendar => "google_calendar",
            Provider::OpenRouter => "openrouter",
            Provider::Mapbox => "mapbox",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Provider::ALL
            .into_iter()
            .find(|p| p.slug() == normalized || (normalized == "googlecalendar" && *p == Provider::GoogleCalendar))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown provider: {}", s)))
    }
}
