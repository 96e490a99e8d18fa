//! # ChordLine service clients
//!
//! reqwest-based clients for the third-party APIs ChordLine talks to. The
//! same code runs against the local mocks or the real services; only the
//! resolved [`ServiceConfig`] differs.
//!
//! - [`config`]: endpoint resolution and credential placement
//! - [`oauth`]: Google and Spotify token storage and refresh
//! - [`health`]: concurrent `/health` probes

pub mod captions;
pub mod config;
pub mod error;
pub mod google_calendar;
pub mod health;
pub mod oauth;
pub mod spotify;
pub mod weather;

pub use captions::CaptionClient;
pub use config::ServiceConfig;
pub use error::{ClientError, Result};
pub use google_calendar::{GoogleCalendarClient, SyncReport};
pub use health::{health_check, ServiceHealth, ServiceStatus};
pub use oauth::{OAuthClient, OAuthToken, TokenStore};
pub use spotify::SpotifyClient;
pub use weather::WeatherClient;
