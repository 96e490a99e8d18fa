//! # ChordLine Common Library
//!
//! Shared code for the ChordLine mock servers and service clients:
//! - Provider catalogue (ports, credential prefixes, production URLs)
//! - Configuration loading (CLI > environment > TOML > defaults)
//! - Domain records (bands, shows, venues, earnings, setlists)
//! - Weather, social caption, setlist and earnings helpers

pub mod captions;
pub mod config;
pub mod earnings;
pub mod error;
pub mod models;
pub mod provider;
pub mod setlists;
pub mod time;
pub mod weather;

pub use error::{Error, Result};
pub use provider::Provider;
