//! Per-provider mock routers
//!
//! Each module exposes `routes(&AppState) -> Router<AppState>` with paths
//! relative to the provider's mount point.

pub mod google_calendar;
pub mod mapbox;
pub mod openrouter;
pub mod openweather;
pub mod spotify;
