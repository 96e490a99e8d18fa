//! Endpoints shared by every mock listener

pub mod buildinfo;
pub mod fallback;
pub mod health;

pub use buildinfo::get_build_info;
pub use fallback::not_found;
pub use health::{combined_health, provider_health_routes};
