//! Configuration loading and resolution
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and defaults are
//! used. A TOML file that exists but does not parse is a configuration error.

use crate::provider::{Provider, COMBINED_MOCK_PORT};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CHORDLINE_CONFIG";
/// Environment variable selecting local (mock) or production endpoints
pub const APP_MODE_ENV: &str = "CHORDLINE_APP_MODE";
/// Environment variable overriding the mock bind host
pub const MOCK_HOST_ENV: &str = "CHORDLINE_MOCK_HOST";
/// Environment variable overriding the combined mock port
pub const MOCK_PORT_ENV: &str = "CHORDLINE_MOCK_PORT";

const DEFAULT_MOCK_HOST: &str = "127.0.0.1";

// ========================================
// TOML file
// ========================================

/// Contents of `config.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// `[app]` section
    #[serde(default)]
    pub app: AppSection,

    /// `[logging]` section
    #[serde(default)]
    pub logging: LoggingConfig,

    /// `[mocks]` section
    #[serde(default)]
    pub mocks: MockSection,

    /// `[endpoints.<provider>]` tables
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSection {
    /// `local` or `production`
    #[serde(default)]
    pub mode: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MockSection {
    pub host: Option<String>,
    pub combined_port: Option<u16>,
    /// Start one listener per provider in addition to the combined one
    pub per_service: Option<bool>,
    /// Provider config key -> port
    #[serde(default)]
    pub ports: HashMap<String, u16>,
    /// Provider config key -> accepted credential prefix
    #[serde(default)]
    pub token_prefixes: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointSection {
    pub base_url: Option<String>,
    pub credential: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Locate the default config file for the platform
///
/// Linux tries `~/.config/chordline/config.toml` first, then
/// `/etc/chordline/config.toml`. Other platforms use the OS config dir only.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("chordline").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/chordline/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e)))
}

/// Load TOML configuration
///
/// `explicit` (from `--config` or `CHORDLINE_CONFIG`) must exist. Without it the
/// platform default location is searched and a missing file yields defaults.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        let config = read_toml_config(path)?;
        info!("Loaded configuration from {}", path.display());
        return Ok(config);
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        let config = read_toml_config(&path)?;
        info!("Loaded configuration from {} ({})", path.display(), CONFIG_PATH_ENV);
        return Ok(config);
    }

    match default_config_path() {
        Some(path) => {
            let config = read_toml_config(&path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        None => {
            warn!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env_nonempty(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has invalid value '{}'", name, raw))),
        None => Ok(None),
    }
}

// ========================================
// Mock server configuration
// ========================================

/// Command-line overrides for the mock servers
#[derive(Debug, Clone, Default)]
pub struct MockOverrides {
    pub host: Option<String>,
    pub combined_port: Option<u16>,
    pub disable_per_service: bool,
}

/// Resolved mock server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockServerConfig {
    pub host: String,
    pub combined_port: u16,
    pub per_service: bool,
    ports: BTreeMap<Provider, u16>,
    token_prefixes: BTreeMap<Provider, String>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MOCK_HOST.to_string(),
            combined_port: COMBINED_MOCK_PORT,
            per_service: true,
            ports: Provider::ALL
                .into_iter()
                .map(|p| (p, p.default_mock_port()))
                .collect(),
            token_prefixes: Provider::ALL
                .into_iter()
                .map(|p| (p, p.mock_credential_prefix().to_string()))
                .collect(),
        }
    }
}

impl MockServerConfig {
    /// Resolve from CLI overrides, environment, and TOML
    pub fn resolve(overrides: &MockOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let mut config = Self::default();
        let section = &toml_config.mocks;

        config.host = match (&overrides.host, env_nonempty(MOCK_HOST_ENV), &section.host) {
            (Some(cli), _, _) => cli.clone(),
            (None, Some(env), _) => env,
            (None, None, Some(toml)) => toml.clone(),
            (None, None, None) => config.host,
        };

        config.combined_port = match overrides.combined_port {
            Some(port) => port,
            None => env_parsed::<u16>(MOCK_PORT_ENV)?
                .or(section.combined_port)
                .unwrap_or(COMBINED_MOCK_PORT),
        };

        config.per_service = !overrides.disable_per_service && section.per_service.unwrap_or(true);

        for provider in Provider::ALL {
            let env_name = format!("CHORDLINE_{}_MOCK_PORT", provider.env_key());
            if let Some(port) = env_parsed::<u16>(&env_name)?.or_else(|| {
                section.ports.get(provider.config_key()).copied()
            }) {
                config.ports.insert(provider, port);
            }

            if let Some(prefix) = section.token_prefixes.get(provider.config_key()) {
                if prefix.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "Empty token prefix for {} would accept any credential",
                        provider
                    )));
                }
                config.token_prefixes.insert(provider, prefix.clone());
            }
        }

        for key in section.ports.keys().chain(section.token_prefixes.keys()) {
            if key.parse::<Provider>().is_err() {
                warn!("Ignoring unknown provider '{}' in [mocks] config", key);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations where two listeners would share a port
    pub fn validate(&self) -> Result<()> {
        if !self.per_service {
            return Ok(());
        }
        let mut seen: HashMap<u16, String> = HashMap::new();
        seen.insert(self.combined_port, "combined".to_string());
        for (provider, port) in &self.ports {
            if let Some(other) = seen.insert(*port, provider.to_string()) {
                return Err(Error::Config(format!(
                    "Port {} assigned to both {} and {}",
                    port, other, provider
                )));
            }
        }
        Ok(())
    }

    pub fn port_for(&self, provider: Provider) -> u16 {
        self.ports
            .get(&provider)
            .copied()
            .unwrap_or_else(|| provider.default_mock_port())
    }

    pub fn token_prefix(&self, provider: Provider) -> &str {
        self.token_prefixes
            .get(&provider)
            .map(String::as_str)
            .unwrap_or_else(|| provider.mock_credential_prefix())
    }

    pub fn with_token_prefix(mut self, provider: Provider, prefix: impl Into<String>) -> Self {
        self.token_prefixes.insert(provider, prefix.into());
        self
    }
}

// ========================================
// Client-side service endpoints
// ========================================

/// Which set of endpoints the app talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Local mock servers
    Local,
    /// Real third-party APIs
    #[default]
    Production,
}

impl AppMode {
    /// Resolve from environment, then TOML, defaulting to production
    pub fn resolve(toml_config: &TomlConfig) -> Self {
        env_nonempty(APP_MODE_ENV)
            .or_else(|| toml_config.app.mode.clone())
            .map(|raw| Self::parse_lenient(&raw))
            .unwrap_or_default()
    }

    /// Anything other than `local` means production
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("local") {
            AppMode::Local
        } else {
            AppMode::Production
        }
    }

    pub fn is_local(self) -> bool {
        self == AppMode::Local
    }
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppMode::Local => f.write_str("local"),
            AppMode::Production => f.write_str("production"),
        }
    }
}

/// Base URL and credentials for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    /// API key / static token; OAuth providers leave this empty
    pub credential: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Resolved endpoints for every provider
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub mode: AppMode,
    endpoints: BTreeMap<Provider, Endpoint>,
}

impl ServiceEndpoints {
    /// Defaults for a mode with no overrides applied
    pub fn defaults(mode: AppMode) -> Self {
        let endpoints = Provider::ALL
            .into_iter()
            .map(|p| {
                let endpoint = match mode {
                    AppMode::Local => Endpoint {
                        base_url: format!("http://localhost:{}", p.default_mock_port()),
                        credential: p.local_credential().map(str::to_string),
                        client_id: None,
                        client_secret: None,
                    },
                    AppMode::Production => Endpoint {
                        base_url: p.production_base_url().to_string(),
                        credential: None,
                        client_id: None,
                        client_secret: None,
                    },
                };
                (p, endpoint)
            })
            .collect();
        Self { mode, endpoints }
    }

    /// Resolve endpoints: environment > TOML `[endpoints.<provider>]` > mode default
    pub fn resolve(mode: AppMode, toml_config: &TomlConfig) -> Self {
        let mut resolved = Self::defaults(mode);

        for provider in Provider::ALL {
            let section = toml_config.endpoints.get(provider.config_key());
            let env = |suffix: &str| env_nonempty(&format!("CHORDLINE_{}_{}", provider.env_key(), suffix));
            let endpoint = resolved.endpoints.entry(provider).or_insert_with(|| Endpoint {
                base_url: provider.production_base_url().to_string(),
                credential: None,
                client_id: None,
                client_secret: None,
            });

            if let Some(url) = env("API_URL").or_else(|| section.and_then(|s| s.base_url.clone())) {
                endpoint.base_url = url;
            }
            if let Some(key) = env("API_KEY").or_else(|| section.and_then(|s| s.credential.clone())) {
                endpoint.credential = Some(key);
            }
            endpoint.client_id = env("CLIENT_ID").or_else(|| section.and_then(|s| s.client_id.clone()));
            endpoint.client_secret =
                env("CLIENT_SECRET").or_else(|| section.and_then(|s| s.client_secret.clone()));

            endpoint.base_url = endpoint.base_url.trim_end_matches('/').to_string();
        }

        if mode.is_local() {
            info!("Service endpoints resolved in local mode");
        }
        resolved
    }

    pub fn get(&self, provider: Provider) -> &Endpoint {
        // Every provider is inserted by `defaults`
        &self.endpoints[&provider]
    }

    /// Replace one provider's endpoint (tests point clients at ephemeral ports)
    pub fn set(&mut self, provider: Provider, endpoint: Endpoint) {
        self.endpoints.insert(provider, endpoint);
    }

    /// Provider -> base URL, for display
    pub fn urls(&self) -> BTreeMap<Provider, String> {
        self.endpoints
            .iter()
            .map(|(p, e)| (*p, e.base_url.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        assert_eq!(LoggingConfig::default().level, "info");
    }

    #[test]
    fn test_mock_defaults() {
        let config = MockServerConfig::default();
        assert_eq!(config.combined_port, 8080);
        assert_eq!(config.port_for(Provider::Mapbox), 8085);
        assert_eq!(config.token_prefix(Provider::Spotify), "mock_spotify_token");
        assert!(config.per_service);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [app]
            mode = "local"

            [logging]
            level = "debug"

            [mocks]
            host = "0.0.0.0"
            combined_port = 9000
            per_service = false

            [mocks.ports]
            spotify = 9002

            [mocks.token_prefixes]
            openrouter = "dev_router"

            [endpoints.openweather]
            base_url = "http://weather.test/"
            credential = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(toml_config.logging.level, "debug");
        assert_eq!(toml_config.app.mode.as_deref(), Some("local"));

        let mocks = MockServerConfig::resolve(&MockOverrides::default(), &toml_config);
        // Host/port env vars may be set by other tests; only check TOML-only keys here
        let mocks = mocks.unwrap();
        assert!(!mocks.per_service);
        assert_eq!(mocks.token_prefix(Provider::OpenRouter), "dev_router");
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let toml_config: TomlConfig = toml::from_str("").unwrap();
        assert!(toml_config.endpoints.is_empty());
        assert_eq!(toml_config.logging.level, "info");
        assert!(toml_config.mocks.ports.is_empty());
    }

    #[test]
    fn test_port_collision_rejected() {
        let mut config = MockServerConfig::default();
        config.ports.insert(Provider::Spotify, 8080);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("8080"));
    }

    #[test]
    fn test_port_collision_ignored_without_per_service() {
        let mut config = MockServerConfig::default();
        config.ports.insert(Provider::Spotify, 8080);
        config.per_service = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_mode_parse() {
        assert_eq!(AppMode::parse_lenient("local"), AppMode::Local);
        assert_eq!(AppMode::parse_lenient(" LOCAL "), AppMode::Local);
        assert_eq!(AppMode::parse_lenient("staging"), AppMode::Production);
    }

    #[test]
    fn test_local_defaults_point_at_mock_ports() {
        let endpoints = ServiceEndpoints::defaults(AppMode::Local);
        assert_eq!(endpoints.get(Provider::OpenRouter).base_url, "http://localhost:8084");
        assert_eq!(
            endpoints.get(Provider::Mapbox).credential.as_deref(),
            Some("mock_mapbox_token_local")
        );
        assert!(endpoints.get(Provider::Spotify).credential.is_none());
    }

    #[test]
    fn test_production_defaults_have_no_credentials() {
        let endpoints = ServiceEndpoints::defaults(AppMode::Production);
        for provider in Provider::ALL {
            let endpoint = endpoints.get(provider);
            assert!(endpoint.base_url.starts_with("https://"));
            assert!(endpoint.credential.is_none());
        }
    }
}
