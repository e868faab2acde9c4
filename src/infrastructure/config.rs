use crate::application::refresh_service::RefreshSchedule;
use crate::domain::geography::Geography;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub admin: AdminSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdminSettings {
    #[serde(default)]
    pub api_key: String,
}

impl AdminSettings {
    /// `None` disables the admin endpoints.
    pub fn secret(&self) -> Option<String> {
        let key = self.api_key.trim();
        (!key.is_empty()).then(|| key.to_string())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    pub initial_delay_secs: u64,
    pub interval_hours: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            initial_delay_secs: 5,
            interval_hours: 24,
        }
    }
}

impl RefreshSettings {
    pub fn schedule(&self) -> RefreshSchedule {
        RefreshSchedule {
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            interval: Duration::from_secs(self.interval_hours.max(1) * 60 * 60),
        }
    }
}

/// `config/settings.toml` overlaid with `FUEL_PRICES_*` environment variables,
/// e.g. `FUEL_PRICES_DATABASE__PASSWORD`.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/settings").required(false))
        .add_source(
            config::Environment::with_prefix("FUEL_PRICES")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_geography() -> anyhow::Result<Geography> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/geography"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn parse_geography(toml: &str) -> anyhow::Result<Geography> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    Ok(settings.try_deserialize()?)
}
