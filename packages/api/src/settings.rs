//! Process configuration.
//!
//! Settings are layered from built-in defaults, an optional `config.toml`
//! next to the binary and finally the process environment (`OIDC_ISSUER`,
//! `OIDC_CLIENT_ID`, `POSTGRES_URL`, `PORT`, ...). Every key is flat, so an
//! environment variable maps onto the field of the same name in lowercase.

use std::net::SocketAddr;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not load settings")]
    Load(#[from] ConfigError),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub laddr: String,
    pub port: Option<u16>,
    pub postgres_url: String,
    #[serde(default)]
    pub oidc_issuer: String,
    #[serde(default)]
    pub oidc_client_id: String,
    pub oidc_client_secret: Option<String>,
    pub oidc_redirect_url: String,
    pub provider_timeout_secs: u64,
    pub max_connections: u32,
}

impl Settings {
    /// Load settings from `.env`, `config.toml` and the environment.
    pub fn new() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();

        let builder = Self::defaults()?
            .add_source(
                File::with_name("config.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::default().try_parsing(true).ignore_empty(true));

        Self::from_builder(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("laddr", "0.0.0.0:1337")?
            .set_default(
                "postgres_url",
                "postgresql://postgres@localhost:5432/senbara_forms?sslmode=disable",
            )?
            .set_default("oidc_redirect_url", "http://localhost:1337/authorize")?
            .set_default("provider_timeout_secs", 10)?
            .set_default("max_connections", 5)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.oidc_issuer.trim().is_empty() {
            return Err(SettingsError::Missing("OIDC issuer"));
        }
        if self.oidc_client_id.trim().is_empty() {
            return Err(SettingsError::Missing("OIDC client ID"));
        }
        if self.oidc_redirect_url.trim().is_empty() {
            return Err(SettingsError::Missing("OIDC redirect URL"));
        }
        self.listen_address().map(|_| ())
    }

    /// The client secret, treating a blank value as a public client.
    pub fn client_secret(&self) -> Option<&str> {
        self.oidc_client_secret
            .as_deref()
            .map(str::trim)
            .filter(|secret| !secret.is_empty())
    }

    /// `laddr` with its port replaced by `port` when that is set.
    pub fn listen_address(&self) -> Result<SocketAddr, SettingsError> {
        let mut addr: SocketAddr = self
            .laddr
            .parse()
            .map_err(|_| SettingsError::InvalidAddress(self.laddr.clone()))?;
        if let Some(port) = self.port {
            addr.set_port(port);
        }
        Ok(addr)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}
