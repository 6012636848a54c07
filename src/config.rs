use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_API_KEY: &str = "tu_api_key_aqui";
const DEFAULT_BASE_URL: &str = "https://elevenlabs-proxy-production-3ede.up.railway.app";
const DEFAULT_UPSTREAM_URL: &str = "https://api.elevenlabs.io";
const DEFAULT_AUDIO_DIR: &str = "./audio_files";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{var} must be a number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),
}

/// Process configuration, read once at startup and shared with the handlers.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Sent to the upstream API as `xi-api-key`.
    pub api_key: String,
    /// Externally visible origin used to build returned audio URLs.
    pub public_base_url: String,
    pub upstream_url: String,
    pub audio_dir: PathBuf,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                var: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match var("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "UPSTREAM_TIMEOUT_SECS",
                    value: raw,
                })?,
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            api_key: var("ELEVENLABS_API_KEY").unwrap_or_else(|| DEFAULT_API_KEY.to_string()),
            public_base_url: normalize_url(
                &var("BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ),
            upstream_url: normalize_url(
                &var("ELEVENLABS_API_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            ),
            audio_dir: var("AUDIO_DIR")
                .unwrap_or_else(|| DEFAULT_AUDIO_DIR.to_string())
                .into(),
            upstream_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
