//! Environment-driven configuration, validated once at start-up.

use std::net::SocketAddr;
use std::time::Duration;

use generation::BackendKind;
use providers::{ProviderSettings, UnknownProtocol, VolcengineProtocol};
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

pub const BIND_ADDR_VAR: &str = "RELAY_BIND_ADDR";
pub const POLL_INTERVAL_VAR: &str = "RELAY_POLL_INTERVAL_MS";
pub const OPENROUTER_KEY_VAR: &str = "OPENROUTER_API_KEY";
pub const MODELSCOPE_KEY_VAR: &str = "MODELSCOPE_API_KEY";
pub const VOLCENGINE_KEY_VAR: &str = "VOLCENGINE_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid socket address: {source}")]
    InvalidBindAddr {
        var: &'static str,
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("VOLCENGINE_PROTOCOL: {0}")]
    InvalidProtocol(#[from] UnknownProtocol),

    #[error("{var}={value:?} must be a positive number of milliseconds")]
    InvalidPollInterval { var: &'static str, value: String },
}

/// Immutable server configuration, shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub openrouter_api_key: Option<String>,
    pub modelscope_api_key: Option<String>,
    pub volcengine_api_key: Option<String>,
    pub providers: ProviderSettings,
}

impl GatewayConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = ProviderSettings::default();

        let bind_raw = var(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                var: BIND_ADDR_VAR,
                value: bind_raw.clone(),
                source,
            })?;

        let volcengine_protocol = match var("VOLCENGINE_PROTOCOL") {
            Some(raw) => raw.parse::<VolcengineProtocol>()?,
            None => defaults.volcengine_protocol,
        };

        let poll_interval = match var(POLL_INTERVAL_VAR) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(ConfigError::InvalidPollInterval {
                        var: POLL_INTERVAL_VAR,
                        value: raw,
                    })
                }
            },
            None => defaults.poll_interval,
        };

        Ok(Self {
            bind_addr,
            openrouter_api_key: var(OPENROUTER_KEY_VAR),
            modelscope_api_key: var(MODELSCOPE_KEY_VAR),
            volcengine_api_key: var(VOLCENGINE_KEY_VAR),
            providers: ProviderSettings {
                openrouter_base_url: var("OPENROUTER_BASE_URL")
                    .unwrap_or(defaults.openrouter_base_url),
                openrouter_model: defaults.openrouter_model,
                modelscope_base_url: var("MODELSCOPE_BASE_URL")
                    .unwrap_or(defaults.modelscope_base_url),
                volcengine_endpoint: var("VOLCENGINE_ENDPOINT")
                    .unwrap_or(defaults.volcengine_endpoint),
                volcengine_region: var("VOLCENGINE_REGION").unwrap_or(defaults.volcengine_region),
                volcengine_service: var("VOLCENGINE_SERVICE")
                    .unwrap_or(defaults.volcengine_service),
                volcengine_protocol,
                poll_interval,
            },
        })
    }

    /// The server-side default key for `kind`.
    pub fn default_key(&self, kind: BackendKind) -> Option<&str> {
        match kind {
            BackendKind::OpenRouter => self.openrouter_api_key.as_deref(),
            BackendKind::ModelScope => self.modelscope_api_key.as_deref(),
            BackendKind::Volcengine => self.volcengine_api_key.as_deref(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            openrouter_api_key: None,
            modelscope_api_key: None,
            volcengine_api_key: None,
            providers: ProviderSettings::default(),
        }
    }
}
