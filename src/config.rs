//! Environment configuration for the gateway and the chat client

use crate::conversation::ClearPolicy;
use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:3001";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Gateway server configuration
#[derive(Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub port: u16,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                value: raw.clone(),
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            api_key,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            port,
        })
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("port", &self.port)
            .finish()
    }
}

/// Chat client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub gateway_url: String,
    pub request_timeout: Duration,
    pub clear_policy: ClearPolicy,
    pub log_path: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let gateway_url = get("KUROBOT_GATEWAY_URL")
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !gateway_url.starts_with("http://") && !gateway_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "KUROBOT_GATEWAY_URL",
                value: gateway_url,
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }

        let request_timeout = match get("KUROBOT_REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        name: "KUROBOT_REQUEST_TIMEOUT_SECS",
                        value: raw,
                        reason: "must be at least 1".to_string(),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        name: "KUROBOT_REQUEST_TIMEOUT_SECS",
                        value: raw.clone(),
                        reason: format!("{e}"),
                    })
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let clear_policy = match get("KUROBOT_CLEAR_POLICY") {
            Some(raw) => raw.parse::<ClearPolicy>().map_err(|reason| ConfigError::Invalid {
                name: "KUROBOT_CLEAR_POLICY",
                value: raw.clone(),
                reason,
            })?,
            None => ClearPolicy::default(),
        };

        let log_path = get("KUROBOT_CHAT_LOG").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".kurobot").join("chat.log")
            },
            PathBuf::from,
        );

        Ok(Self {
            gateway_url,
            request_timeout,
            clear_policy,
            log_path,
        })
    }

    /// Full URL of the chat endpoint
    pub fn chat_endpoint(&self) -> String {
        format!("{}/chat", self.gateway_url)
    }
}
