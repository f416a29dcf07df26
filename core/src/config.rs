//! Bridge configuration.
//!
//! # Design
//! Every field has a default matching the local inference server, so an
//! empty JSON object or an empty environment yields a working config.
//! Environment overrides are read through a lookup function; tests pass a
//! closure instead of touching the process environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::BridgeError;
use crate::payload::MAX_REQUEST_BYTES;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 11441;
pub const DEFAULT_PATH: &str = "/api/chat";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Longest accepted model identifier in bytes.
pub const MAX_MODEL_BYTES: usize = 255;
/// Longest accepted prompt in bytes, before escaping.
pub const MAX_PROMPT_BYTES: usize = 65535;

pub const ENV_HOST: &str = "OLLAMA_BRIDGE_HOST";
pub const ENV_PORT: &str = "OLLAMA_BRIDGE_PORT";
pub const ENV_BACKEND: &str = "OLLAMA_BRIDGE_BACKEND";
pub const ENV_TIMEOUT_SECS: &str = "OLLAMA_BRIDGE_TIMEOUT_SECS";

/// Where requests are sent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub timeout_secs: u64,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Endpoint {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `host:port`, as used for the `Host` header and socket resolution.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.authority(), self.path)
    }
}

/// Which HTTP backend carries requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Plain sockets from the operating system.
    Native,
    /// The `ureq` HTTP client.
    #[cfg(feature = "portable")]
    Portable,
}

impl Default for Backend {
    #[cfg(feature = "portable")]
    fn default() -> Self {
        Backend::Portable
    }

    #[cfg(not(feature = "portable"))]
    fn default() -> Self {
        Backend::Native
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Native => write!(f, "native"),
            #[cfg(feature = "portable")]
            Backend::Portable => write!(f, "portable"),
        }
    }
}

impl FromStr for Backend {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Backend::Native),
            #[cfg(feature = "portable")]
            "portable" => Ok(Backend::Portable),
            other => Err(BridgeError::Config(format!("unknown backend: {other}"))),
        }
    }
}

/// Complete bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub endpoint: Endpoint,
    pub backend: Backend,
    pub max_model_bytes: usize,
    pub max_prompt_bytes: usize,
    pub max_request_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            backend: Backend::default(),
            max_model_bytes: MAX_MODEL_BYTES,
            max_prompt_bytes: MAX_PROMPT_BYTES,
            max_request_bytes: MAX_REQUEST_BYTES,
        }
    }
}

impl BridgeConfig {
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(json).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Defaults with `OLLAMA_BRIDGE_*` environment overrides applied.
    pub fn from_env() -> Result<Self, BridgeError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, keyed by the `ENV_*` names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            if host.is_empty() {
                return Err(BridgeError::Config(format!("{ENV_HOST} is empty")));
            }
            self.endpoint.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.endpoint.port = port
                .parse()
                .map_err(|_| BridgeError::Config(format!("{ENV_PORT}: invalid port {port:?}")))?;
        }
        if let Some(backend) = lookup(ENV_BACKEND) {
            self.backend = backend.parse()?;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.endpoint.timeout_secs = secs.parse().map_err(|_| {
                BridgeError::Config(format!("{ENV_TIMEOUT_SECS}: invalid seconds {secs:?}"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_target_local_server() {
        let config = BridgeConfig::default();
        assert_eq!(config.endpoint.url(), "http://localhost:11441/api/chat");
        assert_eq!(config.endpoint.timeout(), Duration::from_secs(300));
        assert_eq!(config.max_request_bytes, 65536);
        assert_eq!(config.max_model_bytes, 255);
    }

    #[test]
    fn empty_json_yields_defaults() {
        let config = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn json_overrides_nested_fields() {
        let config =
            BridgeConfig::from_json(r#"{"endpoint":{"port":3000},"backend":"native"}"#).unwrap();
        assert_eq!(config.endpoint.port, 3000);
        assert_eq!(config.endpoint.host, "localhost");
        assert_eq!(config.backend, Backend::Native);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = BridgeConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = BridgeConfig::default();
        config
            .apply_overrides(lookup(&[
                (ENV_HOST, "127.0.0.1"),
                (ENV_PORT, "8080"),
                (ENV_BACKEND, "NATIVE"),
                (ENV_TIMEOUT_SECS, "5"),
            ]))
            .unwrap();
        assert_eq!(config.endpoint.url(), "http://127.0.0.1:8080/api/chat");
        assert_eq!(config.backend, Backend::Native);
        assert_eq!(config.endpoint.timeout_secs, 5);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut config = BridgeConfig::default();
        let err = config
            .apply_overrides(lookup(&[(ENV_PORT, "eleven")]))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
        assert_eq!(config.endpoint.port, DEFAULT_PORT);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!("winhttp".parse::<Backend>().is_err());
        assert_eq!("native".parse::<Backend>().unwrap(), Backend::Native);
    }
}
