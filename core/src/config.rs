//! Client configuration.
//!
//! Values come either from code or from the environment variables the
//! engine CLI already understands (`DOCKER_HOST`, `DOCKER_API_VERSION`,
//! `DOCKER_CLIENT_TIMEOUT`).

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Default daemon address.
pub const DEFAULT_HOST: &str = "http://localhost:2375";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const HOST_ENV: &str = "DOCKER_HOST";
pub const API_VERSION_ENV: &str = "DOCKER_API_VERSION";
pub const TIMEOUT_ENV: &str = "DOCKER_CLIENT_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the daemon, always `http://` or `https://`.
    pub host: String,
    /// Pinned API version; `None` uses unversioned paths.
    pub api_version: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_version: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Build a config from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset or blank keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get(HOST_ENV) {
            config.host = normalize_host(&host)?;
        }
        if let Some(version) = get(API_VERSION_ENV) {
            config.api_version = Some(version.trim().to_string());
        }
        if let Some(timeout) = get(TIMEOUT_ENV) {
            config.timeout_secs = timeout.trim().parse().map_err(|e| {
                ApiError::invalid_argument(format!("invalid {TIMEOUT_ENV} value {timeout:?}"))
                    .with_source(e)
            })?;
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Turn a `DOCKER_HOST`-style address into an HTTP base URL.
pub fn normalize_host(raw: &str) -> Result<String, ApiError> {
    let raw = raw.trim();
    let url = match raw.split_once("://") {
        Some(("tcp", rest)) => format!("http://{rest}"),
        Some(("http" | "https", _)) => raw.to_string(),
        Some((scheme, _)) => {
            return Err(ApiError::invalid_argument(format!(
                "unsupported protocol scheme {scheme:?} in host {raw:?}"
            )))
        }
        None => format!("http://{raw}"),
    };
    Ok(url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn reads_all_variables() {
        let config = ClientConfig::from_lookup(lookup(&[
            (HOST_ENV, "tcp://10.1.2.3:2376"),
            (API_VERSION_ENV, "1.45"),
            (TIMEOUT_ENV, "5"),
        ]))
        .unwrap();
        assert_eq!(config.host, "http://10.1.2.3:2376");
        assert_eq!(config.api_version.as_deref(), Some("1.45"));
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = ClientConfig::from_lookup(lookup(&[(HOST_ENV, "  "), (API_VERSION_ENV, "")]))
            .unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert!(config.api_version.is_none());
    }

    #[test]
    fn bad_timeout_is_invalid_argument() {
        let err = ClientConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "soon")])).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn host_normalization() {
        assert_eq!(normalize_host("tcp://host:2375").unwrap(), "http://host:2375");
        assert_eq!(normalize_host("https://host:2376/").unwrap(), "https://host:2376");
        assert_eq!(normalize_host("127.0.0.1:2375").unwrap(), "http://127.0.0.1:2375");
    }

    #[test]
    fn socket_hosts_are_unsupported() {
        let err = normalize_host("unix:///var/run/docker.sock").unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.message().contains("unix"));
    }
}
