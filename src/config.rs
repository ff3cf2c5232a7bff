use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::proxy::forwarder::backend_base;

/// Environment binding that names the backend origin.
pub const BACKEND_ORIGIN_VAR: &str = "BACKEND_ORIGIN";

/// Backend used when neither the environment nor the config file names one.
pub const DEFAULT_BACKEND_ORIGIN: &str = "http://127.0.0.1:8000";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub proxy: ProxyConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Fallback for when `BACKEND_ORIGIN` is not bound at request time.
    pub default_backend_origin: String,
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            default_backend_origin: DEFAULT_BACKEND_ORIGIN.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(100),
        }
    }
}

/// Origins that get their own value reflected in `Access-Control-Allow-Origin`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Hostname suffixes; any subdomain of these is trusted.
    pub trusted_suffixes: Vec<String>,
    /// Ports trusted on `localhost` (local dev and preview servers).
    pub localhost_ports: Vec<u16>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            trusted_suffixes: vec![".github.io".to_string()],
            localhost_ports: vec![5173, 4173],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load configuration from file
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&content).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse and validate configuration from a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Effective configuration as YAML, defaults filled in
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be zero");
        }

        backend_base(&self.proxy.default_backend_origin).with_context(|| {
            format!(
                "Invalid default backend origin: {}",
                self.proxy.default_backend_origin
            )
        })?;

        if self.proxy.connect_timeout.is_zero() {
            anyhow::bail!("Proxy connect_timeout cannot be zero");
        }

        if self.proxy.request_timeout.is_zero() {
            anyhow::bail!("Proxy request_timeout cannot be zero");
        }

        for suffix in &self.cors.trusted_suffixes {
            if suffix.trim_start_matches('.').is_empty() {
                anyhow::bail!("Trusted origin suffix cannot be empty");
            }
        }

        Ok(())
    }
}

/// Source of per-invocation bindings such as `BACKEND_ORIGIN`.
///
/// Looked up on every request, never cached, so a changed binding is picked
/// up by the next request without a restart.
pub trait Environment: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Backend origin for one invocation: the environment binding when present and
/// non-blank, the configured fallback otherwise.
pub fn resolve_backend_origin(env: &dyn Environment, proxy: &ProxyConfig) -> String {
    env.var(BACKEND_ORIGIN_VAR)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| proxy.default_backend_origin.clone())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(
        s: &str,
    ) -> std::result::Result<Duration, Box<dyn std::error::Error + Send + Sync>> {
        let s = s.trim();
        if let Some(num) = s.strip_suffix("ms") {
            Ok(Duration::from_millis(num.parse()?))
        } else if let Some(num) = s.strip_suffix('s') {
            Ok(Duration::from_secs(num.parse()?))
        } else if let Some(num) = s.strip_suffix('m') {
            scaled_secs(num, 60)
        } else if let Some(num) = s.strip_suffix('h') {
            scaled_secs(num, 3600)
        } else {
            Ok(Duration::from_secs(s.parse()?))
        }
    }

    fn scaled_secs(
        num: &str,
        unit: u64,
    ) -> std::result::Result<Duration, Box<dyn std::error::Error + Send + Sync>> {
        let secs = num
            .parse::<u64>()?
            .checked_mul(unit)
            .ok_or_else(|| format!("duration out of range: {}", num))?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.proxy.default_backend_origin, DEFAULT_BACKEND_ORIGIN);
        assert_eq!(config.cors.localhost_ports, vec![5173, 4173]);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            r#"
proxy:
  default_backend_origin: "https://api.example.com"
  request_timeout: 2m
cors:
  trusted_suffixes: [".pages.dev"]
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8787);
        assert_eq!(config.proxy.default_backend_origin, "https://api.example.com");
        assert_eq!(config.proxy.request_timeout, Duration::from_secs(120));
        assert_eq!(config.proxy.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.cors.trusted_suffixes, vec![".pages.dev".to_string()]);
        assert_eq!(config.cors.localhost_ports, vec![5173, 4173]);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_invalid_backend_origin_rejected() {
        let result = Config::from_yaml("proxy:\n  default_backend_origin: not-a-url\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_suffix_rejected() {
        let result = Config::from_yaml("cors:\n  trusted_suffixes: [\".\"]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_port_rejected() {
        let result = Config::from_yaml("server:\n  port: 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_duration_units() {
        use duration_serde::parse_duration;

        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_duration_overflow_is_an_error() {
        use duration_serde::parse_duration;

        assert!(parse_duration(&format!("{}m", u64::MAX)).is_err());
        assert!(parse_duration(&format!("{}h", u64::MAX / 100)).is_err());
        assert!(Config::from_yaml(&format!("proxy:\n  request_timeout: {}h\n", u64::MAX)).is_err());
    }

    #[test]
    fn test_effective_config_reloads_unchanged() {
        let mut config = Config::default();
        config.proxy.request_timeout = Duration::from_millis(250);
        config.logging.format = LogFormat::Json;

        let reloaded = Config::from_yaml(&config.to_yaml().unwrap()).unwrap();

        assert_eq!(reloaded.proxy.request_timeout, Duration::from_millis(250));
        assert_eq!(reloaded.proxy.connect_timeout, Duration::from_secs(10));
        assert_eq!(reloaded.logging.format, LogFormat::Json);
        assert_eq!(reloaded.cors.trusted_suffixes, config.cors.trusted_suffixes);
    }

    #[test]
    fn test_backend_origin_prefers_environment() {
        let proxy = ProxyConfig::default();
        let mut env = HashMap::new();

        assert_eq!(resolve_backend_origin(&env, &proxy), DEFAULT_BACKEND_ORIGIN);

        env.insert(BACKEND_ORIGIN_VAR.to_string(), "   ".to_string());
        assert_eq!(resolve_backend_origin(&env, &proxy), DEFAULT_BACKEND_ORIGIN);

        env.insert(
            BACKEND_ORIGIN_VAR.to_string(),
            "http://backend.local".to_string(),
        );
        assert_eq!(resolve_backend_origin(&env, &proxy), "http://backend.local");
    }
}
