use url::Url;

use crate::config::CorsConfig;

const LOCALHOST: &str = "localhost";

/// Decides which request origins get their own value reflected back.
///
/// Only hostname and port take part in the decision; the scheme is ignored.
#[derive(Debug, Clone)]
pub struct OriginAllowlist {
    /// Lowercase, always starting with `.`
    trusted_suffixes: Vec<String>,
    localhost_ports: Vec<u16>,
}

impl OriginAllowlist {
    pub fn new<I, S>(trusted_suffixes: I, localhost_ports: Vec<u16>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let trusted_suffixes = trusted_suffixes
            .into_iter()
            .map(|suffix| normalize_suffix(suffix.as_ref()))
            .filter(|suffix| suffix.len() > 1)
            .collect();

        Self {
            trusted_suffixes,
            localhost_ports,
        }
    }

    pub fn from_config(config: &CorsConfig) -> Self {
        Self::new(&config.trusted_suffixes, config.localhost_ports.clone())
    }

    /// Whether `origin` (the raw `Origin` header value) is trusted.
    ///
    /// Absent, empty and unparseable values are never trusted.
    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        let origin = match origin.map(str::trim) {
            Some(origin) if !origin.is_empty() => origin,
            _ => return false,
        };

        let url = match Url::parse(origin) {
            Ok(url) => url,
            Err(_) => return false,
        };

        let host = match url.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return false,
        };

        if self
            .trusted_suffixes
            .iter()
            .any(|suffix| host.ends_with(suffix.as_str()))
        {
            return true;
        }

        host == LOCALHOST
            && url
                .port()
                .is_some_and(|port| self.localhost_ports.contains(&port))
    }
}

fn normalize_suffix(suffix: &str) -> String {
    let suffix = suffix.trim().to_ascii_lowercase();
    if suffix.starts_with('.') {
        suffix
    } else {
        format!(".{}", suffix)
    }
}
