//! Client configuration.
//!
//! A [`ClientConfig`] can come from the builder, from environment variables
//! ([`ClientConfig::from_env`]) or from a YAML document
//! ([`ClientConfig::from_yaml_str`]). The builder always has the last word.

use serde::Deserialize;
use std::env;
use std::fmt;

use crate::{Error, ErrorContext, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Longest SSE line accepted before the stream is aborted.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Total request timeout. `None` leaves long streams uncut.
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: u64,
    /// Emit raw request/response bodies at `trace` level.
    pub log_payloads: bool,
    pub max_line_bytes: usize,
    pub proxy_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_payloads: false,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            proxy_url: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("log_payloads", &self.log_payloads)
            .field("max_line_bytes", &self.max_line_bytes)
            .field("proxy_url", &self.proxy_url)
            .finish()
    }
}

impl ClientConfig {
    /// Read configuration from the process environment.
    ///
    /// - `CHATWIRE_API_KEY` (falls back to `OPENAI_API_KEY`)
    /// - `CHATWIRE_BASE_URL`
    /// - `CHATWIRE_HTTP_TIMEOUT_SECS`
    /// - `CHATWIRE_PROXY_URL`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        config.api_key = lookup("CHATWIRE_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .filter(|k| !k.trim().is_empty());
        if let Some(url) = lookup("CHATWIRE_BASE_URL").filter(|u| !u.trim().is_empty()) {
            config.base_url = url;
        }
        config.timeout_secs = lookup("CHATWIRE_HTTP_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok());
        config.proxy_url = lookup("CHATWIRE_PROXY_URL").filter(|u| !u.trim().is_empty());
        config
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid client configuration: {}", e),
                ErrorContext::new().with_source("config_yaml"),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the base URL is an absolute http(s) URL and limits are sane.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(self.base_url.clone()),
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::configuration_with_context(
                "base URL must use http or https",
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(self.base_url.clone()),
            ));
        }
        if self.max_line_bytes == 0 {
            return Err(Error::configuration_with_context(
                "max_line_bytes must be greater than zero",
                ErrorContext::new().with_field_path("max_line_bytes"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_lookup_prefers_chatwire_key() {
        let vars: HashMap<&str, &str> = [
            ("CHATWIRE_API_KEY", "cw-key"),
            ("OPENAI_API_KEY", "oa-key"),
            ("CHATWIRE_HTTP_TIMEOUT_SECS", "30"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("cw-key"));
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_lookup_falls_back_to_openai_key() {
        let config = ClientConfig::from_lookup(|k| (k == "OPENAI_API_KEY").then(|| "oa".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("oa"));
    }

    #[test]
    fn test_yaml_with_defaults() {
        let config = ClientConfig::from_yaml_str(
            "base_url: http://localhost:8080/v1\nlog_payloads: true\n",
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert!(config.log_payloads);
        assert_eq!(config.connect_timeout_secs, DEFAULT_CONNECT_TIMEOUT_SECS);
    }

    #[test]
    fn test_yaml_rejects_bad_url() {
        let err = ClientConfig::from_yaml_str("base_url: not a url\n").unwrap_err();
        assert_eq!(err.context().and_then(|c| c.field_path.as_deref()), Some("base_url"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ClientConfig {
            api_key: Some("sk-secret".into()),
            ..ClientConfig::default()
        };
        let text = format!("{:?}", config);
        assert!(!text.contains("sk-secret"));
        assert!(text.contains("<redacted>"));
    }
}
