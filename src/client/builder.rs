use crate::client::core::{ChatClient, ClientInner};
use crate::config::ClientConfig;
use crate::transport::http::header_map;
use crate::transport::HttpTransport;
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Builder for [`ChatClient`].
///
/// Starts from [`ClientConfig::default`]; use [`ChatClientBuilder::from_env`]
/// or [`ChatClientBuilder::config`] to seed it from the environment or a file.
pub struct ChatClientBuilder {
    config: ClientConfig,
    http_client: Option<reqwest::Client>,
    headers: Vec<(String, String)>,
    cancel: Option<CancellationToken>,
}

impl ChatClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            http_client: None,
            headers: Vec::new(),
            cancel: None,
        }
    }

    /// Seed the builder from `CHATWIRE_*` environment variables.
    pub fn from_env() -> Self {
        Self::new().config(ClientConfig::from_env())
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Provider base URL, e.g. `https://api.openai.com/v1`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Total request timeout. Ignored when a custom `reqwest::Client` is injected.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.config.proxy_url = Some(url.into());
        self
    }

    /// Log raw request and response bodies at `trace` level.
    pub fn log_payloads(mut self, enable: bool) -> Self {
        self.config.log_payloads = enable;
        self
    }

    /// Upper bound on a single SSE line.
    pub fn max_line_bytes(mut self, n: usize) -> Self {
        self.config.max_line_bytes = n;
        self
    }

    /// Inject a preconfigured HTTP client (pooling, TLS, proxies are then its concern).
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Header sent with every request (e.g. `OpenAI-Organization`).
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Token observed by every call made through the built client.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ChatClient> {
        let headers = header_map(&self.headers)?;
        let transport = HttpTransport::new(&self.config, self.http_client, headers)?;
        Ok(ChatClient {
            inner: Arc::new(ClientInner {
                transport,
                max_line_bytes: self.config.max_line_bytes,
            }),
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

impl Default for ChatClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
