use crate::config::ClientConfig;
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::multipart::Form;
use reqwest::Proxy;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

/// Correlation header attached to every request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Encoded request body.
pub enum RequestBody {
    Json(Vec<u8>),
    Multipart(Form),
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestBody::Json(bytes) => write!(f, "Json({} bytes)", bytes.len()),
            RequestBody::Multipart(_) => f.write_str("Multipart"),
        }
    }
}

/// Bearer-authenticated HTTP sender over an injected `reqwest::Client`.
///
/// Connection reuse and pooling are the `reqwest::Client`'s business.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    default_headers: HeaderMap,
    log_payloads: bool,
}

impl HttpTransport {
    pub fn new(
        config: &ClientConfig,
        client: Option<reqwest::Client>,
        default_headers: HeaderMap,
    ) -> Result<Self> {
        config.validate()?;
        let client = match client {
            Some(c) => c,
            None => Self::build_client(config)?,
        };
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            default_headers,
            log_payloads: config.log_payloads,
        })
    }

    fn build_client(config: &ClientConfig) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));

        // No total timeout by default: streams may legitimately run for minutes.
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid proxy: {}", e),
                    ErrorContext::new()
                        .with_field_path("proxy_url")
                        .with_source("http_transport"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Http(e)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send one POST and return the response head. The body is left unread.
    pub async fn send(
        &self,
        path: &str,
        body: RequestBody,
        accept: &str,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(path);
        let request_id = Uuid::new_v4().to_string();

        let mut req = self
            .client
            .post(&url)
            .headers(self.default_headers.clone())
            .header(ACCEPT, accept)
            .header(REQUEST_ID_HEADER, request_id.as_str());

        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        req = match body {
            RequestBody::Json(bytes) => {
                if self.log_payloads {
                    trace!(
                        target: "chatwire::payload",
                        request_id = request_id.as_str(),
                        body = %String::from_utf8_lossy(&bytes),
                        "request body"
                    );
                }
                req.header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(bytes)
            }
            RequestBody::Multipart(form) => req.multipart(form),
        };

        debug!(url = url.as_str(), request_id = request_id.as_str(), "sending request");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Transport(TransportError::Cancelled)),
            resp = req.send() => resp.map_err(|e| Error::Transport(TransportError::Http(e))),
        }
    }

    /// Read a whole response body, observing cancellation.
    pub async fn read_body(
        &self,
        resp: reqwest::Response,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Transport(TransportError::Cancelled)),
            body = resp.bytes() => body.map_err(|e| Error::Transport(TransportError::Http(e)))?,
        };
        if self.log_payloads {
            trace!(
                target: "chatwire::payload",
                body = %String::from_utf8_lossy(&bytes),
                "response body"
            );
        }
        Ok(bytes)
    }
}

/// Parse `name: value` pairs into a header map.
pub(crate) fn header_map(pairs: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid header name: {}", e),
                ErrorContext::new().with_field_path(name.clone()),
            )
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid header value: {}", e),
                ErrorContext::new().with_field_path(name.clone()),
            )
        })?;
        map.append(header_name, header_value);
    }
    Ok(map)
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Http(e) if e.is_timeout())
    }

    pub fn is_connect(&self) -> bool {
        matches!(self, TransportError::Http(e) if e.is_connect())
    }
}
