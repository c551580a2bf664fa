//! Response classification: success payload, provider error, or protocol failure.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::ApiError;
use crate::types::envelope::ErrorEnvelope;
use crate::{Error, Result};

/// Response head facts needed to classify a body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub retry_after_ms: Option<u64>,
    pub request_id: Option<String>,
}

impl ResponseMeta {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn from_response(resp: &reqwest::Response) -> Self {
        let headers = resp.headers();
        Self {
            status: resp.status().as_u16(),
            retry_after_ms: retry_after_ms(headers),
            request_id: header_first(headers, &["x-request-id", "request-id"]),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn header_first(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        let s = headers.get(*name)?.to_str().ok()?.trim();
        (!s.is_empty()).then(|| s.to_string())
    })
}

/// Only the `Retry-After: <seconds>` form is understood.
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let secs: u64 = header_first(headers, &["retry-after"])?.parse().ok()?;
    Some(secs.saturating_mul(1000))
}

/// Classify a JSON response body.
pub fn classify_json<T: DeserializeOwned>(meta: &ResponseMeta, body: &[u8]) -> Result<T> {
    if !meta.is_success() {
        return Err(classify_failure(meta, body));
    }
    serde_json::from_slice(body).map_err(|e| {
        Error::protocol(
            meta.status,
            format!("unparsable success body: {}", e),
            String::from_utf8_lossy(body),
        )
    })
}

/// Classify a binary response body. Success bodies pass through untouched.
pub fn classify_bytes(meta: &ResponseMeta, body: Bytes) -> Result<Bytes> {
    if meta.is_success() {
        Ok(body)
    } else {
        Err(classify_failure(meta, &body))
    }
}

/// Turn a non-2xx body into `Error::Api` when it holds an error envelope,
/// `Error::Protocol` otherwise.
pub fn classify_failure(meta: &ResponseMeta, body: &[u8]) -> Error {
    let raw = String::from_utf8_lossy(body).into_owned();
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let err = ApiError {
                status: meta.status,
                body: raw,
                envelope,
                retry_after_ms: meta.retry_after_ms,
                request_id: meta.request_id.clone(),
            };
            info!(
                http_status = meta.status,
                error_code = err.standard_code().name(),
                request_id = meta.request_id.as_deref().unwrap_or(""),
                "provider returned an error"
            );
            Error::Api(err)
        }
        Err(e) => {
            info!(http_status = meta.status, "non-success response without error envelope");
            Error::protocol(meta.status, format!("unparsable error body: {}", e), raw)
        }
    }
}
