use bytes::Bytes;
use futures::TryStreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::builder::ChatClientBuilder;
use crate::client::classify::{classify_bytes, classify_failure, classify_json, ResponseMeta};
use crate::codec::{json, multipart, MultipartRequest};
use crate::stream::{decode_sse, ChunkStream};
use crate::transport::{HttpTransport, RequestBody, TransportError};
use crate::types::extension::WireFields;
use crate::types::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, SpeechRequest, Transcription,
    TranscriptionRequest,
};
use crate::{Error, Result};

pub const CHAT_COMPLETIONS_PATH: &str = "chat/completions";
pub const EMBEDDINGS_PATH: &str = "embeddings";
pub const SPEECH_PATH: &str = "audio/speech";
pub const TRANSCRIPTIONS_PATH: &str = "audio/transcriptions";

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_SSE: &str = "text/event-stream";
const ACCEPT_ANY: &str = "*/*";

pub(crate) struct ClientInner {
    pub(crate) transport: HttpTransport,
    pub(crate) max_line_bytes: usize,
}

/// Client for an OpenAI-compatible chat completions API.
///
/// Cloning is cheap: clones share the transport. Each call is independent;
/// the client keeps no per-conversation state.
#[derive(Clone)]
pub struct ChatClient {
    pub(crate) inner: Arc<ClientInner>,
    pub(crate) cancel: CancellationToken,
}

impl ChatClient {
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder::new()
    }

    /// Build a client from `CHATWIRE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        ChatClientBuilder::from_env().build()
    }

    /// A handle sharing this client's transport whose calls observe `token`.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: self.inner.clone(),
            cancel: token,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn base_url(&self) -> &str {
        self.inner.transport.base_url()
    }

    /// Send a chat request and wait for the full response.
    ///
    /// A request with `stream` set is sent with streaming turned off.
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let request = if request.stream {
            debug!("clearing stream flag for non-streaming call");
            let mut owned = request.clone();
            owned.stream = false;
            owned.stream_options = None;
            Cow::Owned(owned)
        } else {
            Cow::Borrowed(request)
        };
        self.post_json(CHAT_COMPLETIONS_PATH, request.as_ref()).await
    }

    /// Send a chat request and decode the SSE reply chunk by chunk.
    ///
    /// A non-2xx reply is classified before any chunk is produced.
    pub async fn chat_completion_stream(&self, request: &ChatRequest) -> Result<ChunkStream> {
        let request = if request.stream {
            Cow::Borrowed(request)
        } else {
            debug!("setting stream flag for streaming call");
            let mut owned = request.clone();
            owned.stream = true;
            Cow::Owned(owned)
        };
        let body = json::encode(request.as_ref())?;
        let resp = self
            .inner
            .transport
            .send(CHAT_COMPLETIONS_PATH, RequestBody::Json(body), ACCEPT_SSE, &self.cancel)
            .await?;

        let meta = ResponseMeta::from_response(&resp);
        if !meta.is_success() {
            let body = self.inner.transport.read_body(resp, &self.cancel).await?;
            return Err(classify_failure(&meta, &body));
        }

        let bytes = resp
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));
        Ok(decode_sse(bytes, self.cancel.clone(), self.inner.max_line_bytes))
    }

    pub async fn embeddings(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.post_json(EMBEDDINGS_PATH, request).await
    }

    /// Text-to-speech. Returns the raw audio bytes.
    pub async fn speech(&self, request: &SpeechRequest) -> Result<Bytes> {
        self.post_json_bytes(SPEECH_PATH, request).await
    }

    /// Speech-to-text via a multipart upload.
    pub async fn transcription(&self, request: &TranscriptionRequest) -> Result<Transcription> {
        self.post_multipart(TRANSCRIPTIONS_PATH, request).await
    }

    /// POST a JSON body to `path` and decode a JSON reply.
    pub async fn post_json<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + WireFields + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = json_body(request)?;
        let (meta, bytes) = self.execute(path, body, ACCEPT_JSON).await?;
        classify_json(&meta, &bytes)
    }

    /// POST a JSON body to `path` and return the reply body as bytes.
    pub async fn post_json_bytes<Req>(&self, path: &str, request: &Req) -> Result<Bytes>
    where
        Req: Serialize + WireFields + ?Sized,
    {
        let body = json_body(request)?;
        let (meta, bytes) = self.execute(path, body, ACCEPT_ANY).await?;
        classify_bytes(&meta, bytes)
    }

    /// POST a `multipart/form-data` body to `path` and decode a JSON reply.
    pub async fn post_multipart<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp>
    where
        Req: MultipartRequest,
        Resp: DeserializeOwned,
    {
        let form = multipart::encode(request)?;
        let (meta, bytes) = self
            .execute(path, RequestBody::Multipart(form), ACCEPT_JSON)
            .await?;
        classify_json(&meta, &bytes)
    }

    async fn execute(&self, path: &str, body: RequestBody, accept: &str) -> Result<(ResponseMeta, Bytes)> {
        let resp = self
            .inner
            .transport
            .send(path, body, accept, &self.cancel)
            .await?;
        let meta = ResponseMeta::from_response(&resp);
        let bytes = self.inner.transport.read_body(resp, &self.cancel).await?;
        Ok((meta, bytes))
    }
}

fn json_body<T: Serialize + WireFields + ?Sized>(value: &T) -> Result<RequestBody> {
    Ok(RequestBody::Json(json::encode(value)?))
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
