use crate::error_code::ApiErrorCode;
use crate::transport::TransportError;
use crate::types::envelope::ErrorEnvelope;
use thiserror::Error;

/// Boxed error used for causes coming from outside the crate (tool handlers, decoders).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structured error context for client-side failures.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g. "messages[0].content", "metadata.tags[]")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g. expected shape, actual value)
    pub details: Option<String>,
    /// Component that raised the error (e.g. "multipart_encoder", "client_builder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A well-formed error reported by the provider.
#[derive(Debug, Clone, Error)]
#[error("API error: HTTP {status} ({}): {}", .envelope.error.error_type.as_deref().unwrap_or("unknown"), .envelope.error.message)]
pub struct ApiError {
    /// HTTP status code of the response.
    pub status: u16,
    /// Raw response body, kept verbatim for diagnostics.
    pub body: String,
    /// Parsed provider error envelope.
    pub envelope: ErrorEnvelope,
    /// `Retry-After` hint in milliseconds, when the provider sent one.
    pub retry_after_ms: Option<u64>,
    /// Upstream request id (`x-request-id` / `request-id`), when present.
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn error_type(&self) -> Option<&str> {
        self.envelope.error.error_type.as_deref()
    }

    pub fn code(&self) -> Option<&str> {
        self.envelope.error.code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.envelope.error.message
    }

    pub fn param(&self) -> Option<&str> {
        self.envelope.error.param.as_deref()
    }

    /// Normalized error code derived from the envelope, falling back to the HTTP status.
    pub fn standard_code(&self) -> ApiErrorCode {
        self.code()
            .and_then(ApiErrorCode::from_provider_code)
            .or_else(|| self.error_type().and_then(ApiErrorCode::from_provider_code))
            .unwrap_or_else(|| ApiErrorCode::from_http_status(self.status))
    }
}

/// Coarse error category, for branching without matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Api,
    Stream,
    ToolExecution,
    BoundedRounds,
    Validation,
    Configuration,
    Serialization,
}

/// Unified error type.
///
/// Every failure of a call surfaces through this one type; callers branch on
/// [`Error::kind`] or match the variants directly.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection, timeout or cancellation failure before a response was classified.
    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    /// A response arrived but was neither a valid success nor a valid error envelope.
    #[error("Protocol error: HTTP {status}: {message}")]
    Protocol {
        status: u16,
        message: String,
        /// Raw response body.
        body: String,
    },

    /// The provider returned a structured error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A streaming exchange broke mid-flight. Streams are not resumable.
    #[error("Stream error after {frames} frame(s): {message}")]
    Stream {
        /// Number of chunks successfully decoded before the failure.
        frames: u64,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A registered tool handler failed.
    #[error("Tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        call_id: Option<String>,
        #[source]
        source: BoxError,
    },

    /// The tool-calling loop ran out of rounds.
    #[error("Tool-calling loop exceeded {max_rounds} round(s) without a final answer")]
    BoundedRounds { max_rounds: usize },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_with_context(msg, ErrorContext::new())
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub(crate) fn protocol(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        Error::Protocol {
            status,
            message: message.into(),
            body: body.into(),
        }
    }

    pub(crate) fn stream(frames: u64, message: impl Into<String>, source: Option<BoxError>) -> Self {
        Error::Stream {
            frames,
            message: message.into(),
            source,
        }
    }

    pub(crate) fn tool(tool: impl Into<String>, call_id: Option<String>, source: impl Into<BoxError>) -> Self {
        Error::ToolExecution {
            tool: tool.into(),
            call_id,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::Protocol { .. } => ErrorKind::Protocol,
            Error::Api(_) => ErrorKind::Api,
            Error::Stream { .. } => ErrorKind::Stream,
            Error::ToolExecution { .. } => ErrorKind::ToolExecution,
            Error::BoundedRounds { .. } => ErrorKind::BoundedRounds,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// HTTP status of the classified response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(api) => Some(api.status),
            Error::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body attached to API and protocol failures.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Error::Api(api) => Some(&api.body),
            Error::Protocol { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(api),
            _ => None,
        }
    }

    /// Whether this failure came from the caller cancelling the exchange.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Cancelled))
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }
}
